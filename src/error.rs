use std::{io, path::PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Failures that abort a whole file.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Unknown header: '{0}'")]
    UnknownSchema(String),

    #[error("no header line found")]
    MissingHeader,

    #[error("failed to read '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Why a single row could not become a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Unsupported transaction type {0}")]
    UnsupportedTransactionType(String),

    #[error("Unsupported status type {0}")]
    UnsupportedStatus(String),

    #[error("Unsupported type {0}")]
    UnsupportedType(String),

    #[error("Unsupported currency pair {0}")]
    UnsupportedCurrencyPair(String),

    #[error("Unsupported quote currency {0}")]
    UnsupportedQuoteCurrency(String),

    #[error("Unknown currency {0}")]
    UnknownCurrency(String),

    #[error("Can not parse pair symbol {0}.")]
    UnparseablePairSymbol(String),

    #[error("Unknown dateTime format for value {0}.")]
    UnknownDateTimeFormat(String),

    #[error("Invalid number '{value}' in {field}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{0} can not be zero.")]
    Zero(&'static str),

    #[error("{0} can not be null or empty.")]
    Empty(&'static str),

    #[error("{0} can not be negative.")]
    Negative(&'static str),

    #[error("{0} is out of range.")]
    Overflow(&'static str),

    #[error("{0}")]
    Mismatch(String),

    #[error("{0}")]
    Invalid(String),
}

impl DecodeError {
    pub fn kind(&self) -> RowErrorKind {
        match self {
            DecodeError::UnsupportedTransactionType(_)
            | DecodeError::UnsupportedStatus(_)
            | DecodeError::UnsupportedType(_) => RowErrorKind::Ignored,
            _ => RowErrorKind::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RowErrorKind {
    /// The row was malformed or inconsistent.
    Failed,
    /// The row is a well-formed record of an unsupported kind (deposits, withdrawals, ...).
    Ignored,
}

/// A rejected row, carrying its original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub raw: String,
    pub message: String,
    pub kind: RowErrorKind,
}

impl RowError {
    pub fn new(raw: impl Into<String>, error: &DecodeError) -> Self {
        Self {
            raw: raw.into(),
            message: error.to_string(),
            kind: error.kind(),
        }
    }
}
