use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    base::Transaction,
    error::{DecodeError, RowError, RowErrorKind, SchemaError},
    normalize::Normalized,
    schema::{self, Schema},
};

/// Result of converting one file: every data row ends up either as a
/// transaction or as a row error, in file order.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ParseOutcome {
    pub transactions: Vec<Transaction>,
    pub errors: Vec<RowError>,
    /// Transactions whose fee could not be expressed in the quote currency and was dropped.
    pub ignored_fee_count: usize,
}

impl ParseOutcome {
    pub fn ignored_row_count(&self) -> usize {
        self.errors.iter().filter(|error| error.kind == RowErrorKind::Ignored).count()
    }

    pub fn failed_row_count(&self) -> usize {
        self.errors.iter().filter(|error| error.kind == RowErrorKind::Failed).count()
    }

    pub(crate) fn record(&mut self, raw: &str, result: Result<Normalized, DecodeError>) {
        match result {
            Ok(normalized) => {
                if normalized.ignored_fee {
                    self.ignored_fee_count += 1;
                }
                self.transactions.push(normalized.transaction);
            }
            Err(err) => {
                debug!(row = raw, kind = ?err.kind(), "{}", err);
                self.errors.push(RowError::new(raw, &err));
            }
        }
    }

    pub fn extend(&mut self, other: ParseOutcome) {
        self.transactions.extend(other.transactions);
        self.errors.extend(other.errors);
        self.ignored_fee_count += other.ignored_fee_count;
    }

    pub(crate) fn log_summary(&self) {
        info!("{} transaction(s) parsed successfully.", self.transactions.len());
        if !self.errors.is_empty() {
            warn!("{} row(s) not parsed.", self.errors.len());
        }
    }
}

/// The first line of the content, without its line terminator. A leading
/// byte order mark is kept since it takes part in schema matching.
pub fn read_header(content: &str) -> Option<&str> {
    content.lines().next().filter(|line| !line.is_empty())
}

/// Parses a file whose schema is selected by the given header line.
pub fn parse(path: &Path, header: &str) -> Result<ParseOutcome, SchemaError> {
    let schema = schema::resolve(header)?;
    let content = read_file(path)?;
    parse_rows(schema, header, body(&content))
}

/// Parses a file, taking the header from its first line.
pub fn parse_file(path: &Path) -> Result<ParseOutcome, SchemaError> {
    let content = read_file(path)?;
    parse_str(&content)
}

/// Parses in-memory content, taking the header from its first line.
pub fn parse_str(content: &str) -> Result<ParseOutcome, SchemaError> {
    let header = read_header(content).ok_or(SchemaError::MissingHeader)?;
    let schema = schema::resolve(header)?;
    parse_rows(schema, header, body(content))
}

fn read_file(path: &Path) -> Result<String, SchemaError> {
    std::fs::read_to_string(path).map_err(|source| SchemaError::Io { path: path.to_owned(), source })
}

fn body(content: &str) -> &str {
    content.split_once('\n').map_or("", |(_, rest)| rest)
}

/// Column names as seen by the row structs, with byte order marks removed.
fn header_record(schema: &Schema, header: &str) -> Result<StringRecord, SchemaError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(schema.delimiter)
        .has_headers(false)
        .from_reader(header.trim_start_matches('\u{feff}').as_bytes());

    let mut record = StringRecord::new();
    rdr.read_record(&mut record)?;
    Ok(record.iter().map(|name| name.trim_start_matches('\u{feff}').trim_end_matches('\r')).collect())
}

fn parse_rows(schema: &Schema, header: &str, body: &str) -> Result<ParseOutcome, SchemaError> {
    let headers = header_record(schema, header)?;
    let mut outcome = ParseOutcome::default();

    let mut rdr = ReaderBuilder::new()
        .delimiter(schema.delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut record = StringRecord::new();
    loop {
        let start = rdr.position().byte() as usize;
        let read = rdr.read_record(&mut record);
        let end = rdr.position().byte() as usize;
        let raw = body
            .get(start..end)
            .unwrap_or_default()
            .trim_matches(|c| c == '\r' || c == '\n');

        match read {
            Ok(true) => outcome.record(raw, schema.decoder.decode(&headers, &record)),
            Ok(false) => break,
            Err(err) => {
                outcome.record(raw, Err(DecodeError::Invalid(err.to_string())));
                if end <= start {
                    break;
                }
            }
        }
    }

    info!(schema = schema.id, exchange = %schema.exchange, "parsed");
    outcome.log_summary();
    Ok(outcome)
}
