//! Remote transaction sources.
//!
//! A source hands out pages of provider-native records after a cursor. Each
//! record goes through the same decode and normalize steps as a CSV row, so a
//! download reports ignored and failed records exactly like a file does.

use std::{fmt::Debug, future::Future, pin::Pin};

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    base::Action,
    coerce,
    error::DecodeError,
    normalize::{Fee, Normalized, Price, Side, TradeDraft},
    parse::ParseOutcome,
};

pub type FetchFuture<'a, R> = Pin<Box<dyn Future<Output = Result<Vec<R>>> + Send + 'a>>;

/// A single record as delivered by a remote source.
pub trait RemoteRecord: Debug {
    /// Cursor value identifying this record.
    fn id(&self) -> &str;

    fn decode(&self) -> Result<Normalized, DecodeError>;
}

pub trait RemoteSource {
    type Record: RemoteRecord;

    /// Fetches the records following `last_id`, or from the start when there is none.
    fn fetch<'a>(&'a mut self, last_id: Option<&'a str>) -> FetchFuture<'a, Self::Record>;
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct DownloadResult {
    pub outcome: ParseOutcome,
    /// The cursor to pass to the next download.
    pub last_downloaded_id: Option<String>,
}

/// Downloads one page of records and converts them.
///
/// The returned cursor is the id of the last record that converted, or
/// `last_id` when none did.
pub async fn download<S: RemoteSource>(source: &mut S, last_id: Option<&str>) -> Result<DownloadResult> {
    let records = source.fetch(last_id).await?;
    debug!("fetched {} record(s)", records.len());

    let mut outcome = ParseOutcome::default();
    let mut last_downloaded_id = last_id.map(str::to_owned);

    for record in &records {
        let result = record.decode();
        if result.is_ok() {
            last_downloaded_id = Some(record.id().to_owned());
        }
        outcome.record(&format!("{record:?}"), result);
    }

    outcome.log_summary();
    Ok(DownloadResult { outcome, last_downloaded_id })
}

/// Transaction record of the EveryTrade JSON API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTransaction {
    pub uid: String,
    pub timestamp: DateTime<Utc>,
    /// Pair as `BASE/QUOTE`
    pub symbol: String,
    pub action: String,
    pub quantity: Decimal,
    /// Total in the quote currency
    pub volume: Decimal,
    #[serde(default)]
    pub fee: Decimal,
    #[serde(default)]
    pub fee_currency: String,
}

impl RemoteRecord for ApiTransaction {
    fn id(&self) -> &str {
        &self.uid
    }

    fn decode(&self) -> Result<Normalized, DecodeError> {
        let action = Action::detect(&self.action)?;
        let pair = coerce::symbol_pair(&self.symbol, '/')?;
        let fee = if self.fee_currency.trim().is_empty() {
            Fee::in_currency(self.fee, pair.1)
        } else {
            Fee::new(self.fee, &self.fee_currency)
        };

        TradeDraft::new(self.timestamp, pair, Side::Explicit(action), self.quantity, Price::Total(self.volume))
            .id(self.uid.as_str())
            .fee(fee)
            .normalize()
    }
}
