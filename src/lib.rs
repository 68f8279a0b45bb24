//! Normalizes exchange trade-history CSV exports into canonical transactions.
//!
//! A file is matched to a [`Schema`] by its exact header line. Every data row
//! then either becomes a [`Transaction`] or a [`RowError`], collected in a
//! [`ParseOutcome`].

pub mod base;
mod coerce;
pub mod connector;
pub mod error;
pub mod normalize;
pub mod parse;
pub mod schema;
pub mod time;

mod binance;
mod bitmex;
mod bitstamp;
mod bittrex;
mod coinbase;
mod coinsquare;
mod everytrade;
mod general_bytes;
mod huobi;
mod kraken;
mod localbitcoins;
mod okex;
mod paxful;

pub use base::{Action, Currency, CurrencyPair, Exchange, Transaction};
pub use connector::{download, ApiTransaction, DownloadResult, RemoteRecord, RemoteSource};
pub use error::{DecodeError, RowError, RowErrorKind, SchemaError};
pub use normalize::Normalized;
pub use parse::{parse, parse_file, parse_str, read_header, ParseOutcome};
pub use schema::{resolve, schemas, RowDecoder, Schema};
