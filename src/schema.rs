use csv::StringRecord;
use linkme::distributed_slice;
use serde::de::DeserializeOwned;

use crate::{
    base::Exchange,
    binance, bitmex, bitstamp, bittrex, coinbase, coinsquare,
    error::{DecodeError, SchemaError},
    everytrade, general_bytes, huobi, kraken, localbitcoins,
    normalize::Normalized,
    okex, paxful,
};

/// Every supported export layout registers itself here.
#[distributed_slice]
pub static SCHEMAS: [Schema];

/// A known export layout, identified by its exact header line.
#[derive(Debug)]
pub struct Schema {
    pub id: &'static str,
    pub exchange: Exchange,
    /// The header line as it appears in the file, byte order mark included.
    pub header: &'static str,
    pub delimiter: u8,
    pub decoder: RowDecoder,
}

/// The per-schema row conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowDecoder {
    EveryTradeV1,
    EveryTradeV2,
    BinanceV1,
    BitmexV1,
    BitstampV1,
    BittrexV1,
    CoinbaseV1,
    CoinsquareV1,
    CoinsquareV2,
    GeneralBytesV1,
    HuobiV1,
    KrakenV1,
    LocalBitcoinsV1,
    OkexV1,
    PaxfulV1,
}

impl RowDecoder {
    pub fn decode(self, headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
        match self {
            RowDecoder::EveryTradeV1 => everytrade::decode_v1(headers, record),
            RowDecoder::EveryTradeV2 => everytrade::decode_v2(headers, record),
            RowDecoder::BinanceV1 => binance::decode_v1(headers, record),
            RowDecoder::BitmexV1 => bitmex::decode_v1(headers, record),
            RowDecoder::BitstampV1 => bitstamp::decode_v1(headers, record),
            RowDecoder::BittrexV1 => bittrex::decode_v1(headers, record),
            RowDecoder::CoinbaseV1 => coinbase::decode_v1(headers, record),
            RowDecoder::CoinsquareV1 => coinsquare::decode_v1(headers, record),
            RowDecoder::CoinsquareV2 => coinsquare::decode_v2(headers, record),
            RowDecoder::GeneralBytesV1 => general_bytes::decode_v1(headers, record),
            RowDecoder::HuobiV1 => huobi::decode_v1(headers, record),
            RowDecoder::KrakenV1 => kraken::decode_v1(headers, record),
            RowDecoder::LocalBitcoinsV1 => localbitcoins::decode_v1(headers, record),
            RowDecoder::OkexV1 => okex::decode_v1(headers, record),
            RowDecoder::PaxfulV1 => paxful::decode_v1(headers, record),
        }
    }
}

/// Finds the schema whose header is exactly equal to the given line.
pub fn resolve(header: &str) -> Result<&'static Schema, SchemaError> {
    SCHEMAS
        .iter()
        .find(|schema| schema.header == header)
        .ok_or_else(|| SchemaError::UnknownSchema(header.to_owned()))
}

/// All registered schemas, ordered by id.
pub fn schemas() -> Vec<&'static Schema> {
    let mut schemas: Vec<&'static Schema> = SCHEMAS.iter().collect();
    schemas.sort_by_key(|schema| schema.id);
    schemas
}

/// Maps a record onto a row struct by column name.
pub(crate) fn deserialize_row<T: DeserializeOwned>(headers: &StringRecord, record: &StringRecord) -> Result<T, DecodeError> {
    record
        .deserialize(Some(headers))
        .map_err(|err| DecodeError::Invalid(err.to_string()))
}

/// Shorthand for decoders whose row struct converts into a normalized transaction.
pub(crate) fn decode_with<T, F>(headers: &StringRecord, record: &StringRecord, convert: F) -> Result<Normalized, DecodeError>
where
    T: DeserializeOwned,
    F: FnOnce(T) -> Result<Normalized, DecodeError>,
{
    convert(deserialize_row(headers, record)?)
}
