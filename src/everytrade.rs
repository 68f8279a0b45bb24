use csv::StringRecord;
use linkme::distributed_slice;
use serde::Deserialize;

use crate::{
    base::{Action, Exchange},
    coerce,
    error::DecodeError,
    normalize::{Fee, Normalized, Price, Side, TradeDraft},
    schema::{decode_with, RowDecoder, Schema, SCHEMAS},
    time,
};

// struct for storing the following CSV columns:
// UID;DATE;SYMBOL;ACTION;QUANTY;PRICE;FEE
#[derive(Debug, Deserialize)]
struct EveryTradeRowV1 {
    #[serde(rename = "UID")]
    uid: String,
    #[serde(rename = "DATE")]
    date: String,
    #[serde(rename = "SYMBOL")]
    symbol: String,
    #[serde(rename = "ACTION")]
    action: String,
    #[serde(rename = "QUANTY")]
    quantity: String,
    #[serde(rename = "PRICE")]
    price: String,
    #[serde(rename = "FEE")]
    fee: String,
}

// Same as V1, except that VOLUME holds the total instead of the unit price
#[derive(Debug, Deserialize)]
struct EveryTradeRowV2 {
    #[serde(rename = "UID")]
    uid: String,
    #[serde(rename = "DATE")]
    date: String,
    #[serde(rename = "SYMBOL")]
    symbol: String,
    #[serde(rename = "ACTION")]
    action: String,
    #[serde(rename = "QUANTY")]
    quantity: String,
    #[serde(rename = "VOLUME")]
    volume: String,
    #[serde(rename = "FEE")]
    fee: String,
}

fn draft(uid: &str, date: &str, symbol: &str, action: &str, quantity: &str, price: Price, fee: &str) -> Result<TradeDraft, DecodeError> {
    let action = Action::detect(action)?;
    let pair = coerce::symbol_pair(symbol, '/')?;
    let executed_at = time::parse_detected(date)?;
    let quantity = coerce::decimal("QUANTY", quantity)?;
    let fee = coerce::decimal("FEE", fee)?;

    Ok(TradeDraft::new(executed_at, pair, Side::Explicit(action), quantity, price)
        .id(uid)
        .fee(Fee::in_currency(fee, pair.1)))
}

impl TryFrom<EveryTradeRowV1> for TradeDraft {
    type Error = DecodeError;

    fn try_from(row: EveryTradeRowV1) -> Result<Self, Self::Error> {
        let price = Price::Unit(coerce::decimal("PRICE", &row.price)?);
        draft(&row.uid, &row.date, &row.symbol, &row.action, &row.quantity, price, &row.fee)
    }
}

impl TryFrom<EveryTradeRowV2> for TradeDraft {
    type Error = DecodeError;

    fn try_from(row: EveryTradeRowV2) -> Result<Self, Self::Error> {
        let price = Price::Total(coerce::decimal("VOLUME", &row.volume)?);
        draft(&row.uid, &row.date, &row.symbol, &row.action, &row.quantity, price, &row.fee)
    }
}

pub(crate) fn decode_v1(headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
    decode_with(headers, record, |row: EveryTradeRowV1| TradeDraft::try_from(row)?.normalize())
}

pub(crate) fn decode_v2(headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
    decode_with(headers, record, |row: EveryTradeRowV2| TradeDraft::try_from(row)?.normalize())
}

#[distributed_slice(SCHEMAS)]
static EVERYTRADE_V1: Schema = Schema {
    id: "EveryTradeV1",
    exchange: Exchange::EveryTrade,
    header: "UID;DATE;SYMBOL;ACTION;QUANTY;PRICE;FEE",
    delimiter: b';',
    decoder: RowDecoder::EveryTradeV1,
};

#[distributed_slice(SCHEMAS)]
static EVERYTRADE_V2: Schema = Schema {
    id: "EveryTradeV2",
    exchange: Exchange::EveryTrade,
    header: "UID;DATE;SYMBOL;ACTION;QUANTY;VOLUME;FEE",
    delimiter: b';',
    decoder: RowDecoder::EveryTradeV2,
};
