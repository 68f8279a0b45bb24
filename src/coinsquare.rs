use csv::StringRecord;
use linkme::distributed_slice;
use serde::Deserialize;

use crate::{
    base::{Action, Exchange},
    coerce,
    error::DecodeError,
    normalize::{Normalized, Price, Side, TradeDraft},
    schema::{decode_with, RowDecoder, Schema, SCHEMAS},
    time,
};

const DATE_FORMAT: &str = "%d-%m-%y";

// date;action;currency;base_currency;price;amount;base_amount
#[derive(Debug, Deserialize)]
struct CoinsquareTradeV1 {
    date: String,
    action: String,
    /// Quote currency
    currency: String,
    base_currency: String,
    // price: String,
    /// Total in the quote currency, may carry thousands separators and symbols
    amount: String,
    base_amount: String,
}

// date;from_currency;from_amount;to_currency;to_amount
#[derive(Debug, Deserialize)]
struct CoinsquareTradeV2 {
    date: String,
    from_currency: String,
    from_amount: String,
    to_currency: String,
    to_amount: String,
}

impl TryFrom<CoinsquareTradeV1> for TradeDraft {
    type Error = DecodeError;

    fn try_from(item: CoinsquareTradeV1) -> Result<Self, Self::Error> {
        let action = Action::detect(&item.action)?;
        let pair = coerce::pair(&item.base_currency, &item.currency)?;
        let executed_at = time::parse_date(&item.date, DATE_FORMAT)?;
        let total = coerce::stripped_decimal("amount", &item.amount)?;
        let quantity = coerce::stripped_decimal("base_amount", &item.base_amount)?.abs();

        Ok(TradeDraft::new(executed_at, pair, Side::Explicit(action), quantity, Price::Total(total)))
    }
}

impl TryFrom<CoinsquareTradeV2> for TradeDraft {
    type Error = DecodeError;

    fn try_from(item: CoinsquareTradeV2) -> Result<Self, Self::Error> {
        let executed_at = time::parse_date(&item.date, DATE_FORMAT)?;
        let from = coerce::currency(&item.from_currency)?;
        let to = coerce::currency(&item.to_currency)?;
        let from_amount = coerce::stripped_decimal("from_amount", &item.from_amount)?;
        let to_amount = coerce::stripped_decimal("to_amount", &item.to_amount)?;

        // Paying with fiat buys the received currency, anything else sells what was given
        let draft = if from.is_fiat() {
            TradeDraft::new(executed_at, (to, from), Side::Explicit(Action::Buy), to_amount, Price::Total(from_amount))
        } else {
            TradeDraft::new(executed_at, (from, to), Side::Explicit(Action::Sell), from_amount, Price::Total(to_amount))
        };
        Ok(draft)
    }
}

pub(crate) fn decode_v1(headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
    decode_with(headers, record, |trade: CoinsquareTradeV1| TradeDraft::try_from(trade)?.normalize())
}

pub(crate) fn decode_v2(headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
    decode_with(headers, record, |trade: CoinsquareTradeV2| TradeDraft::try_from(trade)?.normalize())
}

#[distributed_slice(SCHEMAS)]
static COINSQUARE_V1: Schema = Schema {
    id: "CoinsquareV1",
    exchange: Exchange::Coinsquare,
    header: "date;action;currency;base_currency;price;amount;base_amount",
    delimiter: b';',
    decoder: RowDecoder::CoinsquareV1,
};

#[distributed_slice(SCHEMAS)]
static COINSQUARE_V2: Schema = Schema {
    id: "CoinsquareV2",
    exchange: Exchange::Coinsquare,
    header: "date;from_currency;from_amount;to_currency;to_amount",
    delimiter: b';',
    decoder: RowDecoder::CoinsquareV2,
};
