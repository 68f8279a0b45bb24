use csv::StringRecord;
use linkme::distributed_slice;
use serde::Deserialize;
use strum::IntoEnumIterator;

use crate::{
    base::{Action, Currency, CurrencyPair, Exchange},
    coerce,
    error::DecodeError,
    normalize::{Fee, FeePolicy, Normalized, Price, Side, TradeDraft},
    schema::{decode_with, RowDecoder, Schema, SCHEMAS},
    time,
};

// struct for storing the following CSV columns:
// Date(UTC);Market;Type;Price;Amount;Total;Fee;Fee Coin
#[derive(Debug, Deserialize)]
struct BinanceTrade {
    #[serde(rename = "Date(UTC)")]
    timestamp: String,
    #[serde(rename = "Market")]
    market: String,
    #[serde(rename = "Type")]
    side: String,
    // #[serde(rename = "Price")]
    // price: String,  // Derived from Total/Amount after the fee is netted
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Total")]
    total: String,
    #[serde(rename = "Fee")]
    fee: String,
    #[serde(rename = "Fee Coin")]
    fee_coin: String,
}

// Binance reported BCH as BCC
fn normalize_currency(currency: &str) -> String {
    match currency.trim() {
        "BCC" => "BCH".to_owned(),
        other => other.to_owned(),
    }
}

// Splits a market into two known currencies, whether or not the pair is tradable
fn split_market(symbol: &str) -> Option<CurrencyPair> {
    Currency::iter().find_map(|base| {
        let quote = symbol.strip_prefix(base.code())?.parse().ok()?;
        Some(CurrencyPair::new(base, quote))
    })
}

/// Markets are written without separator, e.g. `BTCUSDT`.
fn parse_market(market: &str) -> Result<CurrencyPair, DecodeError> {
    let market = market.trim();
    let symbol = match market.strip_prefix("BCC") {
        Some(rest) => format!("BCH{rest}"),
        None => market.to_owned(),
    };
    CurrencyPair::from_concatenated(&symbol).ok_or_else(|| match split_market(&symbol) {
        Some(pair) => DecodeError::UnsupportedCurrencyPair(pair.to_string()),
        None => DecodeError::UnsupportedCurrencyPair(market.to_owned()),
    })
}

impl TryFrom<BinanceTrade> for TradeDraft {
    type Error = DecodeError;

    fn try_from(item: BinanceTrade) -> Result<Self, Self::Error> {
        let action = Action::detect(&item.side)?;
        let pair = parse_market(&item.market)?;
        let executed_at = time::parse_date_time(&item.timestamp)?;
        let amount = coerce::decimal("Amount", &item.amount)?;
        let total = coerce::decimal("Total", &item.total)?;
        let fee = coerce::decimal("Fee", &item.fee)?;

        Ok(TradeDraft::new(executed_at, (pair.base, pair.quote), Side::Explicit(action), amount, Price::Total(total))
            .fee(Fee::new(fee, &normalize_currency(&item.fee_coin)))
            .fee_policy(FeePolicy::FoldIntoAmounts))
    }
}

pub(crate) fn decode_v1(headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
    decode_with(headers, record, |trade: BinanceTrade| TradeDraft::try_from(trade)?.normalize())
}

#[distributed_slice(SCHEMAS)]
static BINANCE_V1: Schema = Schema {
    id: "BinanceV1",
    exchange: Exchange::Binance,
    header: "Date(UTC);Market;Type;Price;Amount;Total;Fee;Fee Coin",
    delimiter: b';',
    decoder: RowDecoder::BinanceV1,
};
