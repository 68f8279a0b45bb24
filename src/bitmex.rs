use csv::StringRecord;
use linkme::distributed_slice;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use crate::{
    base::{Action, CurrencyPair, Exchange},
    coerce,
    error::DecodeError,
    normalize::{Fee, Normalized, Price, Side, TradeDraft},
    schema::{decode_with, RowDecoder, Schema, SCHEMAS},
    time,
};

const SATOSHIS_PER_BTC: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// BitMEX reports commissions in satoshis. Converted values keep 7
/// significant digits.
fn satoshis_to_btc(satoshis: Decimal) -> Decimal {
    let btc = satoshis / SATOSHIS_PER_BTC;
    btc.round_sf_with_strategy(7, RoundingStrategy::MidpointNearestEven).unwrap_or(btc)
}

/// Symbols like `XBTUSD` use the ISO code XBT for bitcoin.
fn parse_symbol(symbol: &str) -> Result<CurrencyPair, DecodeError> {
    let mapped = match symbol.strip_prefix("XBT") {
        Some(rest) => format!("BTC{rest}"),
        None => symbol.to_owned(),
    };
    CurrencyPair::from_concatenated(&mapped).ok_or_else(|| DecodeError::UnparseablePairSymbol(symbol.to_owned()))
}

// The export carries more columns (execCost, ordType, text, ...) that are not needed
#[derive(Debug, Deserialize)]
struct BitmexExecution {
    #[serde(rename = "transactTime")]
    transact_time: String,
    symbol: String,
    #[serde(rename = "execType")]
    exec_type: String,
    side: String,
    #[serde(rename = "lastQty")]
    last_qty: String,
    #[serde(rename = "lastPx")]
    last_px: String,
    #[serde(rename = "execComm")]
    exec_comm: String,
    #[serde(rename = "orderID")]
    order_id: String,
}

impl TryFrom<BitmexExecution> for TradeDraft {
    type Error = DecodeError;

    fn try_from(item: BitmexExecution) -> Result<Self, Self::Error> {
        if item.exec_type != "Trade" {
            return Err(DecodeError::UnsupportedStatus(item.exec_type));
        }

        let executed_at = time::parse_fixed(&item.transact_time, "%m/%d/%Y, %I:%M:%S %p")?;
        let pair = parse_symbol(item.symbol.trim())?;
        let action = Action::detect(&item.side)?;
        let quantity = coerce::non_zero("Quantity", coerce::decimal("lastQty", &item.last_qty)?)?;
        let price = coerce::decimal("lastPx", &item.last_px)?;
        let commission = satoshis_to_btc(coerce::decimal("execComm", &item.exec_comm)?);

        Ok(TradeDraft::new(executed_at, (pair.base, pair.quote), Side::Explicit(action), quantity, Price::Unit(price))
            .id(item.order_id)
            .fee(Fee::in_currency(commission, pair.quote)))
    }
}

pub(crate) fn decode_v1(headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
    decode_with(headers, record, |item: BitmexExecution| TradeDraft::try_from(item)?.normalize())
}

#[distributed_slice(SCHEMAS)]
static BITMEX_V1: Schema = Schema {
    id: "BitmexV1",
    exchange: Exchange::Bitmex,
    header: "\u{feff}\"transactTime\",\"symbol\",\"execType\",\"side\",\"lastQty\",\"lastPx\",\"execCost\",\
             \"commission\",\"execComm\",\"ordType\",\"orderQty\",\"leavesQty\",\"price\",\"text\",\"orderID\"",
    delimiter: b',',
    decoder: RowDecoder::BitmexV1,
};
