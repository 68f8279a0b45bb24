use csv::StringRecord;
use linkme::distributed_slice;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    base::Exchange,
    coerce,
    error::DecodeError,
    normalize::{Fee, Normalized, Price, Side, TradeDraft},
    schema::{decode_with, RowDecoder, Schema, SCHEMAS},
    time,
};

// Order ID,Trade ID,Trade Time,Pairs,Amount,Price,Total,taker/maker,Fee,unit
// Every header name starts with a BOM, which is stripped before rows are read.
#[derive(Debug, Deserialize)]
struct OkexTrade {
    #[serde(rename = "Trade ID")]
    trade_id: String,
    #[serde(rename = "Trade Time")]
    trade_time: String,
    /// Lowercase `<base>_<quote>`
    #[serde(rename = "Pairs")]
    pairs: String,
    /// Signed, negative for sells
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Price")]
    price: String,
    /// `<total> <quote currency>`
    #[serde(rename = "Total")]
    total: String,
    /// `<fee> <currency>`
    #[serde(rename = "Fee")]
    fee: String,
    unit: String,
}

impl TryFrom<OkexTrade> for TradeDraft {
    type Error = DecodeError;

    fn try_from(item: OkexTrade) -> Result<Self, Self::Error> {
        let executed_at = time::parse_date_time(&item.trade_time)?;
        let (base, quote) = coerce::tradable(coerce::symbol_pair(&item.pairs.to_uppercase(), '_')?)?;

        let unit = item.unit.trim().to_uppercase();
        if unit != base.code() {
            return Err(DecodeError::Mismatch(format!(
                "Pairs-base currency '{base}' differs from unit currency '{unit}'"
            )));
        }
        let total = coerce::amount("Total", &item.total)?;
        if total.currency != quote.code() {
            return Err(DecodeError::Mismatch(format!(
                "Pairs-quote currency '{quote}' differs from Total currency '{}'",
                total.currency
            )));
        }

        let amount = coerce::decimal("Amount", &item.amount)?;
        let price = coerce::decimal("Price", &item.price)?;
        let fee = coerce::amount("Fee", &item.fee)?;

        // Buys pay the fee in the base currency, sells in the quote currency
        let fee_quote = if amount > Decimal::ZERO {
            if fee.currency != base.code() {
                return Err(DecodeError::Mismatch(format!(
                    "Fee currency '{}' differ to base currency '{base}'.",
                    fee.currency
                )));
            }
            coerce::round_scale(coerce::mul("Fee", price, fee.quantity)?.abs())
        } else {
            if fee.currency != quote.code() {
                return Err(DecodeError::Mismatch(format!(
                    "Fee currency '{}' differ to quote currency '{quote}'.",
                    fee.currency
                )));
            }
            fee.quantity.abs()
        };

        Ok(TradeDraft::new(executed_at, (base, quote), Side::BySign, amount, Price::Unit(price))
            .id(item.trade_id.trim_start_matches('\u{feff}'))
            .fee(Fee::in_currency(fee_quote, quote)))
    }
}

pub(crate) fn decode_v1(headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
    decode_with(headers, record, |trade: OkexTrade| TradeDraft::try_from(trade)?.normalize())
}

#[distributed_slice(SCHEMAS)]
static OKEX_V1: Schema = Schema {
    id: "OkexV1",
    exchange: Exchange::Okex,
    header: "\u{feff}Order ID,\u{feff}Trade ID,\u{feff}Trade Time,\u{feff}Pairs,\u{feff}Amount,\u{feff}Price,\
             \u{feff}Total,\u{feff}taker/maker,\u{feff}Fee,\u{feff}unit",
    delimiter: b',',
    decoder: RowDecoder::OkexV1,
};
