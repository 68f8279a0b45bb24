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

// portfolio,trade id,product,side,created at,size,size unit,price,fee,total,price/fee/total unit
#[derive(Debug, Deserialize)]
struct CoinbaseFill {
    // portfolio: String,
    #[serde(rename = "trade id")]
    trade_id: String,
    /// Product as `<base_currency>-<quote_currency>`
    product: String,
    side: String,
    #[serde(rename = "created at")]
    created_at: String,
    size: String,
    #[serde(rename = "size unit")]
    size_unit: String,
    price: String,
    fee: String,
    // total: String,
    #[serde(rename = "price/fee/total unit")]
    price_fee_total_unit: String,
}

impl TryFrom<CoinbaseFill> for TradeDraft {
    type Error = DecodeError;

    fn try_from(item: CoinbaseFill) -> Result<Self, Self::Error> {
        let action = Action::detect(&item.side)?;
        let pair = coerce::tradable(coerce::symbol_pair(&item.product, '-')?)?;

        let size_unit = item.size_unit.trim();
        if size_unit != pair.0.code() {
            return Err(DecodeError::Mismatch(format!("Base currency {} differs from size unit {}", pair.0, size_unit)));
        }
        let unit = item.price_fee_total_unit.trim();
        if unit != pair.1.code() {
            return Err(DecodeError::Mismatch(format!(
                "Quote currency {} differs from price/fee/total unit {}",
                pair.1, unit
            )));
        }

        let executed_at = time::parse_rfc3339(&item.created_at)?;
        let size = coerce::decimal("size", &item.size)?;
        let price = coerce::decimal("price", &item.price)?;
        let fee = coerce::round_scale(coerce::decimal("fee", &item.fee)?);

        Ok(TradeDraft::new(executed_at, pair, Side::Explicit(action), size, Price::Unit(price))
            .id(item.trade_id)
            .fee(Fee::in_currency(fee, pair.1)))
    }
}

pub(crate) fn decode_v1(headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
    decode_with(headers, record, |fill: CoinbaseFill| TradeDraft::try_from(fill)?.normalize())
}

#[distributed_slice(SCHEMAS)]
static COINBASE_V1: Schema = Schema {
    id: "CoinbaseV1",
    exchange: Exchange::Coinbase,
    header: "portfolio,trade id,product,side,created at,size,size unit,price,fee,total,price/fee/total unit",
    delimiter: b',',
    decoder: RowDecoder::CoinbaseV1,
};
