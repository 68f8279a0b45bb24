use csv::StringRecord;
use linkme::distributed_slice;
use serde::Deserialize;

use crate::{
    base::{Action, Currency, Exchange},
    coerce,
    error::DecodeError,
    normalize::{Normalized, Price, Side, TradeDraft},
    schema::{decode_with, RowDecoder, Schema, SCHEMAS},
    time,
};

// type,fiat_currency,amount_fiat,amount_btc,rate,fee_fiat,fee_btc,market_rate_usd,payment_method,partner,
// status,completed_at,trade_hash,offer_hash
#[derive(Debug, Deserialize)]
struct PaxfulTrade {
    #[serde(rename = "type")]
    type_: String,
    fiat_currency: String,
    amount_fiat: String,
    amount_btc: String,
    status: String,
    completed_at: String,
    trade_hash: String,
}

impl TryFrom<PaxfulTrade> for TradeDraft {
    type Error = DecodeError;

    fn try_from(item: PaxfulTrade) -> Result<Self, Self::Error> {
        // Types are written from the partner's point of view
        let action = match item.type_.trim() {
            "SELL" => Action::Buy,
            "BUY" => Action::Sell,
            other => return Err(DecodeError::UnsupportedTransactionType(other.to_owned())),
        };
        if item.status.trim() != "successful" {
            return Err(DecodeError::UnsupportedStatus(item.status.trim().to_owned()));
        }
        let quote = coerce::currency(&item.fiat_currency)?;
        if !quote.is_fiat() {
            return Err(DecodeError::UnsupportedQuoteCurrency(quote.to_string()));
        }

        // The offset is dropped, the local clock time is read as UTC
        let completed_at = item.completed_at.trim();
        let executed_at = time::parse_fixed(completed_at.get(..19).unwrap_or(completed_at), "%Y-%m-%dT%H:%M:%S")?;
        let quantity = coerce::decimal("amount_btc", &item.amount_btc)?;
        let total = coerce::decimal("amount_fiat", &item.amount_fiat)?;

        Ok(TradeDraft::new(executed_at, (Currency::BTC, quote), Side::Explicit(action), quantity, Price::Total(total))
            .id(item.trade_hash))
    }
}

pub(crate) fn decode_v1(headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
    decode_with(headers, record, |trade: PaxfulTrade| TradeDraft::try_from(trade)?.normalize())
}

#[distributed_slice(SCHEMAS)]
static PAXFUL_V1: Schema = Schema {
    id: "PaxfulV1",
    exchange: Exchange::Paxful,
    header: "type,fiat_currency,amount_fiat,amount_btc,rate,fee_fiat,fee_btc,market_rate_usd,payment_method,partner,\
             status,completed_at,trade_hash,offer_hash",
    delimiter: b',',
    decoder: RowDecoder::PaxfulV1,
};
