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

// struct for storing the following CSV columns (the header ends with a separator):
// Terminal SN;Server Time;Terminal Time;Local Transaction Id;Remote Transaction Id;Type;Cash Amount;
// Cash Currency;Crypto Amount;Crypto Currency;Used Discount;Actual Discount (%);Destination address;
// Related Remote Transaction Id;Identity;Status;Phone Number;Transaction Detail;
#[derive(Debug, Deserialize)]
struct GeneralBytesTransaction {
    #[serde(rename = "Server Time")]
    server_time: String,
    #[serde(rename = "Local Transaction Id")]
    local_transaction_id: String,
    #[serde(rename = "Remote Transaction Id")]
    remote_transaction_id: String,
    #[serde(rename = "Type")]
    type_: String,
    #[serde(rename = "Cash Amount")]
    cash_amount: String,
    #[serde(rename = "Cash Currency")]
    cash_currency: String,
    #[serde(rename = "Crypto Amount")]
    crypto_amount: String,
    #[serde(rename = "Crypto Currency")]
    crypto_currency: String,
    #[serde(rename = "Status")]
    status: String,
}

// The terminal reports from the customer's side: a customer SELL is a BUY for the operator
fn operator_side(type_: &str) -> Result<Action, DecodeError> {
    match type_.trim() {
        "SELL" => Ok(Action::Buy),
        "BUY" => Ok(Action::Sell),
        other => Err(DecodeError::UnsupportedTransactionType(other.to_owned())),
    }
}

fn is_settled(status: &str) -> bool {
    status.starts_with("COMPLETED") || status.contains("PAYMENT ARRIVED") || status.contains("ERROR (EXCHANGE PURCHASE)")
}

// Lightning BTC is still BTC
fn normalize_currency(currency: &str) -> &str {
    match currency.trim() {
        "LBTC" => "BTC",
        other => other,
    }
}

impl TryFrom<GeneralBytesTransaction> for TradeDraft {
    type Error = DecodeError;

    fn try_from(item: GeneralBytesTransaction) -> Result<Self, Self::Error> {
        let action = operator_side(&item.type_)?;
        let status = item.status.trim();
        if !is_settled(status) {
            return Err(DecodeError::UnsupportedStatus(status.to_owned()));
        }

        let executed_at = time::parse_detected(&item.server_time)?;
        let pair = coerce::pair(normalize_currency(&item.crypto_currency), &item.cash_currency)?;
        let quantity = coerce::decimal("Crypto Amount", &item.crypto_amount)?;
        let total = coerce::decimal("Cash Amount", &item.cash_amount)?;
        let id = format!("{}-{}", item.local_transaction_id.trim(), item.remote_transaction_id.trim());

        Ok(TradeDraft::new(executed_at, pair, Side::Explicit(action), quantity, Price::Total(total)).id(id))
    }
}

pub(crate) fn decode_v1(headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
    decode_with(headers, record, |item: GeneralBytesTransaction| TradeDraft::try_from(item)?.normalize())
}

#[distributed_slice(SCHEMAS)]
static GENERAL_BYTES_V1: Schema = Schema {
    id: "GeneralBytesV1",
    exchange: Exchange::GeneralBytes,
    header: "Terminal SN;Server Time;Terminal Time;Local Transaction Id;Remote Transaction Id;Type;Cash Amount;\
             Cash Currency;Crypto Amount;Crypto Currency;Used Discount;Actual Discount (%);Destination address;\
             Related Remote Transaction Id;Identity;Status;Phone Number;Transaction Detail;",
    delimiter: b';',
    decoder: RowDecoder::GeneralBytesV1,
};
