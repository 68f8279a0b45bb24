use csv::StringRecord;
use linkme::distributed_slice;
use serde::Deserialize;

use crate::{
    base::{Action, Amount, Exchange},
    coerce,
    error::DecodeError,
    normalize::{Fee, Normalized, Price, Side, TradeDraft},
    schema::{decode_with, RowDecoder, Schema, SCHEMAS},
    time,
};

const CURRENCY_EQUALITY_MESSAGE: &str = "Value currency, rate currency and fee currency not equals.";

// struct for storing the following CSV columns:
// Type,Datetime,Account,Amount,Value,Rate,Fee,Sub Type
#[derive(Debug, Deserialize)]
struct BitstampTransaction {
    #[serde(rename = "Type")]
    pub type_: String,
    #[serde(rename = "Datetime")]
    pub datetime: String,
    // #[serde(rename = "Account")]
    // pub account: String,
    #[serde(rename = "Amount")]
    pub amount: String,
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "Rate")]
    pub rate: String,
    #[serde(rename = "Fee")]
    pub fee: String,
    #[serde(rename = "Sub Type")]
    pub sub_type: String,
}

// Amounts are written as '<quantity> <currency>'
fn base_amount(raw: &str) -> Result<Amount, DecodeError> {
    if raw.split_whitespace().count() < 2 {
        return Err(DecodeError::Empty("BaseQuantity"));
    }
    let amount = coerce::amount("Amount", raw)?;
    coerce::non_zero("BaseQuantity", amount.quantity)?;
    Ok(amount)
}

impl TryFrom<BitstampTransaction> for TradeDraft {
    type Error = DecodeError;

    fn try_from(item: BitstampTransaction) -> Result<Self, Self::Error> {
        // Deposits and withdrawals are not trades
        if item.type_ != "Market" {
            return Err(DecodeError::UnsupportedTransactionType(item.type_));
        }

        let executed_at = time::parse_fixed(&item.datetime, "%b. %d, %Y, %I:%M %p")?;
        let amount = base_amount(&item.amount)?;
        let value = coerce::amount("Value", &item.value)?;
        let rate = coerce::amount("Rate", &item.rate)?;
        let fee = coerce::amount("Fee", &item.fee)?;
        let action = Action::detect(&item.sub_type)?;

        let pair = coerce::tradable(coerce::pair(&amount.currency, &value.currency)?)?;
        if value.currency != rate.currency || value.currency != fee.currency {
            return Err(DecodeError::Mismatch(CURRENCY_EQUALITY_MESSAGE.to_owned()));
        }

        Ok(TradeDraft::new(executed_at, pair, Side::Explicit(action), amount.quantity, Price::Total(value.quantity))
            .fee(Fee::in_currency(fee.quantity, pair.1)))
    }
}

pub(crate) fn decode_v1(headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
    decode_with(headers, record, |item: BitstampTransaction| TradeDraft::try_from(item)?.normalize())
}

#[distributed_slice(SCHEMAS)]
static BITSTAMP_V1: Schema = Schema {
    id: "BitstampV1",
    exchange: Exchange::Bitstamp,
    header: "Type,Datetime,Account,Amount,Value,Rate,Fee,Sub Type",
    delimiter: b',',
    decoder: RowDecoder::BitstampV1,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{base::Currency, error::RowErrorKind, parse::parse_str};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn parse(row: &str) -> crate::parse::ParseOutcome {
        parse_str(&format!("{}\n{}\n", BITSTAMP_V1.header, row)).unwrap()
    }

    #[test]
    fn test_parse_market_buy() {
        let outcome = parse(r#"Market,"Jan. 27, 2017, 03:28 PM",Main Account,0.50000000 BTC,459.01 USD,918.02 USD,1.15 USD,Buy"#);
        let tx = &outcome.transactions[0];

        assert_eq!(tx.executed_at, Utc.with_ymd_and_hms(2017, 1, 27, 15, 28, 0).unwrap());
        assert_eq!((tx.base, tx.quote), (Currency::BTC, Currency::USD));
        assert_eq!(tx.action, Action::Buy);
        assert_eq!(tx.base_quantity, dec!(0.5));
        assert_eq!(tx.unit_price, dec!(918.02));
        assert_eq!(tx.fee_quote, dec!(1.15));
    }

    #[test]
    fn test_empty_value_and_fee() {
        let outcome = parse(r#"Market,"Feb. 03, 2018, 09:05 AM",Main Account,2.00000000 LTC, EUR,0.00 EUR, EUR,Sell"#);
        let tx = &outcome.transactions[0];
        assert_eq!(tx.action, Action::Sell);
        assert_eq!(tx.unit_price, dec!(0));
        assert_eq!(tx.fee_quote, dec!(0));
    }

    #[test]
    fn test_deposit_is_ignored() {
        let outcome = parse(r#"Deposit,"Jan. 20, 2017, 10:00 AM",Main Account,1.00000000 BTC,,,,"#);
        assert_eq!(outcome.errors[0].kind, RowErrorKind::Ignored);
        assert_eq!(outcome.errors[0].message, "Unsupported transaction type Deposit");
    }

    #[test]
    fn test_currency_mismatch() {
        let outcome = parse(r#"Market,"Jan. 27, 2017, 03:28 PM",Main Account,0.50000000 BTC,459.01 USD,918.02 EUR,1.15 USD,Buy"#);
        assert_eq!(outcome.errors[0].kind, RowErrorKind::Failed);
        assert_eq!(outcome.errors[0].message, CURRENCY_EQUALITY_MESSAGE);
    }

    #[test]
    fn test_zero_amount() {
        let outcome = parse(r#"Market,"Jan. 27, 2017, 03:28 PM",Main Account,0.00000000 BTC,459.01 USD,918.02 USD,1.15 USD,Buy"#);
        assert_eq!(outcome.errors[0].message, "BaseQuantity can not be zero.");
    }

    #[test]
    fn test_unsupported_pair() {
        let outcome = parse(r#"Market,"Jan. 27, 2017, 03:28 PM",Main Account,0.50000000 BTC,10.0 LTC,20.0 LTC,0.01 LTC,Buy"#);
        assert_eq!(outcome.errors[0].message, "Unsupported currency pair BTC/LTC");
    }
}
