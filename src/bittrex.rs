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

// OrderUuid,Exchange,Type,Quantity,Limit,CommissionPaid,Price,Opened,Closed
#[derive(Debug, Deserialize)]
struct BittrexOrder {
    #[serde(rename = "OrderUuid")]
    order_uuid: String,
    /// Market as `<quote_currency>-<base_currency>`
    #[serde(rename = "Exchange")]
    exchange: String,
    #[serde(rename = "Type")]
    type_: String,
    #[serde(rename = "Quantity")]
    quantity: String,
    // #[serde(rename = "Limit")]
    // limit: String,
    #[serde(rename = "CommissionPaid")]
    commission_paid: String,
    /// Total paid or received in the quote currency
    #[serde(rename = "Price")]
    price: String,
    // #[serde(rename = "Opened")]
    // opened: String,
    #[serde(rename = "Closed")]
    closed: String,
}

fn order_side(type_: &str) -> Result<Action, DecodeError> {
    match type_ {
        "LIMIT_BUY" | "MARKET_BUY" => Ok(Action::Buy),
        "LIMIT_SELL" | "MARKET_SELL" => Ok(Action::Sell),
        other => Err(DecodeError::UnsupportedTransactionType(other.to_owned())),
    }
}

impl TryFrom<BittrexOrder> for TradeDraft {
    type Error = DecodeError;

    fn try_from(item: BittrexOrder) -> Result<Self, Self::Error> {
        let action = order_side(item.type_.trim())?;
        let (quote, base) = coerce::split_symbol(&item.exchange, '-')?;
        let pair = coerce::pair(base, quote)?;
        let executed_at = time::parse_detected(&item.closed)?;
        let quantity = coerce::decimal("Quantity", &item.quantity)?;
        let total = coerce::decimal("Price", &item.price)?;
        let commission = coerce::decimal("CommissionPaid", &item.commission_paid)?;

        Ok(TradeDraft::new(executed_at, pair, Side::Explicit(action), quantity, Price::Total(total))
            .id(item.order_uuid)
            .fee(Fee::in_currency(commission, pair.1)))
    }
}

pub(crate) fn decode_v1(headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
    decode_with(headers, record, |order: BittrexOrder| TradeDraft::try_from(order)?.normalize())
}

#[distributed_slice(SCHEMAS)]
static BITTREX_V1: Schema = Schema {
    id: "BittrexV1",
    exchange: Exchange::Bittrex,
    header: "OrderUuid,Exchange,Type,Quantity,Limit,CommissionPaid,Price,Opened,Closed",
    delimiter: b',',
    decoder: RowDecoder::BittrexV1,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{base::Currency, error::RowErrorKind, parse::parse_str};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn parse(row: &str) -> crate::parse::ParseOutcome {
        parse_str(&format!("{}\r\n{}\r\n", BITTREX_V1.header, row)).unwrap()
    }

    #[test]
    fn test_parse_limit_buy() {
        let outcome = parse("c04f1b4a-1b5e-4d0c-a8c5-9d1b7a0e5d11,BTC-LTC,LIMIT_BUY,10.00000000,0.01500000,0.00037500,0.15000000,12/17/2017 11:40:02 PM,12/17/2017 11:41:28 PM");
        let tx = &outcome.transactions[0];

        assert_eq!(tx.external_id.as_deref(), Some("c04f1b4a-1b5e-4d0c-a8c5-9d1b7a0e5d11"));
        assert_eq!(tx.executed_at, Utc.with_ymd_and_hms(2017, 12, 17, 23, 41, 28).unwrap());
        assert_eq!((tx.base, tx.quote), (Currency::LTC, Currency::BTC));
        assert_eq!(tx.action, Action::Buy);
        assert_eq!(tx.base_quantity, dec!(10));
        assert_eq!(tx.unit_price, dec!(0.015));
        assert_eq!(tx.fee_quote, dec!(0.000375));
    }

    #[test]
    fn test_parse_market_sell() {
        let outcome = parse("f1,USDT-ETH,MARKET_SELL,2,,0.5,800,1/2/2018 8:00:00 AM,1/2/2018 8:00:01 AM");
        let tx = &outcome.transactions[0];
        assert_eq!((tx.base, tx.quote), (Currency::ETH, Currency::USDT));
        assert_eq!(tx.action, Action::Sell);
        assert_eq!(tx.unit_price, dec!(400));
    }

    #[test]
    fn test_unsupported_order_type() {
        let outcome = parse("f1,USDT-ETH,CONDITIONAL_SELL,2,,0.5,800,1/2/2018 8:00:00 AM,1/2/2018 8:00:01 AM");
        assert_eq!(outcome.errors[0].kind, RowErrorKind::Ignored);
        assert_eq!(outcome.errors[0].message, "Unsupported transaction type CONDITIONAL_SELL");
    }

    #[test]
    fn test_invalid_market() {
        let outcome = parse("f1,USDTETH,LIMIT_SELL,2,,0.5,800,1/2/2018 8:00:00 AM,1/2/2018 8:00:01 AM");
        assert_eq!(outcome.errors[0].message, "Can not parse pair symbol USDTETH.");
    }
}
