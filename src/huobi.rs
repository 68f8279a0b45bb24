use csv::StringRecord;
use linkme::distributed_slice;
use serde::Deserialize;

use crate::{
    base::{Action, Exchange},
    coerce,
    error::DecodeError,
    normalize::{Fee, FeePolicy, Normalized, Price, Side, TradeDraft},
    schema::{decode_with, RowDecoder, Schema, SCHEMAS},
    time,
};

// "Time","Type","Pair","Side","Price","Amount","Total","Fee"
// Rows end with a separator, leaving an unnamed trailing column.
#[derive(Debug, Deserialize)]
struct HuobiTrade {
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "Type")]
    type_: String,
    #[serde(rename = "Pair")]
    pair: String,
    #[serde(rename = "Side")]
    side: String,
    // #[serde(rename = "Price")]
    // price: String,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Total")]
    total: String,
    /// Written as `<amount><currency>`, e.g. `0.00178800LTC`
    #[serde(rename = "Fee")]
    fee: String,
}

impl TryFrom<HuobiTrade> for TradeDraft {
    type Error = DecodeError;

    fn try_from(item: HuobiTrade) -> Result<Self, Self::Error> {
        let executed_at = time::parse_date_time(&item.time)?;
        if item.type_.trim() != "Exchange" {
            return Err(DecodeError::UnsupportedType(item.type_.trim().to_owned()));
        }
        let pair = coerce::tradable(coerce::symbol_pair(&item.pair, '/')?)?;
        let action = Action::detect(&item.side)?;
        let amount = coerce::decimal("Amount", &item.amount)?;
        let total = coerce::decimal("Total", &item.total)?;
        let fee = coerce::amount("Fee", &item.fee)?;

        Ok(TradeDraft::new(executed_at, pair, Side::Explicit(action), amount, Price::Total(total))
            .fee(Fee::new(fee.quantity, &fee.currency))
            .fee_policy(FeePolicy::FoldIntoAmounts))
    }
}

pub(crate) fn decode_v1(headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
    decode_with(headers, record, |trade: HuobiTrade| TradeDraft::try_from(trade)?.normalize())
}

#[distributed_slice(SCHEMAS)]
static HUOBI_V1: Schema = Schema {
    id: "HuobiV1",
    exchange: Exchange::Huobi,
    header: "\u{feff}\"Time\",\"Type\",\"Pair\",\"Side\",\"Price\",\"Amount\",\"Total\",\"Fee\"",
    delimiter: b',',
    decoder: RowDecoder::HuobiV1,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{base::Currency, error::RowErrorKind, parse::parse_str};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn parse(row: &str) -> crate::parse::ParseOutcome {
        parse_str(&format!("{}\n{}\n", HUOBI_V1.header, row)).unwrap()
    }

    #[test]
    fn test_buy_with_base_fee() {
        let outcome = parse("2020-03-31 21:31:43,Exchange,LTC/BTC,Buy,0.006040,0.8940,0.0053,0.00178800LTC,");
        let tx = &outcome.transactions[0];

        assert_eq!(tx.external_id, None);
        assert_eq!(tx.executed_at, Utc.with_ymd_and_hms(2020, 3, 31, 21, 31, 43).unwrap());
        assert_eq!((tx.base, tx.quote), (Currency::LTC, Currency::BTC));
        assert_eq!(tx.action, Action::Buy);
        assert_eq!(tx.base_quantity, dec!(0.892212));
        assert_eq!(tx.unit_price, dec!(0.0059402922));
        assert_eq!(tx.fee_quote, dec!(0));
    }

    #[test]
    fn test_buy_with_quote_fee() {
        let outcome = parse("2020-03-31 21:31:43,Exchange,LTC/BTC,Buy,0.006040,0.8940,0.0053,0.00178800BTC,");
        let tx = &outcome.transactions[0];
        assert_eq!(tx.base_quantity, dec!(0.894));
        assert_eq!(tx.unit_price, dec!(0.0079284116));
    }

    #[test]
    fn test_sell_fees() {
        let quote_fee = parse("2020-03-31 21:31:24,Exchange,LTC/BTC,Sell,0.006036,0.7362,0.0044,0.00000888BTC,");
        let tx = &quote_fee.transactions[0];
        assert_eq!(tx.action, Action::Sell);
        assert_eq!(tx.base_quantity, dec!(0.7362));
        assert_eq!(tx.unit_price, dec!(0.0059645748));

        let base_fee = parse("2020-03-31 21:31:24,Exchange,LTC/BTC,Sell,0.006036,0.7362,0.0044,0.00000888LTC,");
        let tx = &base_fee.transactions[0];
        assert_eq!(tx.base_quantity, dec!(0.73620888));
        assert_eq!(tx.unit_price, dec!(0.0059765647));
    }

    #[test]
    fn test_third_currency_fee() {
        let outcome = parse("2020-03-31 21:31:43,Exchange,LTC/BTC,Buy,0.006040,0.8940,0.0053,0.00178800ETH,");
        let tx = &outcome.transactions[0];
        assert_eq!(tx.base_quantity, dec!(0.894));
        assert_eq!(tx.unit_price, dec!(0.0059284116));
        assert_eq!(outcome.ignored_fee_count, 1);

        let outcome = parse("2020-03-31 21:31:24,Exchange,LTC/BTC,Sell,0.006036,0.7362,0.0044,0.00000888XXX,");
        assert_eq!(outcome.ignored_fee_count, 1);
    }

    #[test]
    fn test_unknown_type() {
        let outcome = parse("2020-03-31 21:31:24,YYY,LTC/BTC,Sell,0.006036,0.7362,0.0044,0.00000888LTC,");
        assert_eq!(outcome.errors[0].kind, RowErrorKind::Ignored);
        assert!(outcome.errors[0].message.contains("Unsupported type YYY"));
    }

    #[test]
    fn test_unknown_side() {
        let outcome = parse("2020-03-31 21:31:24,Exchange,LTC/BTC,Deposit,0.006036,0.7362,0.0044,0.00000888LTC,");
        assert!(outcome.errors[0].message.contains("Unsupported transaction type Deposit"));

        let outcome = parse("2020-03-31 21:31:43,Exchange,LTC/BTC,Bought,0.006040,0.8940,0.0053,0.00178800LTC,");
        assert_eq!(outcome.ignored_row_count(), 1);
    }

    #[test]
    fn test_not_allowed_pair() {
        let outcome = parse("2020-03-31 21:31:24,Exchange,BTC/LTC,Sell,0.006036,0.7362,0.0044,0.00000888BTC,");
        assert_eq!(outcome.errors[0].kind, RowErrorKind::Failed);
        assert!(outcome.errors[0].message.contains("Unsupported currency pair BTC/LTC"));
    }

    #[test]
    fn test_fee_larger_than_trade() {
        let buy = parse("2020-03-31 21:31:43,Exchange,LTC/BTC,Buy,0.006040,0.8940,0.0053,1.00LTC,");
        assert!(buy.transactions.is_empty());
        assert_eq!(buy.errors[0].kind, RowErrorKind::Failed);
        assert_eq!(buy.errors[0].message, "Base quantity can not be negative.");

        let sell = parse("2020-03-31 21:31:24,Exchange,LTC/BTC,Sell,0.006036,0.7362,0.0044,0.0050BTC,");
        assert!(sell.transactions.is_empty());
        assert_eq!(sell.errors[0].message, "Total can not be negative.");
    }
}
