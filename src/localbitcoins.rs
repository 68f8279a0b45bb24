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

const QUOTE_IS_BTC_MESSAGE: &str = "Quote currency can not be BTC.";

// id,created_at,buyer,seller,trade_type,btc_amount,btc_traded,fee_btc,btc_amount_less_fee,btc_final,
// fiat_amount,fiat_fee,fiat_per_btc,currency,exchange_rate,transaction_released_at,online_provider,reference
#[derive(Debug, Deserialize)]
struct LocalBitcoinsTrade {
    id: String,
    trade_type: String,
    btc_amount_less_fee: String,
    btc_final: String,
    fiat_amount: String,
    currency: String,
    transaction_released_at: String,
}

impl TryFrom<LocalBitcoinsTrade> for TradeDraft {
    type Error = DecodeError;

    fn try_from(item: LocalBitcoinsTrade) -> Result<Self, Self::Error> {
        let (action, quantity) = match item.trade_type.trim() {
            "ONLINE_BUY" => (Action::Buy, &item.btc_amount_less_fee),
            "ONLINE_SELL" => (Action::Sell, &item.btc_final),
            other => return Err(DecodeError::UnsupportedTransactionType(other.to_owned())),
        };
        let quote = coerce::currency(&item.currency)?;
        if quote == Currency::BTC {
            return Err(DecodeError::Invalid(QUOTE_IS_BTC_MESSAGE.to_owned()));
        }

        let executed_at = time::parse_with_offset(&item.transaction_released_at, "%Y-%m-%d %H:%M:%S%:z")?;
        let quantity = coerce::decimal("btc", quantity)?;
        let total = coerce::decimal("fiat_amount", &item.fiat_amount)?;

        // Trades settled in a crypto "fiat" column are read against that crypto instead
        Ok(TradeDraft::new(executed_at, (Currency::BTC, quote), Side::Explicit(action), quantity, Price::Total(total))
            .id(item.id)
            .allow_flip())
    }
}

pub(crate) fn decode_v1(headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
    decode_with(headers, record, |trade: LocalBitcoinsTrade| TradeDraft::try_from(trade)?.normalize())
}

#[distributed_slice(SCHEMAS)]
static LOCALBITCOINS_V1: Schema = Schema {
    id: "LocalBitcoinsV1",
    exchange: Exchange::LocalBitcoins,
    header: "id,created_at,buyer,seller,trade_type,btc_amount,btc_traded,fee_btc,btc_amount_less_fee,btc_final,\
             fiat_amount,fiat_fee,fiat_per_btc,currency,exchange_rate,transaction_released_at,online_provider,reference",
    delimiter: b',',
    decoder: RowDecoder::LocalBitcoinsV1,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::RowErrorKind, parse::parse_str};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn parse(row: &str) -> crate::parse::ParseOutcome {
        parse_str(&format!("{}\n{}\n", LOCALBITCOINS_V1.header, row)).unwrap()
    }

    #[test]
    fn test_parse_buy() {
        let outcome = parse("57963022,2020-03-17 16:57:32+00:00,Frankmaione,cnjoku,ONLINE_BUY,0.6747611,0.6747611,\
                             0.00674761,0.66801349,0.66801349,5000,50,7484.88,CAD,7410.03,2020-03-17 17:39:50+00:00,\
                             INTERAC,L57963022BYICJY");
        let tx = &outcome.transactions[0];

        assert_eq!(tx.external_id.as_deref(), Some("57963022"));
        assert_eq!(tx.executed_at, Utc.with_ymd_and_hms(2020, 3, 17, 17, 39, 50).unwrap());
        assert_eq!((tx.base, tx.quote), (Currency::BTC, Currency::CAD));
        assert_eq!(tx.action, Action::Buy);
        assert_eq!(tx.base_quantity, dec!(0.66801349));
        assert_eq!(tx.unit_price, dec!(7484.8787859060));
        assert_eq!(tx.fee_quote, dec!(0));
    }

    #[test]
    fn test_crypto_quote_is_flipped() {
        let outcome = parse("57963022,2020-03-17 16:57:32+00:00,Frankmaione,cnjoku,ONLINE_BUY,0.6747611,0.6747611,\
                             0.00674761,0.66801349,0.66801349,5000,50,7484.88,XRP,7410.03,2020-03-17 17:39:50+00:00,\
                             INTERAC,L57963022BYICJY");
        let tx = &outcome.transactions[0];
        assert_eq!((tx.base, tx.quote), (Currency::XRP, Currency::BTC));
        assert_eq!(tx.action, Action::Sell);
        assert_eq!(tx.base_quantity, dec!(5000));
        assert_eq!(tx.unit_price, dec!(0.0001336027));
    }

    #[test]
    fn test_parse_sell() {
        let outcome = parse("57965754,2020-03-17 18:02:46+00:00,thesimpleman243,Frankmaione,ONLINE_SELL,0.01515238,\
                             0.01500236,0.00015002,0.01500236,0.01515238,125,1.24,8332.02,CAD,8332.02,\
                             2020-03-17 18:05:15+00:00,INTERAC,L57965754BYIENU");
        let tx = &outcome.transactions[0];
        assert_eq!(tx.executed_at, Utc.with_ymd_and_hms(2020, 3, 17, 18, 5, 15).unwrap());
        assert_eq!(tx.action, Action::Sell);
        assert_eq!(tx.base_quantity, dec!(0.01515238));
        assert_eq!(tx.unit_price, dec!(8249.5291168780));
    }

    #[test]
    fn test_unknown_trade_type() {
        let outcome = parse("57965754,2020-03-17 18:02:46+00:00,thesimpleman243,Frankmaione,OFFLINE_SELL,0.01515238,\
                             0.01500236,0.00015002,0.01500236,0.01515238,125,1.24,8332.02,CAD,8332.02,\
                             2020-03-17 18:05:15+00:00,INTERAC,L57965754BYIENU");
        assert_eq!(outcome.errors[0].kind, RowErrorKind::Ignored);
        assert!(outcome.errors[0].message.contains("Unsupported transaction type OFFLINE_SELL"));
    }

    #[test]
    fn test_btc_quote() {
        let outcome = parse("57965754,2020-03-17 18:02:46+00:00,thesimpleman243,Frankmaione,ONLINE_SELL,0.01515238,\
                             0.01500236,0.00015002,0.01500236,0.01515238,125,1.24,8332.02,BTC,8332.02,\
                             2020-03-17 18:05:15+00:00,INTERAC,L57965754BYIENU");
        assert_eq!(outcome.errors[0].kind, RowErrorKind::Failed);
        assert!(outcome.errors[0].message.contains(QUOTE_IS_BTC_MESSAGE));
    }
}
