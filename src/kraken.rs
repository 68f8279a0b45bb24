use chrono::{DateTime, Utc};
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

/// Normalize Kraken currency codes to standard format.
///
/// Kraken uses special prefixes for currencies:
/// - `X` prefix for crypto (XXBT = BTC, XETH = ETH, XXDG = DOGE)
/// - `Z` prefix for fiat (ZEUR = EUR, ZUSD = USD, ZCHF = CHF)
/// - Some assets have no prefix (DASH, EOS, USDT)
fn normalize_currency(currency: &str) -> &str {
    match currency {
        "XXBT" | "XBT" => "BTC",
        "XXDG" | "XDG" => "DOGE",
        "XETH" => "ETH",
        "XXRP" => "XRP",
        "XLTC" => "LTC",
        "XXLM" => "XLM",
        "XXMR" => "XMR",
        "XZEC" => "ZEC",
        "XETC" => "ETC",
        "ZEUR" => "EUR",
        "ZUSD" => "USD",
        "ZGBP" => "GBP",
        "ZJPY" => "JPY",
        "ZCAD" => "CAD",
        "ZAUD" => "AUD",
        "ZCHF" => "CHF",
        // Four letter codes with an X/Z prefix, e.g. XBCH
        other if other.len() == 4 && (other.starts_with('X') || other.starts_with('Z')) => &other[1..],
        other => other,
    }
}

/// Splits a Kraken pair like `XXBTZEUR`, `XETHXXBT` or `DASHEUR` into base and quote codes.
///
/// Classic pairs are two four-letter codes. Newer pairs are tried against
/// every split point until both sides resolve to a known currency.
fn parse_pair(pair: &str) -> Result<(String, String), DecodeError> {
    let pair = pair.trim();
    if pair.len() == 8 && pair.is_ascii() {
        let (base, quote) = pair.split_at(4);
        let (base, quote) = (normalize_currency(base), normalize_currency(quote));
        if coerce::currency(base).is_ok() && coerce::currency(quote).is_ok() {
            return Ok((base.to_owned(), quote.to_owned()));
        }
    }

    (3..pair.len().saturating_sub(2))
        .filter(|&mid| pair.is_char_boundary(mid))
        .map(|mid| pair.split_at(mid))
        .map(|(base, quote)| (normalize_currency(base), normalize_currency(quote)))
        .find(|(base, quote)| coerce::currency(base).is_ok() && coerce::currency(quote).is_ok())
        .map(|(base, quote)| (base.to_owned(), quote.to_owned()))
        .ok_or_else(|| DecodeError::UnparseablePairSymbol(pair.to_owned()))
}

// Kraken format: "2024-01-15 10:30:45.1234" or "2024-01-15T10:30:45Z"
fn parse_kraken_datetime(raw: &str) -> Result<DateTime<Utc>, DecodeError> {
    time::parse_fixed(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| time::parse_fixed(raw, "%Y-%m-%dT%H:%M:%SZ"))
        .or_else(|_| time::parse_detected(raw))
}

/// Kraken trades CSV record
/// Headers: txid,ordertxid,pair,time,type,ordertype,price,cost,fee,vol,margin,misc,ledgers
#[derive(Debug, Deserialize)]
struct KrakenTrade {
    #[serde(rename = "txid")]
    tx_id: String,
    // ordertxid: String,  // Not needed
    pair: String,
    time: String,
    #[serde(rename = "type")]
    trade_type: String,
    // ordertype: String,  // Not needed
    // price: String,      // Derived from cost/vol
    cost: String,
    fee: String,
    vol: String,
    // margin: String,     // Not needed for spot trades
    // misc: String,
    // ledgers: String,
}

impl TryFrom<KrakenTrade> for TradeDraft {
    type Error = DecodeError;

    fn try_from(trade: KrakenTrade) -> Result<Self, Self::Error> {
        let action = Action::detect(&trade.trade_type)?;
        let (base, quote) = parse_pair(&trade.pair)?;
        let pair = coerce::pair(&base, &quote)?;
        let executed_at = parse_kraken_datetime(&trade.time)?;
        let cost = coerce::decimal("cost", &trade.cost)?;
        let vol = coerce::decimal("vol", &trade.vol)?;
        // The trades export has no fee currency column; spot fees are charged in the quote currency
        let fee = coerce::decimal("fee", &trade.fee)?;

        Ok(TradeDraft::new(executed_at, pair, Side::Explicit(action), vol, Price::Total(cost))
            .id(trade.tx_id)
            .fee(Fee::in_currency(fee, pair.1)))
    }
}

pub(crate) fn decode_v1(headers: &StringRecord, record: &StringRecord) -> Result<Normalized, DecodeError> {
    decode_with(headers, record, |trade: KrakenTrade| TradeDraft::try_from(trade)?.normalize())
}

#[distributed_slice(SCHEMAS)]
static KRAKEN_V1: Schema = Schema {
    id: "KrakenV1",
    exchange: Exchange::Kraken,
    header: "txid,ordertxid,pair,time,type,ordertype,price,cost,fee,vol,margin,misc,ledgers",
    delimiter: b',',
    decoder: RowDecoder::KrakenV1,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{base::Currency, parse::parse_str};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn parse(row: &str) -> crate::parse::ParseOutcome {
        parse_str(&format!("{}\n{}\n", KRAKEN_V1.header, row)).unwrap()
    }

    #[test]
    fn test_normalize_currency() {
        assert_eq!(normalize_currency("XXBT"), "BTC");
        assert_eq!(normalize_currency("XBT"), "BTC");
        assert_eq!(normalize_currency("XETH"), "ETH");
        assert_eq!(normalize_currency("ZEUR"), "EUR");
        assert_eq!(normalize_currency("ZUSD"), "USD");
        assert_eq!(normalize_currency("XXDG"), "DOGE");
        // Four letter codes lose their prefix
        assert_eq!(normalize_currency("XBCH"), "BCH");
        // Short codes are kept
        assert_eq!(normalize_currency("XRP"), "XRP");
        assert_eq!(normalize_currency("EOS"), "EOS");
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("XXBTZEUR").unwrap(), ("BTC".to_owned(), "EUR".to_owned()));
        assert_eq!(parse_pair("XETHXXBT").unwrap(), ("ETH".to_owned(), "BTC".to_owned()));
        assert_eq!(parse_pair("XLTCZUSD").unwrap(), ("LTC".to_owned(), "USD".to_owned()));
        assert_eq!(parse_pair("DASHEUR").unwrap(), ("DASH".to_owned(), "EUR".to_owned()));
        assert_eq!(parse_pair("EOSXBT").unwrap(), ("EOS".to_owned(), "BTC".to_owned()));
        assert_eq!(parse_pair("USDTZUSD").unwrap(), ("USDT".to_owned(), "USD".to_owned()));
        assert_eq!(parse_pair("DOTUSD"), Err(DecodeError::UnparseablePairSymbol("DOTUSD".to_owned())));
    }

    #[test]
    fn test_parse_trade_buy() {
        let outcome = parse(r#""ABC123","ORD456","XXBTZEUR","2024-01-15 10:30:45.1234","buy","limit","40000.0","400.00","0.10","0.01","0.0","","""#);
        let tx = &outcome.transactions[0];

        assert_eq!(tx.external_id.as_deref(), Some("ABC123"));
        assert_eq!(
            tx.executed_at,
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap() + chrono::Duration::microseconds(123_400)
        );
        assert_eq!((tx.base, tx.quote), (Currency::BTC, Currency::EUR));
        assert_eq!(tx.action, Action::Buy);
        assert_eq!(tx.base_quantity, dec!(0.01));
        assert_eq!(tx.unit_price, dec!(40000));
        assert_eq!(tx.fee_quote, dec!(0.10));
    }

    #[test]
    fn test_parse_trade_sell() {
        let outcome = parse(r#""DEF789","ORD012","XETHXXBT","2024-01-16 14:20:00.0000","sell","market","0.05","0.15","0.0003","3","0.0","","""#);
        let tx = &outcome.transactions[0];
        assert_eq!((tx.base, tx.quote), (Currency::ETH, Currency::BTC));
        assert_eq!(tx.action, Action::Sell);
        assert_eq!(tx.unit_price, dec!(0.05));
        assert_eq!(tx.fee_quote, dec!(0.0003));
    }

    #[test]
    fn test_margin_trade_type_is_ignored() {
        let outcome = parse(r#""GHI345","ORD678","XXBTZEUR","2024-01-16 14:20:00.0000","settle","market","41000.0","410.00","0.15","0.01","0.0","","""#);
        assert_eq!(outcome.ignored_row_count(), 1);
        assert!(outcome.errors[0].message.contains("Unsupported transaction type settle"));
    }
}
