use std::{fmt, path::Path};

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::DecodeError;

/// Currencies known to the importer. Anything else is rejected at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum Currency {
    // fiat
    USD,
    EUR,
    CZK,
    CAD,
    GBP,
    AUD,
    CHF,
    JPY,
    // crypto
    BTC,
    ETH,
    LTC,
    BCH,
    XRP,
    XMR,
    DASH,
    ZEC,
    ETC,
    XLM,
    EOS,
    DOGE,
    BNB,
    USDT,
}

impl Currency {
    pub fn is_fiat(self) -> bool {
        matches!(
            self,
            Currency::USD
                | Currency::EUR
                | Currency::CZK
                | Currency::CAD
                | Currency::GBP
                | Currency::AUD
                | Currency::CHF
                | Currency::JPY
        )
    }

    pub fn code(self) -> &'static str {
        self.into()
    }
}

/// A base/quote combination. Rendered as `BASE/QUOTE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: Currency,
    pub quote: Currency,
}

impl CurrencyPair {
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }

    pub fn reversed(self) -> Self {
        Self { base: self.quote, quote: self.base }
    }

    /// Membership in the allow-list of tradable pairs.
    ///
    /// Every crypto trades against every fiat currency. Cross-crypto pairs
    /// are limited to BTC, ETH and USDT quotes.
    pub fn is_tradable(self) -> bool {
        let CurrencyPair { base, quote } = self;
        if base == quote || base.is_fiat() {
            return false;
        }
        if quote.is_fiat() {
            return true;
        }
        match quote {
            Currency::BTC => true,
            Currency::ETH => base != Currency::BTC,
            Currency::USDT => true,
            _ => false,
        }
    }

    pub fn tradable_pairs() -> impl Iterator<Item = CurrencyPair> {
        Currency::iter()
            .flat_map(|base| Currency::iter().map(move |quote| CurrencyPair::new(base, quote)))
            .filter(|pair| pair.is_tradable())
    }

    /// Looks up a tradable pair written without separator, e.g. `BTCUSDT`.
    pub fn from_concatenated(symbol: &str) -> Option<CurrencyPair> {
        Self::tradable_pairs().find(|pair| {
            symbol.len() == pair.base.code().len() + pair.quote.code().len()
                && symbol.starts_with(pair.base.code())
                && symbol.ends_with(pair.quote.code())
        })
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    /// Maps the common `buy`/`sell` vocabulary, ignoring case.
    pub fn detect(value: &str) -> Result<Action, DecodeError> {
        if value.eq_ignore_ascii_case("buy") {
            Ok(Action::Buy)
        } else if value.eq_ignore_ascii_case("sell") {
            Ok(Action::Sell)
        } else {
            Err(DecodeError::UnsupportedTransactionType(value.to_owned()))
        }
    }

    pub fn opposite(self) -> Action {
        match self {
            Action::Buy => Action::Sell,
            Action::Sell => Action::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Exchange {
    #[strum(to_string = "EveryTrade")]
    EveryTrade,
    #[strum(to_string = "Binance")]
    Binance,
    #[strum(to_string = "BitMEX")]
    Bitmex,
    #[strum(to_string = "Bitstamp")]
    Bitstamp,
    #[strum(to_string = "Bittrex")]
    Bittrex,
    #[strum(to_string = "Coinbase")]
    Coinbase,
    #[strum(to_string = "Coinsquare")]
    Coinsquare,
    #[strum(to_string = "General Bytes")]
    GeneralBytes,
    #[strum(to_string = "Huobi")]
    Huobi,
    #[strum(to_string = "Kraken")]
    Kraken,
    #[strum(to_string = "LocalBitcoins")]
    LocalBitcoins,
    #[strum(to_string = "OKEx")]
    Okex,
    #[strum(to_string = "Paxful")]
    Paxful,
}

/// A quantity with a not yet resolved currency label, as found in compound
/// "value currency" columns.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Amount {
    pub quantity: Decimal,
    pub currency: String,
}

impl TryFrom<&str> for Amount {
    type Error = &'static str;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        // This parses the formats '<amount> <currency>' and '<amount><currency>'
        let s = s.trim();
        let mut quantity_str = s.trim_end_matches(|c: char| c.is_ascii_alphabetic());
        let currency = &s[quantity_str.len()..];
        quantity_str = quantity_str.trim_end();

        // Strip commas when necessary, since Decimal::try_from doesn't like those
        let quantity_owned: String;
        if quantity_str.contains(',') {
            quantity_owned = quantity_str.replace(',', "");
            quantity_str = quantity_owned.as_str();
        }

        if currency.is_empty() {
            return Err("Invalid format, expected: '<amount> <currency>' or '<amount><currency>'");
        }

        // An empty numeric part reads as zero
        let quantity = if quantity_str.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::from_str_exact(quantity_str)
                .or_else(|_| Decimal::from_scientific(quantity_str))
                .map_err(|_| "Invalid format, expected: '<amount> <currency>' or '<amount><currency>'")?
        };

        Ok(Amount { quantity, currency: currency.to_uppercase() })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.quantity.normalize(), self.currency)
    }
}

/// The canonical trade record every schema converges to.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Transaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub executed_at: DateTime<Utc>,
    pub base: Currency,
    pub quote: Currency,
    pub action: Action,
    pub base_quantity: Decimal,
    pub unit_price: Decimal,
    pub fee_quote: Decimal,
}

impl Transaction {
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.base, self.quote)
    }

    /// Value of the trade in the quote currency, excluding the fee. `None`
    /// when the product does not fit a `Decimal`.
    pub fn total_quote(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(self.base_quantity)
    }
}

pub fn save_transactions_to_json(transactions: &[Transaction], output_path: impl AsRef<Path>) -> Result<()> {
    tracing::info!("Saving {}", output_path.as_ref().display());

    let json = serde_json::to_string_pretty(&transactions)?;
    std::fs::write(output_path, json)?;

    Ok(())
}

pub fn load_transactions_from_json(input_path: &Path) -> Result<Vec<Transaction>> {
    let json = std::fs::read_to_string(input_path)?;
    let transactions: Vec<Transaction> = serde_json::from_str(&json)?;
    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_amount_with_space() {
        let amount = Amount::try_from("0.0416 USDT").unwrap();
        assert_eq!(amount.quantity, dec!(0.0416));
        assert_eq!(amount.currency, "USDT");
    }

    #[test]
    fn parse_amount_without_space() {
        let amount = Amount::try_from("0.00178800LTC").unwrap();
        assert_eq!(amount.quantity, dec!(0.001788));
        assert_eq!(amount.currency, "LTC");
    }

    #[test]
    fn parse_amount_with_empty_quantity() {
        let amount = Amount::try_from(" USD").unwrap();
        assert_eq!(amount.quantity, Decimal::ZERO);
        assert_eq!(amount.currency, "USD");
    }

    #[test]
    fn parse_amount_without_currency() {
        assert!(Amount::try_from("12.5").is_err());
    }

    #[test]
    fn tradable_pairs() {
        assert!(CurrencyPair::new(Currency::BTC, Currency::CZK).is_tradable());
        assert!(CurrencyPair::new(Currency::LTC, Currency::BTC).is_tradable());
        assert!(CurrencyPair::new(Currency::XRP, Currency::BTC).is_tradable());
        assert!(CurrencyPair::new(Currency::BTC, Currency::USDT).is_tradable());
        assert!(!CurrencyPair::new(Currency::BTC, Currency::LTC).is_tradable());
        assert!(!CurrencyPair::new(Currency::BTC, Currency::ETH).is_tradable());
        assert!(!CurrencyPair::new(Currency::ETH, Currency::DASH).is_tradable());
        assert!(!CurrencyPair::new(Currency::XMR, Currency::XRP).is_tradable());
        assert!(!CurrencyPair::new(Currency::EUR, Currency::USD).is_tradable());
        assert!(!CurrencyPair::new(Currency::BTC, Currency::BTC).is_tradable());
    }

    #[test]
    fn pair_display() {
        assert_eq!(CurrencyPair::new(Currency::ETH, Currency::DASH).to_string(), "ETH/DASH");
    }

    #[test]
    fn concatenated_pairs() {
        assert_eq!(
            CurrencyPair::from_concatenated("BTCUSDT"),
            Some(CurrencyPair::new(Currency::BTC, Currency::USDT))
        );
        assert_eq!(
            CurrencyPair::from_concatenated("DASHBTC"),
            Some(CurrencyPair::new(Currency::DASH, Currency::BTC))
        );
        assert_eq!(
            CurrencyPair::from_concatenated("USDTBTC"),
            Some(CurrencyPair::new(Currency::USDT, Currency::BTC))
        );
        assert_eq!(CurrencyPair::from_concatenated("ETHDASH"), None);
        assert_eq!(CurrencyPair::from_concatenated("BTCETH"), None);
        assert_eq!(CurrencyPair::from_concatenated("FOOBAR"), None);
    }

    #[test]
    fn detect_action() {
        assert_eq!(Action::detect("BUY"), Ok(Action::Buy));
        assert_eq!(Action::detect("sell"), Ok(Action::Sell));
        assert_eq!(
            Action::detect("WITHDRAW"),
            Err(DecodeError::UnsupportedTransactionType("WITHDRAW".to_owned()))
        );
    }

    #[test]
    fn total_quote() {
        let mut tx = Transaction {
            external_id: None,
            executed_at: DateTime::UNIX_EPOCH,
            base: Currency::BTC,
            quote: Currency::EUR,
            action: Action::Buy,
            base_quantity: dec!(0.5),
            unit_price: dec!(40000),
            fee_quote: Decimal::ZERO,
        };
        assert_eq!(tx.total_quote(), Some(dec!(20000)));

        tx.base_quantity = Decimal::MAX;
        assert_eq!(tx.total_quote(), None);
    }
}
