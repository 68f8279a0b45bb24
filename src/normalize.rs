use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    base::{Action, Currency, CurrencyPair, Transaction},
    coerce::{self, non_zero, round_scale},
    error::DecodeError,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Side {
    Explicit(Action),
    /// Positive quantity buys, negative sells.
    BySign,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Price {
    Unit(Decimal),
    /// Value of the whole trade in the quote currency.
    Total(Decimal),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum FeePolicy {
    /// A fee in a third currency is dropped and counted.
    IgnoreUnmatched,
    /// A fee in the base or quote currency is netted into the quantity or
    /// the total instead of being reported; a third currency is dropped and counted.
    FoldIntoAmounts,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fee {
    pub amount: Decimal,
    /// `None` for a currency outside the known set.
    pub currency: Option<Currency>,
}

impl Fee {
    pub(crate) fn new(amount: Decimal, currency: &str) -> Self {
        Fee {
            amount,
            currency: currency.trim().to_uppercase().parse().ok(),
        }
    }

    pub(crate) fn in_currency(amount: Decimal, currency: Currency) -> Self {
        Fee {
            amount,
            currency: Some(currency),
        }
    }
}

/// A decoded row on its way to a [`Transaction`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TradeDraft {
    pub external_id: Option<String>,
    pub executed_at: DateTime<Utc>,
    pub base: Currency,
    pub quote: Currency,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Price,
    pub fee: Option<Fee>,
    pub fee_policy: FeePolicy,
    pub allow_flip: bool,
}

/// Outcome of normalizing one row.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub transaction: Transaction,
    pub ignored_fee: bool,
}

impl TradeDraft {
    pub(crate) fn new(
        executed_at: DateTime<Utc>,
        (base, quote): (Currency, Currency),
        side: Side,
        quantity: Decimal,
        price: Price,
    ) -> Self {
        TradeDraft {
            external_id: None,
            executed_at,
            base,
            quote,
            side,
            quantity,
            price,
            fee: None,
            fee_policy: FeePolicy::IgnoreUnmatched,
            allow_flip: false,
        }
    }

    pub(crate) fn id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.external_id = if id.trim().is_empty() { None } else { Some(id.trim().to_owned()) };
        self
    }

    pub(crate) fn fee(mut self, fee: Fee) -> Self {
        self.fee = Some(fee);
        self
    }

    pub(crate) fn fee_policy(mut self, policy: FeePolicy) -> Self {
        self.fee_policy = policy;
        self
    }

    /// Allows reading a pair with a crypto quote the other way round when
    /// only the reversed pair is tradable.
    pub(crate) fn allow_flip(mut self) -> Self {
        self.allow_flip = true;
        self
    }

    pub(crate) fn normalize(self) -> Result<Normalized, DecodeError> {
        let mut action = match self.side {
            Side::Explicit(action) => action,
            Side::BySign if self.quantity.is_sign_negative() => Action::Sell,
            Side::BySign => Action::Buy,
        };
        let mut quantity = self.quantity.abs();
        let mut pair = CurrencyPair::new(self.base, self.quote);
        let mut price = self.price;

        if !pair.is_tradable() {
            let reversed = pair.reversed();
            if self.allow_flip && !pair.quote.is_fiat() && reversed.is_tradable() {
                let total = match price {
                    Price::Unit(unit) => coerce::mul("Total", unit.abs(), quantity)?,
                    Price::Total(total) => total.abs(),
                };
                price = Price::Total(quantity);
                quantity = total;
                pair = reversed;
                action = action.opposite();
            } else {
                return Err(DecodeError::UnsupportedCurrencyPair(pair.to_string()));
            }
        }

        if self.fee_policy == FeePolicy::FoldIntoAmounts {
            return fold_fee(self.external_id, self.executed_at, pair, action, quantity, price, self.fee);
        }

        let quantity = non_zero("Base quantity", quantity)?;
        let unit_price = match price {
            Price::Unit(unit) => unit.abs(),
            Price::Total(total) => round_scale(coerce::div("Unit price", total.abs(), quantity)?),
        };

        let mut ignored_fee = false;
        let fee_quote = match self.fee {
            None => Decimal::ZERO,
            Some(fee) if fee.amount.is_zero() => Decimal::ZERO,
            Some(fee) if fee.currency == Some(pair.quote) => fee.amount.abs(),
            Some(fee) if fee.currency == Some(pair.base) => round_scale(coerce::mul("Fee", fee.amount.abs(), unit_price)?),
            Some(_) => {
                ignored_fee = true;
                Decimal::ZERO
            }
        };

        Ok(Normalized {
            transaction: Transaction {
                external_id: self.external_id,
                executed_at: self.executed_at,
                base: pair.base,
                quote: pair.quote,
                action,
                base_quantity: quantity,
                unit_price,
                fee_quote,
            },
            ignored_fee,
        })
    }
}

fn fold_fee(
    external_id: Option<String>,
    executed_at: DateTime<Utc>,
    pair: CurrencyPair,
    action: Action,
    quantity: Decimal,
    price: Price,
    fee: Option<Fee>,
) -> Result<Normalized, DecodeError> {
    let mut quantity = quantity;
    let mut total = match price {
        Price::Unit(unit) => coerce::mul("Total", unit.abs(), quantity)?,
        Price::Total(total) => total.abs(),
    };
    let mut ignored_fee = false;

    if let Some(fee) = fee.filter(|fee| !fee.amount.is_zero()) {
        let amount = fee.amount.abs();
        match (action, fee.currency) {
            (Action::Buy, Some(currency)) if currency == pair.base => quantity -= amount,
            (Action::Buy, Some(currency)) if currency == pair.quote => total = coerce::add("Total", total, amount)?,
            (Action::Sell, Some(currency)) if currency == pair.base => quantity = coerce::add("Base quantity", quantity, amount)?,
            (Action::Sell, Some(currency)) if currency == pair.quote => total -= amount,
            _ => ignored_fee = true,
        }
    }

    // A fee larger than the traded amount leaves nothing to report
    let quantity = coerce::positive("Base quantity", quantity)?;
    if total.is_sign_negative() && !total.is_zero() {
        return Err(DecodeError::Negative("Total"));
    }
    Ok(Normalized {
        transaction: Transaction {
            external_id,
            executed_at,
            base: pair.base,
            quote: pair.quote,
            action,
            base_quantity: quantity,
            unit_price: round_scale(coerce::div("Unit price", total, quantity)?),
            fee_quote: Decimal::ZERO,
        },
        ignored_fee,
    })
}
