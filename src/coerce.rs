//! Field-level conversions shared by the row decoders.

use std::str::FromStr;

use rust_decimal::prelude::*;

use crate::{
    base::{Amount, Currency, CurrencyPair},
    error::DecodeError,
};

pub(crate) const SCALE: u32 = 10;

/// Rounds a derived value (unit price, converted fee) to the canonical scale.
pub(crate) fn round_scale(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub(crate) fn currency(value: &str) -> Result<Currency, DecodeError> {
    let value = value.trim();
    Currency::from_str(value).map_err(|_| DecodeError::UnknownCurrency(value.to_owned()))
}

/// Resolves both sides of a pair, reporting the pair as a whole when either is unknown.
pub(crate) fn pair(base: &str, quote: &str) -> Result<(Currency, Currency), DecodeError> {
    let (base, quote) = (base.trim(), quote.trim());
    match (Currency::from_str(base), Currency::from_str(quote)) {
        (Ok(base), Ok(quote)) => Ok((base, quote)),
        _ => Err(DecodeError::UnsupportedCurrencyPair(format!("{base}/{quote}"))),
    }
}

/// Splits a symbol like `BTC/CZK` into exactly two non-empty parts.
pub(crate) fn split_symbol(symbol: &str, separator: char) -> Result<(&str, &str), DecodeError> {
    let mut parts = symbol.trim().split(separator);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => Ok((base, quote)),
        _ => Err(DecodeError::UnparseablePairSymbol(symbol.to_owned())),
    }
}

/// Rejects pairs outside the tradable allow-list before any other cross-field check.
pub(crate) fn tradable((base, quote): (Currency, Currency)) -> Result<(Currency, Currency), DecodeError> {
    let pair = CurrencyPair::new(base, quote);
    if pair.is_tradable() {
        Ok((base, quote))
    } else {
        Err(DecodeError::UnsupportedCurrencyPair(pair.to_string()))
    }
}

pub(crate) fn symbol_pair(symbol: &str, separator: char) -> Result<(Currency, Currency), DecodeError> {
    let (base, quote) = split_symbol(symbol, separator)?;
    pair(base, quote)
}

/// Empty values read as zero.
pub(crate) fn decimal(field: &'static str, value: &str) -> Result<Decimal, DecodeError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str_exact(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|_| DecodeError::InvalidNumber { field, value: value.to_owned() })
}

/// Drops everything except digits, the decimal point and the minus sign before parsing.
pub(crate) fn stripped_decimal(field: &'static str, value: &str) -> Result<Decimal, DecodeError> {
    let cleaned: String = value.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-').collect();
    decimal(field, &cleaned).map_err(|_| DecodeError::InvalidNumber { field, value: value.to_owned() })
}

pub(crate) fn non_zero(field: &'static str, value: Decimal) -> Result<Decimal, DecodeError> {
    if value.is_zero() {
        Err(DecodeError::Zero(field))
    } else {
        Ok(value)
    }
}

/// Values that are zero or below are rejected.
pub(crate) fn positive(field: &'static str, value: Decimal) -> Result<Decimal, DecodeError> {
    let value = non_zero(field, value)?;
    if value.is_sign_negative() {
        Err(DecodeError::Negative(field))
    } else {
        Ok(value)
    }
}

// Arithmetic on row values fails the row instead of panicking on overflow
pub(crate) fn mul(field: &'static str, a: Decimal, b: Decimal) -> Result<Decimal, DecodeError> {
    a.checked_mul(b).ok_or(DecodeError::Overflow(field))
}

pub(crate) fn div(field: &'static str, a: Decimal, b: Decimal) -> Result<Decimal, DecodeError> {
    a.checked_div(b).ok_or(DecodeError::Overflow(field))
}

pub(crate) fn add(field: &'static str, a: Decimal, b: Decimal) -> Result<Decimal, DecodeError> {
    a.checked_add(b).ok_or(DecodeError::Overflow(field))
}

/// Parses a compound "<amount> <currency>" column.
pub(crate) fn amount(field: &'static str, value: &str) -> Result<Amount, DecodeError> {
    Amount::try_from(value).map_err(|_| DecodeError::InvalidNumber { field, value: value.to_owned() })
}
