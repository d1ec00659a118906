//! Money types with precise decimal arithmetic
//!
//! The clinic bills in Brazilian reais only. Amounts are kept at currency
//! scale (two decimal places) to match the `NUMERIC(12, 2)` storage columns,
//! and are converted to integer centavos when handed to the boleto provider.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use thiserror::Error;

/// ISO 4217 code of the only currency the ledger holds
pub const CURRENCY_CODE: &str = "BRL";

/// Decimal places of the currency scale
const SCALE: u32 = 2;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Overflow during calculation")]
    Overflow,
}

/// A monetary amount in BRL at currency scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    amount: Decimal,
}

impl Money {
    /// Creates a new Money value, rounding half away from zero to two places
    pub fn new(amount: Decimal) -> Self {
        Self {
            amount: amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero),
        }
    }

    /// Creates a non-negative Money value
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::InvalidAmount` for negative amounts
    pub fn non_negative(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::InvalidAmount(format!(
                "amount must not be negative, got {}",
                amount
            )));
        }
        Ok(Self::new(amount))
    }

    /// Creates Money from an integer amount of centavos
    pub fn from_minor(minor_units: i64) -> Self {
        Self::new(Decimal::new(minor_units, SCALE))
    }

    /// Creates a zero amount
    pub fn zero() -> Self {
        Self { amount: dec!(0) }
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Converts to integer centavos, truncating anything below one centavo
    ///
    /// `1500.50` becomes `150050`. The multiplication is exact decimal
    /// arithmetic, so no binary floating-point drift can lose a centavo.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        (self.amount * dec!(100))
            .trunc()
            .to_i64()
            .ok_or(MoneyError::Overflow)
    }

    /// Checked addition
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.amount
            .checked_add(other.amount)
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }

    /// Checked subtraction
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.amount
            .checked_sub(other.amount)
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R$ {:.2}", self.amount)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money::new(self.amount + other.amount)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money::new(self.amount - other.amount)
    }
}
