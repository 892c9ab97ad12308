//! Fixed-point decimal types for prices and quantities
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Rounding to a product precision is HALF_UP (midpoint away from zero);
//! divisions are carried to 18 fractional digits.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use thiserror::Error;

/// Fractional digits kept for the results of division
pub const DEC_PRECISION: u32 = 18;

/// Error produced when a numeric value cannot be constructed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumericError {
    #[error("not a decimal number: {0}")]
    Parse(String),

    #[error("price must be positive: {0}")]
    NonPositivePrice(Decimal),

    #[error("quantity must not be negative: {0}")]
    NegativeQuantity(Decimal),
}

/// Round a decimal to `precision` fractional digits, HALF_UP
pub fn round_to(value: Decimal, precision: u32) -> Decimal {
    value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
}

/// True when `value` carries no digits beyond `precision`
pub fn fits_precision(value: Decimal, precision: u32) -> bool {
    round_to(value, precision) == value
}

/// Limit price of an order, or a clearing price
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Wrap a decimal without validation (used for derived prices)
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Create a price, rejecting zero and negative values
    pub fn try_new(value: Decimal) -> Result<Self, NumericError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(NumericError::NonPositivePrice(value))
        }
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Round to the product price precision
    pub fn round_to(&self, precision: u32) -> Self {
        Self(round_to(self.0, precision))
    }

    pub fn fits_precision(&self, precision: u32) -> bool {
        fits_precision(self.0, precision)
    }
}

impl FromStr for Price {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s).map_err(|_| NumericError::Parse(s.to_string()))?;
        Self::try_new(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Price {
    /// Notional value of `quantity` at this price, `None` on overflow
    pub fn checked_notional(&self, quantity: Quantity) -> Option<Decimal> {
        self.0.checked_mul(quantity.0)
    }
}

/// Notional value of `quantity` at `price`
impl Mul<Quantity> for Price {
    type Output = Decimal;

    fn mul(self, rhs: Quantity) -> Decimal {
        self.0 * rhs.0
    }
}

/// Order size, remaining size or aggregated level size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Wrap a decimal without validation
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Create a quantity, rejecting negative values
    pub fn try_new(value: Decimal) -> Result<Self, NumericError> {
        if value.is_sign_negative() && !value.is_zero() {
            Err(NumericError::NegativeQuantity(value))
        } else {
            Ok(Self(value))
        }
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Subtract, clamping at zero
    pub fn saturating_sub(self, rhs: Quantity) -> Quantity {
        if rhs.0 >= self.0 {
            Quantity::zero()
        } else {
            Quantity(self.0 - rhs.0)
        }
    }

    pub fn round_to(&self, precision: u32) -> Self {
        Self(round_to(self.0, precision))
    }

    pub fn fits_precision(&self, precision: u32) -> bool {
        fits_precision(self.0, precision)
    }
}

impl FromStr for Quantity {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s).map_err(|_| NumericError::Parse(s.to_string()))?;
        Self::try_new(value)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        self.0 += rhs.0;
    }
}

/// Plain subtraction; callers check ordering when the result must stay non-negative
impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 - rhs.0)
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Quantity) {
        self.0 -= rhs.0;
    }
}
