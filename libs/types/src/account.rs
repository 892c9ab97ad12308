//! Coin and balance types
//!
//! A balance keeps the funds an order engine has reserved apart from the
//! spendable amount: order principal and placement fees are locked
//! separately so each can be checked against open-order obligations.

use crate::errors::LedgerError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An amount of a single denomination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Decimal,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: Decimal) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn zero(denom: impl Into<String>) -> Self {
        Self::new(denom, Decimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

/// Rendered as `<amount><denom>`, e.g. `0.2592okt`
impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount.normalize(), self.denom)
    }
}

impl FromStr for Coin {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .find(|c: char| c.is_ascii_alphabetic())
            .ok_or_else(|| LedgerError::InvalidCoin(s.to_string()))?;
        let (amount, denom) = s.split_at(split);
        let amount = Decimal::from_str(amount).map_err(|_| LedgerError::InvalidCoin(s.to_string()))?;
        Ok(Self::new(denom, amount))
    }
}

/// Purpose of a lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockKind {
    /// Order principal (quote for buys, base for sells)
    Quantity,
    /// Placement fee reserved at order creation
    Fee,
}

/// Balance of a single denomination
///
/// Invariant: total = available + locked_quantity + locked_fee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub denom: String,
    pub available: Decimal,
    pub locked_quantity: Decimal,
    pub locked_fee: Decimal,
}

impl Balance {
    pub fn new(denom: impl Into<String>, available: Decimal) -> Self {
        Self {
            denom: denom.into(),
            available,
            locked_quantity: Decimal::ZERO,
            locked_fee: Decimal::ZERO,
        }
    }

    pub fn total(&self) -> Decimal {
        self.available + self.locked_quantity + self.locked_fee
    }

    pub fn locked(&self, kind: LockKind) -> Decimal {
        match kind {
            LockKind::Quantity => self.locked_quantity,
            LockKind::Fee => self.locked_fee,
        }
    }

    fn locked_mut(&mut self, kind: LockKind) -> &mut Decimal {
        match kind {
            LockKind::Quantity => &mut self.locked_quantity,
            LockKind::Fee => &mut self.locked_fee,
        }
    }

    /// Move `amount` from available into the `kind` lock
    pub fn lock(&mut self, amount: Decimal, kind: LockKind) -> Result<(), LedgerError> {
        check_amount(&self.denom, amount)?;
        if amount > self.available {
            return Err(LedgerError::InsufficientBalance {
                denom: self.denom.clone(),
                required: amount,
                available: self.available,
            });
        }
        self.available -= amount;
        *self.locked_mut(kind) += amount;
        Ok(())
    }

    /// Move `amount` from the `kind` lock back to available
    pub fn unlock(&mut self, amount: Decimal, kind: LockKind) -> Result<(), LedgerError> {
        self.take_locked(amount, kind)?;
        self.available += amount;
        Ok(())
    }

    /// Remove `amount` from the `kind` lock without crediting it anywhere
    pub fn deduct_locked(&mut self, amount: Decimal, kind: LockKind) -> Result<(), LedgerError> {
        self.take_locked(amount, kind)
    }

    /// Remove `amount` from available without crediting it anywhere
    pub fn deduct(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        check_amount(&self.denom, amount)?;
        if amount > self.available {
            return Err(LedgerError::InsufficientBalance {
                denom: self.denom.clone(),
                required: amount,
                available: self.available,
            });
        }
        self.available -= amount;
        Ok(())
    }

    pub fn credit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        check_amount(&self.denom, amount)?;
        self.available += amount;
        Ok(())
    }

    fn take_locked(&mut self, amount: Decimal, kind: LockKind) -> Result<(), LedgerError> {
        check_amount(&self.denom, amount)?;
        let locked = self.locked(kind);
        if amount > locked {
            return Err(LedgerError::InsufficientLocked {
                denom: self.denom.clone(),
                kind,
                required: amount,
                locked,
            });
        }
        *self.locked_mut(kind) -= amount;
        Ok(())
    }
}

fn check_amount(denom: &str, amount: Decimal) -> Result<(), LedgerError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LedgerError::NegativeAmount {
            denom: denom.to_string(),
            amount,
        });
    }
    Ok(())
}
