//! Identifier types for exchange entities
//!
//! Order identifiers are derived from the block height and the per-block
//! placement sequence, so every replica assigns the same id to the same
//! order. The canonical text form is `ID<height, 10 digits>-<sequence>`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error produced when parsing an identifier from its text form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdParseError {
    #[error("order id must start with 'ID': {0}")]
    MissingPrefix(String),

    #[error("order id must be ID<height>-<sequence>: {0}")]
    Malformed(String),

    #[error("product symbol must be BASE_QUOTE: {0}")]
    InvalidProduct(String),
}

/// Unique identifier for an order
///
/// Ordered by `(height, sequence)`, which is also the placement order.
/// The sequence starts at 1 for the first order of every block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId {
    pub height: i64,
    pub sequence: u64,
}

impl OrderId {
    pub fn new(height: i64, sequence: u64) -> Self {
        Self { height, sequence }
    }

    /// Block height at which the order was created
    pub fn height(&self) -> i64 {
        self.height
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID{:010}-{}", self.height, self.sequence)
    }
}

impl FromStr for OrderId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix("ID")
            .ok_or_else(|| IdParseError::MissingPrefix(s.to_string()))?;
        let (height, sequence) = body
            .split_once('-')
            .ok_or_else(|| IdParseError::Malformed(s.to_string()))?;
        let height = height
            .parse::<i64>()
            .map_err(|_| IdParseError::Malformed(s.to_string()))?;
        let sequence = sequence
            .parse::<u64>()
            .map_err(|_| IdParseError::Malformed(s.to_string()))?;
        Ok(Self { height, sequence })
    }
}

/// Account address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Product identifier (trading pair)
///
/// Format: "BASE_QUOTE" (e.g., "btc_usdt"). Buy orders lock the quote
/// denomination, sell orders lock the base denomination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a new ProductId from a string
    ///
    /// # Panics
    /// Panics if the format is invalid (must be BASE_QUOTE)
    pub fn new(symbol: impl Into<String>) -> Self {
        let s = symbol.into();
        assert!(Self::is_valid(&s), "ProductId must be in BASE_QUOTE format");
        Self(s)
    }

    /// Try to create a ProductId, returning None if invalid
    pub fn try_new(symbol: impl Into<String>) -> Option<Self> {
        let s = symbol.into();
        if Self::is_valid(&s) {
            Some(Self(s))
        } else {
            None
        }
    }

    fn is_valid(s: &str) -> bool {
        matches!(s.split_once('_'), Some((base, quote))
            if !base.is_empty() && !quote.is_empty() && !quote.contains('_'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into base and quote denominations
    pub fn split(&self) -> (&str, &str) {
        self.0.split_once('_').unwrap_or((self.0.as_str(), ""))
    }

    pub fn base(&self) -> &str {
        self.split().0
    }

    pub fn quote(&self) -> &str {
        self.split().1
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProductId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_new(s).ok_or_else(|| IdParseError::InvalidProduct(s.to_string()))
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
