//! Error types for the matching engine
//!
//! User-facing rejections are `OrderError` from the types crate. Everything
//! here is fatal for the operation that raised it.

use thiserror::Error;
use types::errors::OrderError;
use types::ids::OrderId;

/// Top-level engine error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("order error: {0}")]
    Order(#[from] OrderError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Whether the error only rejects one batch item
    pub fn is_item_rejection(&self) -> bool {
        matches!(self, EngineError::Order(_))
    }
}

/// Storage corruption or inconsistency
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("failed to decode {key}: {reason}")]
    Codec { key: String, reason: String },

    #[error("order {order_id} is indexed but not stored")]
    MissingOrder { order_id: OrderId },

    #[error("malformed key {key}: {reason}")]
    MalformedKey { key: String, reason: String },
}

/// Invalid engine parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid parameter {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to parse parameters: {0}")]
    Parse(String),
}

/// Locked funds disagree with open-order obligations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvariantError {
    #[error("locked {kind} of {denom} is {locked}, open orders require {expected}")]
    LockedFundsMismatch {
        kind: &'static str,
        denom: String,
        locked: String,
        expected: String,
    },

    #[error("open order count {counted} differs from stored counter {stored}")]
    OpenCountMismatch { counted: i64, stored: i64 },

    #[error("depth book of {product} disagrees with its open orders at {price}")]
    DepthBookMismatch { product: String, price: String },

    #[error("store error during invariant check: {0}")]
    Store(#[from] StoreError),
}
