//! Error types shared by the order engine and its collaborators
//!
//! Every user-facing rejection carries a stable numeric code so batch
//! results can be reported per item. Code 0 means success.

use crate::account::LockKind;
use crate::ids::{OrderId, ProductId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by a ledger operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("insufficient {denom}: required {required}, available {available}")]
    InsufficientBalance {
        denom: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("insufficient locked {denom} ({kind:?}): required {required}, locked {locked}")]
    InsufficientLocked {
        denom: String,
        kind: LockKind,
        required: Decimal,
        locked: Decimal,
    },

    #[error("negative amount {amount} of {denom}")]
    NegativeAmount { denom: String, amount: Decimal },

    #[error("invalid coin: {0}")]
    InvalidCoin(String),
}

/// Order placement and cancellation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("product {product} does not exist")]
    ProductNotExist { product: ProductId },

    #[error("product {product} is being delisted")]
    ProductDelisting { product: ProductId },

    #[error("price {price} exceeds price precision {precision}")]
    PriceOverAccuracy { price: Decimal, precision: u32 },

    #[error("quantity {quantity} exceeds quantity precision {precision}")]
    QuantityOverAccuracy { quantity: Decimal, precision: u32 },

    #[error("quantity {quantity} is below the minimum {min}")]
    QuantityBelowMinimum { quantity: Decimal, min: Decimal },

    #[error("price must be positive: {price}")]
    InvalidPrice { price: Decimal },

    #[error("notional of {quantity} at {price} is out of range")]
    NotionalOverflow { price: Decimal, quantity: Decimal },

    #[error("batch must contain at least one item")]
    EmptyBatch,

    #[error("batch contains {count} items, limit is {limit}")]
    BatchTooLarge { count: usize, limit: usize },

    #[error("order id {order_id} appears more than once")]
    DuplicateOrderId { order_id: OrderId },

    #[error("order {order_id} does not exist")]
    OrderNotFound { order_id: OrderId },

    #[error("order {order_id} is not open: {status}")]
    OrderNotOpen { order_id: OrderId, status: String },

    #[error("order {order_id} does not belong to {sender}")]
    NotOrderOwner { order_id: OrderId, sender: String },

    #[error("product {product} is locked by an unfinished match, try later")]
    ProductLocked { product: ProductId },

    #[error("insufficient funds: {0}")]
    InsufficientFunds(#[from] LedgerError),
}

impl OrderError {
    /// Stable code reported in per-item batch results
    pub fn code(&self) -> u32 {
        match self {
            OrderError::ProductNotExist { .. } => 1,
            OrderError::ProductDelisting { .. } => 2,
            OrderError::PriceOverAccuracy { .. } => 3,
            OrderError::QuantityOverAccuracy { .. } => 4,
            OrderError::QuantityBelowMinimum { .. } => 5,
            OrderError::InvalidPrice { .. } => 6,
            OrderError::EmptyBatch => 7,
            OrderError::BatchTooLarge { .. } => 8,
            OrderError::DuplicateOrderId { .. } => 9,
            OrderError::OrderNotFound { .. } => 10,
            OrderError::OrderNotOpen { .. } => 11,
            OrderError::NotOrderOwner { .. } => 12,
            OrderError::ProductLocked { .. } => 13,
            OrderError::InsufficientFunds(_) => 14,
            OrderError::NotionalOverflow { .. } => 15,
        }
    }

    /// Concurrency rejections succeed if retried after the lock clears
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrderError::ProductLocked { .. })
    }
}
