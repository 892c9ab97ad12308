//! Order lifecycle types
//!
//! An order is created Open with its whole principal locked. Fills move it
//! towards Filled; a user cancellation or the expiry sweep closes it early.
//! Closed orders stay in storage for one more block before deletion.

use crate::account::Coin;
use crate::fee::FeeType;
use crate::ids::{AccountId, OrderId, ProductId};
use crate::numeric::{round_to, Price, Quantity, DEC_PRECISION};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid), locks the quote denomination
    BUY,
    /// Sell order (ask), locks the base denomination
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::BUY => write!(f, "BUY"),
            Side::SELL => write!(f, "SELL"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Side::BUY),
            "SELL" => Ok(Side::SELL),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

/// Order status
///
/// State ids are stable and used when orders are reported externally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// State 0: resting in the depth book
    Open,
    /// State 1: completely matched (terminal)
    Filled,
    /// State 2: cancelled before any fill (terminal)
    Cancelled,
    /// State 3: expired before any fill (terminal)
    Expired,
    /// State 4: cancelled after a partial fill (terminal)
    PartialFilledCancelled,
    /// State 5: expired after a partial fill (terminal)
    PartialFilledExpired,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Open)
    }

    pub fn state_id(&self) -> u8 {
        match self {
            OrderStatus::Open => 0,
            OrderStatus::Filled => 1,
            OrderStatus::Cancelled => 2,
            OrderStatus::Expired => 3,
            OrderStatus::PartialFilledCancelled => 4,
            OrderStatus::PartialFilledExpired => 5,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderStatus::Open => "Open",
            OrderStatus::Filled => "Filled",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Expired => "Expired",
            OrderStatus::PartialFilledCancelled => "PartialFilledCancelled",
            OrderStatus::PartialFilledExpired => "PartialFilledExpired",
        };
        write!(f, "{name}")
    }
}

/// Complete order record as persisted under `order/<id>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub sender: AccountId,
    pub product: ProductId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub status: OrderStatus,
    /// Quantity-weighted average of fill prices
    pub filled_avg_price: Decimal,
    pub remain_quantity: Quantity,
    /// Principal still locked for this order, in the locked denomination
    pub remain_locked: Decimal,
    pub timestamp: i64,
    /// Expiry horizon captured at placement
    pub order_expire_blocks: i64,
    /// Holding fee rate captured at placement
    pub fee_per_block: Coin,
    /// Free-form annotations (fee records)
    pub extra_info: BTreeMap<String, String>,
}

impl Order {
    /// Create a new open order; the id is assigned when it is placed
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sender: AccountId,
        product: ProductId,
        side: Side,
        price: Price,
        quantity: Quantity,
        timestamp: i64,
        order_expire_blocks: i64,
        fee_per_block: Coin,
    ) -> Self {
        let remain_locked = match side {
            Side::BUY => price * quantity,
            Side::SELL => quantity.as_decimal(),
        };
        Self {
            order_id: OrderId::default(),
            sender,
            product,
            side,
            price,
            quantity,
            status: OrderStatus::Open,
            filled_avg_price: Decimal::ZERO,
            remain_quantity: quantity,
            remain_locked,
            timestamp,
            order_expire_blocks,
            fee_per_block,
            extra_info: BTreeMap::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    pub fn filled_quantity(&self) -> Quantity {
        self.quantity - self.remain_quantity
    }

    /// Denomination the principal is locked in
    pub fn locked_denom(&self) -> &str {
        match self.side {
            Side::BUY => self.product.quote(),
            Side::SELL => self.product.base(),
        }
    }

    /// Principal to lock at placement
    pub fn need_lock_coin(&self) -> Coin {
        let amount = match self.side {
            Side::BUY => self.price * self.quantity,
            Side::SELL => self.quantity.as_decimal(),
        };
        Coin::new(self.locked_denom(), amount)
    }

    /// Principal still locked, to be returned on close
    pub fn need_unlock_coin(&self) -> Coin {
        Coin::new(self.locked_denom(), self.remain_locked)
    }

    /// Apply a fill of `amount` at `price`
    ///
    /// # Panics
    /// Panics if the order is closed or the fill exceeds the remaining quantity
    pub fn fill(&mut self, price: Price, amount: Quantity) {
        assert!(self.is_open(), "Cannot fill closed order");
        assert!(amount <= self.remain_quantity, "Fill would exceed order quantity");

        let filled_sum = self.filled_avg_price * self.filled_quantity().as_decimal() + price * amount;
        self.remain_quantity -= amount;
        let filled = self.filled_quantity().as_decimal();
        if !filled.is_zero() {
            self.filled_avg_price = round_to(filled_sum / filled, DEC_PRECISION);
        }
        self.remain_locked -= match self.side {
            Side::BUY => price * amount,
            Side::SELL => amount.as_decimal(),
        };
        if self.remain_quantity.is_zero() {
            self.status = OrderStatus::Filled;
        }
    }

    /// Close the order on user request
    ///
    /// # Panics
    /// Panics if order is already in terminal state
    pub fn cancel(&mut self) {
        assert!(self.is_open(), "Cannot cancel terminal order");
        self.status = if self.remain_quantity == self.quantity {
            OrderStatus::Cancelled
        } else {
            OrderStatus::PartialFilledCancelled
        };
    }

    /// Close the order at the end of its lifetime
    ///
    /// # Panics
    /// Panics if order is already in terminal state
    pub fn expire(&mut self) {
        assert!(self.is_open(), "Cannot expire terminal order");
        self.status = if self.remain_quantity == self.quantity {
            OrderStatus::Expired
        } else {
            OrderStatus::PartialFilledExpired
        };
    }

    /// Mark the remaining principal as returned
    pub fn unlock(&mut self) {
        self.remain_locked = Decimal::ZERO;
    }

    /// Record a fee in the annotations; trade fees add up across fills
    pub fn record_fee(&mut self, kind: FeeType, fee: &Coin) {
        let key = kind.annotation_key();
        let value = match (kind.accumulates(), self.fee(kind)) {
            (true, Some(prev)) if prev.denom == fee.denom => Coin::new(fee.denom.clone(), prev.amount + fee.amount),
            _ => fee.clone(),
        };
        self.extra_info.insert(key.to_string(), value.to_string());
    }

    /// Read back a recorded fee
    pub fn fee(&self, kind: FeeType) -> Option<Coin> {
        self.extra_info
            .get(kind.annotation_key())
            .and_then(|raw| raw.parse().ok())
    }
}
