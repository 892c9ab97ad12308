//! Aggregated depth book
//!
//! One item per price, holding the total open buy and sell quantity at that
//! price. Items are kept sorted by price descending; an item with both
//! quantities at zero is removed.

use serde::{Deserialize, Serialize};
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

/// Aggregated quantities at one price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthBookItem {
    pub price: Price,
    pub buy_quantity: Quantity,
    pub sell_quantity: Quantity,
}

impl DepthBookItem {
    fn new(price: Price) -> Self {
        Self {
            price,
            buy_quantity: Quantity::zero(),
            sell_quantity: Quantity::zero(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buy_quantity.is_zero() && self.sell_quantity.is_zero()
    }

    pub fn quantity(&self, side: Side) -> Quantity {
        match side {
            Side::BUY => self.buy_quantity,
            Side::SELL => self.sell_quantity,
        }
    }
}

/// Depth book of one product, prices strictly descending
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthBook {
    pub items: Vec<DepthBookItem>,
}

impl DepthBook {
    /// Create a new empty depth book
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Position of `price`, or where it would be inserted
    fn position(&self, price: Price) -> Result<usize, usize> {
        // reversed comparison keeps the search valid on a descending list
        self.items.binary_search_by(|item| price.cmp(&item.price))
    }

    /// Add the order's remaining quantity to its price level
    pub fn insert_order(&mut self, order: &Order) {
        self.add(order.price, order.side, order.remain_quantity);
    }

    /// Add `quantity` on `side` at `price`, creating the level if needed
    pub fn add(&mut self, price: Price, side: Side, quantity: Quantity) {
        let index = match self.position(price) {
            Ok(index) => index,
            Err(index) => {
                self.items.insert(index, DepthBookItem::new(price));
                index
            }
        };
        let item = &mut self.items[index];
        match side {
            Side::BUY => item.buy_quantity += quantity,
            Side::SELL => item.sell_quantity += quantity,
        }
    }

    /// Subtract filled quantities from the level at `index`
    ///
    /// The level is kept even when it becomes empty so callers walking the
    /// list by index decide when to drop it with `remove_if_empty`.
    pub fn sub(&mut self, index: usize, buy_quantity: Quantity, sell_quantity: Quantity) {
        if let Some(item) = self.items.get_mut(index) {
            item.buy_quantity = item.buy_quantity.saturating_sub(buy_quantity);
            item.sell_quantity = item.sell_quantity.saturating_sub(sell_quantity);
        }
    }

    /// Drop the level at `index` if both sides are empty
    ///
    /// Returns true if the level was removed
    pub fn remove_if_empty(&mut self, index: usize) -> bool {
        if self.items.get(index).is_some_and(DepthBookItem::is_empty) {
            self.items.remove(index);
            return true;
        }
        false
    }

    /// Remove the order's remaining quantity from its price level
    ///
    /// Returns true if the level existed
    pub fn remove_order(&mut self, order: &Order) -> bool {
        let Ok(index) = self.position(order.price) else {
            return false;
        };
        match order.side {
            Side::BUY => self.sub(index, order.remain_quantity, Quantity::zero()),
            Side::SELL => self.sub(index, Quantity::zero(), order.remain_quantity),
        }
        self.remove_if_empty(index);
        true
    }

    pub fn get(&self, price: Price) -> Option<&DepthBookItem> {
        self.position(price).ok().map(|index| &self.items[index])
    }

    /// Highest price with buy quantity and lowest price with sell quantity
    pub fn best_bid_and_ask(&self) -> (Option<Price>, Option<Price>) {
        let bid = self
            .items
            .iter()
            .find(|item| item.buy_quantity.is_positive())
            .map(|item| item.price);
        let ask = self
            .items
            .iter()
            .rev()
            .find(|item| item.sell_quantity.is_positive())
            .map(|item| item.price);
        (bid, ask)
    }

    /// Get depth snapshot (top N levels per side)
    ///
    /// Bids come highest price first, asks lowest price first.
    pub fn depth_snapshot(&self, depth: usize) -> (Vec<(Price, Quantity)>, Vec<(Price, Quantity)>) {
        let bids = self
            .items
            .iter()
            .filter(|item| item.buy_quantity.is_positive())
            .take(depth)
            .map(|item| (item.price, item.buy_quantity))
            .collect();
        let asks = self
            .items
            .iter()
            .rev()
            .filter(|item| item.sell_quantity.is_positive())
            .take(depth)
            .map(|item| (item.price, item.sell_quantity))
            .collect();
        (bids, asks)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the total number of price levels
    pub fn level_count(&self) -> usize {
        self.items.len()
    }
}
