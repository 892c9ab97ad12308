//! FIFO order index keyed by (product, price, side)
//!
//! Each key holds the ids of the open orders resting at that price on that
//! side, in placement order. Fills consume the queue from the front, so the
//! earliest order at a price is always served first.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use types::ids::{OrderId, ProductId};
use types::numeric::Price;
use types::order::{Order, Side};

/// Key of one FIFO queue, rendered `product:price:side`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderIdsKey {
    pub product: ProductId,
    pub price: Price,
    pub side: Side,
}

impl OrderIdsKey {
    pub fn new(product: ProductId, price: Price, side: Side) -> Self {
        Self { product, price, side }
    }

    pub fn for_order(order: &Order) -> Self {
        Self::new(order.product.clone(), order.price, order.side)
    }
}

impl fmt::Display for OrderIdsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.product, self.price, self.side)
    }
}

impl FromStr for OrderIdsKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(product), Some(price), Some(side), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("malformed order index key: {s}"));
        };
        Ok(Self {
            product: product.parse().map_err(|e| format!("{e}"))?,
            price: price.parse().map_err(|e| format!("{e}"))?,
            side: side.parse()?,
        })
    }
}

/// All FIFO queues of the exchange
#[derive(Debug, Clone, Default)]
pub struct OrderIndex {
    queues: BTreeMap<OrderIdsKey, VecDeque<OrderId>>,
}

impl OrderIndex {
    pub fn new() -> Self {
        Self {
            queues: BTreeMap::new(),
        }
    }

    /// Append an order id at the back of its queue (time priority)
    pub fn push_back(&mut self, key: OrderIdsKey, order_id: OrderId) {
        self.queues.entry(key).or_default().push_back(order_id);
    }

    /// Remove an order id from its queue, dropping the queue once empty
    ///
    /// Returns true if the id was found
    pub fn remove(&mut self, key: &OrderIdsKey, order_id: &OrderId) -> bool {
        let Some(queue) = self.queues.get_mut(key) else {
            return false;
        };
        let Some(position) = queue.iter().position(|id| id == order_id) else {
            return false;
        };
        queue.remove(position);
        if queue.is_empty() {
            self.queues.remove(key);
        }
        true
    }

    pub fn get(&self, key: &OrderIdsKey) -> Option<&VecDeque<OrderId>> {
        self.queues.get(key)
    }

    /// Replace the queue at `key`; an empty queue deletes the key
    pub fn set(&mut self, key: OrderIdsKey, ids: VecDeque<OrderId>) {
        if ids.is_empty() {
            self.queues.remove(&key);
        } else {
            self.queues.insert(key, ids);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &OrderIdsKey> {
        self.queues.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OrderIdsKey, &VecDeque<OrderId>)> {
        self.queues.iter()
    }

    /// Keys belonging to one product, in key order
    pub fn keys_for_product(&self, product: &ProductId) -> Vec<OrderIdsKey> {
        self.queues
            .keys()
            .filter(|key| &key.product == product)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
