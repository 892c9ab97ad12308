//! Write-back cache of persistent book state
//!
//! Holds the depth books, the FIFO order index, last prices and the order
//! counters in memory. Mutations mark the touched entries dirty; the keeper
//! flushes the dirty set to storage once at the end of every block. Getters
//! hand out copies so callers never hold references into the cache while
//! mutating it.

use crate::book::{DepthBook, OrderIdsKey, OrderIndex};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use types::ids::{OrderId, ProductId};
use types::numeric::Price;
use types::order::Order;

#[derive(Debug, Clone, Default)]
pub struct DiskCache {
    depth_books: BTreeMap<ProductId, DepthBook>,
    /// Books changed this block, flushed at block end
    updated_books: BTreeSet<ProductId>,
    /// Books that received a new order this block, matched at block end
    new_books: BTreeSet<ProductId>,
    order_index: OrderIndex,
    updated_index_keys: BTreeSet<OrderIdsKey>,
    last_prices: BTreeMap<ProductId, Price>,
    store_order_num: i64,
    open_num: i64,
    closed_order_ids: Vec<OrderId>,
}

impl DiskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from hydrated storage contents
    pub(crate) fn from_parts(
        depth_books: BTreeMap<ProductId, DepthBook>,
        order_index: OrderIndex,
    ) -> Self {
        Self {
            depth_books,
            order_index,
            ..Self::default()
        }
    }

    /// Forget the dirty sets and the closed ids of the previous block
    pub fn reset(&mut self) {
        self.closed_order_ids.clear();
        self.updated_books.clear();
        self.new_books.clear();
        self.updated_index_keys.clear();
    }

    /// Add a newly placed order to its book and queue
    pub fn insert_order(&mut self, order: &Order) {
        let product = order.product.clone();
        self.depth_books.entry(product.clone()).or_default().insert_order(order);
        self.updated_books.insert(product.clone());
        self.new_books.insert(product);

        let key = OrderIdsKey::for_order(order);
        self.order_index.push_back(key.clone(), order.order_id);
        self.updated_index_keys.insert(key);

        self.open_num += 1;
        self.store_order_num += 1;
    }

    /// Take a closing order out of its book and queue
    pub fn remove_order(&mut self, order: &Order) {
        if let Some(book) = self.depth_books.get_mut(&order.product) {
            book.remove_order(order);
            self.updated_books.insert(order.product.clone());
        }
        let key = OrderIdsKey::for_order(order);
        self.order_index.remove(&key, &order.order_id);
        self.updated_index_keys.insert(key);
        self.close_order(order.order_id);
    }

    /// Record a closed order for deletion in the next block
    pub fn close_order(&mut self, order_id: OrderId) {
        self.closed_order_ids.push(order_id);
        self.open_num -= 1;
    }

    pub fn depth_book(&self, product: &ProductId) -> Option<DepthBook> {
        self.depth_books.get(product).cloned()
    }

    pub fn set_depth_book(&mut self, product: &ProductId, book: DepthBook) {
        self.depth_books.insert(product.clone(), book);
        self.updated_books.insert(product.clone());
    }

    pub fn order_ids(&self, key: &OrderIdsKey) -> VecDeque<OrderId> {
        self.order_index.get(key).cloned().unwrap_or_default()
    }

    pub fn set_order_ids(&mut self, key: &OrderIdsKey, ids: VecDeque<OrderId>) {
        self.order_index.set(key.clone(), ids);
        self.updated_index_keys.insert(key.clone());
    }

    pub(crate) fn order_index(&self) -> &OrderIndex {
        &self.order_index
    }

    /// Products that received orders this block, in symbol order
    pub fn new_depth_book_products(&self) -> Vec<ProductId> {
        self.new_books.iter().cloned().collect()
    }

    /// Every product with a depth book
    pub fn products(&self) -> Vec<ProductId> {
        self.depth_books.keys().cloned().collect()
    }

    pub(crate) fn updated_books(&self) -> Vec<ProductId> {
        self.updated_books.iter().cloned().collect()
    }

    pub(crate) fn updated_index_keys(&self) -> Vec<OrderIdsKey> {
        self.updated_index_keys.iter().cloned().collect()
    }

    /// Drop an emptied book from memory after it was deleted from storage
    pub(crate) fn forget_depth_book(&mut self, product: &ProductId) {
        self.depth_books.remove(product);
    }

    pub fn last_price(&self, product: &ProductId) -> Option<Price> {
        self.last_prices.get(product).copied()
    }

    pub fn set_last_price(&mut self, product: &ProductId, price: Price) {
        self.last_prices.insert(product.clone(), price);
    }

    pub fn closed_order_ids(&self) -> Vec<OrderId> {
        self.closed_order_ids.clone()
    }

    pub fn open_num(&self) -> i64 {
        self.open_num
    }

    pub fn set_open_num(&mut self, num: i64) {
        self.open_num = num;
    }

    pub fn store_order_num(&self) -> i64 {
        self.store_order_num
    }

    pub fn set_store_order_num(&mut self, num: i64) {
        self.store_order_num = num;
    }

    /// Account for stored orders deleted after their close
    pub fn decrease_store_order_num(&mut self, num: i64) {
        self.store_order_num -= num;
    }

    pub fn depth_book_sizes(&self) -> BTreeMap<ProductId, usize> {
        self.depth_books
            .iter()
            .map(|(product, book)| (product.clone(), book.level_count()))
            .collect()
    }
}
