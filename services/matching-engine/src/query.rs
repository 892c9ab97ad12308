//! Read-only views of engine state

use crate::errors::StoreError;
use crate::keeper::Keeper;
use crate::store::KvStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use types::ids::{OrderId, ProductId};
use types::numeric::{Price, Quantity};
use types::order::Order;
use types::trade::{BlockMatchResult, ProductLock};

/// Aggregated quantity at one price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub quantity: Quantity,
}

/// Top of a product's book: bids highest first, asks lowest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    pub product: Option<ProductId>,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStatistics {
    pub stored_order_num: i64,
    pub open_order_num: i64,
    /// Price levels per product
    pub depth_book_sizes: BTreeMap<ProductId, usize>,
    pub order_index_keys: usize,
}

pub fn order(keeper: &Keeper, store: &dyn KvStore, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
    keeper.get_order(store, order_id)
}

/// At most `depth` levels per side of `product`
pub fn depth_book(keeper: &Keeper, product: &ProductId, depth: usize) -> DepthSnapshot {
    let Some(book) = keeper.disk_cache().depth_book(product) else {
        return DepthSnapshot {
            product: Some(product.clone()),
            ..DepthSnapshot::default()
        };
    };
    let (bids, asks) = book.depth_snapshot(depth);
    let levels = |side: Vec<(Price, Quantity)>| -> Vec<BookLevel> {
        side.into_iter()
            .map(|(price, quantity)| BookLevel { price, quantity })
            .collect()
    };
    DepthSnapshot {
        product: Some(product.clone()),
        bids: levels(bids),
        asks: levels(asks),
    }
}

pub fn best_bid_and_ask(keeper: &Keeper, product: &ProductId) -> (Option<Price>, Option<Price>) {
    keeper
        .disk_cache()
        .depth_book(product)
        .map(|book| book.best_bid_and_ask())
        .unwrap_or((None, None))
}

pub fn store_statistics(keeper: &Keeper) -> StoreStatistics {
    let disk_cache = keeper.disk_cache();
    StoreStatistics {
        stored_order_num: disk_cache.store_order_num(),
        open_order_num: disk_cache.open_num(),
        depth_book_sizes: disk_cache.depth_book_sizes(),
        order_index_keys: disk_cache.order_index().len(),
    }
}

/// Auction outcomes of the current block, if any product traded
pub fn block_match_result(keeper: &Keeper) -> Option<BlockMatchResult> {
    keeper.cache().block_match_result().cloned()
}

pub fn product_lock(keeper: &Keeper, store: &dyn KvStore, product: &ProductId) -> Result<Option<ProductLock>, StoreError> {
    keeper.product_lock(store, product)
}
