//! Storage key layout
//!
//! Heights are zero-padded to 20 digits so that lexicographic key order is
//! numeric order.

use crate::book::OrderIdsKey;
use types::ids::{OrderId, ProductId};

pub const ORDER_PREFIX: &[u8] = b"order/";
pub const DEPTH_BOOK_PREFIX: &[u8] = b"depthbook/";
pub const ORDER_INDEX_PREFIX: &[u8] = b"orderindex/";
pub const LAST_PRICE_PREFIX: &[u8] = b"lastprice/";
pub const EXPIRY_BUCKET_PREFIX: &[u8] = b"expirybucket/";
pub const ORDER_COUNT_PREFIX: &[u8] = b"ordercount/";
pub const PRODUCT_LOCK_PREFIX: &[u8] = b"productlock/";

pub const LAST_EXPIRED_HEIGHT_KEY: &[u8] = b"lastexpiredheight";
pub const OPEN_ORDER_COUNT_KEY: &[u8] = b"openordercount";
pub const STORED_ORDER_COUNT_KEY: &[u8] = b"storedordercount";
pub const RECENTLY_CLOSED_KEY: &[u8] = b"recentlyclosed";

fn with_prefix(prefix: &[u8], suffix: &str) -> Vec<u8> {
    let mut key = prefix.to_vec();
    key.extend_from_slice(suffix.as_bytes());
    key
}

fn padded_height(height: i64) -> String {
    format!("{:020}", height.max(0))
}

pub fn order_key(order_id: &OrderId) -> Vec<u8> {
    with_prefix(ORDER_PREFIX, &order_id.to_string())
}

pub fn depth_book_key(product: &ProductId) -> Vec<u8> {
    with_prefix(DEPTH_BOOK_PREFIX, product.as_str())
}

pub fn order_index_key(key: &OrderIdsKey) -> Vec<u8> {
    with_prefix(ORDER_INDEX_PREFIX, &key.to_string())
}

pub fn last_price_key(product: &ProductId) -> Vec<u8> {
    with_prefix(LAST_PRICE_PREFIX, product.as_str())
}

pub fn expiry_bucket_key(height: i64) -> Vec<u8> {
    with_prefix(EXPIRY_BUCKET_PREFIX, &padded_height(height))
}

pub fn order_count_key(height: i64) -> Vec<u8> {
    with_prefix(ORDER_COUNT_PREFIX, &padded_height(height))
}

pub fn product_lock_key(product: &ProductId) -> Vec<u8> {
    with_prefix(PRODUCT_LOCK_PREFIX, product.as_str())
}

/// Text that follows `prefix` in `key`
pub fn suffix<'a>(key: &'a [u8], prefix: &[u8]) -> Option<&'a str> {
    key.strip_prefix(prefix).and_then(|rest| std::str::from_utf8(rest).ok())
}
