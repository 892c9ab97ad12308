//! Order keeper
//!
//! Owns the per-block `Cache` and the write-back `DiskCache`, and is the
//! only component that reads or writes the engine's storage keys. Order
//! lifecycle operations live in `orders`.

mod orders;

use crate::book::{DepthBook, OrderIdsKey, OrderIndex};
use crate::cache::Cache;
use crate::config::EngineParams;
use crate::context::BlockContext;
use crate::disk_cache::DiskCache;
use crate::errors::{ConfigError, StoreError};
use crate::store::{self, keys, KvStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info};
use types::ids::{OrderId, ProductId};
use types::numeric::Price;
use types::order::Order;
use types::trade::ProductLock;

/// Order operation counters of the current block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMetric {
    pub full_fill_num: i64,
    pub partial_fill_num: i64,
    pub open_num: i64,
    pub cancel_num: i64,
    pub expire_num: i64,
}

pub struct Keeper {
    params: EngineParams,
    pub(crate) cache: Cache,
    pub(crate) disk_cache: DiskCache,
    hydrated: bool,
}

impl Keeper {
    pub fn new(params: EngineParams) -> Self {
        Self {
            params,
            cache: Cache::new(),
            disk_cache: DiskCache::new(),
            hydrated: false,
        }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn set_params(&mut self, params: EngineParams) -> Result<(), ConfigError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn disk_cache(&self) -> &DiskCache {
        &self.disk_cache
    }

    /// Load depth books and order queues from storage, once per process
    pub fn ensure_hydrated(&mut self, store: &dyn KvStore) -> Result<(), StoreError> {
        if self.hydrated {
            return Ok(());
        }

        let mut depth_books = BTreeMap::new();
        for (key, value) in store.prefix_scan(keys::DEPTH_BOOK_PREFIX) {
            let product: ProductId = parse_suffix(&key, keys::DEPTH_BOOK_PREFIX)?;
            let book: DepthBook = store::decode(&key, &value)?;
            depth_books.insert(product, book);
        }

        let mut order_index = OrderIndex::new();
        for (key, value) in store.prefix_scan(keys::ORDER_INDEX_PREFIX) {
            let index_key: OrderIdsKey = parse_suffix(&key, keys::ORDER_INDEX_PREFIX)?;
            let ids: Vec<OrderId> = store::decode(&key, &value)?;
            order_index.set(index_key, VecDeque::from(ids));
        }

        info!(
            depth_books = depth_books.len(),
            order_queues = order_index.len(),
            "order cache hydrated from storage"
        );
        self.disk_cache = DiskCache::from_parts(depth_books, order_index);
        self.hydrated = true;
        Ok(())
    }

    /// Start-of-block reset of both caches
    pub fn reset_cache(&mut self, store: &dyn KvStore) -> Result<(), StoreError> {
        self.ensure_hydrated(store)?;
        self.cache.reset();
        self.disk_cache.reset();
        self.disk_cache.set_open_num(self.open_order_num(store)?);
        self.disk_cache.set_store_order_num(self.stored_order_num(store)?);
        Ok(())
    }

    /// Write the dirty part of the disk cache to storage
    pub fn flush(&mut self, store: &mut dyn KvStore) -> Result<(), StoreError> {
        store::put(store, keys::RECENTLY_CLOSED_KEY, &self.disk_cache.closed_order_ids())?;
        store::put(store, keys::OPEN_ORDER_COUNT_KEY, &self.disk_cache.open_num())?;
        store::put(store, keys::STORED_ORDER_COUNT_KEY, &self.disk_cache.store_order_num())?;

        for product in self.disk_cache.updated_books() {
            let key = keys::depth_book_key(&product);
            match self.disk_cache.depth_book(&product).filter(|book| !book.is_empty()) {
                Some(book) => store::put(store, &key, &book)?,
                None => {
                    store.delete(&key);
                    self.disk_cache.forget_depth_book(&product);
                }
            }
        }

        for index_key in self.disk_cache.updated_index_keys() {
            let key = keys::order_index_key(&index_key);
            let ids = self.disk_cache.order_ids(&index_key);
            if ids.is_empty() {
                store.delete(&key);
            } else {
                store::put(store, &key, &Vec::from(ids))?;
            }
        }
        Ok(())
    }

    pub fn get_order(&self, store: &dyn KvStore, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        store::load(store, &keys::order_key(order_id))
    }

    /// Load an order the index says must exist
    pub(crate) fn must_get_order(&self, store: &dyn KvStore, order_id: &OrderId) -> Result<Order, StoreError> {
        self.get_order(store, order_id)?
            .ok_or(StoreError::MissingOrder { order_id: *order_id })
    }

    pub fn set_order(&self, store: &mut dyn KvStore, order: &Order) -> Result<(), StoreError> {
        store::put(store, &keys::order_key(&order.order_id), order)
    }

    pub fn drop_order(&self, store: &mut dyn KvStore, order_id: &OrderId) {
        store.delete(&keys::order_key(order_id));
    }

    /// Number of orders placed at `height`
    pub fn block_order_num(&self, store: &dyn KvStore, height: i64) -> Result<i64, StoreError> {
        Ok(store::load(store, &keys::order_count_key(height))?.unwrap_or(0))
    }

    pub fn set_block_order_num(&self, store: &mut dyn KvStore, height: i64, num: i64) -> Result<(), StoreError> {
        store::put(store, &keys::order_count_key(height), &num)
    }

    pub fn drop_block_order_num(&self, store: &mut dyn KvStore, height: i64) {
        store.delete(&keys::order_count_key(height));
    }

    /// Creation heights whose orders expire at `height`
    pub fn expire_block_heights(&self, store: &dyn KvStore, height: i64) -> Result<Vec<i64>, StoreError> {
        Ok(store::load(store, &keys::expiry_bucket_key(height))?.unwrap_or_default())
    }

    pub fn set_expire_block_heights(
        &self,
        store: &mut dyn KvStore,
        height: i64,
        heights: &[i64],
    ) -> Result<(), StoreError> {
        store::put(store, &keys::expiry_bucket_key(height), &heights.to_vec())
    }

    pub fn drop_expire_block_heights(&self, store: &mut dyn KvStore, height: i64) {
        store.delete(&keys::expiry_bucket_key(height));
    }

    /// Height the expiry sweep last completed, `None` before the first sweep
    pub fn last_expired_block_height(&self, store: &dyn KvStore) -> Result<Option<i64>, StoreError> {
        store::load(store, keys::LAST_EXPIRED_HEIGHT_KEY)
    }

    pub fn set_last_expired_block_height(&self, store: &mut dyn KvStore, height: i64) -> Result<(), StoreError> {
        store::put(store, keys::LAST_EXPIRED_HEIGHT_KEY, &height)
    }

    pub fn open_order_num(&self, store: &dyn KvStore) -> Result<i64, StoreError> {
        Ok(store::load(store, keys::OPEN_ORDER_COUNT_KEY)?.unwrap_or(0))
    }

    pub fn stored_order_num(&self, store: &dyn KvStore) -> Result<i64, StoreError> {
        Ok(store::load(store, keys::STORED_ORDER_COUNT_KEY)?.unwrap_or(0))
    }

    /// Orders closed in the previous block, still stored
    pub fn last_closed_order_ids(&self, store: &dyn KvStore) -> Result<Vec<OrderId>, StoreError> {
        Ok(store::load(store, keys::RECENTLY_CLOSED_KEY)?.unwrap_or_default())
    }

    /// Last clearing price, falling back to the product's initial price
    ///
    /// Returns zero for a product the registry no longer knows.
    pub fn last_price(&mut self, ctx: &mut BlockContext<'_>, product: &ProductId) -> Result<Price, StoreError> {
        if let Some(price) = self.disk_cache.last_price(product) {
            return Ok(price);
        }
        if let Some(price) = store::load::<Price>(ctx.store, &keys::last_price_key(product))? {
            self.disk_cache.set_last_price(product, price);
            return Ok(price);
        }
        match ctx.registry.get_product(product) {
            Some(info) => {
                self.set_last_price(ctx.store, product, info.init_price)?;
                Ok(info.init_price)
            }
            None => Ok(Price::zero()),
        }
    }

    pub fn set_last_price(&mut self, store: &mut dyn KvStore, product: &ProductId, price: Price) -> Result<(), StoreError> {
        self.disk_cache.set_last_price(product, price);
        store::put(store, &keys::last_price_key(product), &price)
    }

    pub fn product_lock(&self, store: &dyn KvStore, product: &ProductId) -> Result<Option<ProductLock>, StoreError> {
        store::load(store, &keys::product_lock_key(product))
    }

    /// Every outstanding product lock, in symbol order
    pub fn product_locks(&self, store: &dyn KvStore) -> Result<BTreeMap<ProductId, ProductLock>, StoreError> {
        let mut locks = BTreeMap::new();
        for (key, value) in store.prefix_scan(keys::PRODUCT_LOCK_PREFIX) {
            let product: ProductId = parse_suffix(&key, keys::PRODUCT_LOCK_PREFIX)?;
            locks.insert(product, store::decode(&key, &value)?);
        }
        Ok(locks)
    }

    pub fn any_product_locked(&self, store: &dyn KvStore) -> bool {
        !store.prefix_scan(keys::PRODUCT_LOCK_PREFIX).is_empty()
    }

    /// Persist the continuation state and raise the registry's lock flag
    pub fn lock_product(
        &self,
        ctx: &mut BlockContext<'_>,
        product: &ProductId,
        lock: &ProductLock,
    ) -> Result<(), StoreError> {
        store::put(ctx.store, &keys::product_lock_key(product), lock)?;
        ctx.registry.set_locked(product, true);
        info!(
            product = %product,
            price = %lock.price,
            quantity = %lock.quantity,
            buy_executed = %lock.buy_executed,
            sell_executed = %lock.sell_executed,
            "product locked"
        );
        Ok(())
    }

    pub fn unlock_product(&self, ctx: &mut BlockContext<'_>, product: &ProductId) {
        ctx.store.delete(&keys::product_lock_key(product));
        ctx.registry.set_locked(product, false);
        info!(product = %product, height = ctx.height, "product unlocked");
    }

    pub fn operation_metric(&self) -> OperationMetric {
        OperationMetric {
            full_fill_num: self.cache.full_fill_num(),
            partial_fill_num: self.cache.partial_fill_num(),
            open_num: self.disk_cache.open_num(),
            cancel_num: self.cache.cancel_num(),
            expire_num: self.cache.expire_num(),
        }
    }

    /// Orders referenced by the index, i.e. every open order
    pub fn open_orders(&self, store: &dyn KvStore) -> Result<Vec<Order>, StoreError> {
        let mut orders = Vec::new();
        for (_, ids) in self.disk_cache.order_index().iter() {
            for id in ids {
                orders.push(self.must_get_order(store, id)?);
            }
        }
        debug!(count = orders.len(), "collected open orders");
        Ok(orders)
    }
}

fn parse_suffix<T>(key: &[u8], prefix: &[u8]) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let text = keys::suffix(key, prefix).ok_or_else(|| StoreError::MalformedKey {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: "not valid utf-8".to_string(),
    })?;
    text.parse().map_err(|e: T::Err| StoreError::MalformedKey {
        key: text.to_string(),
        reason: e.to_string(),
    })
}
