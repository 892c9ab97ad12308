//! Matching engine core
//!
//! Entry point driven by the host chain once per block:
//!
//! 1. `begin_block` resets the per-block caches (hydrating from storage on
//!    first use).
//! 2. `new_orders` / `cancel_orders` apply user batches during the block.
//! 3. `end_block` expires orders, clears delisted products, runs the
//!    periodic auction for every touched product and flushes the caches.

use crate::collaborators::Ledger;
use crate::config::EngineParams;
use crate::context::BlockContext;
use crate::errors::{ConfigError, EngineError, InvariantError, StoreError};
use crate::expiry;
use crate::handler::{self, OrderItem, OrderResult};
use crate::invariant;
use crate::keeper::{Keeper, OperationMetric};
use crate::matching;
use crate::query::{self, DepthSnapshot, StoreStatistics};
use crate::store::KvStore;
use tracing::info;
use types::ids::{AccountId, OrderId, ProductId};
use types::numeric::Price;
use types::order::Order;
use types::trade::{BlockMatchResult, ProductLock};

/// Main matching engine
pub struct MatchingEngine {
    keeper: Keeper,
}

impl MatchingEngine {
    pub fn new(params: EngineParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            keeper: Keeper::new(params),
        })
    }

    pub fn params(&self) -> &EngineParams {
        self.keeper.params()
    }

    /// Replace the parameters; takes effect for orders placed afterwards
    pub fn set_params(&mut self, params: EngineParams) -> Result<(), ConfigError> {
        self.keeper.set_params(params)
    }

    pub fn keeper(&self) -> &Keeper {
        &self.keeper
    }

    /// Start a block
    pub fn begin_block(&mut self, store: &dyn KvStore) -> Result<(), StoreError> {
        self.keeper.reset_cache(store)
    }

    /// Place a batch of orders for `sender`
    pub fn new_orders(
        &mut self,
        ctx: &mut BlockContext<'_>,
        sender: &AccountId,
        items: &[OrderItem],
    ) -> Result<Vec<OrderResult>, EngineError> {
        handler::handle_new_orders(&mut self.keeper, ctx, sender, items)
    }

    /// Cancel a batch of `sender`'s orders
    pub fn cancel_orders(
        &mut self,
        ctx: &mut BlockContext<'_>,
        sender: &AccountId,
        order_ids: &[OrderId],
    ) -> Result<Vec<OrderResult>, EngineError> {
        handler::handle_cancel_orders(&mut self.keeper, ctx, sender, order_ids)
    }

    /// Finish a block: expiry, delisting cleanup, auctions, flush
    pub fn end_block(&mut self, ctx: &mut BlockContext<'_>) -> Result<(), StoreError> {
        expiry::cleanup_expired_orders(&mut self.keeper, ctx)?;
        expiry::cleanup_delisted_products(&mut self.keeper, ctx)?;
        matching::match_orders(&mut self.keeper, ctx)?;
        self.keeper.flush(ctx.store)?;

        let metric = self.keeper.operation_metric();
        info!(
            height = ctx.height,
            full_fill = metric.full_fill_num,
            partial_fill = metric.partial_fill_num,
            open = metric.open_num,
            cancel = metric.cancel_num,
            expire = metric.expire_num,
            "block finished"
        );
        Ok(())
    }

    pub fn order(&self, store: &dyn KvStore, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        query::order(&self.keeper, store, order_id)
    }

    /// Top `depth` levels per side of `product`
    pub fn depth_book(&self, product: &ProductId, depth: usize) -> DepthSnapshot {
        query::depth_book(&self.keeper, product, depth)
    }

    pub fn best_bid_and_ask(&self, product: &ProductId) -> (Option<Price>, Option<Price>) {
        query::best_bid_and_ask(&self.keeper, product)
    }

    pub fn store_statistics(&self) -> StoreStatistics {
        query::store_statistics(&self.keeper)
    }

    pub fn block_match_result(&self) -> Option<BlockMatchResult> {
        query::block_match_result(&self.keeper)
    }

    pub fn product_lock(&self, store: &dyn KvStore, product: &ProductId) -> Result<Option<ProductLock>, StoreError> {
        query::product_lock(&self.keeper, store, product)
    }

    pub fn operation_metric(&self) -> OperationMetric {
        self.keeper.operation_metric()
    }

    /// Orders created or changed during the current block
    pub fn updated_order_ids(&self) -> Vec<OrderId> {
        self.keeper.cache().updated_order_ids().to_vec()
    }

    /// Verify locked funds and books against open orders
    pub fn check_invariants(&self, store: &dyn KvStore, ledger: &dyn Ledger) -> Result<(), InvariantError> {
        invariant::check_locked_funds(&self.keeper, store, ledger)?;
        invariant::check_books(&self.keeper, store)
    }
}
