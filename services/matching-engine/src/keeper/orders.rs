//! Order lifecycle operations of the keeper
//!
//! Ledger calls made while closing an order are best-effort: a failure is
//! logged and the order still closes, so a single inconsistent balance can
//! never wedge the book.

use super::Keeper;
use crate::context::BlockContext;
use crate::errors::{EngineError, StoreError};
use crate::fees;
use tracing::{debug, error};
use types::account::{Coin, LockKind};
use types::errors::OrderError;
use types::fee::FeeType;
use types::ids::OrderId;
use types::order::{Order, OrderStatus};

impl Keeper {
    /// Assign the next id of the block, lock principal and placement fee,
    /// then store the order and add it to the book
    ///
    /// Fallible ledger steps run before any write; when the fee lock fails
    /// the principal lock is released again.
    pub fn place_order(&mut self, ctx: &mut BlockContext<'_>, order: &mut Order) -> Result<(), EngineError> {
        let num = self.block_order_num(ctx.store, ctx.height)? + 1;
        order.order_id = OrderId::new(ctx.height, num as u64);

        let principal = order.need_lock_coin();
        ctx.ledger
            .lock(&order.sender, &principal, LockKind::Quantity)
            .map_err(OrderError::from)?;

        let fee = fees::order_placement_fee(order);
        if fee.is_positive() {
            if let Err(err) = ctx.ledger.lock(&order.sender, &fee, LockKind::Fee) {
                if let Err(unlock_err) = ctx.ledger.unlock(&order.sender, &principal, LockKind::Quantity) {
                    error!(order_id = %order.order_id, error = %unlock_err, "failed to release principal after fee lock failure");
                }
                return Err(OrderError::from(err).into());
            }
        }
        order.record_fee(FeeType::OrderNew, &fee);

        self.set_block_order_num(ctx.store, ctx.height, num)?;
        self.set_order(ctx.store, order)?;
        self.disk_cache.insert_order(order);
        self.cache.add_updated_order_id(order.order_id);
        debug!(
            order_id = %order.order_id,
            product = %order.product,
            side = %order.side,
            price = %order.price,
            quantity = %order.quantity,
            "order placed"
        );
        Ok(())
    }

    /// Close an open order on its owner's request; returns the fee charged
    pub fn cancel_order(&mut self, ctx: &mut BlockContext<'_>, order: &mut Order) -> Result<Coin, StoreError> {
        self.quit_order(ctx, order, FeeType::OrderCancel)
    }

    /// Close an open order whose lifetime ended; returns the fee charged
    pub fn expire_order(&mut self, ctx: &mut BlockContext<'_>, order: &mut Order) -> Result<Coin, StoreError> {
        self.quit_order(ctx, order, FeeType::OrderExpire)
    }

    fn quit_order(
        &mut self,
        ctx: &mut BlockContext<'_>,
        order: &mut Order,
        fee_type: FeeType,
    ) -> Result<Coin, StoreError> {
        let cost = fees::exit_fee(order, ctx.height);
        let locked_fee = fees::order_placement_fee(order);

        let principal = order.need_unlock_coin();
        if principal.is_positive() {
            if let Err(err) = ctx.ledger.unlock(&order.sender, &principal, LockKind::Quantity) {
                error!(order_id = %order.order_id, error = %err, "failed to unlock order principal");
            }
        }
        order.unlock();

        if locked_fee.is_positive() {
            if let Err(err) = ctx.ledger.unlock(&order.sender, &locked_fee, LockKind::Fee) {
                error!(order_id = %order.order_id, error = %err, "failed to unlock placement fee");
            }
        }
        if cost.is_positive() {
            if let Err(err) = ctx.ledger.collect_fee(&order.sender, &cost) {
                error!(order_id = %order.order_id, fee = %cost, error = %err, "failed to collect exit fee");
            }
        }
        order.record_fee(fee_type, &cost);

        match fee_type {
            FeeType::OrderExpire => order.expire(),
            _ => order.cancel(),
        }
        self.set_order(ctx.store, order)?;
        self.remove_order_from_depth_book(order, fee_type);
        debug!(order_id = %order.order_id, status = %order.status, fee = %cost, "order closed");
        Ok(cost)
    }

    /// Take a closed order out of the book and count the operation
    pub(crate) fn remove_order_from_depth_book(&mut self, order: &Order, fee_type: FeeType) {
        self.cache.add_updated_order_id(order.order_id);
        match fee_type {
            FeeType::OrderCancel => self.cache.inc_cancel_num(),
            FeeType::OrderExpire => self.cache.inc_expire_num(),
            _ => {}
        }
        self.disk_cache.remove_order(order);
    }

    /// Persist an order after a fill
    pub(crate) fn update_order(&mut self, ctx: &mut BlockContext<'_>, order: &Order) -> Result<(), StoreError> {
        self.set_order(ctx.store, order)?;
        self.cache.add_updated_order_id(order.order_id);
        if order.status == OrderStatus::Filled {
            self.disk_cache.close_order(order.order_id);
            self.cache.inc_full_fill_num();
        } else {
            self.cache.inc_partial_fill_num();
        }
        Ok(())
    }

    /// Expire every still-open order created at `height`
    ///
    /// Orders of a locked product are left alone; the sweep revisits their
    /// height once no product is locked.
    pub fn drop_expired_orders_by_height(&mut self, ctx: &mut BlockContext<'_>, height: i64) -> Result<(), StoreError> {
        let num = self.block_order_num(ctx.store, height)?;
        let mut expired = 0;
        for sequence in 1..=num {
            let order_id = OrderId::new(height, sequence as u64);
            let Some(mut order) = self.get_order(ctx.store, &order_id)? else {
                continue;
            };
            if !order.is_open() {
                continue;
            }
            if ctx.registry.is_locked(&order.product) {
                debug!(order_id = %order_id, product = %order.product, "expiry deferred, product locked");
                continue;
            }
            self.expire_order(ctx, &mut order)?;
            expired += 1;
        }
        if expired > 0 {
            debug!(height, expired, "expired orders of creation height");
        }
        Ok(())
    }

    /// Delete orders closed during the previous block
    pub fn drop_last_block_closed_orders(&mut self, ctx: &mut BlockContext<'_>) -> Result<(), StoreError> {
        let closed = self.last_closed_order_ids(ctx.store)?;
        for order_id in &closed {
            self.drop_order(ctx.store, order_id);
        }
        self.disk_cache.decrease_store_order_num(closed.len() as i64);
        Ok(())
    }
}
