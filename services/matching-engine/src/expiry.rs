//! Height-driven order expiry and delisted product cleanup
//!
//! Every block appends its own height to the bucket of the height at which
//! its orders expire. The sweep walks the buckets between the last swept
//! height and the current one and expires every still-open order created
//! at the recorded heights. While any product is locked the sweep leaves
//! the buckets in place and does not advance, so deferred orders are
//! visited again once the lock clears.

use crate::context::BlockContext;
use crate::errors::StoreError;
use crate::keeper::Keeper;
use tracing::{debug, info, warn};

/// Register the current height in the bucket of its expiry height
pub fn mark_cur_block_to_future_expire_list(keeper: &Keeper, ctx: &mut BlockContext<'_>) -> Result<(), StoreError> {
    let expire_at = ctx.height + keeper.params().order_expire_blocks;
    let mut heights = keeper.expire_block_heights(ctx.store, expire_at)?;
    heights.push(ctx.height);
    keeper.set_expire_block_heights(ctx.store, expire_at, &heights)
}

/// Expire the orders of every bucket due up to the current height
pub fn expire_through_current_height(keeper: &mut Keeper, ctx: &mut BlockContext<'_>) -> Result<(), StoreError> {
    let last = keeper
        .last_expired_block_height(ctx.store)?
        .unwrap_or(ctx.height - 1);

    for height in (last + 1)..=ctx.height {
        for created_at in keeper.expire_block_heights(ctx.store, height)? {
            keeper.drop_expired_orders_by_height(ctx, created_at)?;
            info!(expire_height = height, created_at, "expiry bucket swept");
        }
    }

    if keeper.any_product_locked(ctx.store) {
        debug!(last_swept = last, "expiry sweep held back by product lock");
        return Ok(());
    }

    let mut height = last;
    if ctx.height > 1 {
        while height < ctx.height {
            for created_at in keeper.expire_block_heights(ctx.store, height)? {
                keeper.drop_block_order_num(ctx.store, created_at);
            }
            keeper.drop_expire_block_heights(ctx.store, height);
            height += 1;
        }
    }
    keeper.set_last_expired_block_height(ctx.store, height)
}

/// Expiry bookkeeping run at the start of block end
pub fn cleanup_expired_orders(keeper: &mut Keeper, ctx: &mut BlockContext<'_>) -> Result<(), StoreError> {
    mark_cur_block_to_future_expire_list(keeper, ctx)?;
    keeper.drop_last_block_closed_orders(ctx)?;
    expire_through_current_height(keeper, ctx)
}

/// Cancel every open order of products the registry no longer lists
pub fn cleanup_delisted_products(keeper: &mut Keeper, ctx: &mut BlockContext<'_>) -> Result<(), StoreError> {
    for product in keeper.disk_cache.products() {
        if ctx.registry.exists(&product) {
            continue;
        }

        let keys = keeper.disk_cache.order_index().keys_for_product(&product);
        let mut cancelled = 0;
        for key in keys {
            for order_id in keeper.disk_cache.order_ids(&key) {
                let mut order = keeper.must_get_order(ctx.store, &order_id)?;
                if !order.is_open() {
                    continue;
                }
                keeper.cancel_order(ctx, &mut order)?;
                cancelled += 1;
            }
        }

        if keeper.product_lock(ctx.store, &product)?.is_some() {
            keeper.unlock_product(ctx, &product);
        }
        warn!(product = %product, cancelled, "delisted product cleared");
    }
    Ok(())
}
