//! End-of-block auction execution
//!
//! Prices every product that received orders this block, then fills the
//! products in symbol order under one shared deal budget. A product whose
//! fills do not complete within the budget is locked and resumed in later
//! blocks at its frozen price and quantity before anything else may touch
//! its book.

use super::auction::periodic_auction_match_price;
use super::fill::{fill_depth_book, Executed};
use crate::context::BlockContext;
use crate::errors::StoreError;
use crate::keeper::Keeper;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};
use types::ids::ProductId;
use types::trade::{BlockMatchResult, MatchResult, ProductLock};

/// Run the block's auctions and record their results in the block cache
pub fn match_orders(keeper: &mut Keeper, ctx: &mut BlockContext<'_>) -> Result<(), StoreError> {
    let locks = keeper.product_locks(ctx.store)?;
    if keeper.block_order_num(ctx.store, ctx.height)? == 0 && locks.is_empty() {
        return Ok(());
    }

    let mut results = discover_prices(keeper, ctx)?;
    execute(keeper, ctx, &mut results, &locks)?;

    if !results.is_empty() {
        keeper.cache.set_block_match_result(BlockMatchResult {
            block_height: ctx.height,
            timestamp: ctx.timestamp,
            results,
        });
    }
    Ok(())
}

/// Clearing price of every product whose book received orders this block
fn discover_prices(
    keeper: &mut Keeper,
    ctx: &mut BlockContext<'_>,
) -> Result<BTreeMap<ProductId, MatchResult>, StoreError> {
    let mut results = BTreeMap::new();
    for product in keeper.disk_cache.new_depth_book_products() {
        let Some(info) = ctx.registry.get_product(&product) else {
            continue;
        };
        if ctx.registry.is_locked(&product) {
            continue;
        }
        let book = keeper.disk_cache.depth_book(&product).unwrap_or_default();
        let reference = keeper.last_price(ctx, &product)?;
        let auction = periodic_auction_match_price(&book, info.price_precision, reference);
        if !auction.quantity.is_positive() {
            debug!(product = %product, reference = %reference, "no crossing volume");
            continue;
        }

        keeper.set_last_price(ctx.store, &product, auction.price)?;
        results.insert(
            product,
            MatchResult {
                block_height: ctx.height,
                price: auction.price,
                quantity: auction.quantity,
                deals: Vec::new(),
            },
        );
    }
    Ok(results)
}

fn execute(
    keeper: &mut Keeper,
    ctx: &mut BlockContext<'_>,
    results: &mut BTreeMap<ProductId, MatchResult>,
    locks: &BTreeMap<ProductId, ProductLock>,
) -> Result<(), StoreError> {
    let products: BTreeSet<ProductId> = results.keys().chain(locks.keys()).cloned().collect();
    let mut remain_deals = keeper.params().max_deals_per_block;

    for product in products {
        if let Some(result) = results.get_mut(&product) {
            remain_deals = execute_priced_product(keeper, ctx, &product, result, remain_deals)?;
        } else if let Some(lock) = locks.get(&product) {
            if remain_deals <= 0 {
                continue;
            }
            let (resumed, left) = execute_locked_product(keeper, ctx, &product, lock, remain_deals)?;
            remain_deals = left;
            if let Some(result) = resumed {
                results.insert(product, result);
            }
        }
    }
    Ok(())
}

/// Fill a freshly priced product, locking it when the budget runs out
fn execute_priced_product(
    keeper: &mut Keeper,
    ctx: &mut BlockContext<'_>,
    product: &ProductId,
    result: &mut MatchResult,
    remain_deals: i64,
) -> Result<i64, StoreError> {
    let mut executed = Executed::zero();
    if remain_deals <= 0 {
        lock_with_progress(keeper, ctx, product, result, executed)?;
        return Ok(remain_deals);
    }

    let (deals, left) = fill_depth_book(
        keeper,
        ctx,
        product,
        result.price,
        result.quantity,
        &mut executed,
        remain_deals,
    )?;
    info!(
        product = %product,
        price = %result.price,
        quantity = %result.quantity,
        buy_executed = %executed.buy,
        sell_executed = %executed.sell,
        deals = deals.len(),
        remain_deals = left,
        "auction executed"
    );
    result.deals = deals;

    if executed.buy < result.quantity || executed.sell < result.quantity {
        lock_with_progress(keeper, ctx, product, result, executed)?;
    }
    Ok(left)
}

fn lock_with_progress(
    keeper: &mut Keeper,
    ctx: &mut BlockContext<'_>,
    product: &ProductId,
    result: &MatchResult,
    executed: Executed,
) -> Result<(), StoreError> {
    let lock = ProductLock {
        block_height: result.block_height,
        price: result.price,
        quantity: result.quantity,
        buy_executed: executed.buy,
        sell_executed: executed.sell,
    };
    keeper.lock_product(ctx, product, &lock)
}

/// Continue an auction carried over from an earlier block
///
/// Returns the fills made, reported under the height of the original
/// price discovery, and the remaining deal budget.
fn execute_locked_product(
    keeper: &mut Keeper,
    ctx: &mut BlockContext<'_>,
    product: &ProductId,
    lock: &ProductLock,
    remain_deals: i64,
) -> Result<(Option<MatchResult>, i64), StoreError> {
    let mut executed = Executed {
        buy: lock.buy_executed,
        sell: lock.sell_executed,
    };
    let (deals, left) = fill_depth_book(
        keeper,
        ctx,
        product,
        lock.price,
        lock.quantity,
        &mut executed,
        remain_deals,
    )?;
    info!(
        product = %product,
        price = %lock.price,
        locked_at = lock.block_height,
        buy_executed = %executed.buy,
        sell_executed = %executed.sell,
        deals = deals.len(),
        remain_deals = left,
        "locked auction resumed"
    );

    let updated = ProductLock {
        buy_executed: executed.buy,
        sell_executed: executed.sell,
        ..lock.clone()
    };
    if updated.is_complete() {
        keeper.unlock_product(ctx, product);
    } else {
        keeper.lock_product(ctx, product, &updated)?;
    }

    let result = (!deals.is_empty()).then(|| MatchResult {
        block_height: lock.block_height,
        price: lock.price,
        quantity: lock.quantity,
        deals,
    });
    Ok((result, left))
}
