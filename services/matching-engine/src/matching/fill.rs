//! Fill execution at the clearing price
//!
//! Buy levels are consumed from the highest price down to the clearing
//! price, sell levels from the lowest price up to it. Inside a level the
//! FIFO queue is served from the front; the last order touched may be
//! filled partially and then stays at the head of its queue. Every fill,
//! partial or not, consumes one unit of the block's deal budget.

use crate::book::{DepthBook, OrderIdsKey};
use crate::context::BlockContext;
use crate::errors::StoreError;
use crate::fees;
use crate::keeper::Keeper;
use tracing::{error, warn};
use types::account::{Coin, LockKind};
use types::fee::FeeType;
use types::ids::ProductId;
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderStatus, Side};
use types::trade::Deal;

/// Executed quantities of one auction, carried across blocks while locked
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Executed {
    pub buy: Quantity,
    pub sell: Quantity,
}

impl Executed {
    pub fn zero() -> Self {
        Self {
            buy: Quantity::zero(),
            sell: Quantity::zero(),
        }
    }
}

/// Fill both sides of `product` at `price` up to `max_execution`
///
/// Returns the deals and the remaining block deal budget. Buys are filled
/// first; sells only if budget is left.
pub fn fill_depth_book(
    keeper: &mut Keeper,
    ctx: &mut BlockContext<'_>,
    product: &ProductId,
    price: Price,
    max_execution: Quantity,
    executed: &mut Executed,
    remain_deals: i64,
) -> Result<(Vec<Deal>, i64), StoreError> {
    let mut deals = Vec::new();
    if max_execution.is_zero() {
        return Ok((deals, remain_deals));
    }

    let mut book = keeper.disk_cache.depth_book(product).unwrap_or_default();
    let mut remain = fill_buy_orders(
        keeper,
        ctx,
        &mut book,
        product,
        price,
        max_execution,
        &mut executed.buy,
        remain_deals,
        &mut deals,
    )?;
    if remain > 0 {
        remain = fill_sell_orders(
            keeper,
            ctx,
            &mut book,
            product,
            price,
            max_execution,
            &mut executed.sell,
            remain,
            &mut deals,
        )?;
    }
    keeper.disk_cache.set_depth_book(product, book);
    Ok((deals, remain))
}

#[allow(clippy::too_many_arguments)]
fn fill_buy_orders(
    keeper: &mut Keeper,
    ctx: &mut BlockContext<'_>,
    book: &mut DepthBook,
    product: &ProductId,
    price: Price,
    max_execution: Quantity,
    buy_executed: &mut Quantity,
    mut remain_deals: i64,
    deals: &mut Vec<Deal>,
) -> Result<i64, StoreError> {
    let mut index = 0;
    while index < book.items.len() {
        let item = &book.items[index];
        if item.price < price || *buy_executed >= max_execution {
            break;
        }
        let need = item.buy_quantity.min(max_execution - *buy_executed);
        if need.is_zero() {
            index += 1;
            continue;
        }

        let key = OrderIdsKey::new(product.clone(), item.price, Side::BUY);
        let (filled, count) = fill_order_by_key(keeper, ctx, &key, need, price, remain_deals, deals)?;
        remain_deals -= count;
        *buy_executed += filled;

        book.sub(index, filled, Quantity::zero());
        if !book.remove_if_empty(index) {
            index += 1;
        }
        if remain_deals <= 0 {
            break;
        }
    }
    Ok(remain_deals)
}

#[allow(clippy::too_many_arguments)]
fn fill_sell_orders(
    keeper: &mut Keeper,
    ctx: &mut BlockContext<'_>,
    book: &mut DepthBook,
    product: &ProductId,
    price: Price,
    max_execution: Quantity,
    sell_executed: &mut Quantity,
    mut remain_deals: i64,
    deals: &mut Vec<Deal>,
) -> Result<i64, StoreError> {
    let mut index = book.items.len();
    while index > 0 {
        let item = &book.items[index - 1];
        if item.price > price || *sell_executed >= max_execution {
            break;
        }
        let need = item.sell_quantity.min(max_execution - *sell_executed);
        if need.is_zero() {
            index -= 1;
            continue;
        }

        let key = OrderIdsKey::new(product.clone(), item.price, Side::SELL);
        let (filled, count) = fill_order_by_key(keeper, ctx, &key, need, price, remain_deals, deals)?;
        remain_deals -= count;
        *sell_executed += filled;

        book.sub(index - 1, Quantity::zero(), filled);
        // removal shifts only the levels above, which are still unvisited
        book.remove_if_empty(index - 1);
        if remain_deals <= 0 {
            break;
        }
        index -= 1;
    }
    Ok(remain_deals)
}

/// Fill up to `need` from the FIFO queue at `key`
///
/// Returns the filled quantity and the number of fills made.
fn fill_order_by_key(
    keeper: &mut Keeper,
    ctx: &mut BlockContext<'_>,
    key: &OrderIdsKey,
    need: Quantity,
    price: Price,
    remain_deals: i64,
    deals: &mut Vec<Deal>,
) -> Result<(Quantity, i64), StoreError> {
    let mut ids = keeper.disk_cache.order_ids(key);
    let mut filled = Quantity::zero();
    let mut count = 0;

    while count < remain_deals && filled < need {
        let Some(order_id) = ids.front().copied() else {
            warn!(key = %key, needed = %need, filled = %filled, "order queue exhausted before level quantity");
            break;
        };
        let mut order = keeper.must_get_order(ctx.store, &order_id)?;
        let amount = order.remain_quantity.min(need - filled);
        deals.push(fill_order(keeper, ctx, &mut order, price, amount)?);
        filled += amount;
        count += 1;
        if order.status == OrderStatus::Filled {
            ids.pop_front();
        }
    }

    keeper.disk_cache.set_order_ids(key, ids);
    Ok((filled, count))
}

/// Fill one order: update it, settle funds, charge fees and persist it
pub(crate) fn fill_order(
    keeper: &mut Keeper,
    ctx: &mut BlockContext<'_>,
    order: &mut Order,
    price: Price,
    amount: Quantity,
) -> Result<Deal, StoreError> {
    order.fill(price, amount);
    settle(ctx, order, price, amount);

    if order.status == OrderStatus::Filled && order.remain_locked > rust_decimal::Decimal::ZERO {
        let leftover = order.need_unlock_coin();
        if let Err(err) = ctx.ledger.unlock(&order.sender, &leftover, LockKind::Quantity) {
            error!(order_id = %order.order_id, error = %err, "failed to unlock leftover principal");
        }
        order.unlock();
    }

    let deal_fee = charge_fee(keeper, ctx, order, price, amount);
    keeper.update_order(ctx, order)?;

    Ok(Deal {
        order_id: order.order_id,
        side: order.side,
        quantity: amount,
        fee: deal_fee.to_string(),
    })
}

/// Exchange locked principal for the counter asset
fn settle(ctx: &mut BlockContext<'_>, order: &Order, price: Price, amount: Quantity) {
    let (base, quote) = order.product.split();
    let (spent, received) = match order.side {
        Side::BUY => (Coin::new(quote, price * amount), Coin::new(base, amount.as_decimal())),
        Side::SELL => (Coin::new(base, amount.as_decimal()), Coin::new(quote, price * amount)),
    };
    if let Err(err) = ctx.ledger.settle(&order.sender, &spent, &received) {
        error!(order_id = %order.order_id, spent = %spent, received = %received, error = %err, "fill settlement failed");
    }
}

/// Charge the exit fee on full fill and the trade fee on every fill
fn charge_fee(keeper: &mut Keeper, ctx: &mut BlockContext<'_>, order: &mut Order, price: Price, amount: Quantity) -> Coin {
    if order.status == OrderStatus::Filled {
        let locked_fee = fees::order_placement_fee(order);
        let cost = fees::exit_fee(order, ctx.height);
        if locked_fee.is_positive() {
            if let Err(err) = ctx.ledger.unlock(&order.sender, &locked_fee, LockKind::Fee) {
                error!(order_id = %order.order_id, error = %err, "failed to unlock placement fee");
            }
        }
        if cost.is_positive() {
            if let Err(err) = ctx.ledger.collect_fee(&order.sender, &cost) {
                error!(order_id = %order.order_id, fee = %cost, error = %err, "failed to collect holding fee");
            }
        }
        let receive = Coin::new(locked_fee.denom.clone(), locked_fee.amount - cost.amount);
        order.record_fee(FeeType::OrderReceive, &receive);
    }

    let params = keeper.params();
    let deal_fee = fees::trade_fee(&order.product, price, amount, params.trade_fee_rate, params.min_trade_fee);
    match ctx.registry.get_product(&order.product) {
        Some(info) => match ctx.ledger.transfer(&order.sender, &info.owner, &deal_fee) {
            Ok(()) => order.record_fee(FeeType::OrderDeal, &deal_fee),
            Err(err) => {
                error!(order_id = %order.order_id, fee = %deal_fee, error = %err, "failed to pay trade fee to product owner");
            }
        },
        None => warn!(order_id = %order.order_id, product = %order.product, "trade fee skipped, product not listed"),
    }
    deal_fee
}
