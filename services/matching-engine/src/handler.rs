//! Batch order placement and cancellation
//!
//! A batch is checked as a whole first (size, duplicate ids). Each item then
//! applies inside its own write-buffered store scope: the scope commits
//! only when the item succeeds, and a rejected item is reported in the
//! result list while its siblings still apply.

use crate::collaborators::ProductRegistry;
use crate::context::BlockContext;
use crate::errors::EngineError;
use crate::keeper::Keeper;
use crate::store::CacheKv;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};
use types::account::Coin;
use types::errors::OrderError;
use types::ids::{AccountId, OrderId, ProductId};
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

/// One order of a placement batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: ProductId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

impl OrderItem {
    pub fn new(product: ProductId, side: Side, price: Price, quantity: Quantity) -> Self {
        Self {
            product,
            side,
            price,
            quantity,
        }
    }
}

/// Outcome of one batch item; `code` 0 means success
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: Option<OrderId>,
    pub code: u32,
    pub message: String,
}

impl OrderResult {
    fn success(order_id: OrderId, message: String) -> Self {
        Self {
            order_id: Some(order_id),
            code: 0,
            message,
        }
    }

    fn rejected(order_id: Option<OrderId>, err: &OrderError) -> Self {
        Self {
            order_id,
            code: err.code(),
            message: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Place a batch of orders for `sender`
///
/// Batch-level problems reject the whole batch; item-level problems only
/// reject their item. Storage errors abort the call.
pub fn handle_new_orders(
    keeper: &mut Keeper,
    ctx: &mut BlockContext<'_>,
    sender: &AccountId,
    items: &[OrderItem],
) -> Result<Vec<OrderResult>, EngineError> {
    let limit = keeper.params().max_order_items;
    if items.is_empty() {
        return Err(OrderError::EmptyBatch.into());
    }
    if items.len() > limit {
        return Err(OrderError::BatchTooLarge {
            count: items.len(),
            limit,
        }
        .into());
    }

    let mut fee_per_block = keeper.params().fee_per_block.clone();
    if items.len() > 1 {
        fee_per_block = Coin::new(
            fee_per_block.denom.clone(),
            fee_per_block.amount * keeper.params().batch_fee_ratio,
        );
    }

    let mut results = Vec::with_capacity(items.len());
    for item in items {
        if let Err(err) = validate_item(&*ctx.registry, item) {
            debug!(sender = %sender, product = %item.product, code = err.code(), "order item rejected");
            results.push(OrderResult::rejected(None, &err));
            continue;
        }

        let mut order = Order::new(
            sender.clone(),
            item.product.clone(),
            item.side,
            item.price,
            item.quantity,
            ctx.timestamp,
            keeper.params().order_expire_blocks,
            fee_per_block.clone(),
        );
        match in_item_scope(keeper, ctx, |keeper, item_ctx| keeper.place_order(item_ctx, &mut order)) {
            Ok(()) => results.push(OrderResult::success(order.order_id, String::new())),
            Err(EngineError::Order(err)) => {
                debug!(sender = %sender, product = %item.product, code = err.code(), "order item rejected");
                results.push(OrderResult::rejected(None, &err));
            }
            Err(err) => return Err(err),
        }
    }

    info!(
        sender = %sender,
        items = items.len(),
        placed = results.iter().filter(|r| r.is_success()).count(),
        "order batch handled"
    );
    Ok(results)
}

/// Cancel a batch of `sender`'s orders
pub fn handle_cancel_orders(
    keeper: &mut Keeper,
    ctx: &mut BlockContext<'_>,
    sender: &AccountId,
    order_ids: &[OrderId],
) -> Result<Vec<OrderResult>, EngineError> {
    let limit = keeper.params().max_cancel_items;
    if order_ids.is_empty() {
        return Err(OrderError::EmptyBatch.into());
    }
    if order_ids.len() > limit {
        return Err(OrderError::BatchTooLarge {
            count: order_ids.len(),
            limit,
        }
        .into());
    }
    let mut seen = BTreeSet::new();
    for order_id in order_ids {
        if !seen.insert(*order_id) {
            return Err(OrderError::DuplicateOrderId { order_id: *order_id }.into());
        }
    }

    let mut results = Vec::with_capacity(order_ids.len());
    for order_id in order_ids {
        let mut order = match cancellable_order(keeper, ctx, sender, order_id) {
            Ok(order) => order,
            Err(EngineError::Order(err)) => {
                debug!(sender = %sender, order_id = %order_id, code = err.code(), "cancel item rejected");
                results.push(OrderResult::rejected(Some(*order_id), &err));
                continue;
            }
            Err(err) => return Err(err),
        };

        let fee = in_item_scope(keeper, ctx, |keeper, item_ctx| {
            keeper.cancel_order(item_ctx, &mut order).map_err(EngineError::from)
        })?;
        results.push(OrderResult::success(*order_id, format!("cancel fee: {fee}")));
    }
    Ok(results)
}

/// Item-level placement checks against the product catalogue
fn validate_item(registry: &dyn ProductRegistry, item: &OrderItem) -> Result<(), OrderError> {
    let info = registry.get_product(&item.product).ok_or_else(|| OrderError::ProductNotExist {
        product: item.product.clone(),
    })?;
    if info.delisting {
        return Err(OrderError::ProductDelisting {
            product: item.product.clone(),
        });
    }
    if item.price.as_decimal() <= rust_decimal::Decimal::ZERO {
        return Err(OrderError::InvalidPrice {
            price: item.price.as_decimal(),
        });
    }
    if !item.price.fits_precision(info.price_precision) {
        return Err(OrderError::PriceOverAccuracy {
            price: item.price.as_decimal(),
            precision: info.price_precision,
        });
    }
    if !item.quantity.fits_precision(info.quantity_precision) {
        return Err(OrderError::QuantityOverAccuracy {
            quantity: item.quantity.as_decimal(),
            precision: info.quantity_precision,
        });
    }
    if item.quantity < info.min_quantity {
        return Err(OrderError::QuantityBelowMinimum {
            quantity: item.quantity.as_decimal(),
            min: info.min_quantity.as_decimal(),
        });
    }
    // settlement multiplies price by quantity on both sides
    if item.price.checked_notional(item.quantity).is_none() {
        return Err(OrderError::NotionalOverflow {
            price: item.price.as_decimal(),
            quantity: item.quantity.as_decimal(),
        });
    }
    if registry.is_locked(&item.product) {
        return Err(OrderError::ProductLocked {
            product: item.product.clone(),
        });
    }
    Ok(())
}

/// Load an order and check that `sender` may cancel it now
fn cancellable_order(
    keeper: &Keeper,
    ctx: &BlockContext<'_>,
    sender: &AccountId,
    order_id: &OrderId,
) -> Result<Order, EngineError> {
    let order = keeper
        .get_order(&*ctx.store, order_id)?
        .ok_or(OrderError::OrderNotFound { order_id: *order_id })?;
    if !order.is_open() {
        return Err(OrderError::OrderNotOpen {
            order_id: *order_id,
            status: order.status.to_string(),
        }
        .into());
    }
    if &order.sender != sender {
        return Err(OrderError::NotOrderOwner {
            order_id: *order_id,
            sender: sender.to_string(),
        }
        .into());
    }
    if ctx.registry.is_locked(&order.product) {
        return Err(OrderError::ProductLocked {
            product: order.product.clone(),
        }
        .into());
    }
    Ok(order)
}

/// Run `apply` against a buffered view of the store and keep its writes
/// only if it succeeds
fn in_item_scope<T>(
    keeper: &mut Keeper,
    ctx: &mut BlockContext<'_>,
    apply: impl FnOnce(&mut Keeper, &mut BlockContext<'_>) -> Result<T, EngineError>,
) -> Result<T, EngineError> {
    let mut overlay = CacheKv::new(&*ctx.store);
    let outcome = {
        let mut item_ctx = BlockContext::new(
            ctx.height,
            ctx.timestamp,
            &mut overlay,
            &mut *ctx.ledger,
            &mut *ctx.registry,
        );
        apply(keeper, &mut item_ctx)
    };
    let pending = overlay.into_pending();
    if outcome.is_ok() {
        pending.commit(&mut *ctx.store);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{InMemoryLedger, InMemoryRegistry, ProductInfo};
    use crate::config::EngineParams;
    use crate::store::MemStore;
    use std::str::FromStr;

    fn registry() -> InMemoryRegistry {
        let mut registry = InMemoryRegistry::new();
        registry.add_product(ProductInfo {
            symbol: ProductId::new("xxb_okt"),
            price_precision: 1,
            quantity_precision: 1,
            min_quantity: Quantity::from_str("0.1").unwrap(),
            owner: AccountId::new("owner"),
            init_price: Price::from_str("10.0").unwrap(),
            delisting: false,
        });
        registry
    }

    fn item(price: &str, quantity: &str) -> OrderItem {
        OrderItem::new(
            ProductId::new("xxb_okt"),
            Side::BUY,
            Price::from_str(price).unwrap(),
            Quantity::from_str(quantity).unwrap(),
        )
    }

    #[test]
    fn test_validate_item_checks_precision_and_minimum() {
        let registry = registry();
        assert!(validate_item(&registry, &item("10.0", "1.0")).is_ok());
        assert_eq!(validate_item(&registry, &item("10.05", "1.0")).unwrap_err().code(), 3);
        assert_eq!(validate_item(&registry, &item("10.0", "1.05")).unwrap_err().code(), 4);
        assert_eq!(validate_item(&registry, &item("10.0", "0.0")).unwrap_err().code(), 5);
        assert_eq!(
            validate_item(&registry, &item("1000000000000000.0", "1000000000000000.0"))
                .unwrap_err()
                .code(),
            15
        );

        let unknown = OrderItem {
            product: ProductId::new("abc_okt"),
            ..item("10.0", "1.0")
        };
        assert_eq!(validate_item(&registry, &unknown).unwrap_err().code(), 1);
    }

    #[test]
    fn test_failed_item_leaves_store_untouched() {
        let mut keeper = Keeper::new(EngineParams::default());
        let mut store = MemStore::new();
        let mut ledger = InMemoryLedger::new();
        let mut registry = registry();
        let mut ctx = BlockContext::new(1, 0, &mut store, &mut ledger, &mut registry);

        // no funds deposited, so locking fails
        let results = handle_new_orders(&mut keeper, &mut ctx, &AccountId::new("addr1"), &[item("10.0", "1.0")]).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].code, 14);
        assert!(results[0].order_id.is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_batch_limits() {
        let mut keeper = Keeper::new(EngineParams {
            max_order_items: 1,
            ..EngineParams::default()
        });
        let mut store = MemStore::new();
        let mut ledger = InMemoryLedger::new();
        let mut registry = registry();
        let mut ctx = BlockContext::new(1, 0, &mut store, &mut ledger, &mut registry);
        let sender = AccountId::new("addr1");

        let empty = handle_new_orders(&mut keeper, &mut ctx, &sender, &[]);
        assert_eq!(empty, Err(EngineError::Order(OrderError::EmptyBatch)));

        let too_many = handle_new_orders(&mut keeper, &mut ctx, &sender, &[item("10.0", "1.0"), item("10.0", "1.0")]);
        assert!(matches!(too_many, Err(EngineError::Order(OrderError::BatchTooLarge { count: 2, limit: 1 }))));

        let id = OrderId::new(1, 1);
        let duplicate = handle_cancel_orders(&mut keeper, &mut ctx, &sender, &[id, id]);
        assert!(matches!(duplicate, Err(EngineError::Order(OrderError::DuplicateOrderId { .. }))));
    }
}
