//! Consistency checks between the ledger, the books and open orders
//!
//! For developers and tests. A failure means engine state is corrupt; it is
//! never reported to users as an order error.

use crate::collaborators::Ledger;
use crate::errors::InvariantError;
use crate::fees;
use crate::keeper::Keeper;
use crate::store::KvStore;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::error;
use types::account::LockKind;
use types::ids::ProductId;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

/// Locked balances equal what open orders still hold
///
/// Per denomination, the principal lock must equal the sum of the open
/// orders' remaining locked funds and the fee lock the sum of their
/// placement fees.
pub fn check_locked_funds(keeper: &Keeper, store: &dyn KvStore, ledger: &dyn Ledger) -> Result<(), InvariantError> {
    let orders = keeper.open_orders(store)?;

    let mut principal: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut fee: BTreeMap<String, Decimal> = BTreeMap::new();
    for order in &orders {
        *principal.entry(order.locked_denom().to_string()).or_default() += order.remain_locked;
        let placement = fees::order_placement_fee(order);
        if placement.is_positive() {
            *fee.entry(placement.denom).or_default() += placement.amount;
        }
    }

    compare(LockKind::Quantity, "quantity", &ledger.locked_total(LockKind::Quantity), &principal)?;
    compare(LockKind::Fee, "fee", &ledger.locked_total(LockKind::Fee), &fee)
}

fn compare(
    kind: LockKind,
    label: &'static str,
    locked: &BTreeMap<String, Decimal>,
    expected: &BTreeMap<String, Decimal>,
) -> Result<(), InvariantError> {
    for denom in locked.keys().chain(expected.keys()) {
        let have = locked.get(denom).copied().unwrap_or_default();
        let want = expected.get(denom).copied().unwrap_or_default();
        if have != want {
            error!(kind = ?kind, denom = %denom, locked = %have, expected = %want, "locked funds mismatch");
            return Err(InvariantError::LockedFundsMismatch {
                kind: label,
                denom: denom.clone(),
                locked: have.to_string(),
                expected: want.to_string(),
            });
        }
    }
    Ok(())
}

/// Every depth book level equals the remaining quantity of its open orders,
/// and the open order counter equals the number of indexed orders
pub fn check_books(keeper: &Keeper, store: &dyn KvStore) -> Result<(), InvariantError> {
    let orders = keeper.open_orders(store)?;
    let counted = orders.len() as i64;
    let stored = keeper.disk_cache().open_num();
    if counted != stored {
        return Err(InvariantError::OpenCountMismatch { counted, stored });
    }

    let mut levels: BTreeMap<(ProductId, Price), (Quantity, Quantity)> = BTreeMap::new();
    for order in &orders {
        let level = levels
            .entry((order.product.clone(), order.price))
            .or_insert((Quantity::zero(), Quantity::zero()));
        add_remaining(level, order);
    }

    for (product, _) in keeper.disk_cache().depth_book_sizes() {
        let Some(book) = keeper.disk_cache().depth_book(&product) else {
            continue;
        };
        for item in &book.items {
            let expected = levels
                .remove(&(product.clone(), item.price))
                .unwrap_or((Quantity::zero(), Quantity::zero()));
            if (item.buy_quantity, item.sell_quantity) != expected {
                return Err(mismatch(&product, item.price));
            }
        }
    }
    if let Some(((product, price), _)) = levels.into_iter().next() {
        return Err(mismatch(&product, price));
    }
    Ok(())
}

fn add_remaining(level: &mut (Quantity, Quantity), order: &Order) {
    match order.side {
        Side::BUY => level.0 += order.remain_quantity,
        Side::SELL => level.1 += order.remain_quantity,
    }
}

fn mismatch(product: &ProductId, price: Price) -> InvariantError {
    error!(product = %product, price = %price, "depth book mismatch");
    InvariantError::DepthBookMismatch {
        product: product.to_string(),
        price: price.to_string(),
    }
}
