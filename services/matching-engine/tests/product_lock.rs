//! Deal budget exhaustion and cross-block continuation
//!
//! A budget of two fills forces a three-buy, one-sell auction to spill into
//! the next block. The product stays locked until both sides reach the
//! auction quantity, and the final state matches an unconstrained run.

mod common;

use common::{dec, price, product, qty, Harness};
use matching_engine::{EngineParams, ProductRegistry};
use types::ids::OrderId;
use types::order::{OrderStatus, Side};

fn harness(max_deals: i64) -> Harness {
    let mut h = Harness::with_params(EngineParams {
        max_deals_per_block: max_deals,
        ..EngineParams::default()
    });
    h.fund("alice", "okt", "100");
    h.fund("bob", "xxb", "10");
    h.fund("bob", "okt", "10");
    h
}

/// Three single-unit buys against one three-unit sell, all at 10.0
fn place_crossing_orders(h: &mut Harness) -> Vec<OrderId> {
    let mut ids: Vec<OrderId> = (0..3).map(|_| h.place_ok("alice", Side::BUY, "10.0", "1.0")).collect();
    ids.push(h.place_ok("bob", Side::SELL, "10.0", "3.0"));
    ids
}

// ═══════════════════════════════════════════════════════════════════════════
// LOCK CREATION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_budget_exhaustion_locks_product() {
    let mut h = harness(2);
    h.begin_block();
    let ids = place_crossing_orders(&mut h);
    h.end_block();

    let lock = h.engine.product_lock(&h.store, &product()).unwrap().expect("product should be locked");
    assert_eq!(lock.block_height, 1);
    assert_eq!(lock.price, price("10.0"));
    assert_eq!(lock.quantity, qty("3.0"));
    assert_eq!(lock.buy_executed, qty("2.0"));
    assert!(lock.sell_executed.is_zero());
    assert!(h.registry.is_locked(&product()));

    assert_eq!(h.must_order(&ids[0]).status, OrderStatus::Filled);
    assert_eq!(h.must_order(&ids[1]).status, OrderStatus::Filled);
    assert_eq!(h.must_order(&ids[2]).status, OrderStatus::Open);
    assert_eq!(h.must_order(&ids[3]).remain_quantity, qty("3.0"));
    h.assert_invariants();
}

#[test]
fn test_locked_product_rejects_orders_and_cancels() {
    let mut h = harness(2);
    h.begin_block();
    let ids = place_crossing_orders(&mut h);
    h.end_block();

    h.begin_block();
    let placed = h.place("alice", Side::BUY, "10.0", "1.0");
    assert_eq!(placed.code, 13);
    let cancelled = h.cancel("bob", &[ids[3]]).unwrap();
    assert_eq!(cancelled[0].code, 13);
    h.end_block();
}

// ═══════════════════════════════════════════════════════════════════════════
// CONTINUATION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_lock_resumes_and_clears_next_block() {
    let mut h = harness(2);
    h.begin_block();
    let ids = place_crossing_orders(&mut h);
    h.end_block();

    h.skip_block();
    assert!(h.engine.product_lock(&h.store, &product()).unwrap().is_none());
    assert!(!h.registry.is_locked(&product()));

    let result = h.engine.block_match_result().expect("resumed fills are reported");
    let resumed = &result.results[&product()];
    assert_eq!(result.block_height, 2);
    assert_eq!(resumed.block_height, 1);
    assert_eq!(resumed.deals.len(), 2);

    // filled in the first block, so deleted one block later
    assert!(h.order(&ids[0]).is_none());
    assert!(h.order(&ids[1]).is_none());
    for id in &ids[2..] {
        assert_eq!(h.must_order(id).status, OrderStatus::Filled);
    }
    assert!(h.engine.depth_book(&product(), 10).asks.is_empty());
    assert_eq!(h.available("alice", "xxb"), dec("3"));
    h.assert_invariants();
}

#[test]
fn test_split_execution_matches_single_block() {
    let mut constrained = harness(2);
    constrained.begin_block();
    let ids = place_crossing_orders(&mut constrained);
    constrained.end_block();
    constrained.skip_block();
    constrained.skip_block();

    let mut unconstrained = harness(1000);
    unconstrained.begin_block();
    let same_ids = place_crossing_orders(&mut unconstrained);
    unconstrained.end_block();
    unconstrained.skip_block();

    assert_eq!(ids, same_ids);
    for id in &ids {
        assert!(constrained.order(id).is_none());
        assert!(unconstrained.order(id).is_none());
    }
    assert_eq!(
        constrained.engine.depth_book(&product(), 10),
        unconstrained.engine.depth_book(&product(), 10)
    );
    assert_eq!(constrained.engine.store_statistics(), unconstrained.engine.store_statistics());
    for who in ["alice", "bob"] {
        assert_eq!(constrained.available(who, "xxb"), unconstrained.available(who, "xxb"));
        // the resumed fills rested one block longer
        assert_eq!(
            constrained.available(who, "okt"),
            unconstrained.available(who, "okt") - dec("0.000001")
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// EXPIRY WHILE LOCKED
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_expiry_deferred_until_unlock() {
    let mut h = Harness::with_params(EngineParams {
        max_deals_per_block: 2,
        order_expire_blocks: 1,
        ..EngineParams::default()
    });
    h.fund("alice", "okt", "100");
    h.fund("bob", "xxb", "10");
    h.fund("bob", "okt", "10");

    h.begin_block();
    let ids = place_crossing_orders(&mut h);
    let resting = h.place_ok("alice", Side::BUY, "9.0", "1.0");
    h.end_block();

    // due at height 2, but the product is still locked when the sweep runs
    h.skip_block();
    assert!(h.engine.product_lock(&h.store, &product()).unwrap().is_none());
    assert_eq!(h.must_order(&resting).status, OrderStatus::Open);
    assert_eq!(h.must_order(&ids[2]).status, OrderStatus::Filled);

    h.skip_block();
    assert_eq!(h.must_order(&resting).status, OrderStatus::Expired);
    h.assert_invariants();
}
