//! Order lifecycle across blocks
//!
//! Placement rejections, cancellation refunds, height-driven expiry, the
//! one-block deferred deletion of closed orders and delisted products.

mod common;

use common::{dec, product, qty, Harness};
use matching_engine::{EngineError, EngineParams, ProductRegistry};
use types::errors::OrderError;
use types::ids::OrderId;
use types::order::{OrderStatus, Side};

// ═══════════════════════════════════════════════════════════════════════════
// PLACEMENT
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_order_ids_follow_block_sequence() {
    let mut h = Harness::new();
    h.fund("alice", "okt", "100");

    h.begin_block();
    let first = h.place_ok("alice", Side::BUY, "1.0", "1.0");
    let second = h.place_ok("alice", Side::BUY, "1.0", "1.0");
    h.end_block();
    h.begin_block();
    let third = h.place_ok("alice", Side::BUY, "1.0", "1.0");
    h.end_block();

    assert_eq!(first, OrderId::new(1, 1));
    assert_eq!(second, OrderId::new(1, 2));
    assert_eq!(third, OrderId::new(2, 1));
    assert_eq!(third.to_string(), "ID0000000002-1");
}

#[test]
fn test_rejected_items_do_not_block_siblings() {
    let mut h = Harness::new();
    h.fund("alice", "okt", "15");

    h.begin_block();
    let results = h.place_batch(
        "alice",
        &[
            (Side::BUY, "10.0", "1.0"),
            (Side::BUY, "10.05", "1.0"),
            (Side::BUY, "10.0", "0.05"),
            (Side::BUY, "10.0", "1.0"),
        ],
    );
    assert!(results[0].is_success());
    assert_eq!(results[1].code, 3);
    assert_eq!(results[2].code, 4);
    // second 10.0 order no longer fits the remaining balance
    assert_eq!(results[3].code, 14);
    assert!(results[3].order_id.is_none());
    h.end_block();

    assert_eq!(h.engine.store_statistics().open_order_num, 1);
    h.assert_invariants();
}

#[test]
fn test_out_of_range_notional_rejected_per_item() {
    let mut h = Harness::new();
    h.fund("alice", "okt", "100");
    h.fund("bob", "xxb", "10");

    h.begin_block();
    let results = h.place_batch(
        "alice",
        &[
            (Side::BUY, "1000000000000000.0", "1000000000000000.0"),
            (Side::BUY, "10.0", "1.0"),
        ],
    );
    assert_eq!(results[0].code, 15);
    assert!(results[0].order_id.is_none());
    assert!(results[1].is_success());

    let sell = h.place("bob", Side::SELL, "1000000000000000.0", "1000000000000000.0");
    assert_eq!(sell.code, 15);
    h.end_block();

    assert_eq!(h.engine.store_statistics().open_order_num, 1);
    assert_eq!(h.available("bob", "xxb"), dec("10"));
    h.assert_invariants();
}

#[test]
fn test_delisting_product_rejects_orders() {
    let mut h = Harness::new();
    h.fund("alice", "okt", "100");
    h.registry.set_delisting(&product(), true);

    h.begin_block();
    let result = h.place("alice", Side::BUY, "10.0", "1.0");
    assert_eq!(result.code, 2);
    h.end_block();
}

// ═══════════════════════════════════════════════════════════════════════════
// CANCELLATION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cancel_refunds_principal_and_unused_fee() {
    let mut h = Harness::new();
    h.fund("alice", "okt", "100");

    h.begin_block();
    let id = h.place_ok("alice", Side::BUY, "10.0", "1.0");
    assert_eq!(h.available("alice", "okt"), dec("89.7408"));
    h.end_block();

    h.begin_block();
    let results = h.cancel("alice", &[id]).unwrap();
    assert!(results[0].is_success());
    assert_eq!(results[0].message, "cancel fee: 0.000001okt");
    h.end_block();

    // one block of holding fee is all that is kept
    assert_eq!(h.available("alice", "okt"), dec("99.999999"));
    assert_eq!(h.ledger.collected_fees("okt"), dec("0.000001"));
    let order = h.must_order(&id);
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.remain_locked, dec("0"));
    assert_eq!(order.extra_info.get("cancelFee").map(String::as_str), Some("0.000001okt"));
    assert!(h.engine.depth_book(&product(), 10).bids.is_empty());
    h.assert_invariants();
}

#[test]
fn test_cancel_rejections_per_item() {
    let mut h = Harness::new();
    h.fund("alice", "okt", "100");

    h.begin_block();
    let id = h.place_ok("alice", Side::BUY, "10.0", "1.0");
    h.end_block();

    h.begin_block();
    let results = h.cancel("mallory", &[id, OrderId::new(9, 9)]).unwrap();
    assert_eq!(results[0].code, 12);
    assert_eq!(results[1].code, 10);

    let results = h.cancel("alice", &[id]).unwrap();
    assert!(results[0].is_success());
    let results = h.cancel("alice", &[id]).unwrap();
    assert_eq!(results[0].code, 11);

    let duplicate = h.cancel("alice", &[id, id]);
    assert_eq!(
        duplicate,
        Err(EngineError::Order(OrderError::DuplicateOrderId { order_id: id }))
    );
    h.end_block();
}

#[test]
fn test_partially_filled_order_cancels_as_partial() {
    let mut h = Harness::new();
    h.fund("alice", "okt", "100");
    h.fund("bob", "xxb", "10");
    h.fund("bob", "okt", "10");

    h.begin_block();
    let buy = h.place_ok("alice", Side::BUY, "10.0", "3.0");
    h.place_ok("bob", Side::SELL, "10.0", "1.0");
    h.end_block();

    h.begin_block();
    h.cancel("alice", &[buy]).unwrap();
    h.end_block();

    let order = h.must_order(&buy);
    assert_eq!(order.status, OrderStatus::PartialFilledCancelled);
    assert_eq!(order.filled_quantity(), qty("1.0"));
    assert_eq!(h.available("alice", "xxb"), dec("1"));
    h.assert_invariants();
}

// ═══════════════════════════════════════════════════════════════════════════
// EXPIRY AND DEFERRED DELETION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_order_expires_after_horizon() {
    let mut h = Harness::with_params(EngineParams {
        order_expire_blocks: 3,
        ..EngineParams::default()
    });
    h.fund("alice", "okt", "100");

    h.begin_block();
    let id = h.place_ok("alice", Side::BUY, "10.0", "1.0");
    h.end_block();

    h.skip_block();
    h.skip_block();
    assert_eq!(h.must_order(&id).status, OrderStatus::Open);

    h.skip_block();
    let order = h.must_order(&id);
    assert_eq!(order.status, OrderStatus::Expired);
    assert_eq!(order.extra_info.get("expireFee").map(String::as_str), Some("0.000003okt"));
    assert_eq!(h.available("alice", "okt"), dec("99.999997"));
    assert_eq!(h.engine.operation_metric().expire_num, 1);
    h.assert_invariants();

    // closed orders stay queryable for one block
    h.skip_block();
    assert!(h.order(&id).is_none());
    assert_eq!(h.engine.store_statistics().stored_order_num, 0);
}

#[test]
fn test_filled_order_deleted_next_block() {
    let mut h = Harness::new();
    h.fund("alice", "okt", "100");
    h.fund("bob", "xxb", "10");
    h.fund("bob", "okt", "10");

    h.begin_block();
    let buy = h.place_ok("alice", Side::BUY, "10.0", "1.0");
    let sell = h.place_ok("bob", Side::SELL, "10.0", "1.0");
    h.end_block();

    assert_eq!(h.must_order(&buy).status, OrderStatus::Filled);
    assert_eq!(h.engine.store_statistics().stored_order_num, 2);
    assert_eq!(h.engine.store_statistics().open_order_num, 0);

    h.skip_block();
    assert!(h.order(&buy).is_none());
    assert!(h.order(&sell).is_none());
    assert_eq!(h.engine.store_statistics().stored_order_num, 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// DELISTED PRODUCTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_delisted_product_orders_cancelled() {
    let mut h = Harness::new();
    h.fund("alice", "okt", "100");
    h.fund("bob", "xxb", "10");
    h.fund("bob", "okt", "10");

    h.begin_block();
    let buy = h.place_ok("alice", Side::BUY, "9.0", "1.0");
    let sell = h.place_ok("bob", Side::SELL, "11.0", "2.0");
    h.end_block();

    h.registry.remove_product(&product());
    assert!(!h.registry.exists(&product()));
    h.skip_block();

    assert_eq!(h.must_order(&buy).status, OrderStatus::Cancelled);
    assert_eq!(h.must_order(&sell).status, OrderStatus::Cancelled);
    assert_eq!(h.available("bob", "xxb"), dec("10"));
    assert!(h.engine.store_statistics().depth_book_sizes.is_empty());
    h.assert_invariants();
}

// ═══════════════════════════════════════════════════════════════════════════
// RESTART
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_fresh_engine_hydrates_books_from_storage() {
    let mut h = Harness::new();
    h.fund("alice", "okt", "100");

    h.begin_block();
    h.place_ok("alice", Side::BUY, "9.0", "1.0");
    h.place_ok("alice", Side::BUY, "9.5", "2.0");
    h.end_block();

    h.engine = matching_engine::MatchingEngine::new(EngineParams::default()).unwrap();
    h.begin_block();
    let book = h.engine.depth_book(&product(), 10);
    assert_eq!(book.bids.len(), 2);
    assert_eq!(book.bids[0].quantity, qty("2.0"));
    assert_eq!(h.engine.store_statistics().open_order_num, 2);
    h.end_block();
    h.assert_invariants();
}
