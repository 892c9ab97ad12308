//! Property tests using `proptest`.
//! Random books and random order flow against the depth book, the auction
//! and the locked-funds invariants.

mod common;

use common::{dec, Harness};
use matching_engine::book::DepthBook;
use matching_engine::matching::periodic_auction_match_price;
use proptest::prelude::*;
use rust_decimal::Decimal;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::Side;

fn side(is_buy: bool) -> Side {
    if is_buy {
        Side::BUY
    } else {
        Side::SELL
    }
}

fn tenths(n: i64) -> Decimal {
    Decimal::new(n, 1)
}

/// (is_buy, price in tenths, quantity in tenths)
fn level_entries() -> impl Strategy<Value = Vec<(bool, i64, i64)>> {
    prop::collection::vec((any::<bool>(), 50i64..150, 1i64..500), 0..30)
}

#[derive(Debug, Clone)]
enum Action {
    Place { trader: usize, is_buy: bool, price: i64, quantity: i64 },
    Cancel { trader: usize, pick: usize },
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => (0usize..3, any::<bool>(), 95i64..106, 1i64..40).prop_map(|(trader, is_buy, price, quantity)| {
            Action::Place { trader, is_buy, price, quantity }
        }),
        1 => (0usize..3, any::<usize>()).prop_map(|(trader, pick)| Action::Cancel { trader, pick }),
    ]
}

const TRADERS: [&str; 3] = ["alice", "bob", "carol"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn depth_book_insert_then_remove_is_empty(entries in level_entries()) {
        let mut book = DepthBook::new();
        for (is_buy, price, quantity) in &entries {
            book.add(Price::new(tenths(*price)), side(*is_buy), Quantity::new(tenths(*quantity)));
        }
        for pair in book.items.windows(2) {
            prop_assert!(pair[0].price > pair[1].price);
        }

        for (is_buy, price, quantity) in &entries {
            let index = book.items.iter().position(|item| item.price == Price::new(tenths(*price)));
            prop_assert!(index.is_some());
            let index = index.unwrap();
            let quantity = Quantity::new(tenths(*quantity));
            if *is_buy {
                book.sub(index, quantity, Quantity::zero());
            } else {
                book.sub(index, Quantity::zero(), quantity);
            }
            book.remove_if_empty(index);
        }
        prop_assert!(book.is_empty());
    }

    #[test]
    fn auction_quantity_bounded_by_book(entries in level_entries(), reference in 50i64..150) {
        let mut book = DepthBook::new();
        let mut total_buy = Decimal::ZERO;
        let mut total_sell = Decimal::ZERO;
        for (is_buy, price, quantity) in &entries {
            book.add(Price::new(tenths(*price)), side(*is_buy), Quantity::new(tenths(*quantity)));
            if *is_buy {
                total_buy += tenths(*quantity);
            } else {
                total_sell += tenths(*quantity);
            }
        }

        let reference = Price::new(tenths(reference));
        let auction = periodic_auction_match_price(&book, 1, reference);
        prop_assert!(auction.quantity.as_decimal() <= total_buy.min(total_sell));

        if auction.quantity.is_zero() {
            prop_assert_eq!(auction.price, reference);
        } else {
            let highest = book.items.first().map(|item| item.price);
            let lowest = book.items.last().map(|item| item.price);
            prop_assert!(Some(auction.price) <= highest);
            prop_assert!(Some(auction.price) >= lowest);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn random_order_flow_keeps_funds_consistent(
        blocks in prop::collection::vec(prop::collection::vec(action(), 0..8), 1..6),
        max_deals in 1i64..6,
    ) {
        let mut h = Harness::with_params(matching_engine::EngineParams {
            max_deals_per_block: max_deals,
            ..matching_engine::EngineParams::default()
        });
        for who in TRADERS {
            h.fund(who, "okt", "100000");
            h.fund(who, "xxb", "10000");
        }

        let mut placed: Vec<OrderId> = Vec::new();
        for actions in blocks {
            h.begin_block();
            for action in actions {
                match action {
                    Action::Place { trader, is_buy, price, quantity } => {
                        let result = h.place(
                            TRADERS[trader],
                            side(is_buy),
                            &tenths(price).to_string(),
                            &tenths(quantity).to_string(),
                        );
                        if let Some(order_id) = result.order_id {
                            placed.push(order_id);
                        }
                    }
                    Action::Cancel { trader, pick } => {
                        if placed.is_empty() {
                            continue;
                        }
                        let order_id = placed[pick % placed.len()];
                        let results = h.cancel(TRADERS[trader], &[order_id]);
                        prop_assert!(results.is_ok());
                    }
                }
            }
            h.end_block();
            prop_assert!(h.engine.check_invariants(&h.store, &h.ledger).is_ok());
        }

        // a lock leaves one side settled ahead of the other until it clears
        for _ in 0..100 {
            if h.engine.product_lock(&h.store, &common::product()).unwrap().is_none() {
                break;
            }
            h.skip_block();
        }
        prop_assert!(h.engine.product_lock(&h.store, &common::product()).unwrap().is_none());

        // settlement and fees move funds, they never create or burn them
        prop_assert_eq!(h.ledger.supply("okt"), dec("300000"));
        prop_assert_eq!(h.ledger.supply("xxb"), dec("30000"));
    }
}
