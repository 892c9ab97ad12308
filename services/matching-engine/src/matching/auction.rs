//! Periodic auction price discovery
//!
//! One clearing price per product per block, chosen from the depth book
//! levels by four successive rules:
//!
//! 0. Executable volume at a level is `min(buy_cum, sell_cum)`, where
//!    `buy_cum` sums buys at this price and above and `sell_cum` sums sells
//!    at this price and below. No volume anywhere means no trade.
//! 1. Keep the levels with maximal executable volume.
//! 2. Among those, keep the levels with minimal `|buy_cum - sell_cum|`.
//! 3. Move the reference price 5% towards the pressure (up if every
//!    remaining imbalance is positive, down if every one is negative),
//!    round it, then clamp it into the remaining price range.

use crate::book::DepthBook;
use rust_decimal::Decimal;
use types::numeric::{Price, Quantity};

/// Outcome of price discovery
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuctionPrice {
    pub price: Price,
    pub quantity: Quantity,
}

/// Running totals per level: buys at or above, sells at or below
fn cumulative_sums(book: &DepthBook) -> (Vec<Decimal>, Vec<Decimal>) {
    let n = book.items.len();
    let mut buy_cum = Vec::with_capacity(n);
    let mut running = Decimal::ZERO;
    for item in &book.items {
        running += item.buy_quantity.as_decimal();
        buy_cum.push(running);
    }

    let mut sell_cum = vec![Decimal::ZERO; n];
    running = Decimal::ZERO;
    for (i, item) in book.items.iter().enumerate().rev() {
        running += item.sell_quantity.as_decimal();
        sell_cum[i] = running;
    }
    (buy_cum, sell_cum)
}

/// Clearing price and executable quantity of `book`
///
/// Returns `(reference_price, 0)` when nothing can trade.
pub fn periodic_auction_match_price(book: &DepthBook, price_precision: u32, reference_price: Price) -> AuctionPrice {
    let no_trade = AuctionPrice {
        price: reference_price,
        quantity: Quantity::zero(),
    };
    if book.items.is_empty() {
        return no_trade;
    }

    let (buy_cum, sell_cum) = cumulative_sums(book);
    let execution: Vec<Decimal> = buy_cum.iter().zip(&sell_cum).map(|(b, s)| (*b).min(*s)).collect();
    let max_execution = execution.iter().copied().max().unwrap_or(Decimal::ZERO);
    if max_execution <= Decimal::ZERO {
        return no_trade;
    }

    let rule1: Vec<usize> = (0..execution.len()).filter(|&i| execution[i] == max_execution).collect();

    let imbalance = |i: usize| buy_cum[i] - sell_cum[i];
    let min_abs = rule1.iter().map(|&i| imbalance(i).abs()).min().unwrap_or(Decimal::ZERO);
    let rule2: Vec<usize> = rule1.into_iter().filter(|&i| imbalance(i).abs() == min_abs).collect();

    let target = if rule2.iter().all(|&i| imbalance(i) > Decimal::ZERO) {
        reference_price.as_decimal() * Decimal::new(105, 2)
    } else if rule2.iter().all(|&i| imbalance(i) < Decimal::ZERO) {
        reference_price.as_decimal() * Decimal::new(95, 2)
    } else {
        reference_price.as_decimal()
    };
    let target = Price::new(target).round_to(price_precision);

    // items are price-descending, so the first candidate is the highest
    let highest = book.items[rule2[0]].price;
    let lowest = book.items[rule2[rule2.len() - 1]].price;

    AuctionPrice {
        price: clamp_to_range(target, lowest, highest),
        quantity: Quantity::new(max_execution),
    }
}

/// Clamp `target` into `[lowest, highest]`
fn clamp_to_range(target: Price, lowest: Price, highest: Price) -> Price {
    if highest <= target {
        highest
    } else if lowest >= target {
        lowest
    } else {
        target
    }
}
