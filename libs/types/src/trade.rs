//! Auction results and match continuation state
//!
//! A periodic auction clears a product at one price per block. The fills it
//! produces are reported as deals; a match that ran out of deal budget is
//! carried into later blocks by a product lock.

use crate::ids::{OrderId, ProductId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One fill of one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub order_id: OrderId,
    pub side: Side,
    pub quantity: Quantity,
    /// Trade fee charged for this fill, rendered as a coin string
    pub fee: String,
}

/// Outcome of one product's auction in one block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub block_height: i64,
    pub price: Price,
    pub quantity: Quantity,
    pub deals: Vec<Deal>,
}

/// All auction outcomes of one block, kept for one block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockMatchResult {
    pub block_height: i64,
    pub timestamp: i64,
    pub results: BTreeMap<ProductId, MatchResult>,
}

/// Frozen parameters of an auction still executing across blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLock {
    /// Height at which the auction price was discovered
    pub block_height: i64,
    pub price: Price,
    pub quantity: Quantity,
    pub buy_executed: Quantity,
    pub sell_executed: Quantity,
}

impl ProductLock {
    /// Both sides have executed the full auction quantity
    pub fn is_complete(&self) -> bool {
        self.buy_executed >= self.quantity && self.sell_executed >= self.quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_product_lock_completion() {
        let mut lock = ProductLock {
            block_height: 10,
            price: Price::from_str("10.0").unwrap(),
            quantity: Quantity::from_str("2.0").unwrap(),
            buy_executed: Quantity::from_str("2.0").unwrap(),
            sell_executed: Quantity::from_str("1.5").unwrap(),
        };
        assert!(!lock.is_complete());
        lock.sell_executed = Quantity::from_str("2.0").unwrap();
        assert!(lock.is_complete());
    }

    #[test]
    fn test_block_match_result_serialization() {
        let mut result = BlockMatchResult {
            block_height: 3,
            timestamp: 1_700_000_000,
            results: BTreeMap::new(),
        };
        result.results.insert(
            ProductId::new("xxb_okt"),
            MatchResult {
                block_height: 3,
                price: Price::from_str("10.0").unwrap(),
                quantity: Quantity::from_str("1.0").unwrap(),
                deals: vec![Deal {
                    order_id: OrderId::new(3, 1),
                    side: Side::BUY,
                    quantity: Quantity::from_str("1.0").unwrap(),
                    fee: "0.01okt".to_string(),
                }],
            },
        );
        let json = serde_json::to_string(&result).unwrap();
        let back: BlockMatchResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
    }
}
