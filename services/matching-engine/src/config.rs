//! Engine parameters
//!
//! Governance-controlled values. They may be replaced between blocks; an
//! order keeps the expiry horizon and holding fee rate it was placed with.

use crate::errors::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::account::Coin;

/// Denomination of the holding fee by default
pub const DEFAULT_FEE_DENOM: &str = "okt";

/// Parameters of the matching engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Blocks an order may rest before the expiry sweep closes it.
    pub order_expire_blocks: i64,
    /// Fills allowed across all products in one block.
    pub max_deals_per_block: i64,
    /// Holding fee accrued per block an order rests.
    pub fee_per_block: Coin,
    /// Trade fee as a fraction of the quote notional.
    pub trade_fee_rate: Decimal,
    /// Smallest trade fee ever charged.
    pub min_trade_fee: Decimal,
    /// Holding fee multiplier applied to batches of more than one order.
    pub batch_fee_ratio: Decimal,
    /// Largest placement batch.
    pub max_order_items: usize,
    /// Largest cancellation batch.
    pub max_cancel_items: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            order_expire_blocks: 259_200,
            max_deals_per_block: 1000,
            fee_per_block: Coin::new(DEFAULT_FEE_DENOM, Decimal::new(1, 6)),
            trade_fee_rate: Decimal::new(1, 3),
            min_trade_fee: Decimal::new(1, 8),
            batch_fee_ratio: Decimal::new(8, 1),
            max_order_items: 200,
            max_cancel_items: 200,
        }
    }
}

impl EngineParams {
    /// Parse parameters from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let params: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.order_expire_blocks <= 0 {
            return Err(invalid("order_expire_blocks", "must be positive"));
        }
        if self.max_deals_per_block <= 0 {
            return Err(invalid("max_deals_per_block", "must be positive"));
        }
        if self.fee_per_block.amount.is_sign_negative() {
            return Err(invalid("fee_per_block", "must not be negative"));
        }
        if self.fee_per_block.denom.is_empty() {
            return Err(invalid("fee_per_block", "denomination is empty"));
        }
        if self.trade_fee_rate.is_sign_negative() || self.trade_fee_rate >= Decimal::ONE {
            return Err(invalid("trade_fee_rate", "must be in [0, 1)"));
        }
        if self.min_trade_fee.is_sign_negative() {
            return Err(invalid("min_trade_fee", "must not be negative"));
        }
        if self.batch_fee_ratio.is_sign_negative() || self.batch_fee_ratio > Decimal::ONE {
            return Err(invalid("batch_fee_ratio", "must be in [0, 1]"));
        }
        if self.max_order_items == 0 {
            return Err(invalid("max_order_items", "must be positive"));
        }
        if self.max_cancel_items == 0 {
            return Err(invalid("max_cancel_items", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
