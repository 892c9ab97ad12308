//! Fee kinds recorded on orders

use serde::{Deserialize, Serialize};

/// Fee kind, each recorded under its own order annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeType {
    /// Placement fee locked when the order is created
    OrderNew,
    /// Holding fee charged on user cancellation
    OrderCancel,
    /// Holding fee charged when the order expires
    OrderExpire,
    /// Trade fee, accumulated over every fill
    OrderDeal,
    /// Unused placement fee returned on full fill
    OrderReceive,
}

impl FeeType {
    /// Annotation key under which the fee is stored on the order
    pub fn annotation_key(&self) -> &'static str {
        match self {
            FeeType::OrderNew => "newFee",
            FeeType::OrderCancel => "cancelFee",
            FeeType::OrderExpire => "expireFee",
            FeeType::OrderDeal => "dealFee",
            FeeType::OrderReceive => "receiveFee",
        }
    }

    /// Whether repeated records add up instead of overwriting
    pub fn accumulates(&self) -> bool {
        matches!(self, FeeType::OrderDeal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_keys_are_distinct() {
        let kinds = [
            FeeType::OrderNew,
            FeeType::OrderCancel,
            FeeType::OrderExpire,
            FeeType::OrderDeal,
            FeeType::OrderReceive,
        ];
        let mut keys: Vec<_> = kinds.iter().map(|k| k.annotation_key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), kinds.len());
        assert!(FeeType::OrderDeal.accumulates());
        assert!(!FeeType::OrderNew.accumulates());
    }
}
