//! Per-block transient cache
//!
//! Counters and results that only describe the current block. Cleared at
//! the start of every block.

use types::ids::OrderId;
use types::trade::BlockMatchResult;

#[derive(Debug, Clone, Default)]
pub struct Cache {
    full_fill_num: i64,
    partial_fill_num: i64,
    cancel_num: i64,
    expire_num: i64,
    updated_order_ids: Vec<OrderId>,
    block_match_result: Option<BlockMatchResult>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn inc_full_fill_num(&mut self) {
        self.full_fill_num += 1;
    }

    pub fn inc_partial_fill_num(&mut self) {
        self.partial_fill_num += 1;
    }

    pub fn inc_cancel_num(&mut self) {
        self.cancel_num += 1;
    }

    pub fn inc_expire_num(&mut self) {
        self.expire_num += 1;
    }

    pub fn full_fill_num(&self) -> i64 {
        self.full_fill_num
    }

    pub fn partial_fill_num(&self) -> i64 {
        self.partial_fill_num
    }

    pub fn cancel_num(&self) -> i64 {
        self.cancel_num
    }

    pub fn expire_num(&self) -> i64 {
        self.expire_num
    }

    /// Record an order whose stored state changed this block
    pub fn add_updated_order_id(&mut self, order_id: OrderId) {
        self.updated_order_ids.push(order_id);
    }

    pub fn updated_order_ids(&self) -> &[OrderId] {
        &self.updated_order_ids
    }

    pub fn set_block_match_result(&mut self, result: BlockMatchResult) {
        self.block_match_result = Some(result);
    }

    pub fn block_match_result(&self) -> Option<&BlockMatchResult> {
        self.block_match_result.as_ref()
    }
}
