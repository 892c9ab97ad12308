//! Block execution context
//!
//! Everything an engine operation may touch besides its own caches: the
//! current height and time, storage, the ledger and the product registry.

use crate::collaborators::{Ledger, ProductRegistry};
use crate::store::KvStore;

pub struct BlockContext<'a> {
    pub height: i64,
    /// Block time in unix seconds
    pub timestamp: i64,
    pub store: &'a mut dyn KvStore,
    pub ledger: &'a mut dyn Ledger,
    pub registry: &'a mut dyn ProductRegistry,
}

impl<'a> BlockContext<'a> {
    pub fn new(
        height: i64,
        timestamp: i64,
        store: &'a mut dyn KvStore,
        ledger: &'a mut dyn Ledger,
        registry: &'a mut dyn ProductRegistry,
    ) -> Self {
        Self {
            height,
            timestamp,
            store,
            ledger,
            registry,
        }
    }
}
