//! Matching Engine Service
//!
//! Periodic-auction matching core of an on-chain spot exchange. Orders
//! collected during a block are matched at its end: one clearing price per
//! product, fills in price-then-time priority, all under a per-block deal
//! budget. A match that exceeds the budget locks its product and continues
//! in the following blocks.
//!
//! **Key Invariants:**
//! - Deterministic matching (same inputs, same outputs)
//! - Locked funds always equal what open orders still hold
//! - Depth books always equal the remaining quantity of open orders
//! - A locked product accepts no new orders and no cancellations

pub mod book;
pub mod cache;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod disk_cache;
pub mod engine;
pub mod errors;
pub mod expiry;
pub mod fees;
pub mod handler;
pub mod invariant;
pub mod keeper;
pub mod matching;
pub mod query;
pub mod store;

pub use collaborators::{InMemoryLedger, InMemoryRegistry, Ledger, ProductInfo, ProductRegistry};
pub use config::EngineParams;
pub use context::BlockContext;
pub use engine::MatchingEngine;
pub use errors::{EngineError, InvariantError, StoreError};
pub use handler::{OrderItem, OrderResult};
pub use store::{KvStore, MemStore};
