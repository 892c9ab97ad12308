//! Types library for the periodic-auction spot exchange
//!
//! This library provides the value types shared by the order engine and its
//! collaborators, ensuring deterministic behavior across replicas.
//!
//! # Modules
//! - `ids`: Identifiers (OrderId, AccountId, ProductId)
//! - `numeric`: Fixed-point decimal types (Price, Quantity)
//! - `order`: Order lifecycle types
//! - `trade`: Auction results and product locks
//! - `account`: Coin and balance types
//! - `fee`: Fee kinds
//! - `errors`: Error taxonomy

pub mod account;
pub mod errors;
pub mod fee;
pub mod ids;
pub mod numeric;
pub mod order;
pub mod trade;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::account::*;
    pub use crate::errors::*;
    pub use crate::fee::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::trade::*;
}
