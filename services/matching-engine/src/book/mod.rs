//! Order book infrastructure module
//!
//! Contains the aggregated depth book and the FIFO order index.

pub mod depth_book;
pub mod order_index;

pub use depth_book::{DepthBook, DepthBookItem};
pub use order_index::{OrderIdsKey, OrderIndex};
