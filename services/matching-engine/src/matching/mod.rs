//! Periodic auction matching
//!
//! `auction` discovers the clearing price, `fill` executes orders at it and
//! `executor` drives both for every product at the end of a block.

pub mod auction;
pub mod executor;
pub mod fill;

pub use auction::{periodic_auction_match_price, AuctionPrice};
pub use executor::match_orders;
