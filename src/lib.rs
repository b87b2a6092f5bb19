//! cartsync - optimistic shopping-cart synchronization
//!
//! Applies quantity changes to a local cart snapshot immediately,
//! coalesces rapid edits into one write per line and reconciles the
//! server's answer, rolling back lines whose writes fail.

pub mod cart;
pub mod cli;
pub mod config;
pub mod error;
pub mod journal;
pub mod ui;

pub use error::{CartError, CartResult};
