//! CLI command implementations

mod common;
pub mod config;
pub mod quantity;
pub mod remove;
pub mod show;

pub use config::execute as config;
pub use quantity::{dec, inc, set};
pub use remove::execute as remove;
pub use show::execute as show;
