//! Optimistic cart synchronization
//!
//! - [`snapshot`]: local cart lines, mutated immediately on user input
//! - [`pending`]: per-line write coalescing
//! - [`reconcile`]: authoritative writes with retry and rollback
//! - [`sync`]: the handle a view drives

pub mod api;
pub mod http;
pub mod line;
pub mod pending;
pub mod reconcile;
pub mod snapshot;
pub mod state;
pub mod sync;

#[cfg(test)]
pub(crate) mod mock;

pub use api::{CartApi, CartPayload, UpdateReply};
pub use http::HttpCartApi;
pub use line::{CartLine, CartSummary, LineId};
pub use pending::LinePhase;
pub use snapshot::{CartSnapshot, LineNotice, LocalChange, SnapshotLine};
pub use state::{CartState, CartView, LineView};
pub use sync::{CartSync, SyncOptions};
