//! Reconciliation client
//!
//! Performs the authoritative writes for a line, retries transient
//! failures and gathers what is needed to roll a failed write back. The
//! result is handed to [`CartState::settle`](crate::cart::CartState::settle),
//! which folds it into the snapshot.

use crate::cart::api::{CartApi, CartPayload, UpdateReply};
use crate::cart::line::{CartLine, LineId};
use crate::error::{CartError, CartResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// How to undo an optimistic quantity after a terminal failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rollback {
    /// The server was reachable; this is what it holds for the line
    Refetched(Option<CartLine>),
    /// Fall back to the last confirmed local value
    Revert,
}

/// Final result of one write for a line
#[derive(Debug)]
pub enum WriteOutcome {
    Updated(UpdateReply),
    Removed,
    Failed { error: CartError, rollback: Rollback },
    /// The write failed but a newer value is already queued
    Superseded,
}

/// View of the pending entry a write belongs to
pub trait WriteGuard: Send + Sync {
    /// Whether the value being written is still the newest for the line
    fn is_current(&self) -> bool;

    /// Record one retry; returns the attempt count so far
    fn note_retry(&self) -> u32;
}

/// Issues cart writes with bounded retry on transient errors
pub struct Reconciler {
    api: Arc<dyn CartApi>,
    max_retries: u32,
}

impl Reconciler {
    pub fn new(api: Arc<dyn CartApi>, max_retries: u32) -> Self {
        Self { api, max_retries }
    }

    /// Fetch the whole cart, retrying transient failures
    pub async fn fetch(&self) -> CartResult<CartPayload> {
        let mut retries = 0;
        loop {
            match self.api.fetch_cart().await {
                Err(e) if e.is_retryable() && retries < self.max_retries => {
                    retries += 1;
                    debug!("Retrying cart fetch after: {}", e);
                }
                result => return result,
            }
        }
    }

    /// Send a quantity for a line.
    ///
    /// Transient errors are retried with the same quantity while the value
    /// is still current. When retries are exhausted the authoritative line
    /// is re-fetched for the rollback if the server answers.
    pub async fn commit(
        &self,
        id: &LineId,
        quantity: u32,
        guard: &dyn WriteGuard,
    ) -> WriteOutcome {
        let mut retries = 0;
        loop {
            let error = match self.api.update_item(id, quantity).await {
                Ok(reply) => return WriteOutcome::Updated(reply),
                Err(e) => e,
            };

            if !guard.is_current() {
                debug!("Dropping failed write for line {}: newer value queued", id);
                return WriteOutcome::Superseded;
            }

            if error.is_retryable() && retries < self.max_retries {
                retries += 1;
                let attempt = guard.note_retry();
                debug!("Retrying line {} (attempt {}) after: {}", id, attempt, error);
                continue;
            }

            warn!("Write for line {} failed: {}", id, error);
            let rollback = match self.api.fetch_cart().await {
                Ok(payload) => Rollback::Refetched(payload.line(id).cloned()),
                Err(e) => {
                    debug!("Could not re-fetch line {} for rollback: {}", id, e);
                    Rollback::Revert
                }
            };
            return WriteOutcome::Failed { error, rollback };
        }
    }

    /// Delete a line, retrying transient failures
    pub async fn remove(&self, id: &LineId, guard: &dyn WriteGuard) -> WriteOutcome {
        let mut retries = 0;
        loop {
            match self.api.remove_item(id).await {
                Ok(()) => return WriteOutcome::Removed,
                Err(e) if e.is_retryable() && retries < self.max_retries => {
                    retries += 1;
                    guard.note_retry();
                    debug!("Retrying removal of line {} after: {}", id, e);
                }
                Err(error) => {
                    warn!("Removal of line {} failed: {}", id, error);
                    return WriteOutcome::Failed {
                        error,
                        rollback: Rollback::Revert,
                    };
                }
            }
        }
    }
}
