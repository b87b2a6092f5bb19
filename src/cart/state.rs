//! Cart state: the snapshot plus its pending writes
//!
//! All transitions are synchronous. The async side only ever takes a
//! short lock, calls one of these methods and releases it.

use crate::cart::api::{CartPayload, UpdateReply};
use crate::cart::line::{CartSummary, LineId};
use crate::cart::pending::{Desired, Finish, LinePhase, OutboundWrite, PendingWrites, Schedule};
use crate::cart::reconcile::{Rollback, WriteOutcome};
use crate::cart::snapshot::{CartSnapshot, LineNotice, LocalChange, SnapshotLine};
use crate::error::CartError;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// What a settled write did to the cart
#[derive(Debug)]
pub enum SyncEvent {
    Committed { line_id: LineId, quantity: u32 },
    LineGone { line_id: LineId },
    Limited { line_id: LineId, max: u32 },
    Rejected { line_id: LineId, message: String },
    RolledBack { line_id: LineId, quantity: Option<u32>, error: CartError },
    Removed { line_id: LineId },
    RemoveFailed { line_id: LineId, error: CartError },
}

impl SyncEvent {
    /// Journal event name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Committed { .. } => "write.committed",
            Self::LineGone { .. } => "write.line_gone",
            Self::Limited { .. } => "write.limited",
            Self::Rejected { .. } => "write.rejected",
            Self::RolledBack { .. } => "write.rolled_back",
            Self::Removed { .. } => "remove.committed",
            Self::RemoveFailed { .. } => "remove.failed",
        }
    }

    /// Journal payload
    pub fn data(&self) -> serde_json::Value {
        match self {
            Self::Committed { line_id, quantity } => {
                serde_json::json!({ "line": line_id, "quantity": quantity })
            }
            Self::LineGone { line_id } | Self::Removed { line_id } => {
                serde_json::json!({ "line": line_id })
            }
            Self::Limited { line_id, max } => serde_json::json!({ "line": line_id, "max": max }),
            Self::Rejected { line_id, message } => {
                serde_json::json!({ "line": line_id, "message": message })
            }
            Self::RolledBack {
                line_id,
                quantity,
                error,
            } => serde_json::json!({
                "line": line_id,
                "quantity": quantity,
                "error": error.to_string(),
            }),
            Self::RemoveFailed { line_id, error } => {
                serde_json::json!({ "line": line_id, "error": error.to_string() })
            }
        }
    }
}

/// Result of folding a write outcome into the state
#[derive(Debug)]
pub struct Settled {
    pub finish: Finish,
    pub event: Option<SyncEvent>,
}

/// A line as handed to a view
#[derive(Debug, Clone, Serialize)]
pub struct LineView {
    #[serde(flatten)]
    pub entry: SnapshotLine,
    pub phase: LinePhase,
}

/// Everything a view needs to render the cart
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<LineView>,
    pub summary: CartSummary,
    pub has_pending_updates: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_error: Option<String>,
}

impl CartView {
    pub fn line(&self, id: &LineId) -> Option<&LineView> {
        self.lines.iter().find(|l| &l.entry.line.line_id == id)
    }

    pub fn has_errors(&self) -> bool {
        self.lines.iter().any(|l| l.entry.error)
    }
}

/// Snapshot and pending writes, mutated only through intents and settles
#[derive(Debug, Default)]
pub struct CartState {
    pub snapshot: CartSnapshot,
    pub pending: PendingWrites,
    refresh_seq: u64,
    refreshes_in_flight: usize,
    sync_error: Option<String>,
    /// Bumped by every write that settles while a refresh is running
    write_epoch: u64,
    /// Epoch at which the newest refresh started
    refresh_epoch: u64,
    /// Last epoch each line settled at, kept only while refreshes run
    settled_at: HashMap<LineId, u64>,
}

impl CartState {
    pub fn new(snapshot: CartSnapshot) -> Self {
        Self {
            snapshot,
            ..Self::default()
        }
    }

    /// Set a line's quantity locally and queue the write.
    ///
    /// The schedule is `None` when nothing needs to be sent.
    pub fn set_quantity(&mut self, id: &LineId, quantity: u32) -> (LocalChange, Option<Schedule>) {
        let unchanged = self.snapshot.quantity(id) == Some(quantity)
            && self.pending.phase(id) == LinePhase::Clean
            && self.snapshot.get(id).is_some_and(|l| l.confirmed == quantity);

        let change = self.snapshot.apply_local(id, quantity);
        match change {
            LocalChange::Applied(_) if unchanged => (change, None),
            LocalChange::Applied(q) => (change, Some(self.pending.schedule(id, q))),
            LocalChange::Clamped(_) | LocalChange::UnknownLine => (change, None),
        }
    }

    pub fn increment(&mut self, id: &LineId) -> (LocalChange, Option<Schedule>) {
        match self.snapshot.quantity(id) {
            Some(current) => self.set_quantity(id, current.saturating_add(1)),
            None => (LocalChange::UnknownLine, None),
        }
    }

    pub fn decrement(&mut self, id: &LineId) -> (LocalChange, Option<Schedule>) {
        match self.snapshot.quantity(id) {
            // A line never goes below one by decrementing; removal is explicit
            Some(current) => self.set_quantity(id, current.saturating_sub(1)),
            None => (LocalChange::UnknownLine, None),
        }
    }

    /// Remove a line locally and queue the delete
    pub fn remove_line(&mut self, id: &LineId) -> Option<Schedule> {
        self.snapshot.remove(id)?;
        Some(self.pending.schedule_removal(id))
    }

    /// Start a refresh; returns its sequence number
    pub fn begin_refresh(&mut self) -> u64 {
        self.refresh_seq += 1;
        self.refreshes_in_flight += 1;
        self.refresh_epoch = self.write_epoch;
        self.refresh_seq
    }

    fn end_refresh(&mut self, seq: u64) -> bool {
        self.refreshes_in_flight = self.refreshes_in_flight.saturating_sub(1);
        if self.refreshes_in_flight == 0 {
            self.settled_at.clear();
        }
        if seq != self.refresh_seq {
            debug!("Discarding result of superseded refresh {}", seq);
            return false;
        }
        true
    }

    /// Apply a fetched cart.
    ///
    /// Results of older refreshes are dropped. Lines whose writes settled
    /// after the fetch was issued keep their settled state, and lines with
    /// pending quantity writes keep showing the desired value.
    pub fn apply_fetch(&mut self, seq: u64, payload: CartPayload) {
        let newer: HashSet<LineId> = self
            .settled_at
            .iter()
            .filter(|(_, epoch)| **epoch > self.refresh_epoch)
            .map(|(id, _)| id.clone())
            .collect();
        if !self.end_refresh(seq) {
            return;
        }

        if !newer.is_empty() {
            debug!("Keeping {} line(s) settled during refresh {}", newer.len(), seq);
        }
        self.snapshot
            .replace_all_except(payload.items, payload.total_price, &newer);
        for (id, quantity) in self.pending.desired_quantities() {
            self.snapshot.apply_local(id, quantity);
        }
        self.sync_error = None;
    }

    /// Record a failed refresh; the snapshot is left as it was
    pub fn fail_refresh(&mut self, seq: u64, error: &CartError) {
        if self.end_refresh(seq) {
            warn!("Cart refresh failed: {}", error);
            self.sync_error = Some(error.to_string());
        }
    }

    /// Fold the outcome of a write into the snapshot and resolve it.
    ///
    /// Outcomes for values that are no longer the newest are discarded.
    pub fn settle(&mut self, write: &OutboundWrite, outcome: WriteOutcome) -> Settled {
        let id = &write.line_id;

        if !self.pending.is_latest(id, write.seq) {
            debug!("Discarding stale response for line {} (seq {})", id, write.seq);
            return Settled {
                finish: self.pending.finish(id, write.seq),
                event: None,
            };
        }

        if self.refreshes_in_flight > 0 {
            self.write_epoch += 1;
            self.settled_at.insert(id.clone(), self.write_epoch);
        }

        let event = match (write.desired, outcome) {
            (_, WriteOutcome::Superseded) => None,
            (_, WriteOutcome::Updated(UpdateReply::Confirmed(line))) => {
                self.snapshot.reconcile(id, Some(&line));
                let quantity = self.snapshot.quantity(id).unwrap_or(line.quantity);
                info!("Line {} committed at quantity {}", id, quantity);
                Some(SyncEvent::Committed {
                    line_id: id.clone(),
                    quantity,
                })
            }
            (_, WriteOutcome::Updated(UpdateReply::Gone)) => {
                info!("Line {} no longer exists on the server", id);
                self.snapshot.reconcile(id, None);
                self.pending.discard(id);
                Some(SyncEvent::LineGone { line_id: id.clone() })
            }
            (
                _,
                WriteOutcome::Updated(UpdateReply::Rejected {
                    max_quantity: Some(max),
                    ..
                }),
            ) => {
                info!("Line {} limited to {} by the server", id, max);
                self.snapshot.limit(id, max);
                match self.snapshot.get(id) {
                    None => self.pending.discard(id),
                    // Send the corrected value so the server agrees with the display
                    Some(entry) if entry.line.quantity != entry.confirmed => {
                        self.pending.schedule(id, entry.line.quantity);
                    }
                    Some(_) => {}
                }
                Some(SyncEvent::Limited {
                    line_id: id.clone(),
                    max,
                })
            }
            (
                _,
                WriteOutcome::Updated(UpdateReply::Rejected {
                    message,
                    max_quantity: None,
                }),
            ) => {
                info!("Line {} rejected: {}", id, message);
                self.snapshot.revert(id);
                self.snapshot.set_notice(
                    id,
                    LineNotice::Rejected {
                        message: message.clone(),
                    },
                );
                Some(SyncEvent::Rejected {
                    line_id: id.clone(),
                    message,
                })
            }
            (_, WriteOutcome::Removed) => {
                self.snapshot.forget(id);
                Some(SyncEvent::Removed { line_id: id.clone() })
            }
            (Desired::Remove, WriteOutcome::Failed { error, .. }) => {
                warn!("Restoring line {} after failed removal", id);
                self.snapshot.restore(id);
                // The restored quantity may never have reached the server
                if let Some(entry) = self.snapshot.get(id) {
                    if entry.line.quantity != entry.confirmed {
                        self.pending.schedule(id, entry.line.quantity);
                    }
                }
                Some(SyncEvent::RemoveFailed {
                    line_id: id.clone(),
                    error,
                })
            }
            (Desired::Quantity(_), WriteOutcome::Failed { error, rollback }) => {
                match rollback {
                    Rollback::Refetched(Some(line)) => {
                        self.snapshot.reconcile(id, Some(&line));
                        self.snapshot.mark_error(id);
                    }
                    Rollback::Refetched(None) => self.snapshot.reconcile(id, None),
                    Rollback::Revert => {
                        self.snapshot.revert(id);
                        self.snapshot.mark_error(id);
                    }
                }
                let quantity = self.snapshot.quantity(id);
                warn!("Line {} rolled back to {:?}", id, quantity);
                Some(SyncEvent::RolledBack {
                    line_id: id.clone(),
                    quantity,
                    error,
                })
            }
        };

        Settled {
            finish: self.pending.finish(id, write.seq),
            event,
        }
    }

    /// Write phase of a line, including the error state
    pub fn phase(&self, id: &LineId) -> LinePhase {
        match self.pending.phase(id) {
            LinePhase::Clean if self.snapshot.get(id).is_some_and(|l| l.error) => LinePhase::Error,
            phase => phase,
        }
    }

    pub fn has_pending_updates(&self) -> bool {
        self.pending.has_pending()
    }

    /// No writes pending and no refresh running
    pub fn is_idle(&self) -> bool {
        !self.pending.has_pending() && self.refreshes_in_flight == 0
    }

    pub fn view(&self) -> CartView {
        CartView {
            lines: self
                .snapshot
                .lines()
                .iter()
                .map(|entry| LineView {
                    phase: self.phase(&entry.line.line_id),
                    entry: entry.clone(),
                })
                .collect(),
            summary: self.snapshot.summary(),
            has_pending_updates: self.has_pending_updates(),
            sync_error: self.sync_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::line::CartLine;
    use rust_decimal::Decimal;

    fn state() -> CartState {
        CartState::new(CartSnapshot::from_lines(vec![
            CartLine::new("a", 2, Decimal::new(500, 2), 5),
            CartLine::new("b", 1, Decimal::new(900, 2), 1),
        ]))
    }

    fn id(s: &str) -> LineId {
        LineId::from(s)
    }

    #[test]
    fn clamped_increment_schedules_nothing() {
        let mut state = state();

        let (change, schedule) = state.increment(&id("b"));
        assert_eq!(change, LocalChange::Clamped(1));
        assert!(schedule.is_none());
        assert!(!state.has_pending_updates());
    }

    #[test]
    fn decrement_stops_at_one() {
        let mut state = state();

        assert_eq!(state.decrement(&id("a")).0, LocalChange::Applied(1));
        assert_eq!(state.decrement(&id("a")).0, LocalChange::Clamped(1));
    }

    #[test]
    fn setting_confirmed_value_sends_nothing() {
        let mut state = state();

        let (change, schedule) = state.set_quantity(&id("a"), 2);
        assert_eq!(change, LocalChange::Applied(2));
        assert!(schedule.is_none());
    }

    #[test]
    fn stale_outcome_is_discarded() {
        let mut state = state();
        state.set_quantity(&id("a"), 3);
        let write = state.pending.begin(&id("a")).unwrap();
        state.set_quantity(&id("a"), 5);

        let settled = state.settle(
            &write,
            WriteOutcome::Updated(UpdateReply::Confirmed(CartLine::new(
                "a",
                3,
                Decimal::new(500, 2),
                5,
            ))),
        );

        assert_eq!(settled.finish, Finish::Resend);
        assert!(settled.event.is_none());
        assert_eq!(state.snapshot.quantity(&id("a")), Some(5));
        assert_eq!(state.phase(&id("a")), LinePhase::Dirty);
    }

    #[test]
    fn failed_write_reverts_and_flags_only_that_line() {
        let mut state = state();
        state.set_quantity(&id("a"), 4);
        let write = state.pending.begin(&id("a")).unwrap();

        let settled = state.settle(
            &write,
            WriteOutcome::Failed {
                error: CartError::Timeout("updating line a".to_string()),
                rollback: Rollback::Revert,
            },
        );

        assert_eq!(settled.finish, Finish::Idle);
        assert!(matches!(settled.event, Some(SyncEvent::RolledBack { .. })));
        assert_eq!(state.snapshot.quantity(&id("a")), Some(2));
        assert_eq!(state.phase(&id("a")), LinePhase::Error);
        assert_eq!(state.phase(&id("b")), LinePhase::Clean);

        // The next user change moves the line out of the error state
        state.increment(&id("a"));
        assert_eq!(state.phase(&id("a")), LinePhase::Dirty);
    }

    #[test]
    fn limit_queues_corrected_quantity() {
        let mut state = state();
        state.set_quantity(&id("a"), 5);
        let write = state.pending.begin(&id("a")).unwrap();

        let settled = state.settle(
            &write,
            WriteOutcome::Updated(UpdateReply::Rejected {
                message: "Only 3 left".to_string(),
                max_quantity: Some(3),
            }),
        );

        assert_eq!(settled.finish, Finish::Resend);
        assert_eq!(state.snapshot.quantity(&id("a")), Some(3));
        assert_eq!(state.pending.desired_quantity(&id("a")), Some(3));
        assert_eq!(
            state.snapshot.get(&id("a")).unwrap().notice,
            Some(LineNotice::StockLimited { max: 3 })
        );
    }

    #[test]
    fn rejection_without_max_reverts_quietly() {
        let mut state = state();
        state.set_quantity(&id("a"), 4);
        let write = state.pending.begin(&id("a")).unwrap();

        state.settle(
            &write,
            WriteOutcome::Updated(UpdateReply::Rejected {
                message: "Product unavailable".to_string(),
                max_quantity: None,
            }),
        );

        let entry = state.snapshot.get(&id("a")).unwrap();
        assert_eq!(entry.line.quantity, 2);
        assert!(!entry.error);
        assert_eq!(state.phase(&id("a")), LinePhase::Clean);
    }

    #[test]
    fn gone_line_is_removed_and_discarded() {
        let mut state = state();
        state.set_quantity(&id("a"), 4);
        let write = state.pending.begin(&id("a")).unwrap();

        let settled = state.settle(&write, WriteOutcome::Updated(UpdateReply::Gone));
        assert_eq!(settled.finish, Finish::Idle);
        assert!(state.snapshot.get(&id("a")).is_none());
        assert!(!state.has_pending_updates());
    }

    #[test]
    fn refresh_keeps_pending_values() {
        let mut state = state();
        state.set_quantity(&id("a"), 4);
        let seq = state.begin_refresh();
        assert!(!state.is_idle());

        state.apply_fetch(
            seq,
            CartPayload {
                items: vec![
                    CartLine::new("a", 2, Decimal::new(500, 2), 5),
                    CartLine::new("c", 1, Decimal::new(100, 2), 3),
                ],
                total_price: Some(Decimal::new(1100, 2)),
            },
        );

        assert_eq!(state.snapshot.quantity(&id("a")), Some(4));
        assert_eq!(state.snapshot.get(&id("a")).unwrap().confirmed, 2);
        assert!(state.snapshot.get(&id("b")).is_none());
        assert_eq!(state.snapshot.len(), 2);
    }

    #[test]
    fn fetch_issued_before_a_commit_keeps_the_committed_line() {
        let mut state = state();
        state.set_quantity(&id("a"), 3);
        let seq = state.begin_refresh();

        let write = state.pending.begin(&id("a")).unwrap();
        state.settle(
            &write,
            WriteOutcome::Updated(UpdateReply::Confirmed(CartLine::new(
                "a",
                3,
                Decimal::new(500, 2),
                5,
            ))),
        );
        assert!(!state.has_pending_updates());

        // The fetch was answered before the write reached the server
        state.apply_fetch(
            seq,
            CartPayload {
                items: vec![
                    CartLine::new("a", 2, Decimal::new(500, 2), 5),
                    CartLine::new("b", 1, Decimal::new(900, 2), 4),
                ],
                total_price: Some(Decimal::new(1900, 2)),
            },
        );

        let a = state.snapshot.get(&id("a")).unwrap();
        assert_eq!(a.line.quantity, 3);
        assert_eq!(a.confirmed, 3);
        assert_eq!(state.snapshot.get(&id("b")).unwrap().line.stock, 4);
        assert_eq!(state.snapshot.summary().server_total, None);

        // Later refreshes take the server's lines as usual
        let seq = state.begin_refresh();
        state.apply_fetch(
            seq,
            CartPayload {
                items: vec![CartLine::new("a", 3, Decimal::new(500, 2), 2)],
                total_price: Some(Decimal::new(1500, 2)),
            },
        );
        assert_eq!(state.snapshot.get(&id("a")).unwrap().line.stock, 2);
        assert_eq!(state.snapshot.quantity(&id("a")), Some(2));
    }

    #[test]
    fn failed_removal_resends_unsent_quantity() {
        let mut state = state();
        state.set_quantity(&id("a"), 4);
        state.remove_line(&id("a"));

        let write = state.pending.begin(&id("a")).unwrap();
        assert_eq!(write.desired, Desired::Remove);
        let settled = state.settle(
            &write,
            WriteOutcome::Failed {
                error: CartError::Timeout("removing line".to_string()),
                rollback: Rollback::Revert,
            },
        );

        assert_eq!(settled.finish, Finish::Resend);
        let a = state.snapshot.get(&id("a")).unwrap();
        assert_eq!(a.line.quantity, 4);
        assert!(a.error);
        assert_eq!(state.pending.desired_quantity(&id("a")), Some(4));
    }

    #[test]
    fn older_refresh_result_is_ignored() {
        let mut state = state();
        let first = state.begin_refresh();
        let second = state.begin_refresh();

        state.apply_fetch(second, CartPayload::default());
        state.apply_fetch(
            first,
            CartPayload {
                items: vec![CartLine::new("z", 1, Decimal::ONE, 1)],
                total_price: None,
            },
        );

        assert!(state.snapshot.is_empty());
        assert!(state.is_idle());
    }

    #[test]
    fn failed_refresh_sets_sync_error() {
        let mut state = state();
        let seq = state.begin_refresh();

        state.fail_refresh(seq, &CartError::Timeout("fetching cart".to_string()));
        let view = state.view();
        assert!(view.sync_error.unwrap().contains("timed out"));
        assert_eq!(view.lines.len(), 2);
    }

    #[test]
    fn view_reports_pending_flag() {
        let mut state = state();
        assert!(!state.view().has_pending_updates);

        state.increment(&id("a"));
        let view = state.view();
        assert!(view.has_pending_updates);
        assert_eq!(view.line(&id("a")).unwrap().phase, LinePhase::Dirty);
        assert_eq!(view.summary.item_count, 4);
    }
}
