//! Pending-write tracking
//!
//! Turns bursts of local changes into as few requests as possible.
//! Each line has at most one pending entry; newer values overwrite older
//! ones, and at most one request per line is ever in flight.

use crate::cart::line::LineId;
use serde::Serialize;
use std::collections::HashMap;

/// What the client wants the server to hold for a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Desired {
    Quantity(u32),
    Remove,
}

/// Write state of a single line as a view sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinePhase {
    /// Nothing outstanding
    Clean,
    /// A local change waits to be sent
    Dirty,
    /// A request carrying the latest value is on the wire
    InFlight,
    /// The last write failed and was rolled back
    Error,
}

/// Outcome of scheduling a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// The line had no pending work; a driver must be started
    Armed,
    /// An existing driver will pick the value up
    Coalesced,
}

/// Outcome of finishing a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    /// The line is clean again
    Idle,
    /// A newer value arrived while the request was in flight
    Resend,
}

/// One outstanding unit of work for a line
#[derive(Debug, Clone)]
pub struct PendingUpdate {
    pub line_id: LineId,
    pub desired: Desired,
    /// Retries spent on the in-flight request
    pub attempt: u32,
    seq: u64,
    in_flight: Option<u64>,
}

/// A value taken off the tracker to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundWrite {
    pub line_id: LineId,
    pub desired: Desired,
    pub seq: u64,
}

/// Per-line coalescing of outbound writes
#[derive(Debug, Default)]
pub struct PendingWrites {
    entries: HashMap<LineId, PendingUpdate>,
    next_seq: u64,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest desired quantity for a line
    pub fn schedule(&mut self, id: &LineId, quantity: u32) -> Schedule {
        self.upsert(id, Desired::Quantity(quantity))
    }

    /// Record that the line should be deleted
    pub fn schedule_removal(&mut self, id: &LineId) -> Schedule {
        self.upsert(id, Desired::Remove)
    }

    fn upsert(&mut self, id: &LineId, desired: Desired) -> Schedule {
        self.next_seq += 1;
        let seq = self.next_seq;

        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.desired = desired;
                entry.seq = seq;
                Schedule::Coalesced
            }
            None => {
                self.entries.insert(
                    id.clone(),
                    PendingUpdate {
                        line_id: id.clone(),
                        desired,
                        attempt: 0,
                        seq,
                        in_flight: None,
                    },
                );
                Schedule::Armed
            }
        }
    }

    /// Take the latest desired value and mark it in flight.
    ///
    /// Returns `None` when there is nothing to send or a request for the
    /// line is already on the wire.
    pub fn begin(&mut self, id: &LineId) -> Option<OutboundWrite> {
        let entry = self.entries.get_mut(id)?;
        if entry.in_flight.is_some() {
            return None;
        }

        entry.in_flight = Some(entry.seq);
        entry.attempt = 0;
        Some(OutboundWrite {
            line_id: id.clone(),
            desired: entry.desired,
            seq: entry.seq,
        })
    }

    /// Count a retry of the in-flight request; returns the attempt number
    pub fn record_attempt(&mut self, id: &LineId) -> u32 {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.attempt += 1;
                entry.attempt
            }
            None => 0,
        }
    }

    /// Whether `seq` is still the newest value requested for the line
    pub fn is_latest(&self, id: &LineId, seq: u64) -> bool {
        self.entries.get(id).is_some_and(|e| e.seq == seq)
    }

    /// Resolve the in-flight request carrying `seq`
    pub fn finish(&mut self, id: &LineId, seq: u64) -> Finish {
        let Some(entry) = self.entries.get_mut(id) else {
            return Finish::Idle;
        };

        if entry.seq == seq {
            self.entries.remove(id);
            return Finish::Idle;
        }

        entry.in_flight = None;
        Finish::Resend
    }

    /// Drop all pending work for a line the server no longer has
    pub fn discard(&mut self, id: &LineId) {
        self.entries.remove(id);
    }

    /// Latest desired quantity, if one is pending
    pub fn desired_quantity(&self, id: &LineId) -> Option<u32> {
        match self.entries.get(id)?.desired {
            Desired::Quantity(q) => Some(q),
            Desired::Remove => None,
        }
    }

    pub fn phase(&self, id: &LineId) -> LinePhase {
        match self.entries.get(id) {
            None => LinePhase::Clean,
            Some(entry) if entry.in_flight == Some(entry.seq) => LinePhase::InFlight,
            Some(_) => LinePhase::Dirty,
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }

    /// Pending quantity values, for re-applying over a fresh fetch
    pub fn desired_quantities(&self) -> impl Iterator<Item = (&LineId, u32)> {
        self.entries.iter().filter_map(|(id, e)| match e.desired {
            Desired::Quantity(q) => Some((id, q)),
            Desired::Remove => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> LineId {
        LineId::from(s)
    }

    #[test]
    fn first_schedule_arms_then_coalesces() {
        let mut pending = PendingWrites::new();

        assert_eq!(pending.schedule(&id("a"), 3), Schedule::Armed);
        assert_eq!(pending.schedule(&id("a"), 4), Schedule::Coalesced);
        assert_eq!(pending.schedule(&id("a"), 5), Schedule::Coalesced);
        assert_eq!(pending.schedule(&id("b"), 1), Schedule::Armed);

        let write = pending.begin(&id("a")).unwrap();
        assert_eq!(write.desired, Desired::Quantity(5));
        assert_eq!(pending.pending_count(), 2);
    }

    #[test]
    fn single_flight_per_line() {
        let mut pending = PendingWrites::new();
        pending.schedule(&id("a"), 3);

        assert!(pending.begin(&id("a")).is_some());
        pending.schedule(&id("a"), 4);
        assert!(pending.begin(&id("a")).is_none());
    }

    #[test]
    fn finish_without_newer_value_goes_idle() {
        let mut pending = PendingWrites::new();
        pending.schedule(&id("a"), 3);
        let write = pending.begin(&id("a")).unwrap();

        assert_eq!(pending.phase(&id("a")), LinePhase::InFlight);
        assert_eq!(pending.finish(&id("a"), write.seq), Finish::Idle);
        assert_eq!(pending.phase(&id("a")), LinePhase::Clean);
        assert!(!pending.has_pending());
    }

    #[test]
    fn newer_value_during_flight_resends_latest() {
        let mut pending = PendingWrites::new();
        pending.schedule(&id("a"), 3);
        let first = pending.begin(&id("a")).unwrap();

        pending.schedule(&id("a"), 4);
        pending.schedule(&id("a"), 5);
        assert_eq!(pending.phase(&id("a")), LinePhase::Dirty);
        assert!(!pending.is_latest(&id("a"), first.seq));

        assert_eq!(pending.finish(&id("a"), first.seq), Finish::Resend);
        let second = pending.begin(&id("a")).unwrap();
        assert_eq!(second.desired, Desired::Quantity(5));
        assert!(pending.is_latest(&id("a"), second.seq));
    }

    #[test]
    fn removal_replaces_queued_quantity() {
        let mut pending = PendingWrites::new();
        pending.schedule(&id("a"), 3);
        let first = pending.begin(&id("a")).unwrap();
        pending.schedule_removal(&id("a"));

        assert_eq!(pending.desired_quantity(&id("a")), None);
        assert_eq!(pending.finish(&id("a"), first.seq), Finish::Resend);
        assert_eq!(pending.begin(&id("a")).unwrap().desired, Desired::Remove);
    }

    #[test]
    fn attempts_reset_per_request() {
        let mut pending = PendingWrites::new();
        pending.schedule(&id("a"), 3);
        pending.begin(&id("a"));

        assert_eq!(pending.record_attempt(&id("a")), 1);
        pending.schedule(&id("a"), 4);
        let first_seq = pending.entries[&id("a")].in_flight.unwrap();
        pending.finish(&id("a"), first_seq);
        pending.begin(&id("a"));
        assert_eq!(pending.entries[&id("a")].attempt, 0);
    }

    #[test]
    fn desired_quantities_skip_removals() {
        let mut pending = PendingWrites::new();
        pending.schedule(&id("a"), 3);
        pending.schedule_removal(&id("b"));

        let values: Vec<(LineId, u32)> = pending
            .desired_quantities()
            .map(|(id, q)| (id.clone(), q))
            .collect();
        assert_eq!(values, vec![(id("a"), 3)]);
    }
}
