//! Local cart snapshot
//!
//! Holds the displayed truth. Every read made by a view comes from here,
//! and every user intent lands here before any request leaves the client.

use crate::cart::line::{CartLine, CartSummary, LineId};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Inline notice attached to a line after a server correction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineNotice {
    /// The server lowered the allowed quantity
    StockLimited { max: u32 },
    /// The server refused the quantity without giving a limit
    Rejected { message: String },
}

/// A line as displayed, with its reconciliation bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotLine {
    #[serde(flatten)]
    pub line: CartLine,

    /// Last quantity the server confirmed; the rollback target
    pub confirmed: u32,

    /// Set after a terminal write failure, cleared by the next user change
    pub error: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<LineNotice>,
}

impl SnapshotLine {
    fn confirmed(line: CartLine) -> Self {
        Self {
            confirmed: line.quantity,
            line,
            error: false,
            notice: None,
        }
    }
}

/// Result of applying a local quantity change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalChange {
    /// The quantity changed to the contained value
    Applied(u32),
    /// The request was out of range; the line keeps the contained value
    Clamped(u32),
    /// No such line in the snapshot
    UnknownLine,
}

impl LocalChange {
    /// Effective quantity after the change, if the line exists
    pub fn quantity(self) -> Option<u32> {
        match self {
            Self::Applied(q) | Self::Clamped(q) => Some(q),
            Self::UnknownLine => None,
        }
    }
}

/// Optimistically removed line, kept until the delete is confirmed
#[derive(Debug, Clone)]
struct Tombstone {
    index: usize,
    entry: SnapshotLine,
}

/// Ordered set of cart lines keyed by line id
#[derive(Debug, Clone, Default)]
pub struct CartSnapshot {
    lines: Vec<SnapshotLine>,
    tombstones: HashMap<LineId, Tombstone>,
    server_total: Option<Decimal>,
}

impl CartSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from server lines
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut snapshot = Self::new();
        snapshot.replace_all(lines, None);
        snapshot
    }

    pub fn lines(&self) -> &[SnapshotLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, id: &LineId) -> Option<&SnapshotLine> {
        self.lines.iter().find(|l| &l.line.line_id == id)
    }

    pub fn quantity(&self, id: &LineId) -> Option<u32> {
        self.get(id).map(|l| l.line.quantity)
    }

    /// Whether a delete for this line is still unconfirmed
    pub fn is_tombstoned(&self, id: &LineId) -> bool {
        self.tombstones.contains_key(id)
    }

    fn position(&self, id: &LineId) -> Option<usize> {
        self.lines.iter().position(|l| &l.line.line_id == id)
    }

    fn get_mut(&mut self, id: &LineId) -> Option<&mut SnapshotLine> {
        self.lines.iter_mut().find(|l| &l.line.line_id == id)
    }

    /// Replace every line with a fresh server fetch.
    ///
    /// Duplicate ids keep their first occurrence, lines without stock are
    /// dropped, and out-of-range quantities are clamped. Lines whose delete
    /// is still pending stay hidden.
    pub fn replace_all(&mut self, lines: Vec<CartLine>, server_total: Option<Decimal>) {
        self.replace_all_except(lines, server_total, &HashSet::new());
    }

    /// Like [`replace_all`](Self::replace_all), but the lines in `newer`
    /// keep their local state because it is more recent than the fetch.
    ///
    /// A `newer` line missing locally was removed and stays removed. The
    /// server total is dropped when any line is kept.
    pub fn replace_all_except(
        &mut self,
        lines: Vec<CartLine>,
        server_total: Option<Decimal>,
        newer: &HashSet<LineId>,
    ) {
        let mut fresh: Vec<SnapshotLine> = Vec::with_capacity(lines.len());
        let mut kept_local = false;

        for mut line in lines {
            if self.tombstones.contains_key(&line.line_id) {
                continue;
            }
            if fresh.iter().any(|l| l.line.line_id == line.line_id) {
                debug!("Ignoring duplicate cart line {}", line.line_id);
                continue;
            }
            if newer.contains(&line.line_id) {
                kept_local = true;
                if let Some(local) = self.get(&line.line_id) {
                    fresh.push(local.clone());
                }
                continue;
            }
            if line.stock == 0 {
                debug!("Dropping cart line {} with no stock", line.line_id);
                continue;
            }
            line.quantity = line.quantity.clamp(1, line.stock);
            fresh.push(SnapshotLine::confirmed(line));
        }

        self.lines = fresh;
        self.server_total = if kept_local { None } else { server_total };
    }

    /// Apply a user-requested quantity.
    ///
    /// Out-of-range requests leave the line untouched.
    pub fn apply_local(&mut self, id: &LineId, quantity: u32) -> LocalChange {
        let Some(entry) = self.get_mut(id) else {
            return LocalChange::UnknownLine;
        };

        if !entry.line.accepts(quantity) {
            return LocalChange::Clamped(entry.line.quantity);
        }

        entry.line.quantity = quantity;
        entry.error = false;
        entry.notice = None;
        LocalChange::Applied(quantity)
    }

    /// Remove a line ahead of server confirmation.
    ///
    /// Returns the quantity it had.
    pub fn remove(&mut self, id: &LineId) -> Option<u32> {
        let index = self.position(id)?;
        let entry = self.lines.remove(index);
        let quantity = entry.line.quantity;
        self.tombstones.insert(id.clone(), Tombstone { index, entry });
        Some(quantity)
    }

    /// Put an optimistically removed line back where it was, flagged.
    pub fn restore(&mut self, id: &LineId) -> bool {
        let Some(Tombstone { index, mut entry }) = self.tombstones.remove(id) else {
            return false;
        };
        if self.position(id).is_some() {
            return false;
        }

        entry.error = true;
        let index = index.min(self.lines.len());
        self.lines.insert(index, entry);
        true
    }

    /// Drop the tombstone of a confirmed delete
    pub fn forget(&mut self, id: &LineId) {
        self.tombstones.remove(id);
    }

    /// Fold an authoritative server line into the snapshot.
    ///
    /// `None` means the server no longer has the line.
    pub fn reconcile(&mut self, id: &LineId, server: Option<&CartLine>) {
        let Some(server) = server.filter(|s| s.stock > 0) else {
            if let Some(index) = self.position(id) {
                self.lines.remove(index);
            }
            self.tombstones.remove(id);
            return;
        };

        let Some(entry) = self.get_mut(id) else {
            return;
        };

        let quantity = server.quantity.clamp(1, server.stock);
        entry.line.quantity = quantity;
        entry.line.unit_price = server.unit_price;
        entry.line.stock = server.stock;
        if server.name.is_some() {
            entry.line.name = server.name.clone();
        }
        if !server.product_id.is_empty() {
            entry.line.product_id = server.product_id.clone();
        }
        entry.confirmed = quantity;
        entry.error = false;
        // A stock notice stays while the server still reports that stock
        entry.notice = match entry.notice.take() {
            Some(LineNotice::StockLimited { max }) if max == server.stock => {
                Some(LineNotice::StockLimited { max })
            }
            _ => None,
        };
    }

    /// Roll a line back to its last confirmed quantity.
    pub fn revert(&mut self, id: &LineId) {
        if let Some(entry) = self.get_mut(id) {
            entry.line.quantity = entry.confirmed.clamp(1, entry.line.stock.max(1));
        }
    }

    /// Apply a server-reported maximum after a rejected write.
    pub fn limit(&mut self, id: &LineId, max: u32) {
        if max == 0 {
            self.reconcile(id, None);
            return;
        }

        if let Some(entry) = self.get_mut(id) {
            entry.line.stock = max;
            entry.line.quantity = entry.line.quantity.min(max);
            entry.notice = Some(LineNotice::StockLimited { max });
        }
    }

    /// Attach a notice to a line
    pub fn set_notice(&mut self, id: &LineId, notice: LineNotice) {
        if let Some(entry) = self.get_mut(id) {
            entry.notice = Some(notice);
        }
    }

    /// Flag a line as failed without changing its quantity
    pub fn mark_error(&mut self, id: &LineId) {
        if let Some(entry) = self.get_mut(id) {
            entry.error = true;
        }
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary {
            item_count: self.lines.iter().map(|l| u64::from(l.line.quantity)).sum(),
            total_price: self.lines.iter().map(|l| l.line.subtotal()).sum(),
            server_total: self.server_total,
        }
    }
}
