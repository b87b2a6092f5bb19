//! Optimistic cart synchronization
//!
//! [`CartSync`] is the handle a view talks to. Intents update the snapshot
//! under a short lock and return immediately; the network work runs on one
//! driver task per dirty line, which is what keeps a single request per
//! line on the wire.

use crate::cart::api::CartApi;
use crate::cart::line::LineId;
use crate::cart::pending::{Desired, Finish, Schedule};
use crate::cart::reconcile::{Reconciler, WriteGuard};
use crate::cart::snapshot::LocalChange;
use crate::cart::state::{CartState, CartView};
use crate::config::schema::SyncConfig;
use crate::error::CartResult;
use crate::journal::Journal;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Tuning for a [`CartSync`]
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub debounce: Duration,
    pub max_retries: u32,
    pub journal: Option<Journal>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            max_retries: config.max_retries,
            journal: None,
        }
    }
}

struct Shared {
    state: Mutex<CartState>,
    reconciler: Reconciler,
    debounce: Duration,
    revision: watch::Sender<u64>,
    journal: Option<Journal>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, CartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    async fn record(&self, event: &str, data: serde_json::Value) {
        if let Some(journal) = &self.journal {
            journal.record(event, &data).await;
        }
    }

    async fn fetch_into(&self, seq: u64) -> CartResult<()> {
        match self.reconciler.fetch().await {
            Ok(payload) => {
                let count = payload.items.len();
                self.lock().apply_fetch(seq, payload);
                self.notify();
                debug!("Refresh {} loaded {} lines", seq, count);
                self.record("refresh.completed", serde_json::json!({ "lines": count }))
                    .await;
                Ok(())
            }
            Err(e) => {
                self.lock().fail_refresh(seq, &e);
                self.notify();
                self.record("refresh.failed", serde_json::json!({ "error": e.to_string() }))
                    .await;
                Err(e)
            }
        }
    }
}

/// Guard handed to the reconciler for one in-flight write
struct LineGuard<'a> {
    shared: &'a Shared,
    id: &'a LineId,
    seq: u64,
}

impl WriteGuard for LineGuard<'_> {
    fn is_current(&self) -> bool {
        self.shared.lock().pending.is_latest(self.id, self.seq)
    }

    fn note_retry(&self) -> u32 {
        self.shared.lock().pending.record_attempt(self.id)
    }
}

/// Write loop for one line: wait out the debounce window, then send the
/// newest value until nothing newer arrives.
async fn drive_line(shared: Arc<Shared>, id: LineId) {
    tokio::time::sleep(shared.debounce).await;

    loop {
        let next = shared.lock().pending.begin(&id);
        let Some(write) = next else {
            break;
        };
        shared.notify();

        let guard = LineGuard {
            shared: &shared,
            id: &id,
            seq: write.seq,
        };
        let outcome = match write.desired {
            Desired::Quantity(quantity) => shared.reconciler.commit(&id, quantity, &guard).await,
            Desired::Remove => shared.reconciler.remove(&id, &guard).await,
        };

        let settled = shared.lock().settle(&write, outcome);
        if let Some(event) = settled.event {
            shared.record(event.name(), event.data()).await;
        }
        shared.notify();

        if settled.finish == Finish::Idle {
            break;
        }
        debug!("Line {} changed while in flight, sending newest value", id);
    }
}

/// Handle to an optimistically synchronized cart.
///
/// Cloning is cheap; clones share the same cart. Intents spawn Tokio tasks
/// and must be called from within a runtime.
#[derive(Clone)]
pub struct CartSync {
    shared: Arc<Shared>,
}

impl CartSync {
    pub fn new(api: Arc<dyn CartApi>, options: SyncOptions) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(CartState::default()),
                reconciler: Reconciler::new(api, options.max_retries),
                debounce: options.debounce,
                revision,
                journal: options.journal,
            }),
        }
    }

    /// Fetch the cart and replace the snapshot
    pub async fn load(&self) -> CartResult<()> {
        let seq = self.shared.lock().begin_refresh();
        self.shared.notify();
        self.shared.fetch_into(seq).await
    }

    /// Re-fetch the cart in the background
    pub fn refresh(&self) {
        let seq = self.shared.lock().begin_refresh();
        self.shared.notify();

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            // Failures land in the view's sync error
            let _ = shared.fetch_into(seq).await;
        });
    }

    pub fn increment(&self, id: &LineId) -> LocalChange {
        let (change, schedule) = self.shared.lock().increment(id);
        self.after_intent(id, change, schedule)
    }

    pub fn decrement(&self, id: &LineId) -> LocalChange {
        let (change, schedule) = self.shared.lock().decrement(id);
        self.after_intent(id, change, schedule)
    }

    /// Direct quantity input; out-of-range values leave the line unchanged
    pub fn set_quantity(&self, id: &LineId, quantity: u32) -> LocalChange {
        let (change, schedule) = self.shared.lock().set_quantity(id, quantity);
        self.after_intent(id, change, schedule)
    }

    /// Remove a line now and delete it on the server in the background.
    ///
    /// Returns `false` if the line is not in the cart.
    pub fn remove_line(&self, id: &LineId) -> bool {
        let schedule = self.shared.lock().remove_line(id);
        match schedule {
            Some(schedule) => {
                info!("Removing line {}", id);
                self.shared.notify();
                self.arm(id, schedule);
                true
            }
            None => false,
        }
    }

    fn after_intent(
        &self,
        id: &LineId,
        change: LocalChange,
        schedule: Option<Schedule>,
    ) -> LocalChange {
        match change {
            LocalChange::Applied(quantity) => {
                debug!("Line {} set to {} locally", id, quantity);
                self.shared.notify();
            }
            LocalChange::Clamped(quantity) => debug!("Line {} kept at {}", id, quantity),
            LocalChange::UnknownLine => debug!("Ignoring intent for unknown line {}", id),
        }
        if let Some(schedule) = schedule {
            self.arm(id, schedule);
        }
        change
    }

    fn arm(&self, id: &LineId, schedule: Schedule) {
        if schedule == Schedule::Armed {
            tokio::spawn(drive_line(Arc::clone(&self.shared), id.clone()));
        }
    }

    /// Current snapshot with per-line phases
    pub fn view(&self) -> CartView {
        self.shared.lock().view()
    }

    /// Receiver that changes whenever the cart does
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    pub fn has_pending_updates(&self) -> bool {
        self.shared.lock().has_pending_updates()
    }

    pub fn pending_count(&self) -> usize {
        self.shared.lock().pending.pending_count()
    }

    /// Wait until no write is pending and no refresh is running
    pub async fn settled(&self) {
        let mut changes = self.subscribe();
        loop {
            if self.shared.lock().is_idle() {
                return;
            }
            if changes.changed().await.is_err() {
                return;
            }
        }
    }
}
