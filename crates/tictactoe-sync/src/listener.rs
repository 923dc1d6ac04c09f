//! Notification listener
//!
//! Folds every notification's height into the ledger, opens the gate once the
//! persisted height is seen again, and asks for a refresh when a new block
//! lands. Events are handled one at a time by a single task, so an unlock and
//! the refresh it triggers are never interleaved with another event. The
//! task writes each new cursor from the blocking pool before taking the next
//! event.

use crate::backend::Subscription;
use crate::gate::{GateTransition, SyncGate};
use crate::height::{extract_height, is_new_block};
use crate::ledger::HeightLedger;
use crate::lifecycle::ShutdownSignal;
use crate::scheduler::RefreshScheduler;
use crate::view::ClientView;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What handling one event did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventOutcome {
    /// Height carried by the event
    pub height: Option<u64>,
    /// Cursor after the event
    pub cursor: Option<u64>,
    /// Event opened the gate
    pub unlocked: bool,
    /// A debounced refresh was requested
    pub refresh_requested: bool,
}

/// Per-session notification handler
pub struct NotificationListener {
    ledger: Arc<HeightLedger>,
    gate: Arc<SyncGate>,
    view: Arc<ClientView>,
    scheduler: Arc<RefreshScheduler>,
    shutdown: ShutdownSignal,
}

impl NotificationListener {
    /// Create new listener
    pub fn new(
        ledger: Arc<HeightLedger>,
        gate: Arc<SyncGate>,
        view: Arc<ClientView>,
        scheduler: Arc<RefreshScheduler>,
        shutdown: ShutdownSignal,
    ) -> Arc<Self> {
        Arc::new(Self {
            ledger,
            gate,
            view,
            scheduler,
            shutdown,
        })
    }

    /// Handle one event, persisting its height inline. Events without a
    /// height or with an unknown shape are ignored.
    pub fn handle(&self, event: &Value) -> EventOutcome {
        let outcome = self.apply(event);
        if outcome.height.is_some() {
            self.ledger.persist();
        }
        outcome
    }

    /// Everything `handle` does except the storage write
    fn apply(&self, event: &Value) -> EventOutcome {
        let mut outcome = EventOutcome::default();
        if self.shutdown.is_triggered() {
            return outcome;
        }

        if let Some(height) = extract_height(event) {
            let cursor = self.ledger.advance(height);
            self.view.sync_height.set(Some(cursor));
            outcome.height = Some(height);
            outcome.cursor = Some(cursor);

            if self.gate.observe(height) == GateTransition::Unlocked {
                self.view.sync_unlocked.set(true);
                outcome.unlocked = true;
                info!(
                    event = "sync_gate_unlocked",
                    chain_id = %self.ledger.chain_id(),
                    height = height,
                    threshold = self.gate.threshold(),
                    "Sync height re-observed, state unlocked"
                );
            }
        }

        if outcome.unlocked || (is_new_block(event) && self.gate.is_unlocked()) {
            self.scheduler.schedule();
            outcome.refresh_requested = true;
        }

        debug!(
            height = ?outcome.height,
            cursor = ?outcome.cursor,
            refresh = outcome.refresh_requested,
            "Handled notification"
        );
        outcome
    }

    /// Consume `subscription` until the stream ends or the session shuts down.
    /// The subscription is dropped (and so cancelled) when the task ends.
    pub fn spawn(self: &Arc<Self>, mut subscription: Subscription) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = this.shutdown.wait() => break,
                    event = subscription.next() => match event {
                        Some(event) => {
                            if this.apply(&event).height.is_some() {
                                this.persist_cursor().await;
                            }
                        }
                        None => {
                            warn!(
                                event = "notification_stream_ended",
                                chain_id = %this.ledger.chain_id(),
                                "Notification stream ended"
                            );
                            break;
                        }
                    }
                }
            }
        })
    }

    async fn persist_cursor(&self) {
        let ledger = Arc::clone(&self.ledger);
        if let Err(e) = tokio::task::spawn_blocking(move || ledger.persist()).await {
            warn!(
                event = "sync_height_persist_failed",
                chain_id = %self.ledger.chain_id(),
                error = %e,
                "Sync height write task did not complete"
            );
        }
    }
}
