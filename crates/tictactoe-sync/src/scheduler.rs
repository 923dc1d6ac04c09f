//! Refresh scheduling
//!
//! Three triggers lead to a fetch: an explicit [`RefreshScheduler::refresh`]
//! (after a mutation or at start), the debounced [`RefreshScheduler::schedule`]
//! used by the notification listener, and the poll loop. All of them funnel
//! into the same single-flight refresh.

use crate::client::GameClient;
use crate::gate::SyncGate;
use crate::lifecycle::ShutdownSignal;
use crate::status::SyncStatus;
use crate::view::ClientView;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tictactoe_params::SyncTiming;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Clears the in-flight flag when the refresh finishes, however it finishes
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Debounced, single-flight refresh for one session
pub struct RefreshScheduler {
    client: GameClient,
    gate: Arc<SyncGate>,
    view: Arc<ClientView>,
    status: SyncStatus,
    timing: SyncTiming,
    shutdown: ShutdownSignal,
    in_flight: AtomicBool,
    debounce: Mutex<Option<JoinHandle<()>>>,
    publish: Mutex<()>,
}

impl RefreshScheduler {
    /// Create new scheduler
    pub fn new(
        client: GameClient,
        gate: Arc<SyncGate>,
        view: Arc<ClientView>,
        status: SyncStatus,
        timing: SyncTiming,
        shutdown: ShutdownSignal,
    ) -> Arc<Self> {
        Arc::new(Self {
            client,
            gate,
            view,
            status,
            timing,
            shutdown,
            in_flight: AtomicBool::new(false),
            debounce: Mutex::new(None),
            publish: Mutex::new(()),
        })
    }

    /// Fetch and merge the match view. Never fails: errors end up in the
    /// view's `last_notification`.
    ///
    /// While the gate is locked this only clears the match fields. A call made
    /// while another refresh is in flight returns immediately.
    pub async fn refresh(&self) {
        if self.shutdown.is_triggered() {
            return;
        }

        if !self.gate.is_unlocked() {
            let _publish = self.publish.lock();
            if !self.shutdown.is_triggered() {
                self.view.clear_match();
            }
            return;
        }

        let Some(_flight) = InFlight::acquire(&self.in_flight) else {
            self.status.record_skipped();
            debug!("Refresh already in flight, skipping");
            return;
        };

        let started = Instant::now();
        let result = self.client.fetch_game().await;
        self.status.record_fetch(started.elapsed());

        let _publish = self.publish.lock();
        if self.shutdown.is_triggered() {
            self.status.record_discarded();
            debug!("Session torn down during fetch, dropping result");
            return;
        }

        let merged = result.and_then(|response| self.view.merge(response));
        match merged {
            Ok(report) if report.is_unchanged() => self.status.record_unchanged(),
            Ok(report) => {
                self.status.record_published();
                debug!(changed = ?report.changed, "Published refreshed match view");
            }
            Err(e) => {
                self.status.record_failure();
                warn!(event = "refresh_failed", error = %e, "Refresh failed");
                self.view.notify(e.detail());
            }
        }
    }

    /// Request a refresh after the debounce period. Calls made while one is
    /// already pending are absorbed by it.
    pub fn schedule(self: &Arc<Self>) {
        if self.shutdown.is_triggered() {
            return;
        }
        let mut slot = self.debounce.lock();
        if slot.as_ref().is_some_and(|pending| !pending.is_finished()) {
            return;
        }
        let this = Arc::clone(self);
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(this.timing.debounce()).await;
            this.debounce.lock().take();
            this.refresh().await;
        }));
    }

    /// Drop a pending debounced refresh
    pub fn cancel_pending(&self) {
        if let Some(pending) = self.debounce.lock().take() {
            pending.abort();
        }
    }

    /// Poll loop: refresh every poll interval while the gate is unlocked,
    /// until the session shuts down
    pub fn spawn_poll(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let period = this.timing.poll_interval();
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = this.shutdown.wait() => break,
                    _ = ticker.tick() => {
                        if this.gate.is_unlocked() {
                            this.refresh().await;
                        }
                    }
                }
            }
            debug!("Poll loop stopped");
        })
    }

    /// Wait for a publish that is already under way to finish
    pub(crate) fn barrier(&self) {
        drop(self.publish.lock());
    }
}
