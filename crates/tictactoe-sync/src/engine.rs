//! Sync engine: owns the current session and everything attached to it
//!
//! A session is created by [`SyncEngine::initialize`], started with
//! [`SyncEngine::start`] and torn down by [`SyncEngine::shutdown`] or a
//! [`SyncEngine::restart`]. Tearing down stops the listener and poll tasks,
//! drops any pending debounced refresh and waits out a publish in progress;
//! results still in flight after that are discarded.

use crate::backend::{ChainHandle, LedgerBackend};
use crate::bootstrap::{Bootstrapper, SessionIdentity};
use crate::client::GameClient;
use crate::config::ClientConfig;
use crate::gate::SyncGate;
use crate::ledger::HeightLedger;
use crate::lifecycle::ShutdownSignal;
use crate::listener::{EventOutcome, NotificationListener};
use crate::mutation::MutationGateway;
use crate::scheduler::RefreshScheduler;
use crate::status::{InitStage, SyncStatus};
use crate::view::ClientView;
use crate::{Error, Result};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tictactoe_core::{default_player_name, MatchOutcome, MoveAvailability};
use tictactoe_storage_sqlite::{HeightStore, SettingsStore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct Session {
    identity: SessionIdentity,
    chain: Arc<dyn ChainHandle>,
    ledger: Arc<HeightLedger>,
    gate: Arc<SyncGate>,
    scheduler: Arc<RefreshScheduler>,
    listener: Arc<NotificationListener>,
    mutations: MutationGateway,
    shutdown: ShutdownSignal,
    listener_task: Mutex<Option<JoinHandle<()>>>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    fn teardown(&self) {
        if self.shutdown.is_triggered() {
            return;
        }
        self.shutdown.trigger();
        self.scheduler.cancel_pending();
        if let Some(task) = self.listener_task.lock().take() {
            task.abort();
        }
        if let Some(task) = self.poll_task.lock().take() {
            task.abort();
        }
        self.scheduler.barrier();
        info!(event = "session_stopped", chain_id = %self.identity.chain_id, "Session torn down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Clears the init flag when bootstrap finishes
struct InitGuard<'a>(&'a AtomicBool);

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Client sync engine
pub struct SyncEngine {
    config: ClientConfig,
    backend: Arc<dyn LedgerBackend>,
    settings: Arc<dyn SettingsStore>,
    heights: Arc<dyn HeightStore>,
    view: Arc<ClientView>,
    status: SyncStatus,
    initializing: AtomicBool,
    session: RwLock<Option<Arc<Session>>>,
}

impl SyncEngine {
    /// Create new engine
    pub fn new(
        config: ClientConfig,
        backend: Arc<dyn LedgerBackend>,
        settings: Arc<dyn SettingsStore>,
        heights: Arc<dyn HeightStore>,
    ) -> Self {
        Self {
            config,
            backend,
            settings,
            heights,
            view: Arc::new(ClientView::new()),
            status: SyncStatus::new(),
            initializing: AtomicBool::new(false),
            session: RwLock::new(None),
        }
    }

    /// Engine whose heights and settings share one store
    pub fn with_store<S>(config: ClientConfig, backend: Arc<dyn LedgerBackend>, store: Arc<S>) -> Self
    where
        S: HeightStore + SettingsStore + 'static,
    {
        let settings: Arc<dyn SettingsStore> = store.clone();
        let heights: Arc<dyn HeightStore> = store;
        Self::new(config, backend, settings, heights)
    }

    /// Observable client view
    pub fn view(&self) -> &Arc<ClientView> {
        &self.view
    }

    /// Stage and refresh counters
    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    /// Configuration in use
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Identity of the current session
    pub fn identity(&self) -> Option<SessionIdentity> {
        self.current().map(|s| s.identity.clone())
    }

    /// Whether a session is established
    pub fn is_ready(&self) -> bool {
        self.current().is_some()
    }

    /// Whether fetched state may be published; `false` without a session
    pub fn is_unlocked(&self) -> bool {
        self.current().is_some_and(|s| s.gate.is_unlocked())
    }

    /// Current sync cursor
    pub fn sync_cursor(&self) -> Option<u64> {
        self.current().map(|s| s.ledger.cursor())
    }

    /// Height that must be re-observed before unlocking
    pub fn sync_threshold(&self) -> Option<u64> {
        self.current().map(|s| s.gate.threshold())
    }

    fn current(&self) -> Option<Arc<Session>> {
        self.session.read().clone()
    }

    fn require_session(&self) -> Result<Arc<Session>> {
        self.current().ok_or(Error::NotInitialized)
    }

    /// Bootstrap a new session, replacing any previous one.
    ///
    /// Returns `Ok(None)` without doing anything while another bootstrap is
    /// running.
    pub async fn initialize(&self) -> Result<Option<SessionIdentity>> {
        if self.initializing.swap(true, Ordering::AcqRel) {
            debug!("Bootstrap already running");
            return Ok(None);
        }
        let _guard = InitGuard(&self.initializing);

        self.teardown_current();
        self.status.reset_counters();

        let bootstrapper = Bootstrapper::new(
            self.config.clone(),
            Arc::clone(&self.backend),
            Arc::clone(&self.settings),
            Arc::clone(&self.heights),
            Arc::clone(&self.view),
            self.status.clone(),
        );
        let boot = bootstrapper.run().await?;

        let shutdown = ShutdownSignal::new();
        let ledger = Arc::new(boot.ledger);
        let gate = Arc::new(SyncGate::armed(ledger.persisted()));
        let client = GameClient::new(boot.application);
        let scheduler = RefreshScheduler::new(
            client.clone(),
            Arc::clone(&gate),
            Arc::clone(&self.view),
            self.status.clone(),
            self.config.timing,
            shutdown.clone(),
        );
        let listener = NotificationListener::new(
            Arc::clone(&ledger),
            Arc::clone(&gate),
            Arc::clone(&self.view),
            Arc::clone(&scheduler),
            shutdown.clone(),
        );
        let mutations = MutationGateway::new(
            client,
            Arc::clone(&scheduler),
            boot.identity.chain_id.clone(),
        );
        let identity = boot.identity;

        self.view.application_id.set(Some(identity.application_id.clone()));
        self.view.chain_id.set(Some(identity.chain_id.clone()));
        self.view.sync_height.set(ledger.persisted());
        self.view.sync_unlocked.set(gate.is_unlocked());
        self.view.ready.set(true);
        self.view.init_stage.set(InitStage::Ready);
        self.status.set_stage(InitStage::Ready);

        info!(
            event = "session_ready",
            chain_id = %identity.chain_id,
            application_id = %identity.application_id,
            threshold = gate.threshold(),
            locked = !gate.is_unlocked(),
            "Session established"
        );

        *self.session.write() = Some(Arc::new(Session {
            identity: identity.clone(),
            chain: boot.chain,
            ledger,
            gate,
            scheduler,
            listener,
            mutations,
            shutdown,
            listener_task: Mutex::new(None),
            poll_task: Mutex::new(None),
        }));
        Ok(Some(identity))
    }

    /// Subscribe to notifications, start polling and run the first refresh.
    /// A previous subscription of this session is cancelled first.
    pub async fn start(&self) -> Result<()> {
        let session = self.require_session()?;

        if let Some(previous) = session.listener_task.lock().take() {
            previous.abort();
        }
        let subscription = session.chain.subscribe().await?;
        if session.shutdown.is_triggered() {
            return Ok(());
        }
        *session.listener_task.lock() = Some(session.listener.spawn(subscription));

        {
            let mut poll = session.poll_task.lock();
            if poll.is_none() {
                *poll = Some(session.scheduler.spawn_poll());
            }
        }

        debug!(chain_id = %session.identity.chain_id, "Session started");
        if session.gate.is_unlocked() {
            session.scheduler.refresh().await;
        }
        Ok(())
    }

    /// Bootstrap and start in one call
    pub async fn run(&self) -> Result<Option<SessionIdentity>> {
        let identity = self.initialize().await?;
        if identity.is_some() {
            self.start().await?;
        }
        Ok(identity)
    }

    /// Refresh now; no-op without a session
    pub async fn refresh(&self) {
        if let Some(session) = self.current() {
            session.scheduler.refresh().await;
        }
    }

    /// Debounced refresh; no-op without a session
    pub fn schedule_refresh(&self) {
        if let Some(session) = self.current() {
            session.scheduler.schedule();
        }
    }

    /// Feed one notification to the session listener
    pub fn handle_notification(&self, event: &Value) -> Option<EventOutcome> {
        self.current().map(|s| s.listener.handle(event))
    }

    /// Tear down the current session. Nothing is published for it afterwards.
    pub fn shutdown(&self) {
        if self.teardown_current() {
            self.view.ready.set(false);
        }
    }

    /// Tear down and bootstrap again from scratch
    pub async fn restart(&self) -> Result<Option<SessionIdentity>> {
        info!(event = "session_restart", "Restarting session");
        self.shutdown();
        self.run().await
    }

    fn teardown_current(&self) -> bool {
        let previous = self.session.write().take();
        match previous {
            Some(session) => {
                session.teardown();
                true
            }
            None => false,
        }
    }

    /// Open a match hosted by this chain
    pub async fn create_match(&self, host_name: Option<&str>) -> Result<String> {
        let session = self.require_session()?;
        session.mutations.create_match(host_name).await
    }

    /// Join the match hosted on `host_chain_id`
    pub async fn join_match(&self, host_chain_id: &str, player_name: Option<&str>) -> Result<String> {
        let session = self.require_session()?;
        session
            .mutations
            .join_match(host_chain_id, player_name)
            .await
    }

    /// Mark a cell
    pub async fn make_move(&self, row: u8, col: u8) -> Result<String> {
        let session = self.require_session()?;
        session.mutations.make_move(row, col).await
    }

    /// Leave the current match
    pub async fn leave_match(&self) -> Result<String> {
        let session = self.require_session()?;
        session.mutations.leave_match().await
    }

    /// Stored player name
    pub fn player_name(&self) -> Option<String> {
        match self.settings.load_player_name() {
            Ok(name) => name,
            Err(e) => {
                warn!(event = "player_name_load_failed", error = %e, "Could not read player name");
                None
            }
        }
    }

    /// Store the player name
    pub fn set_player_name(&self, name: &str) -> Result<()> {
        self.settings.save_player_name(name.trim())?;
        Ok(())
    }

    /// Name sent with `create_match`/`join_match`: `input`, else the stored
    /// name, else one derived from the chain
    pub fn effective_player_name(&self, input: Option<&str>) -> String {
        let stored = self.player_name();
        let chosen = input
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or(stored);
        match self.current() {
            Some(session) => session.mutations.effective_name(chosen.as_deref()),
            None => chosen.unwrap_or_else(|| default_player_name(None)),
        }
    }

    /// Whether a move on `(row, col)` would be offered to this player
    pub fn move_availability(&self, row: u8, col: u8) -> MoveAvailability {
        let Some(session) = self.current() else {
            return MoveAvailability::Syncing;
        };
        if !session.gate.is_unlocked() {
            return MoveAvailability::Syncing;
        }
        match self.view.game.get() {
            Some(game) => game.move_availability(&session.identity.chain_id, row, col),
            None => MoveAvailability::MatchNotActive,
        }
    }

    /// Outcome of the published match from this player's side
    pub fn outcome(&self) -> MatchOutcome {
        let (Some(session), Some(game)) = (self.current(), self.view.game.get()) else {
            return MatchOutcome::NoMatch;
        };
        game.outcome_for(&session.identity.chain_id)
    }

    /// One-line status
    pub fn summary(&self) -> String {
        let base = self.status.summary();
        match self.current() {
            Some(session) => format!(
                "{} | height {} (threshold {}) | {}",
                base,
                session.ledger.cursor(),
                session.gate.threshold(),
                if session.gate.is_unlocked() { "unlocked" } else { "syncing" }
            ),
            None => base,
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.teardown_current();
    }
}
