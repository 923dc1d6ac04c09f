//! Bootstrap stage and refresh counters

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Bootstrap stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitStage {
    /// Nothing attempted yet
    #[default]
    Idle,
    /// Bootstrap started
    InitializingWallet,
    /// Application identifier rejected
    ConfigurationError,
    /// One-time runtime initialization
    InitializingRuntime,
    /// Loading or generating the mnemonic
    PreparingMnemonic,
    /// Mnemonic could not be generated
    MnemonicFailed,
    /// Deriving the signer
    CreatingWallet,
    /// Claiming a chain from the faucet
    CreatingChain,
    /// Opening the chain and application
    ConnectingApplication,
    /// Session established
    Ready,
    /// Any later step failed
    Failed,
}

impl InitStage {
    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::InitializingWallet => "Initializing wallet...",
            Self::ConfigurationError => "Configuration error",
            Self::InitializingRuntime => "Initializing Linera...",
            Self::PreparingMnemonic => "Preparing mnemonic...",
            Self::MnemonicFailed => "Mnemonic generation failed",
            Self::CreatingWallet => "Creating wallet...",
            Self::CreatingChain => "Creating microchain...",
            Self::ConnectingApplication => "Connecting to application...",
            Self::Ready => "Ready",
            Self::Failed => "Initialization failed",
        }
    }

    /// Terminal failure stage
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationError | Self::MnemonicFailed | Self::Failed
        )
    }
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Refresh counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshCounters {
    /// Read queries issued
    pub fetches: u64,
    /// Refreshes dropped because one was already in flight
    pub skipped_in_flight: u64,
    /// Fetches whose result matched the published state
    pub unchanged: u64,
    /// Fetches that changed at least one field
    pub published: u64,
    /// Fetches that failed
    pub failures: u64,
    /// Results dropped because the session was torn down meanwhile
    pub discarded: u64,
}

/// Sync status shared by the engine and its tasks
#[derive(Debug, Clone)]
pub struct SyncStatus {
    inner: Arc<RwLock<StatusInner>>,
}

#[derive(Debug)]
struct StatusInner {
    stage: InitStage,
    counters: RefreshCounters,
    started_at: Option<Instant>,
    last_fetch: Option<Instant>,
    last_fetch_ms: u64,
    total_fetch_ms: u64,
}

impl SyncStatus {
    /// Create new status tracker
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StatusInner {
                stage: InitStage::Idle,
                counters: RefreshCounters::default(),
                started_at: None,
                last_fetch: None,
                last_fetch_ms: 0,
                total_fetch_ms: 0,
            })),
        }
    }

    /// Set stage
    pub fn set_stage(&self, stage: InitStage) {
        let mut inner = self.inner.write();
        if stage == InitStage::Ready {
            inner.started_at = Some(Instant::now());
        }
        inner.stage = stage;
    }

    /// Get current stage
    pub fn stage(&self) -> InitStage {
        self.inner.read().stage
    }

    /// Reset counters for a new session
    pub fn reset_counters(&self) {
        let mut inner = self.inner.write();
        inner.counters = RefreshCounters::default();
        inner.last_fetch = None;
        inner.last_fetch_ms = 0;
        inner.total_fetch_ms = 0;
    }

    pub(crate) fn record_fetch(&self, elapsed: Duration) {
        let mut inner = self.inner.write();
        let ms = elapsed.as_millis() as u64;
        inner.counters.fetches += 1;
        inner.last_fetch = Some(Instant::now());
        inner.last_fetch_ms = ms;
        inner.total_fetch_ms += ms;
    }

    pub(crate) fn record_skipped(&self) {
        self.inner.write().counters.skipped_in_flight += 1;
    }

    pub(crate) fn record_unchanged(&self) {
        self.inner.write().counters.unchanged += 1;
    }

    pub(crate) fn record_published(&self) {
        self.inner.write().counters.published += 1;
    }

    pub(crate) fn record_failure(&self) {
        self.inner.write().counters.failures += 1;
    }

    pub(crate) fn record_discarded(&self) {
        self.inner.write().counters.discarded += 1;
    }

    /// Get counters snapshot
    pub fn counters(&self) -> RefreshCounters {
        self.inner.read().counters
    }

    /// Time since the last completed fetch
    pub fn since_last_fetch(&self) -> Option<Duration> {
        self.inner.read().last_fetch.map(|t| t.elapsed())
    }

    /// Get average fetch time in ms
    pub fn avg_fetch_ms(&self) -> u64 {
        let inner = self.inner.read();
        if inner.counters.fetches == 0 {
            return 0;
        }
        inner.total_fetch_ms / inner.counters.fetches
    }

    /// Get summary string
    pub fn summary(&self) -> String {
        let inner = self.inner.read();
        let c = inner.counters;

        let uptime = match inner.started_at {
            Some(start) => format!("up {}s", start.elapsed().as_secs()),
            None => "not started".to_string(),
        };

        let stage = if inner.stage == InitStage::Idle {
            "Idle"
        } else {
            inner.stage.name()
        };

        format!(
            "{} | {} | fetches {} ({} changed, {} unchanged, {} skipped, {} failed) | last {}ms",
            stage,
            uptime,
            c.fetches,
            c.published,
            c.unchanged,
            c.skipped_in_flight,
            c.failures,
            inner.last_fetch_ms
        )
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(InitStage::InitializingWallet.name(), "Initializing wallet...");
        assert_eq!(InitStage::ConfigurationError.name(), "Configuration error");
        assert_eq!(InitStage::InitializingRuntime.name(), "Initializing Linera...");
        assert_eq!(InitStage::PreparingMnemonic.name(), "Preparing mnemonic...");
        assert_eq!(InitStage::MnemonicFailed.name(), "Mnemonic generation failed");
        assert_eq!(InitStage::CreatingWallet.name(), "Creating wallet...");
        assert_eq!(InitStage::CreatingChain.name(), "Creating microchain...");
        assert_eq!(InitStage::ConnectingApplication.name(), "Connecting to application...");
        assert_eq!(InitStage::Ready.name(), "Ready");
        assert_eq!(InitStage::Failed.name(), "Initialization failed");
    }

    #[test]
    fn test_failure_stages() {
        assert!(InitStage::ConfigurationError.is_failure());
        assert!(InitStage::Failed.is_failure());
        assert!(!InitStage::Ready.is_failure());
    }

    #[test]
    fn test_counters() {
        let status = SyncStatus::new();
        status.record_fetch(Duration::from_millis(10));
        status.record_fetch(Duration::from_millis(30));
        status.record_unchanged();
        status.record_skipped();

        let c = status.counters();
        assert_eq!(c.fetches, 2);
        assert_eq!(c.unchanged, 1);
        assert_eq!(c.skipped_in_flight, 1);
        assert_eq!(status.avg_fetch_ms(), 20);

        status.reset_counters();
        assert_eq!(status.counters(), RefreshCounters::default());
    }

    #[test]
    fn test_summary_string() {
        let status = SyncStatus::new();
        status.set_stage(InitStage::Ready);
        status.record_fetch(Duration::from_millis(5));
        status.record_published();

        let summary = status.summary();
        assert!(summary.starts_with("Ready"));
        assert!(summary.contains("fetches 1"));
        assert!(summary.contains("1 changed"));
    }
}
