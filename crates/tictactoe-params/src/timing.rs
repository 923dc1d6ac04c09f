//! Timing constants for the refresh scheduler and the bootstrapper

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Quiet period that coalesces bursts of refresh triggers
pub const DEBOUNCE_MS: u64 = 150;

/// Poll fallback period while the sync gate is unlocked
pub const POLL_INTERVAL_MS: u64 = 2_500;

/// Settling delay after runtime initialization
pub const INIT_GRACE_MS: u64 = 100;

/// Scheduler and bootstrap timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTiming {
    /// Debounce window in milliseconds
    pub debounce_ms: u64,
    /// Poll period in milliseconds
    pub poll_interval_ms: u64,
    /// Grace period after runtime initialization in milliseconds
    pub init_grace_ms: u64,
}

impl SyncTiming {
    /// Default timing
    pub const fn standard() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
            poll_interval_ms: POLL_INTERVAL_MS,
            init_grace_ms: INIT_GRACE_MS,
        }
    }

    /// Debounce window
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Poll period
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Post-initialization grace period
    pub const fn init_grace(&self) -> Duration {
        Duration::from_millis(self.init_grace_ms)
    }
}

impl Default for SyncTiming {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_timing() {
        let timing = SyncTiming::default();
        assert_eq!(timing.debounce(), Duration::from_millis(150));
        assert_eq!(timing.poll_interval(), Duration::from_millis(2_500));
        assert_eq!(timing.init_grace(), Duration::from_millis(100));
    }

    #[test]
    fn test_timing_deserializes() {
        let timing: SyncTiming = serde_json::from_str(
            r#"{"debounce_ms": 10, "poll_interval_ms": 1000, "init_grace_ms": 0}"#,
        )
        .unwrap();
        assert_eq!(timing.debounce_ms, 10);
        assert_eq!(timing.init_grace(), Duration::ZERO);
    }
}
