//! Sync gate
//!
//! Keeps fetched state hidden until the chain has been seen at least as far
//! as it was when the previous process stopped. The threshold is fixed when
//! the gate is armed; later observations never raise it.

use parking_lot::Mutex;

/// Result of feeding one observed height to the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    /// Gate was already open
    AlreadyUnlocked,
    /// This height opened the gate
    Unlocked,
    /// Height is still below the threshold
    StillLocked,
}

#[derive(Debug)]
struct GateInner {
    threshold: u64,
    unlocked: bool,
}

/// Locked/unlocked gate for one session
#[derive(Debug)]
pub struct SyncGate {
    inner: Mutex<GateInner>,
}

impl SyncGate {
    /// Gate for a session whose persisted height is `persisted`. A positive
    /// height starts locked; anything else starts unlocked.
    pub fn armed(persisted: Option<u64>) -> Self {
        let threshold = persisted.unwrap_or(0);
        Self {
            inner: Mutex::new(GateInner {
                threshold,
                unlocked: threshold == 0,
            }),
        }
    }

    /// Gate that starts unlocked
    pub fn unlocked() -> Self {
        Self::armed(None)
    }

    /// Feed an observed height. Unlocking is one-way.
    pub fn observe(&self, height: u64) -> GateTransition {
        let mut inner = self.inner.lock();
        if inner.unlocked {
            return GateTransition::AlreadyUnlocked;
        }
        if height >= inner.threshold {
            inner.unlocked = true;
            return GateTransition::Unlocked;
        }
        GateTransition::StillLocked
    }

    /// Whether fetched state may be published
    pub fn is_unlocked(&self) -> bool {
        self.inner.lock().unlocked
    }

    /// Height that must be observed before unlocking
    pub fn threshold(&self) -> u64 {
        self.inner.lock().threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_chain_starts_unlocked() {
        assert!(SyncGate::armed(None).is_unlocked());
        assert!(SyncGate::armed(Some(0)).is_unlocked());
        assert_eq!(SyncGate::unlocked().observe(1), GateTransition::AlreadyUnlocked);
    }

    #[test]
    fn test_unlocks_on_threshold() {
        let gate = SyncGate::armed(Some(10));
        assert!(!gate.is_unlocked());
        assert_eq!(gate.observe(7), GateTransition::StillLocked);
        assert_eq!(gate.observe(9), GateTransition::StillLocked);
        assert_eq!(gate.observe(10), GateTransition::Unlocked);
        assert!(gate.is_unlocked());
    }

    #[test]
    fn test_unlock_is_one_way() {
        let gate = SyncGate::armed(Some(10));
        assert_eq!(gate.observe(11), GateTransition::Unlocked);
        assert_eq!(gate.observe(3), GateTransition::AlreadyUnlocked);
        assert!(gate.is_unlocked());
        assert_eq!(gate.threshold(), 10);
    }
}
