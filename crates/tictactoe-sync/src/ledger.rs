//! Height ledger: the running sync cursor of one chain
//!
//! The cursor is the maximum of the persisted height and every height
//! observed this session. [`HeightLedger::advance`] only moves the in-memory
//! cursor; [`HeightLedger::persist`] writes it to the [`HeightStore`] and may
//! block, so async callers run it on the blocking pool. Write failures are
//! logged and the in-memory cursor stays authoritative.

use parking_lot::Mutex;
use std::sync::Arc;
use tictactoe_storage_sqlite::HeightStore;
use tracing::{debug, warn};

/// Sync cursor for one chain
pub struct HeightLedger {
    chain_id: String,
    store: Arc<dyn HeightStore>,
    persisted: u64,
    cursor: Mutex<u64>,
    // Serializes writes so a slower write never stores an older cursor
    write: Mutex<()>,
}

impl HeightLedger {
    /// Load the persisted height for `chain_id`. Unreadable storage counts as
    /// no persisted height.
    pub fn load(chain_id: &str, store: Arc<dyn HeightStore>) -> Self {
        let persisted = match store.load_height(chain_id) {
            Ok(height) => height.unwrap_or(0),
            Err(e) => {
                warn!(
                    event = "sync_height_load_failed",
                    chain_id = %chain_id,
                    error = %e,
                    "Could not read persisted sync height"
                );
                0
            }
        };
        Self {
            chain_id: chain_id.to_string(),
            store,
            persisted,
            cursor: Mutex::new(persisted),
            write: Mutex::new(()),
        }
    }

    /// Chain this ledger tracks
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Current cursor
    pub fn cursor(&self) -> u64 {
        *self.cursor.lock()
    }

    /// Height found in storage when the ledger was loaded, `None` when zero
    pub fn persisted(&self) -> Option<u64> {
        Some(self.persisted).filter(|h| *h > 0)
    }

    /// Fold an observed height into the in-memory cursor. Returns the new
    /// cursor.
    pub fn advance(&self, height: u64) -> u64 {
        let mut cursor = self.cursor.lock();
        *cursor = (*cursor).max(height);
        *cursor
    }

    /// Write the current cursor to the store. Blocking.
    pub fn persist(&self) {
        let _write = self.write.lock();
        let next = self.cursor();
        if let Err(e) = self.store.save_height(&self.chain_id, next) {
            warn!(
                event = "sync_height_persist_failed",
                chain_id = %self.chain_id,
                height = next,
                error = %e,
                "Sync height not persisted; keeping in-memory value"
            );
        } else {
            debug!(chain_id = %self.chain_id, height = next, "Persisted sync height");
        }
    }

    /// [`advance`](Self::advance) then [`persist`](Self::persist)
    pub fn observe(&self, height: u64) -> u64 {
        let next = self.advance(height);
        self.persist();
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tictactoe_storage_sqlite::MemoryStore;

    #[test]
    fn test_load_missing_is_zero() {
        let store = Arc::new(MemoryStore::new());
        let ledger = HeightLedger::load("aa01", store);
        assert_eq!(ledger.cursor(), 0);
        assert_eq!(ledger.persisted(), None);
    }

    #[test]
    fn test_load_unparseable_is_zero() {
        let store = Arc::new(MemoryStore::new().with_raw_height("aa01", "not-a-number"));
        let ledger = HeightLedger::load("aa01", store);
        assert_eq!(ledger.cursor(), 0);
    }

    #[test]
    fn test_observe_keeps_max_and_persists() {
        let store = Arc::new(MemoryStore::new().with_raw_height("aa01", "10"));
        let ledger = HeightLedger::load("aa01", store.clone());
        assert_eq!(ledger.persisted(), Some(10));

        assert_eq!(ledger.observe(7), 10);
        assert_eq!(ledger.observe(12), 12);
        assert_eq!(ledger.observe(11), 12);
        assert_eq!(store.raw_height("aa01").as_deref(), Some("12"));
    }

    #[test]
    fn test_advance_leaves_store_untouched() {
        let store = Arc::new(MemoryStore::new().with_raw_height("aa01", "3"));
        let ledger = HeightLedger::load("aa01", store.clone());

        assert_eq!(ledger.advance(8), 8);
        assert_eq!(store.raw_height("aa01").as_deref(), Some("3"));
        ledger.persist();
        assert_eq!(store.raw_height("aa01").as_deref(), Some("8"));
    }

    #[test]
    fn test_persist_failure_keeps_memory_value() {
        let store = Arc::new(MemoryStore::new());
        let ledger = HeightLedger::load("aa01", store.clone());
        store.set_fail_writes(true);

        assert_eq!(ledger.observe(5), 5);
        assert_eq!(ledger.cursor(), 5);
        assert_eq!(store.raw_height("aa01"), None);
    }
}
