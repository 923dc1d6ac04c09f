//! Store traits consumed by the sync layer
//!
//! [`SqliteStore`] is the durable implementation; [`MemoryStore`] keeps
//! everything in process and can be told to fail writes, which is how the
//! best-effort persistence paths are exercised.

use crate::settings::{SettingsStorage, MNEMONIC_KEY, PLAYER_NAME_KEY};
use crate::sync_height::{parse_height, SyncHeightStorage};
use crate::{Database, Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Durable per-chain sync height cell
pub trait HeightStore: Send + Sync {
    /// Stored height for `chain_id`, absent when missing or unparseable
    fn load_height(&self, chain_id: &str) -> Result<Option<u64>>;

    /// Replace the stored height for `chain_id`
    fn save_height(&self, chain_id: &str, height: u64) -> Result<()>;
}

/// Device-global settings
pub trait SettingsStore: Send + Sync {
    /// Value under `key`
    fn load_setting(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace `key`
    fn save_setting(&self, key: &str, value: &str) -> Result<()>;

    /// Persisted wallet mnemonic
    fn load_mnemonic(&self) -> Result<Option<String>> {
        Ok(self
            .load_setting(MNEMONIC_KEY)?
            .filter(|phrase| !phrase.trim().is_empty()))
    }

    /// Persist the wallet mnemonic
    fn save_mnemonic(&self, phrase: &str) -> Result<()> {
        self.save_setting(MNEMONIC_KEY, phrase)
    }

    /// Remembered display name
    fn load_player_name(&self) -> Result<Option<String>> {
        self.load_setting(PLAYER_NAME_KEY)
    }

    /// Remember the display name
    fn save_player_name(&self, name: &str) -> Result<()> {
        self.save_setting(PLAYER_NAME_KEY, name)
    }
}

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteStore {
    /// Open the database file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_database(Database::open(path)?))
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    /// Wrap an already opened database
    pub fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }
}

impl HeightStore for SqliteStore {
    fn load_height(&self, chain_id: &str) -> Result<Option<u64>> {
        let db = self.db.lock();
        SyncHeightStorage::new(&db).load_height(chain_id)
    }

    fn save_height(&self, chain_id: &str, height: u64) -> Result<()> {
        let db = self.db.lock();
        SyncHeightStorage::new(&db).save_height(chain_id, height)
    }
}

impl SettingsStore for SqliteStore {
    fn load_setting(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock();
        SettingsStorage::new(&db).get(key)
    }

    fn save_setting(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock();
        SettingsStorage::new(&db).set(key, value)
    }
}

/// In-process store
#[derive(Default)]
pub struct MemoryStore {
    heights: Mutex<HashMap<String, String>>,
    settings: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw height text, as a previous process might have left it
    pub fn with_raw_height(self, chain_id: &str, raw: &str) -> Self {
        self.heights
            .lock()
            .insert(chain_id.to_string(), raw.to_string());
        self
    }

    /// Make every subsequent write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw stored height text
    pub fn raw_height(&self, chain_id: &str) -> Option<String> {
        self.heights.lock().get(chain_id).cloned()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage("store is read-only".to_string()));
        }
        Ok(())
    }
}

impl HeightStore for MemoryStore {
    fn load_height(&self, chain_id: &str) -> Result<Option<u64>> {
        Ok(self
            .heights
            .lock()
            .get(chain_id)
            .and_then(|raw| parse_height(raw)))
    }

    fn save_height(&self, chain_id: &str, height: u64) -> Result<()> {
        self.check_writable()?;
        self.heights
            .lock()
            .insert(chain_id.to_string(), height.to_string());
        Ok(())
    }
}

impl SettingsStore for MemoryStore {
    fn load_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.settings.lock().get(key).cloned())
    }

    fn save_setting(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        self.settings
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
