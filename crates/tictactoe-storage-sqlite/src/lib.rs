//! Local SQLite storage for the Tic-Tac-Toe client
//!
//! Holds the two kinds of durable client state:
//!
//! - **Sync heights**: per-chain block height the client must re-observe
//!   before it trusts fetched state again
//! - **Local settings**: device-global values such as the wallet mnemonic and
//!   the remembered display name
//!
//! Both are reached through the [`HeightStore`] and [`SettingsStore`] traits so
//! the sync layer can run against SQLite or the in-memory [`MemoryStore`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod database;
pub mod error;
pub mod migrations;
pub mod retry;
pub mod settings;
pub mod store;
pub mod sync_height;

pub use database::{default_database_path, Database};
pub use error::{Error, Result};
pub use retry::{BASE_BACKOFF_MS, MAX_BACKOFF_MS, MAX_BUSY_RETRIES};
pub use settings::{SettingsStorage, MNEMONIC_KEY, PLAYER_NAME_KEY};
pub use store::{HeightStore, MemoryStore, SettingsStore, SqliteStore};
pub use sync_height::{parse_height, SyncHeightRow, SyncHeightStorage};
