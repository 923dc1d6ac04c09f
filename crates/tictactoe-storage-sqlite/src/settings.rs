//! Device-global settings

use crate::retry::with_busy_retry;
use crate::{Database, Result};
use rusqlite::{params, OptionalExtension};

/// Settings key of the wallet mnemonic
pub const MNEMONIC_KEY: &str = "linera_mnemonic";

/// Settings key of the remembered display name
pub const PLAYER_NAME_KEY: &str = "tictactoe_player_name";

/// Key/value settings with retry logic
pub struct SettingsStorage<'a> {
    db: &'a Database,
}

impl<'a> SettingsStorage<'a> {
    /// Create new settings storage
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        with_busy_retry(|| {
            Ok(self
                .db
                .conn()
                .query_row(
                    "SELECT value FROM local_settings WHERE key = ?1",
                    [key],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    /// Insert or replace `key`
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = chrono::Utc::now().to_rfc3339();

        with_busy_retry(|| {
            self.db.conn().execute(
                r#"
                INSERT INTO local_settings (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                "#,
                params![key, value, updated_at],
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing() {
        let db = Database::open_in_memory().unwrap();
        let settings = SettingsStorage::new(&db);
        assert_eq!(settings.get(PLAYER_NAME_KEY).unwrap(), None);
    }

    #[test]
    fn test_set_and_replace() {
        let db = Database::open_in_memory().unwrap();
        let settings = SettingsStorage::new(&db);

        settings.set(PLAYER_NAME_KEY, "alice").unwrap();
        settings.set(PLAYER_NAME_KEY, "bob").unwrap();
        assert_eq!(settings.get(PLAYER_NAME_KEY).unwrap().as_deref(), Some("bob"));
    }

    #[test]
    fn test_keys_are_independent() {
        let db = Database::open_in_memory().unwrap();
        let settings = SettingsStorage::new(&db);

        settings.set(MNEMONIC_KEY, "abandon about").unwrap();
        settings.set(PLAYER_NAME_KEY, "alice").unwrap();
        assert_eq!(settings.get(MNEMONIC_KEY).unwrap().as_deref(), Some("abandon about"));
    }
}
