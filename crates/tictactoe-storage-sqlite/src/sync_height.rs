//! Per-chain sync height storage
//!
//! A dumb persisted cell: callers compute the running maximum themselves and
//! this module stores whatever it is given.

use crate::retry::with_busy_retry;
use crate::{Database, Result};
use rusqlite::{params, OptionalExtension};

/// Stored sync height record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncHeightRow {
    /// Chain identifier
    pub chain_id: String,
    /// Height as parsed from the stored text, `None` when unparseable
    pub height: Option<u64>,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

/// Sync height storage operations with retry logic
pub struct SyncHeightStorage<'a> {
    db: &'a Database,
}

impl<'a> SyncHeightStorage<'a> {
    /// Create new sync height storage
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Persisted height for `chain_id`, absent when missing or unparseable
    pub fn load_height(&self, chain_id: &str) -> Result<Option<u64>> {
        Ok(self.load_row(chain_id)?.and_then(|row| row.height))
    }

    /// Full record for `chain_id`
    pub fn load_row(&self, chain_id: &str) -> Result<Option<SyncHeightRow>> {
        with_busy_retry(|| {
            let row = self
                .db
                .conn()
                .query_row(
                    "SELECT chain_id, height, updated_at FROM sync_heights WHERE chain_id = ?1",
                    [chain_id],
                    |row| {
                        let raw: String = row.get(1)?;
                        Ok(SyncHeightRow {
                            chain_id: row.get(0)?,
                            height: parse_height(&raw),
                            updated_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Store `height` for `chain_id`, replacing any previous value
    pub fn save_height(&self, chain_id: &str, height: u64) -> Result<()> {
        self.save_raw(chain_id, &height.to_string())
    }

    /// Store an arbitrary height text (used when importing legacy values)
    pub fn save_raw(&self, chain_id: &str, raw: &str) -> Result<()> {
        let updated_at = chrono::Utc::now().to_rfc3339();

        with_busy_retry(|| {
            self.db.conn().execute(
                r#"
                INSERT INTO sync_heights (chain_id, height, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(chain_id) DO UPDATE SET
                    height = excluded.height,
                    updated_at = excluded.updated_at
                "#,
                params![chain_id, raw, updated_at],
            )?;
            Ok(())
        })
    }
}

/// Lenient height parse: leading whitespace and an optional `+` are skipped,
/// then the leading run of digits is read (`"12.7"` reads as 12). Anything
/// negative, empty or out of range is `None`.
pub fn parse_height(raw: &str) -> Option<u64> {
    let trimmed = raw.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = unsigned.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_save_and_load_height() {
        let db = test_db();
        let storage = SyncHeightStorage::new(&db);

        storage.save_height("aa01", 10).unwrap();
        assert_eq!(storage.load_height("aa01").unwrap(), Some(10));
        assert_eq!(storage.load_height("bb02").unwrap(), None);
    }

    #[test]
    fn test_save_overwrites_without_max() {
        let db = test_db();
        let storage = SyncHeightStorage::new(&db);

        storage.save_height("aa01", 10).unwrap();
        storage.save_height("aa01", 4).unwrap();
        assert_eq!(storage.load_height("aa01").unwrap(), Some(4));
    }

    #[test]
    fn test_unparseable_reads_as_absent() {
        let db = test_db();
        let storage = SyncHeightStorage::new(&db);

        storage.save_raw("aa01", "garbage").unwrap();
        assert_eq!(storage.load_height("aa01").unwrap(), None);

        let row = storage.load_row("aa01").unwrap().unwrap();
        assert_eq!(row.height, None);
        assert!(!row.updated_at.is_empty());
    }

    #[test]
    fn test_parse_height() {
        assert_eq!(parse_height("42"), Some(42));
        assert_eq!(parse_height("  42"), Some(42));
        assert_eq!(parse_height("+7"), Some(7));
        assert_eq!(parse_height("12.7"), Some(12));
        assert_eq!(parse_height("9abc"), Some(9));
        assert_eq!(parse_height("-3"), None);
        assert_eq!(parse_height(""), None);
        assert_eq!(parse_height("abc"), None);
        assert_eq!(parse_height("99999999999999999999999"), None);
    }

    proptest! {
        #[test]
        fn prop_stored_height_reads_back(height in any::<u64>(), suffix in "[^0-9]{0,4}") {
            prop_assert_eq!(parse_height(&height.to_string()), Some(height));
            prop_assert_eq!(parse_height(&format!("{}{}", height, suffix)), Some(height));
        }
    }
}
