//! Client configuration
//!
//! Compiled defaults come from `tictactoe-params`; the environment and then
//! command-line flags override them.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tictactoe_core::normalize_id;
use tictactoe_params::{Endpoints, SyncTiming};
use tictactoe_storage_sqlite::default_database_path;

/// Environment variable holding the application identifier
pub const ENV_APPLICATION_ID: &str = "LINERA_APPLICATION_ID";
/// Environment variable overriding the faucet URL
pub const ENV_FAUCET_URL: &str = "LINERA_FAUCET_URL";
/// Environment variable overriding the node service URL
pub const ENV_NODE_URL: &str = "LINERA_NODE_URL";
/// Environment variable overriding the database location
pub const ENV_DB_PATH: &str = "TICTACTOE_DB_PATH";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Application identifier as supplied (normalized during bootstrap)
    pub application_id: String,
    /// Faucet and node service endpoints
    pub endpoints: Endpoints,
    /// Local database file
    pub database_path: PathBuf,
    /// Debounce, poll and grace periods
    pub timing: SyncTiming,
    /// Word count for a newly generated mnemonic
    pub mnemonic_words: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            application_id: String::new(),
            endpoints: Endpoints::local(),
            database_path: default_database_path(),
            timing: SyncTiming::standard(),
            mnemonic_words: 24,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`; empty values are ignored
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(id) = get(ENV_APPLICATION_ID) {
            config.application_id = id;
        }
        if let Some(url) = get(ENV_FAUCET_URL) {
            config.endpoints.faucet_url = url;
        }
        if let Some(url) = get(ENV_NODE_URL) {
            config.endpoints.node_url = url;
        }
        if let Some(path) = get(ENV_DB_PATH) {
            config.database_path = PathBuf::from(path);
        }
        config
    }

    /// Normalized application identifier, or a configuration error when it
    /// normalizes to nothing
    pub fn normalized_application_id(&self) -> Result<String> {
        let normalized = normalize_id(&self.application_id);
        if normalized.is_empty() {
            return Err(Error::Configuration(format!(
                "Missing or invalid {} (expected hex, may contain colons)",
                ENV_APPLICATION_ID
            )));
        }
        Ok(normalized)
    }

    /// Check endpoints and the application identifier before any network
    /// work. Returns the normalized application identifier.
    pub fn validate(&self) -> Result<String> {
        self.endpoints
            .validate()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        self.normalized_application_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(config.endpoints, Endpoints::local());
        assert_eq!(config.timing, SyncTiming::standard());
        assert!(config.application_id.is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_APPLICATION_ID, "e476-187f:00"),
            (ENV_FAUCET_URL, "https://faucet.example"),
            (ENV_NODE_URL, "  "),
            (ENV_DB_PATH, "/tmp/ttt.db"),
        ]));
        assert_eq!(config.endpoints.faucet_url, "https://faucet.example");
        assert_eq!(config.endpoints.node_url, Endpoints::local().node_url);
        assert_eq!(config.database_path, PathBuf::from("/tmp/ttt.db"));
        assert_eq!(config.normalized_application_id().unwrap(), "e476187f:00");
    }

    #[test]
    fn test_missing_application_id() {
        let config = ClientConfig::default();
        let err = config.normalized_application_id().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("expected hex, may contain colons"));

        let config = ClientConfig {
            application_id: "zzz-yyy".to_string(),
            ..ClientConfig::default()
        };
        assert!(config.normalized_application_id().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut config = ClientConfig {
            application_id: "e476:00".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(config.validate().unwrap(), "e476:00");

        config.endpoints.node_url = "ftp://node.example".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.detail().contains("ftp://node.example"));
    }
}
