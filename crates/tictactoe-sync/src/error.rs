//! Error types for sync operations

use crate::status::InitStage;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration, detected before any network call
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Bootstrap failed at `stage`; recovery needs an explicit restart
    #[error("{stage}: {message}")]
    Connectivity {
        /// Stage that failed
        stage: InitStage,
        /// Underlying failure
        message: String,
    },

    /// Application answered with GraphQL errors
    #[error("{0}")]
    Query(String),

    /// Request or stream failed below the GraphQL layer
    #[error("Transport error: {0}")]
    Transport(String),

    /// Local storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// No session has been established yet
    #[error("Linera app not initialized")]
    NotInitialized,

    /// Malformed JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot or key error from the core model
    #[error(transparent)]
    Core(#[from] tictactoe_core::Error),
}

impl Error {
    /// Stage label carried by a connectivity failure
    pub fn stage(&self) -> Option<InitStage> {
        match self {
            Error::Connectivity { stage, .. } => Some(*stage),
            Error::Configuration(_) => Some(InitStage::ConfigurationError),
            _ => None,
        }
    }

    /// Message without the category prefix, as shown to the player
    pub fn detail(&self) -> String {
        match self {
            Error::Configuration(m)
            | Error::Query(m)
            | Error::Transport(m)
            | Error::Storage(m) => m.clone(),
            Error::Connectivity { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub(crate) fn connectivity(stage: InitStage, message: impl ToString) -> Self {
        Error::Connectivity {
            stage,
            message: message.to_string(),
        }
    }
}

impl From<tictactoe_storage_sqlite::Error> for Error {
    fn from(e: tictactoe_storage_sqlite::Error) -> Self {
        Error::Storage(format!("{}", e))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(format!("{}", e))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::Transport(format!("{}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_display_carries_stage() {
        let err = Error::connectivity(InitStage::CreatingChain, "faucet unreachable");
        assert_eq!(err.to_string(), "Creating microchain...: faucet unreachable");
        assert_eq!(err.stage(), Some(InitStage::CreatingChain));
    }

    #[test]
    fn test_query_error_is_bare_message() {
        let err = Error::Query("a; b".to_string());
        assert_eq!(err.to_string(), "a; b");
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn test_detail_drops_prefix() {
        assert_eq!(Error::Transport("timed out".into()).detail(), "timed out");
        assert_eq!(
            Error::connectivity(InitStage::CreatingChain, "faucet unreachable").detail(),
            "faucet unreachable"
        );
        assert_eq!(Error::NotInitialized.detail(), "Linera app not initialized");
    }
}
