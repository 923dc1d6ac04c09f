//! Tic-Tac-Toe client deployment parameters and constants
//!
//! This crate provides the default service endpoints and the timing
//! constants shared by the sync engine and the command line client.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod endpoints;
pub mod timing;

pub use endpoints::{Endpoints, DEFAULT_FAUCET_URL, DEFAULT_NODE_URL};
pub use timing::{SyncTiming, DEBOUNCE_MS, INIT_GRACE_MS, POLL_INTERVAL_MS};

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid endpoint URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;
