//! Error types for the client core

use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Identifier is empty or not hexadecimal
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Invalid mnemonic
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Key derivation error
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Snapshot could not be decoded
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Check if error is caused by user input (vs internal error)
    pub fn is_user_error(&self) -> bool {
        matches!(self, Error::InvalidIdentifier(_) | Error::InvalidMnemonic(_))
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidIdentifier(_) => ErrorCategory::Identifier,
            Error::InvalidMnemonic(_) | Error::KeyDerivation(_) => ErrorCategory::Keys,
            Error::InvalidSnapshot(_) | Error::Serialization(_) => ErrorCategory::Snapshot,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Chain or application identifiers
    Identifier,
    /// Mnemonic and signer derivation
    Keys,
    /// Game snapshot decoding
    Snapshot,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Identifier => write!(f, "Identifier"),
            ErrorCategory::Keys => write!(f, "Keys"),
            ErrorCategory::Snapshot => write!(f, "Snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_error_detection() {
        assert!(Error::InvalidIdentifier("zz".to_string()).is_user_error());
        assert!(Error::InvalidMnemonic("one two".to_string()).is_user_error());
        assert!(!Error::KeyDerivation("bad path".to_string()).is_user_error());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            Error::InvalidIdentifier("x".to_string()).category(),
            ErrorCategory::Identifier
        );
        assert_eq!(
            Error::KeyDerivation("x".to_string()).category(),
            ErrorCategory::Keys
        );
        assert_eq!(ErrorCategory::Snapshot.to_string(), "Snapshot");
    }
}
