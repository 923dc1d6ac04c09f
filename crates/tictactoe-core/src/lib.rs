//! Tic-Tac-Toe client core
//!
//! This crate holds the pieces of the client that need no I/O: identifier
//! normalization, the read-only game snapshot model mirrored from the
//! on-chain application, and the signer derived from the device mnemonic.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod game;
pub mod ids;
pub mod keys;

pub use error::{Error, ErrorCategory, Result};
pub use game::{
    Board, Cell, GameSnapshot, GameStatus, MatchOutcome, MoveAvailability, PlayerInfo,
    BOARD_CELLS, BOARD_SIDE,
};
pub use ids::{default_player_name, is_valid_id, normalize_id, require_id};
pub use keys::{generate_mnemonic, Signer, DEFAULT_DERIVATION_PATH};
