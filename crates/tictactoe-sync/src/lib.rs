//! Tic-Tac-Toe client sync layer
//!
//! Establishes a session on a Linera chain, follows its notifications, and
//! keeps an observable view of the current match. State fetched before the
//! chain has caught up with the last persisted height is never shown.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::result_large_err)]

pub mod backend;
pub mod bootstrap;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod height;
pub mod ledger;
pub mod lifecycle;
pub mod listener;
pub mod mutation;
pub mod node;
pub mod scheduler;
pub mod status;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
pub mod view;

pub use backend::{ApplicationHandle, ChainHandle, LedgerBackend, Subscription};
pub use bootstrap::{Bootstrapped, Bootstrapper, SessionIdentity};
pub use client::{
    create_match_mutation, escape_gql_string, join_match_mutation, make_move_mutation,
    parse_envelope, GameClient, GameQueryResponse, GAME_QUERY, LEAVE_MATCH_MUTATION,
};
pub use config::{ClientConfig, ENV_APPLICATION_ID, ENV_DB_PATH, ENV_FAUCET_URL, ENV_NODE_URL};
pub use engine::SyncEngine;
pub use error::{Error, Result};
pub use gate::{GateTransition, SyncGate};
pub use height::{extract_height, is_new_block};
pub use ledger::HeightLedger;
pub use lifecycle::ShutdownSignal;
pub use listener::{EventOutcome, NotificationListener};
pub use mutation::MutationGateway;
pub use node::NodeBackend;
pub use scheduler::RefreshScheduler;
pub use status::{InitStage, RefreshCounters, SyncStatus};
pub use view::{ClientView, Field, MergeReport, ViewSnapshot};
