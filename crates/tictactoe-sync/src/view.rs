//! Observable client view and snapshot merging
//!
//! Every field is its own `watch` channel and only notifies when its value
//! actually changes, so a consumer can follow just the fields it renders.
//! The session fields are written by the bootstrapper and the listener; the
//! match fields are written only by [`ClientView::merge`] and
//! [`ClientView::clear_match`].

use crate::client::GameQueryResponse;
use crate::status::InitStage;
use crate::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tictactoe_core::{Board, GameSnapshot, GameStatus};
use tokio::sync::watch;

/// A single observable value
#[derive(Debug)]
pub struct Field<T> {
    tx: watch::Sender<T>,
    version: AtomicU64,
}

impl<T: Clone + PartialEq> Field<T> {
    fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx,
            version: AtomicU64::new(0),
        }
    }

    /// Current value
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every change
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Number of changes published so far
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Replace the value; no notification when equal. Returns whether it changed.
    pub(crate) fn set(&self, value: T) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
        if changed {
            self.version.fetch_add(1, Ordering::AcqRel);
        }
        changed
    }
}

/// Fields touched by one merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Names of fields that changed
    pub changed: Vec<&'static str>,
}

impl MergeReport {
    /// No field changed
    pub fn is_unchanged(&self) -> bool {
        self.changed.is_empty()
    }

    fn note(&mut self, name: &'static str, changed: bool) {
        if changed {
            self.changed.push(name);
        }
    }
}

/// Plain copy of every field, for printing
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    /// Session established
    pub ready: bool,
    /// Last bootstrap failure
    pub init_error: Option<String>,
    /// Bootstrap stage
    pub init_stage: InitStage,
    /// Session chain
    pub chain_id: Option<String>,
    /// Normalized application identifier
    pub application_id: Option<String>,
    /// Sync cursor
    pub sync_height: Option<u64>,
    /// Gate state
    pub sync_unlocked: bool,
    /// Last published match
    pub game: Option<GameSnapshot>,
    /// Match status
    pub match_status: Option<GameStatus>,
    /// Whether this chain hosts the match
    pub is_host: bool,
    /// Opponent chain
    pub opponent_chain_id: Option<String>,
    /// Board
    pub board: Option<Board>,
    /// Chain to move
    pub current_turn_chain_id: Option<String>,
    /// Winner chain
    pub winner_chain_id: Option<String>,
    /// Last application message or refresh error
    pub last_notification: Option<String>,
}

/// Client view shared by every component
#[derive(Debug)]
pub struct ClientView {
    /// Session established
    pub ready: Field<bool>,
    /// Last bootstrap failure
    pub init_error: Field<Option<String>>,
    /// Bootstrap stage
    pub init_stage: Field<InitStage>,
    /// Session chain
    pub chain_id: Field<Option<String>>,
    /// Normalized application identifier
    pub application_id: Field<Option<String>>,
    /// Sync cursor
    pub sync_height: Field<Option<u64>>,
    /// Gate state
    pub sync_unlocked: Field<bool>,
    /// Last published match
    pub game: Field<Option<GameSnapshot>>,
    /// Match status
    pub match_status: Field<Option<GameStatus>>,
    /// Whether this chain hosts the match
    pub is_host: Field<bool>,
    /// Opponent chain
    pub opponent_chain_id: Field<Option<String>>,
    /// Board
    pub board: Field<Option<Board>>,
    /// Chain to move
    pub current_turn_chain_id: Field<Option<String>>,
    /// Winner chain
    pub winner_chain_id: Field<Option<String>>,
    /// Last application message or refresh error
    pub last_notification: Field<Option<String>>,
    game_bytes: Mutex<Option<Vec<u8>>>,
}

impl ClientView {
    /// Empty view
    pub fn new() -> Self {
        Self {
            ready: Field::new(false),
            init_error: Field::new(None),
            init_stage: Field::new(InitStage::Idle),
            chain_id: Field::new(None),
            application_id: Field::new(None),
            sync_height: Field::new(None),
            sync_unlocked: Field::new(true),
            game: Field::new(None),
            match_status: Field::new(None),
            is_host: Field::new(false),
            opponent_chain_id: Field::new(None),
            board: Field::new(None),
            current_turn_chain_id: Field::new(None),
            winner_chain_id: Field::new(None),
            last_notification: Field::new(None),
            game_bytes: Mutex::new(None),
        }
    }

    /// Copy of every field
    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            ready: self.ready.get(),
            init_error: self.init_error.get(),
            init_stage: self.init_stage.get(),
            chain_id: self.chain_id.get(),
            application_id: self.application_id.get(),
            sync_height: self.sync_height.get(),
            sync_unlocked: self.sync_unlocked.get(),
            game: self.game.get(),
            match_status: self.match_status.get(),
            is_host: self.is_host.get(),
            opponent_chain_id: self.opponent_chain_id.get(),
            board: self.board.get(),
            current_turn_chain_id: self.current_turn_chain_id.get(),
            winner_chain_id: self.winner_chain_id.get(),
            last_notification: self.last_notification.get(),
        }
    }

    /// Reset every match-derived field to its neutral value
    pub(crate) fn clear_match(&self) -> MergeReport {
        *self.game_bytes.lock() = None;
        let mut report = MergeReport::default();
        report.note("game", self.game.set(None));
        report.note("match_status", self.match_status.set(None));
        report.note("is_host", self.is_host.set(false));
        report.note("opponent_chain_id", self.opponent_chain_id.set(None));
        report.note("board", self.board.set(None));
        report.note("current_turn_chain_id", self.current_turn_chain_id.set(None));
        report.note("winner_chain_id", self.winner_chain_id.set(None));
        report
    }

    /// Reset everything a new bootstrap starts from
    pub(crate) fn reset_session(&self) {
        self.ready.set(false);
        self.init_error.set(None);
        self.chain_id.set(None);
        self.application_id.set(None);
        self.sync_height.set(None);
        self.sync_unlocked.set(true);
        self.last_notification.set(None);
        self.clear_match();
    }

    /// Merge a fetched response. The snapshot is compared by canonical bytes;
    /// every other field is compared on its own.
    pub(crate) fn merge(&self, response: GameQueryResponse) -> Result<MergeReport> {
        let mut report = MergeReport::default();

        let bytes = match &response.game {
            Some(game) => Some(game.canonical_bytes()?),
            None => None,
        };
        let board = response
            .board
            .as_deref()
            .map(Board::from_codes)
            .or_else(|| response.game.as_ref().map(|g| g.board));

        {
            let mut last = self.game_bytes.lock();
            if *last != bytes {
                *last = bytes;
                report.note("game", self.game.set(response.game));
            }
        }

        report.note("match_status", self.match_status.set(response.match_status));
        report.note("is_host", self.is_host.set(response.is_host.unwrap_or(false)));
        report.note(
            "opponent_chain_id",
            self.opponent_chain_id.set(response.opponent_chain_id),
        );
        report.note("board", self.board.set(board));
        report.note(
            "current_turn_chain_id",
            self.current_turn_chain_id.set(response.current_turn_chain_id),
        );
        report.note("winner_chain_id", self.winner_chain_id.set(response.winner_chain_id));
        report.note(
            "last_notification",
            self.last_notification.set(response.last_notification),
        );

        Ok(report)
    }

    /// Publish a refresh or mutation failure
    pub(crate) fn notify(&self, message: String) -> bool {
        self.last_notification.set(Some(message))
    }
}

impl Default for ClientView {
    fn default() -> Self {
        Self::new()
    }
}
