//! Read-only model of the on-chain match
//!
//! The ledger owns the match; the client only ever holds a cached copy that
//! is replaced wholesale after each successful fetch. Decoding is tolerant
//! of the shapes the GraphQL service has produced over time (enum spelling,
//! short boards).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cells per board side
pub const BOARD_SIDE: u8 = 3;

/// Cells per board
pub const BOARD_CELLS: usize = 9;

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GameStatus {
    /// Host created the match, no guest yet
    WaitingForPlayer,
    /// Both players joined
    InProgress,
    /// A player completed a line
    Ended,
    /// Board full without a winner
    Draw,
}

impl GameStatus {
    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitingForPlayer => "WaitingForPlayer",
            Self::InProgress => "InProgress",
            Self::Ended => "Ended",
            Self::Draw => "Draw",
        }
    }

    /// Parse any spelling the service emits (`WaitingForPlayer`,
    /// `WAITING_FOR_PLAYER`, `Active`, ...)
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "waitingforplayer" => Some(Self::WaitingForPlayer),
            "inprogress" | "active" => Some(Self::InProgress),
            "ended" => Some(Self::Ended),
            "draw" => Some(Self::Draw),
            _ => None,
        }
    }

    /// Match can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Draw)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for GameStatus {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value).ok_or_else(|| Error::InvalidSnapshot(format!("unknown status {:?}", value)))
    }
}

impl From<GameStatus> for String {
    fn from(status: GameStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Board cell. Encoded on the wire as -1 (empty), 0 (host) and 1 (guest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Cell {
    /// No mark
    #[default]
    Empty,
    /// Host mark (X)
    Host,
    /// Guest mark (O)
    Guest,
}

impl Cell {
    /// Wire code
    pub fn code(&self) -> i32 {
        match self {
            Self::Empty => -1,
            Self::Host => 0,
            Self::Guest => 1,
        }
    }

    /// Text symbol
    pub fn symbol(&self) -> char {
        match self {
            Self::Empty => '.',
            Self::Host => 'X',
            Self::Guest => 'O',
        }
    }
}

impl From<i32> for Cell {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Host,
            1 => Self::Guest,
            _ => Self::Empty,
        }
    }
}

impl From<Cell> for i32 {
    fn from(cell: Cell) -> Self {
        cell.code()
    }
}

/// Fixed 3x3 board, row-major
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<i32>", into = "Vec<i32>")]
pub struct Board([Cell; BOARD_CELLS]);

impl Board {
    /// Build from wire codes; missing cells are empty, extra codes ignored
    pub fn from_codes(codes: &[i32]) -> Self {
        let mut cells = [Cell::Empty; BOARD_CELLS];
        for (slot, code) in cells.iter_mut().zip(codes) {
            *slot = Cell::from(*code);
        }
        Self(cells)
    }

    /// Wire codes
    pub fn codes(&self) -> Vec<i32> {
        self.0.iter().map(Cell::code).collect()
    }

    /// Cell at `row`, `col`, `None` when out of bounds
    pub fn get(&self, row: u8, col: u8) -> Option<Cell> {
        if row >= BOARD_SIDE || col >= BOARD_SIDE {
            return None;
        }
        Some(self.0[(row * BOARD_SIDE + col) as usize])
    }

    /// All cells, row-major
    pub fn cells(&self) -> &[Cell; BOARD_CELLS] {
        &self.0
    }

    /// Three-line text rendering
    pub fn render(&self) -> String {
        self.0
            .chunks(BOARD_SIDE as usize)
            .map(|row| {
                row.iter()
                    .map(|c| c.symbol().to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Vec<i32>> for Board {
    fn from(codes: Vec<i32>) -> Self {
        Self::from_codes(&codes)
    }
}

impl From<Board> for Vec<i32> {
    fn from(board: Board) -> Self {
        board.codes()
    }
}

/// Player seat
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    /// Player chain
    pub chain_id: String,
    /// Display name
    pub name: String,
}

/// Outcome of the match from one player's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// No match on this chain
    NoMatch,
    /// Still being played (or waiting for a guest)
    InProgress,
    /// This player completed a line
    Won,
    /// The opponent completed a line
    Lost,
    /// Board filled without a line
    Draw,
}

/// Whether a move is worth submitting. Only a hint; the ledger decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveAvailability {
    /// Move looks legal
    Available,
    /// Sync gate is locked, state is not trusted yet
    Syncing,
    /// No active two-player match
    MatchNotActive,
    /// Opponent to move
    NotYourTurn,
    /// Cell already marked
    CellOccupied,
    /// Row or column outside the board
    OutOfBounds,
}

impl MoveAvailability {
    /// True when the move control should be enabled
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Snapshot of the match as served by the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    /// Match identifier (host-assigned)
    pub match_id: String,
    /// Chain hosting the match
    pub host_chain_id: String,
    /// Status
    pub status: GameStatus,
    /// Host first, then guest
    #[serde(default)]
    pub players: Vec<PlayerInfo>,
    /// Board
    #[serde(default)]
    pub board: Board,
    /// Index into `players` of the player to move
    #[serde(default)]
    pub current_turn_index: u8,
    /// Winner chain, if any
    #[serde(default)]
    pub winner_chain_id: Option<String>,
}

impl GameSnapshot {
    /// Decode from the `game` field of a query response
    pub fn from_value(value: serde_json::Value) -> Result<Option<Self>> {
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Canonical serialization used for change detection
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Chain of the player to move
    pub fn current_turn_chain_id(&self) -> Option<&str> {
        self.players
            .get(self.current_turn_index as usize)
            .map(|p| p.chain_id.as_str())
    }

    /// Whether `chain_id` hosts this match
    pub fn is_host(&self, chain_id: &str) -> bool {
        self.host_chain_id == chain_id
    }

    /// The other player's chain, seen from `chain_id`
    pub fn opponent_of(&self, chain_id: &str) -> Option<&str> {
        self.players
            .iter()
            .find(|p| p.chain_id != chain_id)
            .map(|p| p.chain_id.as_str())
    }

    /// Ended, drawn, or a winner is already recorded
    pub fn is_over(&self) -> bool {
        self.status.is_terminal() || self.winner_chain_id.is_some()
    }

    /// Outcome for `chain_id`
    pub fn outcome_for(&self, chain_id: &str) -> MatchOutcome {
        if !self.is_over() {
            return MatchOutcome::InProgress;
        }
        match self.winner_chain_id.as_deref() {
            Some(winner) if winner == chain_id => MatchOutcome::Won,
            Some(_) => MatchOutcome::Lost,
            None => MatchOutcome::Draw,
        }
    }

    /// Hint for a move by `chain_id` at `row`, `col`
    pub fn move_availability(&self, chain_id: &str, row: u8, col: u8) -> MoveAvailability {
        if self.status != GameStatus::InProgress || self.players.len() < 2 || self.is_over() {
            return MoveAvailability::MatchNotActive;
        }
        if self.current_turn_chain_id() != Some(chain_id) {
            return MoveAvailability::NotYourTurn;
        }
        match self.board.get(row, col) {
            None => MoveAvailability::OutOfBounds,
            Some(Cell::Empty) => MoveAvailability::Available,
            Some(_) => MoveAvailability::CellOccupied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn active_game() -> GameSnapshot {
        GameSnapshot {
            match_id: "1700000000".to_string(),
            host_chain_id: "aa01".to_string(),
            status: GameStatus::InProgress,
            players: vec![
                PlayerInfo {
                    chain_id: "aa01".to_string(),
                    name: "alice".to_string(),
                },
                PlayerInfo {
                    chain_id: "bb02".to_string(),
                    name: "bob".to_string(),
                },
            ],
            board: Board::from_codes(&[0, -1, -1, -1, 1, -1, -1, -1, -1]),
            current_turn_index: 0,
            winner_chain_id: None,
        }
    }

    #[test]
    fn test_status_spellings() {
        assert_eq!(GameStatus::parse("WaitingForPlayer"), Some(GameStatus::WaitingForPlayer));
        assert_eq!(GameStatus::parse("WAITING_FOR_PLAYER"), Some(GameStatus::WaitingForPlayer));
        assert_eq!(GameStatus::parse("ACTIVE"), Some(GameStatus::InProgress));
        assert_eq!(GameStatus::parse("InProgress"), Some(GameStatus::InProgress));
        assert_eq!(GameStatus::parse("DRAW"), Some(GameStatus::Draw));
        assert_eq!(GameStatus::parse("Paused"), None);
    }

    #[test]
    fn test_decode_service_shape() {
        let value = json!({
            "matchId": "42",
            "hostChainId": "aa01",
            "status": "ACTIVE",
            "players": [{"chainId": "aa01", "name": "alice"}, {"chainId": "bb02", "name": "bob"}],
            "board": [0, -1, -1, -1, 1, -1, -1, -1, -1],
            "currentTurnIndex": 1,
            "winnerChainId": null
        });
        let game = GameSnapshot::from_value(value).unwrap().unwrap();
        assert_eq!(game.status, GameStatus::InProgress);
        assert_eq!(game.board.get(0, 0), Some(Cell::Host));
        assert_eq!(game.board.get(1, 1), Some(Cell::Guest));
        assert_eq!(game.current_turn_chain_id(), Some("bb02"));
    }

    #[test]
    fn test_decode_null_game() {
        assert!(GameSnapshot::from_value(serde_json::Value::Null).unwrap().is_none());
    }

    #[test]
    fn test_short_board_is_padded() {
        let board = Board::from_codes(&[0, 1]);
        assert_eq!(board.get(0, 0), Some(Cell::Host));
        assert_eq!(board.get(0, 1), Some(Cell::Guest));
        assert_eq!(board.get(2, 2), Some(Cell::Empty));
        assert_eq!(board.get(3, 0), None);
        assert_eq!(Board::from_codes(&[7; 9]), Board::default());
    }

    #[test]
    fn test_canonical_bytes_stable() {
        let a = active_game();
        let b = active_game();
        assert_eq!(a.canonical_bytes().unwrap(), b.canonical_bytes().unwrap());

        let mut c = active_game();
        c.current_turn_index = 1;
        assert_ne!(a.canonical_bytes().unwrap(), c.canonical_bytes().unwrap());
    }

    #[test]
    fn test_opponent_and_host() {
        let game = active_game();
        assert!(game.is_host("aa01"));
        assert!(!game.is_host("bb02"));
        assert_eq!(game.opponent_of("aa01"), Some("bb02"));
        assert_eq!(game.opponent_of("bb02"), Some("aa01"));
    }

    #[test]
    fn test_move_availability() {
        let game = active_game();
        assert_eq!(game.move_availability("aa01", 0, 1), MoveAvailability::Available);
        assert_eq!(game.move_availability("aa01", 0, 0), MoveAvailability::CellOccupied);
        assert_eq!(game.move_availability("aa01", 3, 0), MoveAvailability::OutOfBounds);
        assert_eq!(game.move_availability("bb02", 0, 1), MoveAvailability::NotYourTurn);

        let mut waiting = active_game();
        waiting.status = GameStatus::WaitingForPlayer;
        waiting.players.truncate(1);
        assert_eq!(waiting.move_availability("aa01", 0, 1), MoveAvailability::MatchNotActive);
    }

    #[test]
    fn test_outcomes() {
        let mut game = active_game();
        assert_eq!(game.outcome_for("aa01"), MatchOutcome::InProgress);

        game.status = GameStatus::Ended;
        game.winner_chain_id = Some("aa01".to_string());
        assert_eq!(game.outcome_for("aa01"), MatchOutcome::Won);
        assert_eq!(game.outcome_for("bb02"), MatchOutcome::Lost);

        game.status = GameStatus::Draw;
        game.winner_chain_id = None;
        assert_eq!(game.outcome_for("aa01"), MatchOutcome::Draw);
    }

    #[test]
    fn test_render() {
        let game = active_game();
        assert_eq!(game.board.render(), "X . .\n. O .\n. . .");
    }
}
