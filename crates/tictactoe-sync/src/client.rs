//! GraphQL client for the tic-tac-toe application
//!
//! Builds query and mutation documents, sends them through an
//! [`ApplicationHandle`] and unwraps the `{data} | {errors}` envelope.

use crate::backend::ApplicationHandle;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tictactoe_core::{normalize_id, GameSnapshot, GameStatus};

/// Read query for the full match view
pub const GAME_QUERY: &str = "query { \
    game { matchId hostChainId status players { chainId name } board currentTurnIndex winnerChainId } \
    matchStatus isHost opponentChainId board currentTurnChainId winnerChainId lastNotification \
}";

/// Mutation leaving the current match
pub const LEAVE_MATCH_MUTATION: &str = "mutation { leaveMatch }";

/// Response to [`GAME_QUERY`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameQueryResponse {
    /// Full snapshot, `None` when no match exists
    #[serde(default)]
    pub game: Option<GameSnapshot>,
    /// Status of the match
    #[serde(default)]
    pub match_status: Option<GameStatus>,
    /// Whether the queried chain hosts the match
    #[serde(default)]
    pub is_host: Option<bool>,
    /// Other player's chain
    #[serde(default)]
    pub opponent_chain_id: Option<String>,
    /// Board codes
    #[serde(default)]
    pub board: Option<Vec<i32>>,
    /// Chain of the player to move
    #[serde(default)]
    pub current_turn_chain_id: Option<String>,
    /// Winner chain
    #[serde(default)]
    pub winner_chain_id: Option<String>,
    /// Last message recorded by the application
    #[serde(default)]
    pub last_notification: Option<String>,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: String,
}

/// Escape free text for embedding in a GraphQL string literal
pub fn escape_gql_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

/// `createMatch` mutation
pub fn create_match_mutation(host_name: &str) -> String {
    format!(
        "mutation {{ createMatch(hostName: \"{}\") }}",
        escape_gql_string(host_name)
    )
}

/// `joinMatch` mutation. The host chain is normalized; input that normalizes
/// to nothing is sent as typed and left for the application to reject.
pub fn join_match_mutation(host_chain_id: &str, player_name: &str) -> String {
    let normalized = normalize_id(host_chain_id);
    let host = if normalized.is_empty() {
        host_chain_id
    } else {
        normalized.as_str()
    };
    format!(
        "mutation {{ joinMatch(hostChainId: \"{}\", playerName: \"{}\") }}",
        escape_gql_string(host),
        escape_gql_string(player_name)
    )
}

/// `makeMove` mutation. Bounds are left to the application.
pub fn make_move_mutation(row: u8, col: u8) -> String {
    format!("mutation {{ makeMove(row: {}, col: {}) }}", row, col)
}

/// Unwrap a response envelope. Any GraphQL error fails the whole call with
/// the messages joined by `"; "`.
pub fn parse_envelope(text: &str) -> Result<Value> {
    let envelope: Envelope = serde_json::from_str(text)?;
    if let Some(errors) = envelope.errors.filter(|e| !e.is_empty()) {
        let message = errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(Error::Query(message));
    }
    Ok(envelope.data.unwrap_or(Value::Null))
}

/// Client bound to one application handle
#[derive(Clone)]
pub struct GameClient {
    app: Arc<dyn ApplicationHandle>,
}

impl GameClient {
    /// Create new client
    pub fn new(app: Arc<dyn ApplicationHandle>) -> Self {
        Self { app }
    }

    /// Run a document and return its `data`
    pub async fn execute(&self, document: &str) -> Result<Value> {
        let body = json!({ "query": document }).to_string();
        let text = self.app.query(&body).await?;
        parse_envelope(&text)
    }

    /// Fetch the match view
    pub async fn fetch_game(&self) -> Result<GameQueryResponse> {
        let data = self.execute(GAME_QUERY).await?;
        if data.is_null() {
            return Ok(GameQueryResponse::default());
        }
        Ok(serde_json::from_value(data)?)
    }

    /// Run a mutation and return the application's reply message
    pub async fn mutate(&self, document: &str) -> Result<String> {
        let data = self.execute(document).await?;
        let reply = match &data {
            Value::Object(map) => map.values().next().cloned().unwrap_or(Value::Null),
            other => other.clone(),
        };
        Ok(match reply {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }
}
