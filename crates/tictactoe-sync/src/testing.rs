//! Scripted in-memory ledger backend for tests
//!
//! The mock answers the game query with whatever data was last set, records
//! every mutation without applying it, and forwards notifications pushed with
//! [`MockLedger::notify`] to every live subscription.

use crate::backend::{ApplicationHandle, ChainHandle, LedgerBackend, Subscription};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tictactoe_core::{GameSnapshot, Signer};
use tokio::sync::mpsc;

#[derive(Default)]
struct MockState {
    chain_id: String,
    game_data: Mutex<Value>,
    query_delay: Mutex<Duration>,
    query_error: Mutex<Option<String>>,
    mutation_error: Mutex<Option<String>>,
    claim_error: Mutex<Option<String>>,
    initialize_error: Mutex<Option<String>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Value>>>,
    mutations: Mutex<Vec<String>>,
    owners: Mutex<Vec<String>>,
    fetches: AtomicUsize,
    claims: AtomicUsize,
    initializations: AtomicUsize,
    subscriptions: AtomicUsize,
}

/// Scripted ledger backend
#[derive(Clone)]
pub struct MockLedger {
    state: Arc<MockState>,
}

impl MockLedger {
    /// Backend whose faucet always hands out `chain_id`
    pub fn new(chain_id: &str) -> Self {
        Self {
            state: Arc::new(MockState {
                chain_id: chain_id.to_string(),
                game_data: Mutex::new(game_data(None, chain_id)),
                ..MockState::default()
            }),
        }
    }

    /// Replace the `data` returned by the game query
    pub fn set_game_data(&self, data: Value) {
        *self.state.game_data.lock() = data;
    }

    /// Serve `game` as seen from this backend's chain
    pub fn set_game(&self, game: Option<&GameSnapshot>) {
        self.set_game_data(game_data(game, &self.state.chain_id));
    }

    /// Hold every query for `delay` before answering
    pub fn set_query_delay(&self, delay: Duration) {
        *self.state.query_delay.lock() = delay;
    }

    /// Answer queries with a GraphQL error
    pub fn fail_queries(&self, message: Option<&str>) {
        *self.state.query_error.lock() = message.map(str::to_string);
    }

    /// Answer mutations with a GraphQL error
    pub fn fail_mutations(&self, message: Option<&str>) {
        *self.state.mutation_error.lock() = message.map(str::to_string);
    }

    /// Make the faucet fail
    pub fn fail_claims(&self, message: Option<&str>) {
        *self.state.claim_error.lock() = message.map(str::to_string);
    }

    /// Make runtime initialization report an error
    pub fn fail_initialize(&self, message: Option<&str>) {
        *self.state.initialize_error.lock() = message.map(str::to_string);
    }

    /// Push a notification to every live subscription; returns how many
    /// received it
    pub fn notify(&self, event: Value) -> usize {
        let mut subscribers = self.state.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        subscribers.len()
    }

    /// Subscriptions not yet dropped
    pub fn active_subscriptions(&self) -> usize {
        let mut subscribers = self.state.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    /// Game queries answered (or failed) so far
    pub fn fetch_count(&self) -> usize {
        self.state.fetches.load(Ordering::SeqCst)
    }

    /// Faucet claims so far
    pub fn claim_count(&self) -> usize {
        self.state.claims.load(Ordering::SeqCst)
    }

    /// Runtime initializations so far
    pub fn initialize_count(&self) -> usize {
        self.state.initializations.load(Ordering::SeqCst)
    }

    /// Subscriptions opened so far
    pub fn subscription_count(&self) -> usize {
        self.state.subscriptions.load(Ordering::SeqCst)
    }

    /// Mutation documents received, in order
    pub fn mutations(&self) -> Vec<String> {
        self.state.mutations.lock().clone()
    }

    /// Owners that claimed a chain, in order
    pub fn owners(&self) -> Vec<String> {
        self.state.owners.lock().clone()
    }
}

/// Query data the application would derive for `viewer_chain` from `game`
pub fn game_data(game: Option<&GameSnapshot>, viewer_chain: &str) -> Value {
    match game {
        None => json!({
            "game": null,
            "matchStatus": null,
            "isHost": false,
            "opponentChainId": null,
            "board": null,
            "currentTurnChainId": null,
            "winnerChainId": null,
            "lastNotification": null,
        }),
        Some(game) => json!({
            "game": game,
            "matchStatus": game.status,
            "isHost": game.is_host(viewer_chain),
            "opponentChainId": game.opponent_of(viewer_chain),
            "board": game.board,
            "currentTurnChainId": game.current_turn_chain_id(),
            "winnerChainId": game.winner_chain_id,
            "lastNotification": null,
        }),
    }
}

/// `NewBlock` notification at `height` for `chain_id`
pub fn new_block(chain_id: &str, height: u64) -> Value {
    json!({
        "chainId": chain_id,
        "reason": { "NewBlock": { "height": height, "hash": "00" } }
    })
}

fn error_envelope(message: &str) -> String {
    json!({ "errors": [{ "message": message }] }).to_string()
}

#[async_trait]
impl LedgerBackend for MockLedger {
    async fn initialize(&self) -> Result<()> {
        self.state.initializations.fetch_add(1, Ordering::SeqCst);
        match self.state.initialize_error.lock().clone() {
            Some(message) => Err(Error::Transport(message)),
            None => Ok(()),
        }
    }

    async fn claim_chain(&self, signer: &Signer) -> Result<String> {
        self.state.claims.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.state.claim_error.lock().clone() {
            return Err(Error::Transport(message));
        }
        self.state.owners.lock().push(signer.owner().to_string());
        Ok(self.state.chain_id.clone())
    }

    async fn open_chain(&self, chain_id: &str, _signer: &Signer) -> Result<Arc<dyn ChainHandle>> {
        Ok(Arc::new(MockChain {
            chain_id: chain_id.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockChain {
    chain_id: String,
    state: Arc<MockState>,
}

#[async_trait]
impl ChainHandle for MockChain {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    async fn application(&self, _application_id: &str) -> Result<Arc<dyn ApplicationHandle>> {
        Ok(Arc::new(MockApplication {
            state: Arc::clone(&self.state),
        }))
    }

    async fn subscribe(&self) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.subscribers.lock().push(tx);
        self.state.subscriptions.fetch_add(1, Ordering::SeqCst);
        Ok(Subscription::new(rx))
    }
}

struct MockApplication {
    state: Arc<MockState>,
}

#[async_trait]
impl ApplicationHandle for MockApplication {
    async fn query(&self, request: &str) -> Result<String> {
        let request: Value = serde_json::from_str(request)?;
        let document = request["query"].as_str().unwrap_or_default().trim().to_string();

        if document.starts_with("mutation") {
            self.state.mutations.lock().push(document);
            if let Some(message) = self.state.mutation_error.lock().clone() {
                return Ok(error_envelope(&message));
            }
            return Ok(json!({ "data": { "result": "ok" } }).to_string());
        }

        self.state.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state.query_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.state.query_error.lock().clone() {
            return Ok(error_envelope(&message));
        }
        let data = self.state.game_data.lock().clone();
        Ok(json!({ "data": data }).to_string())
    }
}
