//! Ledger backend seam
//!
//! Everything the sync layer needs from the outside world: a runtime to
//! initialize, a faucet to claim a chain from, a chain to subscribe to, and an
//! application that answers GraphQL. [`crate::node::NodeBackend`] talks to a
//! Linera faucet and node service; tests use a scripted backend.

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tictactoe_core::Signer;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Entry point to the ledger
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// One-time runtime setup. Must tolerate being called again.
    async fn initialize(&self) -> Result<()>;

    /// Claim a fresh chain owned by `signer`; returns its identifier
    async fn claim_chain(&self, signer: &Signer) -> Result<String>;

    /// Open a client session on `chain_id`
    async fn open_chain(&self, chain_id: &str, signer: &Signer) -> Result<Arc<dyn ChainHandle>>;
}

/// An opened chain
#[async_trait]
pub trait ChainHandle: Send + Sync {
    /// Chain identifier
    fn chain_id(&self) -> &str;

    /// Handle to `application_id` on this chain
    async fn application(&self, application_id: &str) -> Result<Arc<dyn ApplicationHandle>>;

    /// Start a notification stream for this chain
    async fn subscribe(&self) -> Result<Subscription>;
}

/// An application on a chain
#[async_trait]
pub trait ApplicationHandle: Send + Sync {
    /// Run one GraphQL request body (`{"query": ...}`) and return the raw
    /// response envelope text
    async fn query(&self, request: &str) -> Result<String>;
}

/// Live notification stream. Dropping it cancels the subscription.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<Value>,
    pump: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stream fed by an external sender
    pub fn new(events: mpsc::UnboundedReceiver<Value>) -> Self {
        Self { events, pump: None }
    }

    /// Stream fed by `pump`, which is aborted when the subscription drops
    pub fn with_pump(events: mpsc::UnboundedReceiver<Value>, pump: JoinHandle<()>) -> Self {
        Self {
            events,
            pump: Some(pump),
        }
    }

    /// Next notification, `None` once the stream has ended
    pub async fn next(&mut self) -> Option<Value> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}
