//! Mutation gateway
//!
//! Each mutation is sent once; on success a refresh runs before the call
//! returns, so the caller sees the application's reply and the state it
//! produced together. Failures are returned untouched and leave the view as
//! it was.

use crate::client::{
    create_match_mutation, join_match_mutation, make_move_mutation, GameClient,
    LEAVE_MATCH_MUTATION,
};
use crate::scheduler::RefreshScheduler;
use crate::Result;
use std::sync::Arc;
use tictactoe_core::default_player_name;
use tracing::{info, warn};

/// Sends player actions for one session
pub struct MutationGateway {
    client: GameClient,
    scheduler: Arc<RefreshScheduler>,
    chain_id: String,
}

impl MutationGateway {
    /// Create new gateway
    pub fn new(client: GameClient, scheduler: Arc<RefreshScheduler>, chain_id: String) -> Self {
        Self {
            client,
            scheduler,
            chain_id,
        }
    }

    /// `name` when it is non-blank, otherwise the name derived from this
    /// session's chain
    pub fn effective_name(&self, name: Option<&str>) -> String {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => default_player_name(Some(&self.chain_id)),
        }
    }

    /// Open a match hosted by this chain
    pub async fn create_match(&self, host_name: Option<&str>) -> Result<String> {
        let name = self.effective_name(host_name);
        self.send("create_match", create_match_mutation(&name)).await
    }

    /// Join the match hosted on `host_chain_id`
    pub async fn join_match(&self, host_chain_id: &str, player_name: Option<&str>) -> Result<String> {
        let name = self.effective_name(player_name);
        self.send("join_match", join_match_mutation(host_chain_id, &name))
            .await
    }

    /// Mark a cell. Bounds and turn order are checked by the application.
    pub async fn make_move(&self, row: u8, col: u8) -> Result<String> {
        self.send("make_move", make_move_mutation(row, col)).await
    }

    /// Leave the current match
    pub async fn leave_match(&self) -> Result<String> {
        self.send("leave_match", LEAVE_MATCH_MUTATION.to_string())
            .await
    }

    async fn send(&self, action: &'static str, document: String) -> Result<String> {
        let reply = match self.client.mutate(&document).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(event = "mutation_failed", action = action, error = %e, "Mutation rejected");
                return Err(e);
            }
        };
        info!(event = "mutation_applied", action = action, chain_id = %self.chain_id, reply = %reply, "Mutation applied");
        self.scheduler.refresh().await;
        Ok(reply)
    }
}
