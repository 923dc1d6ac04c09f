//! Session bootstrap
//!
//! Drives a session from nothing to an opened application handle, publishing
//! a stage label before each step. The caller builds the session from the
//! returned [`Bootstrapped`]; nothing here marks the view ready.

use crate::backend::{ApplicationHandle, ChainHandle, LedgerBackend};
use crate::config::ClientConfig;
use crate::ledger::HeightLedger;
use crate::status::{InitStage, SyncStatus};
use crate::view::ClientView;
use crate::{Error, Result};
use std::sync::Arc;
use tictactoe_core::{generate_mnemonic, Signer};
use tictactoe_storage_sqlite::{HeightStore, SettingsStore};
use tracing::{debug, error, info, warn};

/// Identity of an established session
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    /// Claimed chain
    pub chain_id: String,
    /// Normalized application identifier
    pub application_id: String,
    /// Owner derived from the mnemonic
    pub owner: String,
    signer: Arc<Signer>,
}

impl SessionIdentity {
    /// Signer for this session's chain
    pub fn signer(&self) -> &Signer {
        &self.signer
    }
}

/// Everything a bootstrap produced
pub struct Bootstrapped {
    /// Session identity
    pub identity: SessionIdentity,
    /// Opened chain
    pub chain: Arc<dyn ChainHandle>,
    /// Application on that chain
    pub application: Arc<dyn ApplicationHandle>,
    /// Height ledger loaded for the chain
    pub ledger: HeightLedger,
}

/// Runs the bootstrap sequence once
pub struct Bootstrapper {
    config: ClientConfig,
    backend: Arc<dyn LedgerBackend>,
    settings: Arc<dyn SettingsStore>,
    heights: Arc<dyn HeightStore>,
    view: Arc<ClientView>,
    status: SyncStatus,
}

impl Bootstrapper {
    /// Create new bootstrapper
    pub fn new(
        config: ClientConfig,
        backend: Arc<dyn LedgerBackend>,
        settings: Arc<dyn SettingsStore>,
        heights: Arc<dyn HeightStore>,
        view: Arc<ClientView>,
        status: SyncStatus,
    ) -> Self {
        Self {
            config,
            backend,
            settings,
            heights,
            view,
            status,
        }
    }

    /// Run every step. On failure the view carries the failure stage and
    /// message, and the returned error names the step that failed.
    pub async fn run(&self) -> Result<Bootstrapped> {
        self.view.reset_session();
        self.enter(InitStage::InitializingWallet);

        let application_id = self
            .config
            .validate()
            .map_err(|e| self.fail(InitStage::ConfigurationError, e))?;

        self.enter(InitStage::InitializingRuntime);
        if let Err(e) = self.backend.initialize().await {
            warn!(
                event = "runtime_initialize_warning",
                error = %e,
                "Runtime initialization reported an error; continuing"
            );
        }
        tokio::time::sleep(self.config.timing.init_grace()).await;

        self.enter(InitStage::PreparingMnemonic);
        let phrase = self.prepare_mnemonic()?;

        self.enter(InitStage::CreatingWallet);
        let signer = Signer::from_mnemonic(&phrase)
            .map_err(|e| self.fail_at(InitStage::CreatingWallet, e.into()))?;

        self.enter(InitStage::CreatingChain);
        let chain_id = self
            .backend
            .claim_chain(&signer)
            .await
            .map_err(|e| self.fail_at(InitStage::CreatingChain, e))?;
        info!(event = "chain_claimed", chain_id = %chain_id, owner = %signer.owner(), "Claimed chain");

        self.enter(InitStage::ConnectingApplication);
        let chain = self
            .backend
            .open_chain(&chain_id, &signer)
            .await
            .map_err(|e| self.fail_at(InitStage::ConnectingApplication, e))?;
        let application = chain
            .application(&application_id)
            .await
            .map_err(|e| self.fail_at(InitStage::ConnectingApplication, e))?;

        let ledger = HeightLedger::load(&chain_id, Arc::clone(&self.heights));
        debug!(chain_id = %chain_id, persisted = ?ledger.persisted(), "Loaded sync height");

        Ok(Bootstrapped {
            identity: SessionIdentity {
                chain_id,
                application_id,
                owner: signer.owner().to_string(),
                signer: Arc::new(signer),
            },
            chain,
            application,
            ledger,
        })
    }

    /// Stored mnemonic, or a new one persisted before it is used
    fn prepare_mnemonic(&self) -> Result<String> {
        let stored = match self.settings.load_mnemonic() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(event = "mnemonic_load_failed", error = %e, "Could not read stored mnemonic");
                None
            }
        };
        if let Some(phrase) = stored {
            debug!("Using stored mnemonic");
            return Ok(phrase);
        }

        let phrase = generate_mnemonic(Some(self.config.mnemonic_words)).map_err(|e| {
            self.fail(
                InitStage::MnemonicFailed,
                Error::connectivity(InitStage::PreparingMnemonic, format!("Failed to generate mnemonic: {}", e)),
            )
        })?;
        if let Err(e) = self.settings.save_mnemonic(&phrase) {
            warn!(event = "mnemonic_persist_failed", error = %e, "Generated mnemonic was not persisted");
        } else {
            info!(event = "mnemonic_generated", words = self.config.mnemonic_words, "Generated and stored new mnemonic");
        }
        Ok(phrase)
    }

    fn enter(&self, stage: InitStage) {
        debug!(stage = %stage, "Bootstrap stage");
        self.status.set_stage(stage);
        self.view.init_stage.set(stage);
    }

    /// Backend failure during `step`, published as the generic failure stage
    fn fail_at(&self, step: InitStage, e: Error) -> Error {
        self.fail(InitStage::Failed, Error::connectivity(step, e.detail()))
    }

    fn fail(&self, stage: InitStage, e: Error) -> Error {
        let message = e.detail();
        error!(event = "bootstrap_failed", stage = %stage, step = ?e.stage(), error = %message, "Bootstrap failed");
        self.status.set_stage(stage);
        self.view.init_error.set(Some(message));
        self.view.init_stage.set(stage);
        e
    }
}
