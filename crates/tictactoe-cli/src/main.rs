//! Command-line client for Tic-Tac-Toe on Linera
//!
//! Every command except `name` bootstraps a session first: the stored
//! mnemonic is reused, a chain is claimed from the faucet, and the command
//! waits until the chain has caught up with the last height seen on this
//! device before showing any match state.

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tictactoe_core::{MatchOutcome, MoveAvailability};
use tictactoe_storage_sqlite::{MemoryStore, SqliteStore};
use tictactoe_sync::{ClientConfig, NodeBackend, SyncEngine};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "tictactoe")]
#[command(about = "Tic-Tac-Toe on Linera microchains", long_about = None)]
struct Cli {
    /// Application identifier (overrides LINERA_APPLICATION_ID)
    #[arg(long, global = true)]
    app_id: Option<String>,

    /// Faucet URL (overrides LINERA_FAUCET_URL)
    #[arg(long, global = true)]
    faucet: Option<String>,

    /// Node service URL (overrides LINERA_NODE_URL)
    #[arg(long, global = true)]
    node: Option<String>,

    /// Database file (overrides TICTACTOE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Keep mnemonic and sync height in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Seconds to wait for the chain to catch up
    #[arg(long, global = true, default_value = "60")]
    sync_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the current match until interrupted
    Watch,

    /// Print the current match and sync status
    Status,

    /// Open a match hosted by this chain
    Create {
        /// Display name (defaults to the stored name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Join a match hosted on another chain
    Join {
        /// Host chain identifier
        host_chain_id: String,

        /// Display name (defaults to the stored name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Mark a cell (row and column from 0 to 2)
    Move {
        row: u8,
        col: u8,

        /// Send even when the local view says the move is not available
        #[arg(long)]
        force: bool,
    },

    /// Leave the current match
    Leave,

    /// Show or set the stored player name
    Name {
        /// New name
        name: Option<String>,
    },
}

impl Cli {
    fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::from_env();
        if let Some(id) = &self.app_id {
            config.application_id = id.clone();
        }
        if let Some(url) = &self.faucet {
            config.endpoints.faucet_url = url.clone();
        }
        if let Some(url) = &self.node {
            config.endpoints.node_url = url.clone();
        }
        if let Some(path) = &self.db {
            config.database_path = path.clone();
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    config.endpoints.validate()?;
    let sync_timeout = Duration::from_secs(cli.sync_timeout);
    let engine = build_engine(config, cli.ephemeral)?;

    if let Commands::Name { name } = &cli.command {
        return run_name(&engine, name.as_deref());
    }

    connect(&engine, sync_timeout).await?;

    let result = match cli.command {
        Commands::Watch => run_watch(&engine).await,
        Commands::Status => {
            print_view(&engine);
            println!("{}", engine.summary());
            Ok(())
        }
        Commands::Create { name } => {
            let name = engine.effective_player_name(name.as_deref());
            let reply = engine.create_match(Some(&name)).await?;
            report(&engine, &reply);
            Ok(())
        }
        Commands::Join {
            host_chain_id,
            name,
        } => {
            let name = engine.effective_player_name(name.as_deref());
            let reply = engine.join_match(&host_chain_id, Some(&name)).await?;
            report(&engine, &reply);
            Ok(())
        }
        Commands::Move { row, col, force } => run_move(&engine, row, col, force).await,
        Commands::Leave => {
            let reply = engine.leave_match().await?;
            report(&engine, &reply);
            Ok(())
        }
        Commands::Name { .. } => Ok(()),
    };

    engine.shutdown();
    result
}

fn build_engine(config: ClientConfig, ephemeral: bool) -> anyhow::Result<SyncEngine> {
    let backend = Arc::new(NodeBackend::new(config.endpoints.clone()));
    if ephemeral {
        info!("Ephemeral session: nothing is written to disk");
        return Ok(SyncEngine::with_store(config, backend, Arc::new(MemoryStore::new())));
    }

    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;
    debug!(path = %config.database_path.display(), "Opened database");
    Ok(SyncEngine::with_store(config, backend, Arc::new(store)))
}

/// Bootstrap, start, and wait for the sync gate to open
async fn connect(engine: &SyncEngine, sync_timeout: Duration) -> anyhow::Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));

    let mut stage_rx = engine.view().init_stage.subscribe();
    let stage_task = {
        let spinner = spinner.clone();
        tokio::spawn(async move {
            while stage_rx.changed().await.is_ok() {
                let stage = *stage_rx.borrow_and_update();
                spinner.set_message(stage.name());
            }
        })
    };

    let result = engine.run().await;
    stage_task.abort();
    let identity = match result {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            spinner.finish_and_clear();
            anyhow::bail!("Another bootstrap is already running");
        }
        Err(e) => {
            let stage = engine.view().init_stage.get();
            if stage.is_failure() {
                spinner.abandon_with_message(stage.name());
            } else {
                spinner.finish_and_clear();
            }
            return Err(e.into());
        }
    };

    if !engine.is_unlocked() {
        spinner.set_message(format!(
            "Waiting for chain to reach height {}...",
            engine.sync_threshold().unwrap_or_default()
        ));
        let mut unlocked = engine.view().sync_unlocked.subscribe();
        let caught_up = tokio::time::timeout(sync_timeout, unlocked.wait_for(|u| *u)).await;
        if !matches!(caught_up, Ok(Ok(_))) {
            spinner.finish_and_clear();
            warn!(
                event = "sync_wait_timeout",
                threshold = engine.sync_threshold().unwrap_or_default(),
                cursor = engine.sync_cursor().unwrap_or_default(),
                "Chain did not catch up in time"
            );
            anyhow::bail!(
                "Chain did not reach height {} within {}s",
                engine.sync_threshold().unwrap_or_default(),
                sync_timeout.as_secs()
            );
        }
        engine.refresh().await;
    }

    spinner.finish_with_message(format!("Connected to chain {}", identity.chain_id));
    info!(owner = %identity.owner, application_id = %identity.application_id, "Session ready");
    Ok(())
}

async fn run_watch(engine: &SyncEngine) -> anyhow::Result<()> {
    let view = engine.view();
    let mut game_rx = view.game.subscribe();
    let mut note_rx = view.last_notification.subscribe();
    let mut height_rx = view.sync_height.subscribe();
    game_rx.mark_unchanged();
    note_rx.mark_unchanged();

    print_view(engine);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            changed = game_rx.changed() => {
                changed?;
                print_view(engine);
            }
            changed = note_rx.changed() => {
                changed?;
                let note = note_rx.borrow_and_update().clone();
                if let Some(note) = note {
                    println!(">> {}", note);
                }
            }
            changed = height_rx.changed() => {
                changed?;
                let height = *height_rx.borrow_and_update();
                debug!(height = ?height, "Sync height advanced");
            }
        }
    }
    Ok(())
}

async fn run_move(engine: &SyncEngine, row: u8, col: u8, force: bool) -> anyhow::Result<()> {
    let availability = engine.move_availability(row, col);
    if !availability.is_available() {
        let reason = match availability {
            MoveAvailability::Syncing => "still syncing",
            MoveAvailability::MatchNotActive => "no active match",
            MoveAvailability::NotYourTurn => "not your turn",
            MoveAvailability::CellOccupied => "cell is taken",
            MoveAvailability::OutOfBounds => "cell is off the board",
            MoveAvailability::Available => "available",
        };
        if !force {
            anyhow::bail!("Move ({}, {}) not available: {}", row, col, reason);
        }
        warn!(row = row, col = col, reason = reason, "Sending move anyway");
    }

    let reply = engine.make_move(row, col).await?;
    report(engine, &reply);
    Ok(())
}

fn run_name(engine: &SyncEngine, name: Option<&str>) -> anyhow::Result<()> {
    if let Some(name) = name {
        engine.set_player_name(name)?;
    }
    match engine.player_name() {
        Some(name) => println!("{}", name),
        None => println!("(no name set)"),
    }
    Ok(())
}

fn report(engine: &SyncEngine, reply: &str) {
    if !reply.is_empty() {
        println!(">> {}", reply);
    }
    print_view(engine);
}

fn print_view(engine: &SyncEngine) {
    let view = engine.view().snapshot();
    let me = view.chain_id.clone().unwrap_or_default();

    let Some(game) = &view.game else {
        if view.sync_unlocked {
            println!("No active match");
        } else {
            println!("Syncing...");
        }
        return;
    };

    let role = if view.is_host { "host" } else { "guest" };
    println!("Match {} ({}, you are {})", game.match_id, game.status, role);
    for player in &game.players {
        let marker = if player.chain_id == me { "*" } else { " " };
        println!(" {} {} [{}]", marker, player.name, player.chain_id);
    }
    println!();
    for line in game.board.render().lines() {
        println!("    {}", line);
    }
    println!();

    match engine.outcome() {
        MatchOutcome::Won => println!("You won!"),
        MatchOutcome::Lost => println!("You lost."),
        MatchOutcome::Draw => println!("Draw."),
        MatchOutcome::InProgress => match view.current_turn_chain_id.as_deref() {
            Some(turn) if turn == me => println!("Your move"),
            Some(_) => println!("Waiting for opponent"),
            None => println!("Waiting for a second player"),
        },
        MatchOutcome::NoMatch => {}
    }
}
