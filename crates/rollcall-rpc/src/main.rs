//! Rollcall coordinator binary.

use anyhow::{Context, Result};
use clap::Parser;
use rollcall_coordinator::{run_master, BroadcastOutcome, Coordinator, MasterScript};
use rollcall_core::CoordinatorConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rollcall")]
#[command(about = "Bootstrap coordinator for a BFT ledger cluster", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of peers in the cluster
    #[arg(short = 'n', long)]
    peers: Option<u32>,

    /// Address to listen on
    #[arg(short, long)]
    listen: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Master script to run against registered workers
    #[arg(short, long)]
    script: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CoordinatorConfig::load(path)?,
        None => CoordinatorConfig::default(),
    };
    if let Some(peers) = cli.peers {
        config.peers = peers;
    }
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }
    config.validate()?;

    let log_level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();

    let script = cli
        .script
        .as_deref()
        .map(MasterScript::load)
        .transpose()?;

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    let coordinator = Arc::new(Coordinator::new(config)?);

    let master = script.map(|script| {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { run_master(&coordinator, &script).await })
    });

    tokio::select! {
        result = rollcall_rpc::serve(listener, coordinator) => Ok(result?),
        result = supervise_master(master) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}

/// Surface a failed master script; keep serving after a successful one.
async fn supervise_master(
    master: Option<JoinHandle<rollcall_core::Result<Vec<BroadcastOutcome>>>>,
) -> Result<()> {
    let Some(master) = master else {
        return std::future::pending().await;
    };
    let outcomes = master.await.context("master task panicked")??;
    info!(broadcasts = outcomes.len(), "Master script completed");
    std::future::pending().await
}
