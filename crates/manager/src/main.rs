//! Hydra head manager CLI.
//!
//! Thin command layer over the head-client stack: loads a JSON head
//! description, connects to each participant's node and drives the head
//! lifecycle. Funded commits and the L1 close/fanout builders need a
//! signing wallet and chain access, so they stay behind the library seams;
//! this binary covers the protocol path.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use head_client::{HeadOrchestrator, HeadStatus, ParticipantCommit};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::ManagerConfig;

/// How long to wait for the coordinator's node to report a head status
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Hydra head lifecycle manager
#[derive(Parser, Debug)]
#[command(name = "hydra-manager")]
#[command(about = "Drive a Hydra head through init, commit, close and fanout", long_about = None)]
struct Args {
    /// Head description file (JSON)
    #[arg(long, default_value = "head.json")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the head's current status
    Status {
        /// Keep following status changes
        #[arg(long)]
        watch: bool,
    },
    /// Initialize the head (requires status Idle)
    Init,
    /// Submit an empty commit for a participant.
    ///
    /// A funded commit needs the participant's signing key and goes through
    /// the library; an empty commit needs no witness.
    Commit {
        #[arg(long)]
        participant: String,
    },
    /// Close the head, starting the contestation period
    Close,
    /// Fan the final utxo set back out to L1
    Fanout,
    /// Print the head's latest confirmed utxo set
    Utxo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ManagerConfig::load(&args.config)?;
    let head = HeadOrchestrator::new(&config.head)?;
    head.connect();
    await_head_status(&head).await?;

    let result = run(&args.command, &head).await;
    head.disconnect();
    result
}

async fn run(command: &Command, head: &HeadOrchestrator) -> Result<()> {
    match command {
        Command::Status { watch } => {
            println!("{} {:?}", timestamp(), head.status());
            if !*watch {
                return Ok(());
            }
            let mut changes = head.status_watch();
            loop {
                changes.changed().await.context("coordinator client stopped")?;
                let status = *changes.borrow_and_update();
                println!("{} {status:?}", timestamp());
            }
        }
        Command::Init => {
            head.init().await.context("initializing the head")?;
            tracing::info!("head is initializing, waiting for commits");
            Ok(())
        }
        Command::Commit { participant } => {
            let commit = ParticipantCommit {
                participant: participant.clone(),
                utxos: Vec::new(),
                wallet: None,
            };
            head.commit(&commit).await?;
            tracing::info!(participant = %participant, "empty commit submitted");
            Ok(())
        }
        Command::Close => {
            head.close().await.context("closing the head")?;
            tracing::info!("head closed, contestation period running");
            Ok(())
        }
        Command::Fanout => {
            head.fanout().await.context("fanning out the head")?;
            tracing::info!("head finalized");
            Ok(())
        }
        Command::Utxo => {
            let utxos = head.coordinator().snapshot_utxo().await?;
            println!("{}", serde_json::to_string_pretty(&utxos)?);
            Ok(())
        }
    }
}

/// Wait until the coordinator's node has reported an actual head status
async fn await_head_status(head: &HeadOrchestrator) -> Result<()> {
    let mut watch = head.status_watch();
    tokio::time::timeout(CONNECT_TIMEOUT, async {
        loop {
            let status = *watch.borrow_and_update();
            if !matches!(
                status,
                HeadStatus::Disconnected | HeadStatus::Connecting | HeadStatus::Connected
            ) {
                return Ok(());
            }
            watch
                .changed()
                .await
                .context("coordinator client stopped")?;
        }
    })
    .await
    .context("timed out waiting for the coordinator node")?
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
