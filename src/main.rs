use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Map};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use neon::kernel::telemetry::TelemetryPipeline;
use neon::memory::{FrequencyStore, Snapshot};
use neon::{AgentError, NeonConfig, Reactor};

#[derive(Parser)]
#[command(name = "neon", about = "Console agent with mood, beliefs and policy rules")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base directory for the data/ tree (overrides the config file)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive conversation (default)
    Run,
    /// Write a snapshot of the current beliefs
    SnapshotSave {
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Read back and validate a snapshot file
    SnapshotRestore {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout belongs to the conversation.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => NeonConfig::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => NeonConfig::default(),
    };
    if let Some(root) = cli.root {
        config.root = root;
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::SnapshotSave { notes } => snapshot_save(&config, notes),
        Command::SnapshotRestore { file } => snapshot_restore(&file),
    }
}

async fn run(config: NeonConfig) -> anyhow::Result<()> {
    tracing::info!("NEON booting, root={}", config.root.display());

    let telemetry = Arc::new(TelemetryPipeline::start(config.telemetry()));
    let mut reactor = Reactor::new(config, telemetry.clone());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let result = reactor
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), cancel)
        .await;

    // State first, telemetry last: close is final.
    if let Err(AgentError::Cancelled) = &result {
        tracing::info!("interrupted, saving state");
        for line in reactor.persist() {
            eprintln!("{}", line);
        }
    }
    telemetry.close().await;

    match result {
        Ok(()) | Err(AgentError::Cancelled) => Ok(()),
        Err(e) => Err(e).context("agent error"),
    }
}

fn snapshot_save(config: &NeonConfig, notes: String) -> anyhow::Result<()> {
    let weights = FrequencyStore::new();
    weights
        .load(&config.weights_path())
        .context("failed to load weights")?;

    let mut identity = Map::new();
    identity.insert("id".to_string(), json!("NEON"));

    let path = Snapshot::new(identity, weights.weights(), notes)
        .save_in(&config.snapshots_dir())
        .context("snapshot save failed")?;
    println!("Snapshot saved to {}", path.display());
    Ok(())
}

fn snapshot_restore(file: &Path) -> anyhow::Result<()> {
    let snap = Snapshot::load(file).context("snapshot restore failed")?;
    println!(
        "Restored snapshot from {} (notes: {})",
        snap.timestamp.to_rfc3339(),
        snap.notes
    );
    Ok(())
}
