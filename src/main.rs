//! Avícola Monitor command line
//!
//! # Usage
//!
//! ```bash
//! # Generate a synthetic batch and print its report for day 30
//! simulation --seed 7 > lote.json
//! avicola-monitor report --dataset lote.json --batch lote-1 --date 2024-03-30
//!
//! # Load a dataset into the local store and watch it
//! avicola-monitor import --dataset lote.json
//! avicola-monitor watch --batch lote-1
//! ```
//!
//! # Environment Variables
//!
//! - `AVICOLA_CONFIG`: Path to the TOML configuration file
//! - `RUST_LOG`: Logging level (default: info)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use avicola_monitor::repository::{Dataset, InMemoryRepository, RecordRepository, SledRepository};
use avicola_monitor::{build_batch_report, GompertzCurve, Monitor, MonitorConfig};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "avicola-monitor")]
#[command(about = "Poultry house monitoring: growth, consumption, mortality and alerts")]
#[command(version)]
struct CliArgs {
    /// Configuration file (overrides AVICOLA_CONFIG and ./avicola.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Print the batch report as JSON
    Report {
        /// JSON dataset to read; the local store is used when omitted
        #[arg(long)]
        dataset: Option<PathBuf>,
        /// Batch identifier
        #[arg(long)]
        batch: String,
        /// Report day (YYYY-MM-DD), today by default
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Print the ideal weight curve
    Curve {
        /// First age in days
        #[arg(long, default_value = "1")]
        from: i64,
        /// Last age in days
        #[arg(long, default_value = "42")]
        to: i64,
    },

    /// Load a JSON dataset into the local store
    Import {
        #[arg(long)]
        dataset: PathBuf,
    },

    /// Refresh a batch from the local store until Ctrl+C
    Watch {
        #[arg(long)]
        batch: String,
    },

    /// Write the effective configuration as TOML
    InitConfig {
        #[arg(long, default_value = "avicola.toml")]
        output: PathBuf,
    },
}

// ============================================================================
// Commands
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    match path {
        Some(path) => MonitorConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(MonitorConfig::load()),
    }
}

fn open_store(config: &MonitorConfig) -> Result<SledRepository> {
    let path = &config.storage.path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    SledRepository::open(path).with_context(|| format!("Failed to open store {}", path.display()))
}

async fn run_report(
    config: &MonitorConfig,
    dataset: Option<PathBuf>,
    batch: &str,
    date: Option<NaiveDate>,
) -> Result<()> {
    let repo: Box<dyn RecordRepository> = match dataset {
        Some(path) => {
            let dataset = Dataset::from_json_file(&path)
                .with_context(|| format!("Failed to read dataset {}", path.display()))?;
            dataset.ensure_valid()?;
            Box::new(InMemoryRepository::new(dataset))
        }
        None => Box::new(open_store(config)?),
    };

    let as_of = date.unwrap_or_else(|| Local::now().date_naive());
    let report = build_batch_report(repo.as_ref(), batch, as_of, config)
        .await
        .with_context(|| format!("Failed to build report for batch {}", batch))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_curve(curve: &GompertzCurve, from: i64, to: i64) -> Result<()> {
    if from > to {
        anyhow::bail!("--from ({}) must not be after --to ({})", from, to);
    }
    let points: Vec<_> = curve.weight_curve(from, to).collect();
    println!("{}", serde_json::to_string_pretty(&points)?);
    Ok(())
}

fn run_import(config: &MonitorConfig, path: &Path) -> Result<()> {
    let dataset = Dataset::from_json_file(path)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    dataset.ensure_valid()?;

    let store = open_store(config)?;
    let stats = store.import(&dataset)?;
    info!(
        batches = stats.batches,
        records = stats.records,
        store = %config.storage.path.display(),
        "Import complete"
    );
    Ok(())
}

async fn run_watch(config: MonitorConfig, batch: String) -> Result<()> {
    let repo: Arc<dyn RecordRepository> = Arc::new(open_store(&config)?);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let monitor = Monitor::new(repo, batch, config, cancel_token);
    monitor
        .run(|outcome| {
            for alert in &outcome.new_alerts {
                println!("[{}] {}", alert.raised_at.format("%H:%M"), alert.message);
            }
        })
        .await;
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = load_config(args.config.as_deref())?;
    info!(farm = %config.farm.name, house = %config.farm.house, "Configuration loaded");

    match args.command {
        SubCommand::Report { dataset, batch, date } => run_report(&config, dataset, &batch, date).await,
        SubCommand::Curve { from, to } => run_curve(&config.growth_curve, from, to),
        SubCommand::Import { dataset } => run_import(&config, &dataset),
        SubCommand::Watch { batch } => run_watch(config, batch).await,
        SubCommand::InitConfig { output } => {
            config.save_to_file(&output)?;
            info!(path = %output.display(), "Configuration written");
            Ok(())
        }
    }
}
