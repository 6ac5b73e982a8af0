//! bucketsync daemon - one-way local-to-bucket mirror
//!
//! Loads a `key = value` configuration file, then either runs a single pass
//! (`--once` or no `sync_interval`) or keeps mirroring on a fixed interval
//! until SIGINT/SIGTERM.
//!
//! # Architecture
//!
//! The S3 adapter is wrapped in a `RetryingStore` for per-operation
//! deadlines, handed to a `SyncEngine`, and driven by a `SyncScheduler`.
//! Shutdown is signalled through a `CancellationToken`; in-flight passes
//! finish before the process exits.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bucketsync_core::config::Config;
use bucketsync_s3::S3ObjectStore;
use bucketsync_sync::{RetryPolicy, RetryingStore, SchedulerSummary, SyncEngine, SyncScheduler};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Command line
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "bucketsyncd",
    version,
    about = "Mirror a local directory tree into an S3 bucket"
)]
struct Cli {
    /// Path to the configuration file
    config: PathBuf,

    /// Run a single pass and exit, ignoring sync_interval
    #[arg(long)]
    once: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

/// Log directive used when `RUST_LOG` is unset
fn filter_directive(verbose: u8, config_level: &str) -> &str {
    match verbose {
        0 => config_level,
        1 => "debug",
        _ => "trace",
    }
}

fn init_tracing(cli: &Cli, config: &Config) {
    let directive = filter_directive(cli.verbose, &config.log_level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);
    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// Daemon
// ============================================================================

/// Wires the configured store, engine and scheduler together
struct Daemon {
    config: Config,
    one_shot: bool,
    shutdown: CancellationToken,
}

impl Daemon {
    fn new(config: Config, force_once: bool, shutdown: CancellationToken) -> Self {
        let one_shot = force_once || config.is_one_shot();
        Self {
            config,
            one_shot,
            shutdown,
        }
    }

    async fn run(&self) -> Result<SchedulerSummary> {
        let target = self
            .config
            .sync_target()
            .context("Invalid sync target")?;

        info!(
            local_dir = %self.config.local_dir.display(),
            bucket = %self.config.bucket_name,
            prefix = %self.config.prefix,
            region = %self.config.store.region,
            endpoint = ?self.config.store.endpoint_url,
            interval = ?self.config.sync_interval,
            one_shot = self.one_shot,
            "Starting bucketsync"
        );

        let s3 = Arc::new(S3ObjectStore::from_config(&self.config.store).await);
        let store = Arc::new(RetryingStore::new(s3, RetryPolicy::from_config(&self.config)));
        let engine = SyncEngine::new(store, Arc::new(target));

        let interval = if self.one_shot {
            None
        } else {
            self.config.sync_interval
        };
        let scheduler = SyncScheduler::new(Arc::new(engine), interval, self.shutdown.clone());

        scheduler.run().await.context("Sync failed")
    }
}

// ============================================================================
// Signal handling
// ============================================================================

/// Cancels `token` on SIGINT or SIGTERM
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    init_tracing(&cli, &config);
    info!(config_path = %cli.config.display(), "Loaded configuration");

    let shutdown_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown_token.clone()));

    let daemon = Daemon::new(config, cli.once, shutdown_token);

    match daemon.run().await {
        Ok(summary) => {
            let summary = serde_json::to_string(&summary).unwrap_or_default();
            info!(summary = %summary, "bucketsync shut down gracefully");
            Ok(())
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "bucketsync exiting with error");
            Err(e)
        }
    }
}
