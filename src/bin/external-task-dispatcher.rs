//! # External Task Dispatcher
//!
//! Long-running worker: loads configuration, resolves the downstream credential,
//! then long-polls the engine until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use external_task_dispatcher::bootstrap::DispatcherBootstrap;
use external_task_dispatcher::config::ConfigManager;
use external_task_dispatcher::logging::init_structured_logging;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "external-task-dispatcher")]
#[command(about = "Dispatch workflow-engine external tasks to downstream HTTP services")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (TOML); defaults to config/dispatcher.toml when present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Load and validate configuration, print it sanitized, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_structured_logging();

    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ConfigManager::load().context("loading configuration")?,
    };

    let sanitized = manager.sanitized();
    info!(
        source = ?manager.source_file(),
        config = %sanitized,
        "Dispatcher configuration loaded"
    );

    if cli.check {
        println!("{}", serde_json::to_string_pretty(&sanitized)?);
        return Ok(());
    }

    let system = DispatcherBootstrap::bootstrap(manager.into_config())
        .await
        .context("bootstrapping dispatcher")?;

    let shutdown = system.shutdown_token();
    tokio::spawn(watch_for_shutdown(shutdown));

    info!("Dispatcher running... Press Ctrl+C to shutdown gracefully");
    system.run().await;
    info!("Dispatcher shutdown complete");

    Ok(())
}

async fn watch_for_shutdown(shutdown: CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, finishing current task before exit");
        }
        result = wait_for_sigterm() => {
            match result {
                Ok(()) => info!("Received SIGTERM, finishing current task before exit"),
                Err(e) => {
                    warn!("Error setting up SIGTERM handler: {}", e);
                    // fall back to Ctrl+C only
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
    }
    shutdown.cancel();
}

/// Wait for SIGTERM signal (for container deployments)
#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate())?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    std::future::pending::<()>().await;
    Ok(())
}
