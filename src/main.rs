//! Rack external services agent.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                RACK EXTERNAL SERVICES                │
//!                 │                                                      │
//!   Region  ◀─────┼── region client ◀── reconcile loop (fast/slow timer)  │
//!   controllers   │        │                   │                         │
//!                 │        ▼                   ▼                         │
//!                 │   connections ──────▶  Snapshot                      │
//!                 │                            │                         │
//!                 │              ┌─────────────┼─────────────┐           │
//!                 │              ▼             ▼             ▼           │
//!                 │            NTP            DNS          proxy         │
//!                 │              │             │             │           │
//!                 │              └──── writers + supervisor ─┘           │
//!                 │                            │                         │
//!                 └────────────────────────────┼─────────────────────────┘
//!                                              ▼
//!                                        OS services
//! ```

use std::path::PathBuf;

use clap::Parser;

use rack_external::config::load_config;
use rack_external::lifecycle::{build_service, signals, Shutdown};
use rack_external::observability::init_logging;

#[derive(Parser)]
#[command(name = "rack-external")]
#[command(about = "Keeps rack time, DNS and proxy services in sync with the region", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "/etc/rack-external/agent.toml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    if cli.check {
        println!("{}: configuration OK", cli.config.display());
        return Ok(());
    }

    init_logging(&config.observability);
    tracing::info!(config = %cli.config.display(), "rack-external v0.1.0 starting");

    let service = build_service(&config)?;

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(service.run(shutdown.subscribe()));

    let signal = signals::wait_for_shutdown_signal().await?;
    tracing::info!(signal, "Shutdown signal received, waiting for in-flight tick");
    shutdown.trigger();

    if let Err(e) = handle.await {
        tracing::error!(error = %e, "Reconcile loop ended abnormally");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
