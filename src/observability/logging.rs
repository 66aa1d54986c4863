//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Resolve the log filter from environment or config
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Compact format for journald, pretty format for development

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Build the filter: `RUST_LOG` if set, else the configured directive.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(&config.log_level))
}

fn default_filter(level: &str) -> EnvFilter {
    // A bare level applies to this crate only; anything else is a full directive.
    let directive = if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("rack_external={}", level)
    };
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("rack_external=info"))
}

/// Install the global subscriber. Call once, early in `main`.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = env_filter(config);
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Compact => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
    }
}
