//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, slow >= fast)
//! - Check region endpoint labels and URLs
//! - Check every rack service has a unit to supervise
//! - Check the DNS reload retry bounds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::AgentConfig;
use crate::services::{DNS_SERVICE, NTP_SERVICE, PROXY_SERVICE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("agent.system_id must not be empty")]
    MissingSystemId,

    #[error("reconcile.fast_interval_secs must be greater than zero")]
    ZeroFastInterval,

    #[error("reconcile.slow_interval_secs ({slow}) must be >= fast_interval_secs ({fast})")]
    SlowFasterThanFast { fast: u64, slow: u64 },

    #[error("region.request_timeout_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("region endpoint '{0}' has no region identity before ':'")]
    BadEventLoop(String),

    #[error("region endpoint '{event_loop}' has invalid url '{url}'")]
    BadUrl { event_loop: String, url: String },

    #[error("supervisor.services has no unit for '{0}'")]
    MissingUnit(String),

    #[error("dns.reload_command must not be empty")]
    EmptyReloadCommand,

    #[error("dns.reload_attempts must be greater than zero")]
    ZeroReloadAttempts,

    #[error("dns.reload_max_delay_ms ({max}) must be >= reload_base_delay_ms ({base})")]
    ReloadDelayInverted { base: u64, max: u64 },
}

pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.agent.system_id.trim().is_empty() {
        errors.push(ValidationError::MissingSystemId);
    }

    let reconcile = &config.reconcile;
    if reconcile.fast_interval_secs == 0 {
        errors.push(ValidationError::ZeroFastInterval);
    }
    if reconcile.slow_interval_secs < reconcile.fast_interval_secs {
        errors.push(ValidationError::SlowFasterThanFast {
            fast: reconcile.fast_interval_secs,
            slow: reconcile.slow_interval_secs,
        });
    }

    if config.region.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    for endpoint in &config.region.endpoints {
        let region = endpoint.event_loop.split(':').next().unwrap_or_default();
        if region.is_empty() {
            errors.push(ValidationError::BadEventLoop(endpoint.event_loop.clone()));
        }
        if Url::parse(&endpoint.url).is_err() {
            errors.push(ValidationError::BadUrl {
                event_loop: endpoint.event_loop.clone(),
                url: endpoint.url.clone(),
            });
        }
    }

    for service in [NTP_SERVICE, DNS_SERVICE, PROXY_SERVICE] {
        if !config.supervisor.services.contains_key(service) {
            errors.push(ValidationError::MissingUnit(service.to_string()));
        }
    }

    if config.dns.reload_command.is_empty() {
        errors.push(ValidationError::EmptyReloadCommand);
    }
    if config.dns.reload_attempts == 0 {
        errors.push(ValidationError::ZeroReloadAttempts);
    }
    if config.dns.reload_max_delay_ms < config.dns.reload_base_delay_ms {
        errors.push(ValidationError::ReloadDelayInverted {
            base: config.dns.reload_base_delay_ms,
            max: config.dns.reload_max_delay_ms,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
