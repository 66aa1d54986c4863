//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the region client (also the connection registry)
//! - Build the supervisor and file-backed writers
//! - Assemble the reconcile loop with the three rack services

use std::sync::Arc;

use thiserror::Error;

use crate::config::AgentConfig;
use crate::reconcile::{Intervals, RackExternalService};
use crate::region::{HttpRegionClient, RpcError};
use crate::services::files::{FileDnsWriter, FileProxyWriter, FileTimeWriter};
use crate::services::rack_services;
use crate::supervisor::SystemdSupervisor;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("region client: {0}")]
    Region(#[from] RpcError),
}

/// Wire the production collaborators into a ready-to-run loop.
pub fn build_service(config: &AgentConfig) -> Result<RackExternalService, StartupError> {
    let region = Arc::new(HttpRegionClient::new(&config.region)?);
    let supervisor = Arc::new(SystemdSupervisor::new(&config.supervisor));

    let services = rack_services(
        Arc::new(FileTimeWriter::new(&config.ntp)),
        Arc::new(FileDnsWriter::new(&config.dns)),
        Arc::new(FileProxyWriter::new(&config.proxy)),
        supervisor,
    );

    tracing::info!(
        system_id = %config.agent.system_id,
        regions = config.region.endpoints.len(),
        restart_only = config.supervisor.restart_only,
        "Subsystems initialized"
    );

    Ok(RackExternalService::new(
        config.agent.system_id.clone(),
        region.clone(),
        region,
        services,
        Intervals::from(&config.reconcile),
    ))
}
