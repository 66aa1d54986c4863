//! Rack time service.
//!
//! # Responsibilities
//! - Derive reference/peer servers from the snapshot
//! - Write them to the time daemon's configuration
//! - Restart the daemon (it cannot reload server lists)

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::region::types::ControllerType;
use crate::services::{RackService, ServiceError, NTP_SERVICE};
use crate::snapshot::Snapshot;
use crate::supervisor::ServiceSupervisor;

/// Writes time service configuration.
pub trait TimeWriter: Send + Sync {
    fn configure(&self, references: &[String], peers: &[String]) -> std::io::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NtpConfiguration {
    pub references: BTreeSet<String>,
    pub peers: BTreeSet<String>,
    pub controller: ControllerType,
}

pub struct RackNtp {
    writer: Arc<dyn TimeWriter>,
    supervisor: Arc<dyn ServiceSupervisor>,
}

impl RackNtp {
    pub fn new(writer: Arc<dyn TimeWriter>, supervisor: Arc<dyn ServiceSupervisor>) -> Self {
        Self { writer, supervisor }
    }
}

#[async_trait]
impl RackService for RackNtp {
    type Configuration = NtpConfiguration;

    fn name(&self) -> &'static str {
        "NTP"
    }

    fn derive_configuration(&self, snapshot: &Snapshot) -> NtpConfiguration {
        NtpConfiguration {
            references: snapshot.ntp_servers.clone(),
            peers: snapshot.ntp_peers.clone(),
            controller: snapshot.controller,
        }
    }

    async fn apply(&self, configuration: &NtpConfiguration) -> Result<(), ServiceError> {
        if !configuration.controller.is_rack_only() {
            tracing::debug!(service = NTP_SERVICE, "Not a rack-only controller; leaving time service alone");
            return Ok(());
        }

        let references: Vec<String> = configuration.references.iter().cloned().collect();
        let peers: Vec<String> = configuration.peers.iter().cloned().collect();
        let writer = self.writer.clone();
        let supervisor = self.supervisor.clone();

        tokio::task::spawn_blocking(move || -> Result<(), ServiceError> {
            writer.configure(&references, &peers)?;
            supervisor.restart_service(NTP_SERVICE)?;
            Ok(())
        })
        .await??;

        tracing::info!(
            references = configuration.references.len(),
            peers = configuration.peers.len(),
            "Time service reconfigured"
        );
        Ok(())
    }
}
