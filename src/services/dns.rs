//! Rack DNS service.
//!
//! # Responsibilities
//! - Forward to one address per connected region
//! - Serve no zones; only the trusted networks may query
//! - Reload the name server, retrying while it settles
//!
//! # Design Decisions
//! - DNSSEC validation is left to the region; the rack passes answers through
//! - A node converted from region to rack gets its zones removed on first apply

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::region::selector::region_ips;
use crate::region::types::ControllerType;
use crate::services::{RackService, ServiceError, DNS_SERVICE};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnssecValidation {
    Auto,
    Yes,
    No,
}

impl DnssecValidation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DnssecValidation::Auto => "auto",
            DnssecValidation::Yes => "yes",
            DnssecValidation::No => "no",
        }
    }
}

/// Writes name server configuration and reloads it.
pub trait DnsWriter: Send + Sync {
    fn write_options(&self, upstream_dns: &[String], dnssec_validation: DnssecValidation) -> std::io::Result<()>;

    fn write_configuration(&self, zones: &[String], trusted_networks: &[String]) -> std::io::Result<()>;

    fn reload_with_retries(&self) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsConfiguration {
    pub upstream_dns: BTreeSet<String>,
    pub trusted_networks: BTreeSet<String>,
    pub controller: ControllerType,
}

pub struct RackDns {
    writer: Arc<dyn DnsWriter>,
}

impl RackDns {
    pub fn new(writer: Arc<dyn DnsWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl RackService for RackDns {
    type Configuration = DnsConfiguration;

    fn name(&self) -> &'static str {
        "DNS"
    }

    fn derive_configuration(&self, snapshot: &Snapshot) -> DnsConfiguration {
        DnsConfiguration {
            upstream_dns: region_ips(&snapshot.connections, false).into_iter().collect(),
            trusted_networks: snapshot.trusted_networks.clone(),
            controller: snapshot.controller,
        }
    }

    async fn apply(&self, configuration: &DnsConfiguration) -> Result<(), ServiceError> {
        if !configuration.controller.is_rack_only() {
            tracing::debug!(service = DNS_SERVICE, "Not a rack-only controller; leaving DNS alone");
            return Ok(());
        }

        // BTreeSet iteration is already sorted.
        let upstream: Vec<String> = configuration.upstream_dns.iter().cloned().collect();
        let trusted: Vec<String> = configuration.trusted_networks.iter().cloned().collect();
        let writer = self.writer.clone();

        tokio::task::spawn_blocking(move || -> Result<(), ServiceError> {
            writer.write_options(&upstream, DnssecValidation::No)?;
            writer.write_configuration(&[], &trusted)?;
            writer.reload_with_retries()
        })
        .await??;

        tracing::info!(
            upstream = ?configuration.upstream_dns,
            trusted_networks = configuration.trusted_networks.len(),
            "DNS reconfigured"
        );
        Ok(())
    }
}
