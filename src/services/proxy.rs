//! Rack HTTP proxy service.
//!
//! # Responsibilities
//! - Peer with the proxy on every connected region
//! - Turn the proxy off when disabled, hand it over when not rack-only
//! - Reload (or restart, where reload is unsupported) after writing config
//!
//! # Design Decisions
//! - Not rack-only means "managed by region", not "off": the region may run
//!   its own proxy on this host
//! - Peer URLs bracket IPv6 addresses

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::region::selector::region_ips;
use crate::region::types::ControllerType;
use crate::services::{RackService, ServiceError, PROXY_SERVICE};
use crate::snapshot::Snapshot;
use crate::supervisor::ServiceSupervisor;

/// Writes proxy configuration.
pub trait ProxyWriter: Send + Sync {
    fn write_config(
        &self,
        allowed_cidrs: &[String],
        peer_proxies: &[String],
        prefer_v4_proxy: bool,
        port: u16,
    ) -> std::io::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfiguration {
    pub enabled: bool,
    pub port: u16,
    pub allowed_cidrs: BTreeSet<String>,
    pub prefer_v4_proxy: bool,
    pub upstream_proxies: BTreeSet<String>,
    pub controller: ControllerType,
}

impl ProxyConfiguration {
    /// Sorted `http://<upstream>:<port>` peer URLs.
    pub fn peer_proxies(&self) -> Vec<String> {
        let mut peers: Vec<String> = self
            .upstream_proxies
            .iter()
            .map(|upstream| format!("http://{}:{}", upstream, self.port))
            .collect();
        peers.sort();
        peers
    }
}

pub struct RackProxy {
    writer: Arc<dyn ProxyWriter>,
    supervisor: Arc<dyn ServiceSupervisor>,
}

impl RackProxy {
    pub fn new(writer: Arc<dyn ProxyWriter>, supervisor: Arc<dyn ServiceSupervisor>) -> Self {
        Self { writer, supervisor }
    }
}

#[async_trait]
impl RackService for RackProxy {
    type Configuration = ProxyConfiguration;

    fn name(&self) -> &'static str {
        "proxy"
    }

    fn derive_configuration(&self, snapshot: &Snapshot) -> ProxyConfiguration {
        ProxyConfiguration {
            enabled: snapshot.proxy_enabled,
            port: snapshot.proxy_port,
            allowed_cidrs: snapshot.proxy_allowed_cidrs.clone(),
            prefer_v4_proxy: snapshot.prefer_v4_proxy,
            upstream_proxies: region_ips(&snapshot.connections, true).into_iter().collect(),
            controller: snapshot.controller,
        }
    }

    async fn apply(&self, configuration: &ProxyConfiguration) -> Result<(), ServiceError> {
        let configuration = configuration.clone();
        let writer = self.writer.clone();
        let supervisor = self.supervisor.clone();

        tokio::task::spawn_blocking(move || apply_blocking(&configuration, &*writer, &*supervisor)).await?
    }
}

fn apply_blocking(
    configuration: &ProxyConfiguration,
    writer: &dyn ProxyWriter,
    supervisor: &dyn ServiceSupervisor,
) -> Result<(), ServiceError> {
    if !configuration.controller.is_rack_only() {
        supervisor.any(PROXY_SERVICE, "managed by region");
        return Ok(());
    }

    if !configuration.enabled {
        supervisor.off(PROXY_SERVICE, "not enabled");
        supervisor.ensure_service(PROXY_SERVICE)?;
        tracing::info!("Proxy disabled");
        return Ok(());
    }

    let peers = configuration.peer_proxies();
    let allowed: Vec<String> = configuration.allowed_cidrs.iter().cloned().collect();
    writer.write_config(&allowed, &peers, configuration.prefer_v4_proxy, configuration.port)?;

    // A stopped unit cannot be reloaded; start it before picking up the new file.
    supervisor.on(PROXY_SERVICE);
    supervisor.ensure_service(PROXY_SERVICE)?;
    if supervisor.restart_only() {
        supervisor.restart_service(PROXY_SERVICE)?;
    } else {
        supervisor.reload_service(PROXY_SERVICE)?;
    }

    tracing::info!(port = configuration.port, peers = ?peers, "Proxy reconfigured");
    Ok(())
}
