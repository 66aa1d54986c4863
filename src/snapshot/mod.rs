//! Configuration snapshot for one reconciliation tick.
//!
//! # Data Flow
//! ```text
//! controller type + time + dns + proxy facets + connection set
//!     → Snapshot::new (normalize collections into sets)
//!     → shared by reference with every service adapter
//!     → dropped when the tick ends
//! ```
//!
//! # Design Decisions
//! - Immutable once built; adapters only ever see `&Snapshot`
//! - Collections become ordered sets so equality ignores order and duplicates

use std::collections::BTreeSet;

use crate::region::types::{ConnectionSet, ControllerType, DnsSettings, ProxySettings, TimeSettings};

/// Everything fetched from the region in one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub controller: ControllerType,

    /// Reference time servers.
    pub ntp_servers: BTreeSet<String>,
    /// Peer time servers.
    pub ntp_peers: BTreeSet<String>,

    pub trusted_networks: BTreeSet<String>,

    pub proxy_enabled: bool,
    pub proxy_port: u16,
    pub proxy_allowed_cidrs: BTreeSet<String>,
    pub prefer_v4_proxy: bool,

    /// Open region connections at fetch time.
    pub connections: ConnectionSet,
}

impl Snapshot {
    pub fn new(
        controller: ControllerType,
        time: TimeSettings,
        dns: DnsSettings,
        proxy: ProxySettings,
        connections: ConnectionSet,
    ) -> Self {
        Self {
            controller,
            ntp_servers: time.servers.into_iter().collect(),
            ntp_peers: time.peers.into_iter().collect(),
            trusted_networks: dns.trusted_networks.into_iter().collect(),
            proxy_enabled: proxy.enabled,
            proxy_port: proxy.port,
            proxy_allowed_cidrs: proxy.allowed_cidrs.into_iter().collect(),
            prefer_v4_proxy: proxy.prefer_v4_proxy,
            connections,
        }
    }

    /// True when no region controller is reachable.
    pub fn is_disconnected(&self) -> bool {
        self.connections.is_empty()
    }
}
