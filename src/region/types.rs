//! Payloads returned by the region controller and the connection model.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Role flags of this node as seen by the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub struct ControllerType {
    pub is_region: bool,
    pub is_rack: bool,
}

impl ControllerType {
    /// True only when this node runs purely as a rack controller.
    pub fn is_rack_only(&self) -> bool {
        self.is_rack && !self.is_region
    }
}

/// Time service parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeSettings {
    /// Reference time servers (addresses or hostnames).
    pub servers: Vec<String>,
    /// Peer time servers.
    pub peers: Vec<String>,
}

/// Name resolution parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DnsSettings {
    pub trusted_networks: Vec<String>,
}

/// Outbound proxy parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProxySettings {
    pub enabled: bool,
    pub port: u16,
    #[serde(default)]
    pub allowed_cidrs: Vec<String>,
    #[serde(default)]
    pub prefer_v4_proxy: bool,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8000,
            allowed_cidrs: Vec::new(),
            prefer_v4_proxy: false,
        }
    }
}

/// An open channel to one region controller process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Event-loop label, `<region-identity>:<instance>`.
    pub event_loop: String,
    /// Network address of the remote peer.
    pub address: SocketAddr,
}

impl Connection {
    pub fn new(event_loop: impl Into<String>, address: SocketAddr) -> Self {
        Self {
            event_loop: event_loop.into(),
            address,
        }
    }

    /// The region identity: the label up to its first `:`.
    pub fn region(&self) -> &str {
        self.event_loop
            .split_once(':')
            .map_or(self.event_loop.as_str(), |(region, _)| region)
    }
}

/// Event-loop label → connection.
///
/// Ordered so that equality and iteration never depend on insertion order.
pub type ConnectionSet = BTreeMap<String, Connection>;
