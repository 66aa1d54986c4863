//! RPC collaborator interfaces consumed by the reconcile loop.

use async_trait::async_trait;
use thiserror::Error;

use crate::region::types::{ConnectionSet, ControllerType, DnsSettings, ProxySettings, TimeSettings};

/// Errors surfaced by a region RPC call.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The region does not (yet) know this node.
    #[error("node {0} is not known to the region")]
    NoSuchNode(String),

    /// No region controller is currently reachable.
    #[error("no RPC connections available")]
    NoConnectionsAvailable,

    /// The region answered with something we could not interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Anything else.
    #[error("unexpected RPC failure: {0}")]
    Unexpected(String),
}

/// Request/response calls against the region, keyed by this node's identity.
///
/// Implementations enforce their own per-call timeouts. The loop asks for
/// `controller_type` first on every tick.
#[async_trait]
pub trait RegionClient: Send + Sync {
    async fn controller_type(&self, system_id: &str) -> Result<ControllerType, RpcError>;

    async fn time_configuration(&self, system_id: &str) -> Result<TimeSettings, RpcError>;

    async fn dns_configuration(&self, system_id: &str) -> Result<DnsSettings, RpcError>;

    async fn proxy_configuration(&self, system_id: &str) -> Result<ProxySettings, RpcError>;
}

/// Source of the currently open region connections.
pub trait ConnectionRegistry: Send + Sync {
    fn connections(&self) -> ConnectionSet;
}
