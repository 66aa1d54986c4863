//! Region controller collaborators.
//!
//! # Data Flow
//! ```text
//! RackExternalService tick
//!     → client.rs (four facet requests keyed by system_id)
//!     → client.rs ConnectionRegistry (current event-loop → Connection map)
//!     → selector.rs (one upstream address per region identity)
//! ```
//!
//! # Design Decisions
//! - The transport is behind traits; the reconcile loop never sees HTTP
//! - Connections are read fresh on every tick, never cached by callers
//! - Failure kinds the loop must tell apart are distinct `RpcError` variants

pub mod client;
pub mod http;
pub mod selector;
pub mod types;

pub use client::{ConnectionRegistry, RegionClient, RpcError};
pub use http::HttpRegionClient;
pub use selector::region_ips;
pub use types::{Connection, ConnectionSet, ControllerType, DnsSettings, ProxySettings, TimeSettings};
