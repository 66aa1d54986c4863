//! Rack controller external services agent.
//!
//! Keeps a rack's time, DNS and proxy services in line with the
//! configuration held by its region controllers.

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod reconcile;
pub mod region;
pub mod resilience;
pub mod services;
pub mod snapshot;
pub mod supervisor;

pub use config::AgentConfig;
pub use lifecycle::Shutdown;
pub use reconcile::RackExternalService;
