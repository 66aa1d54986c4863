//! OS service supervision.
//!
//! # Data Flow
//! ```text
//! adapter apply (blocking pool)
//!     → on / off(reason) / any(reason)   declare intent
//!     → ensure_service                   converge actual state to intent
//!     → restart_service / reload_service pick up new configuration
//! ```
//!
//! # Design Decisions
//! - Intent is recorded separately from convergence so callers can declare
//!   first and converge once
//! - `Any` means another authority owns the service; ensure leaves it alone
//! - All calls block; callers run them off the async runtime threads

pub mod systemd;

use thiserror::Error;

pub use systemd::SystemdSupervisor;

/// Declared state for a supervised service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedState {
    On,
    Off(String),
    /// Managed elsewhere; not our responsibility.
    Any(String),
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("{action} {unit} failed: {detail}")]
    Command {
        action: String,
        unit: String,
        detail: String,
    },

    #[error("failed to run service manager: {0}")]
    Io(#[from] std::io::Error),
}

/// Starts, stops, reloads or restarts named OS services.
pub trait ServiceSupervisor: Send + Sync {
    fn on(&self, service: &str);

    fn off(&self, service: &str, reason: &str);

    /// Mark the service as managed by someone else.
    fn any(&self, service: &str, reason: &str);

    fn ensure_service(&self, service: &str) -> Result<(), SupervisorError>;

    fn restart_service(&self, service: &str) -> Result<(), SupervisorError>;

    fn reload_service(&self, service: &str) -> Result<(), SupervisorError>;

    /// Whether this environment only supports restart, not reload.
    fn restart_only(&self) -> bool;
}
