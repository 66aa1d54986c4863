//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build region client, supervisor, writers
//!     → RackExternalService
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → loop stops scheduling ticks
//!     → in-flight tick finishes → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Shutdown never interrupts an apply that is already running

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_service, StartupError};
