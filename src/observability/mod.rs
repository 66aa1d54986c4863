//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (service, error, interval)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout / journald)
//! ```
//!
//! # Design Decisions
//! - Structured fields, not interpolated strings, for anything queried later
//! - `RUST_LOG` overrides the configured level

pub mod logging;

pub use logging::init_logging;
