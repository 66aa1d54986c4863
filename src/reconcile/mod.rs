//! Reconciliation loop subsystem.
//!
//! # Data Flow
//! ```text
//! timer fires
//!     → external.rs fetch (controller type, time, dns, proxy, connections)
//!     → Snapshot
//!     → every ExternalService::reconcile, joined concurrently
//!     → cadence.rs (Fast if no connections, else Slow)
//!     → sleep for the cadence's interval
//! ```
//!
//! # Design Decisions
//! - Ticks never overlap; the interval runs from the end of one tick
//! - Fetch failures skip the services and force Fast cadence
//! - One service failing never stops the others

pub mod cadence;
pub mod external;

pub use cadence::{Cadence, Intervals};
pub use external::{FetchError, RackExternalService, TickReport};
