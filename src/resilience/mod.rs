//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! blocking side effect (e.g. DNS reload)
//!     → retries.rs (bounded attempts, doubling delay with jitter)
//! ```
//!
//! # Design Decisions
//! - Network calls carry their own timeouts in the transport; nothing here
//!   wraps async work
//! - Retry bounds come from configuration

pub mod retries;

pub use retries::{retry_blocking, RetryPolicy};
