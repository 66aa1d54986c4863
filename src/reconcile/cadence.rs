//! Polling cadence state machine.
//!
//! # States
//! - Fast: no region reachable (or fetch failed); poll often so DNS
//!   forwarders pick up a region as soon as one appears
//! - Slow: at least one region connected; most polls are no-ops
//!
//! # State Transitions
//! ```text
//! any → Fast: fetch failed, or snapshot has no connections
//! any → Slow: snapshot has at least one connection
//! ```

use std::fmt;
use std::time::Duration;

use crate::config::ReconcileConfig;
use crate::region::types::ConnectionSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cadence {
    #[default]
    Fast,
    Slow,
}

impl Cadence {
    pub fn for_connections(connections: &ConnectionSet) -> Self {
        if connections.is_empty() {
            Cadence::Fast
        } else {
            Cadence::Slow
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Fast => write!(f, "fast"),
            Cadence::Slow => write!(f, "slow"),
        }
    }
}

/// Interval per cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub fast: Duration,
    pub slow: Duration,
}

impl Intervals {
    pub fn interval(&self, cadence: Cadence) -> Duration {
        match cadence {
            Cadence::Fast => self.fast,
            Cadence::Slow => self.slow,
        }
    }
}

impl From<&ReconcileConfig> for Intervals {
    fn from(config: &ReconcileConfig) -> Self {
        Self {
            fast: Duration::from_secs(config.fast_interval_secs),
            slow: Duration::from_secs(config.slow_interval_secs),
        }
    }
}

impl Default for Intervals {
    fn default() -> Self {
        Self::from(&ReconcileConfig::default())
    }
}
