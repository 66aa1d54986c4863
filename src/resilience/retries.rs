//! Blocking retry loop.
//!
//! # Responsibilities
//! - Re-run a fallible blocking operation a bounded number of times
//! - Sleep between attempts, doubling from the base delay up to the cap
//!
//! # Design Decisions
//! - Only for use on blocking worker threads (it sleeps the thread)
//! - The last error is returned once attempts are exhausted
//! - Each delay gets up to a tenth extra at random

use std::fmt::Display;
use std::time::Duration;

use rand::Rng;

use crate::config::DnsConfig;

/// Bounds for a retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Pause before retry number `retry` (1-based); nothing before the first attempt.
    pub fn delay_before(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let ceiling = self.max_delay_ms.max(self.base_delay_ms);
        let delay_ms = 1u64
            .checked_shl(retry - 1)
            .and_then(|factor| self.base_delay_ms.checked_mul(factor))
            .map_or(ceiling, |ms| ms.min(ceiling));

        let extra = rand::thread_rng().gen_range(0..=delay_ms / 10);
        Duration::from_millis(delay_ms + extra)
    }
}

impl From<&DnsConfig> for RetryPolicy {
    fn from(config: &DnsConfig) -> Self {
        Self {
            attempts: config.reload_attempts,
            base_delay_ms: config.reload_base_delay_ms,
            max_delay_ms: config.reload_max_delay_ms,
        }
    }
}

/// Run `op` until it succeeds or the policy's attempts are used up.
pub fn retry_blocking<T, E, F>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Result<T, E>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 >= attempts => return Err(e),
            Err(e) => {
                attempt += 1;
                let delay = policy.delay_before(attempt);
                tracing::warn!(
                    what,
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                std::thread::sleep(delay);
            }
        }
    }
}
