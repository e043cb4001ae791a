// src/cache/backoff.rs

use rand;
use std::time::Duration;

use crate::config::RetryPolicy;

/// Backoff delay sequence for a single operation's retry loop.
///
/// Scoped to one logical operation call and never persisted: the first delay
/// is `base_delay`, each subsequent delay doubles, and every delay is capped
/// at `max_delay`.
#[derive(Debug)]
pub struct Backoff {
    /// Number of delays handed out so far
    current_attempt: usize,
    /// Retry budget this sequence draws from
    policy: RetryPolicy,
}

impl Backoff {
    /// Create a new backoff sequence for the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            current_attempt: 0,
            policy,
        }
    }

    /// Get the delay to sleep before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        let exp = self.current_attempt as f64;
        self.current_attempt += 1;

        let base_ms = self.policy.base_delay.as_millis() as f64;
        let delay_ms = base_ms * 2f64.powf(exp);
        let max_ms = self.policy.max_delay.as_millis() as f64;
        let capped_ms = delay_ms.min(max_ms);

        let final_ms = if self.policy.use_jitter {
            // Add jitter: random value between 50% and 100% of the calculated delay
            let jitter = rand::random::<f64>() * 0.5 + 0.5;
            (capped_ms * jitter) as u64
        } else {
            capped_ms as u64
        };

        Duration::from_millis(final_ms)
    }
}
