// src/limiter/mod.rs

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::{CacheBackend, RedisBackend, ResilientCacheClient};
use crate::config::RateLimitConfig;
use crate::error::{default_sink, CacheError, ErrorSink};
use crate::rate_limit_event;

#[cfg(test)]
mod tests;

const KEY_PREFIX: &str = "ratelimit";

/// Behavior when the counting backend is unavailable.
///
/// Applied uniformly across every limiter operation. The per-value methods
/// keep the failure-to-behavior mapping in one place: fail-open behaves as
/// though no requests have been made, fail-closed as though the tenant is
/// already over budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationPolicy {
    /// Admit when the backend cannot be consulted
    #[default]
    AllowOnFailure,

    /// Deny when the backend cannot be consulted
    DenyOnFailure,
}

impl DegradationPolicy {
    /// Count substituted for a failed read
    pub fn count_on_failure(&self, max_requests: u64) -> u64 {
        match self {
            DegradationPolicy::AllowOnFailure => 0,
            DegradationPolicy::DenyOnFailure => max_requests,
        }
    }

    /// Count substituted for a failed increment
    pub fn incremented_on_failure(&self, max_requests: u64) -> u64 {
        match self {
            DegradationPolicy::AllowOnFailure => 1,
            DegradationPolicy::DenyOnFailure => max_requests + 1,
        }
    }

    /// Admission decision substituted for a failed check
    pub fn allowed_on_failure(&self) -> bool {
        matches!(self, DegradationPolicy::AllowOnFailure)
    }

    /// Remaining budget substituted for a failed read
    pub fn remaining_on_failure(&self, max_requests: u64) -> u64 {
        match self {
            DegradationPolicy::AllowOnFailure => max_requests,
            DegradationPolicy::DenyOnFailure => 0,
        }
    }
}

/// Per-tenant admission control over a renewing window.
///
/// Each counted request stores the new count with TTL = the configured
/// window, so the window restarts on every write rather than sliding: a
/// tenant that keeps requesting just inside the window is never reset to
/// zero. Backend failures never propagate; every operation substitutes the
/// degraded value of the configured [`DegradationPolicy`] and reports the
/// failure to the error sink.
pub struct RateLimiter<B: CacheBackend = RedisBackend> {
    /// Shared resilient client
    client: Arc<ResilientCacheClient<B>>,

    /// Limit, window and degradation policy
    config: RateLimitConfig,

    /// Receives every absorbed failure
    error_sink: Arc<dyn ErrorSink>,
}

// Manually implement Clone; clones share the client and the sink
impl<B: CacheBackend> Clone for RateLimiter<B> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            config: self.config.clone(),
            error_sink: Arc::clone(&self.error_sink),
        }
    }
}

impl<B: CacheBackend> RateLimiter<B> {
    /// Creates a limiter over the shared client.
    pub fn new(client: Arc<ResilientCacheClient<B>>, config: RateLimitConfig) -> Self {
        Self {
            client,
            config,
            error_sink: default_sink(),
        }
    }

    /// Replace the error sink invoked on absorbed failures.
    pub fn set_error_handler(&mut self, sink: Arc<dyn ErrorSink>) {
        self.error_sink = sink;
    }

    /// Limit, window and degradation policy in effect.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn build_key(tenant_id: &str) -> String {
        format!("{}:{}", KEY_PREFIX, tenant_id)
    }

    /// Requests counted in the tenant's current window.
    ///
    /// A missing counter reads as zero; a backend failure or a corrupt
    /// counter substitutes the policy's count after reporting to the sink.
    pub async fn get_count(&self, tenant_id: &str) -> u64 {
        let key = Self::build_key(tenant_id);

        match self.client.get(&key).await {
            Ok(Some(text)) => match text.parse::<u64>() {
                Ok(count) => count,
                Err(_) => {
                    self.error_sink.report(&CacheError::Serialization(format!(
                        "rate counter for tenant {} is not an integer",
                        tenant_id
                    )));
                    self.config
                        .degradation
                        .count_on_failure(self.config.max_requests)
                }
            },
            Ok(None) => 0,
            Err(err) => {
                self.error_sink.report(&err);
                self.config
                    .degradation
                    .count_on_failure(self.config.max_requests)
            }
        }
    }

    /// Counts one request and returns the new count.
    ///
    /// The write stores count + 1 with TTL = the window, re-arming the
    /// window from this request. A failed write substitutes the policy's
    /// incremented count.
    pub async fn increment(&self, tenant_id: &str) -> u64 {
        let key = Self::build_key(tenant_id);
        let new_count = self.get_count(tenant_id).await + 1;

        match self
            .client
            .set(&key, &new_count.to_string(), Some(self.config.window))
            .await
        {
            Ok(()) => new_count,
            Err(err) => {
                self.error_sink.report(&err);
                self.config
                    .degradation
                    .incremented_on_failure(self.config.max_requests)
            }
        }
    }

    /// Whether the tenant is currently under its budget.
    pub async fn is_allowed(&self, tenant_id: &str) -> bool {
        let count = self.get_count(tenant_id).await;
        count < self.config.max_requests
    }

    /// Admission primitive: checks the budget and counts the request only
    /// when admitted.
    ///
    /// Not atomic against concurrent callers for the same tenant: two
    /// requests can both observe a count below the limit and both proceed,
    /// admitting max_requests + 1 in the worst case.
    pub async fn check_and_increment(&self, tenant_id: &str) -> bool {
        let current = self.get_count(tenant_id).await;
        let allowed = current < self.config.max_requests;

        let count = if allowed {
            self.increment(tenant_id).await
        } else {
            current
        };

        rate_limit_event!(tenant_id, allowed, count, self.config.max_requests);
        allowed
    }

    /// Requests left in the tenant's budget, never below zero.
    pub async fn get_remaining(&self, tenant_id: &str) -> u64 {
        let count = self.get_count(tenant_id).await;
        self.config.max_requests.saturating_sub(count)
    }

    /// Clears the tenant's counter. A failed reset is logged and dropped;
    /// the caller has no action to take on it.
    pub async fn reset(&self, tenant_id: &str) {
        let key = Self::build_key(tenant_id);

        if let Err(err) = self.client.delete(&key).await {
            warn!(
                tenant_id = tenant_id,
                error = %err,
                "failed to reset rate counter"
            );
        }
    }
}
