// src/cache/config_cache.rs

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::backend::{CacheBackend, RedisBackend};
use crate::cache::client::ResilientCacheClient;
use crate::error::{default_sink, ErrorSink};
use crate::tenant::TenantConfig;

/// Entry lifetime applied when none is configured
pub const DEFAULT_CONFIG_TTL: Duration = Duration::from_secs(3600);

const KEY_PREFIX: &str = "config";

/// Cache of tenant configuration documents keyed by tenant id.
///
/// Purely a cache: a miss is a valid terminal outcome and the caller is
/// responsible for falling back to the persistent store. Backend failures
/// never propagate from here; a failed read is indistinguishable from a
/// miss and a failed write completes silently, with the failure reported to
/// the error sink either way.
pub struct ConfigCache<B: CacheBackend = RedisBackend> {
    /// Shared resilient client
    client: Arc<ResilientCacheClient<B>>,

    /// Lifetime stamped on every entry written
    ttl: Duration,

    /// Receives every absorbed failure
    error_sink: Arc<dyn ErrorSink>,
}

impl<B: CacheBackend> ConfigCache<B> {
    /// Creates a cache over the shared client.
    ///
    /// A TTL under one second is rejected with a logged warning and the
    /// default is used instead; an unset TTL takes the default silently.
    pub fn new(client: Arc<ResilientCacheClient<B>>, ttl: Option<Duration>) -> Self {
        let ttl = match ttl {
            Some(ttl) if ttl >= Duration::from_secs(1) => ttl,
            Some(invalid) => {
                warn!(
                    requested_ms = invalid.as_millis() as u64,
                    fallback_secs = DEFAULT_CONFIG_TTL.as_secs(),
                    "config cache TTL below one second, using default"
                );
                DEFAULT_CONFIG_TTL
            }
            None => DEFAULT_CONFIG_TTL,
        };

        Self {
            client,
            ttl,
            error_sink: default_sink(),
        }
    }

    /// Replace the error sink invoked on absorbed failures.
    pub fn set_error_handler(&mut self, sink: Arc<dyn ErrorSink>) {
        self.error_sink = sink;
    }

    /// Lifetime stamped on entries by [`set`](Self::set).
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn build_key(tenant_id: &str) -> String {
        format!("{}:{}", KEY_PREFIX, tenant_id)
    }

    /// Returns the cached document for the tenant, or None on a miss.
    ///
    /// A backend failure or a corrupt stored document also returns None
    /// after reporting to the sink.
    pub async fn get(&self, tenant_id: &str) -> Option<TenantConfig> {
        let key = Self::build_key(tenant_id);

        match self.client.get(&key).await {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(config) => {
                    debug!(tenant_id = tenant_id, "config cache hit");
                    Some(config)
                }
                Err(err) => {
                    self.error_sink.report(&err.into());
                    None
                }
            },
            Ok(None) => {
                debug!(tenant_id = tenant_id, "config cache miss");
                None
            }
            Err(err) => {
                self.error_sink.report(&err);
                None
            }
        }
    }

    /// Writes the document under its tenant's key, best effort.
    pub async fn set(&self, config: &TenantConfig) {
        let key = Self::build_key(&config.tenant_id);

        let text = match serde_json::to_string(config) {
            Ok(text) => text,
            Err(err) => {
                self.error_sink.report(&err.into());
                return;
            }
        };

        if let Err(err) = self.client.set(&key, &text, Some(self.ttl)).await {
            self.error_sink.report(&err);
        }
    }

    /// Removes the tenant's entry, best effort.
    pub async fn invalidate(&self, tenant_id: &str) {
        let key = Self::build_key(tenant_id);

        if let Err(err) = self.client.delete(&key).await {
            self.error_sink.report(&err);
        }
    }

    /// Whether an entry currently exists for the tenant.
    ///
    /// A backend failure reads as absent, reported to the sink.
    pub async fn exists(&self, tenant_id: &str) -> bool {
        let key = Self::build_key(tenant_id);

        match self.client.exists(&key).await {
            Ok(exists) => exists,
            Err(err) => {
                self.error_sink.report(&err);
                false
            }
        }
    }
}
