// src/storage/mod.rs

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheBackend, ConfigCache, RedisBackend, ResilientCacheClient};
use crate::config::StorageOptions;
use crate::error::{CacheResult, ErrorSink, StoreResult};
use crate::limiter::RateLimiter;
use crate::store::PersistentStore;
use crate::tenant::TenantConfig;

#[cfg(test)]
mod tests;

/// How reads consult the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPolicy {
    /// Cache-aside: serve hits from the cache, fall back to the store on miss
    #[default]
    CacheFirst,

    /// Bypass: read the store directly, still populating the cache, for
    /// environments that need always-fresh configuration
    StoreFirst,
}

/// How writes propagate to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Durable write first; the cache is populated only after it succeeds,
    /// so a failed write cannot leave the cache ahead of the store
    #[default]
    WriteThrough,
}

/// Single API for tenant-configuration persistence.
///
/// Composes the config cache and the rate limiter over one shared resilient
/// client, with the durable store behind the cache. Cache failures are
/// absorbed by the lower layers and never surface here; store failures
/// propagate unmodified, since they mean durable data is unavailable and
/// the calling request must fail.
pub struct StorageCoordinator<S: PersistentStore, B: CacheBackend = RedisBackend> {
    /// Durable source of truth
    store: S,

    /// Shared cache client
    client: Arc<ResilientCacheClient<B>>,

    /// Cache layered in front of the store
    config_cache: ConfigCache<B>,

    /// Admission control on the same client
    rate_limiter: RateLimiter<B>,

    read_policy: ReadPolicy,
    write_policy: WritePolicy,
}

impl<S: PersistentStore> StorageCoordinator<S, RedisBackend> {
    /// Coordinator over the Redis-backed cache described by the options.
    ///
    /// Nothing connects until [`connect`](Self::connect); a coordinator
    /// whose cache never comes up still serves reads from the store.
    pub fn new(store: S, options: StorageOptions) -> Self {
        let client = Arc::new(ResilientCacheClient::new(options.cache.clone()));
        Self::with_client(store, client, options)
    }
}

impl<S: PersistentStore, B: CacheBackend> StorageCoordinator<S, B> {
    /// Coordinator over an already-built client.
    ///
    /// The options' cache section is ignored here; the supplied client
    /// carries its own backend and retry budget.
    pub fn with_client(
        store: S,
        client: Arc<ResilientCacheClient<B>>,
        options: StorageOptions,
    ) -> Self {
        let config_cache = ConfigCache::new(Arc::clone(&client), options.config_cache.ttl);
        let rate_limiter = RateLimiter::new(Arc::clone(&client), options.rate_limit.clone());

        Self {
            store,
            client,
            config_cache,
            rate_limiter,
            read_policy: options.read_policy,
            write_policy: options.write_policy,
        }
    }

    /// Route both consumers' absorbed-failure reports into one sink.
    ///
    /// The client's connection-level sink is separate; replace it on the
    /// client before sharing.
    pub fn set_error_handler(&mut self, sink: Arc<dyn ErrorSink>) {
        self.config_cache.set_error_handler(Arc::clone(&sink));
        self.rate_limiter.set_error_handler(sink);
    }

    /// Brings up the shared cache connection.
    pub async fn connect(&self) -> CacheResult<()> {
        self.client.connect().await
    }

    /// Tears down the shared cache connection.
    pub async fn disconnect(&self) {
        self.client.disconnect().await
    }

    /// The rate limiter sharing this coordinator's client.
    pub fn rate_limiter(&self) -> &RateLimiter<B> {
        &self.rate_limiter
    }

    /// The config cache sharing this coordinator's client.
    pub fn config_cache(&self) -> &ConfigCache<B> {
        &self.config_cache
    }

    /// The shared resilient client.
    pub fn cache_client(&self) -> &Arc<ResilientCacheClient<B>> {
        &self.client
    }

    /// The durable store behind the cache.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads a tenant's configuration, cache first under
    /// [`ReadPolicy::CacheFirst`], store-only-but-populating under
    /// [`ReadPolicy::StoreFirst`]. None means the tenant has no record.
    pub async fn get_tenant_config(&self, tenant_id: &str) -> Option<TenantConfig> {
        if self.read_policy == ReadPolicy::CacheFirst {
            if let Some(config) = self.config_cache.get(tenant_id).await {
                return Some(config);
            }
        }

        let config = self.store.read(tenant_id).await?;

        // populate so the next read can hit the cache
        self.config_cache.set(&config).await;
        Some(config)
    }

    /// Persists a tenant's configuration and refreshes the cache.
    ///
    /// The durable write happens first and its failure propagates with the
    /// cache left untouched; populating ahead of a failed write would leave
    /// the two inconsistent.
    pub async fn save_tenant_config(&self, config: &TenantConfig) -> StoreResult<()> {
        match self.write_policy {
            WritePolicy::WriteThrough => self.store.write(&config.tenant_id, config).await?,
        }

        self.config_cache.set(config).await;
        Ok(())
    }

    /// Removes a tenant's configuration from the cache and the store.
    pub async fn delete_tenant_config(&self, tenant_id: &str) -> StoreResult<()> {
        self.config_cache.invalidate(tenant_id).await;
        self.store.delete(tenant_id).await
    }
}
