// library entry
pub mod cache;
pub mod config;
pub mod error;
pub mod limiter;
pub mod logging;
pub mod storage;
pub mod store;
pub mod tenant;

#[cfg(test)]
pub mod test_utils;

// Re-export key components for convenience
pub use cache::{CacheBackend, ConfigCache, RedisBackend, ResilientCacheClient};
pub use config::{
    CacheClientConfig, ConfigCacheConfig, RateLimitConfig, RetryPolicy, StorageOptions,
};
pub use error::{CacheError, CacheResult, ErrorSink, LogSink, StoreError, StoreResult};
pub use limiter::{DegradationPolicy, RateLimiter};
pub use logging::init as init_logging;
pub use storage::{ReadPolicy, StorageCoordinator, WritePolicy};
pub use store::{MemoryStore, PersistentStore};
pub use tenant::TenantConfig;
