// src/config/mod.rs

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::limiter::DegradationPolicy;
use crate::storage::{ReadPolicy, WritePolicy};

/// Retry budget for cache operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per operation, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Delay before the first retry; doubles after each attempt
    #[serde(default = "default_base_delay", with = "duration_serde")]
    pub base_delay: Duration,

    /// Upper bound on a single backoff delay
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Whether to randomize each delay within [50%, 100%] of its value
    #[serde(default)]
    pub use_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            use_jitter: false,
        }
    }
}

fn default_max_retries() -> usize {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(5)
}

/// Configuration for the resilient cache client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheClientConfig {
    /// Cache backend connection URL
    pub url: String,

    /// Retry budget applied to every data operation
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Connection establishment timeout
    #[serde(default = "default_conn_timeout", with = "duration_serde")]
    pub connection_timeout: Duration,
}

impl CacheClientConfig {
    /// Config for the given URL with default retry budget and timeout.
    pub fn new(url: impl Into<String>) -> Self {
        CacheClientConfig {
            url: url.into(),
            retry: RetryPolicy::default(),
            connection_timeout: default_conn_timeout(),
        }
    }
}

fn default_conn_timeout() -> Duration {
    Duration::from_secs(2)
}

/// Configuration for the per-tenant rate limiter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum number of requests allowed in the window
    pub max_requests: u64,

    /// Window duration; also the TTL re-armed on every counted request
    #[serde(with = "duration_serde")]
    pub window: Duration,

    /// Behavior when the counting backend is unavailable
    #[serde(default)]
    pub degradation: DegradationPolicy,
}

/// Configuration for the tenant configuration cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigCacheConfig {
    /// Entry TTL; unset falls back to the cache's one-hour default
    #[serde(default, with = "opt_duration_serde")]
    pub ttl: Option<Duration>,
}

/// Composition options for the storage coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageOptions {
    /// Shared cache client settings
    pub cache: CacheClientConfig,

    /// Rate limiter settings
    pub rate_limit: RateLimitConfig,

    /// Config cache settings
    #[serde(default)]
    pub config_cache: ConfigCacheConfig,

    /// How reads consult the cache
    #[serde(default)]
    pub read_policy: ReadPolicy,

    /// How writes propagate to the cache
    #[serde(default)]
    pub write_policy: WritePolicy,
}

// Helper module to serialize/deserialize Duration with serde
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Same helper for optional durations
mod opt_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
