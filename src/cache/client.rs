// src/cache/client.rs

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::backend::{CacheBackend, RedisBackend};
use crate::cache::backoff::Backoff;
use crate::cache_op;
use crate::config::{CacheClientConfig, RetryPolicy};
use crate::error::{default_sink, CacheError, CacheResult, ErrorSink};

/// Single point of contact with the cache backend.
///
/// Hides transient-failure noise from callers: recoverable errors (network
/// and backend-busy) are retried with exponential backoff up to the
/// configured budget, everything else propagates immediately. The last
/// attempt's error propagates unchanged; callers never see a retried-away
/// transient.
pub struct ResilientCacheClient<B: CacheBackend = RedisBackend> {
    /// Transport to the cache backend
    backend: B,

    /// Retry budget applied to every data operation
    retry: RetryPolicy,

    /// Receives one report per underlying backend error event
    error_sink: Arc<dyn ErrorSink>,
}

// Manually implement Debug
impl<B: CacheBackend> fmt::Debug for ResilientCacheClient<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientCacheClient")
            .field("backend", &self.backend)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ResilientCacheClient<RedisBackend> {
    /// Creates a client over the Redis backend described by the
    /// configuration; nothing connects until [`connect`](Self::connect).
    pub fn new(config: CacheClientConfig) -> Self {
        let retry = config.retry.clone();
        Self::with_backend(RedisBackend::new(config), retry)
    }
}

impl<B: CacheBackend> ResilientCacheClient<B> {
    /// Creates a client over an arbitrary backend.
    pub fn with_backend(backend: B, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            error_sink: default_sink(),
        }
    }

    /// Replace the connection-level error sink.
    ///
    /// The sink is invoked once per underlying backend error event,
    /// independent of whether the retry loop ultimately succeeds; it must
    /// not panic.
    pub fn set_error_handler(&mut self, sink: Arc<dyn ErrorSink>) {
        self.error_sink = sink;
    }

    /// Establishes the connection; data operations fail as not connected
    /// until this succeeds.
    pub async fn connect(&self) -> CacheResult<()> {
        match self.backend.connect().await {
            Ok(()) => {
                debug!("cache client connected");
                Ok(())
            }
            Err(err) => {
                self.error_sink.report(&err);
                Err(err)
            }
        }
    }

    /// Drops the connection. In-flight retry loops abort with a
    /// not-connected error at their next attempt.
    pub async fn disconnect(&self) {
        self.backend.disconnect().await;
        debug!("cache client disconnected");
    }

    /// Whether the connection is currently established.
    pub async fn is_connected(&self) -> bool {
        self.backend.is_connected().await
    }

    /// Retrieves the value stored at `key`, or None when absent.
    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.run("get", key, || self.backend.get(key)).await
    }

    /// Stores `value` at `key`, optionally with a time-to-live.
    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        self.run("set", key, || self.backend.set(key, value, ttl))
            .await
    }

    /// Removes `key`; removing an absent key succeeds.
    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        self.run("delete", key, || self.backend.delete(key)).await
    }

    /// Whether `key` currently holds a value.
    pub async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.run("exists", key, || self.backend.exists(key)).await
    }

    /// Health probe round trip, retried like any data operation.
    pub async fn ping(&self) -> CacheResult<()> {
        self.run("ping", "", || self.backend.ping()).await
    }

    /// Runs one logical operation under the retry budget.
    ///
    /// Recoverable errors sleep out the backoff sequence between attempts;
    /// a non-recoverable error or the final attempt's error breaks the loop
    /// and propagates unchanged. With a zero-attempt budget the synthesized
    /// retries-exhausted error is returned without contacting the backend.
    async fn run<T, F, Fut>(&self, operation: &'static str, key: &str, f: F) -> CacheResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = CacheResult<T>>,
    {
        let started = Instant::now();
        let mut backoff = Backoff::new(self.retry.clone());
        let total_attempts = self.retry.max_retries;

        let mut result = Err(CacheError::RetriesExhausted);
        for attempt in 1..=total_attempts {
            match f().await {
                Ok(value) => {
                    result = Ok(value);
                    break;
                }
                Err(err) => {
                    self.error_sink.report(&err);

                    if !err.is_recoverable() || attempt == total_attempts {
                        result = Err(err);
                        break;
                    }

                    let delay = backoff.next_delay();
                    debug!(
                        operation = operation,
                        key = key,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying recoverable cache failure"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        cache_op!(operation, key, result, started.elapsed().as_millis() as u64);
        result
    }
}
