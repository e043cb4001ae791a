// for error definitions
use std::sync::Arc;

use redis;
use thiserror::Error;
use tracing::warn;

/// Errors surfaced by the resilient cache client.
///
/// Only the client itself returns these; the config cache and the rate
/// limiter absorb them, report them to their [`ErrorSink`], and substitute
/// the documented degraded value.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Operation attempted before connect() succeeded or after disconnect()
    #[error("Cache client not connected")]
    NotConnected,

    /// Transient transport failure (refused, timeout, reset, name resolution)
    #[error("Recoverable network error: {0}")]
    Network(String),

    /// Backend reported a transient busy/loading/migrating state
    #[error("Recoverable backend-busy error: {0}")]
    BackendBusy(String),

    /// Any other backend-reported failure, propagated without retry
    #[error("Permanent backend error: {0}")]
    Backend(String),

    /// Synthesized when the retry loop ends without success or a final error
    #[error("Cache operation retries exhausted")]
    RetriesExhausted,

    /// Document or counter encode/decode errors
    #[error("Data serialization error: {0}")]
    Serialization(String),
}

impl CacheError {
    /// Whether the retry loop may attempt this operation again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CacheError::Network(_) | CacheError::BackendBusy(_))
    }
}

// Implement conversions from redis::RedisError to CacheError
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::IoError => {
                // Connection refused/reset, timeouts and DNS failures all
                // surface as io-level errors
                CacheError::Network(err.to_string())
            }
            redis::ErrorKind::BusyLoadingError | redis::ErrorKind::TryAgain => {
                CacheError::BackendBusy(err.to_string())
            }
            // BUSY (blocking script/command in progress) has no dedicated
            // kind and is matched by its reply code
            _ if err.code() == Some("BUSY") => CacheError::BackendBusy(err.to_string()),
            _ => {
                // Command/operation related errors
                CacheError::Backend(err.to_string())
            }
        }
    }
}

// implement conversions from serde_json::Error to CacheError
impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

/// Errors surfaced by a persistent store implementation.
///
/// These are never absorbed: the storage coordinator propagates them to the
/// caller unmodified.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record exists for the tenant
    #[error("Tenant not found: {0}")]
    NotFound(String),

    /// Store-specific backend failure
    #[error("Persistent store error: {0}")]
    Backend(String),
}

/// Receiver for cache-layer failures that the components absorb.
///
/// Implementations are called on the request path and must not panic.
pub trait ErrorSink: Send + Sync {
    fn report(&self, err: &CacheError);
}

// plain closures work as sinks
impl<F> ErrorSink for F
where
    F: Fn(&CacheError) + Send + Sync,
{
    fn report(&self, err: &CacheError) {
        self(err)
    }
}

/// Default sink: emits a structured warning to the operational log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, err: &CacheError) {
        warn!(error = %err, "cache backend failure absorbed");
    }
}

/// The sink every component starts with.
pub fn default_sink() -> Arc<dyn ErrorSink> {
    Arc::new(LogSink)
}

// result aliases for the two error families
pub type CacheResult<T> = std::result::Result<T, CacheError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
