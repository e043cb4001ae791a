// src/cache/backend.rs

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheClientConfig;
use crate::error::{CacheError, CacheResult};

/// Transport seam between the resilient client and a key/value cache backend.
///
/// Every data operation must return [`CacheError::NotConnected`] when called
/// before `connect` has succeeded or after `disconnect`; implementations
/// classify their own failures into the [`CacheError`] taxonomy.
#[async_trait]
pub trait CacheBackend: Send + Sync + Debug {
    // Establishes the single logical connection
    async fn connect(&self) -> CacheResult<()>;

    // Drops the connection; subsequent data operations fail as not connected
    async fn disconnect(&self);

    // Whether a connection is currently established
    async fn is_connected(&self) -> bool;

    // Retrieves a value by key
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    // Stores a value, optionally with a time-to-live
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()>;

    // Removes a key; removing an absent key is not an error
    async fn delete(&self, key: &str) -> CacheResult<()>;

    // Checks if a key exists
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    // Round-trips a health probe
    async fn ping(&self) -> CacheResult<()>;
}

/// Redis implementation of the cache backend over a multiplexed connection.
pub struct RedisBackend {
    config: CacheClientConfig,
    connection: Arc<tokio::sync::RwLock<Option<ConnectionManager>>>,
}

// Manually implement Debug
impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend")
            .field("url", &self.config.url)
            .finish()
    }
}

// Manually implement Clone; clones share the connection slot
impl Clone for RedisBackend {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            connection: Arc::clone(&self.connection),
        }
    }
}

impl RedisBackend {
    /// Creates a backend for the configured URL without connecting yet.
    pub fn new(config: CacheClientConfig) -> Self {
        Self {
            config,
            connection: Arc::new(tokio::sync::RwLock::new(None)),
        }
    }

    /// Clones the connection handle for one attempt.
    ///
    /// The slot is read-locked only long enough to clone, so no lock is held
    /// across network I/O or backoff sleeps and a disconnect aborts an
    /// in-flight retry loop at its next attempt.
    async fn handle(&self) -> CacheResult<ConnectionManager> {
        match self.connection.read().await.as_ref() {
            Some(manager) => Ok(manager.clone()),
            None => Err(CacheError::NotConnected),
        }
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn connect(&self) -> CacheResult<()> {
        // Open the client - this doesn't actually connect to Redis yet
        let client = Client::open(self.config.url.as_str())?;

        // Create a connection manager with timeout
        let connection_future = ConnectionManager::new(client);

        // Apply the connection timeout using tokio::time::timeout
        let manager =
            match tokio::time::timeout(self.config.connection_timeout, connection_future).await {
                Ok(result) => result?,
                Err(_) => {
                    // Connection attempt timed out
                    return Err(CacheError::Network(format!(
                        "Connection to cache backend at {} timed out after {:?}",
                        self.config.url, self.config.connection_timeout
                    )));
                }
            };

        *self.connection.write().await = Some(manager);
        Ok(())
    }

    async fn disconnect(&self) {
        *self.connection.write().await = None;
    }

    async fn is_connected(&self) -> bool {
        self.connection.read().await.is_some()
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.handle().await?;
        let result: Option<String> = conn.get(key).await?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let mut conn = self.handle().await?;

        match ttl {
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, ttl.as_secs()).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.handle().await?;
        let _: i64 = conn.del(key).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.handle().await?;
        let result: bool = conn.exists(key).await?;
        Ok(result)
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.handle().await?;
        let result: String = redis::AsyncCommands::ping(&mut conn).await?;

        if result == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Backend(format!(
                "Unexpected response from PING: {}",
                result
            )))
        }
    }
}
