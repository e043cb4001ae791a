// src/test_utils.rs

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::cache::{CacheBackend, ResilientCacheClient};
use crate::config::{
    CacheClientConfig, ConfigCacheConfig, RateLimitConfig, RetryPolicy, StorageOptions,
};
use crate::error::{CacheError, CacheResult, ErrorSink, StoreError, StoreResult};
use crate::limiter::DegradationPolicy;
use crate::storage::{ReadPolicy, WritePolicy};
use crate::store::{MemoryStore, PersistentStore};
use crate::tenant::TenantConfig;

/// Failure class a mock backend can be scripted to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedFailure {
    Network,
    BackendBusy,
    Permanent,
}

impl SimulatedFailure {
    fn into_error(self) -> CacheError {
        match self {
            SimulatedFailure::Network => {
                CacheError::Network("simulated connection refused".to_string())
            }
            SimulatedFailure::BackendBusy => {
                CacheError::BackendBusy("simulated loading state".to_string())
            }
            SimulatedFailure::Permanent => {
                CacheError::Backend("simulated wrong-type reply".to_string())
            }
        }
    }
}

/// Data operation observed by the mock backend
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Get(String),
    Set(String, String, Option<Duration>),
    Delete(String),
    Exists(String),
    Ping,
}

/// Mock implementation of the CacheBackend trait for testing.
///
/// Clones share state, so a test keeps one handle for scripting failures
/// and inspecting calls while the client owns another. Failures scripted
/// with [`fail_next`](Self::fail_next) are consumed one per operation
/// before the persistent [`fail_always`](Self::fail_always) mode applies.
#[derive(Debug, Clone, Default)]
pub struct MockCacheBackend {
    data: Arc<Mutex<HashMap<String, String>>>,
    expiry: Arc<Mutex<HashMap<String, Instant>>>,
    connected: Arc<AtomicBool>,
    failure_queue: Arc<Mutex<VecDeque<SimulatedFailure>>>,
    fail_all: Arc<Mutex<Option<SimulatedFailure>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a one-shot failure for the next operation.
    pub fn fail_next(&self, failure: SimulatedFailure) {
        self.failure_queue.lock().unwrap().push_back(failure);
    }

    /// Make every operation fail until cleared with None.
    pub fn fail_always(&self, failure: Option<SimulatedFailure>) {
        *self.fail_all.lock().unwrap() = failure;
    }

    /// Seed a raw value directly, bypassing the client.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    /// Every data operation observed so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of operations observed against the given key.
    pub fn calls_for(&self, key: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| match call {
                RecordedCall::Get(k)
                | RecordedCall::Set(k, _, _)
                | RecordedCall::Delete(k)
                | RecordedCall::Exists(k) => k == key,
                RecordedCall::Ping => false,
            })
            .count()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn ensure_connected(&self) -> CacheResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::NotConnected)
        }
    }

    fn next_failure(&self) -> Option<CacheError> {
        if let Some(failure) = self.failure_queue.lock().unwrap().pop_front() {
            return Some(failure.into_error());
        }
        self.fail_all
            .lock()
            .unwrap()
            .map(SimulatedFailure::into_error)
    }

    fn check_expiry(&self, key: &str) -> bool {
        let expiry = self.expiry.lock().unwrap();
        if let Some(instant) = expiry.get(key) {
            if instant > &Instant::now() {
                true
            } else {
                // Key is expired, should be removed
                drop(expiry);
                self.data.lock().unwrap().remove(key);
                self.expiry.lock().unwrap().remove(key);
                false
            }
        } else {
            true // No expiry set
        }
    }
}

#[async_trait]
impl CacheBackend for MockCacheBackend {
    async fn connect(&self) -> CacheResult<()> {
        if let Some(err) = self.next_failure() {
            return Err(err);
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.record(RecordedCall::Get(key.to_string()));
        self.ensure_connected()?;
        if let Some(err) = self.next_failure() {
            return Err(err);
        }

        if !self.check_expiry(key) {
            return Ok(None);
        }
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        self.record(RecordedCall::Set(
            key.to_string(),
            value.to_string(),
            ttl,
        ));
        self.ensure_connected()?;
        if let Some(err) = self.next_failure() {
            return Err(err);
        }

        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());

        match ttl {
            Some(ttl) => {
                self.expiry
                    .lock()
                    .unwrap()
                    .insert(key.to_string(), Instant::now() + ttl);
            }
            None => {
                self.expiry.lock().unwrap().remove(key);
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.record(RecordedCall::Delete(key.to_string()));
        self.ensure_connected()?;
        if let Some(err) = self.next_failure() {
            return Err(err);
        }

        self.data.lock().unwrap().remove(key);
        self.expiry.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.record(RecordedCall::Exists(key.to_string()));
        self.ensure_connected()?;
        if let Some(err) = self.next_failure() {
            return Err(err);
        }

        if !self.check_expiry(key) {
            return Ok(false);
        }
        Ok(self.data.lock().unwrap().contains_key(key))
    }

    async fn ping(&self) -> CacheResult<()> {
        self.record(RecordedCall::Ping);
        self.ensure_connected()?;
        if let Some(err) = self.next_failure() {
            return Err(err);
        }
        Ok(())
    }
}

/// Error sink that collects everything it receives
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    errors: Arc<Mutex<Vec<String>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Debug renderings of the reported errors, in order.
    pub fn reports(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, err: &CacheError) {
        self.errors.lock().unwrap().push(format!("{:?}", err));
    }
}

/// Persistent store wrapper that counts collaborator calls
#[derive(Debug, Clone, Default)]
pub struct CountingStore {
    inner: MemoryStore,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistentStore for CountingStore {
    async fn read(&self, tenant_id: &str) -> Option<TenantConfig> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(tenant_id).await
    }

    async fn write(&self, tenant_id: &str, config: &TenantConfig) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(tenant_id, config).await
    }

    async fn exists(&self, tenant_id: &str) -> bool {
        self.inner.exists(tenant_id).await
    }

    async fn delete(&self, tenant_id: &str) -> StoreResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(tenant_id).await
    }
}

/// Persistent store whose writes and deletes always fail
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

#[async_trait]
impl PersistentStore for FailingStore {
    async fn read(&self, _tenant_id: &str) -> Option<TenantConfig> {
        // structural read failures surface as absent per the store contract
        None
    }

    async fn write(&self, _tenant_id: &str, _config: &TenantConfig) -> StoreResult<()> {
        Err(StoreError::Backend("simulated store outage".to_string()))
    }

    async fn exists(&self, _tenant_id: &str) -> bool {
        false
    }

    async fn delete(&self, _tenant_id: &str) -> StoreResult<()> {
        Err(StoreError::Backend("simulated store outage".to_string()))
    }
}

/// Retry budget with short delays so retry tests finish quickly
pub fn fast_retry(max_retries: usize) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(100),
        use_jitter: false,
    }
}

/// Helper function to create a client over a shared mock backend
pub fn create_test_client(
    backend: MockCacheBackend,
    max_retries: usize,
) -> ResilientCacheClient<MockCacheBackend> {
    ResilientCacheClient::with_backend(backend, fast_retry(max_retries))
}

/// Helper function to create a connected client over a fresh mock backend
pub async fn connected_client(
    max_retries: usize,
) -> (MockCacheBackend, Arc<ResilientCacheClient<MockCacheBackend>>) {
    let backend = MockCacheBackend::new();
    let client = create_test_client(backend.clone(), max_retries);
    client.connect().await.unwrap();
    (backend, Arc::new(client))
}

/// Coordinator options for tests; the cache section is ignored whenever a
/// mock-backed client is injected
pub fn test_options(max_requests: u64, degradation: DegradationPolicy) -> StorageOptions {
    StorageOptions {
        cache: CacheClientConfig::new("redis://127.0.0.1:6379"),
        rate_limit: RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
            degradation,
        },
        config_cache: ConfigCacheConfig::default(),
        read_policy: ReadPolicy::default(),
        write_policy: WritePolicy::default(),
    }
}
