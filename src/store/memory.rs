// src/store/memory.rs

// In-memory persistent store (for testing and lightweight usage)
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{StoreError, StoreResult};
use crate::store::PersistentStore;
use crate::tenant::TenantConfig;

/// In-memory persistent store implementation.
///
/// Clones share the same records, so a handle kept by a test or a demo
/// observes writes made through the coordinator.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, TenantConfig>>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn read(&self, tenant_id: &str) -> Option<TenantConfig> {
        self.records.read().unwrap().get(tenant_id).cloned()
    }

    async fn write(&self, tenant_id: &str, config: &TenantConfig) -> StoreResult<()> {
        self.records
            .write()
            .unwrap()
            .insert(tenant_id.to_string(), config.clone());
        Ok(())
    }

    async fn exists(&self, tenant_id: &str) -> bool {
        self.records.read().unwrap().contains_key(tenant_id)
    }

    async fn delete(&self, tenant_id: &str) -> StoreResult<()> {
        match self.records.write().unwrap().remove(tenant_id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(tenant_id.to_string())),
        }
    }
}
