// src/store/mod.rs

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::StoreResult;
use crate::tenant::TenantConfig;

#[cfg(test)]
mod tests;

/// Core trait for the durable per-tenant record store.
///
/// One record per tenant id. Reads never fail: missing and malformed
/// records both read as None, and implementations map structural read
/// failures to None the same way. Writes and deletes surface their
/// failures, and deleting an absent record is an error.
#[async_trait]
pub trait PersistentStore: Send + Sync + Debug {
    // Loads the record for a tenant
    async fn read(&self, tenant_id: &str) -> Option<TenantConfig>;

    // Creates or overwrites the record for a tenant
    async fn write(&self, tenant_id: &str, config: &TenantConfig) -> StoreResult<()>;

    // Whether a record exists for the tenant
    async fn exists(&self, tenant_id: &str) -> bool;

    // Removes the record for a tenant; fails when absent
    async fn delete(&self, tenant_id: &str) -> StoreResult<()>;
}
