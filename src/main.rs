use std::time::Duration;

use dotenv::dotenv;
use tenant_storage::config::{
    CacheClientConfig, ConfigCacheConfig, RateLimitConfig, StorageOptions,
};
use tenant_storage::init_logging;
use tenant_storage::limiter::DegradationPolicy;
use tenant_storage::storage::{ReadPolicy, StorageCoordinator, WritePolicy};
use tenant_storage::store::MemoryStore;
use tenant_storage::tenant::TenantConfig;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();
    info!("Tenant storage layer starting up");

    let url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

    let options = StorageOptions {
        cache: CacheClientConfig::new(url.as_str()),
        rate_limit: RateLimitConfig {
            max_requests: 10,
            window: Duration::from_secs(60),
            degradation: DegradationPolicy::default(),
        },
        config_cache: ConfigCacheConfig::default(),
        read_policy: ReadPolicy::default(),
        write_policy: WritePolicy::default(),
    };

    let coordinator = StorageCoordinator::new(MemoryStore::new(), options);
    match coordinator.connect().await {
        Ok(()) => info!("Connected to cache backend at {}", url),
        Err(e) => warn!("Cache backend unavailable ({}), serving from the store", e),
    }

    // One pass over the layer to prove the wiring
    let config = TenantConfig::new("tenant_smoke", "Smoke Test Practice");
    if let Err(e) = coordinator.save_tenant_config(&config).await {
        error!("Failed to save tenant configuration: {}", e);
        return;
    }

    match coordinator.get_tenant_config("tenant_smoke").await {
        Some(loaded) => info!(tenant_id = %loaded.tenant_id, "Loaded tenant configuration"),
        None => warn!("Tenant configuration missing after save"),
    }

    let allowed = coordinator
        .rate_limiter()
        .check_and_increment("tenant_smoke")
        .await;
    info!(allowed = allowed, "Admission check complete");

    info!(
        tenant_id = "tenant_smoke",
        operation = "startup",
        "Tenant storage layer initialized successfully"
    );
}
