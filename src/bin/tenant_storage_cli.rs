// src/bin/tenant_storage_cli.rs

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use prettytable::{row, Table};
use structopt::StructOpt;
use tokio::time;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

use tenant_storage::config::{
    CacheClientConfig, ConfigCacheConfig, RateLimitConfig, StorageOptions,
};
use tenant_storage::error::CacheError;
use tenant_storage::limiter::DegradationPolicy;
use tenant_storage::storage::{ReadPolicy, StorageCoordinator, WritePolicy};
use tenant_storage::store::MemoryStore;
use tenant_storage::tenant::TenantConfig;

#[derive(Debug, Clone, StructOpt)]
#[structopt(
    name = "tenant_storage_cli",
    about = "A CLI for exercising the tenant storage layer"
)]
struct Opt {
    /// What to run
    #[structopt(short, long, possible_values = &["demo", "simulate"], default_value = "demo")]
    mode: String,

    /// Cache backend URL (falls back to REDIS_URL from the environment)
    #[structopt(long)]
    redis_url: Option<String>,

    /// Maximum requests allowed per tenant in the window
    #[structopt(short = "x", long, default_value = "10")]
    max_requests: u64,

    /// Rate limit window in seconds
    #[structopt(short, long, default_value = "60")]
    window_seconds: u64,

    /// Config cache TTL in seconds (0 keeps the default)
    #[structopt(long, default_value = "0")]
    config_ttl_seconds: u64,

    /// Degradation policy when the cache backend is down
    #[structopt(long, possible_values = &["allow", "deny"], default_value = "allow")]
    degradation: String,

    /// Number of tenants to simulate
    #[structopt(short = "u", long, default_value = "5")]
    num_tenants: usize,

    /// Number of requests per tenant
    #[structopt(short = "r", long, default_value = "20")]
    requests_per_tenant: usize,

    /// Maximum concurrent requests during simulation
    #[structopt(short = "c", long, default_value = "50")]
    concurrency: usize,

    /// Time between requests in milliseconds
    #[structopt(short = "t", long, default_value = "25")]
    request_interval_ms: u64,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,

    /// Disable logs
    #[structopt(long)]
    disable_logs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Parse command line arguments
    let opt = Opt::from_args();

    // Set up logging based on disable_logs flag
    if !opt.disable_logs {
        let log_level = match opt.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::new(format!(
                "tenant_storage_cli={},tenant_storage={}",
                log_level, log_level
            )))
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    } else {
        // Set up minimal logging (errors only)
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::new(
                "tenant_storage_cli=error,tenant_storage=error",
            ))
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }

    let url = opt
        .redis_url
        .clone()
        .or_else(|| std::env::var("REDIS_URL").ok())
        .unwrap_or_else(|| "redis://localhost:6379".to_string());

    let coordinator = StorageCoordinator::new(MemoryStore::new(), build_options(&opt, &url));

    // A coordinator without its cache still serves from the store, so a
    // failed connect only downgrades the run.
    match coordinator.connect().await {
        Ok(()) => info!("Connected to cache backend at {}", url),
        Err(e) => warn!("Cache backend unavailable ({}), continuing degraded", e),
    }

    match opt.mode.as_str() {
        "demo" => run_demo(&opt, &coordinator).await?,
        "simulate" => run_simulation(&opt, coordinator).await?,
        _ => {
            error!("Unknown mode: {}", opt.mode);
            return Err("Unknown mode".into());
        }
    }

    Ok(())
}

fn build_options(opt: &Opt, url: &str) -> StorageOptions {
    let degradation = match opt.degradation.as_str() {
        "deny" => DegradationPolicy::DenyOnFailure,
        _ => DegradationPolicy::AllowOnFailure,
    };

    let config_ttl = if opt.config_ttl_seconds == 0 {
        None
    } else {
        Some(Duration::from_secs(opt.config_ttl_seconds))
    };

    StorageOptions {
        cache: CacheClientConfig::new(url),
        rate_limit: RateLimitConfig {
            max_requests: opt.max_requests,
            window: Duration::from_secs(opt.window_seconds),
            degradation,
        },
        config_cache: ConfigCacheConfig { ttl: config_ttl },
        read_policy: ReadPolicy::CacheFirst,
        write_policy: WritePolicy::WriteThrough,
    }
}

// Walk one tenant through the whole API surface
async fn run_demo(
    opt: &Opt,
    coordinator: &StorageCoordinator<MemoryStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tenant_id = format!("tenant_{}", Uuid::new_v4().simple());

    println!("\nTenant Storage Demo");
    println!("-------------------");
    println!("Tenant: {}", tenant_id);

    let mut config = TenantConfig::new(tenant_id.clone(), "Greenfield Dental");
    config.agent = serde_json::json!({
        "voice": "alloy",
        "greeting": "Thank you for calling Greenfield Dental.",
    });

    coordinator.save_tenant_config(&config).await?;
    println!("Saved configuration for {}", config.name);

    let cached_read = match coordinator.get_tenant_config(&tenant_id).await {
        Some(loaded) => {
            println!("Loaded configuration from cache: name={}", loaded.name);
            "hit"
        }
        None => "missing after save",
    };

    // Drop the cache entry to force the next read through the store
    coordinator.config_cache().invalidate(&tenant_id).await;
    let fallback_read = match coordinator.get_tenant_config(&tenant_id).await {
        Some(loaded) => {
            println!("Reloaded configuration from the store: name={}", loaded.name);
            "store fallback"
        }
        None => "missing after invalidate",
    };

    let limiter = coordinator.rate_limiter();
    let mut allowed_count = 0u64;
    let mut denied_count = 0u64;
    for i in 0..opt.max_requests + 2 {
        let allowed = limiter.check_and_increment(&tenant_id).await;

        if allowed {
            allowed_count += 1;
            let remaining = limiter.get_remaining(&tenant_id).await;
            println!("Request {}: ALLOWED (remaining: {})", i + 1, remaining);
        } else {
            denied_count += 1;
            println!("Request {}: DENIED (limit: {})", i + 1, opt.max_requests);
        }
    }

    limiter.reset(&tenant_id).await;
    println!("Rate counter reset");

    coordinator.delete_tenant_config(&tenant_id).await?;
    println!("Configuration deleted");

    let mut table = Table::new();
    table.add_row(row!["Step", "Result"]);
    table.add_row(row!["Cached read", cached_read]);
    table.add_row(row!["Invalidated read", fallback_read]);
    table.add_row(row![
        "Admission loop",
        format!("{} allowed, {} denied", allowed_count, denied_count)
    ]);
    table.printstd();

    Ok(())
}

// Simulate tenants sending webhook traffic through the layer
async fn run_simulation(
    opt: &Opt,
    mut coordinator: StorageCoordinator<MemoryStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Count the failures the cache layers absorb so the summary can show
    // how much of the run was served degraded
    let absorbed = Arc::new(AtomicU64::new(0));
    {
        let absorbed = absorbed.clone();
        coordinator.set_error_handler(Arc::new(move |_err: &CacheError| {
            absorbed.fetch_add(1, Ordering::SeqCst);
        }));
    }

    let coordinator = Arc::new(coordinator);

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::SeqCst);
        })?;
    }

    // Seed a configuration per tenant
    let mut tenant_ids = Vec::with_capacity(opt.num_tenants);
    for i in 0..opt.num_tenants {
        let tenant_id = format!("tenant_{}", Uuid::new_v4().simple());
        let mut config = TenantConfig::new(tenant_id.clone(), format!("Practice {}", i + 1));
        config.assistant_id = Some(format!("asst_{}", i + 1));

        coordinator.save_tenant_config(&config).await?;
        tenant_ids.push(tenant_id);
    }

    info!(
        "Simulating {} tenants x {} requests (limit {}/{}s)",
        opt.num_tenants, opt.requests_per_tenant, opt.max_requests, opt.window_seconds
    );

    let total = (opt.num_tenants * opt.requests_per_tenant) as u64;
    let progress = ProgressBar::new(total);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}",
        )?
        .progress_chars("#>-"),
    );

    let semaphore = Arc::new(tokio::sync::Semaphore::new(opt.concurrency));
    let interval = Duration::from_millis(opt.request_interval_ms);
    let started = Instant::now();

    let mut handles = Vec::with_capacity(opt.num_tenants);
    for tenant_id in tenant_ids.clone() {
        let coordinator_clone = coordinator.clone();
        let semaphore_clone = semaphore.clone();
        let progress_clone = progress.clone();
        let stop_clone = stop.clone();
        let requests = opt.requests_per_tenant;

        handles.push(tokio::spawn(async move {
            let mut allowed = 0u64;
            let mut denied = 0u64;
            let mut config_reads = 0u64;

            for _ in 0..requests {
                if stop_clone.load(Ordering::SeqCst) {
                    break;
                }

                {
                    // Limit concurrency
                    let _permit = semaphore_clone.acquire().await.unwrap();

                    if coordinator_clone
                        .rate_limiter()
                        .check_and_increment(&tenant_id)
                        .await
                    {
                        allowed += 1;

                        // An admitted webhook loads its tenant's configuration
                        if coordinator_clone
                            .get_tenant_config(&tenant_id)
                            .await
                            .is_some()
                        {
                            config_reads += 1;
                        }
                    } else {
                        denied += 1;
                    }

                    progress_clone.inc(1);
                }

                time::sleep(interval).await;
            }

            (tenant_id, allowed, denied, config_reads)
        }));
    }

    let results = futures::future::join_all(handles).await;
    progress.finish_and_clear();

    let elapsed = started.elapsed();

    let mut table = Table::new();
    table.add_row(row!["Tenant", "Allowed", "Denied", "Config reads"]);

    let mut total_allowed = 0u64;
    let mut total_denied = 0u64;

    for result in results {
        let (tenant_id, allowed, denied, config_reads) = result?;
        total_allowed += allowed;
        total_denied += denied;
        table.add_row(row![tenant_id, allowed, denied, config_reads]);
    }

    table.printstd();

    let total_requests = total_allowed + total_denied;
    println!("\nSimulation Results:");
    println!("-------------------");
    println!("Total requests: {}", total_requests);
    println!("Allowed: {}", total_allowed);
    println!("Denied: {}", total_denied);
    println!("Cache failures absorbed: {}", absorbed.load(Ordering::SeqCst));
    println!("Time elapsed: {:?}", elapsed);
    if stop.load(Ordering::SeqCst) {
        println!("Stopped early by Ctrl-C");
    }

    // Leave nothing behind in the cache
    for tenant_id in &tenant_ids {
        coordinator.rate_limiter().reset(tenant_id).await;
        let _ = coordinator.delete_tenant_config(tenant_id).await;
    }

    Ok(())
}
