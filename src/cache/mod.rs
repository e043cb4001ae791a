// src/cache/mod.rs

pub mod backend;
pub mod backoff;
pub mod client;
pub mod config_cache;

pub use backend::{CacheBackend, RedisBackend};
pub use client::ResilientCacheClient;
pub use config_cache::ConfigCache;

#[cfg(test)]
mod tests;
