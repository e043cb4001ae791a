// src/limiter/tests/mod.rs


// Common utilities for limiter tests
pub(crate) mod utils {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::RateLimitConfig;
    use crate::limiter::{DegradationPolicy, RateLimiter};
    use crate::test_utils::{connected_client, CollectingSink, MockCacheBackend};

    pub const WINDOW: Duration = Duration::from_secs(60);

    /// Limiter over a fresh connected mock backend with a one-attempt
    /// retry budget, so one logical operation maps to one recorded call.
    pub async fn build_limiter(
        max_requests: u64,
        degradation: DegradationPolicy,
    ) -> (MockCacheBackend, RateLimiter<MockCacheBackend>) {
        build_limiter_with_window(max_requests, WINDOW, degradation).await
    }

    pub async fn build_limiter_with_window(
        max_requests: u64,
        window: Duration,
        degradation: DegradationPolicy,
    ) -> (MockCacheBackend, RateLimiter<MockCacheBackend>) {
        let (backend, client) = connected_client(1).await;
        let limiter = RateLimiter::new(
            client,
            RateLimitConfig {
                max_requests,
                window,
                degradation,
            },
        );
        (backend, limiter)
    }

    /// Limiter wired to a collecting sink for failure-report assertions.
    pub async fn build_limiter_with_sink(
        max_requests: u64,
        degradation: DegradationPolicy,
    ) -> (
        MockCacheBackend,
        RateLimiter<MockCacheBackend>,
        CollectingSink,
    ) {
        let (backend, mut limiter) = build_limiter(max_requests, degradation).await;
        let sink = CollectingSink::new();
        limiter.set_error_handler(Arc::new(sink.clone()));
        (backend, limiter, sink)
    }
}
