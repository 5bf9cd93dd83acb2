//! Rate limiting implementation
//!
//! Uses the governor crate for token bucket rate limiting. Budgets are per
//! connection per hour; the pool hands every client of a connection the
//! same bucket.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Hourly budget used when a connection does not set one
pub const DEFAULT_REQUESTS_PER_HOUR: u32 = 18_000;

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per hour
    pub requests_per_hour: u32,
    /// Burst size (max tokens in bucket)
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_hour: DEFAULT_REQUESTS_PER_HOUR,
            burst_size: 100,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(requests_per_hour: u32, burst_size: u32) -> Self {
        Self {
            requests_per_hour,
            burst_size,
        }
    }

    /// Config for a connection's optional hourly budget
    ///
    /// The burst never exceeds the hourly budget itself.
    pub fn per_hour(requests_per_hour: Option<u32>) -> Self {
        let requests_per_hour = requests_per_hour
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_REQUESTS_PER_HOUR);
        Self {
            requests_per_hour,
            burst_size: requests_per_hour.min(Self::default().burst_size),
        }
    }
}

/// Token bucket rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        let quota = Quota::per_hour(NonZeroU32::new(config.requests_per_hour).unwrap_or(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));

        Self {
            limiter: Arc::new(Governor::direct(quota)),
        }
    }

    /// Wait until a request can be made
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire a permit, returning immediately
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Wait with a timeout
    pub async fn wait_with_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.limiter.until_ready())
            .await
            .is_ok()
    }

    /// Whether two handles draw from the same bucket
    pub fn shares_bucket_with(&self, other: &RateLimiter) -> bool {
        Arc::ptr_eq(&self.limiter, &other.limiter)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish()
    }
}

// ============================================================================
// Pool
// ============================================================================

static GLOBAL_POOL: Lazy<RateLimiterPool> = Lazy::new(RateLimiterPool::new);

/// Rate limiters keyed by connection id
#[derive(Debug, Clone, Default)]
pub struct RateLimiterPool {
    limiters: Arc<Mutex<HashMap<u64, RateLimiter>>>,
}

impl RateLimiterPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide pool
    pub fn global() -> &'static RateLimiterPool {
        &GLOBAL_POOL
    }

    /// Limiter of a connection, created from `config` on first use
    pub fn get_or_create(&self, connection_id: u64, config: &RateLimiterConfig) -> RateLimiter {
        let mut limiters = match self.limiters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        limiters
            .entry(connection_id)
            .or_insert_with(|| RateLimiter::new(config))
            .clone()
    }

    /// Number of connections with a limiter
    pub fn len(&self) -> usize {
        self.limiters.lock().map_or(0, |l| l.len())
    }

    /// Whether no limiter was created yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod rate_limit_tests {
    use super::*;

    #[test]
    fn test_rate_limiter_config_default() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.requests_per_hour, DEFAULT_REQUESTS_PER_HOUR);
        assert_eq!(config.burst_size, 100);
    }

    #[test]
    fn test_rate_limiter_config_per_hour() {
        assert_eq!(RateLimiterConfig::per_hour(Some(3000)).requests_per_hour, 3000);
        assert_eq!(RateLimiterConfig::per_hour(Some(20)).burst_size, 20);
        assert_eq!(
            RateLimiterConfig::per_hour(None).requests_per_hour,
            DEFAULT_REQUESTS_PER_HOUR
        );
        assert_eq!(
            RateLimiterConfig::per_hour(Some(0)).requests_per_hour,
            DEFAULT_REQUESTS_PER_HOUR
        );
    }

    #[tokio::test]
    async fn test_rate_limiter_allows_burst() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(3600, 5));
        for _ in 0..5 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_rate_limiter_wait_with_timeout() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(3600, 1));
        assert!(limiter.wait_with_timeout(Duration::from_millis(100)).await);
        // next token is a second away
        assert!(!limiter.wait_with_timeout(Duration::from_millis(50)).await);
    }

    #[test]
    fn test_pool_shares_limiter_per_connection() {
        let pool = RateLimiterPool::new();
        let a = pool.get_or_create(1, &RateLimiterConfig::default());
        let b = pool.get_or_create(1, &RateLimiterConfig::new(1, 1));
        let c = pool.get_or_create(2, &RateLimiterConfig::default());

        assert!(a.shares_bucket_with(&b));
        assert!(!a.shares_bucket_with(&c));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_pool_budget_is_shared() {
        let pool = RateLimiterPool::new();
        let board_a = pool.get_or_create(1, &RateLimiterConfig::new(3600, 2));
        let board_b = pool.get_or_create(1, &RateLimiterConfig::new(3600, 2));
        assert!(board_a.try_acquire());
        assert!(board_b.try_acquire());
        assert!(!board_a.try_acquire());
    }
}
