//! Reliability Core Configuration Management
//!
//! Environment-aware configuration for the request queue, the query cache,
//! and the retry policy. Defaults target production; `for_test()` tightens
//! every timing for rapid test feedback, and `from_environment()` selects a
//! profile from `COUNSEL_ENV`/`APP_ENV` and then applies per-field
//! environment variable overrides.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

/// Top-level configuration for the reliability core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    pub queue: QueueConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
}

/// Bounds for the request queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum operations in flight at once.
    pub max_concurrent: usize,
    /// Maximum waiting entries before new requests are rejected.
    pub max_queue_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            max_queue_size: 10,
        }
    }
}

/// Expiry behavior for the query cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default entry lifetime when `set` does not override it.
    pub default_ttl_seconds: u64,
    /// Suggested interval between proactive `cleanup()` sweeps.
    pub cleanup_interval_seconds: u64,
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_seconds: 120,
            cleanup_interval_seconds: 300,
        }
    }
}

/// Retry policy tunables for `retry_with_backoff`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay_ms: u64,
    /// Cap applied to the computed backoff delay.
    pub max_delay_ms: u64,
    /// Multiplicative growth per attempt.
    pub backoff_multiplier: f64,
    /// Extra case-insensitive substrings treated as retryable, unioned with
    /// the built-in pattern list.
    pub retryable_patterns: Vec<String>,
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            retryable_patterns: Vec::new(),
        }
    }
}

impl CoreConfig {
    /// Test-optimized configuration with tight timings.
    pub fn for_test() -> Self {
        Self {
            queue: QueueConfig {
                max_concurrent: 2,
                max_queue_size: 4,
            },
            cache: CacheConfig {
                default_ttl_seconds: 1,
                cleanup_interval_seconds: 1,
            },
            retry: RetryConfig {
                max_attempts: 3,
                initial_delay_ms: 10,
                max_delay_ms: 50,
                backoff_multiplier: 2.0,
                retryable_patterns: Vec::new(),
            },
        }
    }

    /// Load configuration based on the detected environment, then apply
    /// environment variable overrides.
    pub fn from_environment() -> Self {
        let environment = detect_environment();

        let config = match environment.as_str() {
            "test" => {
                info!("Loading test reliability-core configuration (tight timings)");
                Self::for_test()
            }
            _ => {
                info!(environment = %environment, "Loading default reliability-core configuration");
                Self::default()
            }
        };

        config.with_env_overrides()
    }

    /// Apply per-field environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = parse_env::<usize>("COUNSEL_QUEUE_MAX_CONCURRENT") {
            self.queue.max_concurrent = n;
            info!("Queue max_concurrent override: {}", n);
        }
        if let Some(n) = parse_env::<usize>("COUNSEL_QUEUE_MAX_SIZE") {
            self.queue.max_queue_size = n;
            info!("Queue max_queue_size override: {}", n);
        }
        if let Some(n) = parse_env::<u64>("COUNSEL_CACHE_TTL_SECONDS") {
            self.cache.default_ttl_seconds = n;
            info!("Cache default TTL override: {}s", n);
        }
        if let Some(n) = parse_env::<u64>("COUNSEL_CACHE_CLEANUP_INTERVAL_SECONDS") {
            self.cache.cleanup_interval_seconds = n;
            info!("Cache cleanup interval override: {}s", n);
        }
        if let Some(n) = parse_env::<u32>("COUNSEL_RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = n;
            info!("Retry max_attempts override: {}", n);
        }
        if let Some(n) = parse_env::<u64>("COUNSEL_RETRY_INITIAL_DELAY_MS") {
            self.retry.initial_delay_ms = n;
            info!("Retry initial delay override: {}ms", n);
        }
        if let Some(n) = parse_env::<u64>("COUNSEL_RETRY_MAX_DELAY_MS") {
            self.retry.max_delay_ms = n;
            info!("Retry max delay override: {}ms", n);
        }
        if let Some(n) = parse_env::<f64>("COUNSEL_RETRY_BACKOFF_MULTIPLIER") {
            self.retry.backoff_multiplier = n;
            info!("Retry backoff multiplier override: {}", n);
        }
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.queue.max_concurrent == 0 {
            return Err("Queue max_concurrent must be greater than 0".to_string());
        }
        if self.retry.max_attempts == 0 {
            return Err("Retry max_attempts must be greater than 0".to_string());
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err("Retry backoff_multiplier must be at least 1.0".to_string());
        }

        if self.queue.max_queue_size == 0 {
            warn!("Queue max_queue_size is 0 - every request beyond the concurrency limit will be rejected");
        }
        if self.cache.default_ttl_seconds == 0 {
            warn!("Cache default TTL is 0 - caching effectively disabled");
        }

        Ok(())
    }

    /// Log current configuration for debugging.
    pub fn log_configuration(&self) {
        info!("Reliability Core Configuration:");
        info!(
            "  Queue: {} concurrent, {} waiting max",
            self.queue.max_concurrent, self.queue.max_queue_size
        );
        info!(
            "  Cache: {}s TTL, {}s cleanup interval",
            self.cache.default_ttl_seconds, self.cache.cleanup_interval_seconds
        );
        info!(
            "  Retry: {} attempts, {}ms initial, {}ms cap, x{} growth",
            self.retry.max_attempts,
            self.retry.initial_delay_ms,
            self.retry.max_delay_ms,
            self.retry.backoff_multiplier
        );
    }
}

/// Detect the running environment from common environment variables.
pub(crate) fn detect_environment() -> String {
    env::var("COUNSEL_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .or_else(|_| env::var("RUST_ENV"))
        .unwrap_or_else(|_| "production".to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
