//! Pool configuration.

use crate::error::ResourceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounds and timeouts for a [`Pool`](super::Pool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Connection string handed to [`Backend::connect`](super::Backend::connect).
    #[serde(default)]
    pub resource_backend_url: String,
    /// Resources opened when the pool is constructed.
    #[serde(default = "default_min_size")]
    pub pool_min_size: usize,
    /// Upper bound on concurrently leased resources.
    #[serde(default = "default_max_size")]
    pub pool_max_size: usize,
    /// How long an acquisition may take, waiting for capacity and opening a
    /// resource included. `0` waits forever.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// Minimum delay between two construction attempts after a failure.
    /// `0` retries on every event.
    #[serde(default)]
    pub init_retry_backoff_ms: u64,
}

fn default_min_size() -> usize {
    5
}

fn default_max_size() -> usize {
    20
}

fn default_acquire_timeout_ms() -> u64 {
    30_000
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            resource_backend_url: String::new(),
            pool_min_size: default_min_size(),
            pool_max_size: default_max_size(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            init_retry_backoff_ms: 0,
        }
    }
}

impl PoolConfig {
    /// Default bounds for the given connection string.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            resource_backend_url: url.into(),
            ..Self::default()
        }
    }

    /// Set `pool_min_size` and `pool_max_size`.
    pub fn with_bounds(mut self, min_size: usize, max_size: usize) -> Self {
        self.pool_min_size = min_size;
        self.pool_max_size = max_size;
        self
    }

    /// Set the acquisition timeout. `None` waits forever.
    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout_ms = timeout.map_or(0, |t| t.as_millis() as u64);
        self
    }

    /// Set the delay between construction attempts after a failure.
    pub fn with_init_retry_backoff(mut self, backoff: Duration) -> Self {
        self.init_retry_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// The acquisition timeout, or `None` to wait forever.
    pub fn acquire_timeout(&self) -> Option<Duration> {
        (self.acquire_timeout_ms > 0).then(|| Duration::from_millis(self.acquire_timeout_ms))
    }

    /// The construction retry backoff.
    pub fn init_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.init_retry_backoff_ms)
    }

    /// Check that the bounds are consistent.
    pub fn validate(&self) -> Result<(), ResourceError> {
        if self.pool_max_size == 0 {
            return Err(ResourceError::Config(
                "pool_max_size must be greater than 0".into(),
            ));
        }
        if self.pool_min_size > self.pool_max_size {
            return Err(ResourceError::Config(format!(
                "pool_min_size ({}) must not exceed pool_max_size ({})",
                self.pool_min_size, self.pool_max_size
            )));
        }
        Ok(())
    }
}
