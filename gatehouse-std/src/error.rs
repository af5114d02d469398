//! Errors raised while providing pooled resources.

use gatehouse_core::BoxError;
use std::time::Duration;
use thiserror::Error;

/// Errors from pool construction and resource acquisition.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The pool could not be constructed. The lazy slot stays uninitialized
    /// and the next event retries.
    #[error("resource pool initialization failed: {0}")]
    Init(#[source] BoxError),

    /// Initialization was not retried because the previous failure is too
    /// recent.
    #[error("resource pool initialization backing off for another {0:?}")]
    InitBackoff(Duration),

    /// No resource became available in time.
    #[error("timed out after {0:?} waiting for a pooled resource")]
    AcquireTimeout(Duration),

    /// The backend failed to open a replacement resource.
    #[error("resource backend failed: {0}")]
    Backend(#[source] BoxError),

    /// The pool has been closed.
    #[error("resource pool is closed")]
    Closed,

    /// The event's lease was already taken out of its session or given back.
    #[error("the session no longer holds a lease")]
    Released,

    /// Pool bounds are inconsistent.
    #[error("invalid pool configuration: {0}")]
    Config(String),
}

impl ResourceError {
    /// Returns `true` for failures to construct the pool.
    pub fn is_init(&self) -> bool {
        matches!(self, ResourceError::Init(_) | ResourceError::InitBackoff(_))
    }

    /// Returns `true` for failures to lease a resource from a constructed
    /// pool.
    pub fn is_acquire(&self) -> bool {
        matches!(
            self,
            ResourceError::AcquireTimeout(_) | ResourceError::Backend(_) | ResourceError::Closed
        )
    }
}
