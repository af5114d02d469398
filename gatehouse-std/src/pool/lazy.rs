use super::{Backend, Pool, PoolConfig};
use crate::error::ResourceError;
use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{sync::RwLock, time::Instant};
use tracing::{info, warn};

/// Lifecycle of a [`LazyPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolState {
    /// No pool exists yet.
    Uninitialized = 0,
    /// A construction attempt is running.
    Initializing = 1,
    /// The pool accepts acquisitions.
    Ready = 2,
    /// The pool was closed; acquisitions fail.
    Closed = 3,
}

impl PoolState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => PoolState::Initializing,
            2 => PoolState::Ready,
            3 => PoolState::Closed,
            _ => PoolState::Uninitialized,
        }
    }
}

enum Slot<B: Backend> {
    Empty,
    Ready(Pool<B>),
    Closed(Pool<B>),
}

/// Resets the observable state if a construction attempt does not finish,
/// including when the constructing future is dropped.
struct InitAttempt<'a> {
    state: &'a AtomicU8,
    finished: bool,
}

impl<'a> InitAttempt<'a> {
    fn begin(state: &'a AtomicU8) -> Self {
        state.store(PoolState::Initializing as u8, Ordering::Release);
        Self {
            state,
            finished: false,
        }
    }

    fn finish(mut self) {
        self.state.store(PoolState::Ready as u8, Ordering::Release);
        self.finished = true;
    }
}

impl Drop for InitAttempt<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state
                .store(PoolState::Uninitialized as u8, Ordering::Release);
        }
    }
}

/// A pool constructed on first use.
///
/// Share one `LazyPool` per backend through an `Arc`. The first caller of
/// [`get`](Self::get) builds the pool while holding the write side of an async
/// lock, so concurrent first callers wait for that single construction
/// instead of starting their own. A failed construction leaves the slot
/// empty and the next call tries again, subject to the configured retry
/// backoff.
pub struct LazyPool<B: Backend> {
    backend: Arc<B>,
    config: PoolConfig,
    slot: RwLock<Slot<B>>,
    state: AtomicU8,
    constructions: AtomicU64,
    last_failure: Mutex<Option<Instant>>,
}

impl<B: Backend> LazyPool<B> {
    /// Create an uninitialized pool slot.
    pub fn new(backend: B, config: PoolConfig) -> Self {
        Self::with_shared_backend(Arc::new(backend), config)
    }

    /// Create an uninitialized pool slot over a backend that is shared with
    /// other owners.
    pub fn with_shared_backend(backend: Arc<B>, config: PoolConfig) -> Self {
        Self {
            backend,
            config,
            slot: RwLock::new(Slot::Empty),
            state: AtomicU8::new(PoolState::Uninitialized as u8),
            constructions: AtomicU64::new(0),
            last_failure: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Number of pools successfully constructed by this slot.
    pub fn constructions(&self) -> u64 {
        self.constructions.load(Ordering::Relaxed)
    }

    /// The configuration used for construction.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The ready pool, constructing it if this is the first use.
    pub async fn get(&self) -> Result<Pool<B>, ResourceError> {
        {
            let slot = self.slot.read().await;
            match &*slot {
                Slot::Ready(pool) => return Ok(pool.clone()),
                Slot::Closed(_) => return Err(ResourceError::Closed),
                Slot::Empty => {}
            }
        }

        let mut slot = self.slot.write().await;
        // Another caller may have finished construction while we waited.
        match &*slot {
            Slot::Ready(pool) => return Ok(pool.clone()),
            Slot::Closed(_) => return Err(ResourceError::Closed),
            Slot::Empty => {}
        }

        if let Some(remaining) = self.backoff_remaining() {
            return Err(ResourceError::InitBackoff(remaining));
        }

        let attempt = InitAttempt::begin(&self.state);
        match Pool::connect(Arc::clone(&self.backend), self.config.clone()).await {
            Ok(pool) => {
                *slot = Slot::Ready(pool.clone());
                attempt.finish();
                self.constructions.fetch_add(1, Ordering::Relaxed);
                *self.lock_failure() = None;
                Ok(pool)
            }
            Err(error) => {
                *self.lock_failure() = Some(Instant::now());
                warn!(%error, "resource pool initialization failed, will retry on next use");
                Err(error)
            }
        }
    }

    /// The constructed pool, if any, without triggering construction.
    ///
    /// A closed pool is still returned so its counters can be inspected.
    pub async fn current(&self) -> Option<Pool<B>> {
        match &*self.slot.read().await {
            Slot::Ready(pool) | Slot::Closed(pool) => Some(pool.clone()),
            Slot::Empty => None,
        }
    }

    /// Close the pool.
    ///
    /// Waits for a running construction to finish, then closes the result.
    /// Closing an uninitialized or already closed slot does nothing and
    /// returns `false`.
    pub async fn close(&self) -> bool {
        let mut slot = self.slot.write().await;
        let pool = match &*slot {
            Slot::Ready(pool) => pool.clone(),
            Slot::Empty | Slot::Closed(_) => return false,
        };
        pool.close().await;
        *slot = Slot::Closed(pool);
        self.state
            .store(PoolState::Closed as u8, Ordering::Release);
        true
    }

    /// Turn a closed slot back into an uninitialized one, so the next use
    /// constructs a fresh pool. Returns `false` unless the slot was closed.
    pub async fn reset(&self) -> bool {
        let mut slot = self.slot.write().await;
        if !matches!(*slot, Slot::Closed(_)) {
            return false;
        }
        *slot = Slot::Empty;
        self.state
            .store(PoolState::Uninitialized as u8, Ordering::Release);
        info!("resource pool slot reset");
        true
    }

    fn lock_failure(&self) -> MutexGuard<'_, Option<Instant>> {
        self.last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn backoff_remaining(&self) -> Option<Duration> {
        let backoff = self.config.init_retry_backoff();
        if backoff.is_zero() {
            return None;
        }
        let failed_at = (*self.lock_failure())?;
        backoff
            .checked_sub(failed_at.elapsed())
            .filter(|remaining| !remaining.is_zero())
    }
}

impl<B: Backend> std::fmt::Debug for LazyPool<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyPool")
            .field("state", &self.state())
            .field("constructions", &self.constructions())
            .finish()
    }
}
