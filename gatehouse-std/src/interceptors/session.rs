//! Per-event resource provisioning.

use crate::{
    ResourceError,
    pool::{Backend, LazyPool, Lease, PoolConfig},
};
use gatehouse_core::{BoxError, Context, Event, Interceptor, Next, Outcome};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Context key the session is published under by default.
pub const SESSION_KEY: &str = "session";

type LeaseSlot<B> = Arc<Mutex<Option<Lease<B>>>>;

fn lock<B: Backend>(slot: &Mutex<Option<Lease<B>>>) -> MutexGuard<'_, Option<Lease<B>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The resource leased for one event, as handlers see it in the [`Context`].
///
/// The lease itself stays owned by the [`ResourceProvider`] frame that
/// acquired it, so it is given back when that frame exits, even if the event
/// is cancelled. Once that happens the session is inactive and every accessor
/// reports [`ResourceError::Released`].
///
/// ```rust,ignore
/// let session = ctx.require::<Session<Postgres>>(SESSION_KEY)?;
/// let rows = session.with(|conn| conn.query_sync("SELECT 1"))?;
///
/// // Work that awaits takes the lease out; it is released when dropped.
/// let mut conn = session.take()?;
/// conn.execute("UPDATE ...").await?;
/// ```
pub struct Session<B: Backend> {
    slot: LeaseSlot<B>,
}

impl<B: Backend> Session<B> {
    fn open(lease: Lease<B>, key: &'static str) -> (Self, ReleaseOnExit<B>) {
        let slot = Arc::new(Mutex::new(Some(lease)));
        let guard = ReleaseOnExit {
            slot: Arc::clone(&slot),
            key,
        };
        (Self { slot }, guard)
    }

    /// Run `f` against the leased resource.
    ///
    /// `f` runs under a lock and must not block.
    pub fn with<R>(&self, f: impl FnOnce(&mut B::Resource) -> R) -> Result<R, ResourceError> {
        let mut slot = lock(&self.slot);
        let lease = slot.as_mut().ok_or(ResourceError::Released)?;
        Ok(f(&mut **lease))
    }

    /// Move the lease out, e.g. to hold the resource across `.await`.
    ///
    /// The caller then owns the release: dropping the lease returns it.
    pub fn take(&self) -> Result<Lease<B>, ResourceError> {
        lock(&self.slot).take().ok_or(ResourceError::Released)
    }

    /// Throw the resource away instead of returning it, e.g. after the
    /// connection broke. Returns `false` if the session was already inactive.
    pub fn discard(&self) -> bool {
        let lease = lock(&self.slot).take();
        lease.map(Lease::discard).is_some()
    }

    /// Returns `true` while the session still holds its lease.
    pub fn is_active(&self) -> bool {
        lock(&self.slot).is_some()
    }
}

impl<B: Backend> Clone for Session<B> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<B: Backend> std::fmt::Debug for Session<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Held by the provider frame for the lifetime of one event.
struct ReleaseOnExit<B: Backend> {
    slot: LeaseSlot<B>,
    key: &'static str,
}

impl<B: Backend> Drop for ReleaseOnExit<B> {
    fn drop(&mut self) {
        let lease = lock(&self.slot).take();
        if let Some(lease) = lease {
            lease.release();
            debug!(key = self.key, "resource released");
        }
    }
}

/// Leases one pooled resource for each event and publishes it in the
/// [`Context`] as a [`Session<B>`].
///
/// The pool is built on the first event, not when the provider is created.
/// The lease is given back when this interceptor's frame exits: after the
/// rest of the chain returns, succeeded or failed, or when the event is
/// cancelled mid-flight, e.g. by a [`TimeoutInterceptor`] further out.
///
/// A closed pool stays closed. Events fail with [`ResourceError::Closed`]
/// until [`reset`](Self::reset) is called, so a shutdown cannot be undone
/// by a late event.
///
/// Handlers read the resource back with
/// `ctx.require::<Session<B>>(SESSION_KEY)`.
///
/// [`TimeoutInterceptor`]: crate::TimeoutInterceptor
pub struct ResourceProvider<B: Backend> {
    pool: Arc<LazyPool<B>>,
    key: &'static str,
}

impl<B: Backend> ResourceProvider<B> {
    /// A provider over a shared pool slot.
    pub fn new(pool: Arc<LazyPool<B>>) -> Self {
        Self {
            pool,
            key: SESSION_KEY,
        }
    }

    /// A provider owning a fresh pool slot for `backend`.
    pub fn from_backend(backend: B, config: PoolConfig) -> Self {
        Self::new(Arc::new(LazyPool::new(backend, config)))
    }

    /// Publish the session under `key` instead of [`SESSION_KEY`].
    pub fn with_key(mut self, key: &'static str) -> Self {
        self.key = key;
        self
    }

    /// The context key used for the session.
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// The shared pool slot.
    pub fn pool(&self) -> &Arc<LazyPool<B>> {
        &self.pool
    }

    /// Close the pool. Safe to call more than once, and before the pool was
    /// ever built.
    pub async fn close(&self) -> bool {
        self.pool.close().await
    }

    /// Reopen a closed pool slot. The next event builds a fresh pool.
    ///
    /// Returns `false` if the slot was not closed.
    pub async fn reset(&self) -> bool {
        self.pool.reset().await
    }
}

impl<B: Backend> Clone for ResourceProvider<B> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            key: self.key,
        }
    }
}

impl<B: Backend> std::fmt::Debug for ResourceProvider<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceProvider")
            .field("key", &self.key)
            .field("pool", &self.pool)
            .finish()
    }
}

impl<E: Event, B: Backend> Interceptor<E> for ResourceProvider<B> {
    async fn intercept(
        &self,
        event: &E,
        ctx: &mut Context,
        next: Next<'_, E>,
    ) -> Result<Outcome, BoxError> {
        let pool = self.pool.get().await?;
        let lease = pool.acquire().await?;

        // Declared before the first await below so cancellation releases too.
        let (session, _release) = Session::open(lease, self.key);
        let outer = ctx.insert(self.key, session);
        debug!(key = self.key, "resource attached to context");

        let result = next.run(event, ctx).await;

        ctx.remove::<Session<B>>(self.key);
        if let Some(outer) = outer {
            ctx.insert(self.key, outer);
        }
        result
    }
}
