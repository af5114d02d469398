use super::{Backend, Lease, PoolConfig};
use crate::error::ResourceError;
use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Successful acquisitions.
    pub acquired: u64,
    /// Leases returned (released, discarded, or dropped).
    pub released: u64,
    /// Resources opened through the backend.
    pub created: u64,
    /// Resources the pool stopped keeping.
    pub destroyed: u64,
    /// Leases currently out.
    pub leased: u64,
    /// Resources waiting for reuse.
    pub idle: usize,
    /// Configured upper bound on leases.
    pub max_size: usize,
}

pub(super) struct PoolInner<B: Backend> {
    backend: Arc<B>,
    config: PoolConfig,
    idle: Mutex<VecDeque<B::Resource>>,
    /// One permit per lease that may be out at once.
    permits: Arc<Semaphore>,
    closed: AtomicBool,
    acquired: AtomicU64,
    released: AtomicU64,
    created: AtomicU64,
    destroyed: AtomicU64,
}

impl<B: Backend> PoolInner<B> {
    fn lock_idle(&self) -> MutexGuard<'_, VecDeque<B::Resource>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Take a resource back from a lease. Runs inside `Drop`, so it never
    /// awaits: resources that are not kept are disconnected on a detached task.
    pub(super) fn give_back(&self, resource: B::Resource, discard: bool) {
        self.released.fetch_add(1, Ordering::Relaxed);
        {
            let mut idle = self.lock_idle();
            if !discard && !self.is_closed() {
                idle.push_back(resource);
                debug!(idle = idle.len(), "resource returned to pool");
                return;
            }
        }
        self.destroyed.fetch_add(1, Ordering::Relaxed);
        debug!(discard, "resource dropped from pool");
        disconnect_detached(&self.backend, vec![resource]);
    }
}

/// Disconnect `resources` on a detached task. Outside a runtime they are
/// only dropped.
fn disconnect_detached<B: Backend>(backend: &Arc<B>, resources: Vec<B::Resource>) {
    if resources.is_empty() {
        return;
    }
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let backend = Arc::clone(backend);
            handle.spawn(async move {
                for resource in resources {
                    backend.disconnect(resource).await;
                }
            });
        }
        Err(_) => drop(resources),
    }
}

/// Resources a pool future has opened or taken off the idle queue but not
/// yet handed on. If that future is dropped, they are disconnected.
struct Unclaimed<B: Backend> {
    backend: Arc<B>,
    resources: VecDeque<B::Resource>,
}

impl<B: Backend> Unclaimed<B> {
    fn new(backend: &Arc<B>) -> Self {
        Self {
            backend: Arc::clone(backend),
            resources: VecDeque::new(),
        }
    }

    fn claim(mut self) -> VecDeque<B::Resource> {
        std::mem::take(&mut self.resources)
    }
}

impl<B: Backend> Drop for Unclaimed<B> {
    fn drop(&mut self) {
        if !self.resources.is_empty() {
            debug!(count = self.resources.len(), "disconnecting resources of an abandoned pool call");
        }
        disconnect_detached(&self.backend, self.resources.drain(..).collect());
    }
}

/// A bounded pool of backend resources.
///
/// At most `pool_max_size` leases are out at once; further acquisitions wait
/// for a release, up to the configured acquire timeout. Cloning is cheap and
/// every clone refers to the same pool.
pub struct Pool<B: Backend> {
    inner: Arc<PoolInner<B>>,
}

impl<B: Backend> Clone for Pool<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Backend> Pool<B> {
    /// Construct a pool and open `pool_min_size` resources up front.
    ///
    /// If any of the initial resources fails to open, the ones already opened
    /// are disconnected and [`ResourceError::Init`] is returned. The same
    /// happens, on a background task, if the returned future is dropped
    /// halfway through.
    pub async fn connect(backend: Arc<B>, config: PoolConfig) -> Result<Self, ResourceError> {
        config.validate()?;

        let mut warm = Unclaimed::new(&backend);
        for _ in 0..config.pool_min_size {
            match backend.connect(&config.resource_backend_url).await {
                Ok(resource) => warm.resources.push_back(resource),
                Err(error) => {
                    while let Some(resource) = warm.resources.pop_front() {
                        backend.disconnect(resource).await;
                    }
                    return Err(ResourceError::Init(error));
                }
            }
        }
        let warm = warm.claim();

        info!(
            min_size = config.pool_min_size,
            max_size = config.pool_max_size,
            "resource pool constructed"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                backend,
                permits: Arc::new(Semaphore::new(config.pool_max_size)),
                created: AtomicU64::new(warm.len() as u64),
                idle: Mutex::new(warm),
                config,
                closed: AtomicBool::new(false),
                acquired: AtomicU64::new(0),
                released: AtomicU64::new(0),
                destroyed: AtomicU64::new(0),
            }),
        })
    }

    /// Lease one resource.
    ///
    /// Waits while `pool_max_size` leases are out. The acquire timeout covers
    /// the whole checkout, including checking an idle resource or opening a
    /// new one. Dropping the returned future gives up the place in line
    /// without holding any capacity.
    pub async fn acquire(&self) -> Result<Lease<B>, ResourceError> {
        if self.inner.is_closed() {
            return Err(ResourceError::Closed);
        }

        match self.inner.config.acquire_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.checkout())
                .await
                .map_err(|_| ResourceError::AcquireTimeout(limit))?,
            None => self.checkout().await,
        }
    }

    async fn checkout(&self) -> Result<Lease<B>, ResourceError> {
        let inner = &self.inner;
        let permit = Arc::clone(&inner.permits)
            .acquire_owned()
            .await
            .map_err(|_| ResourceError::Closed)?;

        if inner.is_closed() {
            return Err(ResourceError::Closed);
        }

        let mut held = Unclaimed::new(&inner.backend);
        let resource = loop {
            let idle = inner.lock_idle().pop_front();
            let Some(resource) = idle else {
                let resource = inner
                    .backend
                    .connect(&inner.config.resource_backend_url)
                    .await
                    .map_err(ResourceError::Backend)?;
                inner.created.fetch_add(1, Ordering::Relaxed);
                break resource;
            };

            held.resources.push_back(resource);
            let healthy = match held.resources.back_mut() {
                Some(resource) => inner.backend.check(resource).await,
                None => false,
            };
            let Some(resource) = held.resources.pop_back() else {
                continue;
            };
            if healthy {
                break resource;
            }
            debug!("idle resource failed its check, replacing it");
            inner.destroyed.fetch_add(1, Ordering::Relaxed);
            inner.backend.disconnect(resource).await;
        };

        let acquired = inner.acquired.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            leased = acquired.saturating_sub(inner.released.load(Ordering::Relaxed)),
            "resource leased"
        );
        Ok(Lease::new(resource, permit, Arc::clone(inner)))
    }

    /// Close the pool.
    ///
    /// Pending and future acquisitions fail with [`ResourceError::Closed`].
    /// Idle resources are disconnected now; leased ones when they come back.
    /// Returns `false` if the pool was already closed.
    pub async fn close(&self) -> bool {
        let drained: Vec<_> = {
            let mut idle = self.inner.lock_idle();
            if self.inner.closed.swap(true, Ordering::AcqRel) {
                return false;
            }
            idle.drain(..).collect()
        };
        self.inner.permits.close();

        let count = drained.len();
        for resource in drained {
            self.inner.destroyed.fetch_add(1, Ordering::Relaxed);
            self.inner.backend.disconnect(resource).await;
        }
        info!(disconnected = count, "resource pool closed");
        true
    }

    /// Returns `true` once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// The configuration the pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        let inner = &self.inner;
        let acquired = inner.acquired.load(Ordering::Relaxed);
        let released = inner.released.load(Ordering::Relaxed);
        PoolStats {
            acquired,
            released,
            created: inner.created.load(Ordering::Relaxed),
            destroyed: inner.destroyed.load(Ordering::Relaxed),
            leased: acquired.saturating_sub(released),
            idle: inner.lock_idle().len(),
            max_size: inner.config.pool_max_size,
        }
    }
}

impl<B: Backend> std::fmt::Debug for Pool<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("stats", &self.stats())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;
    use std::time::Duration;

    fn pool_config(min: usize, max: usize) -> PoolConfig {
        PoolConfig::new("mock://pool")
            .with_bounds(min, max)
            .with_acquire_timeout(Some(Duration::from_millis(50)))
    }

    #[tokio::test]
    async fn test_connect_opens_min_size() {
        let backend = Arc::new(MockBackend::new());
        let pool = Pool::connect(backend.clone(), pool_config(3, 5)).await.unwrap();

        assert_eq!(backend.connects(), 3);
        let stats = pool.stats();
        assert_eq!(stats.idle, 3);
        assert_eq!(stats.created, 3);
        assert_eq!(stats.max_size, 5);
    }

    #[tokio::test]
    async fn test_connect_failure_disconnects_partial_warmup() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_connects_after(2);

        let err = Pool::connect(backend.clone(), pool_config(4, 4))
            .await
            .unwrap_err();

        assert!(matches!(err, ResourceError::Init(_)));
        assert_eq!(backend.disconnects(), 2);
    }

    #[tokio::test]
    async fn test_lease_reuses_idle_resource() {
        let backend = Arc::new(MockBackend::new());
        let pool = Pool::connect(backend.clone(), pool_config(1, 2)).await.unwrap();

        let first = pool.acquire().await.unwrap();
        let id = first.id;
        first.release();

        let second = pool.acquire().await.unwrap();
        assert_eq!(second.id, id);
        assert_eq!(backend.connects(), 1);
    }

    #[tokio::test]
    async fn test_acquire_times_out_at_capacity() {
        let backend = Arc::new(MockBackend::new());
        let pool = Pool::connect(backend, pool_config(0, 1)).await.unwrap();

        let _held = pool.acquire().await.unwrap();
        let err = pool.acquire().await.unwrap_err();

        assert!(matches!(err, ResourceError::AcquireTimeout(d) if d == Duration::from_millis(50)));
        assert!(err.is_acquire());
    }

    #[tokio::test]
    async fn test_waiter_proceeds_after_release() {
        let backend = Arc::new(MockBackend::new());
        let pool = Pool::connect(backend, pool_config(0, 1).with_acquire_timeout(None))
            .await
            .unwrap();

        let held = pool.acquire().await.unwrap();
        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.map(|lease| lease.id) })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        let id = held.id;
        held.release();
        assert_eq!(waiter.await.unwrap().unwrap(), id);
    }

    #[tokio::test]
    async fn test_failed_check_replaces_idle_resource() {
        let backend = Arc::new(MockBackend::new());
        let pool = Pool::connect(backend.clone(), pool_config(1, 1)).await.unwrap();
        backend.set_healthy(false);

        let lease = pool.acquire().await.unwrap();

        assert_eq!(backend.connects(), 2);
        assert_eq!(backend.disconnects(), 1);
        assert_eq!(lease.id, 2);
    }

    #[tokio::test]
    async fn test_backend_failure_does_not_leak_capacity() {
        let backend = Arc::new(MockBackend::new());
        let pool = Pool::connect(backend.clone(), pool_config(0, 1)).await.unwrap();
        backend.fail_connects_after(0);

        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, ResourceError::Backend(_)));

        backend.recover();
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_timeout_covers_slow_connect() {
        let backend = Arc::new(MockBackend::new().with_connect_delay(Duration::from_secs(10)));
        let pool = Pool::connect(backend.clone(), pool_config(0, 1)).await.unwrap();

        let start = tokio::time::Instant::now();
        let err = pool.acquire().await.unwrap_err();

        assert!(matches!(err, ResourceError::AcquireTimeout(d) if d == Duration::from_millis(50)));
        assert_eq!(start.elapsed(), Duration::from_millis(50));
        assert_eq!(backend.connects(), 0);
        assert_eq!(pool.inner.permits.available_permits(), 1);
        assert_eq!(pool.stats().leased, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_warmup_disconnects_opened_resources() {
        let backend = Arc::new(MockBackend::new().with_connect_delay(Duration::from_millis(10)));

        // Two of three resources are open when the caller gives up.
        let abandoned = tokio::time::timeout(
            Duration::from_millis(25),
            Pool::connect(backend.clone(), pool_config(3, 3)),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(backend.connects(), 2);

        tokio::task::yield_now().await;
        assert_eq!(backend.disconnects(), 2);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_rejects_acquire() {
        let backend = Arc::new(MockBackend::new());
        let pool = Pool::connect(backend.clone(), pool_config(2, 2)).await.unwrap();

        assert!(pool.close().await);
        assert!(!pool.close().await);
        assert_eq!(backend.disconnects(), 2);
        assert!(matches!(
            pool.acquire().await.unwrap_err(),
            ResourceError::Closed
        ));
    }

    #[tokio::test]
    async fn test_lease_returned_after_close_is_disconnected() {
        let backend = Arc::new(MockBackend::new());
        let pool = Pool::connect(backend.clone(), pool_config(1, 1)).await.unwrap();

        let lease = pool.acquire().await.unwrap();
        pool.close().await;
        lease.release();
        tokio::task::yield_now().await;

        let stats = pool.stats();
        assert_eq!(stats.acquired, stats.released);
        assert_eq!(stats.idle, 0);
        assert_eq!(backend.disconnects(), 1);
    }
}
