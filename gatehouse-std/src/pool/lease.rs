use super::{Backend, bounded::PoolInner};
use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};
use tokio::sync::OwnedSemaphorePermit;

/// A resource leased from a [`Pool`](super::Pool).
///
/// The resource goes back to the pool exactly once: through [`release`],
/// [`discard`], or when the lease is dropped, whichever happens first. The
/// pool capacity held by the lease is freed at the same moment.
///
/// [`release`]: Lease::release
/// [`discard`]: Lease::discard
pub struct Lease<B: Backend> {
    resource: Option<B::Resource>,
    discard: bool,
    pool: Arc<PoolInner<B>>,
    // Dropped after `Drop::drop` has handed the resource back.
    _permit: OwnedSemaphorePermit,
}

impl<B: Backend> Lease<B> {
    pub(super) fn new(
        resource: B::Resource,
        permit: OwnedSemaphorePermit,
        pool: Arc<PoolInner<B>>,
    ) -> Self {
        Self {
            resource: Some(resource),
            discard: false,
            pool,
            _permit: permit,
        }
    }

    /// Return the resource to the pool for reuse.
    pub fn release(self) {
        drop(self);
    }

    /// Give up the resource instead of returning it, e.g. after the
    /// connection broke. The pool opens a replacement on demand.
    pub fn discard(mut self) {
        self.discard = true;
    }
}

impl<B: Backend> Deref for Lease<B> {
    type Target = B::Resource;

    fn deref(&self) -> &Self::Target {
        self.resource
            .as_ref()
            .expect("lease holds its resource until dropped")
    }
}

impl<B: Backend> DerefMut for Lease<B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.resource
            .as_mut()
            .expect("lease holds its resource until dropped")
    }
}

impl<B: Backend> Drop for Lease<B> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.pool.give_back(resource, self.discard);
        }
    }
}

impl<B: Backend> std::fmt::Debug for Lease<B>
where
    B::Resource: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("resource", &self.resource)
            .finish()
    }
}
