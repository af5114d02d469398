//! # Resource Pooling
//!
//! A bounded pool of reusable resources (typically database connections)
//! built on top of a pluggable [`Backend`].
//!
//! - [`Pool`] bounds concurrent leases with a semaphore, keeps released
//!   resources idle for reuse, and opens new ones on demand.
//! - [`Lease`] is the RAII guard for one leased resource. It goes back to the
//!   pool exactly once, on [`Lease::release`] or on drop.
//! - [`LazyPool`] defers pool construction to first use and coordinates
//!   concurrent first users so only one construction happens.
//!
//! ```rust,ignore
//! let pool = Arc::new(LazyPool::new(Postgres, PoolConfig::new(url)));
//!
//! let lease = pool.get().await?.acquire().await?;
//! lease.execute("select 1").await?;
//! lease.release();
//! ```

mod bounded;
mod config;
mod lazy;
mod lease;

pub use bounded::{Pool, PoolStats};
pub use config::PoolConfig;
pub use lazy::{LazyPool, PoolState};
pub use lease::Lease;

use gatehouse_core::BoxError;
use std::future::Future;

/// The driver a pool opens its resources through.
///
/// Only `connect` is required. `check` runs on idle resources before they are
/// handed out again; `disconnect` runs when the pool drops a resource.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a pool `Backend`",
    label = "missing `Backend` implementation",
    note = "Backends must implement `connect` to open new resources."
)]
pub trait Backend: Send + Sync + 'static {
    /// The pooled resource, e.g. a database connection.
    type Resource: Send + 'static;

    /// Open a new resource.
    fn connect(&self, url: &str) -> impl Future<Output = Result<Self::Resource, BoxError>> + Send;

    /// Validate an idle resource before reuse. Invalid ones are disconnected
    /// and replaced.
    fn check(&self, resource: &mut Self::Resource) -> impl Future<Output = bool> + Send {
        let _ = resource;
        async { true }
    }

    /// Close a resource the pool no longer keeps.
    fn disconnect(&self, resource: Self::Resource) -> impl Future<Output = ()> + Send {
        async move { drop(resource) }
    }
}
