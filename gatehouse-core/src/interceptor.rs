//! # Interceptors
//!
//! The unit of composition in a chain. Each interceptor wraps everything
//! after it: it receives the event, the per-event [`Context`], and a [`Next`]
//! continuation standing for the rest of the chain.
//!
//! # Use Cases
//!
//! - Observing events (activity logging, tracing)
//! - Publishing per-event resources into the context
//! - Short-circuiting events that should not reach the handler
//! - Running cleanup after the downstream chain returns or fails

use crate::{
    context::Context, error::BoxError, event::Event, handler::DynHandler, outcome::Outcome,
};
use std::{future::Future, pin::Pin, sync::Arc};

/// A boxed, sendable future, as returned by the object-safe traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A step of the chain that may observe, enrich, or stop an event.
///
/// # Static vs Dynamic Dispatch
///
/// This trait uses native `async fn` so implementations stay plain:
///
/// ```rust,ignore
/// impl Interceptor<Update> for Audit {
///     async fn intercept(
///         &self,
///         event: &Update,
///         ctx: &mut Context,
///         next: Next<'_, Update>,
///     ) -> Result<Outcome, BoxError> {
///         let result = next.run(event, ctx).await;
///         self.finished();
///         result
///     }
/// }
/// ```
///
/// A [`Chain`] stores interceptors as [`DynInterceptor`] trait objects, which
/// every `Interceptor` implements automatically.
///
/// [`Chain`]: crate::Chain
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Interceptor<{E}>`",
    label = "missing `Interceptor` implementation",
    note = "Interceptors must implement `intercept` for the specific event type `{E}`."
)]
pub trait Interceptor<E: Event>: Send + Sync + 'static {
    /// Called once per event. Delegate with `next.run(event, ctx)`.
    fn intercept(
        &self,
        event: &E,
        ctx: &mut Context,
        next: Next<'_, E>,
    ) -> impl Future<Output = Result<Outcome, BoxError>> + Send;
}

/// Dynamic object-safe version of [`Interceptor`].
pub trait DynInterceptor<E: Event>: Send + Sync + 'static {
    /// Called once per event (dynamic dispatch version).
    fn intercept_dyn<'a>(
        &'a self,
        event: &'a E,
        ctx: &'a mut Context,
        next: Next<'a, E>,
    ) -> BoxFuture<'a, Result<Outcome, BoxError>>;
}

// Blanket implementation: Any type implementing Interceptor implements DynInterceptor automatically.
impl<E: Event, T: Interceptor<E>> DynInterceptor<E> for T {
    fn intercept_dyn<'a>(
        &'a self,
        event: &'a E,
        ctx: &'a mut Context,
        next: Next<'a, E>,
    ) -> BoxFuture<'a, Result<Outcome, BoxError>> {
        Box::pin(self.intercept(event, ctx, next))
    }
}

/// The remainder of a chain, handed to each interceptor.
///
/// Calling [`run`](Next::run) invokes the next interceptor, or the terminal
/// handler once all interceptors have been passed. Not calling it
/// short-circuits the chain.
pub struct Next<'a, E: Event> {
    rest: &'a [Arc<dyn DynInterceptor<E>>],
    handler: &'a dyn DynHandler<E>,
}

impl<'a, E: Event> Next<'a, E> {
    pub(crate) fn new(rest: &'a [Arc<dyn DynInterceptor<E>>], handler: &'a dyn DynHandler<E>) -> Self {
        Self { rest, handler }
    }

    /// Run the rest of the chain.
    ///
    /// The context is reborrowed, so the calling interceptor can use it again
    /// once the returned future completes.
    pub fn run<'b>(self, event: &'b E, ctx: &'b mut Context) -> BoxFuture<'b, Result<Outcome, BoxError>>
    where
        'a: 'b,
    {
        match self.rest.split_first() {
            Some((head, rest)) => head.intercept_dyn(event, ctx, Next::new(rest, self.handler)),
            None => self.handler.call_dyn(event, ctx),
        }
    }

    /// Number of interceptors still ahead of the handler.
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

impl<E: Event> Clone for Next<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: Event> Copy for Next<'_, E> {}

impl<E: Event> std::fmt::Debug for Next<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.rest.len())
            .finish()
    }
}
