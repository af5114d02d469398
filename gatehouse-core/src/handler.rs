//! # Terminal Handler
//!
//! The end of every chain, where business logic executes. By the time a
//! handler runs, the interceptors in front of it have already published
//! whatever they provide (a pooled connection, a resolved user) into the
//! [`Context`].
//!
//! # Usage
//!
//! ```rust,ignore
//! struct Greeter;
//!
//! impl Handler<Update> for Greeter {
//!     type Output = Result<(), BoxError>;
//!
//!     async fn call(&self, event: &Update, ctx: &mut Context) -> Self::Output {
//!         let mut conn = ctx.require::<Session<Postgres>>(SESSION_KEY)?.take()?;
//!         conn.execute("…").await?;
//!         Ok(())
//!     }
//! }
//! ```

use crate::{
    context::Context,
    error::BoxError,
    event::Event,
    interceptor::BoxFuture,
    outcome::{IntoOutcome, Outcome},
};
use std::future::Future;

/// The terminal endpoint of a chain.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle events of type `{E}`",
    label = "missing `Handler<{E}>` implementation",
    note = "Handlers must implement the `call` method for the event type `{E}`."
)]
pub trait Handler<E: Event>: Send + Sync + 'static {
    /// The output of the handler, usually `()`, `bool`, or a `Result`.
    type Output: IntoOutcome;

    /// Executes the handler logic.
    fn call(&self, event: &E, ctx: &mut Context) -> impl Future<Output = Self::Output> + Send;
}

/// Dynamic object-safe version of [`Handler`].
pub trait DynHandler<E: Event>: Send + Sync + 'static {
    /// Executes the handler and converts its output into an [`Outcome`].
    fn call_dyn<'a>(
        &'a self,
        event: &'a E,
        ctx: &'a mut Context,
    ) -> BoxFuture<'a, Result<Outcome, BoxError>>;
}

impl<E: Event, H: Handler<E>> DynHandler<E> for H {
    fn call_dyn<'a>(
        &'a self,
        event: &'a E,
        ctx: &'a mut Context,
    ) -> BoxFuture<'a, Result<Outcome, BoxError>> {
        Box::pin(async move { self.call(event, ctx).await.into_outcome() })
    }
}
