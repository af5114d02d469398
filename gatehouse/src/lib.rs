//! # gatehouse - Interceptor Pipeline for Event-Driven Services
//!
//! `gatehouse` runs each inbound event through an ordered chain of
//! interceptors ending in a handler. The bundled interceptors log user
//! activity and lease a pooled resource (typically a database connection)
//! for the duration of each event, building the pool lazily on first use.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gatehouse::prelude::*;
//!
//! struct Bot;
//!
//! impl Handler<Update> for Bot {
//!     type Output = Result<(), BoxError>;
//!
//!     async fn call(&self, update: &Update, ctx: &mut Context) -> Self::Output {
//!         let mut conn = ctx.require::<Session<Postgres>>(SESSION_KEY)?.take()?;
//!         // ...
//!         Ok(())
//!     }
//! }
//!
//! let settings = Settings::load("gatehouse.yaml")?;
//! gatehouse::telemetry::init(&settings.log_level)?;
//!
//! let provider = ResourceProvider::from_backend(Postgres, settings.pool);
//! let chain = Chain::builder()
//!     .with(ActivityLogger::new())
//!     .with(provider.clone())
//!     .handler(Bot);
//!
//! Dispatcher::new(chain)
//!     .on_shutdown(move || async move {
//!         provider.close().await;
//!     })
//!     .run(updates)
//!     .await;
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod config;
mod dispatcher;
#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use dispatcher::{DispatchReport, Dispatcher};

pub use gatehouse_core::{
    // Errors
    BoxError,
    BoxFuture,
    // Chain
    Chain,
    ChainBuilder,
    // Context
    Context,
    ContextError,
    DynHandler,
    DynInterceptor,
    Event,
    // Handler
    Handler,
    // Interceptor
    Interceptor,
    IntoOutcome,
    Next,
    Outcome,
};

pub use gatehouse_std::{
    // Interceptors
    ActivityEntry,
    ActivityLogger,
    ActivitySink,
    // Event model
    ActivitySource,
    // Pooling
    Backend,
    CallbackQuery,
    InlineQuery,
    LazyPool,
    Lease,
    Message,
    OtherUpdate,
    Pool,
    PoolConfig,
    PoolState,
    PoolStats,
    ResourceError,
    ResourceProvider,
    SESSION_KEY,
    Session,
    TimeoutError,
    TimeoutInterceptor,
    TracingSink,
    Update,
    User,
    UserAction,
};

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use gatehouse_std::testing::*;
}

/// Prelude module - common imports for gatehouse.
///
/// # Usage
///
/// ```rust,ignore
/// use gatehouse::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ActivityLogger,
        Backend,
        // Errors
        BoxError,
        // Core traits
        Chain,
        Context,
        Dispatcher,
        Event,
        Handler,
        Interceptor,
        LazyPool,
        Lease,
        Next,
        Outcome,
        PoolConfig,
        ResourceError,
        ResourceProvider,
        SESSION_KEY,
        Session,
        Update,
        config::Settings,
    };
}
