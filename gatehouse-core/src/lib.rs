//! # gatehouse-core
//!
//! Core traits for the gatehouse interceptor pipeline.
//!
//! This crate has minimal dependencies and is meant to be imported by
//! interceptors and handlers that don't need the bundled implementations in
//! `gatehouse-std`.
//!
//! # Pipeline Shape
//!
//! Every inbound event travels through one [`Chain`]:
//!
//! ```text
//! Chain::run ─► Interceptor 1 ─► Interceptor 2 ─► … ─► Handler
//!          ◄───────────────◄───────────────◄──────────┘
//! ```
//!
//! ## Interceptors ([`Interceptor`])
//!
//! An interceptor receives the event, the per-event [`Context`], and a [`Next`]
//! continuation. It may:
//!
//! - inspect or mutate the context before delegating,
//! - short-circuit by returning without calling [`Next::run`],
//! - wrap the delegated call to run cleanup after it returns or fails.
//!
//! ## Handler ([`Handler`])
//!
//! The terminal point of the chain, where business logic executes. Its output
//! converts into an [`Outcome`] through [`IntoOutcome`].
//!
//! ## Context ([`Context`])
//!
//! A string-keyed, type-erased map created fresh for each event and owned
//! exclusively by that event's flow.
//!
//! # Error Types
//!
//! - [`BoxError`] - Error currency of the chain; propagated unchanged
//! - [`ContextError`] - Missing or mistyped context values

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod chain;
mod context;
mod error;
mod event;
mod handler;
mod interceptor;
mod outcome;

// Re-exports
pub use chain::{Chain, ChainBuilder};
pub use context::Context;
pub use error::{BoxError, ContextError};
pub use event::Event;
pub use handler::{DynHandler, Handler};
pub use interceptor::{BoxFuture, DynInterceptor, Interceptor, Next};
pub use outcome::{IntoOutcome, Outcome};
