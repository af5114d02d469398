//! # gatehouse-std
//!
//! Standard implementations for the gatehouse interceptor pipeline.
//!
//! This crate provides:
//! - **Event model**: [`Update`] and its variants, with the [`ActivitySource`]
//!   capability used by the activity logger
//! - **Interceptors**: [`ActivityLogger`], [`ResourceProvider`],
//!   [`TimeoutInterceptor`]
//! - **Pooling**: [`Pool`], [`LazyPool`], [`Lease`] over a pluggable
//!   [`Backend`]
//! - **Testing**: recording sinks, counting handlers and a mock backend

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use gatehouse_core;

// Modules
pub mod error;
pub mod interceptors;
pub mod pool;
pub mod testing;
pub mod update;

pub use error::ResourceError;
pub use interceptors::{
    ActivityEntry, ActivityLogger, ActivitySink, ResourceProvider, SESSION_KEY, Session,
    TimeoutError, TimeoutInterceptor, TracingSink,
};
pub use pool::{Backend, LazyPool, Lease, Pool, PoolConfig, PoolState, PoolStats};
pub use update::{
    ActivitySource, CallbackQuery, InlineQuery, Message, OtherUpdate, Update, User, UserAction,
};
