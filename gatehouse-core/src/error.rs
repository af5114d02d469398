//! Error types for gatehouse.
//!
//! - [`BoxError`] - The error currency of a chain. Whatever an interceptor or
//!   handler returns travels upward as the same boxed object, so callers can
//!   `downcast_ref` to the concrete type.
//! - [`ContextError`] - Lookups in the per-event [`Context`] that failed.
//!
//! [`Context`]: crate::Context

use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised when a required context value is not available.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// Nothing was published under the key.
    #[error("no value published under context key `{0}`")]
    Missing(&'static str),

    /// A value exists under the key but has a different type.
    #[error("context key `{key}` does not hold a `{expected}`")]
    TypeMismatch {
        /// The key that was looked up.
        key: &'static str,
        /// Name of the requested type.
        expected: &'static str,
    },
}
