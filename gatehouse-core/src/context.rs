//! # Per-Event Context
//!
//! A mutable, string-keyed map that travels with one event through the chain.
//! Interceptors publish values (a leased connection, a resolved user) under
//! well-known keys; downstream interceptors and the handler read them back
//! with typed accessors.
//!
//! A context is created fresh for each event and dropped when the chain
//! returns. Values are type-erased, so every accessor names the expected type:
//!
//! ```rust,ignore
//! ctx.insert("locale", String::from("en"));
//!
//! let locale: &String = ctx.require("locale")?;
//! ```

use crate::error::ContextError;
use std::{any::Any, collections::HashMap, fmt};

/// Per-event mutable state shared along one chain pass.
#[derive(Default)]
pub struct Context {
    values: HashMap<&'static str, Box<dyn Any + Send>>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `value` under `key`.
    ///
    /// Returns the previous value if it had the same type. A previous value of
    /// a different type is dropped.
    pub fn insert<T: Send + 'static>(&mut self, key: &'static str, value: T) -> Option<T> {
        self.values
            .insert(key, Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    /// Borrow the value under `key` if it exists and has type `T`.
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Mutably borrow the value under `key` if it exists and has type `T`.
    pub fn get_mut<T: 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    /// Like [`get`](Self::get), but reports why the lookup failed.
    pub fn require<T: 'static>(&self, key: &'static str) -> Result<&T, ContextError> {
        let value = self.values.get(key).ok_or(ContextError::Missing(key))?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| ContextError::TypeMismatch {
                key,
                expected: std::any::type_name::<T>(),
            })
    }

    /// Like [`get_mut`](Self::get_mut), but reports why the lookup failed.
    pub fn require_mut<T: 'static>(&mut self, key: &'static str) -> Result<&mut T, ContextError> {
        let value = self.values.get_mut(key).ok_or(ContextError::Missing(key))?;
        value
            .downcast_mut::<T>()
            .ok_or_else(|| ContextError::TypeMismatch {
                key,
                expected: std::any::type_name::<T>(),
            })
    }

    /// Take the value under `key` out of the context.
    ///
    /// A value of another type is left in place and `None` is returned.
    pub fn remove<T: 'static>(&mut self, key: &str) -> Option<T> {
        if !self.values.get(key)?.is::<T>() {
            return None;
        }
        self.values
            .remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    /// Returns `true` if anything is published under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of published values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the published keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut ctx = Context::new();
        assert!(ctx.insert("answer", 42_u32).is_none());

        assert_eq!(ctx.get::<u32>("answer"), Some(&42));
        assert_eq!(ctx.get::<i64>("answer"), None);
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_insert_returns_previous_value_of_same_type() {
        let mut ctx = Context::new();
        ctx.insert("name", String::from("ann"));
        let previous = ctx.insert("name", String::from("bob"));

        assert_eq!(previous.as_deref(), Some("ann"));
        assert_eq!(ctx.get::<String>("name").map(String::as_str), Some("bob"));
    }

    #[test]
    fn test_get_mut_modifies_in_place() {
        let mut ctx = Context::new();
        ctx.insert("hits", 1_usize);
        *ctx.get_mut::<usize>("hits").unwrap() += 1;

        assert_eq!(ctx.get::<usize>("hits"), Some(&2));
    }

    #[test]
    fn test_require_reports_missing_and_mismatch() {
        let mut ctx = Context::new();
        assert_eq!(
            ctx.require::<u8>("session").unwrap_err(),
            ContextError::Missing("session")
        );

        ctx.insert("session", "not a connection");
        let err = ctx.require::<u8>("session").unwrap_err();
        assert!(matches!(err, ContextError::TypeMismatch { key: "session", .. }));
        assert!(err.to_string().contains("u8"));
    }

    #[test]
    fn test_remove_leaves_mistyped_value() {
        let mut ctx = Context::new();
        ctx.insert("session", 7_i32);

        assert_eq!(ctx.remove::<String>("session"), None);
        assert!(ctx.contains_key("session"));

        assert_eq!(ctx.remove::<i32>("session"), Some(7));
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_debug_lists_keys() {
        let mut ctx = Context::new();
        ctx.insert("session", ());
        assert!(format!("{ctx:?}").contains("session"));
    }
}
