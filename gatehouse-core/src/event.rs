//! Event trait for inbound units of work.

/// A marker trait for events flowing through a [`Chain`].
///
/// Events must be `Send + Sync + 'static`: a chain borrows the event for the
/// whole pass, and many events are processed concurrently.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone)]
/// struct Ping { id: u64 }
///
/// impl Event for Ping {}
/// ```
///
/// [`Chain`]: crate::Chain
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Event",
    label = "must be `Send + Sync + 'static`",
    note = "Events must be thread-safe and static, and opt in with `impl Event for {Self} {}`."
)]
pub trait Event: Send + Sync + 'static {}

// Common Event implementations
impl Event for () {}
impl Event for String {}
impl Event for &'static str {}
impl<T: Event> Event for Box<T> {}
impl<T: Event> Event for std::sync::Arc<T> {}
