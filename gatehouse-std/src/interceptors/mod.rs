//! Bundled interceptors.
//!
//! A typical bot chain puts them in this order:
//!
//! ```rust,ignore
//! let chain = Chain::builder()
//!     .with(ActivityLogger::new())
//!     .with(TimeoutInterceptor::secs(30))
//!     .with(ResourceProvider::new(pool))
//!     .handler(handler);
//! ```

mod activity;
mod session;
mod timeout;

pub use activity::{ActivityEntry, ActivityLogger, ActivitySink, TracingSink};
pub use session::{ResourceProvider, SESSION_KEY, Session};
pub use timeout::{TimeoutError, TimeoutInterceptor};
