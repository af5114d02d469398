//! Deadline for the downstream chain.

use gatehouse_core::{BoxError, Context, Event, Interceptor, Next, Outcome};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::warn;

/// Returned when the rest of the chain did not finish in time.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("event processing timed out after {0:?}")]
pub struct TimeoutError(pub Duration);

/// Bounds everything after it with a deadline.
///
/// On expiry the downstream future is dropped, which cancels whatever it was
/// waiting on. Resources published into the context by later interceptors
/// stay there until the context itself is dropped.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutInterceptor {
    duration: Duration,
}

impl TimeoutInterceptor {
    /// Create a new timeout interceptor.
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Deadline in whole seconds.
    pub fn secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Deadline in milliseconds.
    pub fn millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// The configured deadline.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl<E: Event> Interceptor<E> for TimeoutInterceptor {
    async fn intercept(
        &self,
        event: &E,
        ctx: &mut Context,
        next: Next<'_, E>,
    ) -> Result<Outcome, BoxError> {
        match timeout(self.duration, next.run(event, ctx)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?self.duration, "event processing timed out");
                Err(Box::new(TimeoutError(self.duration)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingHandler, LeaseWatcher};
    use gatehouse_core::Chain;

    #[tokio::test(start_paused = true)]
    async fn test_slow_handler_times_out() {
        let watcher = LeaseWatcher::unchecked().with_delay(Duration::from_secs(10));
        let chain = Chain::builder()
            .with(TimeoutInterceptor::secs(1))
            .handler(watcher.clone());

        let err = chain.dispatch(()).await.unwrap_err();

        assert_eq!(
            err.downcast_ref::<TimeoutError>(),
            Some(&TimeoutError(Duration::from_secs(1)))
        );
        assert_eq!(watcher.calls(), 1);
        assert_eq!(watcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_fast_handler_passes_through() {
        let handler = CountingHandler::new();
        let chain = Chain::builder()
            .with(TimeoutInterceptor::millis(500))
            .handler(handler.clone());

        assert!(chain.dispatch(()).await.unwrap().is_handled());
        assert_eq!(handler.count(), 1);
    }
}
