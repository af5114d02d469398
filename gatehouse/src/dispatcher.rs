//! Concurrent event dispatch with ordered shutdown.

use futures::{Stream, StreamExt};
use gatehouse_core::{BoxError, BoxFuture, Chain, Event, Outcome};
use std::{future::Future, pin::pin};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

type ShutdownStep = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Counters describing a finished [`Dispatcher::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Events taken from the stream.
    pub received: u64,
    /// Events that ended in [`Outcome::Handled`].
    pub handled: u64,
    /// Events that ended in [`Outcome::Unhandled`].
    pub unhandled: u64,
    /// Events whose chain returned an error.
    pub failed: u64,
    /// Event tasks that panicked.
    pub panicked: u64,
}

impl DispatchReport {
    fn record(&mut self, joined: Result<Result<Outcome, BoxError>, JoinError>) {
        match joined {
            Ok(Ok(Outcome::Handled)) => self.handled += 1,
            Ok(Ok(Outcome::Unhandled)) => self.unhandled += 1,
            Ok(Err(error)) => {
                self.failed += 1;
                warn!(%error, "event processing failed");
            }
            Err(error) => {
                self.panicked += 1;
                warn!(%error, "event task did not complete");
            }
        }
    }
}

/// Feeds a stream of events through a [`Chain`], one task per event.
///
/// A failing event is logged and counted; it never stops the stream. When the
/// stream ends, `run` waits for every in-flight event and then runs the
/// shutdown steps in registration order.
///
/// ```rust,ignore
/// let provider = ResourceProvider::new(pool);
/// let chain = Chain::builder()
///     .with(ActivityLogger::new())
///     .with(provider.clone())
///     .handler(Bot);
///
/// let report = Dispatcher::new(chain)
///     .on_shutdown(move || async move {
///         provider.close().await;
///     })
///     .run(updates)
///     .await;
/// ```
pub struct Dispatcher<E: Event> {
    chain: Chain<E>,
    shutdown: Vec<ShutdownStep>,
}

impl<E: Event> Dispatcher<E> {
    /// Create a dispatcher for `chain`.
    pub fn new(chain: Chain<E>) -> Self {
        Self {
            chain,
            shutdown: Vec::new(),
        }
    }

    /// Register a step to run after the last event has finished.
    pub fn on_shutdown<F, Fut>(mut self, step: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.shutdown
            .push(Box::new(move || -> BoxFuture<'static, ()> { Box::pin(step()) }));
        self
    }

    /// The chain events are run through.
    pub fn chain(&self) -> &Chain<E> {
        &self.chain
    }

    /// Dispatch every event of `events`, then shut down.
    pub async fn run<S>(self, events: S) -> DispatchReport
    where
        S: Stream<Item = E>,
    {
        let mut report = DispatchReport::default();
        let mut tasks = JoinSet::new();
        let mut events = pin!(events);

        while let Some(event) = events.next().await {
            report.received += 1;
            let chain = self.chain.clone();
            tasks.spawn(async move { chain.dispatch(event).await });

            while let Some(joined) = tasks.try_join_next() {
                report.record(joined);
            }
        }

        debug!(in_flight = tasks.len(), "event stream ended, draining");
        while let Some(joined) = tasks.join_next().await {
            report.record(joined);
        }

        for step in self.shutdown {
            step().await;
        }

        info!(
            received = report.received,
            handled = report.handled,
            failed = report.failed,
            "dispatcher stopped"
        );
        report
    }
}

impl<E: Event> std::fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("chain", &self.chain)
            .field("shutdown_steps", &self.shutdown.len())
            .finish()
    }
}
