//! Testing utilities for gatehouse.
//!
//! This module provides doubles for the seams of a chain, so interceptors and
//! handlers can be tested without a real bot transport or database.
//!
//! # Features
//!
//! - [`RecordingSink`] / [`FailingSink`]: activity sinks that record or refuse entries
//! - [`CountingHandler`] / [`FailingHandler`]: terminal handlers that count calls
//! - [`LeaseWatcher`]: a handler that checks for a published lease and measures concurrency
//! - [`MockBackend`]: a pool backend with controllable failures

use crate::{
    interceptors::{ActivityEntry, ActivitySink},
    pool::Backend,
};
use gatehouse_core::{BoxError, Context, ContextError, Event, Handler};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};
use thiserror::Error;

// ============================================================================
// Activity Sinks
// ============================================================================

/// A sink that keeps every entry it receives.
///
/// # Example
///
/// ```rust,ignore
/// let sink = RecordingSink::new();
/// let chain = Chain::builder()
///     .with(ActivityLogger::with_sink(sink.clone()))
///     .handler(CountingHandler::new());
///
/// chain.dispatch(update).await?;
/// assert_eq!(sink.count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    entries: Arc<Mutex<Vec<ActivityEntry>>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the recorded entries.
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Get the number of recorded entries.
    pub fn count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Clear all recorded entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl ActivitySink for RecordingSink {
    fn record(&self, entry: &ActivityEntry) -> Result<(), BoxError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// A sink whose writes always fail.
#[derive(Debug, Clone, Default)]
pub struct FailingSink {
    attempts: Arc<AtomicUsize>,
}

impl FailingSink {
    /// Create a new failing sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries the sink was asked to write.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ActivitySink for FailingSink {
    fn record(&self, _entry: &ActivityEntry) -> Result<(), BoxError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err("activity sink unavailable".into())
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// A handler that counts invocations.
///
/// # Example
///
/// ```rust,ignore
/// let counter = CountingHandler::new();
/// let chain = Chain::builder().handler(counter.clone());
///
/// chain.dispatch(event).await?;
/// assert_eq!(counter.count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    /// Create a new counting handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current count.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Reset the counter.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

impl<E: Event> Handler<E> for CountingHandler {
    type Output = ();

    async fn call(&self, _event: &E, _ctx: &mut Context) -> Self::Output {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// The error returned by [`FailingHandler`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("handler failed: {0}")]
pub struct HandlerFailure(pub String);

/// A handler that counts invocations and always fails with
/// [`HandlerFailure`].
#[derive(Debug, Clone)]
pub struct FailingHandler {
    message: String,
    count: Arc<AtomicUsize>,
}

impl FailingHandler {
    /// Create a handler failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of calls.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<E: Event> Handler<E> for FailingHandler {
    type Output = Result<(), HandlerFailure>;

    async fn call(&self, _event: &E, _ctx: &mut Context) -> Self::Output {
        self.count.fetch_add(1, Ordering::SeqCst);
        Err(HandlerFailure(self.message.clone()))
    }
}

// ============================================================================
// Lease Watcher
// ============================================================================

#[derive(Debug, Default)]
struct WatcherState {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_concurrent: AtomicUsize,
}

struct InFlight<'a>(&'a WatcherState);

impl<'a> InFlight<'a> {
    fn enter(state: &'a WatcherState) -> Self {
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_concurrent.fetch_max(now, Ordering::SeqCst);
        Self(state)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A handler that requires a value under a context key and records how many
/// calls overlap.
///
/// With a delay, each call holds its place for that long, which makes
/// capacity limits and cancellation observable.
///
/// # Example
///
/// ```rust,ignore
/// let watcher = LeaseWatcher::new(SESSION_KEY).with_delay(Duration::from_millis(10));
/// // dispatch many events concurrently...
/// assert!(watcher.max_concurrent() <= pool_max_size);
/// ```
#[derive(Debug, Clone)]
pub struct LeaseWatcher {
    key: Option<&'static str>,
    delay: Duration,
    state: Arc<WatcherState>,
}

impl LeaseWatcher {
    /// A watcher failing with [`ContextError::Missing`] when nothing is
    /// published under `key`.
    pub fn new(key: &'static str) -> Self {
        Self {
            key: Some(key),
            delay: Duration::ZERO,
            state: Arc::default(),
        }
    }

    /// A watcher that does not look at the context.
    pub fn unchecked() -> Self {
        Self {
            key: None,
            delay: Duration::ZERO,
            state: Arc::default(),
        }
    }

    /// Sleep for `delay` inside each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of calls started.
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Calls currently running.
    pub fn in_flight(&self) -> usize {
        self.state.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at once.
    pub fn max_concurrent(&self) -> usize {
        self.state.max_concurrent.load(Ordering::SeqCst)
    }
}

impl<E: Event> Handler<E> for LeaseWatcher {
    type Output = Result<(), BoxError>;

    async fn call(&self, _event: &E, ctx: &mut Context) -> Self::Output {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(key) = self.key.filter(|key| !ctx.contains_key(key)) {
            return Err(ContextError::Missing(key).into());
        }

        let _in_flight = InFlight::enter(&self.state);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(())
    }
}

// ============================================================================
// Mock Backend
// ============================================================================

/// Returned by [`MockBackend`] when it is set to refuse connections.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("mock backend refused the connection")]
pub struct BackendUnavailable;

/// The resource handed out by [`MockBackend`].
#[derive(Debug, PartialEq, Eq)]
pub struct MockConnection {
    /// Sequence number of the successful connect that opened it, from 1.
    pub id: u64,
    /// Free-form counter for handlers to bump.
    pub queries: u64,
}

/// A pool backend that counts connects and disconnects.
///
/// Connects can be made to fail with [`fail_connects_after`], and idle
/// resources can be made to fail their health check with [`set_healthy`].
///
/// [`fail_connects_after`]: MockBackend::fail_connects_after
/// [`set_healthy`]: MockBackend::set_healthy
#[derive(Debug)]
pub struct MockBackend {
    next_id: AtomicU64,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    budget: Mutex<Option<usize>>,
    healthy: AtomicBool,
    connect_delay: Duration,
}

impl MockBackend {
    /// A backend whose connects always succeed.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            budget: Mutex::new(None),
            healthy: AtomicBool::new(true),
            connect_delay: Duration::ZERO,
        }
    }

    /// Sleep for `delay` in every connect.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Let `successes` more connects through, then fail every connect with
    /// [`BackendUnavailable`].
    pub fn fail_connects_after(&self, successes: usize) {
        *self.budget.lock().unwrap() = Some(successes);
    }

    /// Let every connect through again.
    pub fn recover(&self) {
        *self.budget.lock().unwrap() = None;
    }

    /// Set the result of the idle health check.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Number of successful connects.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of disconnected resources.
    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    fn take_budget(&self) -> bool {
        let mut budget = self.budget.lock().unwrap();
        match budget.as_mut() {
            Some(0) => false,
            Some(remaining) => {
                *remaining -= 1;
                true
            }
            None => true,
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MockBackend {
    type Resource = MockConnection;

    async fn connect(&self, _url: &str) -> Result<MockConnection, BoxError> {
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        if !self.take_budget() {
            return Err(Box::new(BackendUnavailable));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            queries: 0,
        })
    }

    async fn check(&self, _resource: &mut MockConnection) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn disconnect(&self, _resource: MockConnection) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}
