//! User activity logging.

use crate::update::{ActivitySource, UserAction};
use gatehouse_core::{BoxError, Context, Event, Interceptor, Next, Outcome};
use tracing::{debug, info};

const UNKNOWN_USERNAME: &str = "not specified";
const UNKNOWN_ACTION: &str = "unknown";

/// One line of the activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    /// Originating user id.
    pub user_id: i64,
    /// Username, or `"not specified"`.
    pub username: String,
    /// Action description, or `"unknown"`.
    pub action: String,
}

impl ActivityEntry {
    /// Build an entry from an extracted action. Returns `None` when the
    /// action has no user, since such events are not logged.
    pub fn from_action(action: UserAction) -> Option<Self> {
        Some(Self {
            user_id: action.user_id?,
            username: action
                .username
                .unwrap_or_else(|| UNKNOWN_USERNAME.to_owned()),
            action: action.action.unwrap_or_else(|| UNKNOWN_ACTION.to_owned()),
        })
    }
}

/// Destination for activity entries.
pub trait ActivitySink: Send + Sync + 'static {
    /// Write one entry.
    fn record(&self, entry: &ActivityEntry) -> Result<(), BoxError>;
}

/// Writes entries as `tracing` events under the `gatehouse::activity` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ActivitySink for TracingSink {
    fn record(&self, entry: &ActivityEntry) -> Result<(), BoxError> {
        info!(
            target: "gatehouse::activity",
            user_id = entry.user_id,
            username = %entry.username,
            action = %entry.action,
            "user activity"
        );
        Ok(())
    }
}

/// Logs who did what, then passes the event on.
///
/// Events without an originating user are not logged. A failing sink never
/// affects the event: the failure is reported at `debug` level and the chain
/// continues.
#[derive(Debug, Clone, Default)]
pub struct ActivityLogger<S = TracingSink> {
    sink: S,
}

impl ActivityLogger {
    /// A logger writing to [`TracingSink`].
    pub fn new() -> Self {
        Self { sink: TracingSink }
    }
}

impl<S: ActivitySink> ActivityLogger<S> {
    /// A logger writing to a custom sink.
    pub fn with_sink(sink: S) -> Self {
        Self { sink }
    }

    /// The configured sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn log(&self, action: UserAction) {
        let Some(entry) = ActivityEntry::from_action(action) else {
            return;
        };
        if let Err(error) = self.sink.record(&entry) {
            debug!(%error, user_id = entry.user_id, "activity sink failed, entry dropped");
        }
    }
}

impl<E, S> Interceptor<E> for ActivityLogger<S>
where
    E: Event + ActivitySource,
    S: ActivitySink,
{
    async fn intercept(
        &self,
        event: &E,
        ctx: &mut Context,
        next: Next<'_, E>,
    ) -> Result<Outcome, BoxError> {
        self.log(event.user_action());
        next.run(event, ctx).await
    }
}
