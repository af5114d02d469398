#![allow(dead_code)]

use gatehouse::{
    ActivityLogger, CallbackQuery, Chain, Handler, LazyPool, Message, PoolConfig,
    ResourceProvider, Update, User, testing::{MockBackend, RecordingSink},
};
use std::sync::Arc;

// ============================================================================
// Test Events
// ============================================================================

pub fn message(user: Option<User>, message_id: i64, text: &str) -> Update {
    Update::Message(Message {
        message_id,
        from: user,
        text: Some(text.to_owned()),
    })
}

pub fn ann_says(text: &str) -> Update {
    message(Some(User::new(42, "ann")), 1, text)
}

pub fn anonymous_callback(data: &str) -> Update {
    Update::CallbackQuery(CallbackQuery {
        id: "cb-1".to_owned(),
        from: None,
        data: Some(data.to_owned()),
    })
}

// ============================================================================
// Pipeline Fixtures
// ============================================================================

pub fn pool_config(min: usize, max: usize) -> PoolConfig {
    PoolConfig::new("mock://bot").with_bounds(min, max)
}

pub fn provider(backend: &Arc<MockBackend>, config: PoolConfig) -> ResourceProvider<MockBackend> {
    ResourceProvider::new(Arc::new(LazyPool::with_shared_backend(
        Arc::clone(backend),
        config,
    )))
}

/// Logger, then provider, then `handler`: the usual bot chain.
pub fn bot_chain<H: Handler<Update>>(
    sink: &RecordingSink,
    provider: &ResourceProvider<MockBackend>,
    handler: H,
) -> Chain<Update> {
    Chain::builder()
        .with(ActivityLogger::with_sink(sink.clone()))
        .with(provider.clone())
        .handler(handler)
}

pub async fn assert_balanced(provider: &ResourceProvider<MockBackend>) {
    let pool = provider
        .pool()
        .current()
        .await
        .expect("pool should have been constructed");
    let stats = pool.stats();
    assert_eq!(stats.acquired, stats.released, "leases out: {stats:?}");
    assert_eq!(stats.leased, 0);
}
