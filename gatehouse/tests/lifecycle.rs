//! Lazy construction, shutdown and recovery of the shared pool.

mod common;

use common::{ann_says, assert_balanced, bot_chain, pool_config, provider};
use gatehouse::{
    Dispatcher, PoolState, ResourceError, SESSION_KEY,
    testing::{CountingHandler, LeaseWatcher, MockBackend, RecordingSink},
};
use std::{sync::Arc, time::Duration};

#[tokio::test]
async fn test_pool_is_built_on_first_event() {
    let backend = Arc::new(MockBackend::new());
    let provider = provider(&backend, pool_config(2, 4));
    let chain = bot_chain(&RecordingSink::new(), &provider, CountingHandler::new());

    assert_eq!(provider.pool().state(), PoolState::Uninitialized);
    assert_eq!(backend.connects(), 0);

    chain.dispatch(ann_says("hello")).await.unwrap();

    assert_eq!(provider.pool().state(), PoolState::Ready);
    assert_eq!(backend.connects(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_events_construct_one_pool() {
    let backend = Arc::new(MockBackend::new().with_connect_delay(Duration::from_millis(25)));
    let provider = provider(&backend, pool_config(3, 10));
    let watcher = LeaseWatcher::new(SESSION_KEY);
    let chain = bot_chain(&RecordingSink::new(), &provider, watcher.clone());

    let updates = futures::stream::iter((0..20).map(|_| ann_says("burst")));
    let report = Dispatcher::new(chain).run(updates).await;

    assert_eq!(report.received, 20);
    assert_eq!(report.handled, 20);
    assert_eq!(provider.pool().constructions(), 1);
    assert_eq!(watcher.calls(), 20);
    assert_balanced(&provider).await;
}

#[tokio::test]
async fn test_close_twice_is_noop() {
    let backend = Arc::new(MockBackend::new());
    let provider = provider(&backend, pool_config(2, 2));
    let chain = bot_chain(&RecordingSink::new(), &provider, CountingHandler::new());
    chain.dispatch(ann_says("hi")).await.unwrap();

    assert!(provider.close().await);
    assert!(!provider.close().await);

    assert_eq!(provider.pool().state(), PoolState::Closed);
    assert_eq!(backend.disconnects(), 2);

    let err = chain.dispatch(ann_says("late")).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResourceError>(),
        Some(ResourceError::Closed)
    ));
}

#[tokio::test]
async fn test_init_failure_is_retried_on_next_event() {
    let backend = Arc::new(MockBackend::new());
    backend.fail_connects_after(0);
    let provider = provider(&backend, pool_config(1, 1));
    let handler = CountingHandler::new();
    let chain = bot_chain(&RecordingSink::new(), &provider, handler.clone());

    let err = chain.dispatch(ann_says("too early")).await.unwrap_err();
    assert!(err.downcast_ref::<ResourceError>().unwrap().is_init());
    assert_eq!(provider.pool().state(), PoolState::Uninitialized);
    assert_eq!(handler.count(), 0);

    backend.recover();
    chain.dispatch(ann_says("on time")).await.unwrap();
    assert_eq!(handler.count(), 1);
    assert_eq!(provider.pool().constructions(), 1);
}

#[tokio::test]
async fn test_reset_after_close_builds_a_new_pool() {
    let backend = Arc::new(MockBackend::new());
    let provider = provider(&backend, pool_config(1, 1));
    let chain = bot_chain(&RecordingSink::new(), &provider, CountingHandler::new());

    chain.dispatch(ann_says("one")).await.unwrap();
    provider.close().await;
    assert!(provider.pool().reset().await);

    chain.dispatch(ann_says("two")).await.unwrap();
    assert_eq!(provider.pool().state(), PoolState::Ready);
    assert_eq!(provider.pool().constructions(), 2);
    assert_eq!(backend.connects(), 2);
}

#[tokio::test]
async fn test_dispatcher_closes_pool_on_shutdown() {
    let backend = Arc::new(MockBackend::new());
    let provider = provider(&backend, pool_config(1, 2));
    let chain = bot_chain(&RecordingSink::new(), &provider, CountingHandler::new());

    let closer = provider.clone();
    let report = Dispatcher::new(chain)
        .on_shutdown(move || async move {
            closer.close().await;
        })
        .run(futures::stream::iter([ann_says("a"), ann_says("b")]))
        .await;

    assert_eq!(report.handled, 2);
    assert_eq!(provider.pool().state(), PoolState::Closed);
    assert_eq!(backend.disconnects(), backend.connects());
}
