//! Integration tests for the BlockWatcher.
//! These tests require a chain node serving WS on localhost:8546.
use searcher::{
    tasks::watcher::BlockWatcher,
    test_utils::{setup_logging, setup_test_config},
};

#[tokio::test]
#[ignore = "integration test"]
async fn smoke_block_subscription() {
    setup_logging();
    let config = setup_test_config().unwrap();

    let watcher = BlockWatcher::new(&config).await.unwrap();
    let (mut events, _watcher_jh) = watcher.spawn();

    let first = events.recv().await.expect("no block event received");
    let second = events.recv().await.expect("no second block event received");

    // Heights arrive in provider order and never go backwards, though they
    // are allowed to skip.
    assert!(second.number > first.number);
}
