//! Integration Test: 障害の分離
//!
//! 記録失敗・プローブ失敗が後続サイクルや他のエージェントに影響しないことを検証する。

use std::time::Duration;

use jilo_server::events::CycleEvent;
use jilo_server::health::CycleOutcome;
use jilo_server::types::Agent;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{drain_events, test_scheduler, RecordingStore};

async fn mock_with(path_str: &str, status: u16) -> MockServer {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(status))
        .mount(&mock)
        .await;
    mock
}

/// 記録失敗はリトライされず、次のサイクルは通常通り記録される
#[tokio::test]
async fn test_persist_failure_does_not_block_later_cycles() {
    let mock = mock_with("/health", 200).await;
    let store = RecordingStore::new();
    store.fail_next(1);
    let (scheduler, shutdown) = test_scheduler(store.clone());
    let mut events = scheduler.events().subscribe();

    let handle = scheduler.spawn(vec![Agent::new(1, format!("{}/health", mock.uri()), 1)]);
    tokio::time::sleep(Duration::from_millis(1000)).await;
    shutdown.request_shutdown();
    handle.join().await;

    assert_eq!(store.rows().len(), 2);
    let persist_failures = drain_events(&mut events)
        .into_iter()
        .filter(|event| matches!(event, CycleEvent::PersistFailed { .. }))
        .count();
    assert_eq!(persist_failures, 1);
}

/// 1つのエージェントの記録失敗は他のエージェントに影響しない
#[tokio::test]
async fn test_persist_failure_is_isolated_per_agent() {
    let mock = mock_with("/health", 200).await;
    let url = format!("{}/health", mock.uri());
    let store = RecordingStore::new();
    store.fail_agent(1);
    let (scheduler, shutdown) = test_scheduler(store.clone());

    let handle = scheduler.spawn(vec![Agent::new(1, url.clone(), 1), Agent::new(2, url, 1)]);
    tokio::time::sleep(Duration::from_millis(1000)).await;
    shutdown.request_shutdown();
    handle.join().await;

    assert!(store.rows_for(1).is_empty());
    assert_eq!(store.rows_for(2).len(), 3);
}

/// 到達不能なエージェントは他のエージェントの記録を妨げない
#[tokio::test]
async fn test_unreachable_agent_is_isolated() {
    let mock = mock_with("/health", 200).await;
    let store = RecordingStore::new();
    let (scheduler, shutdown) = test_scheduler(store.clone());

    let handle = scheduler.spawn(vec![
        Agent::new(1, "http://127.0.0.1:1/health", 1),
        Agent::new(2, format!("{}/health", mock.uri()), 1),
    ]);
    assert_eq!(handle.len(), 2);
    tokio::time::sleep(Duration::from_millis(1000)).await;
    shutdown.request_shutdown();
    handle.join().await;

    assert!(store.rows_for(1).is_empty());
    assert_eq!(store.rows_for(2).len(), 3);
}

/// 不正なURLは要求構築の失敗として扱われる
#[tokio::test]
async fn test_malformed_url_is_probe_failure() {
    let store = RecordingStore::new();
    let (scheduler, _shutdown) = test_scheduler(store.clone());

    let outcome = scheduler
        .run_cycle(&Agent::new(9, "not a url", 1))
        .await;

    assert!(matches!(outcome, CycleOutcome::ProbeFailed { .. }));
    assert!(store.rows().is_empty());
}
