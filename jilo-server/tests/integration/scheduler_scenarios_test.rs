//! Integration Test: 周期監視シナリオ
//!
//! 1周期 = `TEST_PERIOD_UNIT` として、3周期分の監視結果を検証する。

use std::time::Duration;

use jilo_server::events::CycleEvent;
use jilo_server::types::Agent;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{drain_events, test_scheduler, RecordingStore, ValidAgentToken};

/// 3周期が経過した後、次のティックの前
const THREE_PERIODS: Duration = Duration::from_millis(1000);

/// 署名付きの正常応答エージェントは周期ごとに1件記録される
#[tokio::test]
async fn test_healthy_agent_records_every_period() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .and(ValidAgentToken("s1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{\"status\":\"ok\"}")
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&mock)
        .await;

    let store = RecordingStore::new();
    let (scheduler, shutdown) = test_scheduler(store.clone());
    let agent = Agent::new(1, format!("{}/health", mock.uri()), 1).with_secret("s1");

    let handle = scheduler.spawn(vec![agent]);
    tokio::time::sleep(THREE_PERIODS).await;
    shutdown.request_shutdown();
    handle.join().await;

    let rows = store.rows_for(1);
    assert_eq!(rows.len(), 3);
    for row in rows {
        assert_eq!(row.status_code, 200);
        assert!(row.elapsed_ms >= 50, "elapsed {} ms", row.elapsed_ms);
        assert!(row.elapsed_ms < 200, "elapsed {} ms", row.elapsed_ms);
        assert_eq!(row.body.as_deref(), Some("{\"status\":\"ok\"}"));
    }
}

/// 常にタイムアウトするエージェントは記録されず、毎周期失敗イベントが出る
#[tokio::test]
async fn test_timing_out_agent_records_nothing() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock)
        .await;

    let store = RecordingStore::new();
    let (scheduler, shutdown) = test_scheduler(store.clone());
    let mut events = scheduler.events().subscribe();

    let handle = scheduler.spawn(vec![Agent::new(2, mock.uri(), 1)]);
    tokio::time::sleep(THREE_PERIODS).await;
    shutdown.request_shutdown();
    handle.join().await;

    assert!(store.rows().is_empty());
    let failures = drain_events(&mut events)
        .into_iter()
        .filter(|event| matches!(event, CycleEvent::ProbeFailed { .. }))
        .count();
    assert_eq!(failures, 3);
}

/// 周期0のエージェントはタスクが起動されず、リクエストも送られない
#[tokio::test]
async fn test_zero_period_agent_never_runs() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock)
        .await;

    let store = RecordingStore::new();
    let (scheduler, shutdown) = test_scheduler(store.clone());
    let mut events = scheduler.events().subscribe();

    let handle = scheduler.spawn(vec![Agent::new(3, mock.uri(), 0)]);
    assert!(handle.is_empty());
    assert_eq!(handle.skipped().len(), 1);

    tokio::time::sleep(Duration::from_millis(500)).await;
    shutdown.request_shutdown();
    handle.join().await;

    assert!(store.rows().is_empty());
    let events = drain_events(&mut events);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        CycleEvent::AgentSkipped { check_period: 0, .. }
    ));
}

/// 非2xx応答も観測結果として記録される
#[tokio::test]
async fn test_error_status_is_recorded() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&mock)
        .await;

    let store = RecordingStore::new();
    let (scheduler, _shutdown) = test_scheduler(store.clone());

    let outcome = scheduler.run_cycle(&Agent::new(4, mock.uri(), 1)).await;

    assert!(outcome.is_recorded());
    let rows = store.rows_for(4);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status_code, 503);
}

/// 誤ったシークレットで署名されたリクエストは検証に通らない
#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(ValidAgentToken("expected"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock)
        .await;

    let store = RecordingStore::new();
    let (scheduler, _shutdown) = test_scheduler(store.clone());

    scheduler
        .run_cycle(&Agent::new(5, mock.uri(), 1).with_secret("wrong"))
        .await;
    scheduler
        .run_cycle(&Agent::new(5, mock.uri(), 1).with_secret("expected"))
        .await;

    let statuses: Vec<u16> = store.rows().iter().map(|row| row.status_code).collect();
    assert_eq!(statuses, vec![401, 200]);
}
