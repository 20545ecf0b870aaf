//! Integration Test: SQLite永続化
//!
//! ファイルDBに対して初期化からチェック結果の記録までを通しで検証する。

use jilo_server::bootstrap;
use jilo_server::config::MonitorConfig;
use jilo_server::db::observations::{count_observations, list_observations};
use jilo_server::db::schema::{self, BootstrapMode};
use jilo_server::db::{ObservationStore, SqliteObservationStore};
use jilo_server::health::check_all_parallel;
use jilo_server::shutdown::ShutdownController;
use jilo_server::types::{Agent, AgentId, Observation};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::ValidAgentToken;

fn config_in(dir: &tempfile::TempDir) -> MonitorConfig {
    MonitorConfig {
        database_path: dir.path().join("jilo-server.db").display().to_string(),
        ..MonitorConfig::default()
    }
}

/// 一括チェックの結果がDBに1エージェント1行で記録される
#[tokio::test]
async fn test_check_all_records_to_sqlite() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jilo-agent/health"))
        .and(ValidAgentToken("s3cr3t"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"jvb\":\"ok\"}"))
        .mount(&mock)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(&dir);
    config.agents = vec![
        Agent::new(1, format!("{}/jilo-agent/health", mock.uri()), 5).with_secret("s3cr3t"),
        Agent::new(2, "http://127.0.0.1:1/health", 5),
        Agent::new(3, mock.uri(), -1),
    ];

    let ctx = bootstrap::initialize(
        &config,
        BootstrapMode::AutoCreate,
        ShutdownController::default(),
        || false,
    )
    .await
    .unwrap();

    let results = check_all_parallel(&ctx.scheduler, ctx.agents.clone()).await;
    assert_eq!(results.len(), 2);

    assert_eq!(count_observations(&ctx.pool, &AgentId::Numeric(1)).await.unwrap(), 1);
    assert_eq!(count_observations(&ctx.pool, &AgentId::Numeric(2)).await.unwrap(), 0);
    assert_eq!(count_observations(&ctx.pool, &AgentId::Numeric(3)).await.unwrap(), 0);

    let stored = list_observations(&ctx.pool, &AgentId::Numeric(1), 10)
        .await
        .unwrap();
    assert_eq!(stored[0].status_code, 200);
    assert_eq!(stored[0].response_content.as_deref(), Some("{\"jvb\":\"ok\"}"));
}

/// `store_response_body: false` の場合はボディを保存しない
#[tokio::test]
async fn test_response_body_can_be_disabled() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("payload"))
        .mount(&mock)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(&dir);
    config.store_response_body = false;
    config.agents = vec![Agent::new(7, mock.uri(), 1)];

    let ctx = bootstrap::initialize(
        &config,
        BootstrapMode::AutoCreate,
        ShutdownController::default(),
        || false,
    )
    .await
    .unwrap();
    ctx.scheduler.run_cycle(&ctx.agents[0]).await;

    let stored = list_observations(&ctx.pool, &AgentId::Numeric(7), 1)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].response_content, None);
}

/// 既存のDBを再度開いても記録は保持され、プロンプトも出ない
#[tokio::test]
async fn test_reopen_existing_database() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(&dir);
    config.agents = vec![Agent::new(1, mock.uri(), 1)];

    {
        let ctx = bootstrap::initialize(
            &config,
            BootstrapMode::AutoCreate,
            ShutdownController::default(),
            || false,
        )
        .await
        .unwrap();
        ctx.scheduler.run_cycle(&ctx.agents[0]).await;
        ctx.pool.close().await;
    }

    let ctx = bootstrap::initialize(
        &config,
        BootstrapMode::Prompt,
        ShutdownController::default(),
        || panic!("table already exists"),
    )
    .await
    .unwrap();

    assert_eq!(count_observations(&ctx.pool, &AgentId::Numeric(1)).await.unwrap(), 1);
}

/// 設定にエージェントが無い場合はJilo Webアプリのテーブルから読み込む
#[tokio::test]
async fn test_agents_loaded_from_database_tables() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);

    let pool = schema::connect(&config.database_path)
        .await
        .unwrap();
    sqlx::query("CREATE TABLE jilo_agent_types (id INTEGER PRIMARY KEY, endpoint TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "CREATE TABLE jilo_agents (id INTEGER PRIMARY KEY, url TEXT, secret_key TEXT, \
         check_period INTEGER, agent_type_id INTEGER)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO jilo_agent_types (id, endpoint) VALUES (1, '/jvb/health')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO jilo_agents (id, url, secret_key, check_period, agent_type_id) \
         VALUES (10, 'http://meet.example.com', 'k', 5, 1)",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let ctx = bootstrap::initialize(
        &config,
        BootstrapMode::AutoCreate,
        ShutdownController::default(),
        || false,
    )
    .await
    .unwrap();

    assert_eq!(ctx.agents.len(), 1);
    assert_eq!(ctx.agents[0].id, AgentId::Numeric(10));
    assert_eq!(ctx.agents[0].url, "http://meet.example.com/jvb/health");
    assert_eq!(ctx.agents[0].secret(), Some("k"));
    assert_eq!(ctx.agents[0].check_period, 5);
}

/// 多数のエージェントが同時に書き込んでも記録は失われない
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_share_file_database() {
    const AGENTS: i64 = 16;
    const RECORDS_PER_AGENT: usize = 25;

    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let pool = schema::connect(&config.database_path).await.unwrap();
    schema::create_tables(&pool).await.unwrap();
    let store = Arc::new(SqliteObservationStore::new(pool.clone()));

    let mut handles = Vec::new();
    for agent in 1..=AGENTS {
        for n in 0..RECORDS_PER_AGENT {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let observation = Observation {
                    agent_id: Some(AgentId::Numeric(agent)),
                    captured_at: chrono::Utc::now(),
                    status_code: 200,
                    elapsed_ms: n as u64,
                    body: Some(format!("agent {} record {}", agent, n)),
                };
                store.record(&observation).await
            }));
        }
    }

    let mut failures = 0;
    for handle in handles {
        if handle.await.unwrap().is_err() {
            failures += 1;
        }
    }
    assert_eq!(failures, 0);

    let mut total = 0;
    for agent in 1..=AGENTS {
        let count = count_observations(&pool, &AgentId::Numeric(agent))
            .await
            .unwrap();
        assert_eq!(count, RECORDS_PER_AGENT as i64);
        total += count;
    }
    assert_eq!(total, AGENTS * RECORDS_PER_AGENT as i64);
}
