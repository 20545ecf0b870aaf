//! 観測結果ストア
//!
//! 1回のプローブ成功につき1行を追記する。重複排除・リトライは行わない。
//! 並行書き込みの直列化はSQLiteとコネクションプールに任せる。

use crate::types::{AgentId, Observation};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteArguments, SqlitePool};
use sqlx::query::Query;
use sqlx::Sqlite;

/// 永続化済みの観測結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObservation {
    /// 行ID
    pub id: i64,
    /// エージェントID
    pub agent_id: Option<AgentId>,
    /// DBが付与した記録時刻
    pub timestamp: DateTime<Utc>,
    /// HTTPステータスコード
    pub status_code: i64,
    /// 経過時間（ミリ秒）
    pub response_time_ms: i64,
    /// レスポンスボディ
    pub response_content: Option<String>,
}

/// 観測結果の追記先
///
/// 全エージェントタスクから共有されるため `Send + Sync` を要求する。
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// 観測結果を1行追記し、行IDを返す
    async fn record(&self, observation: &Observation) -> Result<i64, sqlx::Error>;
}

/// SQLite実装
#[derive(Debug, Clone)]
pub struct SqliteObservationStore {
    pool: SqlitePool,
}

impl SqliteObservationStore {
    /// 新しいストアを作成
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ObservationStore for SqliteObservationStore {
    async fn record(&self, observation: &Observation) -> Result<i64, sqlx::Error> {
        record_observation(&self.pool, observation).await
    }
}

fn bind_agent_id<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    agent_id: Option<&'q AgentId>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match agent_id {
        Some(AgentId::Numeric(id)) => query.bind(*id),
        Some(AgentId::Named(name)) => query.bind(name.as_str()),
        None => query.bind(None::<i64>),
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// 観測結果を記録
pub async fn record_observation(
    pool: &SqlitePool,
    observation: &Observation,
) -> Result<i64, sqlx::Error> {
    let query = sqlx::query(
        r#"
        INSERT INTO jilo_agent_checks
            (agent_id, status_code, response_time_ms, response_content)
        VALUES (?, ?, ?, ?)
        "#,
    );

    let result = bind_agent_id(query, observation.agent_id.as_ref())
        .bind(i64::from(observation.status_code))
        .bind(to_i64(observation.elapsed_ms))
        .bind(observation.body.as_deref())
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// エージェントの観測結果を新しい順に取得
pub async fn list_observations(
    pool: &SqlitePool,
    agent_id: &AgentId,
    limit: i64,
) -> Result<Vec<StoredObservation>, sqlx::Error> {
    let query = sqlx::query_as::<Sqlite, ObservationRow>(
        r#"
        SELECT id, timestamp, status_code, response_time_ms, response_content
        FROM jilo_agent_checks
        WHERE agent_id = ?
        ORDER BY id DESC
        LIMIT ?
        "#,
    );
    let query = match agent_id {
        AgentId::Numeric(id) => query.bind(*id),
        AgentId::Named(name) => query.bind(name.as_str()),
    };

    let rows = query.bind(limit).fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .map(|row| row.into_stored(Some(agent_id.clone())))
        .collect())
}

/// エージェントの観測結果件数
pub async fn count_observations(pool: &SqlitePool, agent_id: &AgentId) -> Result<i64, sqlx::Error> {
    let query = sqlx::query_scalar::<Sqlite, i64>(
        "SELECT COUNT(*) FROM jilo_agent_checks WHERE agent_id = ?",
    );
    let query = match agent_id {
        AgentId::Numeric(id) => query.bind(*id),
        AgentId::Named(name) => query.bind(name.as_str()),
    };
    query.fetch_one(pool).await
}

// --- Internal Row Types ---

#[derive(sqlx::FromRow)]
struct ObservationRow {
    id: i64,
    timestamp: NaiveDateTime,
    status_code: i64,
    response_time_ms: i64,
    response_content: Option<String>,
}

impl ObservationRow {
    fn into_stored(self, agent_id: Option<AgentId>) -> StoredObservation {
        StoredObservation {
            id: self.id,
            agent_id,
            timestamp: self.timestamp.and_utc(),
            status_code: self.status_code,
            response_time_ms: self.response_time_ms,
            response_content: self.response_content,
        }
    }
}
