//! エージェント一覧の読み込み
//!
//! Jilo Webアプリが管理する `jilo_agents` / `jilo_agent_types` から
//! 監視対象を取得する。テーブルはこのプロセスでは作成しない。

use super::schema::table_exists;
use crate::common::error::MonitorError;
use crate::types::Agent;
use sqlx::SqlitePool;
use tracing::warn;

const AGENTS_TABLE: &str = "jilo_agents";
const AGENT_TYPES_TABLE: &str = "jilo_agent_types";

/// DBからエージェント一覧を取得
///
/// エンドポイントURLは `jilo_agents.url` と `jilo_agent_types.endpoint` を連結したもの。
/// テーブルが存在しない場合は空の一覧を返す。
pub async fn load_agents(pool: &SqlitePool) -> Result<Vec<Agent>, MonitorError> {
    let has_tables =
        table_exists(pool, AGENTS_TABLE).await? && table_exists(pool, AGENT_TYPES_TABLE).await?;
    if !has_tables {
        warn!(
            agents_table = AGENTS_TABLE,
            agent_types_table = AGENT_TYPES_TABLE,
            "Agent tables not found, no agents loaded from the database"
        );
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, AgentRow>(
        r#"
        SELECT ja.id, ja.url, ja.secret_key, ja.check_period, jat.endpoint
        FROM jilo_agents ja
        JOIN jilo_agent_types jat ON ja.agent_type_id = jat.id
        ORDER BY ja.id
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| MonitorError::Database(format!("Failed to fetch the agents: {}", e)))?;

    Ok(rows.into_iter().map(Agent::from).collect())
}

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: i64,
    url: String,
    secret_key: Option<String>,
    check_period: Option<i64>,
    endpoint: Option<String>,
}

impl From<AgentRow> for Agent {
    fn from(row: AgentRow) -> Self {
        let url = format!("{}{}", row.url, row.endpoint.unwrap_or_default());
        Agent {
            id: row.id.into(),
            url,
            secret: row.secret_key,
            check_period: row.check_period.unwrap_or(0),
        }
    }
}
