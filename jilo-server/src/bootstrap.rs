//! モニター初期化ロジック
//!
//! データベース接続、スキーマ確認、エージェント一覧の取得、スケジューラー構築を担当する。
//! ここで返るエラーはすべて起動時の致命的エラーとして扱う。

use crate::auth::TokenSigner;
use crate::common::error::MonitorError;
use crate::config::MonitorConfig;
use crate::db::schema::{self, BootstrapMode};
use crate::db::{agents, SqliteObservationStore};
use crate::health::AgentScheduler;
use crate::probe::ProbeExecutor;
use crate::shutdown::ShutdownController;
use crate::types::Agent;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

/// 初期化結果
pub struct InitContext {
    /// データベース接続プール
    pub pool: SqlitePool,
    /// 監視対象エージェント
    pub agents: Vec<Agent>,
    /// スケジューラー
    pub scheduler: AgentScheduler,
}

/// 初期化を実行する
///
/// `confirm` はテーブルが無く `BootstrapMode::Prompt` の場合にのみ呼ばれる。
pub async fn initialize<F>(
    config: &MonitorConfig,
    mode: BootstrapMode,
    shutdown: ShutdownController,
    confirm: F,
) -> Result<InitContext, MonitorError>
where
    F: FnOnce() -> bool,
{
    info!("Jilo Server v{}", env!("CARGO_PKG_VERSION"));

    let pool = schema::connect(&config.database_path).await?;
    info!(database = %config.database_path, "Connected to database");

    schema::ensure_schema(&pool, mode, confirm).await?;

    let agents = resolve_agents(config, &pool).await?;
    info!(count = agents.len(), "Agents loaded");

    let executor = ProbeExecutor::new(config.request_timeout())?;
    let store = Arc::new(SqliteObservationStore::new(pool.clone()));
    let scheduler = AgentScheduler::new(store, TokenSigner, executor, shutdown)
        .with_response_body(config.store_response_body);

    Ok(InitContext {
        pool,
        agents,
        scheduler,
    })
}

/// 監視対象を決定する
///
/// 設定ファイルに `agents` があればそれを使い、無ければデータベースから読み込む。
pub async fn resolve_agents(
    config: &MonitorConfig,
    pool: &SqlitePool,
) -> Result<Vec<Agent>, MonitorError> {
    if !config.agents.is_empty() {
        info!(count = config.agents.len(), "Using agents from the config file");
        return Ok(config.agents.clone());
    }
    agents::load_agents(pool).await
}
