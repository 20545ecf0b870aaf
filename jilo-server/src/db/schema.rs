// データベース接続とスキーマ初期化
//
// プロセス起動時に一度だけ実行し、プローブのホットパスには含めない。

use crate::common::error::MonitorError;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::io::{BufRead, Write};
use std::path::Path;
use std::str::FromStr;

/// 観測結果テーブル名
pub const CHECKS_TABLE: &str = "jilo_agent_checks";

const CREATE_CHECKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS jilo_agent_checks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    agent_id INTEGER,
    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
    status_code INTEGER,
    response_time_ms INTEGER,
    response_content TEXT
)
"#;

/// テーブル欠落時の挙動
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapMode {
    /// 確認なしで作成する（`--init-db`）
    AutoCreate,
    /// 作成前に確認する
    Prompt,
}

/// SQLiteデータベースへ接続する
///
/// `sqlite:` で始まる場合はURLとして、それ以外はファイルパスとして扱う。
/// ファイルと親ディレクトリが存在しない場合は作成する。
///
/// # Arguments
/// * `database_path` - データベースファイルパスまたはURL
///
/// # Returns
/// * `Ok(SqlitePool)` - 接続プール
/// * `Err(MonitorError)` - 接続失敗
pub async fn connect(database_path: &str) -> Result<SqlitePool, MonitorError> {
    let options = if database_path.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(database_path)
            .map_err(|e| MonitorError::Database(format!("Invalid database URL: {}", e)))?
    } else {
        // SQLiteファイルはディレクトリが存在しないと作成できないため、先に作成しておく
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    MonitorError::Database(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        SqliteConnectOptions::new().filename(database_path)
    };

    SqlitePool::connect_with(options.create_if_missing(true))
        .await
        .map_err(|e| MonitorError::Database(format!("Failed to connect to database: {}", e)))
}

/// テーブルの存在確認
pub async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool, MonitorError> {
    let name: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_optional(pool)
            .await
            .map_err(|e| MonitorError::Database(format!("Failed to inspect schema: {}", e)))?;

    Ok(name.as_deref() == Some(table))
}

/// テーブルを作成（存在する場合は何もしない）
pub async fn create_tables(pool: &SqlitePool) -> Result<(), MonitorError> {
    sqlx::query(CREATE_CHECKS_TABLE)
        .execute(pool)
        .await
        .map_err(|e| MonitorError::Database(format!("Failed to create table: {}", e)))?;
    Ok(())
}

/// スキーマを用意する
///
/// テーブルが無く `Prompt` モードの場合は `confirm` を呼び、拒否されたら
/// `TableCreationDeclined` を返す。
pub async fn ensure_schema<F>(
    pool: &SqlitePool,
    mode: BootstrapMode,
    confirm: F,
) -> Result<(), MonitorError>
where
    F: FnOnce() -> bool,
{
    if !table_exists(pool, CHECKS_TABLE).await? {
        if mode == BootstrapMode::Prompt && !confirm() {
            tracing::error!("Exiting because the table is missing, but mandatory.");
            return Err(MonitorError::TableCreationDeclined(CHECKS_TABLE.to_string()));
        }
        tracing::info!(table = CHECKS_TABLE, "Creating table");
    }

    create_tables(pool).await
}

/// 対話的にテーブル作成を確認する
///
/// `y` / `Y` のみを承諾とみなす。
pub fn prompt_table_creation<R: BufRead, W: Write>(mut input: R, mut output: W) -> bool {
    if write!(output, "Table not found. Do you want to create it? (y/n): ").is_err() {
        return false;
    }
    let _ = output.flush();

    let mut response = String::new();
    if input.read_line(&mut response).is_err() {
        return false;
    }
    matches!(response.trim(), "y" | "Y")
}
