//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! 起動時エラー（`MonitorError`）はプロセスを終了させる。
//! プローブ単位のエラー（`ProbeError`）はそのサイクルだけをスキップし、
//! エージェントのタスクは次の周期へ進む。

use serde::Serialize;
use thiserror::Error;

/// モニター全体のエラー型
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// 必須テーブルの作成がユーザーに拒否された
    #[error("Table {0} is missing, but mandatory")]
    TableCreationDeclined(String),

    /// JWT error
    #[error("JWT error: {0}")]
    Jwt(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(String),
}

/// HTTPレスポンスを得られなかったプローブの失敗理由
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ProbeError {
    /// トークン署名失敗
    #[error("Failed to generate JWT token: {0}")]
    Signing(String),

    /// リクエスト構築失敗（不正なURLなど）
    #[error("Failed to create the HTTP request: {0}")]
    InvalidRequest(String),

    /// タイムアウト
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// 接続・DNSなどトランスポート層の失敗
    #[error("Failed to check the endpoint: {0}")]
    Transport(String),
}

impl From<MonitorError> for ProbeError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::Jwt(msg) => ProbeError::Signing(msg),
            other => ProbeError::Transport(other.to_string()),
        }
    }
}
