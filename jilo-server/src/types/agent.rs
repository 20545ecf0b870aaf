//! エージェント型定義
//!
//! 起動時に一度だけ列挙され、プロセス終了まで変化しない。

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// エージェント識別子
///
/// 設定ファイルでは整数・文字列のどちらも使える。DB由来のエージェントは整数。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentId {
    /// 整数ID（`jilo_agents.id`）
    Numeric(i64),
    /// 文字列ID
    Named(String),
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentId::Numeric(id) => write!(f, "{}", id),
            AgentId::Named(name) => f.write_str(name),
        }
    }
}

impl From<i64> for AgentId {
    fn from(id: i64) -> Self {
        AgentId::Numeric(id)
    }
}

impl From<&str> for AgentId {
    fn from(name: &str) -> Self {
        AgentId::Named(name.to_string())
    }
}

/// 監視対象エージェント
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// エージェントID
    pub id: AgentId,
    /// 完全なエンドポイントURL
    pub url: String,
    /// トークン署名用の共有シークレット
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// チェック周期（分）。0以下は無効
    pub check_period: i64,
}

impl Agent {
    /// 新しいエージェントを作成
    pub fn new(id: impl Into<AgentId>, url: impl Into<String>, check_period: i64) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            secret: None,
            check_period,
        }
    }

    /// シークレットを設定
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// 署名に使うシークレット
    ///
    /// 空文字列は「署名しない」と同義なので `None` を返す。
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }

    /// スケジュール対象かどうか
    pub fn is_schedulable(&self) -> bool {
        self.check_period > 0
    }

    /// 周期単位を掛けた実際のチェック間隔
    ///
    /// 無効な周期の場合は `None`。
    pub fn period(&self, unit: Duration) -> Option<Duration> {
        if !self.is_schedulable() {
            return None;
        }
        u32::try_from(self.check_period)
            .ok()
            .and_then(|n| unit.checked_mul(n))
    }

    /// ログ出力用のエンドポイント表記（host + path）
    pub fn display_target(&self) -> String {
        domain_and_path(&self.url)
    }
}

/// URLをログ向けに `host[:port] + path` へ整形する
///
/// パースできない場合は元の文字列を返す。
pub fn domain_and_path(full_url: &str) -> String {
    let Ok(url) = Url::parse(full_url) else {
        return full_url.to_string();
    };
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}{}", host, port, url.path()),
        None => format!("{}{}", host, url.path()),
    }
}
