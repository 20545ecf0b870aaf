//! プローブ観測結果の型定義

use super::AgentId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 1回のプローブで得られた観測結果
///
/// HTTPレスポンスを受信できた場合にのみ生成される（非2xxを含む）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    /// エージェントID（単一エージェント構成では `None`）
    pub agent_id: Option<AgentId>,
    /// 取得時刻
    pub captured_at: DateTime<Utc>,
    /// HTTPステータスコード
    pub status_code: u16,
    /// 経過時間（ミリ秒、切り捨て）
    pub elapsed_ms: u64,
    /// レスポンスボディ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}
