//! プローブサイクルのイベントバス
//!
//! 各エージェントタスクのサイクル結果（記録・失敗・スキップ）を購読者に
//! ブロードキャストする。ログだけに頼らず失敗経路を観測できるようにするための基盤。

use crate::types::AgentId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// イベントバスのチャネル容量
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// サイクルイベント
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum CycleEvent {
    /// 周期が無効なためスケジュールされなかった
    AgentSkipped {
        /// エージェントID
        agent_id: AgentId,
        /// 設定された周期
        check_period: i64,
    },
    /// プローブサイクル開始
    CycleStarted {
        /// エージェントID
        agent_id: AgentId,
        /// 開始時刻
        started_at: DateTime<Utc>,
    },
    /// 観測結果を記録した
    ObservationRecorded {
        /// エージェントID
        agent_id: AgentId,
        /// 行ID
        row_id: i64,
        /// HTTPステータスコード
        status_code: u16,
        /// 経過時間（ミリ秒）
        elapsed_ms: u64,
    },
    /// プローブ失敗（観測結果なし）
    ProbeFailed {
        /// エージェントID
        agent_id: AgentId,
        /// エラー内容
        error: String,
    },
    /// 観測結果の永続化に失敗した
    PersistFailed {
        /// エージェントID
        agent_id: AgentId,
        /// HTTPステータスコード
        status_code: u16,
        /// エラー内容
        error: String,
    },
    /// エージェントタスク終了
    AgentStopped {
        /// エージェントID
        agent_id: AgentId,
    },
}

/// サイクルイベントバス
#[derive(Clone)]
pub struct CycleEventBus {
    sender: broadcast::Sender<CycleEvent>,
}

impl Default for CycleEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleEventBus {
    /// 新しいイベントバスを作成
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// イベントバスを購読
    pub fn subscribe(&self) -> broadcast::Receiver<CycleEvent> {
        self.sender.subscribe()
    }

    /// イベントを発行
    ///
    /// 購読者がいない場合でもエラーにはならない
    pub fn publish(&self, event: CycleEvent) {
        let _ = self.sender.send(event);
    }
}

/// Arc でラップされたイベントバス
pub type SharedEventBus = Arc<CycleEventBus>;

/// 共有可能なイベントバスを作成
pub fn create_shared_event_bus() -> SharedEventBus {
    Arc::new(CycleEventBus::new())
}
