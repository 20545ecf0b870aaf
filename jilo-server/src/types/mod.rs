//! 型定義

/// 監視対象エージェント
pub mod agent;

/// プローブ観測結果
pub mod observation;

pub use agent::{Agent, AgentId};
pub use observation::Observation;
