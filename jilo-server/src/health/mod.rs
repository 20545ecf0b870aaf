//! エージェント監視
//!
//! エージェントごとの周期プローブと、起動時・CLI用の一括チェックを提供する。

/// エージェントごとの周期監視タスク
pub mod agent_scheduler;

/// 全エージェントの一括チェック
pub mod startup;

pub use agent_scheduler::{AgentScheduler, CycleOutcome, SchedulerHandle, SkippedAgent};
pub use startup::check_all_parallel;
