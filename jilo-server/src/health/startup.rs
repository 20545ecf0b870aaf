//! 一括チェック
//!
//! 全エージェントを並列に1回ずつチェックする。`check` サブコマンドで使用。

use super::{AgentScheduler, CycleOutcome};
use crate::types::{Agent, AgentId};
use tracing::{error, info};

/// 全エージェントを並列に1回チェック
///
/// 周期が無効なエージェントは `spawn` と同じ基準で対象外とする。結果は入力と同じ順序で返す。
pub async fn check_all_parallel(
    scheduler: &AgentScheduler,
    agents: Vec<Agent>,
) -> Vec<(AgentId, CycleOutcome)> {
    let unit = scheduler.period_unit();
    let agents: Vec<Agent> = agents
        .into_iter()
        .filter(|agent| agent.period(unit).is_some())
        .collect();

    if agents.is_empty() {
        info!("No agents to check");
        return Vec::new();
    }

    info!(count = agents.len(), "Starting parallel check for all agents");

    let mut handles = Vec::with_capacity(agents.len());
    for agent in agents {
        let scheduler = scheduler.clone();
        handles.push(tokio::spawn(async move {
            let outcome = scheduler.run_cycle(&agent).await;
            (agent.id, outcome)
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    let mut recorded = 0;
    for handle in handles {
        match handle.await {
            Ok((agent_id, outcome)) => {
                if outcome.is_recorded() {
                    recorded += 1;
                }
                results.push((agent_id, outcome));
            }
            Err(e) => error!(error = %e, "Agent check task join error"),
        }
    }

    info!(
        total = results.len(),
        recorded = recorded,
        "Parallel check completed"
    );

    results
}
