//! エージェントスケジューラー
//!
//! 有効なエージェント1件につき1つの独立したタスクを起動し、
//! 署名 → プローブ → 記録 → 次の周期境界まで待機、を繰り返す。
//!
//! - 周期は `interval` の境界に固定され、記録処理の所要時間で前後しない
//! - 遅いプローブの後は直ちに次のプローブを開始し、取りこぼしたティックは積み上げない
//! - シャットダウンは新しいサイクルの開始前と待機中に確認し、実行中のサイクルは中断しない

use crate::auth::TokenSigner;
use crate::common::error::ProbeError;
use crate::db::ObservationStore;
use crate::events::{create_shared_event_bus, CycleEvent, SharedEventBus};
use crate::probe::{ProbeExecutor, ProbeOutcome};
use crate::shutdown::ShutdownController;
use crate::types::{Agent, AgentId, Observation};
use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// デフォルトの周期単位（設定値は分）
pub const DEFAULT_PERIOD_UNIT: Duration = Duration::from_secs(60);

/// 1サイクルの結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// 観測結果を記録した
    Recorded {
        /// 観測結果
        observation: Observation,
        /// 行ID
        row_id: i64,
    },
    /// レスポンスは得られたが記録に失敗した（再試行しない）
    PersistFailed {
        /// 破棄された観測結果
        observation: Observation,
        /// エラー内容
        error: String,
    },
    /// レスポンスを得られなかった
    ProbeFailed {
        /// 失敗理由
        error: ProbeError,
    },
}

impl CycleOutcome {
    /// 観測結果が永続化されたか
    pub fn is_recorded(&self) -> bool {
        matches!(self, CycleOutcome::Recorded { .. })
    }
}

/// スケジュールから除外されたエージェント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAgent {
    /// エージェントID
    pub agent_id: AgentId,
    /// 設定された周期
    pub check_period: i64,
}

/// 起動済みタスクのハンドル
pub struct SchedulerHandle {
    tasks: Vec<(AgentId, JoinHandle<()>)>,
    skipped: Vec<SkippedAgent>,
}

impl SchedulerHandle {
    /// 除外されたエージェント
    pub fn skipped(&self) -> &[SkippedAgent] {
        &self.skipped
    }

    /// 起動したタスク数
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// 起動したタスクが無いか
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// 全タスクの終了を待ち、異常終了したエージェントIDを返す
    ///
    /// シャットダウン要求後に呼ぶと、実行中のサイクルが終わるまで待機する。
    pub async fn join(self) -> Vec<AgentId> {
        let mut aborted = Vec::new();
        for (agent_id, handle) in self.tasks {
            if let Err(e) = handle.await {
                error!(agent_id = %agent_id, error = %e, "Agent task join error");
                aborted.push(agent_id);
            }
        }
        aborted
    }
}

/// エージェントスケジューラー
///
/// タスク間で共有するのはストア・署名器・HTTPクライアント・シャットダウン信号のみ。
#[derive(Clone)]
pub struct AgentScheduler {
    store: Arc<dyn ObservationStore>,
    signer: TokenSigner,
    executor: ProbeExecutor,
    shutdown: ShutdownController,
    events: SharedEventBus,
    period_unit: Duration,
    store_response_body: bool,
}

impl AgentScheduler {
    /// 新しいスケジューラーを作成
    pub fn new(
        store: Arc<dyn ObservationStore>,
        signer: TokenSigner,
        executor: ProbeExecutor,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            store,
            signer,
            executor,
            shutdown,
            events: create_shared_event_bus(),
            period_unit: DEFAULT_PERIOD_UNIT,
            store_response_body: true,
        }
    }

    /// 周期単位を設定
    pub fn with_period_unit(mut self, unit: Duration) -> Self {
        self.period_unit = unit;
        self
    }

    /// レスポンスボディを保存するか
    pub fn with_response_body(mut self, keep: bool) -> Self {
        self.store_response_body = keep;
        self
    }

    /// イベントバス
    pub fn events(&self) -> &SharedEventBus {
        &self.events
    }

    /// 周期単位
    pub fn period_unit(&self) -> Duration {
        self.period_unit
    }

    /// 有効なエージェントごとにタスクを起動
    ///
    /// 周期が0以下のエージェントはタスクを起動せずにスキップする。
    pub fn spawn(&self, agents: Vec<Agent>) -> SchedulerHandle {
        let mut tasks = Vec::with_capacity(agents.len());
        let mut skipped = Vec::new();

        for agent in agents {
            match agent.period(self.period_unit) {
                Some(period) => {
                    let scheduler = self.clone();
                    let agent_id = agent.id.clone();
                    let handle = tokio::spawn(async move {
                        scheduler.agent_loop(agent, period).await;
                    });
                    tasks.push((agent_id, handle));
                }
                None => {
                    warn!(
                        agent_id = %agent.id,
                        target = %agent.display_target(),
                        check_period = agent.check_period,
                        "Agent has an invalid check period, skipping it"
                    );
                    self.events.publish(CycleEvent::AgentSkipped {
                        agent_id: agent.id.clone(),
                        check_period: agent.check_period,
                    });
                    skipped.push(SkippedAgent {
                        agent_id: agent.id,
                        check_period: agent.check_period,
                    });
                }
            }
        }

        info!(
            spawned = tasks.len(),
            skipped = skipped.len(),
            "Agent scheduler started"
        );

        SchedulerHandle { tasks, skipped }
    }

    /// エージェントごとの監視ループ
    async fn agent_loop(&self, agent: Agent, period: Duration) {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let timeout = self.executor.timeout_for_period(period);

        info!(
            agent_id = %agent.id,
            target = %agent.display_target(),
            period_secs = period.as_secs_f64(),
            "Agent monitor started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.wait() => break,
                _ = timer.tick() => {}
            }

            // サイクル内のパニックはこのエージェントの1サイクルに閉じ込める
            let cycle = AssertUnwindSafe(self.cycle(&agent, timeout)).catch_unwind();
            if cycle.await.is_err() {
                error!(agent_id = %agent.id, "Probe cycle panicked, waiting for next tick");
            }
        }

        info!(agent_id = %agent.id, "Agent monitor stopped");
        self.events.publish(CycleEvent::AgentStopped { agent_id: agent.id });
    }

    /// 1サイクルを実行（設定済みのリクエストタイムアウトを使用）
    pub async fn run_cycle(&self, agent: &Agent) -> CycleOutcome {
        self.cycle(agent, self.executor.request_timeout()).await
    }

    async fn cycle(&self, agent: &Agent, timeout: Duration) -> CycleOutcome {
        self.events.publish(CycleEvent::CycleStarted {
            agent_id: agent.id.clone(),
            started_at: Utc::now(),
        });
        debug!(agent_id = %agent.id, url = %agent.url, "Checking agent");

        let token = match agent.secret().map(|secret| self.signer.sign(secret)) {
            Some(Ok(token)) => Some(token),
            Some(Err(e)) => return self.probe_failed(agent, e.into()),
            None => None,
        };

        let outcome: ProbeOutcome = self.executor.probe(&agent.url, token.as_deref(), timeout).await;
        let observation =
            match outcome.into_observation(Some(agent.id.clone()), self.store_response_body) {
                Ok(observation) => observation,
                Err(error) => return self.probe_failed(agent, error),
            };

        info!(
            agent_id = %agent.id,
            status_code = observation.status_code,
            elapsed_ms = observation.elapsed_ms,
            "Agent check completed"
        );

        match self.store.record(&observation).await {
            Ok(row_id) => {
                self.events.publish(CycleEvent::ObservationRecorded {
                    agent_id: agent.id.clone(),
                    row_id,
                    status_code: observation.status_code,
                    elapsed_ms: observation.elapsed_ms,
                });
                CycleOutcome::Recorded {
                    observation,
                    row_id,
                }
            }
            Err(e) => {
                error!(
                    agent_id = %agent.id,
                    error = %e,
                    "Failed to insert data into the database"
                );
                self.events.publish(CycleEvent::PersistFailed {
                    agent_id: agent.id.clone(),
                    status_code: observation.status_code,
                    error: e.to_string(),
                });
                CycleOutcome::PersistFailed {
                    observation,
                    error: e.to_string(),
                }
            }
        }
    }

    fn probe_failed(&self, agent: &Agent, error: ProbeError) -> CycleOutcome {
        warn!(
            agent_id = %agent.id,
            target = %agent.display_target(),
            error = %error,
            "Check for agent failed, skipping database insert"
        );
        self.events.publish(CycleEvent::ProbeFailed {
            agent_id: agent.id.clone(),
            error: error.to_string(),
        });
        CycleOutcome::ProbeFailed { error }
    }
}
