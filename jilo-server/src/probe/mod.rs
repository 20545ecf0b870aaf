//! プローブ実行
//!
//! エージェントのエンドポイントへ1回だけ認証付きGETを送り、
//! ステータスコード・経過時間・ボディを返す。永続化は行わない。
//!
//! 経過時間はリクエスト送出からボディの読み取り完了までを計測する。

use crate::common::error::{MonitorError, ProbeError};
use crate::types::{AgentId, Observation};
use chrono::Utc;
use reqwest::{Client, Url};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// デフォルトのリクエストタイムアウト（秒）
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// 接続タイムアウト（秒）
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// プローブ結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// レスポンス全体を取得できた
    Complete {
        /// HTTPステータスコード
        status: u16,
        /// 経過時間（ミリ秒）
        elapsed_ms: u64,
        /// レスポンスボディ
        body: String,
    },
    /// ステータスは取得できたがボディの読み取りに失敗した
    Partial {
        /// HTTPステータスコード
        status: u16,
        /// 経過時間（ミリ秒）
        elapsed_ms: u64,
        /// 読み取りエラー
        error: String,
    },
    /// レスポンスを受信できなかった
    Failed(ProbeError),
}

impl ProbeOutcome {
    /// ステータスコード（失敗時は番兵値の0）
    pub fn status_code(&self) -> u16 {
        match self {
            ProbeOutcome::Complete { status, .. } | ProbeOutcome::Partial { status, .. } => {
                *status
            }
            ProbeOutcome::Failed(_) => 0,
        }
    }

    /// 経過時間（失敗時は番兵値の0）
    pub fn elapsed_ms(&self) -> u64 {
        match self {
            ProbeOutcome::Complete { elapsed_ms, .. }
            | ProbeOutcome::Partial { elapsed_ms, .. } => *elapsed_ms,
            ProbeOutcome::Failed(_) => 0,
        }
    }

    /// 観測結果へ変換
    ///
    /// レスポンスを受信していない場合は失敗理由を返す。
    pub fn into_observation(
        self,
        agent_id: Option<AgentId>,
        keep_body: bool,
    ) -> Result<Observation, ProbeError> {
        let (status_code, elapsed_ms, body) = match self {
            ProbeOutcome::Complete {
                status,
                elapsed_ms,
                body,
            } => (status, elapsed_ms, keep_body.then_some(body)),
            ProbeOutcome::Partial {
                status, elapsed_ms, ..
            } => (status, elapsed_ms, None),
            ProbeOutcome::Failed(error) => return Err(error),
        };

        Ok(Observation {
            agent_id,
            captured_at: Utc::now(),
            status_code,
            elapsed_ms,
            body,
        })
    }
}

/// 経過時間をミリ秒に切り捨てる
fn whole_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// プローブ実行器
///
/// 内部の `reqwest::Client` は接続プールを持ち、全タスクで共有できる。
#[derive(Debug, Clone)]
pub struct ProbeExecutor {
    client: Client,
    request_timeout: Duration,
}

impl ProbeExecutor {
    /// 新しいプローブ実行器を作成
    pub fn new(request_timeout: Duration) -> Result<Self, MonitorError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| MonitorError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            request_timeout,
        })
    }

    /// 設定済みのリクエストタイムアウト
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// 周期に応じた実効タイムアウト
    ///
    /// 1回のプローブが周期全体を占有しないよう、周期の半分を上限とする。
    pub fn timeout_for_period(&self, period: Duration) -> Duration {
        let half = period / 2;
        if half.is_zero() {
            self.request_timeout
        } else {
            self.request_timeout.min(half)
        }
    }

    /// 単一のGETプローブを実行
    pub async fn probe(&self, url: &str, token: Option<&str>, timeout: Duration) -> ProbeOutcome {
        debug!(url = %url, "Sending HTTP GET request to agent");

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to create the HTTP request");
                return ProbeOutcome::Failed(ProbeError::InvalidRequest(e.to_string()));
            }
        };

        let mut request = self.client.get(parsed).timeout(timeout);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let start = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let error = if e.is_timeout() {
                    ProbeError::Timeout(whole_millis(timeout))
                } else if e.is_builder() {
                    ProbeError::InvalidRequest(e.to_string())
                } else {
                    ProbeError::Transport(e.to_string())
                };
                warn!(url = %url, error = %error, "Failed to check the endpoint");
                return ProbeOutcome::Failed(error);
            }
        };

        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(bytes) => {
                let elapsed_ms = whole_millis(start.elapsed());
                debug!(
                    url = %url,
                    status_code = status,
                    elapsed_ms = elapsed_ms,
                    "Received response"
                );
                ProbeOutcome::Complete {
                    status,
                    elapsed_ms,
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                }
            }
            Err(e) => {
                let elapsed_ms = whole_millis(start.elapsed());
                warn!(
                    url = %url,
                    status_code = status,
                    error = %e,
                    "Failed to read the response body"
                );
                ProbeOutcome::Partial {
                    status,
                    elapsed_ms,
                    error: e.to_string(),
                }
            }
        }
    }
}
