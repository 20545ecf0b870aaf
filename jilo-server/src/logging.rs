//! ログ初期化
//!
//! 標準出力へは人間が読める形式、`log_dir` 指定時は日次ローテーションのJSONファイルへも出力する。

use crate::config::get_log_filter;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// デフォルトのログフィルタ
pub const DEFAULT_LOG_FILTER: &str = "info,sqlx=warn";

/// ログファイル名の接頭辞
const LOG_FILE_PREFIX: &str = "jilo-server.log";

/// 環境変数からフィルタを構築する
///
/// 不正なフィルタ文字列はデフォルトに置き換える。
pub fn build_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// ロガーを初期化
///
/// ファイル出力を有効にした場合、返された `WorkerGuard` をプロセス終了まで保持すること。
pub fn init(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let env_filter = build_filter(get_log_filter().as_deref());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, LOG_FILE_PREFIX));
            let layer = fmt::layer().with_writer(writer).with_ansi(false).json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(fmt::layer().with_writer(std::io::stdout))
        .try_init()?;

    Ok(guard)
}
