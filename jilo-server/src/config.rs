//! Configuration management
//!
//! Loads the YAML configuration file and applies environment variable
//! overrides. Environment helpers fall back to deprecated variable names
//! with a warning log.

use crate::probe::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::types::Agent;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "./jilo-server.conf";

/// Default SQLite database path
pub const DEFAULT_DATABASE_PATH: &str = "./jilo-server.db";

/// Get an environment variable with fallback to a deprecated name
///
/// If only the deprecated name is set, its value is returned and a
/// deprecation warning is logged.
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback, parsing to a specific type
///
/// Unparsable values are ignored and the default is returned.
pub fn get_env_with_fallback_parse<T: std::str::FromStr>(
    new_name: &str,
    old_name: &str,
    default: T,
) -> T {
    get_env_with_fallback(new_name, old_name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// ログフィルタ文字列を取得
///
/// `JILO_LOG_LEVEL`（旧: `LOG_LEVEL`）、次に `RUST_LOG` を参照する。
pub fn get_log_filter() -> Option<String> {
    get_env_with_fallback("JILO_LOG_LEVEL", "LOG_LEVEL").or_else(|| std::env::var("RUST_LOG").ok())
}

/// モニター設定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// SQLiteデータベースのパス
    pub database_path: String,
    /// ライブネスエンドポイントを有効にするか
    pub health_check_enabled: bool,
    /// ライブネスエンドポイントのポート
    pub health_check_port: u16,
    /// ライブネスエンドポイントのパス
    pub health_check_endpoint: String,
    /// リクエストタイムアウト（秒）
    pub request_timeout_secs: u64,
    /// レスポンスボディを保存するか
    pub store_response_body: bool,
    /// ローテーションするJSONログの出力先
    pub log_dir: Option<PathBuf>,
    /// 監視対象（空ならデータベースから読み込む）
    pub agents: Vec<Agent>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            health_check_enabled: false,
            health_check_port: 8080,
            health_check_endpoint: "/health".to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            store_response_body: true,
            log_dir: None,
            agents: Vec::new(),
        }
    }
}

impl MonitorConfig {
    /// 設定ファイルを読み込み、環境変数で上書きする
    ///
    /// ファイルが読めない・解析できない場合はデフォルト値を使う。
    /// ロガー初期化前に呼ばれるため、フォールバックの理由は `LoadedConfig` に残し、
    /// 初期化後に `LoadedConfig::log_outcome` で出力する。
    pub fn load(requested: Option<&Path>) -> LoadedConfig {
        let mut issues = Vec::new();
        let (path, missing) = resolve_config_path(requested);
        issues.extend(missing);

        let mut config = Self::from_file(&path).unwrap_or_else(|issue| {
            issues.push(issue);
            Self::default()
        });
        config.apply_env_overrides();

        LoadedConfig {
            config,
            path,
            issues,
        }
    }

    /// 設定ファイルのみを読み込む
    pub fn from_file(path: &Path) -> Result<Self, ConfigIssue> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigIssue::Unreadable {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_yaml(&content).map_err(|e| ConfigIssue::Unparsable {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// YAML文字列から読み込む
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // 空ファイルは null として解析されるため、デフォルト扱いにする
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// 環境変数による上書き
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = get_env_with_fallback("JILO_DATABASE_PATH", "DATABASE_PATH") {
            self.database_path = path;
        }
        self.request_timeout_secs = get_env_with_fallback_parse(
            "JILO_REQUEST_TIMEOUT_SECS",
            "REQUEST_TIMEOUT_SECS",
            self.request_timeout_secs,
        );
    }

    /// リクエストタイムアウト
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 設定読み込み時にデフォルトへフォールバックした理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    /// 指定されたパスが存在しない
    MissingPath {
        /// 指定されたパス
        requested: PathBuf,
    },
    /// ファイルを読めない
    Unreadable {
        /// 設定ファイルのパス
        path: PathBuf,
        /// エラー内容
        error: String,
    },
    /// YAMLとして解析できない
    Unparsable {
        /// 設定ファイルのパス
        path: PathBuf,
        /// エラー内容
        error: String,
    },
}

impl ConfigIssue {
    /// ログへ出力
    pub fn log(&self) {
        match self {
            ConfigIssue::MissingPath { requested } => warn!(
                path = %requested.display(),
                default = DEFAULT_CONFIG_PATH,
                "Specified config file not found, falling back to the default path"
            ),
            ConfigIssue::Unreadable { path, error } => error!(
                path = %path.display(),
                error = %error,
                "Can't read config file, using defaults"
            ),
            ConfigIssue::Unparsable { path, error } => error!(
                path = %path.display(),
                error = %error,
                "Can't parse config file, using defaults"
            ),
        }
    }
}

/// 読み込み結果
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// 環境変数適用後の設定
    pub config: MonitorConfig,
    /// 読み込みを試みたパス
    pub path: PathBuf,
    /// フォールバックの理由
    pub issues: Vec<ConfigIssue>,
}

impl LoadedConfig {
    /// ファイルの内容をそのまま使えたか
    pub fn used_file(&self) -> bool {
        !self.issues.iter().any(|issue| {
            matches!(
                issue,
                ConfigIssue::Unreadable { .. } | ConfigIssue::Unparsable { .. }
            )
        })
    }

    /// 読み込み結果をログへ出力（ロガー初期化後に呼ぶ）
    pub fn log_outcome(&self) {
        for issue in &self.issues {
            issue.log();
        }
        if self.used_file() {
            info!(path = %self.path.display(), "Loaded configuration");
        }
    }
}

/// 使用する設定ファイルのパスを決定
///
/// 指定されたパスが存在しない場合はデフォルトパスと `MissingPath` を返す。
pub fn resolve_config_path(requested: Option<&Path>) -> (PathBuf, Option<ConfigIssue>) {
    match requested {
        Some(path) if path.exists() => (path.to_path_buf(), None),
        Some(path) => (
            PathBuf::from(DEFAULT_CONFIG_PATH),
            Some(ConfigIssue::MissingPath {
                requested: path.to_path_buf(),
            }),
        ),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), None),
    }
}
