//! Jilo Server
//!
//! Jiloエージェントを周期的にチェックし、結果をSQLiteに記録する監視サーバー

#![warn(missing_docs)]

/// 共通型定義（エラー型）
pub mod common;

/// 型定義（エージェント・観測結果）
pub mod types;

/// 認証機能（エージェント向けトークン署名）
pub mod auth;

/// プローブ実行（単一HTTP GET）
pub mod probe;

/// データベースアクセス
pub mod db;

/// エージェント監視（スケジューラー・一括チェック）
pub mod health;

/// サイクルイベントバス
pub mod events;

/// 協調的シャットダウン
pub mod shutdown;

/// ライブネスエンドポイント
pub mod server;

/// 設定管理（設定ファイル・環境変数ヘルパー）
pub mod config;

/// ロギング初期化ユーティリティ
pub mod logging;

/// 起動時の初期化
pub mod bootstrap;

/// CLI
pub mod cli;
