//! データベースアクセス層
//!
//! SQLiteベースのデータ永続化

/// スキーマ初期化（テーブル存在確認・作成確認プロンプト）
pub mod schema;

/// 観測結果ストア
pub mod observations;

/// エージェント一覧の読み込み（Jilo Webアプリのテーブル）
pub mod agents;

pub use observations::{ObservationStore, SqliteObservationStore};
