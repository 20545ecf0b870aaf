// 認証モジュール

/// エージェント向けJWT生成・検証（jsonwebtoken）
pub mod jwt;

pub use jwt::TokenSigner;
