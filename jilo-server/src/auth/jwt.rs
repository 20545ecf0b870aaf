// エージェント向けJWT生成と検証（jsonwebtoken実装）

use crate::common::error::MonitorError;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// エージェントトークンのクレーム
///
/// 発行時刻のみを持つ。有効期限の判断は受信側エージェントに委ねる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentClaims {
    /// 発行時刻（Unix秒）
    pub iat: i64,
}

/// JWTトークンを生成
///
/// # Arguments
/// * `secret` - エージェントの共有シークレット
/// * `issued_at` - 発行時刻
///
/// # Returns
/// * `Ok(String)` - HS256署名済みJWT
/// * `Err(MonitorError)` - 生成失敗
pub fn create_agent_jwt(secret: &str, issued_at: DateTime<Utc>) -> Result<String, MonitorError> {
    let claims = AgentClaims {
        iat: issued_at.timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| MonitorError::Jwt(format!("Failed to create JWT: {}", e)))
}

/// JWTトークンを検証
///
/// 署名とアルゴリズムのみ検証する（`exp` は要求しない）。
pub fn verify_agent_jwt(token: &str, secret: &str) -> Result<AgentClaims, MonitorError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;

    decode::<AgentClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| MonitorError::Jwt(format!("Failed to verify JWT: {}", e)))
}

/// 全エージェントタスクで共有するトークン署名器
///
/// 状態を持たないため並行呼び出しに対して安全。
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSigner;

impl TokenSigner {
    /// 現在時刻で署名
    pub fn sign(&self, secret: &str) -> Result<String, MonitorError> {
        self.sign_at(secret, Utc::now())
    }

    /// 指定時刻で署名
    pub fn sign_at(&self, secret: &str, issued_at: DateTime<Utc>) -> Result<String, MonitorError> {
        create_agent_jwt(secret, issued_at)
    }
}
