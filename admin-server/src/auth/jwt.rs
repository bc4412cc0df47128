//! JWT 令牌服务
//!
//! 处理 JWT 令牌的生成、验证和解析。

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// JWT 密钥 (应至少 32 字节)
    pub secret: String,
    /// 令牌过期时间 (分钟)
    pub expiration_minutes: i64,
    /// 令牌签发者
    pub issuer: String,
    /// 令牌受众
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        let secret = load_jwt_secret().unwrap_or_else(|e| {
            #[cfg(debug_assertions)]
            {
                tracing::warn!("JWT configuration error: {}, using generated key", e);
                generate_printable_jwt_secret()
            }
            #[cfg(not(debug_assertions))]
            {
                panic!("FATAL: JWT_SECRET configuration failed: {}", e);
            }
        });

        Self {
            secret,
            expiration_minutes: std::env::var("JWT_EXPIRATION_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(7 * 24 * 60), // 默认 7 天
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "admin-server".to_string()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "admin-web".to_string()),
        }
    }
}

/// 存储在令牌中的 JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户 ID (Subject)
    pub sub: String,
    /// 用户名
    pub username: String,
    /// 是否超级管理员
    pub is_superuser: bool,
    /// 权限代码列表 (逗号分隔)
    pub permissions: String,
    /// 令牌类型
    pub token_type: String,
    /// 过期时间戳
    pub exp: i64,
    /// 签发时间戳
    pub iat: i64,
    /// 签发者
    pub iss: String,
    /// 受众
    pub aud: String,
}

/// JWT 错误
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// 生成可打印的安全 JWT 密钥 (用于开发环境)
pub fn generate_printable_jwt_secret() -> String {
    let allowed_chars =
        "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()-_=+";

    let rng = SystemRandom::new();
    let mut key = String::new();

    for _ in 0..64 {
        let mut byte = [0u8; 1];
        if rng.fill(&mut byte).is_err() {
            // 随机数生成失败时使用固定开发密钥
            return "AdminServerDevelopmentSecureKey2025!".to_string();
        }
        let idx = (byte[0] as usize) % allowed_chars.len();
        key.push(allowed_chars.as_bytes()[idx] as char);
    }

    key
}

/// 从环境变量安全地加载 JWT 密钥
fn load_jwt_secret() -> Result<String, JwtError> {
    match std::env::var("JWT_SECRET") {
        Ok(secret) => {
            if secret.len() < 32 {
                return Err(JwtError::ConfigError(
                    "JWT_SECRET must be at least 32 characters long".to_string(),
                ));
            }
            Ok(secret)
        }
        Err(_) => {
            #[cfg(debug_assertions)]
            {
                tracing::warn!(
                    "JWT_SECRET not set! Generating secure temporary key for development."
                );
                Ok(generate_printable_jwt_secret())
            }
            #[cfg(not(debug_assertions))]
            {
                Err(JwtError::ConfigError(
                    "JWT_SECRET environment variable must be set in production!".to_string(),
                ))
            }
        }
    }
}

/// JWT 令牌服务
#[derive(Debug, Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// 使用默认配置创建新的 JWT 服务
    pub fn new() -> Self {
        Self::with_config(JwtConfig::default())
    }

    /// 使用指定配置创建新的 JWT 服务
    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 为用户生成新令牌
    pub fn generate_token(
        &self,
        user_id: i64,
        username: &str,
        is_superuser: bool,
        permissions: &[String],
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            is_superuser,
            permissions: permissions.join(","),
            token_type: "access".to_string(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// 验证并解码令牌
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                ErrorKind::InvalidToken => JwtError::InvalidToken(e.to_string()),
                _ => JwtError::InvalidToken(format!("Token validation failed: {}", e)),
            }
        })?;

        Ok(token_data.claims)
    }

    /// 从 Authorization 头提取令牌
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }
}

impl Default for JwtService {
    fn default() -> Self {
        Self::new()
    }
}

/// 当前用户上下文 (从 JWT Claims 解析)
///
/// 由认证中间件创建，注入到请求扩展。
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// 用户 ID
    pub id: i64,
    /// 用户名
    pub username: String,
    /// 是否超级管理员
    pub is_superuser: bool,
    /// 权限代码列表
    pub permissions: Vec<String>,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        let permissions = if claims.permissions.is_empty() {
            vec![]
        } else {
            claims
                .permissions
                .split(',')
                .map(|s| s.to_string())
                .collect()
        };

        Self {
            id: claims.sub.parse().unwrap_or(0),
            username: claims.username,
            is_superuser: claims.is_superuser,
            permissions,
        }
    }
}

impl CurrentUser {
    /// 检查是否拥有指定权限代码
    ///
    /// 超级管理员拥有所有权限；其余按生成的权限代码精确匹配。
    pub fn has_permission(&self, code: &str) -> bool {
        if self.is_superuser {
            return true;
        }
        self.permissions.iter().any(|p| p == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> JwtService {
        JwtService::with_config(JwtConfig {
            secret: "test-secret-key-at-least-32-bytes!!".to_string(),
            expiration_minutes: 60,
            issuer: "admin-server".to_string(),
            audience: "admin-web".to_string(),
        })
    }

    #[test]
    fn token_roundtrip() {
        let service = test_service();
        let permissions = vec!["api.user.list.get".to_string(), "menu.users".to_string()];

        let token = service
            .generate_token(42, "alice", false, &permissions)
            .expect("Failed to generate token");
        let claims = service
            .validate_token(&token)
            .expect("Failed to validate token");

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.username, "alice");
        assert!(!claims.is_superuser);
        assert_eq!(claims.permissions, "api.user.list.get,menu.users");
    }

    #[test]
    fn current_user_permission_check() {
        let user = CurrentUser {
            id: 1,
            username: "alice".to_string(),
            is_superuser: false,
            permissions: vec!["api.user.list.get".to_string()],
        };

        assert!(user.has_permission("api.user.list.get"));
        assert!(!user.has_permission("api.user.delete.delete"));
    }

    #[test]
    fn superuser_has_all_permissions() {
        let user = CurrentUser {
            id: 1,
            username: "admin".to_string(),
            is_superuser: true,
            permissions: vec![],
        };

        assert!(user.has_permission("api.user.delete.delete"));
        assert!(user.has_permission("anything.at.all"));
    }

    #[test]
    fn tampered_token_rejected() {
        let service = test_service();
        let token = service.generate_token(1, "alice", false, &[]).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(service.validate_token(&tampered).is_err());
    }
}
