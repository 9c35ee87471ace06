//! 认证模块
//!
//! 登录签发 HS256 令牌，受保护请求校验令牌。会话完全由令牌表示，服务端不保存
//! 任何状态：更换 `jwtSecret` 会使所有已签发的令牌失效。

pub mod expiration;
pub mod password;

use crate::error::AuthError;
use crate::store::AppConfig;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use expiration::{JwtExpiration, DEFAULT_JWT_EXPIRATION};
pub use password::{digest_password, hash_password, verify_password};

/// 令牌中固定的用户 ID，系统只有一个账户
pub const USER_ID: u32 = 1;

/// JWT 声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub id: u32,
    /// 签发时间
    pub iat: i64,
    /// 过期时间
    pub exp: i64,
}

/// 校验通过的会话身份
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub username: String,
    pub id: u32,
    pub issued_at: i64,
    pub expiry: i64,
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.username,
            id: claims.id,
            issued_at: claims.iat,
            expiry: claims.exp,
        }
    }
}

/// 登录请求，字段缺失由登录流程报告
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
    pub expires_in: JwtExpiration,
}

/// 登录
///
/// 依次检查：字段是否齐全、认证是否启用、用户名是否一致、密码是否匹配。
pub fn login(config: Option<&AppConfig>, request: &LoginRequest) -> Result<LoginResponse, AuthError> {
    let (username, password) = match (request.username.as_deref(), request.password.as_deref()) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            (username, password)
        }
        _ => return Err(AuthError::InvalidRequest),
    };

    let settings = match config {
        Some(config) if config.auth_enabled() => &config.authentication,
        _ => return Err(AuthError::AuthDisabled),
    };

    if settings.username.as_deref() != Some(username) {
        warn!("Login rejected for unknown user {}", username);
        return Err(AuthError::InvalidCredentials);
    }

    let stored_hash = settings.password_hash.as_deref().unwrap_or_default();
    if !verify_password(password, stored_hash) {
        warn!("Login rejected for user {}: wrong password", username);
        return Err(AuthError::InvalidCredentials);
    }

    let secret = settings.secret().ok_or(AuthError::ServerMisconfigured)?;
    let expires_in = settings.jwt_expiration.clone().unwrap_or_default();
    let token = issue_token(username, secret, &expires_in)?;

    info!("🔐 User {} logged in", username);
    Ok(LoginResponse {
        token,
        user: UserInfo {
            username: username.to_string(),
            id: USER_ID,
        },
        expires_in,
    })
}

/// 签发令牌
pub fn issue_token(username: &str, secret: &str, expires_in: &JwtExpiration) -> Result<String, AuthError> {
    let issued_at = Utc::now().timestamp();
    let claims = Claims {
        username: username.to_string(),
        id: USER_ID,
        iat: issued_at,
        exp: expires_in.expires_at(issued_at)?,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Internal { error: e.to_string() })
}

/// 用当前密钥校验令牌签名与有效期
pub fn verify_token(token: &str, secret: &str) -> Result<Session, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| Session::from(data.claims))
        .map_err(|e| {
            debug!("Token rejected: {}", e);
            AuthError::InvalidOrExpiredToken
        })
}

/// 从 `Authorization` 头中取出令牌：取第一个空格后的部分
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.split(' ').nth(1))
        .filter(|token| !token.is_empty())
}

/// 受保护请求的放行判定
///
/// 认证未启用时无条件放行并返回 `None`；启用时必须携带有效令牌。
pub fn authorize(config: Option<&AppConfig>, authorization: Option<&str>) -> Result<Option<Session>, AuthError> {
    let settings = match config {
        Some(config) if config.auth_enabled() => &config.authentication,
        _ => return Ok(None),
    };

    let token = bearer_token(authorization).ok_or(AuthError::MissingToken)?;
    let secret = settings.secret().ok_or(AuthError::ServerMisconfigured)?;
    verify_token(token, secret).map(Some)
}

/// 生成新的签名密钥：32 个随机字节的十六进制
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AuthenticationSettings, Device};
    use serde_json::Map;

    const SECRET: &str = "test-secret";

    fn config(enabled: bool) -> AppConfig {
        AppConfig {
            application_title: "Farm".to_string(),
            version: "2.0.0".to_string(),
            authentication: AuthenticationSettings {
                enabled,
                username: Some("admin".to_string()),
                password_hash: Some(password::hash_password_with_cost("s3cret", 4).unwrap()),
                jwt_secret: Some(SECRET.to_string()),
                jwt_expiration: Some(JwtExpiration::Span("2h".to_string())),
                extra: Map::new(),
            },
            devices: vec![Device::new("bitaxe1", "http://10.0.0.2")],
            mining_core: Default::default(),
            refresh_interval: 25,
            created_at: String::new(),
            updated_at: String::new(),
            extra: Map::new(),
        }
    }

    fn expired_token(secret: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            username: "admin".to_string(),
            id: USER_ID,
            iat: now - 7200,
            exp: now - 3600,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn test_login_success() {
        let config = config(true);
        let response = login(Some(&config), &LoginRequest::new("admin", "s3cret")).unwrap();

        assert_eq!(response.user, UserInfo { username: "admin".to_string(), id: 1 });
        assert_eq!(response.expires_in, JwtExpiration::Span("2h".to_string()));

        let session = verify_token(&response.token, SECRET).unwrap();
        assert_eq!(session.username, "admin");
        assert_eq!(session.id, 1);
        assert_eq!(session.expiry - session.issued_at, 7200);
    }

    #[test]
    fn test_login_failures() {
        let enabled = config(true);
        assert_eq!(
            login(Some(&enabled), &LoginRequest::new("admin", "wrong")),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            login(Some(&enabled), &LoginRequest::new("root", "s3cret")),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            login(Some(&enabled), &LoginRequest { username: Some("admin".into()), password: None }),
            Err(AuthError::InvalidRequest)
        );
        assert_eq!(
            login(Some(&enabled), &LoginRequest::new("", "s3cret")),
            Err(AuthError::InvalidRequest)
        );
    }

    #[test]
    fn test_login_disabled_regardless_of_credentials() {
        let disabled = config(false);
        assert_eq!(
            login(Some(&disabled), &LoginRequest::new("admin", "s3cret")),
            Err(AuthError::AuthDisabled)
        );
        assert_eq!(
            login(Some(&disabled), &LoginRequest::new("nobody", "x")),
            Err(AuthError::AuthDisabled)
        );
        assert_eq!(login(None, &LoginRequest::new("admin", "s3cret")), Err(AuthError::AuthDisabled));
    }

    #[test]
    fn test_default_expiration_is_one_hour() {
        let mut config = config(true);
        config.authentication.jwt_expiration = None;
        let response = login(Some(&config), &LoginRequest::new("admin", "s3cret")).unwrap();
        assert_eq!(response.expires_in, JwtExpiration::Span("1h".to_string()));

        let session = verify_token(&response.token, SECRET).unwrap();
        assert_eq!(session.expiry - session.issued_at, 3600);
    }

    #[test]
    fn test_overflowing_expiration_is_rejected() {
        let mut config = config(true);
        config.authentication.jwt_expiration = Some(JwtExpiration::Seconds(i64::MAX as u64));
        assert!(matches!(
            login(Some(&config), &LoginRequest::new("admin", "s3cret")),
            Err(AuthError::InvalidExpiration { .. })
        ));

        config.authentication.jwt_expiration = Some(JwtExpiration::Seconds(u64::MAX));
        assert!(matches!(
            login(Some(&config), &LoginRequest::new("admin", "s3cret")),
            Err(AuthError::InvalidExpiration { .. })
        ));

        assert!(matches!(
            issue_token("admin", SECRET, &JwtExpiration::Seconds(i64::MAX as u64)),
            Err(AuthError::InvalidExpiration { .. })
        ));
    }

    #[test]
    fn test_expired_and_rotated_tokens() {
        assert_eq!(
            verify_token(&expired_token(SECRET), SECRET),
            Err(AuthError::InvalidOrExpiredToken)
        );

        let token = issue_token("admin", SECRET, &JwtExpiration::default()).unwrap();
        assert!(verify_token(&token, SECRET).is_ok());
        assert_eq!(
            verify_token(&token, "rotated-secret"),
            Err(AuthError::InvalidOrExpiredToken)
        );
        assert_eq!(verify_token("garbage", SECRET), Err(AuthError::InvalidOrExpiredToken));
    }

    #[test]
    fn test_authorize_policy() {
        let disabled = config(false);
        assert_eq!(authorize(Some(&disabled), None), Ok(None));
        assert_eq!(authorize(Some(&disabled), Some("Bearer garbage")), Ok(None));
        assert_eq!(authorize(None, None), Ok(None));

        let enabled = config(true);
        assert_eq!(authorize(Some(&enabled), None), Err(AuthError::MissingToken));
        assert_eq!(authorize(Some(&enabled), Some("Bearer")), Err(AuthError::MissingToken));
        assert_eq!(
            authorize(Some(&enabled), Some("Bearer garbage")),
            Err(AuthError::InvalidOrExpiredToken)
        );

        let token = issue_token("admin", SECRET, &JwtExpiration::default()).unwrap();
        let header = format!("Bearer {}", token);
        let session = authorize(Some(&enabled), Some(&header)).unwrap().unwrap();
        assert_eq!(session.username, "admin");

        let mut no_secret = config(true);
        no_secret.authentication.jwt_secret = None;
        assert_eq!(
            authorize(Some(&no_secret), Some(&header)),
            Err(AuthError::ServerMisconfigured)
        );
    }

    #[test]
    fn test_generate_secret() {
        let first = generate_secret();
        let second = generate_secret();
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }
}
