//! 引导与路由状态机
//!
//! 每次导航都从三个事实重新推导：配置是否存在、认证是否启用、本地会话是否有效。
//! 没有定时器，也不保存中间状态。

use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 导航结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteState {
    /// 尚无配置，需要先引导
    Unconfigured,
    /// 已启用认证但没有有效会话
    NeedsLogin,
    /// 可以展示仪表盘
    Ready,
}

/// 根据当前事实决定路由状态
pub fn resolve_route(config_present: bool, auth_enabled: bool, session_valid: bool) -> RouteState {
    if !config_present {
        RouteState::Unconfigured
    } else if auth_enabled && !session_valid {
        RouteState::NeedsLogin
    } else {
        RouteState::Ready
    }
}

/// 前端的几个页面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Bootstrap,
    Login,
    Dashboard,
}

impl RouteState {
    /// 该状态下应当展示的页面
    pub fn screen(self) -> Screen {
        match self {
            RouteState::Unconfigured => Screen::Bootstrap,
            RouteState::NeedsLogin => Screen::Login,
            RouteState::Ready => Screen::Dashboard,
        }
    }
}

/// 导航守卫，返回实际应展示的页面
///
/// 仪表盘受完整状态机约束；登录页在认证未启用时不可达，直接跳回仪表盘；
/// 引导页总是可达。
pub fn guard(requested: Screen, config_present: bool, auth_enabled: bool, session_valid: bool) -> Screen {
    let target = match requested {
        Screen::Dashboard => resolve_route(config_present, auth_enabled, session_valid).screen(),
        Screen::Login if !auth_enabled => Screen::Dashboard,
        other => other,
    };
    if target != requested {
        debug!(?requested, ?target, "Navigation redirected");
    }
    target
}

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// 客户端持有的会话令牌
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSession {
    token: String,
}

impl LocalSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// 令牌的过期时间；客户端没有密钥，只读取声明不校验签名
    pub fn expiry(&self) -> Option<i64> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        decode::<ExpiryClaim>(&self.token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims.exp)
            .ok()
    }

    /// 令牌存在且 `exp` 尚未到达
    pub fn is_valid(&self) -> bool {
        self.expiry()
            .map(|exp| exp > Utc::now().timestamp())
            .unwrap_or(false)
    }
}

/// 可选会话是否有效
pub fn session_valid(session: Option<&LocalSession>) -> bool {
    session.map(LocalSession::is_valid).unwrap_or(false)
}
