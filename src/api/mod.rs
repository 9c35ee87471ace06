pub mod auth;
pub mod handlers;
pub mod server;

use crate::device::DeviceTransport;
use crate::error::{AuthError, StoreError};
use crate::mining_core::MiningCoreTransport;
use crate::store::ConfigStore;
use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

pub use auth::require_auth;
pub use handlers::*;
pub use server::ApiServer;

/// 错误响应体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// HTTP 层错误，统一渲染为 `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(message)
            | ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message)
            | ApiError::Internal(message) => message,
        }
    }

    pub fn device_not_found() -> Self {
        ApiError::NotFound("Device not found".to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Validation { .. } | StoreError::NotConfigured | StoreError::AlreadyConfigured => {
                ApiError::BadRequest(error.to_string())
            }
            StoreError::Persistence { .. } => {
                error!("{}", error);
                ApiError::Internal("Failed to save configuration".to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let message = error.to_string();
        match error {
            AuthError::InvalidRequest | AuthError::AuthDisabled => ApiError::BadRequest(message),
            AuthError::InvalidCredentials | AuthError::MissingToken => ApiError::Unauthorized(message),
            AuthError::InvalidOrExpiredToken => ApiError::Forbidden(message),
            AuthError::ServerMisconfigured => ApiError::Internal(message),
            AuthError::InvalidExpiration { .. } | AuthError::Internal { .. } => {
                error!("Login failed: {}", message);
                ApiError::Internal("Login failed".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// API 应用状态
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigStore>,
    pub devices: Arc<dyn DeviceTransport>,
    pub mining_core: Arc<dyn MiningCoreTransport>,
    /// 前端构建产物目录
    pub static_dir: Option<PathBuf>,
}

/// 创建 API 路由
pub fn create_routes(state: AppState) -> Router {
    let gate = middleware::from_fn_with_state(state.clone(), require_auth);

    // 需要登录的路由（认证未启用时直接放行）
    let protected = Router::new()
        .route("/api/devices", get(list_devices))
        .route("/api/devices/:device_id/data", get(get_device_data))
        .route("/api/devices/:device_id/chart", get(get_device_chart))
        .route("/api/devices/:device_id/restart", post(restart_device))
        .route(
            "/api/devices/:device_id/config",
            get(get_device_config).put(update_device_config),
        )
        .route("/api/mining-core/data", get(get_mining_core_data))
        .route_layer(gate.clone());

    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/generate-secret", post(generate_secret))
        .route(
            "/api/config",
            get(get_config)
                .post(create_config)
                .merge(axum::routing::put(update_config).route_layer(gate)),
        )
        .route("/api/config/device-mappings", get(get_device_mappings))
        .route("/api/config/mining-mappings", get(get_mining_mappings))
        .merge(protected)
        .fallback(fallback)
        .with_state(state)
}
