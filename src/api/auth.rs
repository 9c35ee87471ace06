use crate::api::{ApiError, AppState};
use crate::auth::{authorize, Session};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

/// 认证中间件
///
/// 认证未启用时直接放行；启用时校验 Bearer 令牌，并把会话放入请求扩展，
/// 处理器可通过 `Extension<Session>` 读取。
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let config = state.store.get().await;
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    match authorize(config.as_ref(), authorization) {
        Ok(Some(session)) => {
            debug!(user = %session.username, "Authenticated request");
            request.extensions_mut().insert::<Session>(session);
            Ok(next.run(request).await)
        }
        Ok(None) => Ok(next.run(request).await),
        Err(e) => {
            warn!(path = %request.uri().path(), "Authentication failed: {}", e);
            Err(ApiError::from(e))
        }
    }
}
