use crate::api::{ApiError, AppState};
use crate::auth::{self, LoginRequest, LoginResponse};
use crate::device::{self, generate_chart, parse_hours, ChartSeries, DeviceStatusEntry};
use crate::mining_core::{fetch_snapshot, MiningCoreSnapshot};
use crate::store::{AppConfig, Device};
use crate::telemetry::{now_iso, Availability, ProcessedCategories, TelemetryProcessor};
use crate::utils::ValueFormatter;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, Request, State},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info, warn};

/// 请求体解析失败同样以 `{error}` 返回
fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SecretResponse {
    pub secret: String,
}

/// 登录
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let config = state.store.get().await;
    let response = auth::login(config.as_ref(), &request)?;
    Ok(Json(response))
}

/// 生成新的 JWT 密钥
pub async fn generate_secret() -> Json<SecretResponse> {
    Json(SecretResponse {
        secret: auth::generate_secret(),
    })
}

/// 读取应用配置，未配置时返回 `{}`
pub async fn get_config(State(state): State<AppState>) -> Response {
    match state.store.get().await {
        Some(config) => Json(config).into_response(),
        None => Json(json!({})).into_response(),
    }
}

/// 引导创建配置
pub async fn create_config(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AppConfig>, ApiError> {
    let config = state.store.create(json_body(payload)?).await?;
    info!("✅ Bootstrap completed for {}", config.application_title);
    Ok(Json(config))
}

/// 浅合并更新配置
pub async fn update_config(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AppConfig>, ApiError> {
    let config = state.store.update(json_body(payload)?).await?;
    Ok(Json(config))
}

pub async fn get_device_mappings(State(state): State<AppState>) -> Response {
    Json(state.store.catalog()).into_response()
}

pub async fn get_mining_mappings(State(state): State<AppState>) -> Response {
    Json(state.store.type_table()).into_response()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceListResponse {
    pub devices: Vec<DeviceStatusEntry>,
}

/// 所有设备的状态（并发轮询）
pub async fn list_devices(State(state): State<AppState>) -> Json<DeviceListResponse> {
    let devices = match state.store.get().await {
        Some(config) => device::poll_all(state.devices.as_ref(), &config.devices).await,
        None => Vec::new(),
    };
    Json(DeviceListResponse { devices })
}

async fn find_device(state: &AppState, device_id: &str) -> Result<Device, ApiError> {
    let config = state
        .store
        .get()
        .await
        .ok_or_else(|| ApiError::NotFound("No devices configured".to_string()))?;
    config
        .find_device(device_id)
        .cloned()
        .ok_or_else(ApiError::device_not_found)
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDataResponse {
    pub device_id: String,
    pub device_name: String,
    pub status: Availability,
    pub last_update: String,
    pub categories: ProcessedCategories,
    pub raw: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 单台设备的分类遥测；设备不可达时降级为 unavailable
pub async fn get_device_data(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceDataResponse>, ApiError> {
    let device = find_device(&state, &device_id).await?;

    let response = match device::fetch_telemetry(state.devices.as_ref(), &device).await {
        Ok(telemetry) => {
            let processor = TelemetryProcessor::new(
                state.store.catalog(),
                state.store.type_table(),
                ValueFormatter::device(),
            );
            DeviceDataResponse {
                device_id,
                device_name: device.name.clone(),
                status: telemetry.status().unwrap_or(Availability::Available),
                last_update: now_iso(),
                categories: processor.process(&telemetry),
                raw: telemetry.into_value(),
                error: None,
            }
        }
        Err(e) => {
            warn!(device = %device.name, url = %device.url, "Failed to fetch device data: {}", e);
            DeviceDataResponse {
                device_id,
                device_name: device.name.clone(),
                status: Availability::Unavailable,
                last_update: now_iso(),
                categories: ProcessedCategories::default(),
                raw: json!({}),
                error: Some(e.to_string()),
            }
        }
    };

    Ok(Json(response))
}

/// 曲线数据
pub async fn get_device_chart(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ChartSeries>, ApiError> {
    let device = find_device(&state, &device_id).await?;
    let hours = parse_hours(params.get("hours").map(String::as_str)).map_err(ApiError::BadRequest)?;
    Ok(Json(generate_chart(&device_id, &device.name, hours, chrono::Utc::now())))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    fn ok(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
        })
    }
}

/// 重启设备
pub async fn restart_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    let device = find_device(&state, &device_id).await?;
    state.devices.restart(device.base_url()).await.map_err(|e| {
        error!(device = %device.name, "Device restart failed: {}", e);
        ApiError::Internal(format!("Failed to restart device: {}", e))
    })?;
    info!("🔄 Restart initiated for {}", device.name);
    Ok(ActionResponse::ok("Device restart initiated"))
}

/// 读取设备自身的配置
pub async fn get_device_config(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let device = find_device(&state, &device_id).await?;
    let config = state.devices.get_config(device.base_url()).await.map_err(|e| {
        error!(device = %device.name, "Failed to read device configuration: {}", e);
        ApiError::Internal(format!("Failed to get device configuration: {}", e))
    })?;
    Ok(Json(config))
}

/// 写入设备自身的配置
pub async fn update_device_config(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
    let device = find_device(&state, &device_id).await?;
    let body = json_body(payload)?;
    state
        .devices
        .update_config(device.base_url(), &body)
        .await
        .map_err(|e| {
            error!(device = %device.name, "Failed to update device configuration: {}", e);
            ApiError::Internal(format!("Failed to update device configuration: {}", e))
        })?;
    Ok(ActionResponse::ok("Device configuration updated"))
}

/// Mining Core 矿池数据
pub async fn get_mining_core_data(State(state): State<AppState>) -> Result<Json<MiningCoreSnapshot>, ApiError> {
    let config = state.store.get().await;
    let settings = match config.as_ref() {
        Some(config) if config.mining_core.enabled => &config.mining_core,
        _ => {
            return Err(ApiError::NotFound(
                "Mining core integration is not enabled".to_string(),
            ))
        }
    };

    let url = settings
        .url
        .as_deref()
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Mining core URL not configured".to_string()))?;

    let snapshot = fetch_snapshot(state.mining_core.as_ref(), url, state.store.type_table())
        .await
        .map_err(|e| {
            error!(url, "Failed to fetch mining core data: {}", e);
            ApiError::Internal("Failed to fetch mining core data".to_string())
        })?;
    Ok(Json(snapshot))
}

/// 未匹配的路由：`/api/*` 返回 404，其余交给前端单页应用
pub async fn fallback(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path();
    if path == "/api" || path.starts_with("/api/") {
        return ApiError::NotFound("API endpoint not found".to_string()).into_response();
    }

    let Some(dir) = state.static_dir.as_ref() else {
        return ApiError::NotFound("Not found".to_string()).into_response();
    };

    let index = ServeFile::new(dir.join("index.html"));
    let response: Result<_, Infallible> = ServeDir::new(dir).fallback(index).oneshot(request).await;
    match response {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
