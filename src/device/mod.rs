//! 设备访问
//!
//! 设备统一通过 [`DeviceTransport`] 访问：`strict` 模式直连 AxeOS HTTP 接口，
//! 失败如实上报；`simulated` 模式返回演示数据，两者不会互相回退。

pub mod chart;
pub mod http;
pub mod simulated;

use crate::error::TransportError;
use crate::store::Device;
use crate::telemetry::{now_iso, Availability, TelemetryRecord};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

pub use chart::{generate_chart, parse_hours, ChartPoint, ChartSeries};
pub use http::HttpDeviceTransport;
pub use simulated::SimulatedDeviceTransport;

/// 设备传输接口，`url` 为设备基础地址
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// 读取 `/api/system/info` 遥测
    async fn fetch_info(&self, url: &str) -> Result<TelemetryRecord, TransportError>;

    /// 请求设备重启
    async fn restart(&self, url: &str) -> Result<(), TransportError>;

    /// 读取设备配置
    async fn get_config(&self, url: &str) -> Result<Value, TransportError>;

    /// 写入设备配置
    async fn update_config(&self, url: &str, config: &Value) -> Result<(), TransportError>;
}

/// 读取一次遥测并标记状态、时间戳与响应耗时
pub async fn fetch_telemetry(
    transport: &dyn DeviceTransport,
    device: &Device,
) -> Result<TelemetryRecord, TransportError> {
    let started = Instant::now();
    let mut telemetry = transport.fetch_info(device.base_url()).await?;
    let elapsed = started.elapsed().as_millis() as u64;
    telemetry.stamp_available(elapsed);
    debug!(device = %device.name, response_ms = elapsed, "Fetched device telemetry");
    Ok(telemetry)
}

/// 设备列表中的单条状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatusEntry {
    pub id: String,
    pub name: String,
    pub url: String,
    pub status: Availability,
    pub last_update: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 并发轮询所有设备，单个设备失败只影响它自己的条目
pub async fn poll_all(transport: &dyn DeviceTransport, devices: &[Device]) -> Vec<DeviceStatusEntry> {
    let polls = devices.iter().map(|device| async move {
        match fetch_telemetry(transport, device).await {
            Ok(telemetry) => DeviceStatusEntry {
                id: device.identifier().to_string(),
                name: device.name.clone(),
                url: device.url.clone(),
                status: telemetry.status().unwrap_or(Availability::Available),
                last_update: telemetry.last_update().map(str::to_string).unwrap_or_else(now_iso),
                error: None,
            },
            Err(e) => {
                warn!(device = %device.name, url = %device.url, "Device poll failed: {}", e);
                DeviceStatusEntry {
                    id: device.identifier().to_string(),
                    name: device.name.clone(),
                    url: device.url.clone(),
                    status: Availability::Unavailable,
                    last_update: now_iso(),
                    error: Some(e.to_string()),
                }
            }
        }
    });

    join_all(polls).await
}
