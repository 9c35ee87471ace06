//! AxeOS HTTP 传输

use super::DeviceTransport;
use crate::error::TransportError;
use crate::telemetry::TelemetryRecord;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// 读操作默认超时
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);
/// 修改设备状态的操作默认超时
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpDeviceTransport {
    client: reqwest::Client,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl Default for HttpDeviceTransport {
    fn default() -> Self {
        Self::new(DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT)
    }
}

impl HttpDeviceTransport {
    pub fn new(read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            read_timeout,
            write_timeout,
        }
    }

    fn endpoint(url: &str, path: &str) -> String {
        format!("{}{}", url.trim_end_matches('/'), path)
    }

    async fn get_json(&self, endpoint: &str) -> Result<Value, TransportError> {
        debug!("GET {}", endpoint);
        self.client
            .get(endpoint)
            .timeout(self.read_timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| TransportError::from_reqwest(endpoint, e))?
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode {
                url: endpoint.to_string(),
                error: e.to_string(),
            })
    }

    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<(), TransportError> {
        debug!("POST {}", endpoint);
        self.client
            .post(endpoint)
            .timeout(self.write_timeout)
            .json(body)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| TransportError::from_reqwest(endpoint, e))?;
        Ok(())
    }
}

#[async_trait]
impl DeviceTransport for HttpDeviceTransport {
    async fn fetch_info(&self, url: &str) -> Result<TelemetryRecord, TransportError> {
        let endpoint = Self::endpoint(url, "/api/system/info");
        let body = self.get_json(&endpoint).await?;
        TelemetryRecord::from_value(body).ok_or_else(|| TransportError::Decode {
            url: endpoint,
            error: "expected a JSON object".to_string(),
        })
    }

    async fn restart(&self, url: &str) -> Result<(), TransportError> {
        let endpoint = Self::endpoint(url, "/api/system/restart");
        self.post_json(&endpoint, &json!({})).await?;
        info!("🔄 Restart requested for device {}", url);
        Ok(())
    }

    async fn get_config(&self, url: &str) -> Result<Value, TransportError> {
        self.get_json(&Self::endpoint(url, "/api/system")).await
    }

    async fn update_config(&self, url: &str, config: &Value) -> Result<(), TransportError> {
        self.post_json(&Self::endpoint(url, "/api/system"), config).await?;
        info!("Device configuration pushed to {}", url);
        Ok(())
    }
}
