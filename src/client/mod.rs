//! 仪表盘 HTTP 客户端
//!
//! 覆盖全部 HTTP 接口，持有登录得到的会话令牌并在每次请求时附带。
//! 服务端返回 401 时丢弃本地令牌，下一次导航会重新要求登录。

pub mod navigation;
pub mod status;

use crate::api::{ActionResponse, DeviceDataResponse, DeviceListResponse, ErrorBody, SecretResponse};
use crate::auth::{LoginRequest, LoginResponse};
use crate::device::{ChartSeries, DeviceStatusEntry};
use crate::error::ClientError;
use crate::mapping::{MappingCatalog, TypeTable};
use crate::mining_core::MiningCoreSnapshot;
use crate::store::AppConfig;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub use navigation::{guard, resolve_route, session_valid, LocalSession, RouteState, Screen};
pub use status::{run_status, StatusOptions};

/// 客户端请求超时
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// 仪表盘客户端
#[derive(Debug, Clone)]
pub struct DashboardClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    session: Option<LocalSession>,
}

impl DashboardClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl {
            url: base_url.to_string(),
            error: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl {
                url: base_url.to_string(),
                error: "not a base URL".to_string(),
            });
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: parsed,
            timeout: DEFAULT_CLIENT_TIMEOUT,
            session: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_session(mut self, session: LocalSession) -> Self {
        self.session = Some(session);
        self
    }

    pub fn session(&self) -> Option<&LocalSession> {
        self.session.as_ref()
    }

    /// 注销只丢弃本地令牌
    pub fn logout(&mut self) {
        self.session = None;
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl {
                url: self.base_url.to_string(),
                error: "not a base URL".to_string(),
            })?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn request<T: DeserializeOwned>(
        &mut self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<T, ClientError> {
        debug!("{} {}", method, url);
        let mut builder = self.http.request(method, url.clone()).timeout(self.timeout);
        if let Some(session) = &self.session {
            builder = builder.bearer_auth(session.token());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| ClientError::Unreachable {
            url: url.to_string(),
            error: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED && self.session.take().is_some() {
                warn!("Session rejected by server, discarding local token");
            }
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status.canonical_reason().unwrap_or("Request failed").to_string(),
            };
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<T>().await.map_err(|e| ClientError::Decode {
            url: url.to_string(),
            error: e.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&mut self, segments: &[&str]) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        self.request(Method::GET, url, None).await
    }

    /// 读取应用配置，`{}` 表示尚未引导
    pub async fn get_config(&mut self) -> Result<Option<AppConfig>, ClientError> {
        let url = self.endpoint(&["config"])?;
        let document: Value = self.request(Method::GET, url.clone(), None).await?;
        match document {
            Value::Object(ref fields) if fields.is_empty() => Ok(None),
            other => serde_json::from_value(other).map(Some).map_err(|e| ClientError::Decode {
                url: url.to_string(),
                error: e.to_string(),
            }),
        }
    }

    pub async fn create_config(&mut self, config: &Value) -> Result<AppConfig, ClientError> {
        let url = self.endpoint(&["config"])?;
        self.request(Method::POST, url, Some(config)).await
    }

    pub async fn update_config(&mut self, changes: &Value) -> Result<AppConfig, ClientError> {
        let url = self.endpoint(&["config"])?;
        self.request(Method::PUT, url, Some(changes)).await
    }

    pub async fn device_mappings(&mut self) -> Result<MappingCatalog, ClientError> {
        self.get(&["config", "device-mappings"]).await
    }

    pub async fn mining_mappings(&mut self) -> Result<TypeTable, ClientError> {
        self.get(&["config", "mining-mappings"]).await
    }

    /// 登录并保存令牌
    pub async fn login(&mut self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let url = self.endpoint(&["auth", "login"])?;
        let body = serde_json::to_value(LoginRequest::new(username, password)).map_err(|e| ClientError::Decode {
            url: url.to_string(),
            error: e.to_string(),
        })?;
        let response: LoginResponse = self.request(Method::POST, url, Some(&body)).await?;
        self.session = Some(LocalSession::new(response.token.clone()));
        info!("🔑 Logged in as {}", response.user.username);
        Ok(response)
    }

    pub async fn generate_secret(&mut self) -> Result<String, ClientError> {
        let url = self.endpoint(&["auth", "generate-secret"])?;
        let response: SecretResponse = self.request(Method::POST, url, None).await?;
        Ok(response.secret)
    }

    pub async fn list_devices(&mut self) -> Result<Vec<DeviceStatusEntry>, ClientError> {
        let response: DeviceListResponse = self.get(&["devices"]).await?;
        Ok(response.devices)
    }

    pub async fn device_data(&mut self, device_id: &str) -> Result<DeviceDataResponse, ClientError> {
        self.get(&["devices", device_id, "data"]).await
    }

    pub async fn chart(&mut self, device_id: &str, hours: u32) -> Result<ChartSeries, ClientError> {
        let mut url = self.endpoint(&["devices", device_id, "chart"])?;
        url.query_pairs_mut().append_pair("hours", &hours.to_string());
        self.request(Method::GET, url, None).await
    }

    pub async fn restart(&mut self, device_id: &str) -> Result<ActionResponse, ClientError> {
        let url = self.endpoint(&["devices", device_id, "restart"])?;
        self.request(Method::POST, url, None).await
    }

    pub async fn device_config(&mut self, device_id: &str) -> Result<Value, ClientError> {
        self.get(&["devices", device_id, "config"]).await
    }

    pub async fn update_device_config(&mut self, device_id: &str, changes: &Value) -> Result<ActionResponse, ClientError> {
        let url = self.endpoint(&["devices", device_id, "config"])?;
        self.request(Method::PUT, url, Some(changes)).await
    }

    pub async fn mining_core(&mut self) -> Result<MiningCoreSnapshot, ClientError> {
        self.get(&["mining-core", "data"]).await
    }

    /// 重新读取配置并推导路由状态
    pub async fn route(&mut self) -> Result<(RouteState, Option<AppConfig>), ClientError> {
        let config = self.get_config().await?;
        let state = resolve_route(
            config.is_some(),
            config.as_ref().map(AppConfig::auth_enabled).unwrap_or(false),
            session_valid(self.session.as_ref()),
        );
        Ok((state, config))
    }
}
