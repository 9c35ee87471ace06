//! 应用配置文档模型

use crate::auth::JwtExpiration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 配置文档格式版本
pub const CONFIG_VERSION: &str = "2.0.0";
/// 前端默认刷新间隔（秒）
pub const DEFAULT_REFRESH_INTERVAL: u32 = 25;

fn default_refresh_interval() -> u32 {
    DEFAULT_REFRESH_INTERVAL
}

/// 应用配置，全局唯一的文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub application_title: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub authentication: AuthenticationSettings,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub mining_core: MiningCoreSettings,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u32,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    /// 合并更新时写入的其他顶层键原样保留
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppConfig {
    /// 按 id 或名称查找设备
    pub fn find_device(&self, device_id: &str) -> Option<&Device> {
        self.devices.iter().find(|device| device.matches(device_id))
    }

    pub fn auth_enabled(&self) -> bool {
        self.authentication.enabled
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// sha256 摘要再经 bcrypt 处理后的密码哈希
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_expiration: Option<JwtExpiration>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthenticationSettings {
    /// 非空的签名密钥
    pub fn secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref().filter(|secret| !secret.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            url: url.to_string(),
            extra: Map::new(),
        }
    }

    /// 对外标识：优先 id，否则名称
    pub fn identifier(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }

    pub fn matches(&self, device_id: &str) -> bool {
        self.id.as_deref() == Some(device_id) || self.name == device_id
    }

    /// 去掉末尾斜杠的基础地址
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningCoreSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 引导请求：所有字段都可能缺失，由配置存储逐项校验
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapRequest {
    #[serde(default)]
    pub application_title: Option<String>,
    #[serde(default)]
    pub authentication: Option<AuthenticationSettings>,
    #[serde(default)]
    pub devices: Option<Vec<DeviceInput>>,
    #[serde(default)]
    pub mining_core: Option<MiningCoreSettings>,
    #[serde(default)]
    pub refresh_interval: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
