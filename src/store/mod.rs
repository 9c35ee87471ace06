//! 配置存储
//!
//! 独占持有应用配置文档以及设备目录、类型表。其他组件只读取快照，
//! 所有修改都通过 [`ConfigStore::create`] 与 [`ConfigStore::update`] 完成，
//! 读-改-写在同一把写锁内进行。

pub mod model;

use crate::error::{ConfigError, DashboardError, StoreError};
use crate::mapping::{default_catalog, default_type_table, MappingCatalog, TypeTable};
use crate::storage::{
    DocumentStore, APP_CONFIG_DOCUMENT, DEVICE_MAPPINGS_DOCUMENT, MINING_MAPPINGS_DOCUMENT,
};
use crate::telemetry::now_iso;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use url::Url;

pub use model::{
    AppConfig, AuthenticationSettings, BootstrapRequest, Device, DeviceInput, MiningCoreSettings,
    CONFIG_VERSION, DEFAULT_REFRESH_INTERVAL,
};

pub struct ConfigStore {
    documents: Arc<dyn DocumentStore>,
    current: RwLock<Option<AppConfig>>,
    catalog: MappingCatalog,
    types: TypeTable,
}

impl ConfigStore {
    /// 打开存储：读取已有配置，映射文件缺失时写入内置默认值
    pub fn open(documents: Arc<dyn DocumentStore>) -> Result<Self, DashboardError> {
        let current = match documents.read_document(APP_CONFIG_DOCUMENT)? {
            Some(Value::Object(map)) if map.is_empty() => None,
            Some(document) => Some(serde_json::from_value::<AppConfig>(document).map_err(|e| {
                ConfigError::ParseError {
                    error: format!("{}: {}", APP_CONFIG_DOCUMENT, e),
                }
            })?),
            None => None,
        };

        let catalog = match documents.read_document(DEVICE_MAPPINGS_DOCUMENT)? {
            Some(document) => MappingCatalog::from_value(document)?,
            None => {
                let catalog = default_catalog();
                documents.write_document(DEVICE_MAPPINGS_DOCUMENT, &to_document(&catalog)?)?;
                info!("Wrote default device mappings");
                catalog
            }
        };

        let types = match documents.read_document(MINING_MAPPINGS_DOCUMENT)? {
            Some(document) => serde_json::from_value::<TypeTable>(document).map_err(|e| {
                ConfigError::InvalidCatalog {
                    reason: format!("{}: {}", MINING_MAPPINGS_DOCUMENT, e),
                }
            })?,
            None => {
                let types = default_type_table();
                documents.write_document(MINING_MAPPINGS_DOCUMENT, &to_document(&types)?)?;
                info!("Wrote default mining mappings");
                types
            }
        };

        info!(
            configured = current.is_some(),
            categories = catalog.categories().len(),
            typed_fields = types.len(),
            "Configuration store opened"
        );

        Ok(Self {
            documents,
            current: RwLock::new(current),
            catalog,
            types,
        })
    }

    /// 当前配置快照
    pub async fn get(&self) -> Option<AppConfig> {
        self.current.read().await.clone()
    }

    pub async fn is_configured(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub fn catalog(&self) -> &MappingCatalog {
        &self.catalog
    }

    pub fn type_table(&self) -> &TypeTable {
        &self.types
    }

    /// 引导创建初始配置
    pub async fn create(&self, input: Value) -> Result<AppConfig, StoreError> {
        let mut current = self.current.write().await;
        if current.is_some() {
            return Err(StoreError::AlreadyConfigured);
        }

        let request: BootstrapRequest = serde_json::from_value(input)
            .map_err(|e| StoreError::validation(format!("Invalid configuration: {}", e)))?;
        let config = build_config(request)?;

        self.persist(&config)?;
        info!(
            title = %config.application_title,
            devices = config.devices.len(),
            "Application configured"
        );
        *current = Some(config.clone());
        Ok(config)
    }

    /// 浅合并更新：只覆盖顶层键，嵌套对象整体替换而不是逐字段合并
    pub async fn update(&self, partial: Value) -> Result<AppConfig, StoreError> {
        let mut current = self.current.write().await;
        let existing = current.as_ref().ok_or(StoreError::NotConfigured)?;

        let Value::Object(overlay) = partial else {
            return Err(StoreError::validation("Configuration update must be a JSON object"));
        };

        let mut merged = match serde_json::to_value(existing) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(StoreError::validation("Stored configuration is not an object")),
            Err(e) => return Err(StoreError::validation(e.to_string())),
        };
        for (key, value) in overlay {
            merged.insert(key, value);
        }
        merged.insert("updatedAt".to_string(), Value::String(now_iso()));

        let config: AppConfig = serde_json::from_value(Value::Object(merged))
            .map_err(|e| StoreError::validation(format!("Invalid configuration: {}", e)))?;

        self.persist(&config)?;
        info!("Application configuration updated");
        *current = Some(config.clone());
        Ok(config)
    }

    fn persist(&self, config: &AppConfig) -> Result<(), StoreError> {
        let document = serde_json::to_value(config).map_err(|e| StoreError::Persistence {
            name: APP_CONFIG_DOCUMENT.to_string(),
            error: e.to_string(),
        })?;
        self.documents
            .write_document(APP_CONFIG_DOCUMENT, &document)
            .map_err(|e| {
                warn!("Failed to persist configuration: {}", e);
                e
            })
    }
}

fn to_document<T: serde::Serialize>(value: &T) -> Result<Value, ConfigError> {
    serde_json::to_value(value).map_err(|e| ConfigError::ParseError { error: e.to_string() })
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// 校验引导请求并补全默认字段
fn build_config(request: BootstrapRequest) -> Result<AppConfig, StoreError> {
    let application_title = match request.application_title {
        Some(title) if !title.trim().is_empty() => title,
        _ => return Err(StoreError::validation("Application title is required")),
    };

    let inputs = request.devices.unwrap_or_default();
    if inputs.is_empty() {
        return Err(StoreError::validation("At least one device must be configured"));
    }

    let mut devices = Vec::with_capacity(inputs.len());
    for input in inputs {
        if is_blank(&input.name) || is_blank(&input.url) {
            return Err(StoreError::validation("Device name and URL are required"));
        }
        let name = input.name.unwrap_or_default();
        let url = input.url.unwrap_or_default();
        if Url::parse(&url).is_err() {
            return Err(StoreError::validation(format!("Invalid URL for device {}", name)));
        }
        devices.push(Device {
            id: input.id,
            name,
            url,
            extra: input.extra,
        });
    }

    let mining_core = request.mining_core.unwrap_or_default();
    if mining_core.enabled {
        if let Some(url) = mining_core.url.as_deref().filter(|url| !url.is_empty()) {
            if Url::parse(url).is_err() {
                return Err(StoreError::validation("Invalid mining core URL"));
            }
        }
    }

    let now = now_iso();
    Ok(AppConfig {
        application_title,
        version: CONFIG_VERSION.to_string(),
        authentication: request.authentication.unwrap_or_default(),
        devices,
        mining_core,
        refresh_interval: request.refresh_interval.unwrap_or(DEFAULT_REFRESH_INTERVAL),
        created_at: now.clone(),
        updated_at: now,
        extra: Default::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileDocumentStore, MemoryDocumentStore};
    use serde_json::json;

    fn memory_store() -> ConfigStore {
        ConfigStore::open(Arc::new(MemoryDocumentStore::new())).unwrap()
    }

    fn bootstrap() -> Value {
        json!({
            "applicationTitle": "Home Farm",
            "authentication": {
                "enabled": true,
                "username": "admin",
                "passwordHash": "$2b$04$hash",
                "jwtSecret": "secret",
                "jwtExpiration": "2h"
            },
            "devices": [ { "name": "bitaxe1", "url": "http://192.168.1.50" } ]
        })
    }

    fn expect_validation(result: Result<AppConfig, StoreError>, message: &str) {
        match result {
            Err(StoreError::Validation { reason }) => assert_eq!(reason, message),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_stamps_defaults() {
        let store = memory_store();
        assert!(!store.is_configured().await);

        let config = store
            .create(json!({
                "applicationTitle": "Farm",
                "devices": [ { "name": "a", "url": "http://10.0.0.2" } ]
            }))
            .await
            .unwrap();

        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.refresh_interval, 25);
        assert!(!config.authentication.enabled);
        assert!(!config.mining_core.enabled);
        assert_eq!(config.created_at, config.updated_at);
        assert!(store.is_configured().await);
        assert_eq!(store.get().await, Some(config));
    }

    #[tokio::test]
    async fn test_create_keeps_supplied_refresh_interval() {
        let store = memory_store();
        let config = store
            .create(json!({
                "applicationTitle": "Farm",
                "refreshInterval": 10,
                "devices": [ { "name": "a", "url": "http://10.0.0.2" } ]
            }))
            .await
            .unwrap();
        assert_eq!(config.refresh_interval, 10);
        assert_eq!(config.version, CONFIG_VERSION);
    }

    #[tokio::test]
    async fn test_create_rejects_whitespace_only_fields() {
        let store = memory_store();

        expect_validation(
            store
                .create(json!({ "applicationTitle": "   ", "devices": [ { "name": "a", "url": "http://a" } ] }))
                .await,
            "Application title is required",
        );
        expect_validation(
            store
                .create(json!({ "applicationTitle": "Farm", "devices": [ { "name": " \t", "url": "http://a" } ] }))
                .await,
            "Device name and URL are required",
        );
        expect_validation(
            store
                .create(json!({ "applicationTitle": "Farm", "devices": [ { "name": "a", "url": "  " } ] }))
                .await,
            "Device name and URL are required",
        );
        assert!(!store.is_configured().await);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let store = memory_store();

        expect_validation(
            store.create(json!({ "devices": [ { "name": "a", "url": "http://a" } ] })).await,
            "Application title is required",
        );
        expect_validation(
            store.create(json!({ "applicationTitle": "Farm", "devices": [] })).await,
            "At least one device must be configured",
        );
        expect_validation(
            store.create(json!({ "applicationTitle": "Farm", "devices": [ { "name": "a" } ] })).await,
            "Device name and URL are required",
        );
        expect_validation(
            store
                .create(json!({ "applicationTitle": "Farm", "devices": [ { "name": "a", "url": "not a url" } ] }))
                .await,
            "Invalid URL for device a",
        );
        expect_validation(
            store
                .create(json!({
                    "applicationTitle": "Farm",
                    "devices": [ { "name": "a", "url": "http://a" } ],
                    "miningCore": { "enabled": true, "url": "::bad::" }
                }))
                .await,
            "Invalid mining core URL",
        );
        assert!(!store.is_configured().await);
    }

    #[tokio::test]
    async fn test_create_only_once() {
        let store = memory_store();
        store.create(bootstrap()).await.unwrap();
        assert!(matches!(
            store.create(bootstrap()).await,
            Err(StoreError::AlreadyConfigured)
        ));
    }

    #[tokio::test]
    async fn test_update_requires_configuration() {
        let store = memory_store();
        assert!(matches!(
            store.update(json!({ "applicationTitle": "x" })).await,
            Err(StoreError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_update_is_shallow() {
        let store = memory_store();
        let created = store.create(bootstrap()).await.unwrap();

        let updated = store
            .update(json!({ "authentication": { "enabled": false } }))
            .await
            .unwrap();

        // 嵌套对象被整体替换，用户名与密钥一并丢失
        assert!(!updated.authentication.enabled);
        assert_eq!(updated.authentication.username, None);
        assert_eq!(updated.authentication.jwt_secret, None);
        assert_eq!(updated.application_title, created.application_title);
        assert_eq!(updated.devices, created.devices);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_update_rejects_malformed_documents() {
        let store = memory_store();
        store.create(bootstrap()).await.unwrap();

        assert!(matches!(
            store.update(json!({ "devices": "everything" })).await,
            Err(StoreError::Validation { .. })
        ));
        assert!(matches!(
            store.update(json!([1, 2, 3])).await,
            Err(StoreError::Validation { .. })
        ));
        assert_eq!(store.get().await.unwrap().devices.len(), 1);
    }

    #[tokio::test]
    async fn test_persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let documents: Arc<dyn DocumentStore> = Arc::new(FileDocumentStore::open(dir.path()).unwrap());

        let store = ConfigStore::open(documents.clone()).unwrap();
        store.create(bootstrap()).await.unwrap();
        store.update(json!({ "refreshInterval": 60, "theme": "dark" })).await.unwrap();
        let type_order: Vec<String> = store.type_table().iter().map(|(key, _)| key.to_string()).collect();
        let category_order: Vec<String> = store.catalog().categories().iter().map(|c| c.name.clone()).collect();

        let reopened = ConfigStore::open(documents).unwrap();
        let config = reopened.get().await.unwrap();
        assert_eq!(config.refresh_interval, 60);
        assert_eq!(config.extra.get("theme"), Some(&json!("dark")));
        assert!(dir.path().join("device-mappings.json").exists());
        assert!(dir.path().join("mining-mappings.json").exists());

        // 重新打开后保持声明顺序
        let reopened_types: Vec<String> = reopened.type_table().iter().map(|(key, _)| key.to_string()).collect();
        assert_eq!(reopened_types, type_order);
        assert_eq!(&reopened_types[..3], ["networkHashrate", "networkDifficulty", "lastBlockTime"]);
        let reopened_categories: Vec<String> =
            reopened.catalog().categories().iter().map(|c| c.name.clone()).collect();
        assert_eq!(reopened_categories, category_order);
    }

    #[test]
    fn test_open_rejects_invalid_catalog() {
        let documents = MemoryDocumentStore::new()
            .with_document(DEVICE_MAPPINGS_DOCUMENT, json!([{ "Empty": [] }]));
        assert!(matches!(
            ConfigStore::open(Arc::new(documents)),
            Err(DashboardError::Config(ConfigError::InvalidCatalog { .. }))
        ));
    }

    #[tokio::test]
    async fn test_empty_document_is_unconfigured() {
        let documents = MemoryDocumentStore::new().with_document(APP_CONFIG_DOCUMENT, json!({}));
        let store = ConfigStore::open(Arc::new(documents)).unwrap();
        assert!(!store.is_configured().await);
        assert_eq!(store.get().await, None);
    }
}
