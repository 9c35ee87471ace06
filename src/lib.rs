//! Bitaxe Dashboard - Bitaxe ASIC 矿机监控面板后端
//!
//! 为 Bitaxe 矿机与可选的 Mining Core 矿池后端提供一层轻量 HTTP API：
//! - 代理设备遥测，并按映射目录整理为分类显示记录
//! - 保存唯一的应用配置文档（首次引导、浅合并更新）
//! - 可选的 JWT 登录保护
//! - 终端状态面板，与前端使用同一套引导/登录状态机
//!
//! ## 设备访问模式
//!
//! - `strict`：直连设备与矿池，失败如实上报
//! - `simulated`：返回演示数据，用于开发和演示

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod mining_core;
pub mod storage;
pub mod store;
pub mod telemetry;
pub mod utils;

pub use api::{create_routes, ApiServer, AppState};
pub use config::Config;
pub use error::DashboardError;

use config::TransportMode;
use device::{DeviceTransport, HttpDeviceTransport, SimulatedDeviceTransport};
use mining_core::{HttpMiningCoreTransport, MiningCoreTransport, SimulatedMiningCoreTransport};
use std::sync::Arc;
use storage::FileDocumentStore;
use store::ConfigStore;
use tracing::info;

/// 程序版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 程序名称
pub const NAME: &str = "bitaxe-dashboard";

/// 按服务配置组装应用状态：打开数据目录、选择设备与矿池传输
pub fn build_app_state(config: &Config) -> Result<AppState, DashboardError> {
    let documents = FileDocumentStore::open(&config.storage.data_dir)?;
    let store = ConfigStore::open(Arc::new(documents))?;

    let (devices, mining_core): (Arc<dyn DeviceTransport>, Arc<dyn MiningCoreTransport>) =
        match config.transport.mode {
            TransportMode::Strict => (
                Arc::new(HttpDeviceTransport::new(
                    config.transport.read_timeout(),
                    config.transport.write_timeout(),
                )),
                Arc::new(HttpMiningCoreTransport::new(config.transport.read_timeout())),
            ),
            TransportMode::Simulated => {
                info!("🧪 Simulated transport enabled, serving demo telemetry");
                (
                    Arc::new(SimulatedDeviceTransport::new()),
                    Arc::new(SimulatedMiningCoreTransport),
                )
            }
        };

    Ok(AppState {
        store: Arc::new(store),
        devices,
        mining_core,
        static_dir: config.server.static_dir.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "bitaxe-dashboard");
    }

    #[tokio::test]
    async fn test_build_app_state_seeds_mappings() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = dir.path().to_path_buf();
        config.transport.mode = TransportMode::Simulated;

        let state = build_app_state(&config).unwrap();
        assert!(!state.store.is_configured().await);
        assert!(dir.path().join("device-mappings.json").exists());
        assert!(dir.path().join("mining-mappings.json").exists());
        assert_eq!(state.static_dir, config.server.static_dir);
    }
}
