//! 演示用的模拟设备
//!
//! 返回一台 BM1366 Bitaxe 的典型遥测，数值单位与 AxeOS 一致
//! （算力 GH/s，电压 mV）。配置写入保存在内存中，随后的读取能看到合并结果。

use super::DeviceTransport;
use crate::error::TransportError;
use crate::telemetry::TelemetryRecord;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Default)]
pub struct SimulatedDeviceTransport {
    configs: RwLock<HashMap<String, Map<String, Value>>>,
}

impl SimulatedDeviceTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn hostname(url: &str) -> String {
        url::Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_string))
            .unwrap_or_else(|| "bitaxe".to_string())
    }
}

/// 模拟遥测
pub fn demo_telemetry(hostname: &str) -> TelemetryRecord {
    // 算力与温度带少量抖动
    let hashrate = 1540.0 * (0.97 + fastrand::f64() * 0.06);
    let temp = 62.5 + (fastrand::f64() - 0.5) * 2.0;

    let value = json!({
        "hashRate": (hashrate * 100.0).round() / 100.0,
        "expectedHashrate": 1600,
        "bestDiff": "4.57T",
        "bestSessionDiff": "1.23G",
        "poolDifficulty": 65536,
        "sharesAccepted": 42876,
        "sharesRejected": 128,
        "sharesRejectedReasons": [
            { "message": "low difficulty", "count": 45 },
            { "message": "duplicate", "count": 83 }
        ],
        "hostname": hostname,
        "power": 18.5,
        "voltage": 5120,
        "coreVoltageActual": 1196,
        "frequency": 575,
        "temp": (temp * 10.0).round() / 10.0,
        "vrTemp": 58.3,
        "fanspeed": 75,
        "minFanSpeed": 25,
        "fanrpm": 3250,
        "temptarget": 60,
        "overheat_mode": 0,
        "uptimeSeconds": 86400 * 3 + 3600 * 5 + 60 * 23 + 45,
        "coreVoltage": 1200,
        "current": 3593.75,
        "wifiRSSI": -45,
        "stratumURL": "solo.ckpool.org",
        "stratumUser": "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh.bitaxe1",
        "stratumPort": 3333,
        "isUsingFallbackStratum": false,
        "axeOSVersion": "v2.0.10",
        "idfVersion": "v5.1.2",
        "boardVersion": "204",
        "ASICModel": "BM1366",
        "simulated": true
    });

    TelemetryRecord::from_value(value).unwrap_or_default()
}

/// 模拟的 `/api/system` 配置
fn demo_config(hostname: &str) -> Map<String, Value> {
    let value = json!({
        "hostname": hostname,
        "stratumURL": "solo.ckpool.org",
        "stratumPort": 3333,
        "stratumUser": "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh.bitaxe1",
        "fallbackStratumURL": "",
        "fallbackStratumPort": 3333,
        "frequency": 575,
        "coreVoltage": 1200,
        "autofanspeed": 1,
        "fanspeed": 75,
        "minFanSpeed": 25,
        "temptarget": 60,
        "overheat_mode": 0,
        "flipscreen": 1,
        "invertscreen": 0
    });

    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[async_trait]
impl DeviceTransport for SimulatedDeviceTransport {
    async fn fetch_info(&self, url: &str) -> Result<TelemetryRecord, TransportError> {
        let mut telemetry = demo_telemetry(&Self::hostname(url));
        if let Some(config) = self.configs.read().await.get(url) {
            for (key, value) in config {
                if telemetry.contains_key(key) {
                    telemetry.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(telemetry)
    }

    async fn restart(&self, url: &str) -> Result<(), TransportError> {
        info!("🔄 Simulated restart of {}", url);
        Ok(())
    }

    async fn get_config(&self, url: &str) -> Result<Value, TransportError> {
        let configs = self.configs.read().await;
        let config = configs
            .get(url)
            .cloned()
            .unwrap_or_else(|| demo_config(&Self::hostname(url)));
        Ok(Value::Object(config))
    }

    async fn update_config(&self, url: &str, config: &Value) -> Result<(), TransportError> {
        let Value::Object(update) = config else {
            return Err(TransportError::Decode {
                url: url.to_string(),
                error: "device configuration must be a JSON object".to_string(),
            });
        };

        let mut configs = self.configs.write().await;
        let current = configs
            .entry(url.to_string())
            .or_insert_with(|| demo_config(&Self::hostname(url)));
        for (key, value) in update {
            current.insert(key.clone(), value.clone());
        }
        info!("Simulated configuration update for {}", url);
        Ok(())
    }
}
