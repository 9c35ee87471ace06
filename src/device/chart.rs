//! 算力/温度曲线
//!
//! 设备固件不保存历史数据，曲线围绕典型值随机生成，最多约 100 个点。

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HOURS: u32 = 24;
pub const MAX_HOURS: u32 = 720;

const BASE_HASHRATE: f64 = 1540.0;
const BASE_TEMP: f64 = 62.0;
const MIN_INTERVAL_MINUTES: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub timestamp: String,
    /// GH/s
    pub hashrate: f64,
    pub asic_temp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub device_id: String,
    pub device_name: String,
    pub hours: u32,
    pub data_points: Vec<ChartPoint>,
    pub generated_at: String,
    pub interval: String,
    pub total_points: usize,
}

/// 解析 `hours` 查询参数，缺省 24，允许 1..=720
pub fn parse_hours(raw: Option<&str>) -> Result<u32, String> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_HOURS);
    };
    match raw.trim().parse::<u32>() {
        Ok(hours) if (1..=MAX_HOURS).contains(&hours) => Ok(hours),
        _ => Err(format!("hours must be an integer between 1 and {}", MAX_HOURS)),
    }
}

/// 采样间隔（分钟）
pub fn interval_minutes(hours: u32) -> u32 {
    MIN_INTERVAL_MINUTES.max(hours * 60 / 100)
}

/// 生成曲线，时间从旧到新
pub fn generate_chart(device_id: &str, device_name: &str, hours: u32, now: DateTime<Utc>) -> ChartSeries {
    let interval = interval_minutes(hours);
    let steps = hours * 60 / interval;

    let data_points: Vec<ChartPoint> = (0..=steps)
        .rev()
        .map(|step| {
            let timestamp = now - Duration::minutes(i64::from(step * interval));
            let hashrate = BASE_HASHRATE + (fastrand::f64() - 0.5) * 0.2 * BASE_HASHRATE;
            let asic_temp = BASE_TEMP + (fastrand::f64() - 0.5) * 16.0;
            ChartPoint {
                timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                hashrate: hashrate.max(0.0),
                asic_temp: asic_temp.clamp(20.0, 90.0),
            }
        })
        .collect();

    ChartSeries {
        device_id: device_id.to_string(),
        device_name: device_name.to_string(),
        hours,
        total_points: data_points.len(),
        data_points,
        generated_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        interval: format!("{} minutes", interval),
    }
}
