//! 终端状态面板

use super::{DashboardClient, RouteState};
use crate::api::DeviceDataResponse;
use crate::error::DashboardError;
use crate::mining_core::MiningCoreSnapshot;
use crate::telemetry::Availability;
use std::io::Write;
use tracing::{info, warn};

/// `status` 子命令的参数
#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    pub username: Option<String>,
    pub password: Option<String>,
    /// 只显示这台设备（id 或名称）
    pub device: Option<String>,
}

fn io_error(e: std::io::Error) -> DashboardError {
    DashboardError::System(format!("Failed to write status output: {}", e))
}

/// 一台设备的分类遥测
pub fn render_device(data: &DeviceDataResponse) -> String {
    let mut out = format!("== {} [{}] ==\n", data.device_name, availability_label(data.status));
    if let Some(error) = &data.error {
        out.push_str(&format!("  error: {}\n", error));
    }
    for category in data.categories.iter() {
        if category.records.is_empty() {
            continue;
        }
        out.push_str(&format!("  {}\n", category.name));
        for record in &category.records {
            out.push_str(&format!("    {:<28} {}\n", record.display_name, record.formatted));
        }
    }
    out
}

/// 矿池数据，按类型表顺序
pub fn render_mining_core(snapshot: &MiningCoreSnapshot) -> String {
    let mut out = format!("== Mining Core [{}] ==\n", availability_label(snapshot.status));
    for (_, field) in &snapshot.data.0 {
        out.push_str(&format!("    {:<28} {}\n", field.display_name, field.formatted));
    }
    out
}

fn availability_label(status: Availability) -> &'static str {
    match status {
        Availability::Available => "online",
        Availability::Unavailable => "offline",
    }
}

/// 按状态机驱动终端面板，返回最终的路由状态
///
/// 只有 `Ready` 时才会输出设备数据；需要登录且提供了凭据时先登录再重新判定。
pub async fn run_status<W: Write>(
    client: &mut DashboardClient,
    options: &StatusOptions,
    out: &mut W,
) -> Result<RouteState, DashboardError> {
    let (mut state, mut config) = client.route().await?;

    if state == RouteState::NeedsLogin {
        if let (Some(username), Some(password)) = (&options.username, &options.password) {
            client.login(username, password).await?;
            (state, config) = client.route().await?;
        }
    }

    let config = match (state, config) {
        (RouteState::Unconfigured, _) | (_, None) => {
            writeln!(
                out,
                "Dashboard is not configured yet. Open it in a browser to complete the bootstrap form."
            )
            .map_err(io_error)?;
            return Ok(RouteState::Unconfigured);
        }
        (RouteState::NeedsLogin, _) => {
            writeln!(out, "Authentication is enabled. Pass --username and --password to log in.")
                .map_err(io_error)?;
            return Ok(RouteState::NeedsLogin);
        }
        (RouteState::Ready, Some(config)) => config,
    };

    writeln!(out, "{}", config.application_title).map_err(io_error)?;

    let devices: Vec<String> = match &options.device {
        Some(device_id) => vec![device_id.clone()],
        None => config.devices.iter().map(|d| d.identifier().to_string()).collect(),
    };
    info!(devices = devices.len(), "Fetching device status");

    for device_id in &devices {
        let data = client.device_data(device_id).await?;
        write!(out, "{}", render_device(&data)).map_err(io_error)?;
    }

    if config.mining_core.enabled && options.device.is_none() {
        match client.mining_core().await {
            Ok(snapshot) => write!(out, "{}", render_mining_core(&snapshot)).map_err(io_error)?,
            Err(e) => {
                warn!("Mining core data unavailable: {}", e);
                writeln!(out, "== Mining Core [unavailable] ==\n  error: {}", e).map_err(io_error)?;
            }
        }
    }

    Ok(RouteState::Ready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::FieldType;
    use crate::telemetry::{CategoryView, DisplayRecord, PoolField, PoolProjection, ProcessedCategories};
    use serde_json::json;

    fn record(key: &str, name: &str, formatted: &str) -> DisplayRecord {
        DisplayRecord {
            key: key.to_string(),
            raw: json!(0),
            formatted: formatted.to_string(),
            display_name: name.to_string(),
            field_type: FieldType::String,
            unit: String::new(),
        }
    }

    #[test]
    fn test_render_device_skips_empty_categories() {
        let data = DeviceDataResponse {
            device_id: "bitaxe1".to_string(),
            device_name: "Bitaxe 1".to_string(),
            status: Availability::Available,
            last_update: "2024-01-01T00:00:00.000Z".to_string(),
            categories: ProcessedCategories(vec![
                CategoryView {
                    name: "Mining Metrics".to_string(),
                    records: vec![record("hashRate", "Hash Rate", "1.54 TH/s")],
                },
                CategoryView {
                    name: "Empty".to_string(),
                    records: vec![],
                },
            ]),
            raw: json!({}),
            error: None,
        };

        let text = render_device(&data);
        assert!(text.starts_with("== Bitaxe 1 [online] =="));
        assert!(text.contains("Mining Metrics"));
        assert!(text.contains("1.54 TH/s"));
        assert!(!text.contains("Empty"));
    }

    #[test]
    fn test_render_unavailable_device() {
        let data = DeviceDataResponse {
            device_id: "bitaxe1".to_string(),
            device_name: "Bitaxe 1".to_string(),
            status: Availability::Unavailable,
            last_update: String::new(),
            categories: ProcessedCategories::default(),
            raw: json!({}),
            error: Some("timeout".to_string()),
        };
        let text = render_device(&data);
        assert!(text.contains("[offline]"));
        assert!(text.contains("error: timeout"));
    }

    #[test]
    fn test_render_mining_core() {
        let snapshot = MiningCoreSnapshot {
            status: Availability::Available,
            last_update: String::new(),
            pools: vec![],
            data: PoolProjection(vec![(
                "blockHeight".to_string(),
                PoolField {
                    raw: json!(810000),
                    formatted: "810,000".to_string(),
                    display_name: "Block Height".to_string(),
                    field_type: FieldType::Number,
                },
            )]),
            raw: json!({}),
        };
        let text = render_mining_core(&snapshot);
        assert!(text.contains("Block Height"));
        assert!(text.contains("810,000"));
    }
}
