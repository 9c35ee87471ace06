//! Mining Core 矿池后端
//!
//! 读取矿池与全网状态，整理为一条扁平记录后按类型表投影。

pub mod http;
pub mod simulated;

use crate::error::TransportError;
use crate::mapping::TypeTable;
use crate::telemetry::{project_pool, Availability, PoolProjection, TelemetryRecord};
use crate::utils::ValueFormatter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

pub use http::HttpMiningCoreTransport;
pub use simulated::SimulatedMiningCoreTransport;

/// 一次读取的结果：扁平化的全网/矿池字段与各矿池摘要
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolReport {
    pub record: TelemetryRecord,
    pub pools: Vec<Value>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MiningCoreTransport: Send + Sync {
    async fn fetch_pools(&self, url: &str) -> Result<PoolReport, TransportError>;
}

/// `/api/mining-core/data` 的响应体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningCoreSnapshot {
    pub status: Availability,
    pub last_update: String,
    pub pools: Vec<Value>,
    pub data: PoolProjection,
    pub raw: Value,
}

/// 读取并投影矿池数据
pub async fn fetch_snapshot(
    transport: &dyn MiningCoreTransport,
    url: &str,
    types: &TypeTable,
) -> Result<MiningCoreSnapshot, TransportError> {
    let started = Instant::now();
    let PoolReport { mut record, pools } = transport.fetch_pools(url.trim_end_matches('/')).await?;
    record.stamp_available(started.elapsed().as_millis() as u64);
    debug!(url, pools = pools.len(), "Fetched mining core data");

    let data = project_pool(&record, types, ValueFormatter::pool());
    let status = record.status().unwrap_or(Availability::Available);
    let last_update = record.last_update().unwrap_or_default().to_string();

    record.insert("pools", Value::Array(pools.clone()));
    Ok(MiningCoreSnapshot {
        status,
        last_update,
        pools,
        data,
        raw: record.into_value(),
    })
}
