//! Miningcore HTTP 传输
//!
//! 读取 `GET {url}/api/pools`，把第一个矿池的 `networkStats`、`poolStats`
//! 与累计字段展开成一条扁平记录。

use super::{MiningCoreTransport, PoolReport};
use crate::error::TransportError;
use crate::telemetry::TelemetryRecord;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

const POOL_TOTALS: &[&str] = &[
    "totalPaid",
    "totalBlocks",
    "totalConfirmedBlocks",
    "totalPendingBlocks",
    "lastPoolBlockTime",
    "blockReward",
];

#[derive(Debug, Clone)]
pub struct HttpMiningCoreTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpMiningCoreTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl MiningCoreTransport for HttpMiningCoreTransport {
    async fn fetch_pools(&self, url: &str) -> Result<PoolReport, TransportError> {
        let endpoint = format!("{}/api/pools", url.trim_end_matches('/'));
        debug!("GET {}", endpoint);

        let body = self
            .client
            .get(&endpoint)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| TransportError::from_reqwest(&endpoint, e))?
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode {
                url: endpoint.clone(),
                error: e.to_string(),
            })?;

        flatten_pools(&body).ok_or_else(|| TransportError::Decode {
            url: endpoint,
            error: "expected an object with a pools array".to_string(),
        })
    }
}

/// 展开 Miningcore 的矿池列表
pub fn flatten_pools(body: &Value) -> Option<PoolReport> {
    let pools = body.get("pools")?.as_array()?;
    let mut record = TelemetryRecord::new();

    if let Some(pool) = pools.first() {
        if let Some(Value::Object(network)) = pool.get("networkStats") {
            for (key, value) in network {
                let key = match key.as_str() {
                    "lastNetworkBlockTime" => "lastBlockTime",
                    other => other,
                };
                record.insert(key, value.clone());
            }
        }
        if let Some(Value::Object(stats)) = pool.get("poolStats") {
            for (key, value) in stats {
                record.insert(key.clone(), value.clone());
            }
        }
        for key in POOL_TOTALS {
            if let Some(value) = pool.get(*key) {
                record.insert(*key, value.clone());
            }
        }
    }

    let summaries = pools.iter().map(summarize_pool).collect();
    Some(PoolReport {
        record,
        pools: summaries,
    })
}

fn summarize_pool(pool: &Value) -> Value {
    let mut summary = Map::new();
    summary.insert("id".to_string(), pool.get("id").cloned().unwrap_or(Value::Null));
    let name = pool
        .pointer("/coin/name")
        .or_else(|| pool.get("id"))
        .cloned()
        .unwrap_or(Value::Null);
    summary.insert("name".to_string(), name);
    if let Some(stats) = pool.get("poolStats") {
        for key in ["connectedMiners", "poolHashrate"] {
            summary.insert(key.to_string(), stats.get(key).cloned().unwrap_or(json!(0)));
        }
    }
    for key in POOL_TOTALS {
        if let Some(value) = pool.get(*key) {
            summary.insert(key.to_string(), value.clone());
        }
    }
    Value::Object(summary)
}
