//! 演示用的模拟矿池

use super::{http::flatten_pools, MiningCoreTransport, PoolReport};
use crate::error::TransportError;
use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::json;

#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedMiningCoreTransport;

#[async_trait]
impl MiningCoreTransport for SimulatedMiningCoreTransport {
    async fn fetch_pools(&self, url: &str) -> Result<PoolReport, TransportError> {
        let now = Utc::now();
        let iso = |offset: Duration| (now - offset).to_rfc3339_opts(SecondsFormat::Millis, true);

        let body = json!({
            "pools": [{
                "id": "btc1",
                "coin": { "type": "BTC", "name": "Bitcoin Pool" },
                "networkStats": {
                    "networkHashrate": 450_000_000_000_000_000_u64,
                    "networkDifficulty": 35_000_000_000_000_u64,
                    "lastNetworkBlockTime": iso(Duration::minutes(10)),
                    "blockHeight": 810000,
                    "connectedPeers": 8,
                    "nodeVersion": "25.0.0"
                },
                "poolStats": {
                    "connectedMiners": 245,
                    "poolHashrate": 125_000_000_000_000_u64
                },
                "totalPaid": 1.2543,
                "totalBlocks": 142,
                "totalConfirmedBlocks": 140,
                "totalPendingBlocks": 2,
                "lastPoolBlockTime": iso(Duration::hours(2)),
                "blockReward": 6.25
            }]
        });

        flatten_pools(&body).ok_or_else(|| TransportError::Decode {
            url: url.to_string(),
            error: "simulated pool data is malformed".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::default_type_table;
    use crate::mining_core::fetch_snapshot;

    #[tokio::test]
    async fn test_simulated_snapshot_covers_type_table() {
        let types = default_type_table();
        let snapshot = fetch_snapshot(&SimulatedMiningCoreTransport, "http://pool.local", &types)
            .await
            .unwrap();

        let keys: Vec<_> = snapshot.data.keys().collect();
        // 14 个矿池字段，外加读取时写入的 responseTime
        assert_eq!(keys.len(), 15);
        assert_eq!(keys[0], "networkHashrate");
        assert_eq!(keys[14], "responseTime");
        assert_eq!(snapshot.data.get("networkHashrate").unwrap().formatted, "450.00 PH/s");
        assert_eq!(snapshot.data.get("totalPaid").unwrap().formatted, "1.25430000 BTC");
        assert_eq!(snapshot.data.get("blockHeight").unwrap().formatted, "810,000");
        assert_eq!(snapshot.pools[0]["name"], "Bitcoin Pool");
    }
}
