//! 内置默认映射，首次启动时写入数据目录

use super::{Category, FieldMapping, FieldSpec, FieldType, MappingCatalog, TypeTable};

const MINING_METRICS: &[(&str, &str)] = &[
    ("hashRate", "Hashrate"),
    ("expectedHashrate", "Expect Hashrate"),
    ("bestDiff", "Best Difficulty"),
    ("bestSessionDiff", "Best Session Difficulty"),
    ("poolDifficulty", "Pool Difficulty"),
    ("sharesAccepted", "Shares Accepted"),
    ("sharesRejected", "Shares Rejected"),
    ("sharesRejectedReasons", "Shares Rejected Reasons"),
    ("responseTime", "Response Time"),
];

const GENERAL_INFORMATION: &[(&str, &str)] = &[
    ("hostname", "Hostname"),
    ("power", "Power"),
    ("voltage", "Voltage"),
    ("coreVoltageActual", "ASIC Voltage"),
    ("frequency", "Frequency"),
    ("temp", "ASIC Temp"),
    ("vrTemp", "VR Temp"),
    ("fanspeed", "Fan Speed"),
    ("minFanSpeed", "Min Fan Speed"),
    ("fanrpm", "Fan RPM"),
    ("temptarget", "Target Temp"),
    ("overheat_mode", "Over Heat Mode"),
    ("uptimeSeconds", "Uptime"),
    ("coreVoltage", "Core Voltage"),
    ("current", "Current"),
    ("wifiRSSI", "Wifi RSSI"),
    ("stratumURL", "Stratum URL"),
    ("stratumUser", "Stratum User"),
    ("stratumPort", "Stratum Port"),
    ("isUsingFallbackStratum", "Using Fallback Stratum"),
    ("axeOSVersion", "AxeOS Version"),
    ("idfVersion", "IDF Version"),
    ("boardVersion", "Board Version"),
    ("ASICModel", "ASIC Chip"),
];

/// (key, displayName, type, unit)
const TYPE_TABLE: &[(&str, &str, &str, &str)] = &[
    // 矿池/全网字段
    ("networkHashrate", "Network Hashrate", "hashrate", "H/s"),
    ("networkDifficulty", "Network Difficulty", "difficulty", ""),
    ("lastBlockTime", "Last Block Time", "datetime", ""),
    ("blockHeight", "Block Height", "number", ""),
    ("connectedPeers", "Connected Peers", "number", ""),
    ("nodeVersion", "Node Version", "string", ""),
    ("connectedMiners", "Connected Miners", "number", ""),
    ("poolHashrate", "Pool Hashrate", "hashrate", "H/s"),
    ("totalPaid", "Total Paid", "currency", "BTC"),
    ("totalBlocks", "Total Blocks", "number", ""),
    ("totalConfirmedBlocks", "Total Confirmed Blocks", "number", ""),
    ("totalPendingBlocks", "Total Pending Blocks", "number", ""),
    ("lastPoolBlockTime", "Last Pool Block Time", "datetime", ""),
    ("blockReward", "Block Reward", "currency", "BTC"),
    // AxeOS 设备字段
    ("hashRate", "Hashrate", "hashrate", "GH/s"),
    ("expectedHashrate", "Expect Hashrate", "hashrate", "GH/s"),
    ("bestDiff", "Best Difficulty", "difficulty", ""),
    ("bestSessionDiff", "Best Session Difficulty", "difficulty", ""),
    ("poolDifficulty", "Pool Difficulty", "difficulty", ""),
    ("sharesAccepted", "Shares Accepted", "number", ""),
    ("sharesRejected", "Shares Rejected", "number", ""),
    ("responseTime", "Response Time", "latency", "ms"),
    ("power", "Power", "power", "W"),
    ("voltage", "Voltage", "voltage", "V"),
    ("coreVoltageActual", "ASIC Voltage", "voltage", "V"),
    ("frequency", "Frequency", "frequency", "MHz"),
    ("temp", "ASIC Temp", "temperature", "°C"),
    ("vrTemp", "VR Temp", "temperature", "°C"),
    ("fanspeed", "Fan Speed", "percentage", "%"),
    ("minFanSpeed", "Min Fan Speed", "percentage", "%"),
    ("fanrpm", "Fan RPM", "rpm", "RPM"),
    ("temptarget", "Target Temp", "temperature", "°C"),
    ("uptimeSeconds", "Uptime", "uptime", ""),
    ("coreVoltage", "Core Voltage", "voltage", "V"),
    ("current", "Current", "current", "mA"),
    ("wifiRSSI", "Wifi RSSI", "rssi", "dBm"),
];

fn category(name: &str, fields: &[(&str, &str)]) -> Category {
    Category {
        name: name.to_string(),
        fields: fields
            .iter()
            .map(|(key, display_name)| FieldMapping::new(*key, *display_name))
            .collect(),
    }
}

/// 默认设备目录
pub fn default_catalog() -> MappingCatalog {
    MappingCatalog {
        categories: vec![
            category("Mining Metrics", MINING_METRICS),
            category("General Information", GENERAL_INFORMATION),
        ],
    }
}

/// 默认字段类型表
pub fn default_type_table() -> TypeTable {
    let entries = TYPE_TABLE
        .iter()
        .map(|(key, display_name, field_type, unit)| {
            (
                key.to_string(),
                FieldSpec::new(display_name, FieldType::from(*field_type), unit),
            )
        })
        .collect::<Vec<_>>();
    let index = entries
        .iter()
        .enumerate()
        .map(|(position, (key, _))| (key.clone(), position))
        .collect();
    TypeTable { entries, index }
}
