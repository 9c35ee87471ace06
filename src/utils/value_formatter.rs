//! 遥测值格式化工具
//!
//! 将设备或矿池上报的原始值按照类型表中的类型与单位转换为可读字符串。
//! 所有格式化函数都是纯函数且不会失败：无法识别的输入会退化为通用格式，
//! 缺失值显示为 `N/A`。

use crate::mapping::FieldType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// 设备级算力单位
const DEVICE_HASHRATE_UNITS: &[&str] = &["H/s", "KH/s", "MH/s", "GH/s", "TH/s", "PH/s"];
/// 矿池/全网级算力单位
const POOL_HASHRATE_UNITS: &[&str] = &["H/s", "KH/s", "MH/s", "GH/s", "TH/s", "PH/s", "EH/s"];
const DEVICE_DIFFICULTY_UNITS: &[&str] = &["", "K", "M", "G", "T"];
const POOL_DIFFICULTY_UNITS: &[&str] = &["", "K", "M", "G", "T", "P", "E"];

/// 单位缩放档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleProfile {
    /// 单台设备，算力最高到 PH/s
    #[default]
    Device,
    /// 矿池或全网数据，算力最高到 EH/s
    Pool,
}

impl ScaleProfile {
    fn hashrate_units(self) -> &'static [&'static str] {
        match self {
            ScaleProfile::Device => DEVICE_HASHRATE_UNITS,
            ScaleProfile::Pool => POOL_HASHRATE_UNITS,
        }
    }

    fn difficulty_units(self) -> &'static [&'static str] {
        match self {
            ScaleProfile::Device => DEVICE_DIFFICULTY_UNITS,
            ScaleProfile::Pool => POOL_DIFFICULTY_UNITS,
        }
    }
}

/// 值格式化器
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueFormatter {
    profile: ScaleProfile,
}

impl ValueFormatter {
    pub fn new(profile: ScaleProfile) -> Self {
        Self { profile }
    }

    pub fn device() -> Self {
        Self::new(ScaleProfile::Device)
    }

    pub fn pool() -> Self {
        Self::new(ScaleProfile::Pool)
    }

    pub fn profile(&self) -> ScaleProfile {
        self.profile
    }

    /// 格式化一个可能缺失的值
    pub fn format(&self, value: Option<&Value>, field_type: &FieldType, unit: &str) -> String {
        match value {
            Some(value) => self.format_value(value, field_type, unit),
            None => "N/A".to_string(),
        }
    }

    /// 按优先级规则格式化：空值、布尔值、显式类型、最后按类型名/单位嗅探
    pub fn format_value(&self, value: &Value, field_type: &FieldType, unit: &str) -> String {
        let number = match value {
            Value::Null => return "N/A".to_string(),
            Value::Bool(flag) => return if *flag { "Yes" } else { "No" }.to_string(),
            other => as_number(other),
        };

        match (field_type, number) {
            // 设备上报 GH/s，矿池上报 H/s；按类型表单位先折算成 H/s 再统一缩放
            (FieldType::Hashrate, Some(n)) => format_hashrate(to_hashes(n, unit), self.profile),
            (FieldType::Difficulty, Some(n)) => format_difficulty(n, self.profile),
            (FieldType::Voltage, Some(n)) => format_voltage(n),
            (FieldType::Power, Some(n)) => format!("{:.1} W", n),
            (FieldType::Frequency, _) => format!("{} MHz", display(value)),
            (FieldType::Temperature, Some(n)) => format_temperature(n),
            (FieldType::Percentage, _) => format!("{}%", display(value)),
            (FieldType::Uptime, Some(n)) => format_uptime(seconds_from(n)),
            (FieldType::Number, Some(_)) => format_number(value),
            (FieldType::Currency, Some(n)) => {
                let unit = if unit.is_empty() { "BTC" } else { unit };
                format!("{:.8} {}", n, unit)
            }
            (FieldType::Datetime, _) => format_datetime(value),
            (FieldType::String, _) => display(value),
            (FieldType::Other(name), _) => sniff(value, name, unit),
            // 数值类型却收到非数值，退化为通用格式
            _ => generic(value, unit),
        }
    }
}

/// 未知类型：仅对 JSON 数值按类型名或单位推断
fn sniff(value: &Value, type_name: &str, unit: &str) -> String {
    let Some(n) = value.as_f64() else {
        return generic(value, unit);
    };
    let lower = type_name.to_lowercase();

    if lower.contains("temp") {
        format_temperature(n)
    } else if lower.contains("voltage") || unit == "V" {
        format_voltage(n)
    } else if lower.contains("rpm") || unit == "RPM" {
        format!("{} RPM", display(value))
    } else if lower.contains("rssi") || unit == "dBm" {
        format!("{} dBm", display(value))
    } else {
        generic(value, unit)
    }
}

fn generic(value: &Value, unit: &str) -> String {
    if unit.is_empty() {
        display(value)
    } else {
        format!("{} {}", display(value), unit)
    }
}

/// 逐级除以 1000 直到数值小于 1000 或已到最大单位
fn scale(value: f64, units: &[&'static str]) -> (f64, &'static str) {
    let mut scaled = value;
    let mut index = 0;
    while scaled >= 1000.0 && index < units.len() - 1 {
        scaled /= 1000.0;
        index += 1;
    }
    (scaled, units[index])
}

/// 类型表中的算力单位描述的是原始值的单位，先统一换算为 H/s
fn to_hashes(value: f64, unit: &str) -> f64 {
    match POOL_HASHRATE_UNITS.iter().position(|u| u.eq_ignore_ascii_case(unit)) {
        Some(index) => value * 1000f64.powi(index as i32),
        None => value,
    }
}

/// 格式化算力（输入单位 H/s）
///
/// ```
/// use bitaxe_dashboard::utils::{format_hashrate, ScaleProfile};
///
/// assert_eq!(format_hashrate(1_540_000_000_000.0, ScaleProfile::Device), "1.54 TH/s");
/// ```
pub fn format_hashrate(value: f64, profile: ScaleProfile) -> String {
    let (scaled, unit) = scale(value, profile.hashrate_units());
    format!("{:.2} {}", scaled, unit)
}

/// 格式化难度，单位后缀紧跟数值
pub fn format_difficulty(value: f64, profile: ScaleProfile) -> String {
    let (scaled, unit) = scale(value, profile.difficulty_units());
    format!("{:.2}{}", scaled, unit)
}

/// 大于 100 的读数按毫伏处理。
///
/// 这一推断是有损的：真实电压超过 100V 或毫伏读数不超过 100 时都会被误判。
pub fn format_voltage(value: f64) -> String {
    let volts = if value > 100.0 { value / 1000.0 } else { value };
    format!("{:.2} V", volts)
}

pub fn format_temperature(value: f64) -> String {
    format!("{:.1}°C", value)
}

/// 将秒数拆分为天/时/分/秒，只输出非零部分
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{}s", secs));
    }

    parts.join(" ")
}

/// 千分位分组，最多保留三位小数（en-US 习惯）
pub fn format_number(value: &Value) -> String {
    match value {
        Value::Number(n) if n.is_u64() || n.is_i64() => group_digits(&n.to_string()),
        other => match as_number(other) {
            Some(n) if n.is_finite() => {
                let rounded = format!("{:.3}", n);
                let (integer, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
                let fraction = fraction.trim_end_matches('0');
                let grouped = group_digits(integer);
                if fraction.is_empty() {
                    grouped
                } else {
                    format!("{}.{}", grouped, fraction)
                }
            }
            _ => display(other),
        },
    }
}

fn group_digits(integer: &str) -> String {
    let (sign, digits) = match integer.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer),
    };
    if sign == "-" && digits.chars().all(|c| c == '0') {
        return digits.to_string();
    }

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}", sign, grouped)
}

/// 日期时间统一按 UTC 渲染为 `M/D/YYYY, h:mm:ss AM`
pub fn format_datetime(value: &Value) -> String {
    match parse_datetime(value) {
        Some(datetime) => datetime.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
        None => "Invalid Date".to_string(),
    }
}

fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        // 数值按毫秒时间戳处理
        Value::Number(n) => {
            let millis = n.as_f64()?;
            if !millis.is_finite() {
                return None;
            }
            Utc.timestamp_millis_opt(millis as i64).single()
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
                return Some(datetime.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(naive.and_utc());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}

/// 数值或可解析为数值的字符串
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn seconds_from(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.floor() as u64
    } else {
        0
    }
}

/// 原样显示：字符串不加引号，整数值的浮点数不带小数点
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_f64() => n.as_f64().map(display_f64).unwrap_or_else(|| n.to_string()),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn display_f64(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e21 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
