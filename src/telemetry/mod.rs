//! 遥测处理
//!
//! 将一次轮询得到的扁平遥测记录与映射目录、类型表连接，生成按分类组织的
//! 显示记录。输出顺序与目录声明顺序严格一致，遥测中缺失的字段直接跳过。

use crate::mapping::{FieldType, MappingCatalog, TypeTable};
use crate::utils::ValueFormatter;
use chrono::{SecondsFormat, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;

/// 设备或矿池的可用状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Unavailable,
}

/// 一次轮询的原始遥测记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryRecord {
    fields: Map<String, Value>,
}

impl TelemetryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// 只接受 JSON 对象
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn status(&self) -> Option<Availability> {
        match self.fields.get("status").and_then(Value::as_str) {
            Some("available") => Some(Availability::Available),
            Some("unavailable") => Some(Availability::Unavailable),
            _ => None,
        }
    }

    pub fn last_update(&self) -> Option<&str> {
        self.fields.get("lastUpdate").and_then(Value::as_str)
    }

    /// 标记为成功获取：写入状态、时间戳与响应耗时
    pub fn stamp_available(&mut self, response_time_ms: u64) {
        self.insert("status", "available");
        self.insert("lastUpdate", now_iso());
        self.insert("responseTime", response_time_ms);
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Map<String, Value>> for TelemetryRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// 一个遥测值的格式化投影，每次轮询重新计算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRecord {
    pub key: String,
    pub raw: Value,
    pub formatted: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryView {
    pub name: String,
    pub records: Vec<DisplayRecord>,
}

/// 处理结果，序列化为按目录顺序排列的 `{分类名: [DisplayRecord]}` 对象
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedCategories(pub Vec<CategoryView>);

impl ProcessedCategories {
    pub fn get(&self, name: &str) -> Option<&[DisplayRecord]> {
        self.0
            .iter()
            .find(|category| category.name == name)
            .map(|category| category.records.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryView> {
        self.0.iter()
    }
}

impl Serialize for ProcessedCategories {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for category in &self.0 {
            map.serialize_entry(&category.name, &category.records)?;
        }
        map.end()
    }
}

/// 遥测处理器
#[derive(Debug, Clone, Copy)]
pub struct TelemetryProcessor<'a> {
    catalog: &'a MappingCatalog,
    types: &'a TypeTable,
    formatter: ValueFormatter,
}

impl<'a> TelemetryProcessor<'a> {
    pub fn new(catalog: &'a MappingCatalog, types: &'a TypeTable, formatter: ValueFormatter) -> Self {
        Self {
            catalog,
            types,
            formatter,
        }
    }

    /// 按目录顺序生成分类显示记录；每个分类都会出现，即使为空
    pub fn process(&self, telemetry: &TelemetryRecord) -> ProcessedCategories {
        let categories = self
            .catalog
            .categories()
            .iter()
            .map(|category| {
                let records = category
                    .fields
                    .iter()
                    .filter_map(|mapping| {
                        let raw = telemetry.get(&mapping.key)?;
                        let (field_type, unit) = match self.types.get(&mapping.key) {
                            Some(spec) => (spec.field_type.clone(), spec.unit.clone()),
                            None => (FieldType::String, String::new()),
                        };
                        Some(DisplayRecord {
                            key: mapping.key.clone(),
                            raw: raw.clone(),
                            formatted: self.formatter.format_value(raw, &field_type, &unit),
                            display_name: mapping.display_name.clone(),
                            field_type,
                            unit,
                        })
                    })
                    .collect();

                CategoryView {
                    name: category.name.clone(),
                    records,
                }
            })
            .collect();

        ProcessedCategories(categories)
    }
}

/// 矿池数据的单字段投影
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolField {
    pub raw: Value,
    pub formatted: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// 矿池数据投影，按类型表顺序序列化为 `{字段键: PoolField}`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolProjection(pub Vec<(String, PoolField)>);

impl PoolProjection {
    pub fn get(&self, key: &str) -> Option<&PoolField> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, field)| field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }
}

impl Serialize for PoolProjection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, field) in &self.0 {
            map.serialize_entry(key, field)?;
        }
        map.end()
    }
}

/// 按文档顺序读取 JSON 对象的键值对
struct OrderedEntries<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedEntries<T> {
    type Value = Vec<(String, T)>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(entry) = access.next_entry::<String, T>()? {
            entries.push(entry);
        }
        Ok(entries)
    }
}

impl<'de> Deserialize<'de> for ProcessedCategories {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = deserializer.deserialize_map(OrderedEntries::<Vec<DisplayRecord>>(PhantomData))?;
        Ok(ProcessedCategories(
            entries
                .into_iter()
                .map(|(name, records)| CategoryView { name, records })
                .collect(),
        ))
    }
}

impl<'de> Deserialize<'de> for PoolProjection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_map(OrderedEntries::<PoolField>(PhantomData))
            .map(PoolProjection)
    }
}

/// 以类型表为目录投影矿池记录
pub fn project_pool(record: &TelemetryRecord, types: &TypeTable, formatter: ValueFormatter) -> PoolProjection {
    let fields = types
        .iter()
        .filter_map(|(key, spec)| {
            let raw = record.get(key)?;
            Some((
                key.to_string(),
                PoolField {
                    raw: raw.clone(),
                    formatted: formatter.format_value(raw, &spec.field_type, &spec.unit),
                    display_name: spec.display_name.clone(),
                    field_type: spec.field_type.clone(),
                },
            ))
        })
        .collect();

    PoolProjection(fields)
}

/// ISO-8601 UTC 时间戳，毫秒精度
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
