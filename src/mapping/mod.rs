//! 字段映射目录
//!
//! 设备目录决定哪些遥测字段按什么分类、以什么名称显示；类型表为字段提供
//! 类型与单位，设备与矿池数据共用同一张类型表。两者都保持声明顺序。

pub mod defaults;

use crate::error::ConfigError;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;

pub use defaults::{default_catalog, default_type_table};

/// 字段值类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Hashrate,
    Difficulty,
    Voltage,
    Power,
    Frequency,
    Temperature,
    Percentage,
    Uptime,
    Number,
    Currency,
    Datetime,
    String,
    /// 未内置的类型名，格式化时按名称与单位推断
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Hashrate => "hashrate",
            FieldType::Difficulty => "difficulty",
            FieldType::Voltage => "voltage",
            FieldType::Power => "power",
            FieldType::Frequency => "frequency",
            FieldType::Temperature => "temperature",
            FieldType::Percentage => "percentage",
            FieldType::Uptime => "uptime",
            FieldType::Number => "number",
            FieldType::Currency => "currency",
            FieldType::Datetime => "datetime",
            FieldType::String => "string",
            FieldType::Other(name) => name,
        }
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "hashrate" => FieldType::Hashrate,
            "difficulty" => FieldType::Difficulty,
            "voltage" => FieldType::Voltage,
            "power" => FieldType::Power,
            "frequency" => FieldType::Frequency,
            "temperature" => FieldType::Temperature,
            "percentage" => FieldType::Percentage,
            "uptime" => FieldType::Uptime,
            "number" => FieldType::Number,
            "currency" => FieldType::Currency,
            "datetime" => FieldType::Datetime,
            "string" => FieldType::String,
            _ => FieldType::Other(name),
        }
    }
}

impl From<&str> for FieldType {
    fn from(name: &str) -> Self {
        FieldType::from(name.to_string())
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个字段的显示映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub key: String,
    pub display_name: String,
}

impl FieldMapping {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub fields: Vec<FieldMapping>,
}

/// 设备映射目录，分类与字段都保持声明顺序
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct MappingCatalog {
    categories: Vec<Category>,
}

impl MappingCatalog {
    /// 构建并校验目录
    pub fn new(categories: Vec<Category>) -> Result<Self, ConfigError> {
        let catalog = Self { categories };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// 从 JSON 文档加载。
    ///
    /// 同时接受显式格式 `[{"name": .., "fields": [{"key": .., "displayName": ..}]}]`
    /// 与旧的动态键格式 `[{"Mining Metrics": [{"hashRate": "Hashrate"}]}]`。
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let Value::Array(entries) = value else {
            return Err(invalid_catalog("catalog must be an array of categories"));
        };

        let categories = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| parse_category(index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(categories)
    }

    /// 加载期校验：空分类、空字段键、重复分类名都视为配置错误
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(invalid_catalog("category name must not be empty"));
            }
            if !names.insert(category.name.as_str()) {
                return Err(invalid_catalog(format!(
                    "duplicate category '{}'",
                    category.name
                )));
            }
            if category.fields.is_empty() {
                return Err(invalid_catalog(format!(
                    "category '{}' has no fields",
                    category.name
                )));
            }
            if let Some(position) = category.fields.iter().position(|f| f.key.trim().is_empty()) {
                return Err(invalid_catalog(format!(
                    "field #{} in category '{}' has no key",
                    position, category.name
                )));
            }
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for MappingCatalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        MappingCatalog::from_value(value).map_err(de::Error::custom)
    }
}

fn parse_category(index: usize, entry: Value) -> Result<Category, ConfigError> {
    let Value::Object(mut object) = entry else {
        return Err(invalid_catalog(format!("category #{} is not an object", index)));
    };

    if object.contains_key("name") && object.contains_key("fields") {
        let name = match object.remove("name") {
            Some(Value::String(name)) => name,
            _ => return Err(invalid_catalog(format!("category #{} name is not a string", index))),
        };
        let fields = object.remove("fields").unwrap_or(Value::Null);
        return Ok(Category {
            fields: parse_fields(&name, fields)?,
            name,
        });
    }

    // 旧格式：对象只有一个键，键名即分类名
    if object.len() != 1 {
        return Err(invalid_catalog(format!(
            "category #{} must have exactly one key in the legacy form",
            index
        )));
    }
    let (name, fields) = object
        .into_iter()
        .next()
        .ok_or_else(|| invalid_catalog(format!("category #{} is empty", index)))?;
    Ok(Category {
        fields: parse_fields(&name, fields)?,
        name,
    })
}

fn parse_fields(category: &str, fields: Value) -> Result<Vec<FieldMapping>, ConfigError> {
    let Value::Array(fields) = fields else {
        return Err(invalid_catalog(format!(
            "fields of category '{}' must be an array",
            category
        )));
    };

    fields
        .into_iter()
        .map(|field| match field {
            Value::Object(mut object) => {
                if let (Some(Value::String(key)), Some(Value::String(display_name))) =
                    (object.get("key").cloned(), object.get("displayName").cloned())
                {
                    return Ok(FieldMapping { key, display_name });
                }
                if object.len() == 1 {
                    let key = object.keys().next().cloned().unwrap_or_default();
                    if let Some(Value::String(display_name)) = object.remove(&key) {
                        return Ok(FieldMapping { key, display_name });
                    }
                }
                Err(invalid_catalog(format!(
                    "malformed field mapping in category '{}'",
                    category
                )))
            }
            _ => Err(invalid_catalog(format!(
                "field mapping in category '{}' is not an object",
                category
            ))),
        })
        .collect()
}

fn invalid_catalog(reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidCatalog {
        reason: reason.into(),
    }
}

/// 类型表中一个字段的元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub display_name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub unit: String,
}

impl FieldSpec {
    pub fn new(display_name: &str, field_type: FieldType, unit: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            field_type,
            unit: unit.to_string(),
        }
    }
}

/// 字段类型表：键到类型/单位的有序映射，序列化为 JSON 对象
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeTable {
    entries: Vec<(String, FieldSpec)>,
    index: HashMap<String, usize>,
}

impl TypeTable {
    pub fn new(entries: Vec<(String, FieldSpec)>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, (key, spec)) in entries.iter().enumerate() {
            if key.trim().is_empty() {
                return Err(invalid_catalog("type table key must not be empty"));
            }
            if spec.display_name.trim().is_empty() {
                return Err(invalid_catalog(format!(
                    "type table entry '{}' has no displayName",
                    key
                )));
            }
            if index.insert(key.clone(), position).is_some() {
                return Err(invalid_catalog(format!("duplicate type table key '{}'", key)));
            }
        }
        Ok(Self { entries, index })
    }

    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.index.get(key).map(|&position| &self.entries[position].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.entries.iter().map(|(key, spec)| (key.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for TypeTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, spec) in &self.entries {
            map.serialize_entry(key, spec)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TypeTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TypeTableVisitor;

        impl<'de> Visitor<'de> for TypeTableVisitor {
            type Value = Vec<(String, FieldSpec)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping field keys to {displayName, type, unit}")
            }

            // 按文档顺序收集，保留声明顺序
            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, spec)) = access.next_entry::<String, FieldSpec>()? {
                    entries.push((key, spec));
                }
                Ok(entries)
            }
        }

        let entries = deserializer.deserialize_map(TypeTableVisitor)?;
        TypeTable::new(entries).map_err(de::Error::custom)
    }
}
