use crate::errors::{DocketError, DocketResult, ErrorKind};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Represents a field value of a [crate::collection::Document].
///
/// # Purpose
/// Provides a unified representation for the values a managed document database
/// stores: primitives, timestamps, arrays and nested maps.
///
/// # Variants
/// - Null: Absence of a value
/// - Bool(bool): Boolean true/false
/// - Int(i64): Integer value
/// - Float(f64): Floating point value
/// - String(String): Text value
/// - Timestamp(DateTime<Utc>): Server or client assigned point in time
/// - Array(Vec<Value>): Ordered collection of values
/// - Map(BTreeMap<String, Value>): Nested key-value map
///
/// # Usage
/// Create values using the `From` implementations:
/// ```text
/// let v1: Value = 42.into();
/// let v2 = Value::from("hello");
/// let fields = fields! { name: "Groceries", tags: ["food", "weekly"] };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Represents a null value.
    #[default]
    Null,
    /// Represents a boolean value.
    Bool(bool),
    /// Represents a signed 64-bit integer value.
    Int(i64),
    /// Represents a 64-bit floating point value.
    Float(f64),
    /// Represents a string value.
    String(String),
    /// Represents a timestamp value.
    Timestamp(DateTime<Utc>),
    /// Represents an array value.
    Array(Vec<Value>),
    /// Represents a nested map.
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `f64` for both integer and float values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Timestamp(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns whether the value counts as set when used as a flag.
    ///
    /// `Null`, `false`, zero, NaN and the empty string are falsy; everything
    /// else, including empty arrays and maps, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(v) => *v,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0 && !v.is_nan(),
            Value::String(v) => !v.is_empty(),
            Value::Timestamp(_) | Value::Array(_) | Value::Map(_) => true,
        }
    }

    /// Renders the value as plain text, the way it appears in a table cell or a CSV column.
    ///
    /// Strings are returned unquoted, arrays are joined with `,` and maps are
    /// rendered as compact JSON.
    pub fn to_plain_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::String(v) => v.clone(),
            Value::Timestamp(v) => v.to_rfc3339(),
            Value::Array(values) => values
                .iter()
                .map(|v| v.to_plain_string())
                .collect::<Vec<_>>()
                .join(","),
            Value::Map(_) => self.to_json().to_string(),
        }
    }

    /// Converts the value to JSON.
    ///
    /// Timestamps use the `{ "seconds": .., "nanoseconds": .. }` shape the
    /// managed backend exports, so a backup can be re-imported as timestamps.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(v) => serde_json::Value::String(v.clone()),
            Value::Timestamp(v) => serde_json::json!({
                "seconds": v.timestamp(),
                "nanoseconds": v.timestamp_subsec_nanos(),
            }),
            Value::Array(values) => {
                serde_json::Value::Array(values.iter().map(|v| v.to_json()).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Converts JSON into a value.
    ///
    /// An object holding exactly `seconds` and `nanoseconds` integers is read
    /// back as a timestamp. Numbers that do not fit `i64` become floats.
    pub fn from_json(json: &serde_json::Value) -> DocketResult<Value> {
        let value = match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::Bool(*v),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => match n.as_f64() {
                    Some(f) => Value::Float(f),
                    None => {
                        log::error!("Unsupported JSON number {}", n);
                        return Err(DocketError::new(
                            &format!("Unsupported JSON number {}", n),
                            ErrorKind::EncodingError,
                        ));
                    }
                },
            },
            serde_json::Value::String(v) => Value::String(v.clone()),
            serde_json::Value::Array(values) => Value::Array(
                values
                    .iter()
                    .map(Value::from_json)
                    .collect::<DocketResult<Vec<_>>>()?,
            ),
            serde_json::Value::Object(map) => {
                if let Some(ts) = timestamp_from_json(map) {
                    Value::Timestamp(ts)
                } else {
                    let mut result = BTreeMap::new();
                    for (key, value) in map {
                        result.insert(key.clone(), Value::from_json(value)?);
                    }
                    Value::Map(result)
                }
            }
        };
        Ok(value)
    }
}

fn timestamp_from_json(map: &serde_json::Map<String, serde_json::Value>) -> Option<DateTime<Utc>> {
    if map.len() != 2 {
        return None;
    }
    let seconds = map.get("seconds")?.as_i64()?;
    let nanos = map.get("nanoseconds")?.as_u64()?;
    let nanos = u32::try_from(nanos).ok()?;
    Utc.timestamp_opt(seconds, nanos).single()
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Value::from_json(&json).map_err(serde::de::Error::custom)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Value::Map(value)
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
