//! Row and item value types
//!
//! [`RawItem`] is a JSON object exactly as the remote API returned it.
//! [`NormalizedRow`] is the engine's output unit: column name to [`ColumnValue`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Declared type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Int,
    Bool,
    Timestamp,
    Json,
}

impl ColumnType {
    /// The value used when a source field is absent and the column asks
    /// for a default instead of null.
    #[must_use]
    pub fn zero(self) -> ColumnValue {
        match self {
            ColumnType::String => ColumnValue::String(String::new()),
            ColumnType::Int => ColumnValue::Int(0),
            ColumnType::Bool => ColumnValue::Bool(false),
            ColumnType::Timestamp | ColumnType::Json => ColumnValue::Null,
        }
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    /// No value.
    Null,
    String(String),
    Int(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    /// Nested JSON (objects, arrays, union payloads).
    Json(Value),
}

impl ColumnValue {
    /// Convert a JSON value to a cell of the given type.
    ///
    /// Values that do not fit the type become [`ColumnValue::Null`].
    #[must_use]
    pub fn from_json(value: &Value, kind: ColumnType) -> Self {
        if value.is_null() {
            return ColumnValue::Null;
        }
        match kind {
            ColumnType::String => match value {
                Value::String(s) => ColumnValue::String(s.clone()),
                Value::Number(n) => ColumnValue::String(n.to_string()),
                Value::Bool(b) => ColumnValue::String(b.to_string()),
                _ => ColumnValue::Null,
            },
            ColumnType::Int => value.as_i64().map_or(ColumnValue::Null, ColumnValue::Int),
            ColumnType::Bool => value.as_bool().map_or(ColumnValue::Null, ColumnValue::Bool),
            ColumnType::Timestamp => value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map_or(ColumnValue::Null, |dt| {
                    ColumnValue::Timestamp(dt.with_timezone(&Utc))
                }),
            ColumnType::Json => ColumnValue::Json(value.clone()),
        }
    }

    /// Check if this is a null value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    /// Get as a string if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColumnValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text form used for key comparison and endpoint rendering.
    ///
    /// Returns `None` for null, JSON and empty-string values.
    #[must_use]
    pub fn as_key(&self) -> Option<String> {
        match self {
            ColumnValue::String(s) if !s.is_empty() => Some(s.clone()),
            ColumnValue::Int(i) => Some(i.to_string()),
            ColumnValue::Bool(b) => Some(b.to_string()),
            ColumnValue::Timestamp(ts) => Some(ts.to_rfc3339()),
            _ => None,
        }
    }
}

impl From<String> for ColumnValue {
    fn from(s: String) -> Self {
        ColumnValue::String(s)
    }
}

impl From<&str> for ColumnValue {
    fn from(s: &str) -> Self {
        ColumnValue::String(s.to_string())
    }
}

impl From<i64> for ColumnValue {
    fn from(i: i64) -> Self {
        ColumnValue::Int(i)
    }
}

impl From<bool> for ColumnValue {
    fn from(b: bool) -> Self {
        ColumnValue::Bool(b)
    }
}

impl From<Value> for ColumnValue {
    fn from(v: Value) -> Self {
        ColumnValue::Json(v)
    }
}

impl From<DateTime<Utc>> for ColumnValue {
    fn from(ts: DateTime<Utc>) -> Self {
        ColumnValue::Timestamp(ts)
    }
}

/// A normalized output row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    #[serde(flatten)]
    columns: BTreeMap<String, ColumnValue>,
}

impl NormalizedRow {
    /// Create a new empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<ColumnValue>) {
        self.columns.insert(column.into(), value.into());
    }

    /// Set a column value using builder pattern.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
        self.set(column, value);
        self
    }

    /// Get a column value.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.columns.get(column)
    }

    /// Get a string column.
    #[must_use]
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(ColumnValue::as_str)
    }

    /// Key form of a column, see [`ColumnValue::as_key`].
    #[must_use]
    pub fn key(&self, column: &str) -> Option<String> {
        self.get(column).and_then(ColumnValue::as_key)
    }

    /// Whether the column holds a non-null value.
    #[must_use]
    pub fn is_populated(&self, column: &str) -> bool {
        self.get(column).is_some_and(|v| !v.is_null())
    }

    /// Get all column names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Get the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the row is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate over all columns.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ColumnValue)> {
        self.columns.iter()
    }

    /// Convert into the underlying map.
    #[must_use]
    pub fn into_map(self) -> BTreeMap<String, ColumnValue> {
        self.columns
    }
}

impl FromIterator<(String, ColumnValue)> for NormalizedRow {
    fn from_iter<T: IntoIterator<Item = (String, ColumnValue)>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Typed extraction from a JSON field.
pub trait FromField: Sized {
    fn from_field(value: &Value) -> Option<Self>;
}

impl FromField for String {
    fn from_field(value: &Value) -> Option<Self> {
        value.as_str().map(String::from)
    }
}

impl FromField for i64 {
    fn from_field(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FromField for i32 {
    fn from_field(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|i| i32::try_from(i).ok())
    }
}

impl FromField for bool {
    fn from_field(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromField for DateTime<Utc> {
    fn from_field(value: &Value) -> Option<Self> {
        value
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

impl FromField for Value {
    fn from_field(value: &Value) -> Option<Self> {
        (!value.is_null()).then(|| value.clone())
    }
}

/// An item exactly as returned by the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawItem(Value);

impl RawItem {
    /// Wrap a JSON value.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Look up a dotted path (`"profile.login"`, `"_links.self"`).
    #[must_use]
    pub fn field(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.0, |current, segment| current.get(segment))
            .filter(|v| !v.is_null())
    }

    /// Typed lookup of a dotted path.
    #[must_use]
    pub fn get<T: FromField>(&self, path: &str) -> Option<T> {
        self.field(path).and_then(T::from_field)
    }

    /// Typed lookup that falls back to `T::default()` when the field is
    /// absent, null or of the wrong type.
    #[must_use]
    pub fn get_or_default<T: FromField + Default>(&self, path: &str) -> T {
        self.get(path).unwrap_or_default()
    }

    /// Convert a dotted path to a cell of the given type.
    #[must_use]
    pub fn column_value(&self, path: &str, kind: ColumnType) -> ColumnValue {
        self.field(path)
            .map_or(ColumnValue::Null, |v| ColumnValue::from_json(v, kind))
    }

    /// Borrow the underlying JSON.
    #[must_use]
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    /// Take the underlying JSON.
    #[must_use]
    pub fn into_json(self) -> Value {
        self.0
    }
}

impl From<Value> for RawItem {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
