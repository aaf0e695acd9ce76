//! Typed column values used to describe record writes.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// An ordered column name to value mapping.
pub type ColumnMap = BTreeMap<String, ColumnValue>;

/// A single bindable column value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    /// Stored as its JSON text encoding.
    Json(serde_json::Value),
    Timestamp(DateTime<Utc>),
}

impl ColumnValue {
    /// Returns `true` for [`ColumnValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ColumnValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&String> for ColumnValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<serde_json::Value> for ColumnValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<DateTime<Utc>> for ColumnValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Builds a [`ColumnMap`] from `name => value` pairs.
///
/// ```
/// use keel_core::columns;
///
/// let map = columns! { "key" => "settings", "enabled" => true };
/// assert_eq!(map.len(), 2);
/// ```
#[macro_export]
macro_rules! columns {
    ($($name:expr => $value:expr),* $(,)?) => {{
        let mut map = $crate::ColumnMap::new();
        $(map.insert(($name).to_string(), $crate::ColumnValue::from($value));)*
        map
    }};
}
