//! Generic key/value record.

use crate::{columns, BaseModel, ColumnMap, Model};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key of the param that stores the application settings blob.
pub const PARAM_APP_SETTINGS: &str = "settings";

/// A unique key mapped to an opaque JSON payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Param {
    #[serde(flatten)]
    pub base: BaseModel,
    pub key: String,
    pub value: Value,
}

impl Param {
    /// Creates a new, not yet persisted param.
    #[must_use]
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            base: BaseModel::default(),
            key: key.into(),
            value,
        }
    }
}

impl Model for Param {
    fn table_name(&self) -> &'static str {
        "params"
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }

    fn columns(&self) -> ColumnMap {
        columns! {
            "key" => self.key.as_str(),
            "value" => self.value.clone(),
        }
    }
}
