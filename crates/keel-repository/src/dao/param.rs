//! Param lookups and writes.

use super::Dao;
use crate::Filter;
use chrono::{DateTime, Utc};
use keel_core::{BaseModel, KeelResult, Param};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use tracing::debug;

/// Database row representation of a param.
#[derive(Debug, FromRow)]
struct ParamRow {
    id: String,
    key: String,
    value: Option<String>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl TryFrom<ParamRow> for Param {
    type Error = keel_core::KeelError;

    fn try_from(row: ParamRow) -> Result<Self, Self::Error> {
        let value = match row.value.as_deref() {
            None | Some("") => Value::Null,
            Some(raw) => serde_json::from_str(raw)?,
        };

        Ok(Param {
            base: BaseModel::persisted(row.id, row.created, row.updated),
            key: row.key,
            value,
        })
    }
}

impl Dao {
    /// Finds the param stored under `key`.
    pub async fn find_param_by_key(&self, key: &str) -> KeelResult<Option<Param>> {
        debug!("Finding param by key: {}", key);

        let row: Option<ParamRow> = self
            .concurrent_db()
            .select_one("params", &Filter::new().eq("key", key))
            .await?;

        row.map(Param::try_from).transpose()
    }

    /// Stores `value` under `key`, creating the param when it is missing.
    pub async fn save_param(&self, key: &str, value: impl Serialize) -> KeelResult<Param> {
        let value = serde_json::to_value(value)?;

        let mut param = match self.find_param_by_key(key).await? {
            Some(mut existing) => {
                existing.value = value;
                existing
            }
            None => Param::new(key, value),
        };

        self.save(&mut param).await?;
        Ok(param)
    }

    /// Deletes `param`.
    pub async fn delete_param(&self, param: &mut Param) -> KeelResult<()> {
        self.delete(param).await
    }
}
