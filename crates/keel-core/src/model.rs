//! The persistable record contract.

use crate::{new_id, ColumnMap, ColumnValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Debug;

/// Identifier and lifecycle state embedded in every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseModel {
    pub id: String,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub is_not_new: bool,
}

impl BaseModel {
    /// Creates the base of a record loaded from storage.
    #[must_use]
    pub fn persisted(id: String, created: DateTime<Utc>, updated: DateTime<Utc>) -> Self {
        Self {
            id,
            created: Some(created),
            updated: Some(updated),
            is_not_new: true,
        }
    }

    /// Returns the base columns of a full-record write.
    #[must_use]
    pub fn columns(&self) -> ColumnMap {
        crate::columns! {
            "id" => self.id.as_str(),
            "created" => self.created,
            "updated" => self.updated,
        }
    }
}

/// Type-erasure helpers so records can travel through hooks as
/// `Box<dyn Model>` and be recovered afterwards.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Capability set of every persistable record.
pub trait Model: AsAny + Debug {
    /// Storage table of the concrete record type.
    fn table_name(&self) -> &'static str;

    fn base(&self) -> &BaseModel;

    fn base_mut(&mut self) -> &mut BaseModel;

    /// The record's own columns, excluding `id`, `created` and `updated`.
    ///
    /// Used for full-record writes.
    fn columns(&self) -> ColumnMap;

    /// Optional explicit column mapping for writes.
    ///
    /// When `Some`, the map is written as is instead of the full record.
    /// Inserts get the `id` column added when it is missing.
    fn column_value_map(&self) -> Option<ColumnMap> {
        None
    }

    fn id(&self) -> &str {
        &self.base().id
    }

    fn has_id(&self) -> bool {
        !self.base().id.is_empty()
    }

    fn is_new(&self) -> bool {
        !self.base().is_not_new
    }

    fn mark_as_new(&mut self) {
        self.base_mut().is_not_new = false;
    }

    fn mark_as_not_new(&mut self) {
        self.base_mut().is_not_new = true;
    }

    fn refresh_id(&mut self) {
        self.base_mut().id = new_id();
    }

    fn created(&self) -> Option<DateTime<Utc>> {
        self.base().created
    }

    fn updated(&self) -> Option<DateTime<Utc>> {
        self.base().updated
    }

    fn refresh_created(&mut self) {
        self.base_mut().created = Some(Utc::now());
    }

    fn refresh_updated(&mut self) {
        self.base_mut().updated = Some(Utc::now());
    }
}

impl dyn Model {
    /// Returns the concrete record if it is of type `T`.
    pub fn downcast_ref<T: Model>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Returns the concrete record mutably if it is of type `T`.
    pub fn downcast_mut<T: Model>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Builds the column set of a full-record write.
#[must_use]
pub fn full_record_columns(model: &dyn Model) -> ColumnMap {
    let mut columns = model.base().columns();
    columns.extend(model.columns());
    columns
}

/// Builds the column set of an insert, honoring the explicit mapping
/// capability when the record provides one.
#[must_use]
pub fn insert_columns(model: &dyn Model) -> ColumnMap {
    match model.column_value_map() {
        Some(mut columns) => {
            columns
                .entry("id".to_string())
                .or_insert_with(|| ColumnValue::from(model.id()));
            columns
        }
        None => full_record_columns(model),
    }
}

/// Builds the column set of an update. The `id` column is never part of
/// the update set.
#[must_use]
pub fn update_columns(model: &dyn Model) -> ColumnMap {
    let mut columns = model
        .column_value_map()
        .unwrap_or_else(|| full_record_columns(model));
    columns.remove("id");
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns;

    #[derive(Debug, Clone, Default)]
    struct Note {
        base: BaseModel,
        title: String,
    }

    impl Model for Note {
        fn table_name(&self) -> &'static str {
            "notes"
        }

        fn base(&self) -> &BaseModel {
            &self.base
        }

        fn base_mut(&mut self) -> &mut BaseModel {
            &mut self.base
        }

        fn columns(&self) -> ColumnMap {
            columns! { "title" => self.title.as_str() }
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Tag {
        base: BaseModel,
        label: String,
    }

    impl Model for Tag {
        fn table_name(&self) -> &'static str {
            "tags"
        }

        fn base(&self) -> &BaseModel {
            &self.base
        }

        fn base_mut(&mut self) -> &mut BaseModel {
            &mut self.base
        }

        fn columns(&self) -> ColumnMap {
            columns! { "label" => self.label.as_str(), "extra" => "unused" }
        }

        fn column_value_map(&self) -> Option<ColumnMap> {
            Some(columns! { "label" => self.label.as_str() })
        }
    }

    #[test]
    fn test_new_record_flags() {
        let mut note = Note::default();
        assert!(note.is_new());
        assert!(!note.has_id());

        note.refresh_id();
        assert!(note.has_id());
        assert!(note.is_new());

        note.mark_as_not_new();
        assert!(!note.is_new());
        note.mark_as_new();
        assert!(note.is_new());
    }

    #[test]
    fn test_refresh_timestamps() {
        let mut note = Note::default();
        assert!(note.created().is_none());
        note.refresh_created();
        note.refresh_updated();
        assert!(note.created().is_some());
        assert!(note.updated() >= note.created());
    }

    #[test]
    fn test_full_record_columns() {
        let mut note = Note {
            title: "hello".to_string(),
            ..Note::default()
        };
        note.refresh_id();

        let insert = insert_columns(&note);
        assert_eq!(
            insert.keys().cloned().collect::<Vec<_>>(),
            vec!["created", "id", "title", "updated"]
        );

        let update = update_columns(&note);
        assert!(!update.contains_key("id"));
        assert!(update.contains_key("title"));
    }

    #[test]
    fn test_explicit_column_map_wins() {
        let mut tag = Tag {
            label: "rust".to_string(),
            ..Tag::default()
        };
        tag.refresh_id();

        let insert = insert_columns(&tag);
        assert_eq!(insert.keys().cloned().collect::<Vec<_>>(), vec!["id", "label"]);
        assert_eq!(insert["id"], ColumnValue::Text(tag.id().to_string()));

        let update = update_columns(&tag);
        assert_eq!(update.keys().cloned().collect::<Vec<_>>(), vec!["label"]);
    }

    #[test]
    fn test_downcast_boxed_model() {
        let mut boxed: Box<dyn Model> = Box::new(Note {
            title: "a".to_string(),
            ..Note::default()
        });

        assert!(boxed.downcast_ref::<Tag>().is_none());
        if let Some(note) = boxed.downcast_mut::<Note>() {
            note.title = "b".to_string();
        }
        assert_eq!(boxed.downcast_ref::<Note>().map(|n| n.title.as_str()), Some("b"));

        let note = boxed.into_any().downcast::<Note>().map(|b| *b);
        assert_eq!(note.map(|n| n.title).ok(), Some("b".to_string()));
    }
}
