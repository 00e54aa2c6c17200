//! Model trait and metadata.
//!
//! The [`Model`] trait ties a Rust type to a table: it exposes the table's
//! [`ModelMeta`] and builds instances from fetched rows. Filter sets read the
//! metadata to derive filters, and `M::objects()` is the queryset they narrow.

use django_filter_core::FilterError;

use crate::fields::FieldDef;
use crate::query::compiler::{OrderBy, Row};
use crate::query::queryset::QuerySet;

/// The core trait for all models.
///
/// # Examples
///
/// ```
/// use std::sync::LazyLock;
///
/// use django_filter_core::FilterError;
/// use django_filter_db::fields::{FieldDef, FieldType};
/// use django_filter_db::model::{Model, ModelMeta};
/// use django_filter_db::query::Row;
///
/// struct Book {
///     id: i64,
///     title: String,
/// }
///
/// impl Model for Book {
///     fn meta() -> &'static ModelMeta {
///         static META: LazyLock<ModelMeta> = LazyLock::new(|| {
///             ModelMeta::new("library", "book", "books").fields(vec![
///                 FieldDef::new("id", FieldType::BigAutoField).primary_key(),
///                 FieldDef::new("title", FieldType::CharField),
///             ])
///         });
///         &META
///     }
///
///     fn from_row(row: &Row) -> Result<Self, FilterError> {
///         Ok(Self { id: row.get("id")?, title: row.get("title")? })
///     }
/// }
///
/// assert_eq!(Book::table_name(), "books");
/// assert!(Book::meta().get_field("title").is_some());
/// ```
pub trait Model: Send + Sync + 'static {
    /// Returns the static metadata for this model type.
    fn meta() -> &'static ModelMeta;

    /// Constructs a model instance from a database row.
    fn from_row(row: &Row) -> Result<Self, FilterError>
    where
        Self: Sized;

    /// Returns the database table name.
    fn table_name() -> &'static str {
        Self::meta().db_table.as_str()
    }

    /// Returns a queryset over every row of this model's table, ordered by
    /// the model's default ordering.
    fn objects() -> QuerySet
    where
        Self: Sized,
    {
        QuerySet::for_model::<Self>()
    }
}

/// Metadata about a model.
#[derive(Debug, Clone)]
pub struct ModelMeta {
    /// The application label (e.g., "library").
    pub app_label: &'static str,
    /// The model name in lowercase (e.g., "book").
    pub model_name: &'static str,
    /// The database table name.
    pub db_table: String,
    /// Human-readable singular name.
    pub verbose_name: String,
    /// Default ordering for queries.
    pub ordering: Vec<OrderBy>,
    /// Field definitions for this model.
    pub fields: Vec<FieldDef>,
}

impl ModelMeta {
    /// Creates metadata with no fields and no default ordering.
    pub fn new(app_label: &'static str, model_name: &'static str, db_table: impl Into<String>) -> Self {
        Self {
            app_label,
            model_name,
            db_table: db_table.into(),
            verbose_name: model_name.replace('_', " "),
            ordering: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Sets the field definitions.
    #[must_use]
    pub fn fields(mut self, fields: Vec<FieldDef>) -> Self {
        self.fields = fields;
        self
    }

    /// Sets the default ordering.
    #[must_use]
    pub fn ordering(mut self, ordering: Vec<OrderBy>) -> Self {
        self.ordering = ordering;
        self
    }

    /// Looks up a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the primary key field, if one is declared.
    pub fn pk_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.primary_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldType;
    use crate::value::Value;
    use crate::DatabaseBackendType;
    use std::sync::LazyLock;

    struct Book {
        id: i64,
        title: String,
    }

    impl Model for Book {
        fn meta() -> &'static ModelMeta {
            static META: LazyLock<ModelMeta> = LazyLock::new(|| {
                ModelMeta::new("library", "book", "library_book")
                    .fields(vec![
                        FieldDef::new("id", FieldType::BigAutoField).primary_key(),
                        FieldDef::new("title", FieldType::CharField).max_length(100),
                    ])
                    .ordering(vec![OrderBy::asc("title")])
            });
            &META
        }

        fn from_row(row: &Row) -> Result<Self, FilterError> {
            Ok(Self {
                id: row.get("id")?,
                title: row.get("title")?,
            })
        }
    }

    #[test]
    fn test_meta_lookups() {
        let meta = Book::meta();
        assert_eq!(meta.verbose_name, "book");
        assert_eq!(meta.get_field("title").map(|f| f.max_length), Some(Some(100)));
        assert!(meta.get_field("missing").is_none());
        assert_eq!(meta.pk_field().map(|f| f.name), Some("id"));
    }

    #[test]
    fn test_table_name_defaults_to_meta() {
        assert_eq!(Book::table_name(), "library_book");
    }

    #[test]
    fn test_objects_applies_default_ordering() {
        let (sql, _) = Book::objects().to_sql(DatabaseBackendType::SQLite);
        assert_eq!(sql, "SELECT * FROM \"library_book\" ORDER BY \"title\" ASC");
    }

    #[test]
    fn test_from_row() {
        let row = Row::new(
            vec!["id".to_string(), "title".to_string()],
            vec![Value::Int(1), Value::from("Dune")],
        );
        let book = Book::from_row(&row).unwrap();
        assert_eq!(book.id, 1);
        assert_eq!(book.title, "Dune");
    }
}
