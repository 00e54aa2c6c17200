//! Model field metadata.
//!
//! [`FieldDef`] describes one column of a model: its type, nullability,
//! label and choices. Filter sets read it to derive filters for model fields
//! automatically, so only the facts that matter for filtering are kept.

use crate::value::Value;

/// The type of a model field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum FieldType {
    /// Auto-incrementing 32-bit integer primary key.
    AutoField,
    /// Auto-incrementing 64-bit integer primary key.
    BigAutoField,
    /// Bounded-length text.
    CharField,
    /// Unbounded text.
    TextField,
    /// Text validated as an e-mail address.
    EmailField,
    /// Text validated as a URL.
    UrlField,
    /// Short label text.
    SlugField,
    /// 32-bit integer.
    IntegerField,
    /// 64-bit integer.
    BigIntegerField,
    /// 16-bit integer.
    SmallIntegerField,
    /// Floating-point number.
    FloatField,
    /// Fixed-precision decimal.
    DecimalField {
        /// Total number of digits.
        max_digits: u32,
        /// Digits after the decimal point.
        decimal_places: u32,
    },
    /// True/false.
    BooleanField,
    /// True/false/unknown.
    NullBooleanField,
    /// Calendar date.
    DateField,
    /// Date and time.
    DateTimeField,
    /// Time of day.
    TimeField,
    /// UUID.
    UuidField,
    /// Many-to-one relation stored as a key column.
    ForeignKey {
        /// The related model's table.
        to: String,
    },
    /// One-to-one relation stored as a key column.
    OneToOneField {
        /// The related model's table.
        to: String,
    },
}

impl FieldType {
    /// Text-like fields.
    pub const fn is_text(&self) -> bool {
        matches!(
            self,
            Self::CharField | Self::TextField | Self::EmailField | Self::UrlField | Self::SlugField
        )
    }

    /// Numeric fields, including auto primary keys.
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::AutoField
                | Self::BigAutoField
                | Self::IntegerField
                | Self::BigIntegerField
                | Self::SmallIntegerField
                | Self::FloatField
                | Self::DecimalField { .. }
        )
    }

    /// Relations stored as a key column on this table.
    pub const fn is_relation(&self) -> bool {
        matches!(self, Self::ForeignKey { .. } | Self::OneToOneField { .. })
    }
}

/// A model field definition.
///
/// # Examples
///
/// ```
/// use django_filter_db::fields::{FieldDef, FieldType};
///
/// let author = FieldDef::new("author", FieldType::ForeignKey { to: "authors".into() });
/// assert_eq!(author.column, "author_id");
///
/// let title = FieldDef::new("title", FieldType::CharField).max_length(200);
/// assert_eq!(title.label(), "Title");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// The field name used in Rust code and filter declarations.
    pub name: &'static str,
    /// The database column name.
    pub column: String,
    /// The field type.
    pub field_type: FieldType,
    /// Whether this is the primary key.
    pub primary_key: bool,
    /// Whether the column allows NULL.
    pub null: bool,
    /// Whether the field may be left blank in forms.
    pub blank: bool,
    /// Maximum length for text fields.
    pub max_length: Option<usize>,
    /// Human-readable name; empty means derived from `name`.
    pub verbose_name: String,
    /// Help text shown next to form inputs.
    pub help_text: String,
    /// Allowed values and their labels.
    pub choices: Option<Vec<(Value, String)>>,
}

impl FieldDef {
    /// Creates a field definition with default options.
    ///
    /// Relation fields store their key in `<name>_id`.
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        let column = if field_type.is_relation() {
            format!("{name}_id")
        } else {
            name.to_string()
        };
        Self {
            name,
            column,
            field_type,
            primary_key: false,
            null: false,
            blank: false,
            max_length: None,
            verbose_name: String::new(),
            help_text: String::new(),
            choices: None,
        }
    }

    /// Marks this field as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Allows NULL values.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.null = true;
        self.blank = true;
        self
    }

    /// Sets the maximum length.
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Overrides the database column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Sets the human-readable name.
    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Restricts the field to the given values.
    #[must_use]
    pub fn choices(mut self, choices: Vec<(Value, String)>) -> Self {
        self.choices = Some(choices);
        self
    }

    /// The label for this field: its verbose name, or its name with
    /// underscores replaced and the first letter capitalised.
    pub fn label(&self) -> String {
        let base = if self.verbose_name.is_empty() {
            self.name.replace('_', " ")
        } else {
            self.verbose_name.clone()
        };
        let mut chars = base.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let f = FieldDef::new("price", FieldType::FloatField);
        assert_eq!(f.column, "price");
        assert!(!f.null);
        assert!(!f.primary_key);
        assert!(f.choices.is_none());
    }

    #[test]
    fn test_relation_column() {
        let f = FieldDef::new("publisher", FieldType::OneToOneField { to: "publishers".into() });
        assert_eq!(f.column, "publisher_id");
        let f = f.column("pub_ref");
        assert_eq!(f.column, "pub_ref");
    }

    #[test]
    fn test_builders() {
        let f = FieldDef::new("isbn", FieldType::CharField)
            .max_length(13)
            .nullable()
            .help_text("13 digits")
            .verbose_name("ISBN");
        assert_eq!(f.max_length, Some(13));
        assert!(f.null && f.blank);
        assert_eq!(f.help_text, "13 digits");
        assert_eq!(f.label(), "ISBN");
    }

    #[test]
    fn test_label_from_name() {
        assert_eq!(FieldDef::new("published_on", FieldType::DateField).label(), "Published on");
    }

    #[test]
    fn test_type_groups() {
        assert!(FieldType::SlugField.is_text());
        assert!(FieldType::DecimalField { max_digits: 5, decimal_places: 2 }.is_numeric());
        assert!(!FieldType::BooleanField.is_numeric());
        assert!(FieldType::ForeignKey { to: "a".into() }.is_relation());
    }
}
