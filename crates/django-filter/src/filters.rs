//! Filter declarations.
//!
//! A [`Filter`] pairs a form field, which collects and validates one piece of
//! user input, with the operation that narrows a [`QuerySet`] by the cleaned
//! value. The lookup type is fixed per filter ([`LookupSpec::Single`]) or
//! picked by the user from a list ([`LookupSpec::Choices`], [`LookupSpec::Any`]),
//! in which case the form field becomes a lookup-choice field and the cleaned
//! value arrives as `[value, "lookup"]`.
//!
//! # Examples
//!
//! ```
//! use django_filter::filters::Filter;
//! use django_filter_db::{DatabaseBackendType, LookupType, QuerySet, Value};
//!
//! let price = Filter::number("price").lookup_type(LookupType::Lt);
//! let qs = price.filter(QuerySet::new("books"), &Value::Float(10.0)).unwrap();
//! assert_eq!(
//!     qs.to_sql(DatabaseBackendType::SQLite).0,
//!     "SELECT * FROM \"books\" WHERE \"price\" < ?"
//! );
//! ```

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use django_filter_core::{FilterError, FilterResult};
use django_filter_db::{DbExecutor, LookupType, QuerySet, Value, Q};
use django_filter_forms::{FormFieldDef, FormFieldType, WidgetType};

static CREATION_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A custom filtering operation replacing a filter's default one.
pub type FilterAction = Arc<dyn Fn(QuerySet, &Value) -> FilterResult<QuerySet> + Send + Sync>;

/// Which lookup types a filter applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupSpec {
    /// Always this lookup.
    Single(LookupType),
    /// The user picks one of these.
    Choices(Vec<LookupType>),
    /// The user picks any lookup type.
    Any,
}

impl Default for LookupSpec {
    fn default() -> Self {
        Self::Single(LookupType::Exact)
    }
}

impl LookupSpec {
    /// The lookups offered to the user, in name order.
    pub fn offered(&self) -> Vec<LookupType> {
        match self {
            Self::Single(t) => vec![*t],
            Self::Choices(list) => LookupType::ALL
                .into_iter()
                .filter(|t| list.contains(t))
                .collect(),
            Self::Any => LookupType::ALL.to_vec(),
        }
    }

    /// Returns `true` if the user chooses the lookup.
    pub const fn is_dynamic(&self) -> bool {
        !matches!(self, Self::Single(_))
    }
}

/// The preset periods of a date-range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRangeOption {
    /// No restriction.
    AnyDate = 1,
    /// Year, month and day equal to today.
    Today = 2,
    /// From seven days ago through the end of today.
    PastSevenDays = 3,
    /// Year and month equal to today's.
    ThisMonth = 4,
    /// Year equal to today's.
    ThisYear = 5,
}

impl DateRangeOption {
    /// Every option, in key order.
    pub const ALL: [Self; 5] = [
        Self::AnyDate,
        Self::Today,
        Self::PastSevenDays,
        Self::ThisMonth,
        Self::ThisYear,
    ];

    /// The key submitted for this option.
    pub const fn key(self) -> i64 {
        self as i64
    }

    /// The label shown for this option.
    pub const fn label(self) -> &'static str {
        match self {
            Self::AnyDate => "Any Date",
            Self::Today => "Today",
            Self::PastSevenDays => "Past 7 days",
            Self::ThisMonth => "This month",
            Self::ThisYear => "This year",
        }
    }

    /// Looks an option up by key.
    pub fn from_key(key: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.key() == key)
    }

    /// The `(key, label)` choices of a date-range field.
    pub fn choices() -> Vec<(String, String)> {
        Self::ALL
            .into_iter()
            .map(|o| (o.key().to_string(), o.label().to_string()))
            .collect()
    }

    /// Narrows `qs` to the rows whose `name` falls in this period.
    pub fn apply(self, qs: QuerySet, name: &str, today: NaiveDate) -> FilterResult<QuerySet> {
        let year = Value::Int(i64::from(today.year()));
        let month = Value::Int(i64::from(today.month()));
        let day = Value::Int(i64::from(today.day()));
        let q = match self {
            Self::AnyDate => return Ok(qs.all()),
            Self::Today => {
                Q::lookup(name, LookupType::Year, year)?
                    & Q::lookup(name, LookupType::Month, month)?
                    & Q::lookup(name, LookupType::Day, day)?
            }
            Self::PastSevenDays => {
                Q::lookup(name, LookupType::Gte, Value::Date(today - Duration::days(7)))?
                    & Q::lookup(name, LookupType::Lt, Value::Date(today + Duration::days(1)))?
            }
            Self::ThisMonth => {
                Q::lookup(name, LookupType::Year, year)? & Q::lookup(name, LookupType::Month, month)?
            }
            Self::ThisYear => Q::lookup(name, LookupType::Year, year)?,
        };
        Ok(qs.filter(q))
    }
}

/// The kind of a filter: its form field and its filtering behaviour.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// Free text.
    Char,
    /// Unknown / yes / no. Unknown leaves the queryset unchanged.
    Boolean,
    /// One of a fixed set of strings.
    Choice(Vec<(String, String)>),
    /// Any of a fixed set of strings, OR-ed together.
    MultipleChoice(Vec<(String, String)>),
    /// A date.
    Date,
    /// A date and time.
    DateTime,
    /// A time of day.
    Time,
    /// One of a set of typed keys.
    ModelChoice(Vec<(Value, String)>),
    /// Any of a set of typed keys, OR-ed together.
    ModelMultipleChoice(Vec<(Value, String)>),
    /// A number.
    Number,
    /// A numeric start and stop.
    Range,
    /// A preset period ([`DateRangeOption`]).
    DateRange,
}

impl FilterKind {
    /// The base form field type of this kind.
    pub fn form_field_type(&self) -> FormFieldType {
        match self {
            Self::Char => FormFieldType::char(),
            Self::Boolean => FormFieldType::NullBoolean,
            Self::Choice(choices) => FormFieldType::Choice {
                choices: choices.clone(),
            },
            Self::MultipleChoice(choices) => FormFieldType::MultipleChoice {
                choices: choices.clone(),
            },
            Self::Date => FormFieldType::Date,
            Self::DateTime => FormFieldType::DateTime,
            Self::Time => FormFieldType::Time,
            Self::ModelChoice(choices) => FormFieldType::ModelChoice {
                choices: choices.clone(),
            },
            Self::ModelMultipleChoice(choices) => FormFieldType::ModelMultipleChoice {
                choices: choices.clone(),
            },
            Self::Number => FormFieldType::decimal(),
            Self::Range => FormFieldType::Range {
                bound: Box::new(FormFieldType::decimal()),
            },
            Self::DateRange => FormFieldType::Choice {
                choices: DateRangeOption::choices(),
            },
        }
    }

    /// The form field type collecting the operand of `lookup`: whole numbers
    /// for date parts, yes/no for `isnull`, a comma-separated list for `in`,
    /// two bounds for `range` and text for pattern lookups.
    pub fn lookup_field_type(&self, lookup: LookupType) -> FormFieldType {
        let base = self.form_field_type();
        match (self, lookup) {
            (Self::MultipleChoice(_) | Self::ModelMultipleChoice(_) | Self::Range | Self::DateRange, _) => {
                base
            }
            (_, t) if t.is_date_part() => {
                let (min, max) = match t {
                    LookupType::Month => (1, 12),
                    LookupType::Day => (1, 31),
                    LookupType::WeekDay => (1, 7),
                    _ => (1, 9999),
                };
                FormFieldType::Integer {
                    min_value: Some(min),
                    max_value: Some(max),
                }
            }
            (_, LookupType::IsNull) => FormFieldType::NullBoolean,
            (Self::Boolean, _) => base,
            (_, LookupType::In) => FormFieldType::Csv {
                item: Box::new(base),
            },
            (_, LookupType::Range) => FormFieldType::Range {
                bound: Box::new(base),
            },
            (_, t) if t.is_pattern() => FormFieldType::char(),
            _ => base,
        }
    }

    /// Kinds whose cleaned value is itself a list.
    const fn is_multi_valued(&self) -> bool {
        matches!(
            self,
            Self::MultipleChoice(_) | Self::ModelMultipleChoice(_) | Self::Range
        )
    }
}

/// A declarative filter over one model field.
#[derive(Clone)]
pub struct Filter {
    name: String,
    param: Option<String>,
    label: Option<String>,
    widget: Option<WidgetType>,
    action: Option<FilterAction>,
    lookup: LookupSpec,
    help_text: String,
    kind: FilterKind,
    today: Option<NaiveDate>,
    creation_counter: usize,
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("name", &self.name)
            .field("param", &self.param_name())
            .field("kind", &self.kind)
            .field("lookup", &self.lookup)
            .field("has_action", &self.action.is_some())
            .field("creation_counter", &self.creation_counter)
            .finish_non_exhaustive()
    }
}

fn owned_choices<K: Into<String>, L: Into<String>>(
    choices: impl IntoIterator<Item = (K, L)>,
) -> Vec<(String, String)> {
    choices
        .into_iter()
        .map(|(k, l)| (k.into(), l.into()))
        .collect()
}

impl Filter {
    /// Creates a filter of `kind` on the model field `name`.
    pub fn new(name: impl Into<String>, kind: FilterKind) -> Self {
        Self {
            name: name.into(),
            param: None,
            label: None,
            widget: None,
            action: None,
            lookup: LookupSpec::default(),
            help_text: String::new(),
            kind,
            today: None,
            creation_counter: CREATION_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// A free-text filter.
    pub fn char(name: impl Into<String>) -> Self {
        Self::new(name, FilterKind::Char)
    }

    /// An unknown / yes / no filter.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FilterKind::Boolean)
    }

    /// A single-choice filter.
    pub fn choice<K: Into<String>, L: Into<String>>(
        name: impl Into<String>,
        choices: impl IntoIterator<Item = (K, L)>,
    ) -> Self {
        Self::new(name, FilterKind::Choice(owned_choices(choices)))
    }

    /// A multiple-choice filter matching any of the selected values.
    pub fn multiple_choice<K: Into<String>, L: Into<String>>(
        name: impl Into<String>,
        choices: impl IntoIterator<Item = (K, L)>,
    ) -> Self {
        Self::new(name, FilterKind::MultipleChoice(owned_choices(choices)))
    }

    /// A date filter.
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FilterKind::Date)
    }

    /// A date-time filter.
    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FilterKind::DateTime)
    }

    /// A time filter.
    pub fn time(name: impl Into<String>) -> Self {
        Self::new(name, FilterKind::Time)
    }

    /// A filter choosing one related key. See [`model_choices`] for loading
    /// the choices from a queryset.
    pub fn model_choice(name: impl Into<String>, choices: Vec<(Value, String)>) -> Self {
        Self::new(name, FilterKind::ModelChoice(choices))
    }

    /// A filter matching any of the selected related keys.
    pub fn model_multiple_choice(name: impl Into<String>, choices: Vec<(Value, String)>) -> Self {
        Self::new(name, FilterKind::ModelMultipleChoice(choices))
    }

    /// A numeric filter.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FilterKind::Number)
    }

    /// A numeric range filter.
    pub fn range(name: impl Into<String>) -> Self {
        Self::new(name, FilterKind::Range)
    }

    /// A preset-period filter over a date field.
    pub fn date_range(name: impl Into<String>) -> Self {
        Self::new(name, FilterKind::DateRange)
    }

    // ── Options ──────────────────────────────────────────────────────

    /// Sets the form key the filter reads (defaults to the field name).
    #[must_use]
    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    /// Sets the form field label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the widget. With a dynamic lookup it renders the value part.
    #[must_use]
    pub fn widget(mut self, widget: WidgetType) -> Self {
        self.widget = Some(widget);
        self
    }

    /// Replaces the default filtering with `action`.
    #[must_use]
    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn(QuerySet, &Value) -> FilterResult<QuerySet> + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Fixes the lookup type.
    #[must_use]
    pub fn lookup_type(mut self, lookup_type: LookupType) -> Self {
        self.lookup = LookupSpec::Single(lookup_type);
        self
    }

    /// Lets the user pick one of `lookup_types`.
    #[must_use]
    pub fn lookup_types(mut self, lookup_types: impl IntoIterator<Item = LookupType>) -> Self {
        self.lookup = LookupSpec::Choices(lookup_types.into_iter().collect());
        self
    }

    /// Lets the user pick any lookup type.
    #[must_use]
    pub fn any_lookup(mut self) -> Self {
        self.lookup = LookupSpec::Any;
        self
    }

    /// Pins "today" for date-range filtering.
    #[must_use]
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Sets the form field help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Sets the label only if none was given.
    pub(crate) fn default_label(mut self, label: String) -> Self {
        self.label.get_or_insert(label);
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The model field path filtered on.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The form key this filter reads.
    pub fn param_name(&self) -> &str {
        self.param.as_deref().unwrap_or(&self.name)
    }

    /// The explicit label, if any.
    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The lookup specification.
    pub const fn lookup(&self) -> &LookupSpec {
        &self.lookup
    }

    /// The filter kind.
    pub const fn kind(&self) -> &FilterKind {
        &self.kind
    }

    /// The position of this filter in declaration order.
    pub const fn creation_counter(&self) -> usize {
        self.creation_counter
    }

    /// Builds the (always optional) form field for this filter.
    pub fn form_field(&self) -> FormFieldDef {
        let dynamic = self.lookup.is_dynamic();
        let field_type = match &self.lookup {
            LookupSpec::Single(t) => self.kind.lookup_field_type(*t),
            _ => FormFieldType::LookupChoice {
                inner: Box::new(self.kind.form_field_type()),
                lookups: self.lookup.offered(),
            },
        };

        let mut field = FormFieldDef::new(self.param_name(), field_type)
            .required(false)
            .help_text(self.help_text.clone());
        if let Some(label) = &self.label {
            field = field.label(label.clone());
        }
        if let Some(widget) = &self.widget {
            let widget = if dynamic {
                WidgetType::Multi(vec![widget.clone(), WidgetType::Select])
            } else {
                widget.clone()
            };
            field = field.widget(widget);
        }
        field
    }

    // ── Filtering ────────────────────────────────────────────────────

    /// Narrows `qs` by the cleaned value of this filter's form field.
    ///
    /// An empty value (Null, `""`, `[]`) leaves the queryset unchanged. A
    /// custom action, when set, replaces everything else.
    pub fn filter(&self, qs: QuerySet, value: &Value) -> FilterResult<QuerySet> {
        if let Some(action) = &self.action {
            tracing::debug!(filter = %self.name, "applying custom filter action");
            return action(qs, value);
        }

        let (value, lookup) = self.resolve(value)?;
        if value.is_empty() {
            return Ok(qs);
        }
        tracing::debug!(filter = %self.name, %lookup, %value, "applying filter");

        match &self.kind {
            FilterKind::Boolean if !self.lookup.is_dynamic() && lookup != LookupType::IsNull => {
                Ok(qs.filter(Q::lookup(&self.name, LookupType::Exact, value.clone())?))
            }
            FilterKind::MultipleChoice(_) | FilterKind::ModelMultipleChoice(_) => {
                let items = value.as_list().unwrap_or(std::slice::from_ref(value));
                if items.is_empty() {
                    return Ok(qs);
                }
                let mut any = Q::Or(Vec::new());
                for item in items {
                    any = any | Q::lookup(&self.name, lookup, item.clone())?;
                }
                Ok(qs.filter(any).distinct())
            }
            FilterKind::Range => self.filter_range(qs, value),
            FilterKind::DateRange => self.filter_date_range(qs, value),
            _ if lookup == LookupType::Range && value.as_list().is_some() => {
                self.filter_range(qs, value)
            }
            _ => Ok(qs.filter(Q::lookup(&self.name, lookup, value.clone())?)),
        }
    }

    /// Splits a `[value, "lookup"]` pair from a lookup-choice field, or pairs
    /// a plain value with the declared lookup.
    fn resolve<'a>(&self, value: &'a Value) -> FilterResult<(&'a Value, LookupType)> {
        let default = match &self.lookup {
            LookupSpec::Single(t) => return Ok((value, *t)),
            _ => LookupType::Exact,
        };
        let Some([inner, Value::String(name)]) = value.as_list() else {
            return Ok((value, default));
        };
        if self.kind.is_multi_valued() && inner.as_list().is_none() {
            return Ok((value, default));
        }
        let lookup: LookupType = name.parse()?;
        if !self.lookup.offered().contains(&lookup) {
            return Err(FilterError::InvalidLookup(format!(
                "'{lookup}' is not an allowed lookup for '{}'",
                self.name
            )));
        }
        Ok((inner, lookup))
    }

    fn filter_range(&self, qs: QuerySet, value: &Value) -> FilterResult<QuerySet> {
        let (start, stop) = match value.as_list() {
            Some([start, stop]) => (start, stop),
            _ => {
                return Err(FilterError::invalid_value(
                    &self.name,
                    "a range needs a start and a stop",
                ))
            }
        };
        let q = match (start.is_null(), stop.is_null()) {
            (false, false) => Q::lookup(
                &self.name,
                LookupType::Range,
                Value::List(vec![start.clone(), stop.clone()]),
            )?,
            (false, true) => Q::lookup(&self.name, LookupType::Gte, start.clone())?,
            (true, false) => Q::lookup(&self.name, LookupType::Lte, stop.clone())?,
            (true, true) => return Ok(qs),
        };
        Ok(qs.filter(q))
    }

    fn filter_date_range(&self, qs: QuerySet, value: &Value) -> FilterResult<QuerySet> {
        let key = match value {
            Value::Int(k) => Some(*k),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        let option = key.and_then(DateRangeOption::from_key).ok_or_else(|| {
            FilterError::invalid_value(&self.name, format!("'{value}' is not a date range option"))
        })?;
        let today = self
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        option.apply(qs, &self.name, today)
    }
}

/// Loads `(key, label)` choices for a model-choice filter from a queryset.
///
/// Labels are the text form of the `label` column.
pub async fn model_choices(
    qs: &QuerySet,
    db: &dyn DbExecutor,
    key: &str,
    label: &str,
) -> FilterResult<Vec<(Value, String)>> {
    let rows = qs.clone().values(&[key, label]).fetch(db).await?;
    rows.iter()
        .map(|row| {
            let key_value = row
                .get_value(key)
                .cloned()
                .ok_or_else(|| FilterError::FieldDoesNotExist(key.to_string()))?;
            let label_value = row
                .get_value(label)
                .ok_or_else(|| FilterError::FieldDoesNotExist(label.to_string()))?;
            Ok((key_value, label_value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use django_filter_db::DatabaseBackendType;

    fn books() -> QuerySet {
        QuerySet::new("books")
    }

    fn sql(qs: &QuerySet) -> String {
        qs.to_sql(DatabaseBackendType::SQLite).0
    }

    fn params(qs: &QuerySet) -> Vec<Value> {
        qs.to_sql(DatabaseBackendType::SQLite).1
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_lookup_spec_offered_in_name_order() {
        let spec = LookupSpec::Choices(vec![LookupType::Lt, LookupType::Exact, LookupType::Gt]);
        assert_eq!(
            spec.offered(),
            [LookupType::Exact, LookupType::Gt, LookupType::Lt]
        );
        assert_eq!(LookupSpec::Any.offered().len(), LookupType::ALL.len());
        assert_eq!(LookupSpec::default(), LookupSpec::Single(LookupType::Exact));
        assert!(!LookupSpec::default().is_dynamic());
    }

    #[test]
    fn test_creation_counter_follows_declaration_order() {
        let a = Filter::char("a");
        let b = Filter::number("b");
        let c = a.clone();
        assert!(a.creation_counter() < b.creation_counter());
        assert_eq!(a.creation_counter(), c.creation_counter());
    }

    #[test]
    fn test_form_field_single_lookup() {
        let field = Filter::char("title").label("Title").help_text("Any part").form_field();
        assert_eq!(field.name, "title");
        assert!(!field.required);
        assert_eq!(field.label, "Title");
        assert_eq!(field.help_text, "Any part");
        assert_eq!(field.field_type, FormFieldType::char());
    }

    #[test]
    fn test_form_field_dynamic_lookup() {
        let field = Filter::number("price")
            .param("cost")
            .lookup_types([LookupType::Lt, LookupType::Gt])
            .label("Price")
            .form_field();
        assert_eq!(field.name, "cost");
        assert_eq!(field.label, "Price");
        assert_eq!(
            field.field_type,
            FormFieldType::LookupChoice {
                inner: Box::new(FormFieldType::decimal()),
                lookups: vec![LookupType::Gt, LookupType::Lt],
            }
        );

        let field = Filter::char("title").any_lookup().widget(WidgetType::Textarea).form_field();
        assert_eq!(
            field.widget,
            WidgetType::Multi(vec![WidgetType::Textarea, WidgetType::Select])
        );
    }

    #[test]
    fn test_form_field_follows_lookup() {
        let field_type = |f: Filter| f.form_field().field_type;
        assert_eq!(
            field_type(Filter::date("published").lookup_type(LookupType::Year)),
            FormFieldType::Integer {
                min_value: Some(1),
                max_value: Some(9999)
            }
        );
        assert_eq!(
            field_type(Filter::number("published").lookup_type(LookupType::WeekDay)),
            FormFieldType::Integer {
                min_value: Some(1),
                max_value: Some(7)
            }
        );
        assert_eq!(
            field_type(Filter::number("price").lookup_type(LookupType::IsNull)),
            FormFieldType::NullBoolean
        );
        assert_eq!(
            field_type(Filter::number("price").lookup_type(LookupType::In)),
            FormFieldType::Csv {
                item: Box::new(FormFieldType::decimal())
            }
        );
        assert_eq!(
            field_type(Filter::date("published").lookup_type(LookupType::Range)),
            FormFieldType::Range {
                bound: Box::new(FormFieldType::Date)
            }
        );
        assert_eq!(
            field_type(Filter::number("price").lookup_type(LookupType::Contains)),
            FormFieldType::char()
        );
        assert_eq!(
            field_type(Filter::multiple_choice("genre", [("a", "A")]).lookup_type(LookupType::In)),
            FormFieldType::MultipleChoice {
                choices: vec![("a".to_string(), "A".to_string())]
            }
        );
    }

    #[test]
    fn test_range_lookup_with_one_bound() {
        let f = Filter::number("price").lookup_type(LookupType::Range);
        let qs = f
            .filter(books(), &Value::List(vec![Value::Null, Value::Float(8.0)]))
            .unwrap();
        assert_eq!(sql(&qs), "SELECT * FROM \"books\" WHERE \"price\" <= ?");
        let qs = f.filter(books(), &Value::from("2,8")).unwrap();
        assert_eq!(sql(&qs), "SELECT * FROM \"books\" WHERE \"price\" BETWEEN ? AND ?");
    }

    #[test]
    fn test_model_choice_filter() {
        let f = Filter::model_choice(
            "author_id",
            vec![(Value::Int(1), "Herbert".to_string()), (Value::Int(2), "Austen".to_string())],
        )
        .param("author");
        assert_eq!(
            f.form_field().field_type,
            FormFieldType::ModelChoice {
                choices: vec![(Value::Int(1), "Herbert".to_string()), (Value::Int(2), "Austen".to_string())]
            }
        );
        let qs = f.filter(books(), &Value::Int(2)).unwrap();
        assert_eq!(sql(&qs), "SELECT * FROM \"books\" WHERE \"author_id\" = ?");
        assert_eq!(params(&qs), [Value::Int(2)]);
    }

    #[test]
    fn test_default_filter_and_empty_values() {
        let f = Filter::char("title");
        for empty in [Value::Null, Value::from(""), Value::List(vec![])] {
            assert_eq!(f.filter(books(), &empty).unwrap(), books());
        }
        let qs = f.filter(books(), &Value::from("Dune")).unwrap();
        assert_eq!(sql(&qs), "SELECT * FROM \"books\" WHERE \"title\" = ?");
        assert_eq!(params(&qs), [Value::from("Dune")]);
    }

    #[test]
    fn test_zero_is_a_value() {
        let qs = Filter::number("price").filter(books(), &Value::Int(0)).unwrap();
        assert_eq!(params(&qs), [Value::Int(0)]);
    }

    #[test]
    fn test_dynamic_lookup_from_pair() {
        let f = Filter::char("title").lookup_types([LookupType::IContains, LookupType::Exact]);
        let pair = Value::List(vec![Value::from("dun"), Value::from("icontains")]);
        let qs = f.filter(books(), &pair).unwrap();
        assert_eq!(
            sql(&qs),
            r#"SELECT * FROM "books" WHERE LOWER("title") LIKE LOWER(?) ESCAPE '\'"#
        );

        let rejected = Value::List(vec![Value::from("dun"), Value::from("regex")]);
        assert!(matches!(
            f.filter(books(), &rejected),
            Err(FilterError::InvalidLookup(_))
        ));
        let unknown = Value::List(vec![Value::from("dun"), Value::from("soundslike")]);
        assert!(matches!(
            f.filter(books(), &unknown),
            Err(FilterError::InvalidLookup(_))
        ));
        let empty = Value::List(vec![Value::from(""), Value::from("exact")]);
        assert_eq!(f.filter(books(), &empty).unwrap(), books());
    }

    #[test]
    fn test_boolean_filter() {
        let f = Filter::boolean("in_print");
        assert_eq!(f.filter(books(), &Value::Null).unwrap(), books());
        let qs = f.filter(books(), &Value::Bool(false)).unwrap();
        assert_eq!(sql(&qs), "SELECT * FROM \"books\" WHERE \"in_print\" = ?");
        assert_eq!(params(&qs), [Value::Bool(false)]);

        let qs = Filter::boolean("in_print")
            .lookup_type(LookupType::Gt)
            .filter(books(), &Value::Bool(true))
            .unwrap();
        assert_eq!(sql(&qs), "SELECT * FROM \"books\" WHERE \"in_print\" = ?");
    }

    #[test]
    fn test_multiple_choice_filter_ors_and_distincts() {
        let f = Filter::multiple_choice("genre", [("scifi", "Sci-fi"), ("romance", "Romance")]);
        assert_eq!(f.filter(books(), &Value::List(vec![])).unwrap(), books());
        let qs = f
            .filter(books(), &Value::List(vec![Value::from("scifi"), Value::from("romance")]))
            .unwrap();
        assert_eq!(
            sql(&qs),
            "SELECT DISTINCT * FROM \"books\" WHERE (\"genre\" = ? OR \"genre\" = ?)"
        );
    }

    #[test]
    fn test_dynamic_multiple_choice_keeps_plain_selections() {
        let f = Filter::multiple_choice("genre", [("scifi", "Sci-fi"), ("romance", "Romance")])
            .lookup_types([LookupType::Exact, LookupType::IExact]);
        let selected = Value::List(vec![Value::from("scifi"), Value::from("romance")]);
        let qs = f.filter(books(), &selected).unwrap();
        assert_eq!(params(&qs), [Value::from("scifi"), Value::from("romance")]);

        let pair = Value::List(vec![selected, Value::from("iexact")]);
        let qs = f.filter(books(), &pair).unwrap();
        assert!(sql(&qs).contains("LOWER(\"genre\") = LOWER(?)"));
    }

    #[test]
    fn test_range_filter() {
        let f = Filter::range("price");
        let range = |a: Value, b: Value| Value::List(vec![a, b]);
        let qs = f.filter(books(), &range(Value::Float(5.0), Value::Float(10.0))).unwrap();
        assert_eq!(sql(&qs), "SELECT * FROM \"books\" WHERE \"price\" BETWEEN ? AND ?");
        let qs = f.filter(books(), &range(Value::Float(5.0), Value::Null)).unwrap();
        assert_eq!(sql(&qs), "SELECT * FROM \"books\" WHERE \"price\" >= ?");
        let qs = f.filter(books(), &range(Value::Null, Value::Float(10.0))).unwrap();
        assert_eq!(sql(&qs), "SELECT * FROM \"books\" WHERE \"price\" <= ?");
        assert_eq!(f.filter(books(), &Value::Null).unwrap(), books());
        assert!(f.filter(books(), &Value::Float(3.0)).is_err());
    }

    #[test]
    fn test_date_range_options() {
        let f = Filter::date_range("published").today(day(2024, 2, 29));

        assert_eq!(f.filter(books(), &Value::from("1")).unwrap(), books());

        let qs = f.filter(books(), &Value::from("2")).unwrap();
        assert_eq!(params(&qs), [Value::Int(2024), Value::Int(2), Value::Int(29)]);

        let qs = f.filter(books(), &Value::from("3")).unwrap();
        assert_eq!(
            sql(&qs),
            "SELECT * FROM \"books\" WHERE (\"published\" >= ? AND \"published\" < ?)"
        );
        assert_eq!(
            params(&qs),
            [Value::Date(day(2024, 2, 22)), Value::Date(day(2024, 3, 1))]
        );

        let qs = f.filter(books(), &Value::Int(4)).unwrap();
        assert_eq!(params(&qs), [Value::Int(2024), Value::Int(2)]);
        let qs = f.filter(books(), &Value::from("5")).unwrap();
        assert_eq!(params(&qs), [Value::Int(2024)]);

        assert!(matches!(
            f.filter(books(), &Value::from("9")),
            Err(FilterError::InvalidValue { .. })
        ));
        assert_eq!(
            f.form_field().field_type,
            FormFieldType::Choice {
                choices: DateRangeOption::choices()
            }
        );
    }

    #[test]
    fn test_date_range_option_lookup() {
        assert_eq!(DateRangeOption::from_key(3), Some(DateRangeOption::PastSevenDays));
        assert_eq!(DateRangeOption::from_key(0), None);
        assert_eq!(DateRangeOption::choices()[0], ("1".to_string(), "Any Date".to_string()));
    }

    #[test]
    fn test_custom_action_replaces_filtering() {
        let f = Filter::char("q").action(|qs, value| {
            let text = value.as_str().unwrap_or_default().to_string();
            Ok(qs.filter(
                Q::lookup("title", LookupType::IContains, Value::from(text.clone()))?
                    | Q::lookup("author", LookupType::IContains, Value::from(text))?,
            ))
        });
        let qs = f.filter(books(), &Value::from("an")).unwrap();
        assert!(sql(&qs).contains("LOWER(\"title\")"));
        assert!(sql(&qs).contains("LOWER(\"author\")"));
    }

    #[test]
    fn test_operand_errors_name_the_lookup() {
        let err = Filter::date("published")
            .lookup_type(LookupType::Month)
            .filter(books(), &Value::Int(13))
            .unwrap_err();
        assert!(err.to_string().contains("published__month"));
    }
}
