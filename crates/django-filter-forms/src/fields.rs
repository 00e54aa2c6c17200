//! Form field definitions and type-level validation.
//!
//! Each [`FormFieldDef`] describes a single form field: its type, widget, and
//! metadata. [`clean_field_value`] turns the raw input a widget extracted into
//! a typed [`Value`], accumulating every error it finds.
//!
//! Two composite types serve filtering directly. [`FormFieldType::Range`]
//! collects a start and a stop, and [`FormFieldType::LookupChoice`] collects a
//! value together with the lookup type to compare it with.

use std::collections::HashMap;
use std::sync::LazyLock;

use django_filter_core::SETTINGS;
use django_filter_db::{LookupType, Value};
use regex::Regex;

use crate::widgets::{create_widget_with_choices, MultiWidget, RawValue, Select, Widget, WidgetType};

static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").expect("valid regex"));

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// Defines the type of a form field, including type-specific parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum FormFieldType {
    /// A character (string) field.
    Char {
        /// Minimum length (characters).
        min_length: Option<usize>,
        /// Maximum length (characters).
        max_length: Option<usize>,
        /// Whether to strip leading/trailing whitespace.
        strip: bool,
    },
    /// An integer field.
    Integer {
        /// Minimum allowed value.
        min_value: Option<i64>,
        /// Maximum allowed value.
        max_value: Option<i64>,
    },
    /// A decimal number, cleaned to a float.
    Decimal {
        /// Maximum total number of digits.
        max_digits: Option<u32>,
        /// Maximum number of digits after the decimal point.
        decimal_places: Option<u32>,
    },
    /// A nullable boolean field (true/false/unknown).
    NullBoolean,
    /// A date field.
    Date,
    /// A date-time field.
    DateTime,
    /// A time field.
    Time,
    /// A single choice among `(value, label)` pairs.
    Choice {
        /// The available choices.
        choices: Vec<(String, String)>,
    },
    /// Any number of choices among `(value, label)` pairs.
    MultipleChoice {
        /// The available choices.
        choices: Vec<(String, String)>,
    },
    /// A single choice among typed keys (e.g. related primary keys).
    ModelChoice {
        /// The available `(key, label)` pairs.
        choices: Vec<(Value, String)>,
    },
    /// Any number of choices among typed keys.
    ModelMultipleChoice {
        /// The available `(key, label)` pairs.
        choices: Vec<(Value, String)>,
    },
    /// Comma-separated values, each cleaned with `item`. Cleans to a list.
    Csv {
        /// The type of each value.
        item: Box<FormFieldType>,
    },
    /// A start and a stop, each cleaned with `bound`.
    ///
    /// Cleans to `List[start, stop]` (either may be Null), or Null when both
    /// are empty.
    Range {
        /// The type of each endpoint.
        bound: Box<FormFieldType>,
    },
    /// A value cleaned with `inner` plus the lookup type to apply it with.
    ///
    /// Cleans to `List[value, "lookup"]`, or Null when the value is empty.
    LookupChoice {
        /// The type of the value part.
        inner: Box<FormFieldType>,
        /// The lookups offered, in display order.
        lookups: Vec<LookupType>,
    },
}

impl FormFieldType {
    /// A char field without constraints that strips whitespace.
    pub const fn char() -> Self {
        Self::Char {
            min_length: None,
            max_length: None,
            strip: true,
        }
    }

    /// A decimal field without digit limits.
    pub const fn decimal() -> Self {
        Self::Decimal {
            max_digits: None,
            decimal_places: None,
        }
    }

    /// The value an empty submission cleans to.
    pub fn empty_value(&self) -> Value {
        match self {
            Self::Char { .. } => Value::String(String::new()),
            Self::MultipleChoice { .. } | Self::ModelMultipleChoice { .. } | Self::Csv { .. } => {
                Value::List(Vec::new())
            }
            _ => Value::Null,
        }
    }
}

/// A complete form field definition.
#[derive(Debug, Clone)]
pub struct FormFieldDef {
    /// The field name (the key in the submitted data).
    pub name: String,
    /// The field type, controlling parsing and coercion.
    pub field_type: FormFieldType,
    /// Whether this field is required.
    pub required: bool,
    /// Default/initial value.
    pub initial: Option<Value>,
    /// Help text displayed alongside the field.
    pub help_text: String,
    /// Human-readable label.
    pub label: String,
    /// The widget type used for reading and rendering.
    pub widget: WidgetType,
    /// Custom error messages keyed by error code.
    pub error_messages: HashMap<String, String>,
    /// Whether the field is disabled (rendered but not editable).
    pub disabled: bool,
}

impl FormFieldDef {
    /// Creates a new `FormFieldDef` with sensible defaults.
    ///
    /// The field is required by default and uses the default widget for its
    /// type.
    pub fn new(name: impl Into<String>, field_type: FormFieldType) -> Self {
        let name = name.into();
        let widget = default_widget_for_field_type(&field_type);
        let label = name.replace('_', " ");
        Self {
            name,
            field_type,
            required: true,
            initial: None,
            help_text: String::new(),
            label,
            widget,
            error_messages: HashMap::new(),
            disabled: false,
        }
    }

    /// Sets whether this field is required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the initial value.
    pub fn initial(mut self, value: Value) -> Self {
        self.initial = Some(value);
        self
    }

    /// Sets the help text.
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Sets the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the widget type.
    pub fn widget(mut self, widget: WidgetType) -> Self {
        self.widget = widget;
        self
    }

    /// Sets a custom error message for a given code.
    pub fn error_message(mut self, code: impl Into<String>, msg: impl Into<String>) -> Self {
        self.error_messages.insert(code.into(), msg.into());
        self
    }

    /// Sets whether this field is disabled.
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Builds the widget instance for this field, with its choices filled in.
    pub fn make_widget(&self) -> Box<dyn Widget> {
        build_widget(&self.widget, &self.field_type, self.required)
    }
}

/// Returns the default widget type for a given form field type.
pub fn default_widget_for_field_type(field_type: &FormFieldType) -> WidgetType {
    match field_type {
        FormFieldType::Char { .. } | FormFieldType::Csv { .. } => WidgetType::TextInput,
        FormFieldType::Integer { .. } | FormFieldType::Decimal { .. } => WidgetType::NumberInput,
        FormFieldType::NullBoolean => WidgetType::NullBooleanSelect,
        FormFieldType::Date => WidgetType::DateInput,
        FormFieldType::DateTime => WidgetType::DateTimeInput,
        FormFieldType::Time => WidgetType::TimeInput,
        FormFieldType::Choice { .. } | FormFieldType::ModelChoice { .. } => WidgetType::Select,
        FormFieldType::MultipleChoice { .. } | FormFieldType::ModelMultipleChoice { .. } => {
            WidgetType::SelectMultiple
        }
        FormFieldType::Range { bound } => {
            let part = default_widget_for_field_type(bound);
            WidgetType::Multi(vec![part.clone(), part])
        }
        FormFieldType::LookupChoice { inner, .. } => {
            WidgetType::Multi(vec![default_widget_for_field_type(inner), WidgetType::Select])
        }
    }
}

/// The `(value, label)` options a widget for `field_type` offers. Optional
/// single-choice fields start with a blank option.
fn widget_choices(field_type: &FormFieldType, required: bool) -> Vec<(String, String)> {
    let blank = || (String::new(), SETTINGS.get().empty_choice_label.clone());
    match field_type {
        FormFieldType::Choice { choices } => {
            let mut out: Vec<_> = (!required).then(blank).into_iter().collect();
            out.extend(choices.iter().cloned());
            out
        }
        FormFieldType::ModelChoice { choices } => {
            let mut out: Vec<_> = (!required).then(blank).into_iter().collect();
            out.extend(choices.iter().map(|(k, label)| (k.to_string(), label.clone())));
            out
        }
        FormFieldType::MultipleChoice { choices } => choices.clone(),
        FormFieldType::ModelMultipleChoice { choices } => choices
            .iter()
            .map(|(k, label)| (k.to_string(), label.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

fn build_widget(widget: &WidgetType, field_type: &FormFieldType, required: bool) -> Box<dyn Widget> {
    match (widget, field_type) {
        (WidgetType::Multi(parts), FormFieldType::Range { bound }) => Box::new(MultiWidget::new(
            parts.iter().map(|p| build_widget(p, bound, false)).collect(),
        )),
        (WidgetType::Multi(parts), FormFieldType::LookupChoice { inner, lookups }) => {
            let lookup_choices: Vec<(String, String)> = lookups
                .iter()
                .map(|l| (l.as_str().to_string(), l.as_str().to_string()))
                .collect();
            let widgets = parts
                .iter()
                .enumerate()
                .map(|(i, part)| match (i, part) {
                    (0, _) => build_widget(part, inner, false),
                    (_, WidgetType::Select) => {
                        Box::new(Select::new(lookup_choices.clone())) as Box<dyn Widget>
                    }
                    _ => create_widget_with_choices(part, &lookup_choices),
                })
                .collect();
            Box::new(MultiWidget::new(widgets))
        }
        (widget, field_type) => {
            create_widget_with_choices(widget, &widget_choices(field_type, required))
        }
    }
}

/// Cleans (validates and coerces) raw form input into a typed `Value`.
///
/// 1. Required check (if `required` and the input is empty)
/// 2. Type coercion (string -> i64, date, list, etc.)
/// 3. Type-specific constraint validation (min/max, digits, choices)
///
/// Returns the cleaned `Value` or every error message found.
pub fn clean_field_value(field: &FormFieldDef, raw: &RawValue) -> Result<Value, Vec<String>> {
    if raw.is_empty() {
        if field.required {
            let msg = field
                .error_messages
                .get("required")
                .cloned()
                .unwrap_or_else(|| "This field is required.".to_string());
            return Err(vec![msg]);
        }
        return Ok(field
            .initial
            .clone()
            .unwrap_or_else(|| field.field_type.empty_value()));
    }

    let mut errors = Vec::new();
    let value = clean_typed(&field.field_type, raw, &mut errors);

    if errors.is_empty() {
        Ok(value)
    } else {
        if let Some(msg) = field.error_messages.get("invalid") {
            return Err(vec![msg.clone()]);
        }
        Err(errors)
    }
}

/// Cleans one part of a composite field, mapping empty input to the type's
/// empty value.
fn clean_part(field_type: &FormFieldType, raw: &RawValue, errors: &mut Vec<String>) -> Value {
    if raw.is_empty() {
        field_type.empty_value()
    } else {
        clean_typed(field_type, raw, errors)
    }
}

/// Splits composite input into its two parts. Widgets that are not composite
/// may submit both parts as one comma-separated string.
fn split_pair(raw: &RawValue) -> (RawValue, RawValue) {
    match raw {
        RawValue::Parts(_) => (raw.part(0).clone(), raw.part(1).clone()),
        RawValue::Multiple(values) => (
            values.first().cloned().map_or(RawValue::None, RawValue::Single),
            values.get(1).cloned().map_or(RawValue::None, RawValue::Single),
        ),
        RawValue::Single(s) => match s.split_once(',') {
            Some((a, b)) => (RawValue::from(a.trim()), RawValue::from(b.trim())),
            None => (raw.clone(), RawValue::None),
        },
        RawValue::None => (RawValue::None, RawValue::None),
    }
}

fn invalid_choice(value: &str) -> String {
    format!("Select a valid choice. {value} is not one of the available choices.")
}

fn parse_with<T>(
    text: &str,
    formats: &[&str],
    parse: impl Fn(&str, &str) -> chrono::ParseResult<T>,
) -> Option<T> {
    formats.iter().find_map(|fmt| parse(text, fmt).ok())
}

#[allow(clippy::too_many_lines)]
fn clean_typed(field_type: &FormFieldType, raw: &RawValue, errors: &mut Vec<String>) -> Value {
    let raw_str = raw.as_str().unwrap_or("");

    match field_type {
        FormFieldType::Char {
            min_length,
            max_length,
            strip,
        } => {
            let s = if *strip { raw_str.trim() } else { raw_str };
            let len = s.chars().count();
            if let Some(min) = min_length {
                if len < *min {
                    errors.push(format!(
                        "Ensure this value has at least {min} characters (it has {len})."
                    ));
                }
            }
            if let Some(max) = max_length {
                if len > *max {
                    errors.push(format!(
                        "Ensure this value has at most {max} characters (it has {len})."
                    ));
                }
            }
            Value::String(s.to_string())
        }

        FormFieldType::Integer {
            min_value,
            max_value,
        } => match raw_str.trim().parse::<i64>() {
            Ok(n) => {
                if let Some(min) = min_value {
                    if n < *min {
                        errors.push(format!(
                            "Ensure this value is greater than or equal to {min}."
                        ));
                    }
                }
                if let Some(max) = max_value {
                    if n > *max {
                        errors.push(format!("Ensure this value is less than or equal to {max}."));
                    }
                }
                Value::Int(n)
            }
            Err(_) => {
                errors.push("Enter a whole number.".to_string());
                Value::Null
            }
        },

        FormFieldType::Decimal {
            max_digits,
            decimal_places,
        } => {
            let text = raw_str.trim();
            match text.parse::<f64>() {
                Ok(n) if DECIMAL_RE.is_match(text) => {
                    let unsigned = text.trim_start_matches(&['+', '-'][..]);
                    let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
                    let whole_digits = whole.trim_start_matches('0').len();
                    let total_digits = whole_digits + frac.len();
                    if let Some(max) = max_digits {
                        if total_digits > *max as usize {
                            errors.push(format!(
                                "Ensure that there are no more than {max} digits in total."
                            ));
                        }
                    }
                    if let Some(places) = decimal_places {
                        if frac.len() > *places as usize {
                            errors.push(format!(
                                "Ensure that there are no more than {places} decimal places."
                            ));
                        }
                    }
                    Value::Float(n)
                }
                _ => {
                    errors.push("Enter a number.".to_string());
                    Value::Null
                }
            }
        }

        FormFieldType::NullBoolean => match raw_str.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Value::Bool(true),
            "false" | "0" | "no" | "off" => Value::Bool(false),
            "null" | "none" | "unknown" => Value::Null,
            _ => {
                errors.push("Select a valid choice.".to_string());
                Value::Null
            }
        },

        FormFieldType::Date => {
            match parse_with(raw_str.trim(), DATE_FORMATS, chrono::NaiveDate::parse_from_str) {
                Some(d) => Value::Date(d),
                None => {
                    errors.push("Enter a valid date.".to_string());
                    Value::Null
                }
            }
        }

        FormFieldType::DateTime => {
            let text = raw_str.trim();
            let parsed = parse_with(text, DATETIME_FORMATS, chrono::NaiveDateTime::parse_from_str)
                .or_else(|| {
                    parse_with(text, DATE_FORMATS, chrono::NaiveDate::parse_from_str)
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                });
            match parsed {
                Some(dt) => Value::DateTime(dt),
                None => {
                    errors.push("Enter a valid date/time.".to_string());
                    Value::Null
                }
            }
        }

        FormFieldType::Time => {
            match parse_with(raw_str.trim(), TIME_FORMATS, chrono::NaiveTime::parse_from_str) {
                Some(t) => Value::Time(t),
                None => {
                    errors.push("Enter a valid time.".to_string());
                    Value::Null
                }
            }
        }

        FormFieldType::Choice { choices } => {
            if !choices.iter().any(|(v, _)| v == raw_str) {
                errors.push(invalid_choice(raw_str));
            }
            Value::String(raw_str.to_string())
        }

        FormFieldType::MultipleChoice { choices } => {
            let mut selected = Vec::new();
            for s in raw.values() {
                if choices.iter().any(|(v, _)| *v == s) {
                    selected.push(Value::String(s));
                } else {
                    errors.push(invalid_choice(&s));
                }
            }
            Value::List(selected)
        }

        FormFieldType::ModelChoice { choices } => {
            match choices.iter().find(|(k, _)| k.to_string() == raw_str) {
                Some((key, _)) => key.clone(),
                None => {
                    errors.push(
                        "Select a valid choice. That choice is not one of the available choices."
                            .to_string(),
                    );
                    Value::Null
                }
            }
        }

        FormFieldType::ModelMultipleChoice { choices } => {
            let mut selected = Vec::new();
            for s in raw.values() {
                match choices.iter().find(|(k, _)| k.to_string() == s) {
                    Some((key, _)) => selected.push(key.clone()),
                    None => errors.push(invalid_choice(&s)),
                }
            }
            Value::List(selected)
        }

        FormFieldType::Csv { item } => Value::List(
            raw.values()
                .into_iter()
                .map(|part| clean_typed(item, &RawValue::Single(part), errors))
                .collect(),
        ),

        FormFieldType::Range { bound } => {
            let (start, stop) = split_pair(raw);
            let start = clean_part(bound, &start, errors);
            let stop = clean_part(bound, &stop, errors);
            if start.is_empty() && stop.is_empty() {
                Value::Null
            } else {
                Value::List(vec![start, stop])
            }
        }

        FormFieldType::LookupChoice { inner, lookups } => {
            let (value, lookup) = split_pair(raw);
            if value.is_empty() {
                return Value::Null;
            }
            let value = clean_part(inner, &value, errors);
            let Some(lookup) = lookup.as_str().map(str::trim).filter(|s| !s.is_empty()) else {
                errors.push("Enter a complete value.".to_string());
                return Value::Null;
            };
            if !lookups.iter().any(|l| l.as_str() == lookup) {
                errors.push(invalid_choice(lookup));
                return Value::Null;
            }
            Value::List(vec![value, Value::String(lookup.to_string())])
        }
    }
}
