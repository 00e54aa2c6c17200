//! Lookup types and Q objects for building filters.
//!
//! [`LookupType`] names a comparison operator of the query language
//! (`exact`, `gte`, `icontains`, ...). [`Lookup`] is a lookup bound to its
//! operand, and [`Q`] combines field lookups with AND, OR and NOT.
//!
//! # Examples
//!
//! ```
//! use django_filter_db::query::lookups::{Lookup, LookupType, Q};
//! use django_filter_db::value::Value;
//!
//! // title = "Dune"
//! let q = Q::filter("title", Lookup::Exact(Value::from("Dune")));
//!
//! // title = "Dune" AND price > 10
//! let combined = q & Q::filter("price", Lookup::Gt(Value::from(10)));
//!
//! // Dynamic lookup selection: price__gte = 10
//! let q = Q::lookup("price", LookupType::Gte, Value::from(10)).unwrap();
//! assert_eq!(q, Q::filter("price", Lookup::Gte(Value::Int(10))));
//!
//! // Keyword form
//! let q = Q::from_kwarg("title__icontains", Value::from("dune")).unwrap();
//! assert_eq!(q, Q::filter("title", Lookup::IContains("dune".to_string())));
//! ```

use std::fmt;
use std::ops;
use std::str::FromStr;

use django_filter_core::{FilterError, FilterResult};

use crate::value::Value;

/// Separator between a field path and its lookup type (`price__gte`).
pub const LOOKUP_SEP: &str = "__";

/// A named comparison operator understood by the query language.
///
/// Variants are declared in name order, so the derived `Ord` sorts them the
/// way [`LookupType::ALL`] lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupType {
    /// Case-sensitive substring match.
    Contains,
    /// Day of month of a date column.
    Day,
    /// Case-sensitive suffix match.
    EndsWith,
    /// Equality.
    Exact,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Case-insensitive substring match.
    IContains,
    /// Case-insensitive suffix match.
    IEndsWith,
    /// Case-insensitive equality.
    IExact,
    /// Membership in a list.
    In,
    /// Case-insensitive regular expression.
    IRegex,
    /// NULL test.
    IsNull,
    /// Case-insensitive prefix match.
    IStartsWith,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Month of a date column.
    Month,
    /// Inclusive range.
    Range,
    /// Case-sensitive regular expression.
    Regex,
    /// Case-sensitive prefix match.
    StartsWith,
    /// Day of week of a date column (1 = Sunday .. 7 = Saturday).
    #[serde(rename = "week_day")]
    WeekDay,
    /// Year of a date column.
    Year,
}

impl LookupType {
    /// Every lookup type, sorted by name.
    pub const ALL: [Self; 21] = [
        Self::Contains,
        Self::Day,
        Self::EndsWith,
        Self::Exact,
        Self::Gt,
        Self::Gte,
        Self::IContains,
        Self::IEndsWith,
        Self::IExact,
        Self::In,
        Self::IRegex,
        Self::IsNull,
        Self::IStartsWith,
        Self::Lt,
        Self::Lte,
        Self::Month,
        Self::Range,
        Self::Regex,
        Self::StartsWith,
        Self::WeekDay,
        Self::Year,
    ];

    /// The lookup name as written after `__` in a keyword.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Day => "day",
            Self::EndsWith => "endswith",
            Self::Exact => "exact",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::IContains => "icontains",
            Self::IEndsWith => "iendswith",
            Self::IExact => "iexact",
            Self::In => "in",
            Self::IRegex => "iregex",
            Self::IsNull => "isnull",
            Self::IStartsWith => "istartswith",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Month => "month",
            Self::Range => "range",
            Self::Regex => "regex",
            Self::StartsWith => "startswith",
            Self::WeekDay => "week_day",
            Self::Year => "year",
        }
    }

    /// Pattern lookups compare against text.
    pub const fn is_pattern(self) -> bool {
        matches!(
            self,
            Self::Contains
                | Self::IContains
                | Self::StartsWith
                | Self::IStartsWith
                | Self::EndsWith
                | Self::IEndsWith
                | Self::Regex
                | Self::IRegex
        )
    }

    /// Date-part lookups extract a component of a date column.
    pub const fn is_date_part(self) -> bool {
        matches!(self, Self::Year | Self::Month | Self::Day | Self::WeekDay)
    }
}

impl fmt::Display for LookupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookupType {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FilterError::InvalidLookup(s.to_string()))
    }
}

/// A field-level lookup bound to its operand.
///
/// Each variant corresponds to a [`LookupType`] and produces the matching
/// SQL WHERE clause fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Exact match (`field = value`, or `IS NULL` for a null operand).
    Exact(Value),
    /// Case-insensitive exact match (`LOWER(field) = LOWER(value)`).
    IExact(Value),
    /// Substring match (`field LIKE '%value%'`).
    Contains(String),
    /// Case-insensitive substring match.
    IContains(String),
    /// Membership test (`field IN (values...)`).
    In(Vec<Value>),
    /// Greater than (`field > value`).
    Gt(Value),
    /// Greater than or equal (`field >= value`).
    Gte(Value),
    /// Less than (`field < value`).
    Lt(Value),
    /// Less than or equal (`field <= value`).
    Lte(Value),
    /// Starts with (`field LIKE 'value%'`).
    StartsWith(String),
    /// Case-insensitive starts with.
    IStartsWith(String),
    /// Ends with (`field LIKE '%value'`).
    EndsWith(String),
    /// Case-insensitive ends with.
    IEndsWith(String),
    /// Range test (`field BETWEEN low AND high`).
    Range(Value, Value),
    /// NULL test (`field IS NULL` or `field IS NOT NULL`).
    IsNull(bool),
    /// Regular expression match.
    Regex(String),
    /// Case-insensitive regular expression match.
    IRegex(String),
    /// Year of a date column equals the operand.
    Year(i64),
    /// Month (1-12) of a date column equals the operand.
    Month(i64),
    /// Day of month (1-31) of a date column equals the operand.
    Day(i64),
    /// Day of week (1 = Sunday .. 7 = Saturday) equals the operand.
    WeekDay(i64),
}

impl Lookup {
    /// Binds `value` to the lookup named by `lookup_type`, coercing it into
    /// the operand shape that lookup needs.
    ///
    /// - pattern lookups take the value's text;
    /// - `in` takes a list, or a comma-separated string;
    /// - `range` takes a two-element list, or `"low,high"`;
    /// - `isnull` takes a boolean, `0`/`1`, or `"true"`/`"false"`;
    /// - date parts take an integer or its string form.
    ///
    /// Null is only accepted by `exact` and `iexact`.
    pub fn new(lookup_type: LookupType, value: Value) -> FilterResult<Self> {
        let name = lookup_type.as_str();

        if value.is_null() && !matches!(lookup_type, LookupType::Exact | LookupType::IExact) {
            return Err(FilterError::invalid_value(
                name,
                "a null operand is only valid for exact lookups",
            ));
        }

        let lookup = match lookup_type {
            LookupType::Exact => Self::Exact(value),
            LookupType::IExact => Self::IExact(value),
            LookupType::Gt => Self::Gt(scalar(name, value)?),
            LookupType::Gte => Self::Gte(scalar(name, value)?),
            LookupType::Lt => Self::Lt(scalar(name, value)?),
            LookupType::Lte => Self::Lte(scalar(name, value)?),
            LookupType::Contains => Self::Contains(text(name, value)?),
            LookupType::IContains => Self::IContains(text(name, value)?),
            LookupType::StartsWith => Self::StartsWith(text(name, value)?),
            LookupType::IStartsWith => Self::IStartsWith(text(name, value)?),
            LookupType::EndsWith => Self::EndsWith(text(name, value)?),
            LookupType::IEndsWith => Self::IEndsWith(text(name, value)?),
            LookupType::Regex => Self::Regex(text(name, value)?),
            LookupType::IRegex => Self::IRegex(text(name, value)?),
            LookupType::In => Self::In(list(value)),
            LookupType::Range => {
                let (low, high) = pair(name, value)?;
                Self::Range(low, high)
            }
            LookupType::IsNull => Self::IsNull(flag(name, &value)?),
            LookupType::Year => Self::Year(integer(name, &value)?),
            LookupType::Month => Self::Month(bounded(name, &value, 1, 12)?),
            LookupType::Day => Self::Day(bounded(name, &value, 1, 31)?),
            LookupType::WeekDay => Self::WeekDay(bounded(name, &value, 1, 7)?),
        };
        Ok(lookup)
    }

    /// Returns the lookup type this lookup was built for.
    pub const fn lookup_type(&self) -> LookupType {
        match self {
            Self::Exact(_) => LookupType::Exact,
            Self::IExact(_) => LookupType::IExact,
            Self::Contains(_) => LookupType::Contains,
            Self::IContains(_) => LookupType::IContains,
            Self::In(_) => LookupType::In,
            Self::Gt(_) => LookupType::Gt,
            Self::Gte(_) => LookupType::Gte,
            Self::Lt(_) => LookupType::Lt,
            Self::Lte(_) => LookupType::Lte,
            Self::StartsWith(_) => LookupType::StartsWith,
            Self::IStartsWith(_) => LookupType::IStartsWith,
            Self::EndsWith(_) => LookupType::EndsWith,
            Self::IEndsWith(_) => LookupType::IEndsWith,
            Self::Range(..) => LookupType::Range,
            Self::IsNull(_) => LookupType::IsNull,
            Self::Regex(_) => LookupType::Regex,
            Self::IRegex(_) => LookupType::IRegex,
            Self::Year(_) => LookupType::Year,
            Self::Month(_) => LookupType::Month,
            Self::Day(_) => LookupType::Day,
            Self::WeekDay(_) => LookupType::WeekDay,
        }
    }
}

fn scalar(name: &str, value: Value) -> FilterResult<Value> {
    if matches!(value, Value::List(_)) {
        return Err(FilterError::invalid_value(name, "expected a single value, got a list"));
    }
    Ok(value)
}

fn text(name: &str, value: Value) -> FilterResult<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::List(_) => Err(FilterError::invalid_value(name, "expected text, got a list")),
        other => Ok(other.to_string()),
    }
}

fn list(value: Value) -> Vec<Value> {
    match value {
        Value::List(items) => items,
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Value::from)
            .collect(),
        other => vec![other],
    }
}

fn pair(name: &str, value: Value) -> FilterResult<(Value, Value)> {
    let items = match value {
        Value::List(items) => items,
        Value::String(s) => s.split(',').map(|part| Value::from(part.trim())).collect(),
        _ => Vec::new(),
    };
    let mut iter = items.into_iter();
    match (iter.next(), iter.next(), iter.next()) {
        (Some(low), Some(high), None) => Ok((low, high)),
        _ => Err(FilterError::invalid_value(
            name,
            "expected exactly two values (low, high)",
        )),
    }
}

fn flag(name: &str, value: &Value) -> FilterResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(0) => Ok(false),
        Value::Int(1) => Ok(true),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(FilterError::invalid_value(name, format!("'{s}' is not a boolean"))),
        },
        other => Err(FilterError::invalid_value(name, format!("'{other}' is not a boolean"))),
    }
}

fn integer(name: &str, value: &Value) -> FilterResult<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        #[allow(clippy::cast_possible_truncation)]
        Value::Float(f) if f.fract().abs() < f64::EPSILON && f.abs() < 9.0e15 => Ok(*f as i64),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| FilterError::invalid_value(name, format!("'{s}' is not a whole number"))),
        other => Err(FilterError::invalid_value(name, format!("'{other}' is not a whole number"))),
    }
}

fn bounded(name: &str, value: &Value, min: i64, max: i64) -> FilterResult<i64> {
    let i = integer(name, value)?;
    if (min..=max).contains(&i) {
        Ok(i)
    } else {
        Err(FilterError::invalid_value(
            name,
            format!("{i} is outside {min}..={max}"),
        ))
    }
}

/// A composable query filter.
///
/// `Q` objects can be combined using `&` (AND), `|` (OR), and `!` (NOT)
/// operators to build arbitrarily complex WHERE clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum Q {
    /// A single field lookup.
    Filter {
        /// The field name.
        field: String,
        /// The lookup operation.
        lookup: Lookup,
    },
    /// Logical AND of multiple conditions.
    And(Vec<Q>),
    /// Logical OR of multiple conditions.
    Or(Vec<Q>),
    /// Logical negation of a condition.
    Not(Box<Q>),
}

impl Q {
    /// Creates a new filter Q object.
    pub fn filter(field: impl Into<String>, lookup: Lookup) -> Self {
        Self::Filter {
            field: field.into(),
            lookup,
        }
    }

    /// Builds the predicate `field__<lookup_type> = value`.
    ///
    /// Operand errors name `field`.
    pub fn lookup(
        field: impl Into<String>,
        lookup_type: LookupType,
        value: Value,
    ) -> FilterResult<Self> {
        let field = field.into();
        match Lookup::new(lookup_type, value) {
            Ok(lookup) => Ok(Self::Filter { field, lookup }),
            Err(FilterError::InvalidValue { message, .. }) => Err(FilterError::invalid_value(
                format!("{field}{LOOKUP_SEP}{lookup_type}"),
                message,
            )),
            Err(other) => Err(other),
        }
    }

    /// Parses the keyword form `field__lookup`.
    ///
    /// When the last `__` segment is not a lookup name, the whole keyword
    /// is the field and the lookup is `exact`.
    pub fn from_kwarg(kwarg: &str, value: Value) -> FilterResult<Self> {
        let (field, lookup_type) = kwarg
            .rsplit_once(LOOKUP_SEP)
            .and_then(|(field, suffix)| {
                suffix.parse::<LookupType>().ok().map(|t| (field, t))
            })
            .unwrap_or((kwarg, LookupType::Exact));
        Self::lookup(field, lookup_type, value)
    }

    /// Returns `true` if this is an empty AND or OR.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::And(children) | Self::Or(children) => children.is_empty(),
            _ => false,
        }
    }
}

impl ops::BitAnd for Q {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), other) => {
                left.push(other);
                Self::And(left)
            }
            (other, Self::And(mut right)) => {
                right.insert(0, other);
                Self::And(right)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }
}

impl ops::BitOr for Q {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Self::Or(mut left), Self::Or(right)) => {
                left.extend(right);
                Self::Or(left)
            }
            (Self::Or(mut left), other) => {
                left.push(other);
                Self::Or(left)
            }
            (other, Self::Or(mut right)) => {
                right.insert(0, other);
                Self::Or(right)
            }
            (left, right) => Self::Or(vec![left, right]),
        }
    }
}

impl ops::Not for Q {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }
}
