//! Backend-agnostic values.
//!
//! [`Value`] is what a cleaned form field produces and what a lookup compares
//! a column against. It covers the SQL types filters deal with and converts
//! from the matching Rust types.

use std::fmt;

/// A backend-agnostic representation of a database value.
///
/// # Examples
///
/// ```
/// use django_filter_db::value::Value;
///
/// assert_eq!(Value::from(42_i64), Value::Int(42));
/// assert_eq!(Value::from("hello"), Value::String("hello".to_string()));
/// assert!(Value::from("").is_empty());
/// assert!(!Value::from(0).is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// SQL NULL.
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// A date without time.
    Date(chrono::NaiveDate),
    /// A date and time without timezone.
    DateTime(chrono::NaiveDateTime),
    /// A time without date.
    Time(chrono::NaiveTime),
    /// A UUID value.
    Uuid(uuid::Uuid),
    /// A list of values (multiple choices, ranges, lookup pairs, IN operands).
    List(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
            Self::Time(t) => write!(f, "{t}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::List(vals) => {
                write!(f, "[")?;
                for (i, v) in vals.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

// ── From implementations ───────────────────────────────────────────────

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<chrono::NaiveDate> for Value {
    fn from(v: chrono::NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<chrono::NaiveDateTime> for Value {
    fn from(v: chrono::NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<chrono::NaiveTime> for Value {
    fn from(v: chrono::NaiveTime) -> Self {
        Self::Time(v)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Self::Null,
        }
    }
}

impl Value {
    /// Returns `true` if this value is `Null`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for values that carry no filter input: `Null`, the
    /// empty string, and the empty list.
    ///
    /// `0` and `false` are real input and are not empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Attempts to extract a boolean value.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract an integer value.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to extract a float value.
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to extract a list of values.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_primitives() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42_i32), Value::Int(42));
        assert_eq!(Value::from(1.5_f64), Value::Float(1.5));
        assert_eq!(Value::from("a"), Value::String("a".to_string()));
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(Some(3_i64)), Value::Int(3));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_from_chrono() {
        let d = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(Value::from(d), Value::Date(d));
        let t = chrono::NaiveTime::from_hms_opt(12, 30, 0).unwrap();
        assert_eq!(Value::from(t), Value::Time(t));
        let dt = d.and_time(t);
        assert_eq!(Value::from(dt), Value::DateTime(dt));
    }

    #[test]
    fn test_is_empty() {
        assert!(Value::Null.is_empty());
        assert!(Value::String(String::new()).is_empty());
        assert!(Value::List(vec![]).is_empty());
        assert!(!Value::Int(0).is_empty());
        assert!(!Value::Bool(false).is_empty());
        assert!(!Value::List(vec![Value::Null]).is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Float(1.25).to_string(), "1.25");
        let list = Value::List(vec![Value::Int(1), Value::from("x")]);
        assert_eq!(list.to_string(), "[1, x]");
        assert_eq!(
            Value::Uuid(uuid::Uuid::nil()).to_string(),
            "00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int(4).as_int(), Some(4));
        assert_eq!(Value::Int(4).as_float(), None);
        assert_eq!(Value::from("s").as_str(), Some("s"));
        assert_eq!(Value::List(vec![Value::Null]).as_list().map(<[Value]>::len), Some(1));
        assert_eq!(Value::Null.as_list(), None);
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_value(Value::Int(7)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Int", "value": 7}));
    }
}
