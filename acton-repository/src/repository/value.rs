//! Dynamically typed field values
//!
//! Entities expose their persisted fields as [`Value`]s so that predicates,
//! ordering, projections and query-by-example can work on any entity type
//! without reflection.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A field value or predicate operand
///
/// # Example
///
/// ```rust
/// use acton_repository::repository::Value;
///
/// let name: Value = "member1".into();
/// let age: Value = 10_i64.into();
/// let missing: Value = Option::<i64>::None.into();
///
/// assert_eq!(name.as_str(), Some("member1"));
/// assert!(age.compare(&Value::Float(9.5)).is_some_and(|o| o.is_gt()));
/// assert!(missing.is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Absent value (SQL NULL)
    #[default]
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// UTC timestamp
    Timestamp(DateTime<Utc>),
    /// String value
    String(String),
    /// List of values (operand of IN)
    List(Vec<Value>),
}

impl Value {
    /// Whether this value is [`Value::Null`]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the string content, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content, if this is an integer
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric content widened to `f64`
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean content, if this is a boolean
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Timestamp content, if this is a timestamp
    pub const fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    /// List content, if this is a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Timestamp(_) => "timestamp",
            Self::String(_) => "string",
            Self::List(_) => "list",
        }
    }

    /// Compare two values the way a predicate does
    ///
    /// Integers and floats compare numerically. `Null` and values of unrelated
    /// types are incomparable (`None`), so a predicate on them never matches.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Integer(_) | Self::Float(_), Self::Integer(_) | Self::Float(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::List(a), Self::List(b)) => {
                for (left, right) in a.iter().zip(b) {
                    match left.compare(right)? {
                        Ordering::Equal => {}
                        unequal => return Some(unequal),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    /// Total ordering used for sorting rows
    ///
    /// Nulls sort first, NaN sorts after every other number, and
    /// incomparable types fall back to variant order.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Integer(_) | Self::Float(_), Self::Integer(_) | Self::Float(_)) => {
                let a = self.as_f64().unwrap_or(f64::NAN);
                let b = other.as_f64().unwrap_or(f64::NAN);
                match (a.is_nan(), b.is_nan()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                }
            }
            (Self::List(a), Self::List(b)) => a
                .iter()
                .zip(b)
                .map(|(left, right)| left.sort_cmp(right))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            _ => self
                .compare(other)
                .unwrap_or_else(|| self.sort_rank().cmp(&other.sort_rank())),
        }
    }

    const fn sort_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) | Self::Float(_) => 2,
            Self::Timestamp(_) => 3,
            Self::String(_) => 4,
            Self::List(_) => 5,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Self::String(s) => write!(f, "'{s}'"),
            Self::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::String(s.clone())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Self::String(id.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Self::List(items.into_iter().map(Self::String).collect())
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Self::List(items.into_iter().map(Self::from).collect())
    }
}

impl From<Vec<i64>> for Value {
    fn from(items: Vec<i64>) -> Self {
        Self::List(items.into_iter().map(Self::Integer).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from("a"), Value::String("a".to_string()));
        assert_eq!(Value::from(7_i32), Value::Integer(7));
        assert_eq!(Value::from(true), Value::Boolean(true));
        assert_eq!(Value::from(Option::<String>::None), Value::Null);
        assert_eq!(Value::from(Some(3_i64)), Value::Integer(3));
        assert_eq!(
            Value::from(vec!["AAA", "BBB"]),
            Value::List(vec![Value::from("AAA"), Value::from("BBB")])
        );
    }

    #[test]
    fn test_numeric_comparison_crosses_int_and_float() {
        assert_eq!(
            Value::Integer(20).compare(&Value::Float(15.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Float(10.0).compare(&Value::Integer(10)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_null_and_mixed_types_are_incomparable() {
        assert_eq!(Value::Null.compare(&Value::Null), None);
        assert_eq!(Value::Integer(1).compare(&Value::Null), None);
        assert_eq!(Value::from("1").compare(&Value::Integer(1)), None);
    }

    #[test]
    fn test_sort_cmp_puts_nulls_first() {
        let mut values = vec![Value::from("b"), Value::Null, Value::from("a")];
        values.sort_by(Value::sort_cmp);
        assert_eq!(values, vec![Value::Null, Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_sort_cmp_places_nan_after_numbers() {
        let mut values = vec![
            Value::Float(f64::NAN),
            Value::Integer(3),
            Value::Float(1.5),
            Value::Float(f64::NAN),
            Value::Integer(-2),
            Value::Float(2.0),
            Value::Null,
        ];
        values.sort_by(Value::sort_cmp);

        assert_eq!(values[0], Value::Null);
        assert_eq!(
            &values[1..5],
            [
                Value::Integer(-2),
                Value::Float(1.5),
                Value::Float(2.0),
                Value::Integer(3),
            ]
        );
        assert!(values[5..].iter().all(|v| v.as_f64().is_some_and(f64::is_nan)));
        for pair in values.windows(2) {
            assert_ne!(pair[0].sort_cmp(&pair[1]), Ordering::Greater);
        }
        assert_eq!(
            Value::Float(f64::NAN).sort_cmp(&Value::Integer(i64::MAX)),
            Ordering::Greater
        );
    }

    #[test]
    fn test_timestamp_comparison() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            Value::from(earlier).compare(&Value::from(later)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("x").to_string(), "'x'");
        assert_eq!(Value::from(vec![1_i64, 2]).to_string(), "(1, 2)");
        assert_eq!(Value::Null.to_string(), "null");
    }

    #[test]
    fn test_serialize_untagged() {
        let json = serde_json::to_string(&Value::from(vec![Value::from("a"), Value::Integer(1)]))
            .unwrap();
        assert_eq!(json, r#"["a",1]"#);
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
    }
}
