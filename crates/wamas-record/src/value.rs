//! Values carried by generic records

use crate::record::GenericRecord;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// A typed value stored in a [`GenericRecord`]
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Absent value
    #[default]
    Null,

    /// Boolean value
    Bool(bool),

    /// Integer value
    Integer(i64),

    /// Decimal value
    Decimal(f64),

    /// String value
    String(String),

    /// Calendar date
    Date(NaiveDate),

    /// Naive date and time, UTC unless stated otherwise by the caller
    DateTime(NaiveDateTime),

    /// Ordered sequence
    List(Vec<Value>),

    /// Nested record
    Record(GenericRecord),
}

impl Value {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A blank value does not satisfy a field source, so resolution falls
    /// through to the next one.
    ///
    /// Narrower than falsy: `0`, `0.0` and `false` are not blank, so a zero
    /// quantity or a `false` flag stops the fallback to `dict_key` and
    /// defaults.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Record(record) => record.is_empty(),
            _ => false,
        }
    }

    /// Truthiness as used by template conditions.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Decimal(d) => *d != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Date(_) | Value::DateTime(_) => true,
            Value::List(items) => !items.is_empty(),
            Value::Record(record) => !record.is_empty(),
        }
    }

    /// Human-readable name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    /// Render the value as text. `Null` renders as the empty string and
    /// integral decimals keep a trailing `.0`.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => format_decimal(*d),
            Value::String(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::List(_) | Value::Record(_) => self.repr(),
        }
    }

    fn repr(&self) -> String {
        match self {
            Value::Null => "None".to_string(),
            Value::String(s) => format!("'{s}'"),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::repr).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Record(record) => {
                let parts: Vec<String> = record
                    .iter()
                    .map(|(key, value)| format!("'{key}': {}", value.repr()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            other => other.to_text(),
        }
    }

    /// Borrow the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the nested record, if any.
    pub fn as_record(&self) -> Option<&GenericRecord> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Borrow the list payload, if any.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Numeric view of the value; numeric strings are parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Decimal(d) => Some(*d),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Integer view of the value; decimals are truncated toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Decimal(d) if d.is_finite() => Some(d.trunc() as i64),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::String(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().map(|d| d.trunc() as i64))
            }
            _ => None,
        }
    }

    /// Convert a JSON value; objects keep their key order.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map_or(Value::Null, Value::Decimal),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Record(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from_json(value)))
                    .collect(),
            ),
        }
    }
}

/// Format a float the way the wire codec and templates expect it: shortest
/// round-trip digits, integral values with a trailing `.0`.
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Decimal(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl From<GenericRecord> for Value {
    fn from(value: GenericRecord) -> Self {
        Value::Record(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_text_keeps_point_zero() {
        assert_eq!(Value::Decimal(5184.0).to_text(), "5184.0");
        assert_eq!(Value::Decimal(-3.6).to_text(), "-3.6");
        assert_eq!(Value::Decimal(0.1 + 0.2).to_text(), "0.30000000000000004");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::String("N".into()).is_truthy());
        assert!(Value::Decimal(0.5).is_truthy());
    }

    #[test]
    fn test_blank_is_narrower_than_falsy() {
        assert!(Value::Null.is_blank());
        assert!(Value::from("").is_blank());
        assert!(!Value::Integer(0).is_blank());
        assert!(!Value::Decimal(0.0).is_blank());
        assert!(!Value::Bool(false).is_blank());
        assert!(Value::List(Vec::new()).is_blank());
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::from(" 42 ").as_i64(), Some(42));
        assert_eq!(Value::from("3.9").as_i64(), Some(3));
        assert_eq!(Value::Decimal(-2.7).as_i64(), Some(-2));
        assert_eq!(Value::from("abc").as_f64(), None);
    }

    #[test]
    fn test_from_json_keeps_order() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"b": 1, "a": [true, null, 1.5]}"#).unwrap();
        let value = Value::from_json(json);
        let record = value.as_record().unwrap();
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(
            record.get("a"),
            Some(&Value::List(vec![
                Value::Bool(true),
                Value::Null,
                Value::Decimal(1.5)
            ]))
        );
    }

    #[test]
    fn test_list_text_uses_repr() {
        let value = Value::List(vec![Value::from("a"), Value::Integer(1)]);
        assert_eq!(value.to_text(), "['a', 1]");
    }
}
