use std::fmt;

use crate::common::MAX_VARCHAR_BYTES;
use crate::storage::page::{decode_latin1, encode_latin1};

use super::ColumnType;

/// A typed field value. Each variant corresponds to a `ColumnType`.
///
/// Ordering compares integers numerically and text lexicographically;
/// integers sort before text so mixed keys still have a total order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    /// 32-bit signed integer
    Int(i32),
    /// Variable-length text
    Text(String),
}

impl Value {
    /// Returns the integer if this is an `Int`.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    /// Returns the text if this is a `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Int(_) => None,
        }
    }

    /// Returns true if the value can be stored in a column of `column_type`.
    pub fn matches(&self, column_type: &ColumnType) -> bool {
        matches!(
            (self, column_type),
            (Value::Int(_), ColumnType::Integer) | (Value::Text(_), ColumnType::VarChar(_))
        )
    }

    /// Returns the value as it reads back from a page. Characters above
    /// U+00FF become '?' and text is cut at `MAX_VARCHAR_BYTES`.
    pub fn to_stored(&self) -> Value {
        match self {
            Value::Int(v) => Value::Int(*v),
            Value::Text(s) => Value::Text(decode_latin1(&stored_text(s))),
        }
    }

    /// Returns a short name of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "INTEGER",
            Value::Text(_) => "VARCHAR",
        }
    }
}

/// Encodes text the way a VARCHAR field holds it on a page.
pub(crate) fn stored_text(value: &str) -> Vec<u8> {
    let mut encoded = encode_latin1(value);
    encoded.truncate(MAX_VARCHAR_BYTES);
    encoded
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int(5).as_int(), Some(5));
        assert_eq!(Value::Int(5).as_text(), None);
        assert_eq!(Value::from("abc").as_text(), Some("abc"));
        assert_eq!(Value::from(7).to_string(), "7");
    }

    #[test]
    fn test_value_matches_column_type() {
        assert!(Value::Int(1).matches(&ColumnType::Integer));
        assert!(!Value::Int(1).matches(&ColumnType::VarChar(10)));
        assert!(Value::from("x").matches(&ColumnType::VarChar(10)));
    }

    #[test]
    fn test_value_ordering() {
        assert!(Value::Int(-1) < Value::Int(3));
        assert!(Value::from("apple") < Value::from("banana"));
        assert!(Value::Int(i32::MAX) < Value::from(""));
    }

    #[test]
    fn test_to_stored_matches_codec() {
        assert_eq!(Value::Int(9).to_stored(), Value::Int(9));
        assert_eq!(Value::from("a€b").to_stored(), Value::from("a?b"));
        assert_eq!(Value::from("café").to_stored(), Value::from("café"));

        let stored = Value::from("x".repeat(300)).to_stored();
        assert_eq!(stored, Value::from("x".repeat(MAX_VARCHAR_BYTES)));
    }
}
