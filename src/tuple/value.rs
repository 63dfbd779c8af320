use std::fmt::Display;
use std::mem::size_of;

use crate::catalog::schema::TypeId;
use crate::common::TEXT_LEN;

/// A comparison between a field and another value. `Like` is substring
/// containment for text and plain equality for integers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEq,
    GreaterThan,
    GreaterThanOrEq,
    Like,
}

fn compare<T: PartialEq + PartialOrd + ?Sized>(left: &T, right: &T, op: CompareOp) -> bool {
    match op {
        CompareOp::Equals => left == right,
        CompareOp::NotEquals => left != right,
        CompareOp::LessThan => left < right,
        CompareOp::LessThanOrEq => left <= right,
        CompareOp::GreaterThan => left > right,
        CompareOp::GreaterThanOrEq => left >= right,
        CompareOp::Like => unreachable!(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Integer(i32),
    Text(String),
}

impl Value {
    /// Creates a text value, truncated to the fixed field width.
    pub fn text(val: impl Into<String>) -> Self {
        let mut val = val.into();
        if val.len() > TEXT_LEN {
            val.truncate(TEXT_LEN);
        }
        Value::Text(val)
    }

    pub fn type_id(&self) -> TypeId {
        match self {
            Value::Integer(_) => TypeId::Integer,
            Value::Text(_) => TypeId::Text,
        }
    }

    /// Returns how many bytes this value occupies when serialized.
    pub fn size(&self) -> usize {
        self.type_id().size()
    }

    /// Parses a value of the given type from its serialized form.
    pub fn parse_value(bytes: &[u8], type_id: TypeId) -> Self {
        match type_id {
            TypeId::Integer => {
                let val = i32::from_be_bytes(bytes[..4].try_into().unwrap());
                Value::Integer(val)
            }
            TypeId::Text => {
                let len = u32::from_be_bytes(bytes[..4].try_into().unwrap()) as usize;
                let len = len.min(TEXT_LEN);
                let slice = &bytes[4..4 + len];
                Value::Text(String::from_utf8_lossy(slice).into_owned())
            }
        }
    }

    /// Serializes this value into the start of `buffer`. The buffer must be
    /// at least `self.size()` bytes; bytes past the text payload are left
    /// untouched.
    pub fn serialize_value(&self, buffer: &mut [u8]) {
        match self {
            Value::Integer(val) => {
                buffer[..size_of::<i32>()].copy_from_slice(val.to_be_bytes().as_slice())
            }
            Value::Text(val) => {
                let bytes = val.as_bytes();
                buffer[..4].copy_from_slice((bytes.len() as u32).to_be_bytes().as_slice());
                buffer[4..4 + bytes.len()].copy_from_slice(bytes);
            }
        }
    }

    /// Applies `op` between this value and `other`. Both sides must have the
    /// same type.
    pub fn compare(&self, op: CompareOp, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(left), Value::Integer(right)) => match op {
                CompareOp::Like => left == right,
                _ => compare(left, right, op),
            },
            (Value::Text(left), Value::Text(right)) => match op {
                CompareOp::Like => left.contains(right.as_str()),
                _ => compare(left.as_str(), right.as_str(), op),
            },
            _ => unreachable!("comparison between values of different types"),
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            Value::Integer(val) => *val,
            _ => unreachable!(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Value::Text(val) => val,
            _ => unreachable!(),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(val) => Display::fmt(val, f),
            Value::Text(val) => Display::fmt(val, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CompareOp, Value};
    use crate::catalog::schema::TypeId;
    use crate::common::TEXT_LEN;

    fn serialize_parse_test_helper(value: Value) {
        let mut buffer = vec![0u8; value.size()];
        value.serialize_value(&mut buffer);
        let parsed = Value::parse_value(&buffer, value.type_id());
        assert_eq!(parsed, value);
    }

    #[test]
    fn serialize_parse_round_trip() {
        serialize_parse_test_helper(Value::Integer(42));
        serialize_parse_test_helper(Value::Integer(-1));
        serialize_parse_test_helper(Value::Integer(i32::MIN));
        serialize_parse_test_helper(Value::text("minnow"));
        serialize_parse_test_helper(Value::text(""));
    }

    #[test]
    fn text_is_truncated_to_field_width() {
        let long = "x".repeat(TEXT_LEN + 30);
        let value = Value::text(long);
        assert_eq!(value.as_str().len(), TEXT_LEN);
        assert_eq!(value.size(), TypeId::Text.size());
    }

    #[test]
    fn integer_comparisons() {
        let three = Value::Integer(3);
        let five = Value::Integer(5);

        assert!(three.compare(CompareOp::LessThan, &five));
        assert!(three.compare(CompareOp::LessThanOrEq, &five));
        assert!(three.compare(CompareOp::NotEquals, &five));
        assert!(five.compare(CompareOp::GreaterThan, &three));
        assert!(!three.compare(CompareOp::Equals, &five));
        assert!(three.compare(CompareOp::Equals, &Value::Integer(3)));
        // like degrades to equality on integers
        assert!(three.compare(CompareOp::Like, &Value::Integer(3)));
        assert!(!three.compare(CompareOp::Like, &five));
    }

    #[test]
    fn like_is_substring_match_on_text() {
        let haystack = Value::text("concurrency");
        assert!(!haystack.compare(CompareOp::Like, &Value::text("current")));
        assert!(haystack.compare(CompareOp::Like, &Value::text("concur")));
        assert!(haystack.compare(CompareOp::Like, &Value::text("rency")));
        assert!(haystack.compare(CompareOp::Like, &Value::text("")));
    }
}
