//! Scalar values stored in node namespaces and produced by guard operands.
//!
//! The domain is closed: 64-bit integers, doubles, booleans and strings.
//! Numbers are only promoted to `f64` inside numeric comparison and numeric
//! equality; everywhere else a value keeps its variant.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// A scalar value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl Value {
    /// Returns the variant name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Truthiness in boolean context.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
        }
    }

    /// Promotes a numeric value to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Equality as used by `==` and `!=`.
    ///
    /// Same variants compare directly; an int/float pair is compared after
    /// promotion to `f64`; any other mix is unequal.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    pub(crate) fn numeric_operand(&self, op: &str) -> Result<f64, CoreError> {
        self.as_f64().ok_or_else(|| CoreError::NonNumericOperand {
            op: op.to_string(),
            found: self.type_name(),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ScalarVisitor;

        impl<'de> Visitor<'de> for ScalarVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a scalar value (integer, float, boolean or string)")
            }

            fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Int(v))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                i64::try_from(v)
                    .map(Value::Int)
                    .map_err(|_| E::custom(format!("integer {} out of range", v)))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Float(v))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Value::String(v.to_string()))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Value::String(v))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::Float(-0.0).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("x").is_truthy());
    }

    #[test]
    fn test_loose_eq_numeric_promotion() {
        assert!(Value::Int(42).loose_eq(&Value::Float(42.0)));
        assert!(Value::Float(42.0).loose_eq(&Value::Int(42)));
        assert!(!Value::Int(42).loose_eq(&Value::Float(42.5)));
    }

    #[test]
    fn test_loose_eq_cross_type_is_unequal() {
        assert!(!Value::Int(1).loose_eq(&Value::Bool(true)));
        assert!(!Value::from("1").loose_eq(&Value::Int(1)));
        assert!(!Value::Bool(false).loose_eq(&Value::from("")));
    }

    #[test]
    fn test_numeric_operand() {
        assert_eq!(Value::Int(3).numeric_operand("<").unwrap(), 3.0);
        let err = Value::from("abc").numeric_operand("<").unwrap_err();
        assert!(matches!(
            err,
            CoreError::NonNumericOperand { found: "string", .. }
        ));
        assert!(Value::Bool(true).numeric_operand(">=").is_err());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int(7).as_f64(), Some(7.0));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::from("hi").as_str(), Some("hi"));
        assert_eq!(Value::Int(7).as_str(), None);
        assert_eq!(Value::from("hi").as_f64(), None);
    }

    #[test]
    fn test_deserialize_scalars() {
        let v: Value = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(v, Value::Int(42));
        let v: Value = serde_json::from_value(json!(42.0)).unwrap();
        assert_eq!(v, Value::Float(42.0));
        let v: Value = serde_json::from_value(json!(true)).unwrap();
        assert_eq!(v, Value::Bool(true));
        let v: Value = serde_json::from_value(json!("hello")).unwrap();
        assert_eq!(v, Value::from("hello"));
    }

    #[test]
    fn test_deserialize_rejects_non_scalars() {
        assert!(serde_json::from_value::<Value>(json!(null)).is_err());
        assert!(serde_json::from_value::<Value>(json!([1, 2])).is_err());
        assert!(serde_json::from_value::<Value>(json!({"a": 1})).is_err());
        assert!(serde_json::from_value::<Value>(json!(u64::MAX)).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(5).to_string(), "5");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::from("a").to_string(), "\"a\"");
    }
}
