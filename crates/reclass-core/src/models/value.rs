use serde::{Deserialize, Serialize};
use std::fmt;

/// A classification code as found in a dataset.
///
/// Raster samples are always integers. Vector attributes may hold either
/// numbers or text; text that parses as an integer is normalised to
/// [`ClassValue::Int`] so that `"1"` and `1` address the same class. Other
/// text is kept verbatim, surrounding whitespace included.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassValue {
    Int(i64),
    Text(String),
}

impl ClassValue {
    /// Parse a textual code, preferring the integer form
    pub fn parse(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(v) => ClassValue::Int(v),
            Err(_) => ClassValue::Text(s.to_string()),
        }
    }

    /// Convert a feature property into a class value.
    ///
    /// Returns `None` for null, arrays and objects, which can never be
    /// classification keys.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Some(ClassValue::Int(i));
                }
                // dBase numerics arrive as f64
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some(ClassValue::Int(f as i64)),
                    _ => Some(ClassValue::Text(n.to_string())),
                }
            }
            serde_json::Value::String(s) => Some(ClassValue::parse(s)),
            serde_json::Value::Bool(b) => Some(ClassValue::Text(b.to_string())),
            serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ClassValue::Int(v) => Some(*v),
            ClassValue::Text(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ClassValue::Int(v) => serde_json::Value::from(*v),
            ClassValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for ClassValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassValue::Int(v) => write!(f, "{}", v),
            ClassValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ClassValue {
    fn from(value: i64) -> Self {
        ClassValue::Int(value)
    }
}

impl From<&str> for ClassValue {
    fn from(value: &str) -> Self {
        ClassValue::parse(value)
    }
}
