//! Property value types for nodes, relationships and the graph itself
//!
//! Every property column declares one [`ValueType`]; values written into it
//! must carry exactly that type. No implicit coercion happens on write.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a property column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Long,
    Double,
    Boolean,
    String,
    LongArray,
    DoubleArray,
}

impl ValueType {
    /// Default used when a column is declared without an explicit one.
    ///
    /// Integers default to `i64::MIN` and doubles to NaN so that "never
    /// written" stays distinguishable from a real zero.
    pub fn fallback_default(&self) -> PropertyValue {
        match self {
            ValueType::Long => PropertyValue::Long(i64::MIN),
            ValueType::Double => PropertyValue::Double(f64::NAN),
            ValueType::Boolean => PropertyValue::Boolean(false),
            ValueType::String => PropertyValue::String(String::new()),
            ValueType::LongArray => PropertyValue::LongArray(Vec::new()),
            ValueType::DoubleArray => PropertyValue::DoubleArray(Vec::new()),
        }
    }

    /// Scalar numeric types can be read as `f64` by the composite iterator
    pub fn is_numeric_scalar(&self) -> bool {
        matches!(self, ValueType::Long | ValueType::Double | ValueType::Boolean)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, ValueType::LongArray | ValueType::DoubleArray)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Long => "Long",
            ValueType::Double => "Double",
            ValueType::Boolean => "Boolean",
            ValueType::String => "String",
            ValueType::LongArray => "LongArray",
            ValueType::DoubleArray => "DoubleArray",
        };
        write!(f, "{}", name)
    }
}

/// A single typed property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Long(i64),
    Double(f64),
    Boolean(bool),
    String(String),
    LongArray(Vec<i64>),
    DoubleArray(Vec<f64>),
}

impl PropertyValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyValue::Long(_) => ValueType::Long,
            PropertyValue::Double(_) => ValueType::Double,
            PropertyValue::Boolean(_) => ValueType::Boolean,
            PropertyValue::String(_) => ValueType::String,
            PropertyValue::LongArray(_) => ValueType::LongArray,
            PropertyValue::DoubleArray(_) => ValueType::DoubleArray,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            PropertyValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            PropertyValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_long_array(&self) -> Option<&[i64]> {
        match self {
            PropertyValue::LongArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_double_array(&self) -> Option<&[f64]> {
        match self {
            PropertyValue::DoubleArray(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric view of a scalar value (booleans read as 0.0 / 1.0)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Long(v) => Some(*v as f64),
            PropertyValue::Double(v) => Some(*v),
            PropertyValue::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Exact identity: doubles compare by bit pattern, so NaN defaults match.
    pub fn is_identical(&self, other: &PropertyValue) -> bool {
        match (self, other) {
            (PropertyValue::Double(a), PropertyValue::Double(b)) => a.to_bits() == b.to_bits(),
            (PropertyValue::DoubleArray(a), PropertyValue::DoubleArray(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            _ => self == other,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Long(v) => write!(f, "{}", v),
            PropertyValue::Double(v) => write!(f, "{}", v),
            PropertyValue::Boolean(v) => write!(f, "{}", v),
            PropertyValue::String(v) => write!(f, "\"{}\"", v),
            PropertyValue::LongArray(arr) => write!(f, "{:?}", arr),
            PropertyValue::DoubleArray(arr) => write!(f, "{:?}", arr),
        }
    }
}

// Convenience conversions
impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Long(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Long(v as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Double(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Boolean(v)
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<Vec<i64>> for PropertyValue {
    fn from(v: Vec<i64>) -> Self {
        PropertyValue::LongArray(v)
    }
}

impl From<Vec<f64>> for PropertyValue {
    fn from(v: Vec<f64>) -> Self {
        PropertyValue::DoubleArray(v)
    }
}
