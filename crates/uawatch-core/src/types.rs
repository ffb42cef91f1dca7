// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Typed variable values.
//!
//! The demo address space exposes five variant kinds: Boolean, Int32, Float,
//! String and DateTime. [`Value`] is the closed union over exactly those kinds,
//! so every consumer can match on it exhaustively.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// DataType
// =============================================================================

/// The data type of a variable, fixed when the variable is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Boolean (ns=0;i=1).
    Boolean,
    /// 32-bit signed integer (ns=0;i=6).
    Int32,
    /// 32-bit IEEE float (ns=0;i=10).
    Float,
    /// UTF-8 string (ns=0;i=12).
    String,
    /// UTC timestamp (ns=0;i=13).
    DateTime,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "Boolean"),
            Self::Int32 => write!(f, "Int32"),
            Self::Float => write!(f, "Float"),
            Self::String => write!(f, "String"),
            Self::DateTime => write!(f, "DateTime"),
        }
    }
}

// =============================================================================
// Value
// =============================================================================

/// A typed variable value.
///
/// # Examples
///
/// ```
/// use uawatch_core::types::{DataType, Value};
///
/// let temp = Value::Float(25.5);
/// assert_eq!(temp.data_type(), DataType::Float);
/// assert_eq!(temp.as_f64(), Some(25.5));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Boolean value.
    Boolean(bool),

    /// 32-bit signed integer.
    Int32(i32),

    /// 32-bit float.
    Float(f32),

    /// UTF-8 string.
    String(String),

    /// UTC timestamp.
    DateTime(DateTime<Utc>),
}

impl Value {
    /// Returns the data type of this value.
    #[inline]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Boolean(_) => DataType::Boolean,
            Self::Int32(_) => DataType::Int32,
            Self::Float(_) => DataType::Float,
            Self::String(_) => DataType::String,
            Self::DateTime(_) => DataType::DateTime,
        }
    }

    /// Returns the value as an i32.
    #[inline]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns numeric values widened to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int32(v) => Some(f64::from(*v)),
            Self::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// Returns the value as a string slice.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the value as a timestamp.
    #[inline]
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
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

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type() {
        assert_eq!(Value::Boolean(false).data_type(), DataType::Boolean);
        assert_eq!(Value::Int32(0).data_type(), DataType::Int32);
        assert_eq!(Value::Float(22.5).data_type(), DataType::Float);
        assert_eq!(Value::from("Hello OPC UA").data_type(), DataType::String);
        assert_eq!(Value::from(Utc::now()).data_type(), DataType::DateTime);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int32(42).as_i32(), Some(42));
        assert_eq!(Value::Int32(42).as_f64(), Some(42.0));
        assert_eq!(Value::Float(25.5).as_f64(), Some(25.5));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert!(Value::from("x").as_f64().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(25.5).to_string(), "25.5");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::from("Hello from client").to_string(), "Hello from client");
    }

    #[test]
    fn test_serde_tagged() {
        let json = serde_json::to_value(Value::Int32(42)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Int32", "value": 42}));

        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, Value::Int32(42));
    }
}
