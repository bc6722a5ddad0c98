//! Parameter values and paramsets

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A paramset maps parameter names to values.
///
/// Backed by a `BTreeMap` so iteration, comparison output and serialization
/// are always in alphabetical key order.
pub type Paramset = BTreeMap<String, ParamValue>;

/// A single parameter value as transported by the controller
///
/// Integers and floats are kept apart: the controller is strict about the
/// wire type of each parameter and a float sent for an integer parameter is
/// rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    /// Name of the value's variant, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Integer(_) => "integer",
            ParamValue::Float(_) => "float",
            ParamValue::String(_) => "string",
        }
    }

    /// Whether both values carry the same wire type
    pub fn same_type(&self, other: &ParamValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Numeric view of the value (bools map to 0/1)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ParamValue::Integer(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            ParamValue::String(_) => None,
        }
    }

    /// Interpret the value as a list index (ENUM wire values)
    pub fn as_index(&self) -> Option<usize> {
        match self {
            ParamValue::Integer(i) => usize::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Integer(i) => write!(f, "{}", i),
            ParamValue::Float(v) => write!(f, "{:?}", v),
            ParamValue::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Integer(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Integer(v.into())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_untagged_deserialize_keeps_wire_type() {
        let pset: Paramset = serde_json::from_value(json!({
            "LONG_ACTION_TYPE": 1,
            "SHORT_ON_TIME": 16383000.0,
            "UI_HINT": "kitchen",
            "LONG_MULTIEXECUTE": true,
            "SHORT_OFF_LEVEL": 1.0
        }))
        .unwrap();

        assert_eq!(pset["LONG_ACTION_TYPE"], ParamValue::Integer(1));
        assert_eq!(pset["SHORT_ON_TIME"], ParamValue::Float(16383000.0));
        assert_eq!(pset["UI_HINT"], ParamValue::String("kitchen".into()));
        assert_eq!(pset["LONG_MULTIEXECUTE"], ParamValue::Bool(true));
        assert_eq!(pset["SHORT_OFF_LEVEL"], ParamValue::Float(1.0));
    }

    #[test]
    fn test_serialize_sorted() {
        let mut pset = Paramset::new();
        pset.insert("ZETA".into(), ParamValue::Integer(2));
        pset.insert("ALPHA".into(), ParamValue::Float(0.5));

        let json = serde_json::to_string(&pset).unwrap();
        assert_eq!(json, r#"{"ALPHA":0.5,"ZETA":2}"#);
    }

    #[test]
    fn test_same_type() {
        assert!(ParamValue::Integer(1).same_type(&ParamValue::Integer(7)));
        assert!(!ParamValue::Integer(1).same_type(&ParamValue::Float(1.0)));
        assert!(!ParamValue::Bool(true).same_type(&ParamValue::Integer(1)));
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(ParamValue::Bool(true).as_f64(), Some(1.0));
        assert_eq!(ParamValue::Integer(-3).as_f64(), Some(-3.0));
        assert_eq!(ParamValue::String("x".into()).as_f64(), None);
        assert_eq!(ParamValue::Integer(2).as_index(), Some(2));
        assert_eq!(ParamValue::Integer(-1).as_index(), None);
        assert_eq!(ParamValue::Float(2.0).as_index(), None);
    }
}
