use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The closed tagged union every ItemCollection value is restricted to
/// (spec §3.1, §9 "Dynamic-typed bag -> tagged sum").
///
/// Decimal values are carried as their canonical string form rather than a
/// `rust_decimal::Decimal` — the teacher's dependency set has no decimal
/// crate and pulling one in only for this corner would break dependency
/// alignment (see DESIGN.md).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Value {
    Str(String),
    I64(i64),
    F64(f64),
    Decimal(String),
    Bool(bool),
    Instant(DateTime<Utc>),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Vec<Value>>),
}

impl Value {
    /// Basic-type check per spec §3.1: "Attempting to store a non-basic
    /// value fails the write." Nested List/Map are basic only if every
    /// element they contain is, recursively, basic.
    pub fn is_basic(&self) -> bool {
        match self {
            Value::Str(_)
            | Value::I64(_)
            | Value::F64(_)
            | Value::Decimal(_)
            | Value::Bool(_)
            | Value::Instant(_)
            | Value::Bytes(_) => true,
            Value::List(items) => items.iter().all(Value::is_basic),
            Value::Map(m) => m.values().all(|vs| vs.iter().all(Value::is_basic)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(n) => Some(*n),
            Value::F64(f) => Some(*f as i64),
            Value::Bool(b) => Some(if *b { 1 } else { 0 }),
            Value::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(f) => Some(*f),
            Value::I64(n) => Some(*n as f64),
            Value::Decimal(s) => s.parse().ok(),
            Value::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Str(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            Value::I64(n) => Some(*n != 0),
            _ => None,
        }
    }

    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Instant(t) => Some(*t),
            Value::Str(s) => DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// Coercing stringification used by text substitution and `$file.names`.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::I64(n) => n.to_string(),
            Value::F64(f) => f.to_string(),
            Value::Decimal(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Instant(t) => t.to_rfc3339(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
            Value::List(items) => items
                .iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(", "),
            Value::Map(_) => "<map>".to_string(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::I64(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::I64(n as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::F64(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Instant(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_detects_non_basic_nesting_is_always_basic() {
        let v = Value::List(vec![Value::I64(1), Value::Str("x".into())]);
        assert!(v.is_basic());
    }

    #[test]
    fn coercion_table_round_trips() {
        assert_eq!(Value::Str("42".into()).as_i64(), Some(42));
        assert_eq!(Value::I64(42).as_f64(), Some(42.0));
        assert_eq!(Value::Str("true".into()).as_bool(), Some(true));
    }
}
