//! Named value storage
//!
//! The [`ValueStore`] is the single shared state of a calculator: fields seed
//! it on registration, the change-detection cycle copies input readings into
//! it, conditions and bounds clamping adjust it, and coded results publish
//! their raw values into it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::format::js_number;

/// A stored value: numeric for most inputs, text for select-like inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric view used by formulas and bounds checks
    ///
    /// Text that parses as a number is numeric, anything else is NaN.
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Text(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        }
    }

    /// Equality used for change detection, where NaN equals NaN
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => same_number(*a, *b),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

/// NaN-aware float equality
pub(crate) fn same_number(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl Default for Value {
    fn default() -> Self {
        Value::Number(f64::NAN)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&js_number(*n)),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Number(if b { 1.0 } else { 0.0 })
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Mapping from field/result code to its current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueStore {
    values: HashMap<String, Value>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, code: &str) -> Option<&Value> {
        self.values.get(code)
    }

    /// Numeric value of `code`, NaN when absent or non-numeric
    pub fn number(&self, code: &str) -> f64 {
        self.values
            .get(code)
            .map(Value::as_number)
            .unwrap_or(f64::NAN)
    }

    pub fn set(&mut self, code: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(code.into(), value.into());
    }

    pub fn contains(&self, code: &str) -> bool {
        self.values.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ValueStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_number_coercion() {
        let values: ValueStore = [
            ("A", Value::Number(10.0)),
            ("SEL", Value::from("2")),
            ("NAME", Value::from("north")),
        ]
        .into_iter()
        .collect();

        assert_eq!(values.number("A"), 10.0);
        assert_eq!(values.number("SEL"), 2.0);
        assert!(values.number("NAME").is_nan());
        assert!(values.number("MISSING").is_nan());
    }

    #[test]
    fn test_same_as_treats_nan_as_equal() {
        assert!(Value::Number(f64::NAN).same_as(&Value::Number(f64::NAN)));
        assert!(Value::Number(1.5).same_as(&Value::Number(1.5)));
        assert!(!Value::Number(1.0).same_as(&Value::from("1")));
        assert!(!Value::from("a").same_as(&Value::from("b")));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(30.0).to_string(), "30");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::from("gold").to_string(), "gold");
    }

    #[test]
    fn test_serde_untagged() {
        let values: ValueStore = serde_json::from_str(r#"{"A": 1.5, "B": "x"}"#).unwrap();
        assert_eq!(values.get("A"), Some(&Value::Number(1.5)));
        assert_eq!(values.get("B"), Some(&Value::from("x")));
    }
}
