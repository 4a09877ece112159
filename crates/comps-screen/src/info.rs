//! Per-symbol info records
//!
//! An [`InfoRecord`] is the provider's flat snapshot of company and market
//! fields for one symbol. The schema belongs to the provider and is never
//! validated here; lookups report whether a field was missing or merely had
//! an unexpected type, and callers decide how to collapse the two.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Why a typed field lookup did not produce a value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    /// Key not present, or present with a JSON `null`
    NotFound,
    /// Key present but holding a value of another type
    WrongType(Value),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::NotFound => write!(f, "not found"),
            FieldError::WrongType(value) => write!(f, "unexpected value {value}"),
        }
    }
}

/// Flat mapping from provider field names to values for one symbol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InfoRecord {
    fields: Map<String, Value>,
}

impl InfoRecord {
    /// Wrap an already-flattened field map
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Raw value for `key`, if present
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Numeric value for `key`
    pub fn number(&self, key: &str) -> Result<f64, FieldError> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Err(FieldError::NotFound),
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| FieldError::WrongType(Value::Number(n.clone()))),
            Some(other) => Err(FieldError::WrongType(other.clone())),
        }
    }

    /// String value for `key`
    pub fn text(&self, key: &str) -> Result<&str, FieldError> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Err(FieldError::NotFound),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(FieldError::WrongType(other.clone())),
        }
    }

    /// Set `key`, returning the value it replaced
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(key.into(), value)
    }

    /// Insert `value` unless `key` is already present. Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if self.fields.contains_key(&key) {
            return false;
        }
        self.fields.insert(key, value);
        true
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for InfoRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

impl TryFrom<Value> for InfoRecord {
    type Error = crate::error::ScreenError;

    fn try_from(value: Value) -> crate::error::Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self::new(fields)),
            other => Err(crate::error::ScreenError::YahooFinanceError(format!(
                "info record must be an object, got {other}"
            ))),
        }
    }
}
