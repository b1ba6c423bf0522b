//! Records handed to the writer by the upstream stage.

use std::fmt;

use bytes::Bytes;

/// Payload of a record.
///
/// The variant is fixed when the record is built, so the writer never has to
/// inspect the value at write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Already-encoded UTF-8 text; written verbatim.
    Text(String),
    /// Raw bytes; written verbatim.
    Bytes(Bytes),
    /// Canonical string form of some other value, encoded as UTF-8.
    Formatted(String),
}

impl Value {
    /// Capture the `Display` form of any value.
    pub fn display(value: impl fmt::Display) -> Self {
        Value::Formatted(value.to_string())
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Value::Text(text) => text.as_bytes(),
            Value::Bytes(bytes) => bytes,
            Value::Formatted(text) => text.as_bytes(),
        }
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<Bytes> for Value {
    fn from(bytes: Bytes) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(bytes))
    }
}

/// A `(key, value)` pair. `None` on either side is the null sentinel and the
/// record is dropped by every writer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub key: Option<String>,
    pub value: Option<Value>,
}

impl Record {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: Some(key.into()),
            value: Some(value.into()),
        }
    }

    /// Record with a null value.
    pub fn key_only(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.key.is_none() || self.value.is_none()
    }

    /// Key and value when neither is null.
    pub fn parts(&self) -> Option<(&str, &Value)> {
        match (&self.key, &self.value) {
            (Some(key), Some(value)) => Some((key.as_str(), value)),
            _ => None,
        }
    }
}
