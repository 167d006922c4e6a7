//! Flat result rows.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::element::Element;

/// Key holding the security identifier of a row.
pub const SECURITY_KEY: &str = "security";

/// Key holding a security-level error of a row.
pub const SECURITY_ERROR_KEY: &str = "securityError";

/// Prefix marking a per-field error value.
pub const FIELD_ERROR_PREFIX: &str = "Field Error: ";

/// Prefix marking a security-level error value.
pub const SECURITY_ERROR_PREFIX: &str = "Security Error: ";

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    /// Numeric value.
    Float(f64),
    /// Text value, including error markers.
    Text(String),
    /// Absent or undecodable value.
    #[default]
    Null,
}

impl FieldValue {
    /// Decode a field element: numeric first, then text, then null.
    ///
    /// Never fails; anything that is neither numeric nor a scalar resolves
    /// to `Null`.
    #[must_use]
    pub fn decode(element: &Element) -> Self {
        if let Some(value) = element.as_f64() {
            return Self::Float(value);
        }
        element.as_text().map_or(Self::Null, Self::Text)
    }

    /// Whether the value is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text value, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One row of the result table: field name to value, in insertion order.
///
/// Every row carries the [`SECURITY_KEY`] entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    entries: Vec<(String, FieldValue)>,
}

impl ResultRow {
    /// Create a row for a security.
    #[must_use]
    pub fn new(security: impl Into<String>) -> Self {
        Self {
            entries: vec![(SECURITY_KEY.to_string(), FieldValue::Text(security.into()))],
        }
    }

    /// Set a key, replacing the value in place if the key already exists.
    pub fn set(&mut self, key: impl Into<String>, value: FieldValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Get the value stored under a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Whether the row holds a key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The security identifier of this row.
    #[must_use]
    pub fn security(&self) -> &str {
        self.get(SECURITY_KEY)
            .and_then(FieldValue::as_str)
            .unwrap_or_default()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: a row has at least its security key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
