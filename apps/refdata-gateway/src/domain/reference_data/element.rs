//! Self-describing response payload.
//!
//! The terminal answers with a tree of named sequences, repeated arrays and
//! typed scalars. `Element` is the decoded form of that tree; the accessors
//! mirror the existence checks and typed getters the wire API offers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A node of the response tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Element {
    /// Explicit null / missing value.
    #[default]
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating point scalar.
    Float(f64),
    /// String scalar (also dates and enumerations).
    String(String),
    /// Repeated element.
    Array(Vec<Element>),
    /// Named sub-elements.
    Sequence(BTreeMap<String, Element>),
}

impl Element {
    /// Build a sequence from `(name, element)` pairs.
    #[must_use]
    pub fn sequence<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Sequence(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Get a named, non-null sub-element.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        match self {
            Self::Sequence(children) => children.get(name).filter(|e| !e.is_null()),
            _ => None,
        }
    }

    /// Whether a named, non-null sub-element exists.
    #[must_use]
    pub fn has_element(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    /// Values of a repeated element.
    ///
    /// A lone sequence is treated as a repeated element with one value; any
    /// other node has no values.
    #[must_use]
    pub fn values(&self) -> &[Self] {
        match self {
            Self::Array(items) => items,
            Self::Sequence(_) => std::slice::from_ref(self),
            _ => &[],
        }
    }

    /// Number of values of a repeated element.
    #[must_use]
    pub fn num_values(&self) -> usize {
        self.values().len()
    }

    /// Whether this node is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Read the node as a float. Only numeric scalars convert.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Read the node as text. Scalars convert, containers and null do not.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(v) => Some(v.to_string()),
            Self::Float(v) => Some(v.to_string()),
            Self::Null | Self::Array(_) | Self::Sequence(_) => None,
        }
    }

    /// Read a named sub-element as text.
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).and_then(Self::as_text)
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Element {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for Element {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Element {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<Self>> for Element {
    fn from(value: Vec<Self>) -> Self {
        Self::Array(value)
    }
}

/// One message inside a session event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message type name (e.g. `ReferenceDataResponse`).
    pub message_type: String,
    /// Correlation id of the request this message answers, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<u64>,
    /// Message body.
    #[serde(default)]
    pub elements: Element,
}

impl Message {
    /// Create a message with the given type and body.
    #[must_use]
    pub fn new(message_type: impl Into<String>, elements: Element) -> Self {
        Self {
            message_type: message_type.into(),
            correlation_id: None,
            elements,
        }
    }

    /// Whether the message body carries a named, non-null element.
    #[must_use]
    pub fn has_element(&self, name: &str) -> bool {
        self.elements.has_element(name)
    }

    /// Get a named element of the message body.
    #[must_use]
    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements.child(name)
    }
}
