//! Log message representation
//!
//! A [`Message`] is an immutable bag of named fields. The routing engine
//! only ever reads messages: it looks up field values, checks field
//! presence, and iterates field names for index intersection.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single field value on a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean field
    Boolean(bool),
    /// Integer field
    Integer(i64),
    /// Floating-point field
    Float(f64),
    /// Text field
    Text(String),
}

impl FieldValue {
    /// Canonical string rendering of the value.
    ///
    /// Used by the exact/contains/regex matchers, which compare string
    /// representations regardless of the underlying field type.
    pub fn as_text(&self) -> String {
        match self {
            Self::Boolean(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    /// Numeric view of the value, if it has one.
    ///
    /// Numeric-looking text fields parse; everything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Boolean(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// An ingested log/event message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    /// Named fields of the message
    fields: HashMap<String, FieldValue>,

    /// Identifier of the input this message arrived on
    #[serde(skip_serializing_if = "Option::is_none")]
    source_input_id: Option<String>,
}

impl Message {
    /// Create an empty message
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, builder style
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set the originating input id, builder style
    pub fn with_source_input(mut self, input_id: impl Into<String>) -> Self {
        self.source_input_id = Some(input_id.into());
        self
    }

    /// Get a field value by name
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Test whether a field exists on the message
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterate this message's field names
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields on the message
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Identifier of the input this message arrived on
    pub fn source_input_id(&self) -> Option<&str> {
        self.source_input_id.as_deref()
    }
}
