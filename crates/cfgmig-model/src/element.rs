//! Group elements and their opaque payloads
//!
//! An [`Element`] is one named entry inside an ordered group. Its
//! [`Payload`] is carried through migration untouched; only its name takes
//! part in reconciliation.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Opaque element payload
///
/// Uses JSON as the canonical representation. The empty payload is an
/// empty object, which is what freshly added elements receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(JsonValue);

impl Payload {
    /// Create from JSON value
    #[inline]
    #[must_use]
    pub fn new(value: JsonValue) -> Self {
        Self(value)
    }

    /// Empty payload
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Parse from JSON string
    ///
    /// # Errors
    /// Returns error if JSON is invalid
    pub fn from_json(json: &str) -> Result<Self, PayloadError> {
        Ok(Self(serde_json::from_str(json)?))
    }

    /// Parse from YAML string
    ///
    /// # Errors
    /// Returns error if YAML is invalid
    pub fn from_yaml(yaml: &str) -> Result<Self, PayloadError> {
        Ok(Self(serde_yaml::from_str(yaml)?))
    }

    /// Get JSON value reference
    #[inline]
    #[must_use]
    pub fn value(&self) -> &JsonValue {
        &self.0
    }

    /// Consume into the JSON value
    #[inline]
    #[must_use]
    pub fn into_value(self) -> JsonValue {
        self.0
    }

    /// Get a value by JSON pointer
    #[inline]
    #[must_use]
    pub fn get(&self, pointer: &str) -> Option<&JsonValue> {
        self.0.pointer(pointer)
    }

    /// Check whether the payload carries no attributes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Null => true,
            JsonValue::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<JsonValue> for Payload {
    fn from(value: JsonValue) -> Self {
        Self::new(value)
    }
}

/// Payload error types
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid YAML payload: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
}

/// One named entry of an ordered group
///
/// Identity is the name alone; two elements with the same name and
/// different payloads are the same element as far as diffs are concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    name: String,
    #[serde(default)]
    payload: Payload,
}

impl Element {
    /// Create element with payload
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Create element with the empty payload
    #[inline]
    #[must_use]
    pub fn bare(name: impl Into<String>) -> Self {
        Self::new(name, Payload::empty())
    }

    /// Element name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element payload
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Split into name and payload
    #[inline]
    #[must_use]
    pub fn into_parts(self) -> (String, Payload) {
        (self.name, self.payload)
    }
}
