//! Colour-management parameters attached to media sources.
//!
//! A free-form JSON object carried by every frame. Keys are kept sorted
//! (serde_json's default map), so serializing the same parameters always
//! produces the same bytes.

use crate::error::{ChromaError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Colour metadata for a source, e.g. `{"display": "Rec709", "colourspace": "ACEScg"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColourParams(Map<String, Value>);

impl ColourParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build from an arbitrary JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            Value::Bool(_) => Err(ChromaError::NotAnObject("bool")),
            Value::Number(_) => Err(ChromaError::NotAnObject("number")),
            Value::String(_) => Err(ChromaError::NotAnObject("string")),
            Value::Array(_) => Err(ChromaError::NotAnObject("array")),
        }
    }

    /// Parse from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or overwrite a top-level value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Get a top-level value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a nested value with a JSON pointer (`/grading/exposure`).
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        let (first, rest) = pointer.strip_prefix('/')?.split_once('/').map_or_else(
            || (pointer.trim_start_matches('/'), None),
            |(head, tail)| (head, Some(tail)),
        );
        let root = self.0.get(first)?;
        match rest {
            Some(rest) => root.pointer(&format!("/{rest}")),
            None => Some(root),
        }
    }

    /// Typed top-level lookup falling back to `default` when the key is
    /// missing or has the wrong type.
    pub fn value_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.0
            .get(key)
            .and_then(|v| T::deserialize(v).ok())
            .unwrap_or(default)
    }

    /// Deep-merge `other` into `self`. Objects merge recursively, any other
    /// value in `other` replaces the existing one.
    pub fn merge(&mut self, other: &ColourParams) {
        for (key, value) in &other.0 {
            match self.0.get_mut(key) {
                Some(existing) => merge_value(existing, value),
                None => {
                    self.0.insert(key.clone(), value.clone());
                }
            }
        }
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the underlying map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Map<String, Value>> for ColourParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn merge_value(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match target.get_mut(key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, incoming) => *target = incoming.clone(),
    }
}
