//! Transform keys.
//!
//! A [`TransformKey`] names the colour transform a frame needs. It is built
//! from the frame's source identity, the source colour metadata and the
//! viewer's colour state. Frame number and media handle are left out: every
//! frame of a source shares one transform unless its metadata differs.
//!
//! Anything a stage or plugin reads from the frame when building its
//! operation must be covered here, or two frames needing different data
//! would share a cached result.

use chroma_core::{ColourParams, FrameIdentity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Viewer-side colour management state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColourState {
    pub display: String,
    pub view: String,
    /// Anything else that changes the transform (look, exposure mode,
    /// grading values, ...).
    #[serde(default)]
    pub extras: ColourParams,
}

impl ColourState {
    pub fn new(display: impl Into<String>, view: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            view: view.into(),
            extras: ColourParams::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key, value);
        self
    }
}

/// Hex digest identifying one colour transform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformKey(String);

impl TransformKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct KeyHasher(blake3::Hasher);

impl KeyHasher {
    fn tag(&mut self, tag: u8) {
        self.0.update(&[tag]);
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.0.update(&(bytes.len() as u64).to_le_bytes());
        self.0.update(bytes);
    }

    fn str(&mut self, s: &str) {
        self.bytes(s.as_bytes());
    }

    fn params(&mut self, params: &ColourParams) {
        self.tag(b'o');
        self.0.update(&(params.len() as u64).to_le_bytes());
        // serde_json maps iterate in key order.
        for (k, v) in params.as_map() {
            self.str(k);
            self.value(v);
        }
    }

    fn value(&mut self, value: &Value) {
        match value {
            Value::Null => self.tag(b'n'),
            Value::Bool(b) => {
                self.tag(b'b');
                self.tag(u8::from(*b));
            }
            Value::Number(n) => {
                self.tag(b'#');
                self.str(&n.to_string());
            }
            Value::String(s) => {
                self.tag(b's');
                self.str(s);
            }
            Value::Array(items) => {
                self.tag(b'a');
                self.0.update(&(items.len() as u64).to_le_bytes());
                for item in items {
                    self.value(item);
                }
            }
            Value::Object(map) => {
                self.tag(b'o');
                self.0.update(&(map.len() as u64).to_le_bytes());
                for (k, v) in map {
                    self.str(k);
                    self.value(v);
                }
            }
        }
    }
}

/// Compute the transform key for a frame under a colour state.
///
/// Pure and allocation-light; called on every resolve including cache hits.
pub fn compute_key(frame: &FrameIdentity, state: &ColourState) -> TransformKey {
    let mut h = KeyHasher(blake3::Hasher::new());
    h.str(&frame.uri);
    h.bytes(frame.source_id.as_bytes());
    h.0.update(&frame.stream_id.to_le_bytes());
    h.params(&frame.colour_params);
    h.str(&state.display);
    h.str(&state.view);
    h.params(&state.extras);
    TransformKey(h.0.finalize().to_hex().to_string())
}
