//! Pipeline configuration.

use crate::cache::CachePriority;
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Environment variable overriding [`PipelineConfig::lookahead_frames`].
pub const ENV_LOOKAHEAD: &str = "CHROMA_LOOKAHEAD";
/// Environment variable overriding [`PipelineConfig::log_filter`].
pub const ENV_LOG: &str = "CHROMA_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames resolved ahead of the playhead.
    pub lookahead_frames: usize,
    pub linearise_priority: CachePriority,
    pub display_priority: CachePriority,
    pub plugin_priority: CachePriority,
    /// Ask plugins for dynamic uniforms on every draw.
    pub gather_plugin_uniforms: bool,
    /// `tracing` filter directive used by binaries.
    pub log_filter: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookahead_frames: chroma_core::defaults::LOOKAHEAD_FRAMES,
            linearise_priority: CachePriority::High,
            display_priority: CachePriority::High,
            plugin_priority: CachePriority::Normal,
            gather_plugin_uniforms: true,
            log_filter: "info".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(json).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Apply `CHROMA_LOOKAHEAD` and `CHROMA_LOG` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`. Unparseable values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_LOOKAHEAD) {
            match raw.trim().parse() {
                Ok(frames) => self.lookahead_frames = frames,
                Err(e) => warn!(var = ENV_LOOKAHEAD, value = %raw, error = %e, "ignoring override"),
            }
        }
        if let Some(filter) = lookup(ENV_LOG).filter(|f| !f.trim().is_empty()) {
            self.log_filter = filter;
        }
        self
    }
}
