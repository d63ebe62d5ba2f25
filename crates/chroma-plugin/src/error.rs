//! Plugin subsystem errors.

use thiserror::Error;

/// Cloneable so one failure can be handed to every queued request.
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    #[error("plugin not found: {0}")]
    NotFound(String),
    #[error("plugin loading failed: {0}")]
    Loading(String),
    #[error("plugin {plugin} failed: {reason}")]
    Request { plugin: String, reason: String },
    #[error("invalid plugin: {0}")]
    Invalid(String),
    #[error("plugin registry dropped before loading finished")]
    Abandoned,
}

impl PluginError {
    pub fn request(plugin: impl Into<String>, reason: impl ToString) -> Self {
        Self::Request {
            plugin: plugin.into(),
            reason: reason.to_string(),
        }
    }
}
