//! Pipeline and cache errors.

use crate::stage::StageError;
use chroma_plugin::PluginError;
use thiserror::Error;

/// Error delivered to every caller that was waiting on a computation.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: &'static str,
        source: StageError,
    },
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error("computation for key {0} ended without a result")]
    Abandoned(String),
    #[error("config error: {0}")]
    Config(String),
}

impl PipelineError {
    pub(crate) fn linearise(source: StageError) -> Self {
        Self::Stage {
            stage: "linearise",
            source,
        }
    }

    pub(crate) fn display(source: StageError) -> Self {
        Self::Stage {
            stage: "display",
            source,
        }
    }
}

/// Result cache backend failure. Never surfaced from a resolve.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache backend error: {0}")]
    Backend(String),
}
