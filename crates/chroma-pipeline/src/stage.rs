//! The built-in colour stages.
//!
//! Every pipeline has exactly one [`ColourStage`]: it converts the source to
//! scene linear and linear to the display. Plugins slot in between.

use crate::key::ColourState;
use async_trait::async_trait;
use chroma_color::{ColorError, OperationData};
use chroma_core::{FrameData, FrameIdentity};
use chroma_plugin::Uniforms;

/// Linearise and display conversion for one colour management system.
#[async_trait]
pub trait ColourStage: Send + Sync {
    /// Stage name for logging
    fn name(&self) -> &str;

    /// Source colour space to scene linear.
    async fn linearise(
        &self,
        frame: &FrameIdentity,
        state: &ColourState,
    ) -> Result<OperationData, StageError>;

    /// Scene linear to the display and view in `state`.
    async fn to_display(
        &self,
        frame: &FrameIdentity,
        state: &ColourState,
    ) -> Result<OperationData, StageError>;

    /// Dynamic uniforms for an operation this stage produced.
    fn update_uniforms(&self, _op: &OperationData, _frame: &FrameData) -> Uniforms {
        Uniforms::new()
    }
}

/// Stage processing error
#[derive(Debug, Clone, thiserror::Error)]
pub enum StageError {
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    #[error("unknown colour space: {0}")]
    UnknownColourSpace(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("LUT error: {0}")]
    Lut(String),
}

impl From<ColorError> for StageError {
    fn from(e: ColorError) -> Self {
        Self::Lut(e.to_string())
    }
}
