//! The colour-operation plugin interface.

use crate::error::PluginError;
use crate::hook::PreDrawHook;
use async_trait::async_trait;
use chroma_color::OperationData;
use chroma_core::{ColourParams, FrameData, FrameIdentity};
use std::sync::Arc;
use uuid::Uuid;

/// Shader uniforms as a key/value document.
pub type Uniforms = ColourParams;

/// A plugin that contributes one operation to the colour pipeline, applied
/// in linear space between linearise and display.
///
/// `request_data` must be deterministic for equal inputs: whatever it reads
/// from the frame identity has to be part of the transform key, otherwise
/// cached results would be reused for frames that need different data.
#[async_trait]
pub trait ColourOpPlugin: Send + Sync {
    fn id(&self) -> Uuid;

    fn name(&self) -> &str;

    /// Build the shader fragment and LUTs for this frame.
    async fn request_data(&self, frame: &FrameIdentity) -> Result<OperationData, PluginError>;

    /// Optional GPU pre-draw hook for one viewer.
    async fn pre_draw_hook(
        &self,
        _viewer_index: usize,
    ) -> Result<Option<Arc<dyn PreDrawHook>>, PluginError> {
        Ok(None)
    }

    /// Per-frame dynamic uniforms for an operation this plugin produced.
    /// Called on every draw, so it must not do heavy work.
    fn update_uniforms(&self, _op: &OperationData, _frame: &FrameData) -> Uniforms {
        Uniforms::new()
    }
}
