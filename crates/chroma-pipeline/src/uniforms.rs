//! Per-frame shader uniforms for an already resolved pipeline.

use crate::error::PipelineError;
use crate::executor::PipelineStageExecutor;
use chroma_color::{OpOrigin, PipelineResult};
use chroma_core::FrameData;
use chroma_plugin::Uniforms;
use tracing::trace;

/// Collect dynamic uniforms from every operation of `result`, in pipeline
/// order. Later operations win on conflicting names.
///
/// Linearise and display uniforms come from the stage, plugin uniforms from
/// the plugin that produced the operation. Nothing is recomputed.
pub async fn update_uniforms(
    executor: &PipelineStageExecutor,
    result: &PipelineResult,
    frame: &FrameData,
    include_plugins: bool,
) -> Result<Uniforms, PipelineError> {
    let mut uniforms = Uniforms::new();
    for op in result.operations() {
        let update = match op.origin {
            OpOrigin::Linearise | OpOrigin::Display => executor.stage().update_uniforms(op, frame),
            OpOrigin::Plugin(id) if include_plugins => {
                let plugin = executor.registry().plugin(id).await?;
                plugin.update_uniforms(op, frame)
            }
            OpOrigin::Plugin(_) => continue,
        };
        trace!(op = %op.origin, count = update.len(), "uniforms updated");
        uniforms.merge(&update);
    }
    Ok(uniforms)
}
