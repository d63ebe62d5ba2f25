//! Runs the stages of one pipeline computation and composes the result.

use crate::error::PipelineError;
use crate::key::ColourState;
use crate::stage::ColourStage;
use chroma_color::{OpOrigin, OperationData, PipelineResult};
use chroma_core::FrameIdentity;
use chroma_plugin::OperationRegistry;
use futures_util::future::try_join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

/// Fans a frame out to the linearise stage, the display stage and every
/// plugin, and composes their operations.
pub struct PipelineStageExecutor {
    stage: Arc<dyn ColourStage>,
    registry: Arc<OperationRegistry>,
    runs: AtomicU64,
}

impl PipelineStageExecutor {
    pub fn new(stage: Arc<dyn ColourStage>, registry: Arc<OperationRegistry>) -> Self {
        Self {
            stage,
            registry,
            runs: AtomicU64::new(0),
        }
    }

    pub fn stage(&self) -> &Arc<dyn ColourStage> {
        &self.stage
    }

    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    /// Number of times [`run`](Self::run) has been started.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// Compute the full pipeline for `frame`.
    ///
    /// All stages start together. A failing linearise or display stage fails
    /// the run without waiting for plugins; a failing plugin fails the run
    /// and discards every other plugin's output.
    pub async fn run(
        &self,
        frame: &FrameIdentity,
        state: &ColourState,
    ) -> Result<PipelineResult, PipelineError> {
        self.runs.fetch_add(1, Ordering::Relaxed);
        let span = info_span!("pipeline_run", uri = %frame.uri, frame = frame.frame, stage = self.stage.name());

        async move {
            let linearise = async {
                self.stage
                    .linearise(frame, state)
                    .await
                    .map_err(PipelineError::linearise)
            };
            let display = async {
                self.stage
                    .to_display(frame, state)
                    .await
                    .map_err(PipelineError::display)
            };
            let plugins = async {
                let plugins = self.registry.list().await?;
                let ops = try_join_all(
                    plugins
                        .iter()
                        .map(|plugin| self.registry.request_data(plugin, frame)),
                )
                .await?;
                Ok::<_, PipelineError>(ops)
            };

            let (linearise, display, plugin_ops) = tokio::try_join!(linearise, display, plugins)?;

            let mut operations = Vec::with_capacity(plugin_ops.len() + 2);
            operations.push(Arc::new(pin(linearise, OpOrigin::Linearise, f32::NEG_INFINITY)));
            operations.extend(plugin_ops);
            operations.push(Arc::new(pin(display, OpOrigin::Display, f32::INFINITY)));

            let result = PipelineResult::compose(operations);
            debug!(cache_id = %result.cache_id(), operations = result.len(), "pipeline composed");
            Ok(result)
        }
        .instrument(span)
        .await
    }
}

/// Linearise and display go first and last whatever the stage reported.
fn pin(mut op: OperationData, origin: OpOrigin, order_index: f32) -> OperationData {
    op.origin = origin;
    op.order_index = order_index;
    op
}
