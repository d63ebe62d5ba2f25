//! Chroma Pipeline — coalescing, cached colour transform resolution.
//!
//! [`ColourPipeline`] is the entry point for the viewport layer: it turns a
//! frame into the ordered shader and LUT chain needed to display it,
//! computing each distinct transform once no matter how many draw and
//! look-ahead requests ask for it.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod key;
pub mod stage;
pub mod uniforms;

#[cfg(test)]
mod test_util;

pub use cache::{CachePriority, CacheStats, MemoryCache, ResultCache};
pub use config::PipelineConfig;
pub use coordinator::RequestCoordinator;
pub use error::{CacheError, PipelineError};
pub use executor::PipelineStageExecutor;
pub use key::{compute_key, ColourState, TransformKey};
pub use stage::{ColourStage, StageError};

use chroma_color::PipelineResult;
use chroma_core::{FrameData, FrameIdentity};
use chroma_plugin::{CompositeHook, HookAggregator, OperationRegistry, Uniforms};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Colour pipeline for one viewer.
pub struct ColourPipeline {
    coordinator: RequestCoordinator,
    hooks: HookAggregator,
    state: RwLock<ColourState>,
    config: PipelineConfig,
}

/// Builder for [`ColourPipeline`].
pub struct ColourPipelineBuilder {
    stage: Arc<dyn ColourStage>,
    registry: Option<Arc<OperationRegistry>>,
    cache: Option<Arc<dyn ResultCache>>,
    config: PipelineConfig,
    state: ColourState,
}

impl ColourPipelineBuilder {
    /// Plugins to run between linearise and display. Defaults to none.
    pub fn registry(mut self, registry: Arc<OperationRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Result cache. Defaults to a fresh [`MemoryCache`].
    pub fn cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn colour_state(mut self, state: ColourState) -> Self {
        self.state = state;
        self
    }

    pub fn build(self) -> ColourPipeline {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(OperationRegistry::empty()));
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new()) as Arc<dyn ResultCache>);
        let executor = Arc::new(PipelineStageExecutor::new(self.stage, registry.clone()));
        info!(
            stage = executor.stage().name(),
            lookahead = self.config.lookahead_frames,
            "colour pipeline created"
        );
        ColourPipeline {
            coordinator: RequestCoordinator::new(executor, cache, &self.config),
            hooks: HookAggregator::new(registry),
            state: RwLock::new(self.state),
            config: self.config,
        }
    }
}

impl ColourPipeline {
    pub fn builder(stage: Arc<dyn ColourStage>) -> ColourPipelineBuilder {
        ColourPipelineBuilder {
            stage,
            registry: None,
            cache: None,
            config: PipelineConfig::default(),
            state: ColourState::default(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &RequestCoordinator {
        &self.coordinator
    }

    pub fn registry(&self) -> &Arc<OperationRegistry> {
        self.coordinator.executor().registry()
    }

    pub fn colour_state(&self) -> ColourState {
        self.state.read().clone()
    }

    /// Change display, view or other viewer state. Later resolves use the
    /// new state; results for the old state stay cached.
    ///
    /// Every distinct state resolved adds a remembered key to the
    /// coordinator, and those are never dropped on their own. Callers that
    /// sweep through many states, such as a grading slider being dragged,
    /// should call [`clear_shortcuts`](Self::clear_shortcuts) once the
    /// sweep settles.
    pub fn set_colour_state(&self, state: ColourState) {
        info!(display = %state.display, view = %state.view, "colour state changed");
        *self.state.write() = state;
    }

    /// Forget all remembered transform keys. See
    /// [`RequestCoordinator::clear_shortcuts`].
    pub fn clear_shortcuts(&self) -> usize {
        self.coordinator.clear_shortcuts()
    }

    /// Transform key of `frame` under the current colour state.
    pub fn key_for(&self, frame: &FrameIdentity) -> TransformKey {
        compute_key(frame, &self.state.read())
    }

    /// Resolve the colour transform for `frame`.
    pub async fn resolve(&self, frame: &FrameIdentity) -> Result<PipelineResult, PipelineError> {
        let state = self.colour_state();
        self.coordinator.resolve(frame, &state).await
    }

    /// Resolve several frames at once, results in input order.
    pub async fn resolve_many(
        &self,
        frames: &[FrameIdentity],
    ) -> Result<Vec<PipelineResult>, PipelineError> {
        let state = self.colour_state();
        self.coordinator.resolve_many(frames, &state).await
    }

    /// Start resolving the configured number of frames after `frame`.
    pub fn prefetch(&self, frame: &FrameIdentity) -> JoinHandle<()> {
        self.coordinator
            .prefetch(frame.lookahead(self.config.lookahead_frames), self.colour_state())
    }

    /// Composite pre-draw hook of all plugins for one viewer.
    pub async fn build_hook(&self, viewer_index: usize) -> Result<CompositeHook, PipelineError> {
        Ok(self.hooks.build_hook(viewer_index).await?)
    }

    /// Dynamic uniforms for drawing `frame` with an already resolved result.
    pub async fn update_uniforms(
        &self,
        result: &PipelineResult,
        frame: &FrameData,
    ) -> Result<Uniforms, PipelineError> {
        uniforms::update_uniforms(
            self.coordinator.executor(),
            result,
            frame,
            self.config.gather_plugin_uniforms,
        )
        .await
    }
}
