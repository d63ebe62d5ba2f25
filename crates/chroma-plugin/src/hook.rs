//! GPU pre-draw hooks and their aggregation.

use crate::error::PluginError;
use crate::registry::OperationRegistry;
use chroma_core::FrameData;
use futures_util::future::try_join_all;
use glam::Mat4;
use std::sync::Arc;
use tracing::debug;

/// Called by the viewport right before it draws an image.
pub trait PreDrawHook: Send + Sync {
    fn invoke(
        &self,
        window_to_viewport: &Mat4,
        viewport_to_image: &Mat4,
        du_dpixel: f32,
        frame: &FrameData,
    );
}

/// Any number of plugin hooks behind a single hook.
#[derive(Clone, Default)]
pub struct CompositeHook {
    hooks: Vec<Arc<dyn PreDrawHook>>,
}

impl CompositeHook {
    pub fn new(hooks: Vec<Arc<dyn PreDrawHook>>) -> Self {
        Self { hooks }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl PreDrawHook for CompositeHook {
    fn invoke(
        &self,
        window_to_viewport: &Mat4,
        viewport_to_image: &Mat4,
        du_dpixel: f32,
        frame: &FrameData,
    ) {
        for hook in &self.hooks {
            hook.invoke(window_to_viewport, viewport_to_image, du_dpixel, frame);
        }
    }
}

impl std::fmt::Debug for CompositeHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeHook")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Collects pre-draw hooks from every loaded colour-operation plugin.
pub struct HookAggregator {
    registry: Arc<OperationRegistry>,
}

impl HookAggregator {
    pub fn new(registry: Arc<OperationRegistry>) -> Self {
        Self { registry }
    }

    /// Build the composite hook for one viewer. Waits for plugin loading if
    /// it is still in progress. Hooks run in plugin registration order.
    pub async fn build_hook(&self, viewer_index: usize) -> Result<CompositeHook, PluginError> {
        let plugins = self.registry.list().await?;
        let hooks = try_join_all(plugins.iter().map(|p| p.pre_draw_hook(viewer_index))).await?;
        let hooks: Vec<_> = hooks.into_iter().flatten().collect();
        debug!(viewer_index, hooks = hooks.len(), "built pre-draw hook");
        Ok(CompositeHook::new(hooks))
    }
}
