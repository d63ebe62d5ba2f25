//! Colour-operation plugin manager.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use tracing::{debug, info};

use crate::colour_op::ColourOpPlugin;
use crate::error::PluginError;

/// Creates colour-operation plugin instances.
#[async_trait]
pub trait ColourOpFactory: Send + Sync {
    /// Name of the plugin this factory creates.
    fn name(&self) -> &str;

    /// Create one plugin instance. May be slow (shader compilation, LUT
    /// baking, config parsing).
    async fn spawn(&self) -> Result<Arc<dyn ColourOpPlugin>, PluginError>;
}

/// Factory for an instance that already exists.
struct InstanceFactory(Arc<dyn ColourOpPlugin>);

#[async_trait]
impl ColourOpFactory for InstanceFactory {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn spawn(&self) -> Result<Arc<dyn ColourOpPlugin>, PluginError> {
        Ok(self.0.clone())
    }
}

/// Registered colour-operation plugin factories.
pub struct PluginManager {
    factories: Vec<Arc<dyn ColourOpFactory>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Register a factory. Plugins are spawned in registration order.
    pub fn register(&mut self, factory: Arc<dyn ColourOpFactory>) {
        debug!(plugin = factory.name(), "registered colour op factory");
        self.factories.push(factory);
    }

    /// Register a ready-made plugin instance.
    pub fn register_instance(&mut self, plugin: Arc<dyn ColourOpPlugin>) {
        self.register(Arc::new(InstanceFactory(plugin)));
    }

    /// Get all plugin names.
    pub fn plugin_names(&self) -> Vec<String> {
        self.factories.iter().map(|f| f.name().to_string()).collect()
    }

    /// Total number of plugins.
    pub fn plugin_count(&self) -> usize {
        self.factories.len()
    }

    /// Spawn one instance of every registered plugin, concurrently. Fails if
    /// any plugin fails to spawn; a partial set would silently change what
    /// the pipeline renders.
    pub async fn spawn_colour_ops(&self) -> Result<Vec<Arc<dyn ColourOpPlugin>>, PluginError> {
        let plugins = try_join_all(self.factories.iter().map(|factory| async move {
            factory.spawn().await.map_err(|e| match e {
                PluginError::Loading(_) => e,
                other => PluginError::Loading(format!("{}: {other}", factory.name())),
            })
        }))
        .await?;
        info!(count = plugins.len(), "spawned colour op plugins");
        Ok(plugins)
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}
