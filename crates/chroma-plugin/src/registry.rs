//! The set of loaded colour-operation plugins.
//!
//! Plugins are spawned asynchronously, so the registry starts out in a
//! loading state. Anything that needs the plugin list while loading is
//! queued and answered exactly once when loading completes.

use crate::colour_op::ColourOpPlugin;
use crate::error::PluginError;
use crate::plugin_manager::PluginManager;
use chroma_color::{OpOrigin, OperationData};
use chroma_core::FrameIdentity;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type OperationHandle = Arc<dyn ColourOpPlugin>;

type PluginList = Arc<[OperationHandle]>;
type Waiter = oneshot::Sender<Result<PluginList, PluginError>>;

enum LoadState {
    Loading(Vec<Waiter>),
    Loaded(PluginList),
    Failed(PluginError),
}

/// Loaded colour-operation plugins, in registration order.
pub struct OperationRegistry {
    state: Mutex<LoadState>,
}

impl OperationRegistry {
    /// A registry whose plugins are still being spawned.
    pub fn loading() -> Self {
        Self {
            state: Mutex::new(LoadState::Loading(Vec::new())),
        }
    }

    /// A registry that is already loaded with `plugins`.
    pub fn with_plugins(plugins: Vec<OperationHandle>) -> Self {
        Self {
            state: Mutex::new(LoadState::Loaded(plugins.into())),
        }
    }

    /// Loaded, with no plugins: the pipeline is just linearise and display.
    pub fn empty() -> Self {
        Self::with_plugins(Vec::new())
    }

    /// Spawn every plugin the manager knows about in the background and
    /// finish loading when they are all up.
    pub fn spawn_load(manager: Arc<PluginManager>) -> (Arc<Self>, JoinHandle<()>) {
        let registry = Arc::new(Self::loading());
        let loader = registry.clone();
        let handle = tokio::spawn(async move {
            let result = manager.spawn_colour_ops().await;
            loader.complete_loading(result);
        });
        (registry, handle)
    }

    /// Finish loading and flush every queued request. Only the first call
    /// has an effect.
    pub fn complete_loading(&self, result: Result<Vec<OperationHandle>, PluginError>) {
        let waiters = {
            let mut state = self.state.lock();
            let LoadState::Loading(waiters) = &mut *state else {
                warn!("plugin loading completed twice, ignoring");
                return;
            };
            let waiters = std::mem::take(waiters);
            *state = match &result {
                Ok(plugins) => LoadState::Loaded(plugins.clone().into()),
                Err(e) => LoadState::Failed(e.clone()),
            };
            waiters
        };

        match &result {
            Ok(plugins) => info!(
                plugins = plugins.len(),
                queued = waiters.len(),
                "colour operation plugins loaded"
            ),
            Err(e) => warn!(error = %e, queued = waiters.len(), "colour operation plugins failed to load"),
        }

        let reply = result.map(PluginList::from);
        for waiter in waiters {
            // A dropped receiver just means the caller gave up.
            let _ = waiter.send(reply.clone());
        }
    }

    pub fn is_loaded(&self) -> bool {
        !matches!(*self.state.lock(), LoadState::Loading(_))
    }

    /// All plugins, waiting for loading to finish if needed.
    pub async fn list(&self) -> Result<PluginList, PluginError> {
        let rx = {
            let mut state = self.state.lock();
            match &mut *state {
                LoadState::Loaded(plugins) => return Ok(plugins.clone()),
                LoadState::Failed(e) => return Err(e.clone()),
                LoadState::Loading(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    debug!(queued = waiters.len(), "plugin list requested while loading");
                    rx
                }
            }
        };
        rx.await.map_err(|_| PluginError::Abandoned)?
    }

    /// Look up a loaded plugin by id.
    pub async fn plugin(&self, id: Uuid) -> Result<OperationHandle, PluginError> {
        self.list()
            .await?
            .iter()
            .find(|p| p.id() == id)
            .cloned()
            .ok_or_else(|| PluginError::NotFound(id.to_string()))
    }

    /// Ask one plugin for its operation on `frame`. The origin is stamped
    /// with the plugin's id whatever the plugin filled in.
    ///
    /// Plugin ordering indices must be finite: the infinities belong to the
    /// linearise and display stages.
    pub async fn request_data(
        &self,
        handle: &OperationHandle,
        frame: &FrameIdentity,
    ) -> Result<Arc<OperationData>, PluginError> {
        let mut op = handle.request_data(frame).await?;
        if !op.order_index.is_finite() {
            return Err(PluginError::Invalid(format!(
                "{} reported ordering index {}",
                handle.name(),
                op.order_index
            )));
        }
        op.origin = OpOrigin::Plugin(handle.id());
        debug!(plugin = handle.name(), cache_id = %op.cache_id, "plugin operation ready");
        Ok(Arc::new(op))
    }
}

impl Drop for OperationRegistry {
    fn drop(&mut self) {
        if let LoadState::Loading(waiters) = &*self.state.get_mut() {
            if !waiters.is_empty() {
                warn!(queued = waiters.len(), "plugin registry dropped while loading");
            }
        }
    }
}
