//! Request coalescing in front of the pipeline executor.
//!
//! For each transform key at most one computation runs at a time. Callers
//! that arrive while it runs wait for its result instead of starting their
//! own. Completed keys remember the cache ids of their operations so later
//! requests can be answered from the result cache alone.

use crate::cache::{CachePriority, ResultCache};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::executor::PipelineStageExecutor;
use crate::key::{compute_key, ColourState, TransformKey};
use chroma_color::{OpOrigin, OperationData, PipelineResult};
use chroma_core::FrameIdentity;
use futures_util::future::{join_all, try_join_all};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

type Delivery = Result<PipelineResult, PipelineError>;
/// Linearise, display and a handful of plugins fit inline.
type CacheIds = SmallVec<[String; 4]>;

#[derive(Default)]
struct Shared {
    in_flight: HashMap<TransformKey, Vec<oneshot::Sender<Delivery>>>,
    /// One entry per key ever resolved. Only `clear_shortcuts` shrinks it.
    shortcuts: HashMap<TransformKey, CacheIds>,
}

#[derive(Debug, Clone, Copy)]
struct Priorities {
    linearise: CachePriority,
    display: CachePriority,
    plugin: CachePriority,
}

impl Priorities {
    fn for_op(&self, op: &OperationData) -> CachePriority {
        match op.origin {
            OpOrigin::Linearise => self.linearise,
            OpOrigin::Display => self.display,
            OpOrigin::Plugin(_) => self.plugin,
        }
    }
}

/// Coalesces concurrent resolves per transform key.
///
/// Cloning is cheap and every clone shares the same in-flight and shortcut
/// state.
#[derive(Clone)]
pub struct RequestCoordinator {
    executor: Arc<PipelineStageExecutor>,
    cache: Arc<dyn ResultCache>,
    shared: Arc<Mutex<Shared>>,
    priorities: Priorities,
}

/// Clears the key's waiters if the computing task ends without delivering,
/// e.g. on panic or runtime shutdown.
struct InFlightGuard {
    key: TransformKey,
    shared: Arc<Mutex<Shared>>,
    armed: bool,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let waiters = self.shared.lock().in_flight.remove(&self.key).unwrap_or_default();
        warn!(key = %self.key, waiters = waiters.len(), "pipeline computation abandoned");
        let err = PipelineError::Abandoned(self.key.to_string());
        for waiter in waiters {
            let _ = waiter.send(Err(err.clone()));
        }
    }
}

impl RequestCoordinator {
    pub fn new(
        executor: Arc<PipelineStageExecutor>,
        cache: Arc<dyn ResultCache>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            executor,
            cache,
            shared: Arc::new(Mutex::new(Shared::default())),
            priorities: Priorities {
                linearise: config.linearise_priority,
                display: config.display_priority,
                plugin: config.plugin_priority,
            },
        }
    }

    pub fn executor(&self) -> &Arc<PipelineStageExecutor> {
        &self.executor
    }

    /// Keys with a computation currently running.
    pub fn in_flight(&self) -> usize {
        self.shared.lock().in_flight.len()
    }

    /// Keys whose operation ids are remembered.
    pub fn shortcuts(&self) -> usize {
        self.shared.lock().shortcuts.len()
    }

    /// Forget every remembered key and return how many there were. The
    /// operations stay in the result cache; the next resolve of each key
    /// recomputes and records it again.
    pub fn clear_shortcuts(&self) -> usize {
        let mut shared = self.shared.lock();
        let count = shared.shortcuts.len();
        shared.shortcuts.clear();
        debug!(count, "cleared pipeline shortcuts");
        count
    }

    /// Resolve the pipeline for `frame` under `state`.
    pub async fn resolve(
        &self,
        frame: &FrameIdentity,
        state: &ColourState,
    ) -> Result<PipelineResult, PipelineError> {
        let key = compute_key(frame, state);

        if let Some(result) = self.try_shortcut(&key).await {
            trace!(key = %key, "resolved from cache");
            return Ok(result);
        }

        let (tx, rx) = oneshot::channel();
        let start = {
            let mut shared = self.shared.lock();
            match shared.in_flight.entry(key.clone()) {
                Entry::Occupied(mut waiters) => {
                    waiters.get_mut().push(tx);
                    debug!(key = %key, waiters = waiters.get().len(), "joined in-flight computation");
                    false
                }
                Entry::Vacant(slot) => {
                    slot.insert(vec![tx]);
                    true
                }
            }
        };

        if start {
            debug!(key = %key, uri = %frame.uri, "starting pipeline computation");
            self.spawn_computation(key.clone(), frame.clone(), state.clone());
        }

        rx.await
            .map_err(|_| PipelineError::Abandoned(key.to_string()))?
    }

    /// Resolve several frames concurrently. Results come back in input
    /// order; any failure fails the batch.
    pub async fn resolve_many(
        &self,
        frames: &[FrameIdentity],
        state: &ColourState,
    ) -> Result<Vec<PipelineResult>, PipelineError> {
        try_join_all(frames.iter().map(|frame| self.resolve(frame, state))).await
    }

    /// Resolve `frames` in the background so later resolves hit the cache.
    /// Dropping the handle does not cancel the work.
    pub fn prefetch(&self, frames: Vec<FrameIdentity>, state: ColourState) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let count = frames.len();
            match coordinator.resolve_many(&frames, &state).await {
                Ok(_) => debug!(frames = count, "prefetch complete"),
                Err(e) => debug!(frames = count, error = %e, "prefetch failed"),
            }
        })
    }

    async fn try_shortcut(&self, key: &TransformKey) -> Option<PipelineResult> {
        let ids = self.shared.lock().shortcuts.get(key).cloned()?;
        let found = join_all(ids.iter().map(|id| self.cache.get(id))).await;

        let mut operations = Vec::with_capacity(found.len());
        for (id, entry) in ids.iter().zip(found) {
            match entry {
                Ok(Some(op)) => operations.push(op),
                Ok(None) => {
                    trace!(key = %key, cache_id = %id, "shortcut miss");
                    return None;
                }
                Err(e) => {
                    warn!(key = %key, cache_id = %id, error = %e, "result cache lookup failed");
                    return None;
                }
            }
        }
        Some(PipelineResult::compose(operations))
    }

    fn spawn_computation(&self, key: TransformKey, frame: FrameIdentity, state: ColourState) {
        let this = self.clone();
        tokio::spawn(async move {
            let mut guard = InFlightGuard {
                key: key.clone(),
                shared: this.shared.clone(),
                armed: true,
            };

            let result = this.executor.run(&frame, &state).await;
            if let Ok(result) = &result {
                this.store(result).await;
            }

            let waiters = {
                let mut shared = this.shared.lock();
                if let Ok(result) = &result {
                    shared
                        .shortcuts
                        .insert(key.clone(), result.constituent_cache_ids().into_iter().collect());
                }
                shared.in_flight.remove(&key).unwrap_or_default()
            };
            guard.armed = false;

            match &result {
                Ok(r) => debug!(key = %key, cache_id = %r.cache_id(), waiters = waiters.len(), "pipeline ready"),
                Err(e) => warn!(key = %key, error = %e, waiters = waiters.len(), "pipeline failed"),
            }
            for waiter in waiters {
                // Receivers of abandoned requests are gone; nothing to do.
                let _ = waiter.send(result.clone());
            }
        });
    }

    async fn store(&self, result: &PipelineResult) {
        let puts = result.operations().iter().map(|op| async move {
            let priority = self.priorities.for_op(op);
            if let Err(e) = self.cache.put(&op.cache_id, op.clone(), priority).await {
                warn!(cache_id = %op.cache_id, error = %e, "result cache store failed");
            }
        });
        join_all(puts).await;
    }
}
