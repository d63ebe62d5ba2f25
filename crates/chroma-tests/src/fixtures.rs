//! Instrumented stages and plugins shared by the integration tests.

use async_trait::async_trait;
use chroma_color::{OpOrigin, OperationData};
use chroma_core::{ColourParams, FrameData, FrameIdentity};
use chroma_pipeline::{
    CacheError, CachePriority, ColourPipeline, ColourStage, ColourState, MemoryCache, ResultCache,
    StageError,
};
use chroma_plugin::{ColourOpPlugin, OperationHandle, OperationRegistry, PluginError, Uniforms};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// ── Frames ─────────────────────────────────────────────────────

pub fn clip_frame(frame: i64) -> FrameIdentity {
    FrameIdentity::new("clip.mov", Uuid::from_u128(0xC11B))
        .with_frame(frame)
        .with_colour_params(ColourParams::new().with("display", "Rec709"))
}

pub fn rec709() -> ColourState {
    ColourState::new("Rec709", "Film")
}

// ── Stage ──────────────────────────────────────────────────────

pub const LINEARISE_ID: &str = "linearise:clip.mov";
pub const DISPLAY_ID: &str = "display:Rec709";

/// Stage with call counters and switchable failures.
#[derive(Default)]
pub struct CountingStage {
    pub delay: Duration,
    pub fail_linearise: AtomicBool,
    pub fail_display: AtomicBool,
    pub linearise_calls: AtomicUsize,
    pub display_calls: AtomicUsize,
}

impl CountingStage {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.linearise_calls.load(Ordering::SeqCst) + self.display_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ColourStage for CountingStage {
    fn name(&self) -> &str {
        "counting"
    }

    async fn linearise(
        &self,
        frame: &FrameIdentity,
        _state: &ColourState,
    ) -> Result<OperationData, StageError> {
        self.linearise_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail_linearise.load(Ordering::SeqCst) {
            return Err(StageError::UnknownColourSpace("unknown".into()));
        }
        Ok(OperationData::new(
            OpOrigin::Linearise,
            "linearise",
            format!("linearise:{}", frame.uri),
        ))
    }

    async fn to_display(
        &self,
        _frame: &FrameIdentity,
        state: &ColourState,
    ) -> Result<OperationData, StageError> {
        self.display_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_display.load(Ordering::SeqCst) {
            return Err(StageError::InvalidConfig("no display".into()));
        }
        tokio::time::sleep(self.delay).await;
        Ok(OperationData::new(
            OpOrigin::Display,
            "display",
            format!("display:{}", state.display),
        ))
    }

    fn update_uniforms(&self, op: &OperationData, frame: &FrameData) -> Uniforms {
        match op.origin {
            OpOrigin::Linearise => {
                Uniforms::new().with("exposure", frame.dynamic.value_or("exposure", 0.0f64))
            }
            _ => Uniforms::new().with("display", op.cache_id.clone()),
        }
    }
}

// ── Plugins ────────────────────────────────────────────────────

pub enum Behaviour {
    Succeed,
    Fail,
    Hang,
}

/// Plugin with a fixed ordering index, a completion delay and a call counter.
pub struct TestPlugin {
    pub id: Uuid,
    pub name: String,
    pub order: f32,
    pub delay: Duration,
    pub behaviour: Behaviour,
    pub calls: AtomicUsize,
}

impl TestPlugin {
    pub fn new(name: &str, order: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            order,
            delay: Duration::ZERO,
            behaviour: Behaviour::Succeed,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.behaviour = Behaviour::Fail;
        self
    }

    pub fn hanging(mut self) -> Self {
        self.behaviour = Behaviour::Hang;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ColourOpPlugin for TestPlugin {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn request_data(&self, _frame: &FrameIdentity) -> Result<OperationData, PluginError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match self.behaviour {
            Behaviour::Succeed => Ok(OperationData::new(
                OpOrigin::Plugin(self.id),
                self.name.clone(),
                format!("plugin:{}", self.name),
            )
            .with_order_index(self.order)
            .with_user_data(self.order)),
            Behaviour::Fail => Err(PluginError::request(self.name.clone(), "corrupt LUT")),
            Behaviour::Hang => std::future::pending().await,
        }
    }

    fn update_uniforms(&self, op: &OperationData, _frame: &FrameData) -> Uniforms {
        let order = op.user_data_as::<f32>().copied().unwrap_or_default();
        Uniforms::new().with(format!("{}_order", self.name), order)
    }
}

pub fn handles(plugins: &[Arc<TestPlugin>]) -> Vec<OperationHandle> {
    plugins
        .iter()
        .map(|p| p.clone() as OperationHandle)
        .collect()
}

// ── Cache ──────────────────────────────────────────────────────

/// Result cache whose contents can be dropped, like an evicting backend.
#[derive(Default)]
pub struct ForgetfulCache {
    entries: Mutex<HashMap<String, Arc<OperationData>>>,
}

impl ForgetfulCache {
    pub fn forget_all(&self) {
        self.entries.lock().clear();
    }
}

#[async_trait]
impl ResultCache for ForgetfulCache {
    async fn get(&self, cache_id: &str) -> Result<Option<Arc<OperationData>>, CacheError> {
        Ok(self.entries.lock().get(cache_id).cloned())
    }

    async fn put(
        &self,
        cache_id: &str,
        data: Arc<OperationData>,
        _priority: CachePriority,
    ) -> Result<(), CacheError> {
        self.entries
            .lock()
            .entry(cache_id.to_string())
            .or_insert(data);
        Ok(())
    }
}

// ── Pipeline ───────────────────────────────────────────────────

pub struct Harness {
    pub pipeline: ColourPipeline,
    pub stage: Arc<CountingStage>,
    pub cache: Arc<MemoryCache>,
}

pub fn harness(stage: CountingStage, plugins: &[Arc<TestPlugin>]) -> Harness {
    let stage = Arc::new(stage);
    let cache = Arc::new(MemoryCache::new());
    let pipeline = ColourPipeline::builder(stage.clone())
        .registry(Arc::new(OperationRegistry::with_plugins(handles(plugins))))
        .cache(cache.clone())
        .colour_state(rec709())
        .build();
    Harness {
        pipeline,
        stage,
        cache,
    }
}
