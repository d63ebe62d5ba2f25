//! Stages and plugins shared by the unit tests.

use crate::key::ColourState;
use crate::stage::{ColourStage, StageError};
use async_trait::async_trait;
use chroma_color::{OpOrigin, OperationData};
use chroma_core::{ColourParams, FrameData, FrameIdentity};
use chroma_plugin::{ColourOpPlugin, OperationHandle, PluginError, Uniforms};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub fn clip() -> FrameIdentity {
    FrameIdentity::new("clip.mov", Uuid::nil())
        .with_frame(10)
        .with_colour_params(ColourParams::new().with("display", "Rec709"))
}

#[derive(Default)]
pub struct TestStage {
    delay: Option<Duration>,
    fail_linearise: bool,
    fail_display: bool,
    bogus_order: bool,
    linearise_calls: AtomicUsize,
}

impl TestStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_linearise(mut self) -> Self {
        self.fail_linearise = true;
        self
    }

    pub fn failing_display(mut self) -> Self {
        self.fail_display = true;
        self
    }

    pub fn with_bogus_order(mut self) -> Self {
        self.bogus_order = true;
        self
    }

    pub fn linearise_calls(&self) -> usize {
        self.linearise_calls.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ColourStage for TestStage {
    fn name(&self) -> &str {
        "test"
    }

    async fn linearise(
        &self,
        frame: &FrameIdentity,
        _state: &ColourState,
    ) -> Result<OperationData, StageError> {
        self.linearise_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        if self.fail_linearise {
            return Err(StageError::UnknownColourSpace("mystery".into()));
        }
        let order = if self.bogus_order { 1e9 } else { 0.0 };
        Ok(
            OperationData::new(OpOrigin::Display, "linearise", format!("linearise:{}", frame.uri))
                .with_order_index(order),
        )
    }

    async fn to_display(
        &self,
        _frame: &FrameIdentity,
        state: &ColourState,
    ) -> Result<OperationData, StageError> {
        if self.fail_display {
            return Err(StageError::ProcessingFailed("no display".into()));
        }
        self.wait().await;
        let order = if self.bogus_order { -1e9 } else { 0.0 };
        Ok(OperationData::new(
            OpOrigin::Linearise,
            "display",
            format!("display:{}:{}", state.display, state.view),
        )
        .with_order_index(order))
    }

    fn update_uniforms(&self, op: &OperationData, frame: &FrameData) -> Uniforms {
        let mut uniforms = Uniforms::new().with("last_stage", op.name.clone());
        if let Some(exposure) = frame.dynamic.get("exposure") {
            uniforms.insert("exposure", exposure.clone());
        }
        uniforms
    }
}

pub struct StaticPlugin {
    id: Uuid,
    name: String,
    order: f32,
}

impl StaticPlugin {
    pub fn handle(name: &str, order: f32) -> OperationHandle {
        Arc::new(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            order,
        })
    }
}

#[async_trait]
impl ColourOpPlugin for StaticPlugin {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn request_data(&self, _frame: &FrameIdentity) -> Result<OperationData, PluginError> {
        Ok(
            OperationData::new(OpOrigin::Plugin(self.id), self.name.clone(), format!("plugin:{}", self.name))
                .with_order_index(self.order),
        )
    }

    fn update_uniforms(&self, op: &OperationData, _frame: &FrameData) -> Uniforms {
        Uniforms::new().with(format!("{}_order", self.name), op.order_index)
    }
}

/// Never produces its data.
pub struct PendingPlugin;

impl PendingPlugin {
    pub fn handle() -> OperationHandle {
        Arc::new(Self)
    }
}

#[async_trait]
impl ColourOpPlugin for PendingPlugin {
    fn id(&self) -> Uuid {
        Uuid::nil()
    }

    fn name(&self) -> &str {
        "pending"
    }

    async fn request_data(&self, _frame: &FrameIdentity) -> Result<OperationData, PluginError> {
        std::future::pending().await
    }
}

pub struct FailingPlugin;

impl FailingPlugin {
    pub fn handle() -> OperationHandle {
        Arc::new(Self)
    }
}

#[async_trait]
impl ColourOpPlugin for FailingPlugin {
    fn id(&self) -> Uuid {
        Uuid::from_u128(1)
    }

    fn name(&self) -> &str {
        "failing"
    }

    async fn request_data(&self, _frame: &FrameIdentity) -> Result<OperationData, PluginError> {
        Err(PluginError::request("failing", "bad LUT"))
    }
}
