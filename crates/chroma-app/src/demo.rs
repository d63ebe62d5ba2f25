//! Demo colour stage and grading plugin used by the playback simulation.

use async_trait::async_trait;
use chroma_color::{ColourLut, CubeFile, LutDescriptor, OpOrigin, OperationData};
use chroma_core::{FrameData, FrameIdentity};
use chroma_pipeline::{ColourStage, ColourState, StageError};
use chroma_plugin::{ColourOpFactory, ColourOpPlugin, PluginError, PreDrawHook, Uniforms};
use glam::Mat4;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use uuid::Uuid;

const LUT_SIZE: u32 = 1024;

const LINEARISE_SHADER: &str = r#"
uniform sampler1D linearise_lut;
uniform float exposure;

vec4 linearise(vec4 rgba) {
    vec3 c = vec3(
        texture(linearise_lut, rgba.r).r,
        texture(linearise_lut, rgba.g).g,
        texture(linearise_lut, rgba.b).b);
    return vec4(c * exp2(exposure), rgba.a);
}
"#;

const DISPLAY_SHADER: &str = r#"
uniform sampler1D display_lut;

vec4 to_display(vec4 rgba) {
    vec3 c = clamp(rgba.rgb, 0.0, 1.0);
    return vec4(
        texture(display_lut, c.r).r,
        texture(display_lut, c.g).g,
        texture(display_lut, c.b).b,
        rgba.a);
}
"#;

const GRADE_SHADER: &str = r#"
uniform vec3 rgb_factor;

vec4 colour_transform_op(vec4 rgba) {
    return vec4(rgba.rgb * rgb_factor, rgba.a);
}
"#;

/// Decoding gamma of a named source colour space.
fn source_gamma(colourspace: &str) -> Result<f32, StageError> {
    match colourspace {
        "linear" | "ACEScg" => Ok(1.0),
        "sRGB" => Ok(2.2),
        "Rec709" => Ok(2.4),
        "Gamma2.6" => Ok(2.6),
        other => Err(StageError::UnknownColourSpace(other.to_string())),
    }
}

/// Encoding gamma of a named display.
fn display_gamma(display: &str) -> Result<f32, StageError> {
    match display {
        "" | "sRGB" => Ok(2.2),
        "Rec709" => Ok(2.4),
        "P3-D65" | "DCI-P3" => Ok(2.6),
        other => Err(StageError::InvalidConfig(format!("unknown display {other}"))),
    }
}

fn gamma_lut(name: &str, exponent: f32) -> Result<ColourLut, StageError> {
    let n = LUT_SIZE as usize;
    let samples: Vec<f32> = (0..n)
        .flat_map(|i| {
            let v = (i as f32 / (n - 1) as f32).powf(exponent);
            [v, v, v]
        })
        .collect();
    Ok(ColourLut::from_f32(
        LutDescriptor::one_d(LUT_SIZE),
        name,
        &samples,
    )?)
}

/// Uniform values the display op carries to the per-frame update.
#[derive(Debug, Clone, Copy)]
struct DisplayInfo {
    gamma: f32,
}

/// Gamma-based linearise and display stage, optionally with a `.cube` look
/// applied before the display curve.
pub struct DemoStage {
    look: Option<Arc<CubeFile>>,
}

impl DemoStage {
    pub fn new() -> Self {
        Self { look: None }
    }

    pub fn with_look(mut self, look: CubeFile) -> Self {
        self.look = Some(Arc::new(look));
        self
    }
}

impl Default for DemoStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ColourStage for DemoStage {
    fn name(&self) -> &str {
        "demo-gamma"
    }

    async fn linearise(
        &self,
        frame: &FrameIdentity,
        _state: &ColourState,
    ) -> Result<OperationData, StageError> {
        let colourspace: String = frame.colour_params.value_or("colourspace", "sRGB".to_string());
        let gamma = source_gamma(&colourspace)?;
        // LUT baking runs on the blocking pool.
        let lut = tokio::task::spawn_blocking(move || gamma_lut("linearise_lut", gamma))
            .await
            .map_err(|e| StageError::ProcessingFailed(e.to_string()))??;
        debug!(%colourspace, gamma, "baked linearise LUT");
        Ok(OperationData::new(OpOrigin::Linearise, "linearise", "")
            .with_shader(LINEARISE_SHADER)
            .with_lut(lut)
            .with_content_cache_id())
    }

    async fn to_display(
        &self,
        _frame: &FrameIdentity,
        state: &ColourState,
    ) -> Result<OperationData, StageError> {
        let gamma = display_gamma(&state.display)?;
        let lut = tokio::task::spawn_blocking(move || gamma_lut("display_lut", 1.0 / gamma))
            .await
            .map_err(|e| StageError::ProcessingFailed(e.to_string()))??;
        let mut op = OperationData::new(OpOrigin::Display, "display", "")
            .with_shader(DISPLAY_SHADER)
            .with_lut(lut)
            .with_user_data(DisplayInfo { gamma });
        if let Some(look) = &self.look {
            op = op.with_lut(look.lut.clone());
        }
        Ok(op.with_content_cache_id())
    }

    fn update_uniforms(&self, op: &OperationData, frame: &FrameData) -> Uniforms {
        match op.origin {
            OpOrigin::Linearise => {
                Uniforms::new().with("exposure", frame.dynamic.value_or("exposure", 0.0f64))
            }
            _ => match op.user_data_as::<DisplayInfo>() {
                Some(info) => Uniforms::new().with("display_gamma", info.gamma),
                None => Uniforms::new(),
            },
        }
    }
}

/// Counts draws for one viewer.
pub struct DrawCounter {
    viewer_index: usize,
    draws: AtomicU64,
}

impl DrawCounter {
    pub fn draws(&self) -> u64 {
        self.draws.load(Ordering::Relaxed)
    }
}

impl PreDrawHook for DrawCounter {
    fn invoke(&self, _: &Mat4, viewport_to_image: &Mat4, du_dpixel: f32, frame: &FrameData) {
        self.draws.fetch_add(1, Ordering::Relaxed);
        trace!(
            viewer = self.viewer_index,
            frame = frame.identity.frame,
            du_dpixel,
            scale = viewport_to_image.x_axis.x,
            "pre-draw"
        );
    }
}

/// RGB multiplier applied in linear space.
pub struct GradePlugin {
    id: Uuid,
    counter: Arc<DrawCounter>,
}

impl GradePlugin {
    pub const ORDER_INDEX: f32 = -100.0;
}

#[async_trait]
impl ColourOpPlugin for GradePlugin {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        "rgb-grade"
    }

    async fn request_data(&self, _frame: &FrameIdentity) -> Result<OperationData, PluginError> {
        Ok(OperationData::new(OpOrigin::Plugin(self.id), "rgb-grade", "")
            .with_order_index(Self::ORDER_INDEX)
            .with_shader(GRADE_SHADER)
            .with_content_cache_id())
    }

    async fn pre_draw_hook(
        &self,
        viewer_index: usize,
    ) -> Result<Option<Arc<dyn PreDrawHook>>, PluginError> {
        if viewer_index == self.counter.viewer_index {
            let hook: Arc<dyn PreDrawHook> = self.counter.clone();
            Ok(Some(hook))
        } else {
            Ok(None)
        }
    }

    fn update_uniforms(&self, _op: &OperationData, frame: &FrameData) -> Uniforms {
        let factor = frame
            .dynamic
            .pointer("/grade/rgb_factor")
            .cloned()
            .unwrap_or_else(|| json!([1.0, 1.0, 1.0]));
        Uniforms::new().with("rgb_factor", factor)
    }
}

/// Spawns [`GradePlugin`] after a simulated start-up delay.
pub struct GradeFactory {
    pub startup: Duration,
    pub counter: Arc<DrawCounter>,
}

impl GradeFactory {
    pub fn new(startup: Duration) -> Self {
        Self {
            startup,
            counter: Arc::new(DrawCounter {
                viewer_index: 0,
                draws: AtomicU64::new(0),
            }),
        }
    }
}

#[async_trait]
impl ColourOpFactory for GradeFactory {
    fn name(&self) -> &str {
        "rgb-grade"
    }

    async fn spawn(&self) -> Result<Arc<dyn ColourOpPlugin>, PluginError> {
        tokio::time::sleep(self.startup).await;
        Ok(Arc::new(GradePlugin {
            id: Uuid::new_v4(),
            counter: self.counter.clone(),
        }))
    }
}
