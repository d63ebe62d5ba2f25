//! Chroma Playback - colour pipeline playback simulation
//!
//! Plays a virtual clip through the colour pipeline the way a viewer would:
//! resolve the current frame, prefetch ahead of the playhead, update
//! uniforms and run pre-draw hooks every frame.
//!
//! Usage: chroma-playback [config.json] [look.cube]

mod demo;

use anyhow::{Context, Result};
use chroma_color::CubeFile;
use chroma_core::{ColourParams, FrameData, FrameIdentity};
use chroma_pipeline::{ColourPipeline, ColourState, MemoryCache, PipelineConfig};
use chroma_plugin::{OperationRegistry, PluginManager, PreDrawHook};
use demo::{DemoStage, GradeFactory};
use glam::Mat4;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

const CLIP_FRAMES: i64 = 96;
const FRAME_WIDTH: u32 = 1920;
const FRAME_HEIGHT: u32 = 1080;

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    Ok(config.with_env_overrides())
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1).map(PathBuf::from);
    let config_path = args.next();
    let look_path = args.next();

    let config = load_config(config_path.as_ref())?;

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Chroma playback starting...");

    let mut stage = DemoStage::new();
    if let Some(path) = &look_path {
        let look = CubeFile::load(path, "look_lut")
            .with_context(|| format!("loading look {}", path.display()))?;
        info!(title = ?look.title, three_d = look.is_three_d(), "loaded look");
        stage = stage.with_look(look);
    }

    // Plugins come up in the background while playback starts.
    let grade = Arc::new(GradeFactory::new(Duration::from_millis(150)));
    let draw_counter = grade.counter.clone();
    let mut manager = PluginManager::new();
    manager.register(grade);
    let (registry, loading) = OperationRegistry::spawn_load(Arc::new(manager));

    let cache = Arc::new(MemoryCache::new());
    let pipeline = ColourPipeline::builder(Arc::new(stage))
        .registry(registry.clone())
        .cache(cache.clone())
        .config(config)
        .colour_state(ColourState::new("Rec709", "Film"))
        .build();

    // Requested before the grade plugin is up; answered once loading ends.
    let hook = pipeline.build_hook(0).await?;
    loading.await?;
    info!(hooks = hook.len(), loaded = registry.is_loaded(), "viewer ready");

    let clip = FrameIdentity::new("clip.mov", Uuid::new_v4())
        .with_colour_params(ColourParams::new().with("colourspace", "Rec709"));

    let started = Instant::now();
    for frame_number in 0..CLIP_FRAMES {
        if frame_number == CLIP_FRAMES / 2 {
            pipeline.set_colour_state(ColourState::new("P3-D65", "Film"));
        }

        let frame = clip.at_frame(frame_number);
        pipeline.prefetch(&frame);

        let result = match pipeline.resolve(&frame).await {
            Ok(result) => result,
            Err(e) => {
                warn!(frame = frame_number, error = %e, "drawing without colour management");
                continue;
            }
        };

        let exposure = (frame_number as f64 / CLIP_FRAMES as f64) - 0.5;
        let data = FrameData::new(frame, FRAME_WIDTH, FRAME_HEIGHT).with_dynamic(
            ColourParams::new()
                .with("exposure", exposure)
                .with("grade", json!({"rgb_factor": [1.0, 0.95, 0.9]})),
        );
        let uniforms = pipeline.update_uniforms(&result, &data).await?;
        hook.invoke(&Mat4::IDENTITY, &Mat4::IDENTITY, 1.0, &data);

        if frame_number % 24 == 0 {
            info!(
                frame = frame_number,
                cache_id = %result.cache_id(),
                operations = result.len(),
                lut_bytes = result.size(),
                uniforms = uniforms.len(),
                "frame drawn"
            );
        }
    }

    let stats = cache.stats();
    info!(
        frames = CLIP_FRAMES,
        elapsed_ms = started.elapsed().as_millis() as u64,
        pipeline_runs = pipeline.coordinator().executor().runs(),
        cache_entries = stats.entries,
        cache_bytes = stats.bytes,
        hit_rate = stats.hit_rate(),
        draws = draw_counter.draws(),
        "playback finished"
    );

    Ok(())
}
