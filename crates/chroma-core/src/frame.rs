//! Frame identity types.
//!
//! A [`FrameIdentity`] names one displayable frame and carries the colour
//! metadata of its source. It is produced by the playhead layer and read by
//! the colour pipeline; it never owns pixel data.

use crate::params::ColourParams;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque handle to the media source that owns a frame.
///
/// The pipeline forwards it to plugins untouched; plugins that know the
/// concrete type can downcast it.
#[derive(Clone)]
pub struct MediaHandle(Arc<dyn Any + Send + Sync>);

impl MediaHandle {
    pub fn new<T: Any + Send + Sync>(handle: T) -> Self {
        Self(Arc::new(handle))
    }

    /// Downcast to the concrete handle type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MediaHandle(..)")
    }
}

/// One addressable video frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameIdentity {
    /// Source URI (file path or URL).
    pub uri: String,
    /// Unique id of the media source.
    pub source_id: Uuid,
    /// Video stream within the source.
    pub stream_id: u32,
    /// Frame number within the stream.
    pub frame: i64,
    /// Handle to the owning media source, if any.
    #[serde(skip)]
    pub media: Option<MediaHandle>,
    /// Colour-management metadata of the source.
    #[serde(default)]
    pub colour_params: ColourParams,
}

impl FrameIdentity {
    /// Frame 0 of the primary stream with empty colour params.
    pub fn new(uri: impl Into<String>, source_id: Uuid) -> Self {
        Self {
            uri: uri.into(),
            source_id,
            stream_id: crate::defaults::PRIMARY_STREAM,
            frame: 0,
            media: None,
            colour_params: ColourParams::new(),
        }
    }

    pub fn with_frame(mut self, frame: i64) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_stream(mut self, stream_id: u32) -> Self {
        self.stream_id = stream_id;
        self
    }

    pub fn with_colour_params(mut self, params: ColourParams) -> Self {
        self.colour_params = params;
        self
    }

    pub fn with_media(mut self, media: MediaHandle) -> Self {
        self.media = Some(media);
        self
    }

    /// The same source and colour metadata at another frame.
    pub fn at_frame(&self, frame: i64) -> Self {
        Self {
            frame,
            ..self.clone()
        }
    }

    /// The `count` frames following this one, for look-ahead requests.
    pub fn lookahead(&self, count: usize) -> Vec<Self> {
        (1..=count as i64).map(|i| self.at_frame(self.frame + i)).collect()
    }
}

/// Per-frame data handed to the uniform update step.
///
/// Unlike [`FrameIdentity`] this may change every frame without changing
/// which shaders and LUTs are needed (exposure, channel isolation, ...).
#[derive(Debug, Clone)]
pub struct FrameData {
    pub identity: FrameIdentity,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Dynamic per-frame values.
    pub dynamic: ColourParams,
}

impl FrameData {
    pub fn new(identity: FrameIdentity, width: u32, height: u32) -> Self {
        Self {
            identity,
            width,
            height,
            dynamic: ColourParams::new(),
        }
    }

    pub fn with_dynamic(mut self, dynamic: ColourParams) -> Self {
        self.dynamic = dynamic;
        self
    }
}
