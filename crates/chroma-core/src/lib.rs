//! Chroma Core - Foundation types for the colour pipeline cache
//!
//! This crate provides the types shared by every Chroma crate:
//! - Frame identity (which frame of which source is being displayed)
//! - Colour-management parameters attached to sources
//! - Per-frame data consumed by the uniform update step

pub mod error;
pub mod frame;
pub mod params;

pub use error::{ChromaError, Result};
pub use frame::{FrameData, FrameIdentity, MediaHandle};
pub use params::ColourParams;

/// Default tuning values for playback.
pub mod defaults {
    /// Number of frames resolved ahead of the playhead.
    pub const LOOKAHEAD_FRAMES: usize = 8;

    /// Stream id used when a source has a single video stream.
    pub const PRIMARY_STREAM: u32 = 0;
}
