//! LUT descriptors and raw LUT buffers.
//!
//! The pipeline never evaluates LUTs; it only carries them from the stage
//! that built them to the GPU uploader. What matters here is the byte layout
//! and a content hash the texture cache can key on.

use crate::error::ColorError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage type of one LUT sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LutDataType {
    U8,
    U16,
    F16,
    #[default]
    F32,
}

impl LutDataType {
    /// Bytes per channel sample.
    pub fn sample_bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::F16 => 2,
            Self::F32 => 4,
        }
    }
}

/// Texture dimensionality of a LUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LutDimension {
    OneD,
    TwoD,
    ThreeD,
    /// 2D LUT addressed with unnormalized (rectangle) coordinates.
    RectTwoD,
}

/// Channel layout of a LUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LutChannels {
    Red,
    #[default]
    Rgb,
}

impl LutChannels {
    pub fn count(self) -> usize {
        match self {
            Self::Red => 1,
            Self::Rgb => 3,
        }
    }
}

/// Sampling mode the shader expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interpolation {
    Nearest,
    #[default]
    Linear,
}

/// Shape and format of a LUT texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LutDescriptor {
    pub data_type: LutDataType,
    pub dimension: LutDimension,
    pub channels: LutChannels,
    pub interpolation: Interpolation,
    pub x_size: u32,
    pub y_size: u32,
    pub z_size: u32,
}

impl LutDescriptor {
    fn with_shape(dimension: LutDimension, x_size: u32, y_size: u32, z_size: u32) -> Self {
        Self {
            data_type: LutDataType::default(),
            dimension,
            channels: LutChannels::default(),
            interpolation: Interpolation::default(),
            x_size,
            y_size,
            z_size,
        }
    }

    /// 1D LUT with `size` entries (f32, RGB, linear).
    pub fn one_d(size: u32) -> Self {
        Self::with_shape(LutDimension::OneD, size, 1, 1)
    }

    pub fn two_d(width: u32, height: u32) -> Self {
        Self::with_shape(LutDimension::TwoD, width, height, 1)
    }

    pub fn rect_two_d(width: u32, height: u32) -> Self {
        Self::with_shape(LutDimension::RectTwoD, width, height, 1)
    }

    /// Cubic 3D LUT, `size` entries per axis.
    pub fn three_d(size: u32) -> Self {
        Self::with_shape(LutDimension::ThreeD, size, size, size)
    }

    pub fn three_d_sized(width: u32, height: u32, depth: u32) -> Self {
        Self::with_shape(LutDimension::ThreeD, width, height, depth)
    }

    pub fn with_data_type(mut self, data_type: LutDataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_channels(mut self, channels: LutChannels) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Number of texels addressed by this descriptor.
    pub fn texel_count(&self) -> usize {
        let (x, y, z) = (
            self.x_size as usize,
            self.y_size as usize,
            self.z_size as usize,
        );
        match self.dimension {
            LutDimension::OneD => x,
            LutDimension::TwoD | LutDimension::RectTwoD => x * y,
            LutDimension::ThreeD => x * y * z,
        }
    }

    /// Total buffer size in bytes.
    pub fn data_size(&self) -> usize {
        self.texel_count() * self.channels.count() * self.data_type.sample_bytes()
    }

    /// Compact signature, e.g. `f32_3d_rgb_linear_33_33_33`.
    pub fn as_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LutDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data_type = match self.data_type {
            LutDataType::U8 => "u8",
            LutDataType::U16 => "u16",
            LutDataType::F16 => "f16",
            LutDataType::F32 => "f32",
        };
        let dimension = match self.dimension {
            LutDimension::OneD => "1d",
            LutDimension::TwoD => "2d",
            LutDimension::ThreeD => "3d",
            LutDimension::RectTwoD => "rect2d",
        };
        let channels = match self.channels {
            LutChannels::Red => "red",
            LutChannels::Rgb => "rgb",
        };
        let interpolation = match self.interpolation {
            Interpolation::Nearest => "nearest",
            Interpolation::Linear => "linear",
        };
        write!(
            f,
            "{data_type}_{dimension}_{channels}_{interpolation}_{}_{}_{}",
            self.x_size, self.y_size, self.z_size
        )
    }
}

/// A LUT texture: descriptor, sampler name and raw bytes.
#[derive(Debug, Clone)]
pub struct ColourLut {
    descriptor: LutDescriptor,
    texture_name: String,
    buffer: Vec<u8>,
    cache_id: String,
}

impl ColourLut {
    /// Allocate a zeroed LUT of the size the descriptor requires.
    pub fn new(descriptor: LutDescriptor, texture_name: impl Into<String>) -> Self {
        let mut lut = Self {
            descriptor,
            texture_name: texture_name.into(),
            buffer: vec![0u8; descriptor.data_size()],
            cache_id: String::new(),
        };
        lut.update_content_hash();
        lut
    }

    /// Build a float LUT from interleaved samples.
    pub fn from_f32(
        descriptor: LutDescriptor,
        texture_name: impl Into<String>,
        samples: &[f32],
    ) -> Result<Self, ColorError> {
        let mut lut = Self::new(descriptor, texture_name);
        lut.write_f32(samples)?;
        Ok(lut)
    }

    pub fn descriptor(&self) -> &LutDescriptor {
        &self.descriptor
    }

    pub fn texture_name(&self) -> &str {
        &self.texture_name
    }

    /// Sampler name joined with the descriptor signature.
    pub fn texture_name_and_desc(&self) -> String {
        format!("{}{}", self.texture_name, self.descriptor)
    }

    pub fn data_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Id used by GPU texture caches. Content-derived unless the buffer was
    /// handed out through [`writeable_data`](Self::writeable_data) and not
    /// re-hashed since.
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    /// Mutable access to the raw bytes. The cache id becomes unique to this
    /// write until [`update_content_hash`](Self::update_content_hash) runs.
    pub fn writeable_data(&mut self) -> &mut [u8] {
        self.cache_id = format!("unhashed-{}", uuid::Uuid::new_v4().simple());
        &mut self.buffer
    }

    /// Copy interleaved f32 samples in and re-hash.
    pub fn write_f32(&mut self, samples: &[f32]) -> Result<(), ColorError> {
        if self.descriptor.data_type != LutDataType::F32 {
            return Err(ColorError::DataType {
                actual: self.descriptor.data_type,
                requested: LutDataType::F32,
            });
        }
        let bytes: &[u8] = bytemuck::cast_slice(samples);
        if bytes.len() != self.buffer.len() {
            return Err(ColorError::DimensionMismatch {
                expected: self.buffer.len() / 4,
                got: samples.len(),
            });
        }
        self.buffer.copy_from_slice(bytes);
        self.update_content_hash();
        Ok(())
    }

    /// Recompute the cache id from the descriptor and buffer contents.
    pub fn update_content_hash(&mut self) {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.descriptor.as_string().as_bytes());
        hasher.update(&self.buffer);
        self.cache_id = hasher.finalize().to_hex().to_string();
    }
}
