//! Loader for Adobe/Resolve `.cube` LUT files.
//!
//! Parsed samples are written straight into a float [`ColourLut`] so stages
//! can ship file-based looks without evaluating them on the CPU.

use crate::error::ColorError;
use crate::lut::{ColourLut, LutDescriptor};
use std::path::Path;

/// A `.cube` file loaded into a LUT buffer.
#[derive(Debug, Clone)]
pub struct CubeFile {
    pub title: Option<String>,
    pub domain_min: [f32; 3],
    pub domain_max: [f32; 3],
    pub lut: ColourLut,
}

#[derive(Clone, Copy, PartialEq)]
enum Shape {
    OneD(usize),
    ThreeD(usize),
}

fn parse_triplet(rest: &str, what: &str) -> Result<[f32; 3], ColorError> {
    let vals: Vec<f32> = rest
        .split_whitespace()
        .map(|s| s.parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|e| ColorError::Parse(format!("bad {what}: {e}")))?;
    match vals.as_slice() {
        [r, g, b] => Ok([*r, *g, *b]),
        _ => Err(ColorError::Parse(format!(
            "{what} needs 3 values, got {}",
            vals.len()
        ))),
    }
}

fn parse_size(rest: &str, what: &str) -> Result<usize, ColorError> {
    let size: usize = rest
        .trim()
        .parse()
        .map_err(|e| ColorError::Parse(format!("bad {what}: {e}")))?;
    if size < 2 {
        return Err(ColorError::InvalidLut(format!("{what} must be at least 2")));
    }
    Ok(size)
}

impl CubeFile {
    /// Parse `.cube` text. `texture_name` becomes the sampler name of the
    /// resulting LUT.
    pub fn parse(content: &str, texture_name: &str) -> Result<Self, ColorError> {
        let mut shape = None;
        let mut title = None;
        let mut domain_min = [0.0f32; 3];
        let mut domain_max = [1.0f32; 3];
        let mut samples: Vec<f32> = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(rest) = line.strip_prefix("TITLE") {
                title = Some(rest.trim().trim_matches('"').to_string());
                continue;
            }
            if let Some(rest) = line.strip_prefix("LUT_1D_SIZE") {
                if shape.is_some() {
                    return Err(ColorError::InvalidLut("LUT size declared twice".into()));
                }
                shape = Some(Shape::OneD(parse_size(rest, "LUT_1D_SIZE")?));
                continue;
            }
            if let Some(rest) = line.strip_prefix("LUT_3D_SIZE") {
                if shape.is_some() {
                    return Err(ColorError::InvalidLut("LUT size declared twice".into()));
                }
                shape = Some(Shape::ThreeD(parse_size(rest, "LUT_3D_SIZE")?));
                continue;
            }
            if let Some(rest) = line.strip_prefix("DOMAIN_MIN") {
                domain_min = parse_triplet(rest, "DOMAIN_MIN")?;
                continue;
            }
            if let Some(rest) = line.strip_prefix("DOMAIN_MAX") {
                domain_max = parse_triplet(rest, "DOMAIN_MAX")?;
                continue;
            }
            // Unknown keywords (LUT_1D_INPUT_RANGE and friends) are skipped.
            if line.starts_with(|c: char| c.is_ascii_alphabetic()) {
                continue;
            }
            samples.extend_from_slice(&parse_triplet(line, "sample")?);
        }

        let shape = shape.ok_or_else(|| ColorError::InvalidLut("missing LUT size".into()))?;
        let descriptor = match shape {
            Shape::OneD(size) => LutDescriptor::one_d(size as u32),
            Shape::ThreeD(size) => LutDescriptor::three_d(size as u32),
        };
        let expected = descriptor.texel_count();
        let got = samples.len() / 3;
        if got != expected {
            return Err(ColorError::DimensionMismatch { expected, got });
        }

        let lut = ColourLut::from_f32(descriptor, texture_name, &samples)?;
        Ok(Self {
            title,
            domain_min,
            domain_max,
            lut,
        })
    }

    /// Read and parse a `.cube` file from disk.
    pub fn load(path: impl AsRef<Path>, texture_name: &str) -> Result<Self, ColorError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ColorError::Parse(format!("{}: {e}", path.display())))?;
        Self::parse(&content, texture_name)
    }

    pub fn is_three_d(&self) -> bool {
        self.lut.descriptor().dimension == crate::lut::LutDimension::ThreeD
    }
}
