//! Chroma Color — LUTs and the data produced by colour pipeline stages.

pub mod cube;
pub mod error;
pub mod lut;
pub mod operation;
pub mod pipeline;

pub use cube::CubeFile;
pub use error::ColorError;
pub use lut::{ColourLut, Interpolation, LutChannels, LutDataType, LutDescriptor, LutDimension};
pub use operation::{OpOrigin, OperationData, UserData};
pub use pipeline::{combine_cache_ids, PipelineResult};
