//! Color subsystem errors.

use crate::lut::LutDataType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ColorError {
    #[error("invalid LUT: {0}")]
    InvalidLut(String),
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("LUT holds {actual:?} samples, cannot write {requested:?}")]
    DataType {
        actual: LutDataType,
        requested: LutDataType,
    },
    #[error("parse error: {0}")]
    Parse(String),
}
