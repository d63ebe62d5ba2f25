//! One stage's contribution to the colour transform.

use crate::lut::ColourLut;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque payload a stage or plugin carries from data creation to the
/// uniform-update step. The pipeline only forwards it.
pub type UserData = Arc<dyn Any + Send + Sync>;

/// Which part of the pipeline produced an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpOrigin {
    /// Source to linear conversion. Always first.
    Linearise,
    /// Linear to display conversion. Always last.
    Display,
    /// A colour-operation plugin, by plugin id.
    Plugin(Uuid),
}

impl fmt::Display for OpOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linearise => f.write_str("linearise"),
            Self::Display => f.write_str("display"),
            Self::Plugin(id) => write!(f, "plugin:{id}"),
        }
    }
}

/// Shader fragment, LUTs and ordering of one pipeline operation.
#[derive(Clone)]
pub struct OperationData {
    pub name: String,
    pub origin: OpOrigin,
    /// Sort key for the shader chain. Linearise is forced to `-inf` and
    /// display to `+inf` when the pipeline is composed.
    pub order_index: f32,
    pub shader: String,
    pub luts: Vec<Arc<ColourLut>>,
    pub cache_id: String,
    pub user_data: Option<UserData>,
}

impl OperationData {
    pub fn new(origin: OpOrigin, name: impl Into<String>, cache_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin,
            order_index: 0.0,
            shader: String::new(),
            luts: Vec::new(),
            cache_id: cache_id.into(),
            user_data: None,
        }
    }

    pub fn with_order_index(mut self, order_index: f32) -> Self {
        self.order_index = order_index;
        self
    }

    pub fn with_shader(mut self, shader: impl Into<String>) -> Self {
        self.shader = shader.into();
        self
    }

    pub fn with_lut(mut self, lut: ColourLut) -> Self {
        self.luts.push(Arc::new(lut));
        self
    }

    pub fn with_user_data<T: Any + Send + Sync>(mut self, data: T) -> Self {
        self.user_data = Some(Arc::new(data));
        self
    }

    /// Replace the cache id with a hash of the shader text and every LUT's
    /// own cache id. Use when the producer has no cheaper identity for its
    /// output.
    pub fn with_content_cache_id(mut self) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.name.as_bytes());
        hasher.update(self.shader.as_bytes());
        for lut in &self.luts {
            hasher.update(lut.texture_name_and_desc().as_bytes());
            hasher.update(lut.cache_id().as_bytes());
        }
        self.cache_id = hasher.finalize().to_hex().to_string();
        self
    }

    /// Downcast the user data slot.
    pub fn user_data_as<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.user_data.as_ref()?.downcast_ref::<T>()
    }

    /// Total LUT bytes held by this operation.
    pub fn size(&self) -> usize {
        self.luts.iter().map(|lut| lut.data_size()).sum()
    }

    pub fn is_plugin(&self) -> bool {
        matches!(self.origin, OpOrigin::Plugin(_))
    }
}

impl fmt::Debug for OperationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationData")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("order_index", &self.order_index)
            .field("shader_len", &self.shader.len())
            .field("luts", &self.luts.len())
            .field("cache_id", &self.cache_id)
            .field("user_data", &self.user_data.is_some())
            .finish()
    }
}
