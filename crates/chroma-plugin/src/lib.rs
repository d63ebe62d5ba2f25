//! Chroma Plugin — colour-operation plugins, their registry and pre-draw hooks.

pub mod colour_op;
pub mod error;
pub mod hook;
pub mod plugin_manager;
pub mod registry;

pub use colour_op::{ColourOpPlugin, Uniforms};
pub use error::PluginError;
pub use hook::{CompositeHook, HookAggregator, PreDrawHook};
pub use plugin_manager::{ColourOpFactory, PluginManager};
pub use registry::{OperationHandle, OperationRegistry};
