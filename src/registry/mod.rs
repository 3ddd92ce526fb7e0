//! Module registry
//!
//! Owns the live cabinet modules, keeps them packed along the flow axis and
//! tracks the sub-models attached to each one. Scene updates are queued and
//! handed to a [`SceneSink`] on demand.

mod core;
pub mod error;
pub mod module;
pub mod scene;

pub use self::core::{CameraTarget, ModuleRegistry, Placement, SubModelViolation};
pub use error::RegistryError;
pub use module::{Module, ModuleSpec, ModuleUpdate, SubModel, SubModelSpec};
pub use scene::{
    MaterialResolver, NodeKey, PassthroughMaterials, SceneChange, SceneEvent, SceneLog,
    SceneNode, SceneSink,
};
