//! Error types for the module registry

use thiserror::Error;

/// Reasons a registry operation is refused.
///
/// Every variant is raised before the registry is touched, so a refused
/// operation leaves no partial update behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// A module with this id is already live
    #[error("module '{id}' already exists")]
    DuplicateModule { id: String },

    /// No live module has this id
    #[error("module '{id}' not found")]
    UnknownModule { id: String },

    /// The module already holds a sub-model with this instance id
    #[error("sub-model '{instance}' already exists in module '{module}'")]
    DuplicateSubModel { module: String, instance: String },

    /// The module holds no sub-model with this instance id
    #[error("sub-model '{instance}' not found in module '{module}'")]
    UnknownSubModel { module: String, instance: String },

    /// A numeric field is non-finite or out of range
    #[error("invalid value for {field}: {value}")]
    InvalidField { field: &'static str, value: f64 },

    /// A reorder request names the same module twice
    #[error("module '{id}' appears more than once in the requested order")]
    RepeatedInOrder { id: String },
}

impl RegistryError {
    pub fn duplicate_module(id: impl Into<String>) -> Self {
        Self::DuplicateModule { id: id.into() }
    }

    pub fn unknown_module(id: impl Into<String>) -> Self {
        Self::UnknownModule { id: id.into() }
    }

    pub fn duplicate_sub_model(module: impl Into<String>, instance: impl Into<String>) -> Self {
        Self::DuplicateSubModel {
            module: module.into(),
            instance: instance.into(),
        }
    }

    pub fn unknown_sub_model(module: impl Into<String>, instance: impl Into<String>) -> Self {
        Self::UnknownSubModel {
            module: module.into(),
            instance: instance.into(),
        }
    }

    pub fn invalid(field: &'static str, value: f64) -> Self {
        Self::InvalidField { field, value }
    }
}
