//! Module and sub-model records, plus the requests that create and change them

use crate::geometry::{Aabb, Size3, Vec3};
use crate::panel::{Features, PanelSet};

use super::error::RegistryError;

/// An attached asset (hardware, insert, decorative piece) inside a module
#[derive(Debug, Clone, PartialEq)]
pub struct SubModel {
    /// Unique within the owning module
    pub instance_id: String,
    /// Source model identifier; rules are keyed by it
    pub model: String,
    /// Module-space centre
    pub position: Vec3,
    /// Bounding size, unknown until the asset reports it
    pub size: Option<Size3>,
    pub material: Option<String>,
    /// Handle filled in once the asset finishes loading
    pub asset: Option<String>,
}

/// Request to attach a sub-model to a module
#[derive(Debug, Clone, PartialEq)]
pub struct SubModelSpec {
    pub instance_id: String,
    pub model: String,
    pub size: Option<Size3>,
    /// Requested module-space centre; `None` asks for auto-position
    pub position: Option<Vec3>,
    pub material: Option<String>,
}

impl SubModelSpec {
    pub fn new(instance_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            model: model.into(),
            size: None,
            position: None,
            material: None,
        }
    }

    pub fn with_size(mut self, width: f64, height: f64, depth: f64) -> Self {
        self.size = Some(Size3::new(width, height, depth));
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), RegistryError> {
        if let Some(size) = self.size {
            check_length("sub_model.width", Some(size.width))?;
            check_length("sub_model.height", Some(size.height))?;
            check_length("sub_model.depth", Some(size.depth))?;
        }
        if let Some(position) = self.position {
            check_position(position)?;
        }
        Ok(())
    }
}

/// A cabinet unit held by the registry
#[derive(Debug, Clone)]
pub struct Module {
    pub(crate) id: String,
    pub(crate) size: Size3,
    pub(crate) thickness: f64,
    pub(crate) back_thickness: f64,
    pub(crate) features: Features,
    pub(crate) index: usize,
    /// Insertion sequence; breaks ties between equal indices
    pub(crate) seq: u64,
    pub(crate) manual_position: bool,
    pub(crate) position: Vec3,
    /// Yaw about the vertical axis, degrees
    pub(crate) rotation: f64,
    pub(crate) cad_only: bool,
    pub(crate) material: Option<String>,
    pub(crate) panels: PanelSet,
    pub(crate) sub_models: Vec<SubModel>,
}

impl Module {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> Size3 {
        self.size
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn back_thickness(&self) -> f64 {
        self.back_thickness
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_manual(&self) -> bool {
        self.manual_position
    }

    /// World-space centre
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn is_cad_only(&self) -> bool {
        self.cad_only
    }

    pub fn material(&self) -> Option<&str> {
        self.material.as_deref()
    }

    /// Synthesized panels; always empty for cad-only modules
    pub fn panels(&self) -> &PanelSet {
        &self.panels
    }

    pub fn sub_models(&self) -> &[SubModel] {
        &self.sub_models
    }

    pub fn sub_model(&self, instance_id: &str) -> Option<&SubModel> {
        self.sub_models.iter().find(|s| s.instance_id == instance_id)
    }

    /// The module's own box in module space (centre at the origin)
    pub fn local_bounds(&self) -> Aabb {
        Aabb::centered(self.size)
    }

    /// World-space box including yaw
    pub fn world_bounds(&self) -> Aabb {
        Aabb::rotated_footprint(self.position, self.size, self.rotation)
    }

    /// Horizontal span along the flow axis, ignoring rotation
    pub fn flow_extent(&self) -> (f64, f64) {
        let half = self.size.width / 2.0;
        (self.position.x - half, self.position.x + half)
    }
}

/// Request to create a module
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleSpec {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub depth: Option<f64>,
    /// Fallback for any dimension not given explicitly
    pub size: Option<f64>,
    pub thickness: Option<f64>,
    pub back_thickness: Option<f64>,
    /// Explicit ordering index; defaults to one past the current maximum
    pub index: Option<f64>,
    pub manual_position: bool,
    pub position: Option<Vec3>,
    pub rotation: Option<f64>,
    pub cad_only: bool,
    pub material: Option<String>,
    pub features: Features,
}

impl ModuleSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spec with explicit width, height and depth
    pub fn sized(width: f64, height: f64, depth: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            depth: Some(depth),
            ..Self::default()
        }
    }

    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.thickness = Some(thickness);
        self
    }

    pub fn with_back_thickness(mut self, thickness: f64) -> Self {
        self.back_thickness = Some(thickness);
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index as f64);
        self
    }

    pub fn with_shelves(mut self, count: u32) -> Self {
        self.features.shelves = count;
        self
    }

    pub fn with_doors(mut self, count: u32) -> Self {
        self.features.doors = count;
        self
    }

    pub fn with_drawers(mut self, count: u32) -> Self {
        self.features.drawers = count;
        self
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = Some(degrees);
        self
    }

    /// Pin the module at a caller-chosen position, outside the flow
    pub fn manual_at(mut self, position: Vec3) -> Self {
        self.manual_position = true;
        self.position = Some(position);
        self
    }

    /// Container for an external model, with no panels of its own
    pub fn cad_only(mut self) -> Self {
        self.cad_only = true;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), RegistryError> {
        check_length("width", self.width)?;
        check_length("height", self.height)?;
        check_length("depth", self.depth)?;
        check_length("size", self.size)?;
        check_length("thickness", self.thickness)?;
        check_length("back_thickness", self.back_thickness)?;
        check_index(self.index)?;
        check_finite("rotation", self.rotation)?;
        if let Some(position) = self.position {
            check_position(position)?;
        }
        Ok(())
    }
}

/// Partial update of a live module; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleUpdate {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub depth: Option<f64>,
    /// Applies to every dimension not given explicitly
    pub size: Option<f64>,
    pub thickness: Option<f64>,
    pub back_thickness: Option<f64>,
    pub index: Option<f64>,
    pub manual_position: Option<bool>,
    pub position: Option<Vec3>,
    pub rotation: Option<f64>,
    pub material: Option<String>,
    pub shelves: Option<u32>,
    pub doors: Option<u32>,
    pub drawers: Option<u32>,
}

impl ModuleUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn depth(mut self, depth: f64) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn thickness(mut self, thickness: f64) -> Self {
        self.thickness = Some(thickness);
        self
    }

    pub fn index(mut self, index: f64) -> Self {
        self.index = Some(index);
        self
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    pub fn manual(mut self, manual: bool) -> Self {
        self.manual_position = Some(manual);
        self
    }

    pub fn rotation(mut self, degrees: f64) -> Self {
        self.rotation = Some(degrees);
        self
    }

    pub fn material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn shelves(mut self, count: u32) -> Self {
        self.shelves = Some(count);
        self
    }

    pub fn doors(mut self, count: u32) -> Self {
        self.doors = Some(count);
        self
    }

    pub fn drawers(mut self, count: u32) -> Self {
        self.drawers = Some(count);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), RegistryError> {
        check_length("width", self.width)?;
        check_length("height", self.height)?;
        check_length("depth", self.depth)?;
        check_length("size", self.size)?;
        check_length("thickness", self.thickness)?;
        check_length("back_thickness", self.back_thickness)?;
        check_index(self.index)?;
        check_finite("rotation", self.rotation)?;
        if let Some(position) = self.position {
            check_position(position)?;
        }
        Ok(())
    }
}

fn check_length(field: &'static str, value: Option<f64>) -> Result<(), RegistryError> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(RegistryError::invalid(field, v)),
        _ => Ok(()),
    }
}

fn check_finite(field: &'static str, value: Option<f64>) -> Result<(), RegistryError> {
    match value {
        Some(v) if !v.is_finite() => Err(RegistryError::invalid(field, v)),
        _ => Ok(()),
    }
}

/// Indices are whole, non-negative numbers
pub(crate) fn check_index(value: Option<f64>) -> Result<(), RegistryError> {
    match value {
        Some(v) if !(v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= usize::MAX as f64) => {
            Err(RegistryError::invalid("index", v))
        }
        _ => Ok(()),
    }
}

pub(crate) fn check_position(position: Vec3) -> Result<(), RegistryError> {
    check_finite("position.x", Some(position.x))?;
    check_finite("position.y", Some(position.y))?;
    check_finite("position.z", Some(position.z))
}
