//! Project files: a TOML description of modules, sub-models and rules
//!
//! ```toml
//! [settings.flow]
//! gap = 2
//!
//! [[modules]]
//! id = "sink"
//! width = 600
//! height = 720
//! depth = 560
//! doors = 2
//!
//! [[modules.sub_models]]
//! id = "hinge-1"
//! model = "hinge"
//! size = [35, 12, 48]
//!
//! [[rules]]
//! model = "hinge"
//! kind = "compatibility"
//! max_instances = 4
//! ```

use std::path::Path;

use serde::Deserialize;
use toml::Spanned;
use tracing::info;

use crate::config::ConfiguratorConfig;
use crate::error::ProjectError;
use crate::geometry::{Axis, Size3, Vec3};
use crate::panel::Features;
use crate::placement::{
    AutoPositionStrategy, BehaviorRule, CompatibilityRule, DimensionRule, MaterialRule,
    PositionRule, Rule, RuleBook, RuleKind,
};
use crate::registry::{ModuleRegistry, ModuleSpec, SubModelSpec};

/// A parsed project, not yet applied to a registry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Project {
    pub settings: ConfiguratorConfig,
    pub modules: Vec<Spanned<ModuleEntry>>,
    pub rules: Vec<Spanned<RuleEntry>>,
}

/// One `[[modules]]` table
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleEntry {
    pub id: String,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub depth: Option<f64>,
    pub size: Option<f64>,
    pub thickness: Option<f64>,
    pub back_thickness: Option<f64>,
    pub index: Option<f64>,
    #[serde(default)]
    pub shelves: u32,
    #[serde(default)]
    pub doors: u32,
    #[serde(default)]
    pub drawers: u32,
    pub material: Option<String>,
    pub rotation: Option<f64>,
    /// Pins the module outside the flow
    pub position: Option<Vec3>,
    #[serde(default)]
    pub cad_only: bool,
    #[serde(default)]
    pub sub_models: Vec<SubModelEntry>,
}

impl ModuleEntry {
    pub fn to_spec(&self) -> ModuleSpec {
        ModuleSpec {
            width: self.width,
            height: self.height,
            depth: self.depth,
            size: self.size,
            thickness: self.thickness,
            back_thickness: self.back_thickness,
            index: self.index,
            manual_position: self.position.is_some(),
            position: self.position,
            rotation: self.rotation,
            cad_only: self.cad_only,
            material: self.material.clone(),
            features: Features::new(self.shelves, self.doors, self.drawers),
        }
    }
}

/// One `[[modules.sub_models]]` table
#[derive(Debug, Clone, Deserialize)]
pub struct SubModelEntry {
    pub id: String,
    pub model: String,
    pub size: Option<Size3>,
    pub position: Option<Vec3>,
    pub material: Option<String>,
    /// Asset handle already known at load time
    pub asset: Option<String>,
}

impl SubModelEntry {
    pub fn to_spec(&self) -> SubModelSpec {
        SubModelSpec {
            instance_id: self.id.clone(),
            model: self.model.clone(),
            size: self.size,
            position: self.position,
            material: self.material.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleEntryKind {
    Dimension,
    Material,
    Compatibility,
    Position,
    Behavior,
}

/// One `[[rules]]` table, flat across every rule kind
#[derive(Debug, Clone, Deserialize)]
pub struct RuleEntry {
    pub id: Option<String>,
    pub model: String,
    pub kind: RuleEntryKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(alias = "dimension")]
    pub axis: Option<Axis>,
    #[serde(alias = "min_mm", alias = "minMm")]
    pub min: Option<f64>,
    #[serde(alias = "max_mm", alias = "maxMm")]
    pub max: Option<f64>,
    #[serde(default)]
    pub relative: bool,
    #[serde(default, alias = "allowed")]
    pub materials: Vec<String>,
    #[serde(alias = "maxInstances")]
    pub max_instances: Option<usize>,
    #[serde(alias = "snapGrid")]
    pub snap_grid: Option<f64>,
    pub strategy: Option<AutoPositionStrategy>,
}

fn default_enabled() -> bool {
    true
}

impl RuleEntry {
    /// Build a rule, naming it `<model>-<kind>-<ordinal>` when no id is given.
    pub fn to_rule(&self, ordinal: usize) -> Result<Rule, String> {
        let kind = match self.kind {
            RuleEntryKind::Dimension => {
                let axis = self.require_axis()?;
                self.require_limits()?;
                RuleKind::Dimension(DimensionRule {
                    axis,
                    min: self.min,
                    max: self.max,
                    relative: self.relative,
                })
            }
            RuleEntryKind::Position => {
                let axis = self.require_axis()?;
                self.require_limits()?;
                RuleKind::Position(PositionRule {
                    axis,
                    min: self.min,
                    max: self.max,
                })
            }
            RuleEntryKind::Material => RuleKind::Material(MaterialRule {
                allowed: self.materials.clone(),
            }),
            RuleEntryKind::Compatibility => {
                let max_instances = self
                    .max_instances
                    .ok_or("compatibility rule needs max_instances")?;
                RuleKind::Compatibility(CompatibilityRule { max_instances })
            }
            RuleEntryKind::Behavior => {
                if let Some(grid) = self.snap_grid {
                    if !(grid.is_finite() && grid >= 0.0) {
                        return Err(format!(
                            "snap_grid must be a finite non-negative number, got {}",
                            grid
                        ));
                    }
                }
                RuleKind::Behavior(BehaviorRule {
                    snap_grid: self.snap_grid,
                    strategy: self.strategy,
                })
            }
        };

        let id = self
            .id
            .clone()
            .unwrap_or_else(|| format!("{}-{}-{}", self.model, kind.name(), ordinal));
        let mut rule = Rule::new(id, self.model.clone(), kind);
        rule.enabled = self.enabled;
        Ok(rule)
    }

    fn require_axis(&self) -> Result<Axis, String> {
        self.axis
            .ok_or_else(|| format!("{:?} rule needs a dimension axis", self.kind).to_lowercase())
    }

    fn require_limits(&self) -> Result<(), String> {
        if self.min.is_none() && self.max.is_none() {
            return Err("rule needs at least one of min or max".to_string());
        }
        for value in [self.min, self.max].into_iter().flatten() {
            if !value.is_finite() {
                return Err(format!("limit must be finite, got {}", value));
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(format!("min {} exceeds max {}", min, max));
            }
        }
        Ok(())
    }
}

impl Project {
    /// Parse a project from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ProjectError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a project from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ProjectError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Replace the project's settings, e.g. with a standalone config file
    pub fn with_settings(mut self, settings: ConfiguratorConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Compile every `[[rules]]` entry
    pub fn rule_book(&self) -> Result<RuleBook, ProjectError> {
        self.rules
            .iter()
            .enumerate()
            .map(|(ordinal, entry)| {
                entry
                    .get_ref()
                    .to_rule(ordinal)
                    .map_err(|message| ProjectError::InvalidRule {
                        span: entry.span(),
                        message,
                    })
            })
            .collect()
    }

    /// Populate a fresh registry. Stops at the first refused entry.
    pub fn build(&self) -> Result<ModuleRegistry, ProjectError> {
        let mut registry = ModuleRegistry::new(self.settings.clone());
        registry.set_rules(self.rule_book()?);

        let mut sub_models = 0;
        for entry in &self.modules {
            let span = entry.span();
            let module = entry.get_ref();
            let refused = |source| ProjectError::Registry {
                span: span.clone(),
                source,
            };

            registry
                .add_module(&module.id, module.to_spec())
                .map_err(refused)?;
            for sub in &module.sub_models {
                registry
                    .add_sub_model(&module.id, sub.to_spec())
                    .map_err(refused)?;
                if let Some(asset) = &sub.asset {
                    registry
                        .attach_asset(&module.id, &sub.id, asset.clone(), None)
                        .map_err(refused)?;
                }
                sub_models += 1;
            }
        }

        info!(
            modules = registry.len(),
            sub_models,
            rules = registry.rules().len(),
            "project loaded"
        );
        Ok(registry)
    }
}
