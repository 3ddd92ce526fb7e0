//! Configuration for the configurator engine
//!
//! Every section deserializes from TOML with per-field defaults, so a
//! settings file only needs to name the values it overrides:
//!
//! ```toml
//! [panels]
//! default_thickness = 19
//!
//! [flow]
//! gap = 2
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading a settings file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse settings TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Carpentry parameters consumed by panel decomposition
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Carcass material thickness when a module does not declare one
    pub default_thickness: f64,

    /// Back panel thickness when a module does not declare one
    pub default_back_thickness: f64,

    /// Fallback for width/height/depth when neither they nor `size` are given
    pub default_size: f64,

    /// Floor applied to every dimension before any subtraction
    pub min_dimension: f64,

    /// Total width removed from a shelf so it slides between the sides
    pub shelf_side_clearance: f64,

    /// Upper bound on doors per module
    pub max_doors: u32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            default_thickness: 18.0,
            default_back_thickness: 6.0,
            default_size: 1.0,
            min_dimension: 0.001,
            shelf_side_clearance: 2.0,
            max_doors: 2,
        }
    }
}

/// Reflow parameters for laying modules out along the x axis
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Space left between neighbouring auto-flowed modules
    pub gap: f64,

    /// Left edge of the first auto-flowed module
    pub origin_x: f64,

    /// Depth coordinate every auto-flowed module is reset to
    pub baseline_z: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            gap: 0.0,
            origin_x: 0.0,
            baseline_z: 0.0,
        }
    }
}

/// Placement engine parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Margin kept between placed items and module walls
    pub margin: f64,

    /// Snap grid used when no behavior rule sets one
    pub default_snap_grid: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            margin: 1.0,
            default_snap_grid: 10.0,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ConfiguratorConfig {
    pub panels: PanelConfig,
    pub flow: FlowConfig,
    pub placement: PlacementConfig,
}

impl ConfiguratorConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Set the gap between auto-flowed modules
    pub fn with_gap(mut self, gap: f64) -> Self {
        self.flow.gap = gap;
        self
    }

    /// Set the default carcass thickness
    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.panels.default_thickness = thickness;
        self
    }

    /// Set the default back panel thickness
    pub fn with_back_thickness(mut self, thickness: f64) -> Self {
        self.panels.default_back_thickness = thickness;
        self
    }

    /// Set the shelf side clearance
    pub fn with_shelf_clearance(mut self, clearance: f64) -> Self {
        self.panels.shelf_side_clearance = clearance;
        self
    }

    /// Set the placement margin
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.placement.margin = margin;
        self
    }

    /// Set the default snap grid
    pub fn with_snap_grid(mut self, grid: f64) -> Self {
        self.placement.default_snap_grid = grid;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConfiguratorConfig::default();
        assert_eq!(config.panels.default_thickness, 18.0);
        assert_eq!(config.panels.default_back_thickness, 6.0);
        assert_eq!(config.panels.default_size, 1.0);
        assert_eq!(config.panels.min_dimension, 0.001);
        assert_eq!(config.panels.shelf_side_clearance, 2.0);
        assert_eq!(config.panels.max_doors, 2);
        assert_eq!(config.flow.gap, 0.0);
        assert_eq!(config.placement.margin, 1.0);
        assert_eq!(config.placement.default_snap_grid, 10.0);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ConfiguratorConfig::new()
            .with_gap(5.0)
            .with_thickness(19.0)
            .with_snap_grid(25.0);

        assert_eq!(config.flow.gap, 5.0);
        assert_eq!(config.panels.default_thickness, 19.0);
        assert_eq!(config.placement.default_snap_grid, 25.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ConfiguratorConfig::from_toml(
            r#"
[panels]
default_thickness = 16

[flow]
gap = 3.5
"#,
        )
        .expect("Should parse");
        assert_eq!(config.panels.default_thickness, 16.0);
        assert_eq!(config.panels.default_back_thickness, 6.0);
        assert_eq!(config.flow.gap, 3.5);
        assert_eq!(config.placement, PlacementConfig::default());
    }

    #[test]
    fn test_invalid_toml_error() {
        let result = ConfiguratorConfig::from_toml("this is not valid toml {{{{");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
