//! Cabinet Configurator - the geometric core of a parametric furniture configurator
//!
//! This library decomposes cabinet modules into panels, keeps a row of modules
//! packed along the flow axis, and places and validates the sub-models
//! (hardware, inserts, appliances) attached to each module.
//!
//! # Example
//!
//! ```rust
//! use cabinet_configurator::{ConfiguratorConfig, ModuleRegistry, ModuleSpec};
//!
//! let mut registry = ModuleRegistry::new(ConfiguratorConfig::default());
//! registry.add_module("sink", ModuleSpec::sized(600.0, 720.0, 560.0).with_doors(2)).unwrap();
//! registry.add_module("drawers", ModuleSpec::sized(400.0, 720.0, 560.0).with_drawers(3)).unwrap();
//!
//! assert_eq!(registry.module("drawers").unwrap().position().x, 800.0);
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod panel;
pub mod placement;
pub mod project;
pub mod registry;
pub mod report;

pub use config::{ConfigError, ConfiguratorConfig, FlowConfig, PanelConfig, PlacementConfig};
pub use error::{ConfigureError, ProjectError};
pub use geometry::{Aabb, Axis, Size3, Vec3};
pub use panel::{decompose, DecompositionInput, Features, Panel, PanelRole, PanelSet, PanelSpec};
pub use placement::{
    compute_auto_position, compute_layout_warnings, validate_model_rules, AutoPositionStrategy,
    LayoutWarnings, Rule, RuleBook, RuleKind, RuleViolation, Severity,
};
pub use project::Project;
pub use registry::{
    CameraTarget, MaterialResolver, ModuleRegistry, ModuleSpec, ModuleUpdate, SceneLog,
    SceneSink, SubModelSpec,
};
pub use report::{render_report, ReportConfig};

use tracing::debug;

/// Configuration for the complete configure pipeline
#[derive(Debug, Clone, Default)]
pub struct ConfigureOptions {
    /// Replaces the project's `[settings]` when set
    pub settings: Option<ConfiguratorConfig>,
    /// Report output configuration
    pub report: ReportConfig,
    /// Re-run auto-position over every module's sub-models after loading
    pub arrange: bool,
}

impl ConfigureOptions {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(mut self, settings: ConfiguratorConfig) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_report(mut self, report: ReportConfig) -> Self {
        self.report = report;
        self
    }

    pub fn with_arrange(mut self, arrange: bool) -> Self {
        self.arrange = arrange;
        self
    }
}

/// Outcome of the configure pipeline
#[derive(Debug)]
pub struct Configured {
    pub registry: ModuleRegistry,
    pub report: String,
    /// Error-level rule violations across every module
    pub errors: usize,
    /// Warning-level rule violations plus layout warnings
    pub warnings: usize,
}

/// Load a project from TOML source and report on it with default options
pub fn configure(source: &str) -> Result<Configured, ConfigureError> {
    configure_with_options(source, ConfigureOptions::default())
}

/// Load a project from TOML source and report on it
///
/// # Example
///
/// ```rust
/// use cabinet_configurator::{configure_with_options, ConfigureOptions, ReportConfig};
///
/// let source = r#"
/// [[modules]]
/// id = "base"
/// width = 600
/// height = 720
/// depth = 560
/// "#;
///
/// let options = ConfigureOptions::new().with_report(ReportConfig::new().with_panels(false));
/// let configured = configure_with_options(source, options).unwrap();
/// assert!(configured.report.contains("module base"));
/// assert_eq!(configured.errors, 0);
/// ```
pub fn configure_with_options(
    source: &str,
    options: ConfigureOptions,
) -> Result<Configured, ConfigureError> {
    let mut project = Project::from_str(source)?;
    if let Some(settings) = options.settings {
        project = project.with_settings(settings);
    }
    let mut registry = project.build()?;

    let ids: Vec<String> = registry
        .modules_in_order()
        .iter()
        .map(|m| m.id().to_string())
        .collect();

    if options.arrange {
        for id in &ids {
            registry.arrange_module(id)?;
        }
    }

    let mut errors = 0;
    let mut warnings = 0;
    for id in &ids {
        for found in registry.validate_module(id)? {
            match found.violation.severity {
                Severity::Error => errors += 1,
                Severity::Warning => warnings += 1,
            }
        }
        warnings += registry.layout_warnings(id)?.to_warnings().len();
    }
    debug!(errors, warnings, arranged = options.arrange, "project checked");

    let report = render_report(&registry, &options.report);
    Ok(Configured {
        registry,
        report,
        errors,
        warnings,
    })
}
