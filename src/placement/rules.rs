//! Declarative rules keyed by sub-model source identifier

use std::fmt;

use serde::Deserialize;

use crate::geometry::Axis;

/// How serious a rule violation is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Strategy used to place a sub-model that arrives without coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoPositionStrategy {
    None,
    #[default]
    Stack,
    #[serde(alias = "align-front")]
    AlignFront,
    #[serde(alias = "align-center")]
    AlignCenter,
}

impl fmt::Display for AutoPositionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoPositionStrategy::None => write!(f, "none"),
            AutoPositionStrategy::Stack => write!(f, "stack"),
            AutoPositionStrategy::AlignFront => write!(f, "align_front"),
            AutoPositionStrategy::AlignCenter => write!(f, "align_center"),
        }
    }
}

/// Size limit on one axis, absolute or as a percentage of the module
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionRule {
    pub axis: Axis,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// When set, `min`/`max` are percentages of the module size on `axis`
    pub relative: bool,
}

/// Allowed material names, compared case-insensitively
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRule {
    pub allowed: Vec<String>,
}

/// Maximum instances of one source model per module
#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityRule {
    pub max_instances: usize,
}

/// Allowed range of the module-space coordinate on one axis
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRule {
    pub axis: Axis,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Placement behavior overrides
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BehaviorRule {
    pub snap_grid: Option<f64>,
    pub strategy: Option<AutoPositionStrategy>,
}

/// The closed set of rule variants
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    Dimension(DimensionRule),
    Material(MaterialRule),
    Compatibility(CompatibilityRule),
    Position(PositionRule),
    Behavior(BehaviorRule),
}

impl RuleKind {
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::Dimension(_) => "dimension",
            RuleKind::Material(_) => "material",
            RuleKind::Compatibility(_) => "compatibility",
            RuleKind::Position(_) => "position",
            RuleKind::Behavior(_) => "behavior",
        }
    }
}

/// A rule attached to every sub-model sharing a source identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: String,
    /// Source model identifier the rule applies to
    pub model: String,
    pub enabled: bool,
    pub kind: RuleKind,
}

impl Rule {
    pub fn new(id: impl Into<String>, model: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            enabled: true,
            kind,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Behavior after folding rule overrides onto the configured defaults
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedBehavior {
    pub snap_grid: f64,
    pub strategy: AutoPositionStrategy,
}

/// Resolve snap grid and strategy for a model's rules.
///
/// The first enabled behavior rule that sets a field wins for that field.
pub fn resolve_behavior(rules: &[&Rule], default_snap_grid: f64) -> ResolvedBehavior {
    let mut snap_grid = None;
    let mut strategy = None;
    for rule in rules.iter().filter(|r| r.enabled) {
        if let RuleKind::Behavior(b) = &rule.kind {
            snap_grid = snap_grid.or(b.snap_grid);
            strategy = strategy.or(b.strategy);
        }
    }
    ResolvedBehavior {
        snap_grid: snap_grid.unwrap_or(default_snap_grid),
        strategy: strategy.unwrap_or_default(),
    }
}

/// All rules known to a registry, looked up by source model
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    rules: Vec<Rule>,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Rules registered for a source model, in registration order
    pub fn for_model(&self, model: &str) -> Vec<&Rule> {
        self.rules.iter().filter(|r| r.model == model).collect()
    }
}

impl FromIterator<Rule> for RuleBook {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}
