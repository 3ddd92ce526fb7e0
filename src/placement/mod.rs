//! Placement rules engine
//!
//! Pure functions over module bounds and already-placed items: automatic
//! placement of new sub-models, collision and containment warnings, and
//! rule validation. All state lives in the registry.

pub mod auto_position;
pub mod collision;
pub mod rules;
pub mod validate;

pub use auto_position::{
    clamp_to_bounds, compute_auto_position, snap_position, snap_to_grid, AutoPosition,
    PlacementReason,
};
pub use collision::{
    boxes_overlap, compute_layout_warnings, is_out_of_bounds, LayoutWarning, LayoutWarnings,
    PlacedItem, WarningCategory, LAYOUT_MARGIN,
};
pub use rules::{
    resolve_behavior, AutoPositionStrategy, BehaviorRule, CompatibilityRule, DimensionRule,
    MaterialRule, PositionRule, ResolvedBehavior, Rule, RuleBook, RuleKind, Severity,
};
pub use validate::{validate_model_rules, RuleContext, RuleViolation};
