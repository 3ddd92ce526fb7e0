//! Rule validation for a single sub-model

use crate::geometry::{Axis, Size3, Vec3};

use super::rules::{
    CompatibilityRule, DimensionRule, MaterialRule, PositionRule, Rule, RuleKind, Severity,
};

/// A rule the sub-model breaks. Advisory only; never blocks a mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleViolation {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
}

/// Everything validation may look at for one sub-model
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub module_size: Size3,
    pub model: &'a str,
    /// Bounding size, if already known
    pub size: Option<Size3>,
    pub material: Option<&'a str>,
    pub position: Vec3,
    /// Sub-models in the same module sharing `model`, this one included
    pub same_model_count: usize,
    pub rules: &'a [&'a Rule],
}

/// Evaluate every enabled rule registered for the context's model.
pub fn validate_model_rules(ctx: &RuleContext<'_>) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    for rule in ctx.rules.iter().filter(|r| r.enabled && r.model == ctx.model) {
        let found = match &rule.kind {
            RuleKind::Dimension(d) => check_dimension(d, ctx),
            RuleKind::Material(m) => check_material(m, ctx),
            RuleKind::Compatibility(c) => check_compatibility(c, ctx),
            RuleKind::Position(p) => check_position(p, ctx),
            RuleKind::Behavior(_) => None,
        };
        if let Some((severity, message)) = found {
            violations.push(RuleViolation {
                rule_id: rule.id.clone(),
                severity,
                message,
            });
        }
    }

    violations
}

fn known_extent(size: Option<Size3>, axis: Axis) -> Option<f64> {
    size.map(|s| s.get(axis))
        .filter(|v| v.is_finite() && *v > 0.0)
}

fn check_dimension(rule: &DimensionRule, ctx: &RuleContext<'_>) -> Option<(Severity, String)> {
    let actual = known_extent(ctx.size, rule.axis)?;
    let scale = |limit: f64| {
        if rule.relative {
            limit / 100.0 * ctx.module_size.get(rule.axis)
        } else {
            limit
        }
    };

    if let Some(min) = rule.min.map(scale) {
        if actual < min {
            return Some((
                Severity::Error,
                format!(
                    "{} {} is {:.1}, below the minimum of {:.1}",
                    ctx.model, rule.axis, actual, min
                ),
            ));
        }
    }
    if let Some(max) = rule.max.map(scale) {
        if actual > max {
            return Some((
                Severity::Error,
                format!(
                    "{} {} is {:.1}, above the maximum of {:.1}",
                    ctx.model, rule.axis, actual, max
                ),
            ));
        }
    }
    None
}

fn check_material(rule: &MaterialRule, ctx: &RuleContext<'_>) -> Option<(Severity, String)> {
    let material = ctx.material?;
    if rule.allowed.is_empty() {
        return None;
    }
    let wanted = material.to_lowercase();
    if rule.allowed.iter().any(|m| m.to_lowercase() == wanted) {
        return None;
    }
    Some((
        Severity::Warning,
        format!(
            "material \"{}\" is not allowed for {} (allowed: {})",
            material,
            ctx.model,
            rule.allowed.join(", ")
        ),
    ))
}

fn check_compatibility(
    rule: &CompatibilityRule,
    ctx: &RuleContext<'_>,
) -> Option<(Severity, String)> {
    (ctx.same_model_count > rule.max_instances).then(|| {
        (
            Severity::Error,
            format!(
                "{} instances of {} exceed the maximum of {}",
                ctx.same_model_count, ctx.model, rule.max_instances
            ),
        )
    })
}

fn check_position(rule: &PositionRule, ctx: &RuleContext<'_>) -> Option<(Severity, String)> {
    let value = ctx.position.get(rule.axis);
    let below = rule.min.is_some_and(|min| value < min);
    let above = rule.max.is_some_and(|max| value > max);
    (below || above).then(|| {
        (
            Severity::Warning,
            format!(
                "{} {} position {:.1} is outside the allowed range",
                ctx.model, rule.axis, value
            ),
        )
    })
}
