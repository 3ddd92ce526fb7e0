//! Automatic placement of sub-models inside a module

use std::fmt;

use crate::config::PlacementConfig;
use crate::geometry::{Aabb, Axis, Size3, Vec3};

use super::collision::{boxes_overlap, PlacedItem};
use super::rules::{resolve_behavior, AutoPositionStrategy, Rule};

/// Floor for item extents so degenerate sizes still advance the scan
const MIN_EXTENT: f64 = 0.001;

/// Why an auto-position landed where it did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementReason {
    /// Strategy `none`: the module centre
    Disabled,
    AlignFront,
    AlignCenter,
    /// Found a free slot while scanning depth layers and columns
    Stacked { layer: usize, column: usize },
    /// No slot fits; parked at the front-bottom-left corner
    NoFreeSlot,
}

impl fmt::Display for PlacementReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementReason::Disabled => write!(f, "auto-position disabled"),
            PlacementReason::AlignFront => write!(f, "aligned to front"),
            PlacementReason::AlignCenter => write!(f, "aligned to center"),
            PlacementReason::Stacked { layer, column } => {
                write!(f, "stacked in layer {} column {}", layer, column)
            }
            PlacementReason::NoFreeSlot => write!(f, "no free slot"),
        }
    }
}

/// Result of an auto-position request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoPosition {
    pub position: Vec3,
    pub snapped: bool,
    pub reason: PlacementReason,
}

/// Round a value to the nearest multiple of `grid`. A non-positive grid disables snapping.
pub fn snap_to_grid(value: f64, grid: f64) -> f64 {
    if grid > 0.0 && grid.is_finite() {
        (value / grid).round() * grid
    } else {
        value
    }
}

/// Snap every component of a position
pub fn snap_position(position: Vec3, grid: f64) -> Vec3 {
    Vec3::new(
        snap_to_grid(position.x, grid),
        snap_to_grid(position.y, grid),
        snap_to_grid(position.z, grid),
    )
}

/// Clamp an item centre so its extent plus `margin` stays inside `bounds`.
///
/// On an axis where the item cannot fit, it is centred on the bounds.
pub fn clamp_to_bounds(position: Vec3, size: Size3, bounds: &Aabb, margin: f64) -> Vec3 {
    let half = size.half();
    let center = bounds.center();
    let mut out = position;
    for axis in Axis::ALL {
        let lo = bounds.min.get(axis) + margin + half.get(axis);
        let hi = bounds.max.get(axis) - margin - half.get(axis);
        let value = if lo > hi {
            center.get(axis)
        } else {
            position.get(axis).clamp(lo, hi)
        };
        out.set(axis, value);
    }
    out
}

/// Compute where a new item of `size` should go inside `bounds`.
///
/// `bounds` is the module's box in module space, `placed` the items already
/// inside it and `rules` the rule set of the new item's source model.
pub fn compute_auto_position(
    bounds: &Aabb,
    placed: &[PlacedItem<'_>],
    rules: &[&Rule],
    size: Size3,
    config: &PlacementConfig,
) -> AutoPosition {
    let behavior = resolve_behavior(rules, config.default_snap_grid);
    let size = size.floored(MIN_EXTENT);
    let margin = config.margin.max(0.0);
    let half = size.half();

    let (position, snapped, reason) = match behavior.strategy {
        AutoPositionStrategy::None => (bounds.center(), false, PlacementReason::Disabled),
        AutoPositionStrategy::AlignCenter => (bounds.center(), false, PlacementReason::AlignCenter),
        AutoPositionStrategy::AlignFront => (
            Vec3::new(
                bounds.min.x + margin + half.x,
                bounds.min.y + margin + half.y,
                bounds.max.z - margin - half.z,
            ),
            false,
            PlacementReason::AlignFront,
        ),
        AutoPositionStrategy::Stack => match scan_for_slot(bounds, placed, size, margin) {
            Some((corner, layer, column)) => {
                let slot = corner.add(half);
                let position = snap_clear(slot, size, placed, behavior.snap_grid, margin);
                (position, position != slot, PlacementReason::Stacked { layer, column })
            }
            None => (
                Vec3::new(
                    bounds.min.x + margin + half.x,
                    bounds.min.y + margin + half.y,
                    bounds.min.z + margin + half.z,
                ),
                false,
                PlacementReason::NoFreeSlot,
            ),
        },
    };

    AutoPosition {
        position: clamp_to_bounds(position, size, bounds, margin),
        snapped,
        reason,
    }
}

/// Scan-line search for the min corner of a free slot.
///
/// Walks depth layers back to front, columns left to right, and within a
/// column stacks on top of everything already there. A full column moves the
/// cursor past the items blocking it; a full layer does the same in depth.
/// Items are kept twice the margin apart so they never register as collisions.
/// Returns the slot's min corner with its layer and column.
fn scan_for_slot(
    bounds: &Aabb,
    placed: &[PlacedItem<'_>],
    size: Size3,
    margin: f64,
) -> Option<(Vec3, usize, usize)> {
    let spacing = 2.0 * margin;
    let limit = |axis: Axis| bounds.max.get(axis) - margin;

    let mut z = bounds.min.z + margin;
    let mut layer = 0;
    while z + size.depth <= limit(Axis::Depth) {
        let layer_items: Vec<Aabb> = placed
            .iter()
            .map(PlacedItem::bounds)
            .filter(|b| overlaps(b.min.z, b.max.z, z - spacing, z + size.depth + spacing))
            .collect();

        let mut x = bounds.min.x + margin;
        let mut column = 0;
        while x + size.width <= limit(Axis::Width) {
            let column_items: Vec<&Aabb> = layer_items
                .iter()
                .filter(|b| overlaps(b.min.x, b.max.x, x - spacing, x + size.width + spacing))
                .collect();
            let y = column_items
                .iter()
                .map(|b| b.max.y + spacing)
                .fold(bounds.min.y + margin, f64::max);

            if y + size.height <= limit(Axis::Height) {
                return Some((Vec3::new(x, y, z), layer, column));
            }
            x = past(column_items.iter().map(|b| b.max.x), x + size.width, spacing);
            column += 1;
        }

        z = past(layer_items.iter().map(|b| b.max.z), z + size.depth, spacing);
        layer += 1;
    }
    None
}

/// Next cursor value: clear of the blocking items' far edges, or of the
/// new item itself when nothing blocks.
fn past(far_edges: impl Iterator<Item = f64>, fallback: f64, spacing: f64) -> f64 {
    far_edges.reduce(f64::max).unwrap_or(fallback) + spacing
}

fn overlaps(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> bool {
    a_min < b_max && b_min < a_max
}

/// Snap a stacked slot centre to the grid.
///
/// Rounds to the nearest grid line. When that lands on an item already
/// placed, the axes that moved toward the min side round up instead, since
/// the scan only clears items behind, below and left of the slot.
fn snap_clear(slot: Vec3, size: Size3, placed: &[PlacedItem<'_>], grid: f64, margin: f64) -> Vec3 {
    let nearest = snap_position(slot, grid);
    if !collides(nearest, size, placed, margin) {
        return nearest;
    }
    let mut out = nearest;
    for axis in Axis::ALL {
        if nearest.get(axis) < slot.get(axis) {
            out.set(axis, (slot.get(axis) / grid).ceil() * grid);
        }
    }
    out
}

fn collides(center: Vec3, size: Size3, placed: &[PlacedItem<'_>], margin: f64) -> bool {
    placed
        .iter()
        .any(|p| boxes_overlap(center, size, p.position, p.size, margin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::collision::compute_layout_warnings;
    use crate::placement::rules::{BehaviorRule, RuleKind};
    use approx::assert_relative_eq;

    fn module_bounds() -> Aabb {
        Aabb::centered(Size3::new(600.0, 800.0, 500.0))
    }

    fn behavior(strategy: AutoPositionStrategy, grid: Option<f64>) -> Rule {
        Rule::new(
            "b",
            "insert",
            RuleKind::Behavior(BehaviorRule {
                snap_grid: grid,
                strategy: Some(strategy),
            }),
        )
    }

    #[test]
    fn test_snap_to_grid() {
        assert_eq!(snap_to_grid(14.0, 10.0), 10.0);
        assert_eq!(snap_to_grid(15.0, 10.0), 20.0);
        assert_eq!(snap_to_grid(-26.0, 10.0), -30.0);
        assert_eq!(snap_to_grid(7.3, 0.0), 7.3);
    }

    #[test]
    fn test_clamp_to_bounds() {
        let bounds = Aabb::centered(Size3::uniform(100.0));
        let clamped = clamp_to_bounds(Vec3::new(100.0, -100.0, 0.0), Size3::uniform(10.0), &bounds, 1.0);
        assert_eq!(clamped, Vec3::new(44.0, -44.0, 0.0));
    }

    #[test]
    fn test_clamp_oversized_item_centers() {
        let bounds = Aabb::centered(Size3::uniform(100.0));
        let clamped = clamp_to_bounds(Vec3::new(30.0, 0.0, 0.0), Size3::new(150.0, 10.0, 10.0), &bounds, 1.0);
        assert_eq!(clamped.x, 0.0);
    }

    #[test]
    fn test_first_stacked_item_snaps_to_grid() {
        let result = compute_auto_position(
            &module_bounds(),
            &[],
            &[],
            Size3::new(100.0, 50.0, 40.0),
            &PlacementConfig::default(),
        );
        assert!(result.snapped);
        assert_eq!(result.reason, PlacementReason::Stacked { layer: 0, column: 0 });
        // -249 snaps to -250, then clamps back inside the 1mm margin
        assert_relative_eq!(result.position.x, -249.0);
        assert_relative_eq!(result.position.y, -370.0);
        assert_relative_eq!(result.position.z, -229.0);
    }

    #[test]
    fn test_snapped_stack_rounds_up_off_the_item_below() {
        let bounds = module_bounds();
        let config = PlacementConfig::default();
        let size = Size3::uniform(100.0);
        let first = compute_auto_position(&bounds, &[], &[], size, &config);
        assert_eq!(first.position, Vec3::new(-249.0, -349.0, -199.0));

        let placed = [PlacedItem {
            id: "a",
            position: first.position,
            size,
        }];
        // slot centre y is -247; nearest -250 would touch the first box
        let second = compute_auto_position(&bounds, &placed, &[], size, &config);
        assert!(second.snapped);
        assert_eq!(second.position, Vec3::new(-240.0, -240.0, -190.0));

        let all = [placed[0], PlacedItem { id: "b", position: second.position, size }];
        assert!(compute_layout_warnings(&bounds, &all).is_empty());
    }

    #[test]
    fn test_snapped_stack_stays_inside_bounds() {
        let bounds = Aabb::centered(Size3::new(235.0, 165.0, 95.0));
        let config = PlacementConfig {
            default_snap_grid: 40.0,
            ..PlacementConfig::default()
        };
        let size = Size3::new(70.0, 50.0, 30.0);
        let mut placed: Vec<PlacedItem> = Vec::new();
        for id in ["a", "b", "c", "d", "e", "f"] {
            let result = compute_auto_position(&bounds, &placed, &[], size, &config);
            placed.push(PlacedItem {
                id,
                position: result.position,
                size,
            });
        }
        let warnings = compute_layout_warnings(&bounds, &placed);
        assert!(warnings.out_of_bounds.is_empty(), "{:?}", warnings);
    }

    #[test]
    fn test_stack_goes_up_then_wraps_column() {
        let bounds = Aabb::centered(Size3::new(300.0, 200.0, 100.0));
        let config = PlacementConfig::default();
        let size = Size3::new(100.0, 80.0, 50.0);
        let ids = ["a", "b", "c"];
        let mut placed: Vec<PlacedItem> = Vec::new();
        let mut reasons = Vec::new();
        for id in ids {
            let result = compute_auto_position(&bounds, &placed, &[], size, &config);
            reasons.push(result.reason);
            placed.push(PlacedItem {
                id,
                position: result.position,
                size,
            });
        }
        assert_eq!(
            reasons,
            vec![
                PlacementReason::Stacked { layer: 0, column: 0 },
                PlacementReason::Stacked { layer: 0, column: 0 },
                PlacementReason::Stacked { layer: 0, column: 1 },
            ]
        );
        assert!(placed[1].position.y > placed[0].position.y);
        assert!(placed[2].position.x > placed[0].position.x);
        assert!(compute_layout_warnings(&bounds, &placed).is_empty());
    }

    #[test]
    fn test_stack_wraps_to_new_layer() {
        let bounds = Aabb::centered(Size3::new(120.0, 100.0, 200.0));
        let config = PlacementConfig::default();
        let size = Size3::new(100.0, 90.0, 50.0);
        let first = compute_auto_position(&bounds, &[], &[], size, &config);
        let placed = [PlacedItem {
            id: "a",
            position: first.position,
            size,
        }];
        let second = compute_auto_position(&bounds, &placed, &[], size, &config);
        assert_eq!(second.reason, PlacementReason::Stacked { layer: 1, column: 0 });
        assert!(second.position.z > first.position.z);
        let all = [placed[0], PlacedItem { id: "b", position: second.position, size }];
        assert!(compute_layout_warnings(&bounds, &all).is_empty());
    }

    #[test]
    fn test_full_module_parks_item() {
        let bounds = Aabb::centered(Size3::uniform(100.0));
        let size = Size3::uniform(90.0);
        let placed = [PlacedItem {
            id: "a",
            position: Vec3::ZERO,
            size,
        }];
        let result = compute_auto_position(&bounds, &placed, &[], size, &PlacementConfig::default());
        assert_eq!(result.reason, PlacementReason::NoFreeSlot);
        assert!(!result.snapped);
    }

    #[test]
    fn test_align_strategies_ignore_existing_items() {
        let bounds = module_bounds();
        let size = Size3::new(100.0, 50.0, 40.0);
        let placed = [PlacedItem {
            id: "a",
            position: Vec3::ZERO,
            size,
        }];
        let center_rule = behavior(AutoPositionStrategy::AlignCenter, None);
        let center = compute_auto_position(&bounds, &placed, &[&center_rule], size, &PlacementConfig::default());
        assert_eq!(center.position, Vec3::ZERO);

        let front_rule = behavior(AutoPositionStrategy::AlignFront, None);
        let front = compute_auto_position(&bounds, &placed, &[&front_rule], size, &PlacementConfig::default());
        assert_eq!(front.position, Vec3::new(-249.0, -374.0, 229.0));
        assert_eq!(front.reason, PlacementReason::AlignFront);
    }

    #[test]
    fn test_snap_disabled_by_zero_grid() {
        let rule = behavior(AutoPositionStrategy::Stack, Some(0.0));
        let result = compute_auto_position(
            &module_bounds(),
            &[],
            &[&rule],
            Size3::new(100.0, 50.0, 40.0),
            &PlacementConfig::default(),
        );
        assert!(!result.snapped);
        assert_relative_eq!(result.position.x, -300.0 + 1.0 + 50.0);
    }

    #[test]
    fn test_result_always_inside_bounds() {
        let config = PlacementConfig::default();
        let margin = config.margin;
        for &(module, item) in &[
            (Size3::new(600.0, 800.0, 500.0), Size3::new(100.0, 50.0, 40.0)),
            (Size3::new(102.0, 52.0, 42.0), Size3::new(100.0, 50.0, 40.0)),
            (Size3::new(300.0, 300.0, 300.0), Size3::new(295.0, 10.0, 10.0)),
        ] {
            let bounds = Aabb::centered(module);
            let mut placed: Vec<PlacedItem> = Vec::new();
            for id in ["a", "b", "c", "d"] {
                let result = compute_auto_position(&bounds, &placed, &[], item, &config);
                let half = item.half();
                for axis in Axis::ALL {
                    assert!(result.position.get(axis) - half.get(axis) - margin >= bounds.min.get(axis) - 1e-9);
                    assert!(result.position.get(axis) + half.get(axis) + margin <= bounds.max.get(axis) + 1e-9);
                }
                placed.push(PlacedItem {
                    id,
                    position: result.position,
                    size: item,
                });
            }
        }
    }
}
