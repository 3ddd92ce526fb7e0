//! Collision and containment checks for sub-models inside one module.
//!
//! Mirrors a layout lint pass: nothing here blocks a mutation, it only
//! reports which placed items collide with each other and which stick out
//! of the module.

use std::fmt;

use crate::geometry::{Aabb, Axis, Size3, Vec3};

/// Margin applied by [`compute_layout_warnings`]
pub const LAYOUT_MARGIN: f64 = 1.0;

/// A sub-model's current footprint in module space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedItem<'a> {
    pub id: &'a str,
    pub position: Vec3,
    pub size: Size3,
}

impl PlacedItem<'_> {
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, self.size)
    }
}

/// Category of layout defect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCategory {
    Collision,
    OutOfBounds,
}

impl fmt::Display for WarningCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningCategory::Collision => write!(f, "collision"),
            WarningCategory::OutOfBounds => write!(f, "out-of-bounds"),
        }
    }
}

/// One human-readable layout defect
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutWarning {
    pub category: WarningCategory,
    pub message: String,
}

/// Result of a layout check over one module
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutWarnings {
    /// Colliding pairs, in placement order
    pub collisions: Vec<(String, String)>,
    pub out_of_bounds: Vec<String>,
}

impl LayoutWarnings {
    pub fn is_empty(&self) -> bool {
        self.collisions.is_empty() && self.out_of_bounds.is_empty()
    }

    /// Flatten into display warnings
    pub fn to_warnings(&self) -> Vec<LayoutWarning> {
        let mut out = Vec::with_capacity(self.collisions.len() + self.out_of_bounds.len());
        for (a, b) in &self.collisions {
            out.push(LayoutWarning {
                category: WarningCategory::Collision,
                message: format!("sub-models \"{}\" and \"{}\" collide", a, b),
            });
        }
        for id in &self.out_of_bounds {
            out.push(LayoutWarning {
                category: WarningCategory::OutOfBounds,
                message: format!("sub-model \"{}\" extends past the module bounds", id),
            });
        }
        out
    }
}

/// Axis-aligned overlap test with both boxes inflated by `margin` on every side.
///
/// Boxes whose inflated intervals merely touch do not collide.
pub fn boxes_overlap(pos_a: Vec3, size_a: Size3, pos_b: Vec3, size_b: Size3, margin: f64) -> bool {
    Axis::ALL.iter().all(|&axis| {
        let reach = size_a.get(axis) / 2.0 + size_b.get(axis) / 2.0 + 2.0 * margin;
        (pos_a.get(axis) - pos_b.get(axis)).abs() < reach
    })
}

/// True when any face of the margin-inflated item lies outside `bounds` by more than `margin`
pub fn is_out_of_bounds(item: &PlacedItem<'_>, bounds: &Aabb, margin: f64) -> bool {
    let half = item.size.half();
    Axis::ALL.iter().any(|&axis| {
        let lo = item.position.get(axis) - half.get(axis) - margin;
        let hi = item.position.get(axis) + half.get(axis) + margin;
        bounds.min.get(axis) - lo > margin || hi - bounds.max.get(axis) > margin
    })
}

/// Check every pair of placed items for collisions and every item for containment.
pub fn compute_layout_warnings(bounds: &Aabb, items: &[PlacedItem<'_>]) -> LayoutWarnings {
    let mut warnings = LayoutWarnings::default();

    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let a = &items[i];
            let b = &items[j];
            if boxes_overlap(a.position, a.size, b.position, b.size, LAYOUT_MARGIN) {
                warnings.collisions.push((a.id.to_string(), b.id.to_string()));
            }
        }
    }

    for item in items {
        if is_out_of_bounds(item, bounds, LAYOUT_MARGIN) {
            warnings.out_of_bounds.push(item.id.to_string());
        }
    }

    warnings
}
