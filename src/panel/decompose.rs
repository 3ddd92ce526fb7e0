//! Panel decomposition: module dimensions and feature counts to named panels
//!
//! The module centre is the origin. Top and bottom span the full footprint,
//! the sides butt between them, the back hangs behind the nominal depth and
//! doors hang in front of it. Interior pieces (shelves, drawers) are sized to
//! the opening between the sides.

use tracing::warn;

use crate::config::PanelConfig;
use crate::geometry::{floor_dimension, Size3, Vec3};

use super::types::{PanelRole, PanelSpec};

/// Feature counts that add interior or front panels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Features {
    pub shelves: u32,
    pub doors: u32,
    pub drawers: u32,
}

impl Features {
    pub fn new(shelves: u32, doors: u32, drawers: u32) -> Self {
        Self {
            shelves,
            doors,
            drawers,
        }
    }
}

/// Everything decomposition needs to know about a module
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecompositionInput {
    pub size: Size3,
    pub thickness: f64,
    pub back_thickness: f64,
    pub features: Features,
}

/// Tracks whether any derived length had to be raised to the floor
struct Clamp {
    min: f64,
    hit: bool,
}

impl Clamp {
    fn len(&mut self, value: f64) -> f64 {
        if value > self.min {
            value
        } else {
            self.hit = true;
            self.min
        }
    }
}

/// Decompose a module into its panel list.
///
/// Deterministic: the same input always yields the same panels in the same
/// order (carcass, shelves, doors, drawers). A zero feature count yields no
/// panels for that feature. Any derived length that would be zero or negative
/// is clamped to `config.min_dimension`.
pub fn decompose(input: &DecompositionInput, config: &PanelConfig) -> Vec<PanelSpec> {
    let min = config.min_dimension;
    let size = input.size.floored(min);
    let (w, h, d) = (size.width, size.height, size.depth);
    let t = floor_dimension(input.thickness, min);
    let bt = floor_dimension(input.back_thickness, min);
    let mut clamp = Clamp { min, hit: false };

    let mut panels = Vec::with_capacity(
        5 + (input.features.shelves + input.features.doors + input.features.drawers) as usize,
    );

    // Carcass
    let top_y = h / 2.0 - t / 2.0;
    for (role, y) in [(PanelRole::Top, top_y), (PanelRole::Bottom, -top_y)] {
        panels.push(PanelSpec {
            role,
            size: Size3::new(w, t, d),
            position: Vec3::new(0.0, y, 0.0),
        });
    }

    let interior_h = clamp.len(h - 2.0 * t);
    let side_x = w / 2.0 - t / 2.0;
    for (role, x) in [(PanelRole::LeftSide, -side_x), (PanelRole::RightSide, side_x)] {
        panels.push(PanelSpec {
            role,
            size: Size3::new(t, interior_h, d),
            position: Vec3::new(x, 0.0, 0.0),
        });
    }

    panels.push(PanelSpec {
        role: PanelRole::Back,
        size: Size3::new(w, h, bt),
        position: Vec3::new(0.0, 0.0, -(d / 2.0 + bt / 2.0)),
    });

    let opening_w = clamp.len(w - 2.0 * t);
    let inner_d = clamp.len(d - bt);
    let interior_floor = -h / 2.0 + t;

    // Shelves rest on the N interior gap boundaries, back edge on the clearance plane
    let shelves = input.features.shelves as usize;
    if shelves > 0 {
        let gap = interior_h / (shelves + 1) as f64;
        let shelf_w = clamp.len(opening_w - config.shelf_side_clearance);
        let shelf_z = -d / 2.0 + bt + inner_d / 2.0;
        for i in 0..shelves {
            panels.push(PanelSpec {
                role: PanelRole::Shelf(i),
                size: Size3::new(shelf_w, t, inner_d),
                position: Vec3::new(0.0, interior_floor + gap * (i + 1) as f64, shelf_z),
            });
        }
    }

    let doors = input.features.doors.min(config.max_doors) as usize;
    if doors < input.features.doors as usize {
        warn!(
            requested = input.features.doors,
            max = config.max_doors,
            "door count clamped"
        );
    }
    if doors > 0 {
        let door_w = clamp.len(opening_w / doors as f64);
        let door_z = d / 2.0 + t / 2.0;
        for i in 0..doors {
            panels.push(PanelSpec {
                role: PanelRole::Door(i),
                size: Size3::new(door_w, h, t),
                position: Vec3::new(-opening_w / 2.0 + door_w * (i as f64 + 0.5), 0.0, door_z),
            });
        }
    }

    // Drawers split the interior height evenly and sit flush with the front
    let drawers = input.features.drawers as usize;
    if drawers > 0 {
        let slice = clamp.len(interior_h / drawers as f64);
        let drawer_z = d / 2.0 - inner_d / 2.0;
        for i in 0..drawers {
            panels.push(PanelSpec {
                role: PanelRole::Drawer(i),
                size: Size3::new(opening_w, slice, inner_d),
                position: Vec3::new(0.0, interior_floor + slice * (i as f64 + 0.5), drawer_z),
            });
        }
    }

    if clamp.hit {
        warn!(
            width = w,
            height = h,
            depth = d,
            thickness = t,
            "degenerate panel dimensions clamped to minimum"
        );
    }

    panels
}
