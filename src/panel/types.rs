//! Panel records and the per-module panel set

use std::fmt;

use crate::geometry::{Size3, Vec3};

/// Role of one manufactured panel within its module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PanelRole {
    Top,
    Bottom,
    LeftSide,
    RightSide,
    Back,
    Shelf(usize),
    Door(usize),
    Drawer(usize),
}

impl PanelRole {
    /// True for the five carcass panels every parametric module has
    pub fn is_carcass(&self) -> bool {
        matches!(
            self,
            PanelRole::Top
                | PanelRole::Bottom
                | PanelRole::LeftSide
                | PanelRole::RightSide
                | PanelRole::Back
        )
    }
}

impl fmt::Display for PanelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelRole::Top => write!(f, "top"),
            PanelRole::Bottom => write!(f, "bottom"),
            PanelRole::LeftSide => write!(f, "left"),
            PanelRole::RightSide => write!(f, "right"),
            PanelRole::Back => write!(f, "back"),
            PanelRole::Shelf(i) => write!(f, "shelf-{}", i),
            PanelRole::Door(i) => write!(f, "door-{}", i),
            PanelRole::Drawer(i) => write!(f, "drawer-{}", i),
        }
    }
}

/// Output of decomposition: what a panel should be, before it has identity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelSpec {
    pub role: PanelRole,
    pub size: Size3,
    /// Offset of the panel centre from the module centre
    pub position: Vec3,
}

/// A live panel owned by a module
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    /// Stable for as long as the panel's role survives resynthesis
    pub serial: u64,
    pub role: PanelRole,
    pub size: Size3,
    pub position: Vec3,
}

/// Roles touched by one resynthesis pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelDiff {
    pub inserted: Vec<PanelRole>,
    pub updated: Vec<PanelRole>,
    pub removed: Vec<PanelRole>,
}

impl PanelDiff {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Ordered set of panels belonging to one module
#[derive(Debug, Clone, Default)]
pub struct PanelSet {
    panels: Vec<Panel>,
    next_serial: u64,
}

impl PanelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh set from decomposition output
    pub fn from_specs(specs: Vec<PanelSpec>) -> Self {
        let mut set = Self::new();
        set.resynthesize(specs);
        set
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Panel> {
        self.panels.iter()
    }

    /// Look up a panel by role
    pub fn get(&self, role: PanelRole) -> Option<&Panel> {
        self.panels.iter().find(|p| p.role == role)
    }

    /// Roles in decomposition order
    pub fn roles(&self) -> Vec<PanelRole> {
        self.panels.iter().map(|p| p.role).collect()
    }

    /// Drop every panel, reporting the released roles
    pub fn clear(&mut self) -> Vec<PanelRole> {
        self.panels.drain(..).map(|p| p.role).collect()
    }

    /// Replace every panel with a fresh record, as after a feature-count change.
    ///
    /// No serial survives, even for roles present on both sides.
    pub fn regenerate(&mut self, specs: Vec<PanelSpec>) -> PanelDiff {
        let mut removed = self.clear();
        removed.sort();
        let mut diff = self.resynthesize(specs);
        diff.removed = removed;
        diff
    }

    /// Replace geometry with a new decomposition.
    ///
    /// Panels whose role appears in `specs` keep their record and serial and
    /// only receive the new size and position. Roles missing from `specs` are
    /// destroyed; new roles get fresh records.
    pub fn resynthesize(&mut self, specs: Vec<PanelSpec>) -> PanelDiff {
        let mut diff = PanelDiff::default();
        let mut old: Vec<Panel> = std::mem::take(&mut self.panels);

        for spec in specs {
            match old.iter().position(|p| p.role == spec.role) {
                Some(idx) => {
                    let mut panel = old.swap_remove(idx);
                    panel.size = spec.size;
                    panel.position = spec.position;
                    diff.updated.push(spec.role);
                    self.panels.push(panel);
                }
                None => {
                    self.panels.push(Panel {
                        serial: self.next_serial,
                        role: spec.role,
                        size: spec.size,
                        position: spec.position,
                    });
                    self.next_serial += 1;
                    diff.inserted.push(spec.role);
                }
            }
        }

        old.sort_by_key(|p| p.role);
        diff.removed = old.into_iter().map(|p| p.role).collect();
        diff
    }
}
