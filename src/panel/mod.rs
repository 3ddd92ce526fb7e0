//! Panel decomposition
//!
//! Turns a module's declared dimensions, material thickness and feature
//! counts into the concrete list of panels a workshop would cut. Pure: the
//! registry calls [`decompose`] and feeds the result into a [`PanelSet`].

pub mod decompose;
pub mod types;

pub use decompose::{decompose, DecompositionInput, Features};
pub use types::{Panel, PanelDiff, PanelRole, PanelSet, PanelSpec};
