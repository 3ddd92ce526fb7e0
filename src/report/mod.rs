//! Plain-text reports over a populated registry
//!
//! Lists modules in flow order with their panels, sub-models, layout
//! warnings and rule violations.

pub mod config;
pub mod text;

pub use config::ReportConfig;
pub use text::{render_report, ReportBuilder};
