//! Configuration for text reports

/// Configuration options for the text report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// List every synthesized panel under its module
    pub show_panels: bool,

    /// List sub-models, their layout warnings and rule violations
    pub show_sub_models: bool,

    /// Digits after the decimal point for lengths
    pub precision: usize,

    /// Spaces per nesting level
    pub indent_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            show_panels: true,
            show_sub_models: true,
            precision: 1,
            indent_width: 2,
        }
    }
}

impl ReportConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_panels(mut self, show: bool) -> Self {
        self.show_panels = show;
        self
    }

    pub fn with_sub_models(mut self, show: bool) -> Self {
        self.show_sub_models = show;
        self
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }
}
