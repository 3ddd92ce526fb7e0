//! Text report generation from a populated registry

use crate::geometry::{Size3, Vec3};
use crate::panel::Panel;
use crate::registry::{Module, ModuleRegistry, SubModel, SubModelViolation};

use super::ReportConfig;

/// Build report lines incrementally
pub struct ReportBuilder {
    config: ReportConfig,
    lines: Vec<String>,
    indent: usize,
}

impl ReportBuilder {
    /// Create a new report builder
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            lines: vec![],
            indent: 0,
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Append a line at the current nesting level
    pub fn line(&mut self, text: impl AsRef<str>) {
        let pad = " ".repeat(self.indent * self.config.indent_width);
        self.lines.push(format!("{}{}", pad, text.as_ref()));
    }

    pub fn push_indent(&mut self) {
        self.indent += 1;
    }

    pub fn pop_indent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn length(&self, value: f64) -> String {
        format!("{:.*}", self.config.precision, value)
    }

    pub fn point(&self, p: Vec3) -> String {
        format!(
            "({}, {}, {})",
            self.length(p.x),
            self.length(p.y),
            self.length(p.z)
        )
    }

    pub fn size(&self, s: Size3) -> String {
        format!(
            "{} x {} x {}",
            self.length(s.width),
            self.length(s.height),
            self.length(s.depth)
        )
    }

    /// Join all lines; no trailing newline
    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

/// Render a registry to a plain-text report
pub fn render_report(registry: &ModuleRegistry, config: &ReportConfig) -> String {
    let mut builder = ReportBuilder::new(config.clone());
    let modules = registry.modules_in_order();

    let panels: usize = modules.iter().map(|m| m.panels().len()).sum();
    let sub_models: usize = modules.iter().map(|m| m.sub_models().len()).sum();
    builder.line(format!(
        "modules: {}, panels: {}, sub-models: {}",
        modules.len(),
        panels,
        sub_models
    ));

    let camera = registry.camera_target();
    let framing = match camera.bounds {
        Some(bounds) => format!(
            " framing {} .. {}",
            builder.point(bounds.min),
            builder.point(bounds.max)
        ),
        None => String::new(),
    };
    builder.line(format!("camera: {}{}", builder.point(camera.center), framing));

    for module in modules {
        render_module(registry, module, &mut builder);
    }

    builder.build()
}

fn render_module(registry: &ModuleRegistry, module: &Module, builder: &mut ReportBuilder) {
    let mut header = format!(
        "module {} #{} {} at {}",
        module.id(),
        module.index(),
        builder.size(module.size()),
        builder.point(module.position())
    );
    if module.is_manual() {
        header.push_str(" manual");
    }
    if module.is_cad_only() {
        header.push_str(" cad-only");
    }
    if let Some(material) = module.material() {
        header.push_str(&format!(" material={}", material));
    }
    if module.rotation() != 0.0 {
        header.push_str(&format!(" rotation={}", builder.length(module.rotation())));
    }
    builder.line(header);

    builder.push_indent();
    if builder.config().show_panels {
        for panel in module.panels().iter() {
            render_panel(panel, builder);
        }
    }
    if builder.config().show_sub_models {
        for sub in module.sub_models() {
            render_sub_model(sub, builder);
        }
        if let Ok(warnings) = registry.layout_warnings(module.id()) {
            for warning in warnings.to_warnings() {
                builder.line(format!("warning {}: {}", warning.category, warning.message));
            }
        }
        if let Ok(violations) = registry.validate_module(module.id()) {
            for violation in &violations {
                render_violation(violation, builder);
            }
        }
    }
    builder.pop_indent();
}

fn render_panel(panel: &Panel, builder: &mut ReportBuilder) {
    let line = format!(
        "panel {} {} at {}",
        panel.role,
        builder.size(panel.size),
        builder.point(panel.position)
    );
    builder.line(line);
}

fn render_sub_model(sub: &SubModel, builder: &mut ReportBuilder) {
    let size = match sub.size {
        Some(size) => builder.size(size),
        None => "size unknown".to_string(),
    };
    let mut line = format!(
        "sub-model {} [{}] {} at {}",
        sub.instance_id,
        sub.model,
        size,
        builder.point(sub.position)
    );
    if let Some(material) = &sub.material {
        line.push_str(&format!(" material={}", material));
    }
    if sub.asset.is_none() {
        line.push_str(" (loading)");
    }
    builder.line(line);
}

fn render_violation(violation: &SubModelViolation, builder: &mut ReportBuilder) {
    let v = &violation.violation;
    builder.line(format!(
        "{} {} [{}]: {}",
        v.severity, v.rule_id, violation.instance_id, v.message
    ));
}
