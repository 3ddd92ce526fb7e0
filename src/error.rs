//! Error types for project loading and the configure pipeline

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::config::ConfigError;
use crate::registry::RegistryError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Errors raised while loading a project file into a registry
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Failed to read project file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse project TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// A `[[rules]]` entry is missing a field its kind needs, or holds an unusable value
    #[error("invalid rule: {message}")]
    InvalidRule { span: Span, message: String },

    /// The registry refused a module or sub-model entry
    #[error("{source}")]
    Registry {
        span: Span,
        #[source]
        source: RegistryError,
    },
}

impl ProjectError {
    /// Byte range of the offending entry, when one is known
    pub fn span(&self) -> Option<Span> {
        match self {
            ProjectError::Io(_) => None,
            ProjectError::Toml(err) => err.span(),
            ProjectError::InvalidRule { span, .. } | ProjectError::Registry { span, .. } => {
                Some(span.clone())
            }
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let Some(span) = self.span() else {
            return self.to_string();
        };
        let message = match self {
            ProjectError::Toml(err) => err.message().to_string(),
            other => other.to_string(),
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(&message)
            .with_label(
                Label::new((filename, span))
                    .with_message(&message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

/// Errors that can occur during the configure pipeline
#[derive(Debug, Error)]
pub enum ConfigureError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("project error: {0}")]
    Project(#[from] ProjectError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}
