//! Error types.
//!
//! Only conditions the caller must surface are modelled as errors. Lookups of
//! unknown element ids are expected during normal interaction and are reported
//! through `bool`/`Option` returns instead.

use thiserror::Error;

/// The input could not be turned into an SVG document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The markup is not well-formed XML.
    #[error("malformed SVG markup: {0}")]
    Xml(#[from] roxmltree::Error),
    /// The document parsed, but its root element is not `<svg>`.
    #[error("root element is <{0}>, expected <svg>")]
    NotSvg(String),
}

/// An [`EditorConfig`](crate::config::EditorConfig) that cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid editor config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("export pixel range {min}..={max} is empty")]
    PixelRange { min: u32, max: u32 },
}

/// Writing a document back out as XML failed.
#[derive(Debug, Error)]
#[error("failed to write SVG markup: {0}")]
pub struct DomError(#[from] std::io::Error);

/// Mounting or rewriting a document failed. A failed mount leaves nothing
/// mounted.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("no container id given to mount into")]
    MissingContainer,
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// A font could not be provided by a [`FontLoader`](crate::catalog::FontLoader).
///
/// Never escapes the export pipeline: text falls back to the configured
/// fallback family instead.
#[derive(Debug, Clone, Error)]
#[error("font {family:?} unavailable: {reason}")]
pub struct FontLoadError {
    pub family: String,
    pub reason: String,
}

impl FontLoadError {
    pub fn new(family: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            reason: reason.into(),
        }
    }
}

/// Export failures that must be shown to the user.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error("invalid export scale {0}; expected a positive finite number")]
    InvalidScale(f32),
    #[error("could not rasterize the logo ({0}); try SVG export instead")]
    Rasterize(String),
    #[error("could not encode PNG: {0}")]
    Encode(String),
}

/// Errors from the project session.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("template {0:?} not found")]
    TemplateNotFound(String),
    #[error("template {0:?} has no loadable content")]
    TemplateUnavailable(String),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("no logo is loaded")]
    NothingMounted,
    #[error(transparent)]
    Export(#[from] ExportError),
}
