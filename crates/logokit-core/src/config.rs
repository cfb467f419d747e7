//! Editor configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::geometry::Point;

/// Settings shared by the scene, the project session and the export pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// viewBox written onto templates that lack one
    pub default_view_box: String,
    /// Class marking the selected element
    pub selected_class: String,
    /// Class marking the hovered element
    pub hover_class: String,
    /// Only wire nodes carrying an `editable*` class
    pub require_editable_class: bool,
    /// Font family for new text elements
    pub default_font_family: String,
    /// Font size (px) for new text elements
    pub default_font_size: f64,
    /// Anchor position for new text elements
    pub default_text_position: Point,
    pub export: ExportConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_view_box: "0 0 400 400".to_string(),
            selected_class: "selected-highlight".to_string(),
            hover_class: "hover-highlight".to_string(),
            require_editable_class: false,
            default_font_family: "Roboto".to_string(),
            default_font_size: 24.0,
            default_text_position: Point { x: 200.0, y: 350.0 },
            export: ExportConfig::default(),
        }
    }
}

impl EditorConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.export.validate()?;
        Ok(config)
    }
}

/// Raster export settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    /// Smallest allowed output edge in pixels
    pub min_pixels: u32,
    /// Largest allowed output edge in pixels
    pub max_pixels: u32,
    /// Fill painted under the logo; `None` keeps the bitmap transparent
    pub background: Option<String>,
    /// Family substituted for fonts that fail to load
    pub fallback_font_family: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            min_pixels: 50,
            max_pixels: 4096,
            background: Some("#FFFFFF".to_string()),
            fallback_font_family: "Arial".to_string(),
        }
    }
}

impl ExportConfig {
    /// The pixel range must be non-empty and allow at least one pixel.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pixels == 0 || self.min_pixels > self.max_pixels {
            return Err(ConfigError::PixelRange {
                min: self.min_pixels,
                max: self.max_pixels,
            });
        }
        Ok(())
    }
}
