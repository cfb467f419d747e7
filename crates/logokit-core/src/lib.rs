//! logokit - SVG scene-graph editing engine for geometric logo templates
//!
//! Loads template markup, tracks editable elements, handles selection and
//! in-place edits of style, transform and text, recolors by palette role, and
//! exports the result as SVG or PNG.
//!
//! # Example
//!
//! ```ignore
//! use logokit_core::{ClickTarget, Color, Palette, Project, StylePatch, TextPatch};
//!
//! let mut project = Project::new();
//! project.load_svg(r#"<svg viewBox="0 0 400 400">
//!     <rect id="bg" class="primary-color-element" width="400" height="400"/>
//! </svg>"#)?;
//!
//! project.click(&ClickTarget::Element("bg".into()));
//! project.update_style("bg", &StylePatch::fill(Color::new(0x0B, 0x3C, 0x5D)));
//! let id = project.add_text(&TextPatch::content("Acme")).unwrap();
//!
//! println!("{}", project.svg().unwrap());
//! ```

pub mod catalog;
pub mod color;
pub mod config;
pub mod dom;
pub mod error;
pub mod export;
pub mod geometry;
pub mod palette;
pub mod project;
pub mod registry;
pub mod scene;
pub mod style;
pub mod text;
pub mod transform;
mod time;

pub use catalog::{FontLoader, MemoryFonts, MemoryTemplates, Template, TemplateCatalog};
pub use color::{Color, WcagLevel, contrast_ratio, hex_to_rgb, pick_text_color, rgb_to_hex};
pub use config::{EditorConfig, ExportConfig};
pub use error::{ConfigError, DomError, ExportError, FontLoadError, ParseError, ProjectError, SceneError};
pub use export::{PngImage, SvgBlob, prepare_for_publishing, to_png, to_svg};
pub use geometry::Point;
pub use palette::{BuiltinPalettes, Palette, PaletteCatalog, recolor, variants};
pub use project::{Project, SelectedState};
pub use registry::{Descriptors, ElementDescriptor, Role};
pub use scene::{ClickTarget, Scene};
pub use style::{Paint, Style, StylePatch};
pub use text::{FontWeight, TextAlign, TextElement, TextKind, TextPatch};
pub use transform::{Transform, TransformPatch, TransformValues};

/// Parse template markup into element descriptors without mounting it.
pub fn parse_descriptors(svg: &str) -> Result<Descriptors, ParseError> {
    registry::parse(svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_descriptors() {
        let descriptors = parse_descriptors(
            r##"<svg xmlns="http://www.w3.org/2000/svg"><circle id="c" r="4" fill="#0B3C5D"/><text>Hi</text></svg>"##,
        )
        .unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors["c"].style.fill.color(), hex_to_rgb("#0B3C5D"));
    }

    #[test]
    fn test_not_svg() {
        let err = parse_descriptors("<html/>").unwrap_err();
        assert!(matches!(err, ParseError::NotSvg(ref tag) if tag == "html"));
    }
}
