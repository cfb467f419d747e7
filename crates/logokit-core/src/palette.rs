//! Color palettes and palette application on raw markup.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::dom::Document;
use crate::error::SceneError;
use crate::registry::{Role, is_editable, role_of};
use crate::style::{StylePatch, write_style};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub id: String,
    pub name: String,
    pub primary: Color,
    pub secondary: Color,
    pub accent: Color,
}

impl Palette {
    pub fn new(id: impl Into<String>, name: impl Into<String>, primary: Color, secondary: Color, accent: Color) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            primary,
            secondary,
            accent,
        }
    }

    pub fn color_for(&self, role: Role) -> Color {
        match role {
            Role::Primary => self.primary,
            Role::Secondary => self.secondary,
            Role::Accent => self.accent,
        }
    }
}

/// Source of named palettes.
pub trait PaletteCatalog {
    fn palette(&self, id: &str) -> Option<Palette>;
    fn palettes(&self) -> Vec<Palette>;
}

/// The five schemes the editor ships with.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinPalettes;

impl BuiltinPalettes {
    fn all() -> [Palette; 5] {
        [
            Palette::new("modern", "Modern", hex(0x0B3C5D), hex(0x328CC1), hex(0xD9B310)),
            Palette::new("vibrant", "Vibrant", hex(0xD81159), hex(0x8F2D56), hex(0xFFBC42)),
            Palette::new("minimal", "Minimal", hex(0x2D3142), hex(0x4F5D75), hex(0xBFC0C0)),
            Palette::new("nature", "Nature", hex(0x3A6B35), hex(0xCBD18F), hex(0xE3B448)),
            Palette::new("tech", "Tech", hex(0x6C63FF), hex(0x536DFE), hex(0xF50057)),
        ]
    }
}

impl PaletteCatalog for BuiltinPalettes {
    fn palette(&self, id: &str) -> Option<Palette> {
        Self::all().into_iter().find(|p| p.id == id)
    }

    fn palettes(&self) -> Vec<Palette> {
        Self::all().to_vec()
    }
}

const fn hex(rgb: u32) -> Color {
    Color::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

/// Palettes used to preview a logo in alternative colors.
pub fn default_variant_palettes() -> Vec<Palette> {
    [
        (hex(0x1E88E5), hex(0x64B5F6), hex(0xFFC107)),
        (hex(0x43A047), hex(0x81C784), hex(0xFF5722)),
        (hex(0x6D4C41), hex(0xA1887F), hex(0xFFCA28)),
        (hex(0x5E35B1), hex(0x9575CD), hex(0x4DD0E1)),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (primary, secondary, accent))| {
        Palette::new(format!("variant-{i}"), format!("Variant {}", i + 1), primary, secondary, accent)
    })
    .collect()
}

/// Set the fill of every editable, role-bearing element to its palette slot.
/// Elements without a role keep their fill. Returns the number recolored.
pub(crate) fn apply_to_document(doc: &mut Document, palette: &Palette) -> usize {
    let mut changed = 0;
    for node in doc.descendant_elements(doc.root()) {
        if !is_editable(doc, node) {
            continue;
        }
        if let Some(role) = role_of(doc, node) {
            write_style(doc, node, &StylePatch::fill(palette.color_for(role)));
            changed += 1;
        }
    }
    changed
}

/// Recolor markup without mounting it.
pub fn recolor(svg: &str, palette: &Palette) -> Result<String, SceneError> {
    let mut doc = Document::parse(svg)?;
    apply_to_document(&mut doc, palette);
    Ok(doc.to_xml()?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub palette_id: String,
    pub name: String,
    pub svg: String,
}

/// One recolored copy of `svg` per palette.
pub fn variants(svg: &str, palettes: &[Palette]) -> Result<Vec<Variant>, SceneError> {
    palettes
        .iter()
        .map(|palette| {
            Ok(Variant {
                palette_id: palette.id.clone(),
                name: palette.name.clone(),
                svg: recolor(svg, palette)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGO: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 400 400"><rect id="a" class="primary-color-element" fill="#000000"/><circle id="b" class="secondary-color-element"/><path id="c" data-role="accent" style="fill: #123456"/><path id="d" fill="#ABCDEF"/></svg>"##;

    #[test]
    fn test_builtin_palettes() {
        let catalog = BuiltinPalettes;
        assert_eq!(catalog.palettes().len(), 5);
        let modern = catalog.palette("modern").unwrap();
        assert_eq!(modern.primary.to_hex(), "#0B3C5D");
        assert_eq!(modern.accent.to_hex(), "#D9B310");
        assert_eq!(catalog.palette("tech").unwrap().secondary.to_hex(), "#536DFE");
        assert!(catalog.palette("neon").is_none());
    }

    #[test]
    fn test_recolor_by_role() {
        let palette = Palette::new("t", "Test", hex(0x111111), hex(0x222222), hex(0x333333));
        let out = recolor(LOGO, &palette).unwrap();
        let doc = Document::parse(&out).unwrap();
        let fill = |id: &str| doc.attr(doc.find_by_id(id).unwrap(), "fill").map(str::to_string);
        assert_eq!(fill("a").as_deref(), Some("#111111"));
        assert_eq!(fill("b").as_deref(), Some("#222222"));
        assert_eq!(fill("c").as_deref(), Some("#333333"));
        assert_eq!(fill("d").as_deref(), Some("#ABCDEF"));
        assert_eq!(doc.attr(doc.find_by_id("c").unwrap(), "style"), None);
    }

    #[test]
    fn test_recolor_skips_non_rendered_content() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg"><defs><path id="p" class="primary-color-element" fill="#000000"/></defs><linearGradient id="g" class="accent-color-element"/><rect id="r" class="primary-color-element"/></svg>"##;
        let palette = Palette::new("t", "Test", hex(0x111111), hex(0x222222), hex(0x333333));
        let mut doc = Document::parse(svg).unwrap();
        assert_eq!(apply_to_document(&mut doc, &palette), 1);
        assert_eq!(doc.attr(doc.find_by_id("p").unwrap(), "fill"), Some("#000000"));
        assert_eq!(doc.attr(doc.find_by_id("g").unwrap(), "fill"), None);
        assert_eq!(doc.attr(doc.find_by_id("r").unwrap(), "fill"), Some("#111111"));
    }

    #[test]
    fn test_default_variants() {
        let palettes = default_variant_palettes();
        assert_eq!(palettes.len(), 4);
        assert_eq!(palettes[0].primary.to_hex(), "#1E88E5");
        assert_eq!(palettes[3].accent.to_hex(), "#4DD0E1");

        let variants = variants(LOGO, &palettes).unwrap();
        assert_eq!(variants.len(), 4);
        assert_eq!(variants[1].palette_id, "variant-1");
        assert!(variants[1].svg.contains(r##"fill="#43A047""##));
    }

    #[test]
    fn test_recolor_rejects_bad_markup() {
        let palette = default_variant_palettes().remove(0);
        assert!(recolor("<svg", &palette).is_err());
    }
}
