//! Export pipeline: SVG pass-through and PNG rasterization.
//!
//! Rasterization always works on its own copy of the markup, so callers can
//! serialize the scene synchronously and await the export afterwards.

use std::collections::HashSet;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::join_all;
use log::{debug, warn};
use resvg::tiny_skia::{self, Pixmap};
use resvg::usvg::{self, fontdb};

use crate::catalog::FontLoader;
use crate::color::Color;
use crate::config::ExportConfig;
use crate::dom::{Document, NodeId, SVG_NAMESPACE};
use crate::error::ExportError;
use crate::geometry::parse_view_box;
use crate::style::{property, remove_inline};
use crate::transform::format_number;

pub const SVG_MIME: &str = "image/svg+xml";
pub const PNG_MIME: &str = "image/png";

/// Edge length assumed when a document declares no size at all.
const FALLBACK_EDGE: f64 = 400.0;

const TEXT_TAGS: [&str; 3] = ["text", "tspan", "textPath"];

/// Serialized markup ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgBlob {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Wrap serialized markup as-is.
pub fn to_svg(serialized: &str) -> SvgBlob {
    SvgBlob {
        mime: SVG_MIME,
        bytes: serialized.as_bytes().to_vec(),
    }
}

/// Encoded PNG plus its pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngImage {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl PngImage {
    pub fn to_data_url(&self) -> String {
        format!("data:{PNG_MIME};base64,{}", STANDARD.encode(&self.bytes))
    }
}

// ============================================================================
// Sizing
// ============================================================================

/// Intrinsic size in user units: the viewBox when present, else numeric
/// `width`/`height` on the root.
pub fn intrinsic_size(doc: &Document) -> Option<(f64, f64)> {
    let root = doc.root();
    if let Some(view_box) = doc.attr(root, "viewBox").and_then(parse_view_box) {
        return Some((view_box.width(), view_box.height()));
    }
    let width = doc.attr_f64(root, "width").filter(|w| *w > 0.0)?;
    let height = doc.attr_f64(root, "height").filter(|h| *h > 0.0)?;
    Some((width, height))
}

/// Bitmap size for `intrinsic * scale`.
///
/// Both edges share one factor so the aspect ratio is kept: the longer edge
/// is capped at `max_pixels` and the shorter edge is raised towards
/// `min_pixels` as far as that cap allows. An inverted range is read as
/// `max_pixels` for both bounds.
pub fn output_size(intrinsic: (f64, f64), scale: f32, config: &ExportConfig) -> (u32, u32) {
    let max = config.max_pixels.max(1);
    let max_edge = f64::from(max);
    let min_edge = f64::from(config.min_pixels).min(max_edge);

    let width = intrinsic.0 * f64::from(scale);
    let height = intrinsic.1 * f64::from(scale);
    let (short, long) = (width.min(height), width.max(height));
    let factor = if long > max_edge {
        max_edge / long
    } else if short < min_edge {
        (min_edge / short).min(max_edge / long)
    } else {
        1.0
    };
    let edge = |length: f64| ((length * factor).round() as u32).clamp(1, max);
    (edge(width), edge(height))
}

// ============================================================================
// Fonts
// ============================================================================

/// First family of a `font-family` list, unquoted.
fn primary_family(raw: &str) -> Option<String> {
    let first = raw.split(',').next()?.trim().trim_matches(|c| c == '"' || c == '\'');
    (!first.is_empty()).then(|| first.to_string())
}

fn text_nodes(doc: &Document) -> Vec<NodeId> {
    doc.descendant_elements(doc.root())
        .into_iter()
        .filter(|node| doc.tag(*node).is_some_and(|tag| TEXT_TAGS.contains(&tag)))
        .collect()
}

/// Families used by text in the document, in first-use order.
pub fn font_families(doc: &Document) -> Vec<String> {
    let mut seen = HashSet::new();
    text_nodes(doc)
        .into_iter()
        .filter_map(|node| property(doc, node, "font-family").and_then(primary_family))
        .filter(|family| seen.insert(family.clone()))
        .collect()
}

/// Point text using a family in `missing` at `fallback`. Returns how many
/// nodes changed.
fn substitute_fonts(doc: &mut Document, missing: &HashSet<String>, fallback: &str) -> usize {
    let mut changed = 0;
    for node in text_nodes(doc) {
        let uses_missing = property(doc, node, "font-family")
            .and_then(primary_family)
            .is_some_and(|family| missing.contains(&family));
        if uses_missing {
            remove_inline(doc, node, "font-family");
            doc.set_attr(node, "font-family", fallback);
            changed += 1;
        }
    }
    changed
}

/// Request every family (and the fallback) concurrently. Families that fail
/// are returned so the caller can substitute them.
async fn load_fonts(
    families: &[String],
    fallback: &str,
    loader: &impl FontLoader,
) -> (fontdb::Database, HashSet<String>) {
    let mut requested: Vec<&str> = families.iter().map(String::as_str).collect();
    if !requested.contains(&fallback) {
        requested.push(fallback);
    }

    let results = join_all(requested.iter().map(|family| loader.load_font(family))).await;

    let mut db = fontdb::Database::new();
    let mut missing = HashSet::new();
    for (family, result) in requested.into_iter().zip(results) {
        match result {
            Ok(data) => db.load_font_data(data),
            Err(err) if family == fallback => {
                warn!("{err}; text without a loaded font will not be drawn");
            }
            Err(err) => {
                warn!("{err}; falling back to {fallback:?}");
                missing.insert(family.to_string());
            }
        }
    }
    (db, missing)
}

// ============================================================================
// Rasterization
// ============================================================================

/// Rasterize serialized markup at `scale`.
///
/// Fonts used by text are awaited before drawing; a font that cannot be
/// loaded is replaced by the configured fallback family. Markup that cannot
/// be drawn is an error, never an empty image.
pub async fn to_png(
    svg: &str,
    scale: f32,
    config: &ExportConfig,
    fonts: &impl FontLoader,
) -> Result<PngImage, ExportError> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(ExportError::InvalidScale(scale));
    }

    let mut doc = Document::parse(svg)?;
    let (width, height) = intrinsic_size(&doc).unwrap_or_else(|| {
        debug!("document declares no size; assuming {FALLBACK_EDGE}x{FALLBACK_EDGE}");
        (FALLBACK_EDGE, FALLBACK_EDGE)
    });
    let (pixel_width, pixel_height) = output_size((width, height), scale, config);

    // Percentage sizes mean nothing without a layout box.
    let root = doc.root();
    if doc.attr(root, "xmlns").is_none() {
        doc.set_attr(root, "xmlns", SVG_NAMESPACE);
    }
    doc.set_attr(root, "width", format_number(width));
    doc.set_attr(root, "height", format_number(height));

    let families = font_families(&doc);
    let (db, missing) = if families.is_empty() {
        (fontdb::Database::new(), HashSet::new())
    } else {
        load_fonts(&families, &config.fallback_font_family, fonts).await
    };
    if !missing.is_empty() {
        substitute_fonts(&mut doc, &missing, &config.fallback_font_family);
    }

    let markup = doc.to_xml()?;
    let mut options = usvg::Options::default();
    options.font_family = config.fallback_font_family.clone();
    options.fontdb = Arc::new(db);
    let tree = usvg::Tree::from_str(&markup, &options).map_err(|e| ExportError::Rasterize(e.to_string()))?;
    if tree.root().children().is_empty() {
        return Err(ExportError::Rasterize("the logo has nothing to draw".to_string()));
    }

    let mut pixmap = Pixmap::new(pixel_width, pixel_height).ok_or_else(|| {
        ExportError::Rasterize(format!("cannot allocate a {pixel_width}x{pixel_height} bitmap"))
    })?;
    if let Some(background) = config.background.as_deref() {
        match Color::parse(background) {
            Some(c) => pixmap.fill(tiny_skia::Color::from_rgba8(c.r, c.g, c.b, 255)),
            None => warn!("ignoring unparseable export background {background:?}"),
        }
    }

    let size = tree.size();
    let zoom = (pixel_width as f32 / size.width()).min(pixel_height as f32 / size.height());
    let transform = tiny_skia::Transform::from_scale(zoom, zoom);
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let bytes = pixmap.encode_png().map_err(|e| ExportError::Encode(e.to_string()))?;
    debug!("exported {pixel_width}x{pixel_height} PNG ({} bytes)", bytes.len());
    Ok(PngImage {
        width: pixel_width,
        height: pixel_height,
        bytes,
    })
}

/// Append a `<metadata id="logo-metadata">` block with one `<meta>` per pair.
pub fn prepare_for_publishing<I, K, V>(svg: &str, metadata: I) -> Result<String, ExportError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut doc = Document::parse(svg)?;
    let block = doc.create_element("metadata");
    doc.set_attr(block, "id", "logo-metadata");
    for (name, value) in metadata {
        let meta = doc.create_element("meta");
        doc.set_attr(meta, "name", name.as_ref());
        doc.set_text_content(meta, value.as_ref());
        doc.append_child(block, meta);
    }
    let root = doc.root();
    doc.append_child(root, block);
    Ok(doc.to_xml()?)
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::catalog::MemoryFonts;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10" width="100%" height="100%"><rect width="5" height="10" fill="#FF0000"/></svg>"##;

    #[test]
    fn test_intrinsic_size() {
        let doc = Document::parse(SQUARE).unwrap();
        assert_eq!(intrinsic_size(&doc), Some((10.0, 10.0)));

        let doc = Document::parse(r#"<svg width="120px" height="60"/>"#).unwrap();
        assert_eq!(intrinsic_size(&doc), Some((120.0, 60.0)));

        let doc = Document::parse(r#"<svg width="100%" height="100%"/>"#).unwrap();
        assert_eq!(intrinsic_size(&doc), None);
    }

    #[test]
    fn test_output_size_is_clamped() {
        let config = ExportConfig::default();
        assert_eq!(output_size((400.0, 400.0), 2.0, &config), (800, 800));
        assert_eq!(output_size((400.0, 200.0), 0.1, &config), (100, 50));
        assert_eq!(output_size((400.0, 400.0), 20.0, &config), (4096, 4096));
    }

    #[test]
    fn test_output_size_keeps_aspect_ratio() {
        let config = ExportConfig::default();
        assert_eq!(output_size((1200.0, 300.0), 4.0, &config), (4096, 1024));
        assert_eq!(output_size((300.0, 1200.0), 4.0, &config), (1024, 4096));
        // Raising the short edge to the minimum would overflow the long one.
        assert_eq!(output_size((4000.0, 10.0), 1.0, &config), (4096, 10));
    }

    #[test]
    fn test_inverted_pixel_range_does_not_panic() {
        let config = ExportConfig {
            min_pixels: 500,
            max_pixels: 200,
            ..ExportConfig::default()
        };
        assert_eq!(output_size((10.0, 10.0), 1.0, &config), (200, 200));
        let png = block_on(to_png(SQUARE, 1.0, &config, &MemoryFonts::new())).unwrap();
        assert_eq!((png.width, png.height), (200, 200));
    }

    #[test]
    fn test_wide_logo_is_not_stretched() {
        let wide = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 40 10"><rect width="10" height="10" fill="#FF0000"/></svg>"##;
        let config = ExportConfig {
            max_pixels: 200,
            ..ExportConfig::default()
        };
        let png = block_on(to_png(wide, 10.0, &config, &MemoryFonts::new())).unwrap();
        assert_eq!((png.width, png.height), (200, 50));
        let decoded = Pixmap::decode_png(&png.bytes).unwrap();
        // The square covers exactly the first quarter of the width.
        assert_eq!(decoded.pixel(45, 25).unwrap().green(), 0);
        assert_eq!(decoded.pixel(55, 25).unwrap().green(), 255);
    }

    #[test]
    fn test_png_export() {
        let png = block_on(to_png(SQUARE, 10.0, &ExportConfig::default(), &MemoryFonts::new())).unwrap();
        assert_eq!((png.width, png.height), (100, 100));
        assert_eq!(&png.bytes[..4], b"\x89PNG");

        let decoded = Pixmap::decode_png(&png.bytes).unwrap();
        let left = decoded.pixel(20, 50).unwrap();
        assert_eq!((left.red(), left.green(), left.blue()), (255, 0, 0));
        let right = decoded.pixel(80, 50).unwrap();
        assert_eq!((right.red(), right.green(), right.blue(), right.alpha()), (255, 255, 255, 255));
        assert!(png.to_data_url().starts_with("data:image/png;base64,iVBOR"));
    }

    #[test]
    fn test_transparent_background() {
        let config = ExportConfig {
            background: None,
            ..ExportConfig::default()
        };
        let png = block_on(to_png(SQUARE, 10.0, &config, &MemoryFonts::new())).unwrap();
        let decoded = Pixmap::decode_png(&png.bytes).unwrap();
        assert_eq!(decoded.pixel(80, 50).unwrap().alpha(), 0);
    }

    #[test]
    fn test_export_errors() {
        let fonts = MemoryFonts::new();
        let config = ExportConfig::default();
        assert!(matches!(
            block_on(to_png(SQUARE, 0.0, &config, &fonts)),
            Err(ExportError::InvalidScale(_))
        ));
        assert!(matches!(
            block_on(to_png(SQUARE, f32::NAN, &config, &fonts)),
            Err(ExportError::InvalidScale(_))
        ));
        assert!(matches!(
            block_on(to_png("<svg><rect></svg>", 1.0, &config, &fonts)),
            Err(ExportError::Parse(_))
        ));
        let empty = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"/>"#;
        let err = block_on(to_png(empty, 1.0, &config, &fonts)).unwrap_err();
        assert!(err.to_string().contains("try SVG export instead"));
    }

    #[test]
    fn test_missing_fonts_fall_back() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
            <rect width="10" height="10" fill="navy"/>
            <text id="a" font-family="Lobster">A</text>
            <text id="b" style="font-family: 'Roboto', sans-serif">B</text>
            <text id="c" font-family="Lobster">C</text>
        </svg>"#;
        let mut doc = Document::parse(svg).unwrap();
        assert_eq!(font_families(&doc), ["Lobster", "Roboto"]);

        let missing: HashSet<String> = ["Roboto".to_string()].into();
        assert_eq!(substitute_fonts(&mut doc, &missing, "Arial"), 1);
        let b = doc.find_by_id("b").unwrap();
        assert_eq!(doc.attr(b, "font-family"), Some("Arial"));
        assert_eq!(doc.attr(b, "style"), None);
        assert_eq!(doc.attr(doc.find_by_id("a").unwrap(), "font-family"), Some("Lobster"));

        let png = block_on(to_png(svg, 1.0, &ExportConfig::default(), &MemoryFonts::new()));
        assert!(png.is_ok());
    }

    #[test]
    fn test_prepare_for_publishing() {
        let out = prepare_for_publishing(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><rect/></svg>"#,
            [("title", "Acme"), ("author", "R & D")],
        )
        .unwrap();
        insta::assert_snapshot!(out, @r#"<svg xmlns="http://www.w3.org/2000/svg"><rect/><metadata id="logo-metadata"><meta name="title">Acme</meta><meta name="author">R &amp; D</meta></metadata></svg>"#);
    }
}
