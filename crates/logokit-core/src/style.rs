//! Presentation-attribute codec: `fill`, `stroke`, `stroke-width`, `opacity`.
//!
//! An inline `style` declaration wins over the attribute when reading, the
//! same way a browser cascades them. Writing sets the attribute and drops the
//! matching inline declaration so the new value is the one that renders.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::dom::{Document, NodeId, parse_number};
use crate::transform::format_number;

/// Non-color paints accepted from callers besides `url(...)` references.
const PAINT_KEYWORDS: [&str; 5] = ["currentColor", "inherit", "transparent", "context-fill", "context-stroke"];

/// A `fill` or `stroke` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Paint {
    None,
    Color(Color),
    /// Anything that is not a plain color (`url(#grad)`, `currentColor`, ...),
    /// kept verbatim.
    Other(String),
}

impl Paint {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("none") {
            return Paint::None;
        }
        match Color::parse(raw) {
            Some(color) => Paint::Color(color),
            None => Paint::Other(raw.to_string()),
        }
    }

    /// Parse a paint supplied by a caller rather than read from markup.
    /// Anything that is not `none`, a color, a `url(...)` reference or a
    /// paint keyword is rejected, so a malformed hex like `#12` never
    /// reaches the document.
    pub fn parse_input(raw: &str) -> Option<Self> {
        match Self::parse(raw) {
            Paint::Other(other) => {
                let reference = other.starts_with("url(") && other.ends_with(')');
                let keyword = PAINT_KEYWORDS.iter().any(|k| other.eq_ignore_ascii_case(k));
                (reference || keyword).then_some(Paint::Other(other))
            }
            paint => Some(paint),
        }
    }

    pub fn color(&self) -> Option<Color> {
        match self {
            Paint::Color(color) => Some(*color),
            _ => None,
        }
    }
}

impl From<Color> for Paint {
    fn from(color: Color) -> Self {
        Paint::Color(color)
    }
}

impl fmt::Display for Paint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Paint::None => f.write_str("none"),
            Paint::Color(color) => write!(f, "{color}"),
            Paint::Other(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for Paint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Paint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Paint::parse_input(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid paint: {s:?}")))
    }
}

/// The editable style of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub fill: Paint,
    pub stroke: Paint,
    /// Always `>= 0`
    pub stroke_width: f64,
    /// Always within `[0, 1]`
    pub opacity: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: Paint::Color(Color::BLACK),
            stroke: Paint::None,
            stroke_width: 0.0,
            opacity: 1.0,
        }
    }
}

/// Partial style update. Absent fields leave the node untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StylePatch {
    pub fill: Option<Paint>,
    pub stroke: Option<Paint>,
    pub stroke_width: Option<f64>,
    pub opacity: Option<f64>,
}

impl StylePatch {
    pub fn fill(paint: impl Into<Paint>) -> Self {
        Self {
            fill: Some(paint.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fill.is_none() && self.stroke.is_none() && self.stroke_width.is_none() && self.opacity.is_none()
    }
}

impl From<Style> for StylePatch {
    fn from(style: Style) -> Self {
        Self {
            fill: Some(style.fill),
            stroke: Some(style.stroke),
            stroke_width: Some(style.stroke_width),
            opacity: Some(style.opacity),
        }
    }
}

/// `property: value` pairs of an inline `style` attribute.
fn inline_declarations(raw: &str) -> Vec<(&str, &str)> {
    raw.split(';')
        .filter_map(|decl| decl.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Effective value of a presentation property, inline style first.
pub(crate) fn property<'a>(doc: &'a Document, node: NodeId, name: &str) -> Option<&'a str> {
    let inline = doc
        .attr(node, "style")
        .and_then(|raw| inline_declarations(raw).into_iter().rev().find(|(key, _)| *key == name))
        .map(|(_, value)| value);
    inline
        .or_else(|| doc.attr(node, name))
        .filter(|value| !value.trim().is_empty())
}

pub(crate) fn remove_inline(doc: &mut Document, node: NodeId, name: &str) {
    let Some(raw) = doc.attr(node, "style") else {
        return;
    };
    let kept: Vec<String> = inline_declarations(raw)
        .into_iter()
        .filter(|(key, _)| *key != name)
        .map(|(key, value)| format!("{key}: {value}"))
        .collect();
    if kept.is_empty() {
        doc.remove_attr(node, "style");
    } else {
        doc.set_attr(node, "style", kept.join("; "));
    }
}

/// Read the node's style. Missing or unparseable values take the defaults
/// (`fill` black, `stroke` none, width 0, opacity 1).
pub fn read_style(doc: &Document, node: NodeId) -> Style {
    let defaults = Style::default();
    Style {
        fill: property(doc, node, "fill").map(Paint::parse).unwrap_or(defaults.fill),
        stroke: property(doc, node, "stroke").map(Paint::parse).unwrap_or(defaults.stroke),
        stroke_width: property(doc, node, "stroke-width")
            .and_then(parse_number)
            .map(|w| w.max(0.0))
            .unwrap_or(defaults.stroke_width),
        opacity: property(doc, node, "opacity")
            .and_then(parse_number)
            .map(|o| o.clamp(0.0, 1.0))
            .unwrap_or(defaults.opacity),
    }
}

/// Write the fields present in `patch`; everything else is left alone.
pub fn write_style(doc: &mut Document, node: NodeId, patch: &StylePatch) {
    if let Some(fill) = &patch.fill {
        set_property(doc, node, "fill", fill.to_string());
    }
    if let Some(stroke) = &patch.stroke {
        set_property(doc, node, "stroke", stroke.to_string());
    }
    if let Some(width) = patch.stroke_width {
        set_property(doc, node, "stroke-width", format_number(width.max(0.0)));
    }
    if let Some(opacity) = patch.opacity {
        set_property(doc, node, "opacity", format_number(opacity.clamp(0.0, 1.0)));
    }
}

fn set_property(doc: &mut Document, node: NodeId, name: &str, value: String) {
    remove_inline(doc, node, name);
    doc.set_attr(node, name, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(attrs: &str) -> (Document, NodeId) {
        let doc = Document::parse(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><path id="p" d="M0 0" {attrs}/></svg>"#
        ))
        .unwrap();
        let node = doc.find_by_id("p").unwrap();
        (doc, node)
    }

    #[test]
    fn test_read_defaults() {
        let (doc, node) = doc_with("");
        assert_eq!(read_style(&doc, node), Style::default());
    }

    #[test]
    fn test_read_attributes() {
        let (doc, node) = doc_with(r##"fill="#fc0" stroke="url(#g)" stroke-width="-2" opacity="1.5""##);
        let style = read_style(&doc, node);
        assert_eq!(style.fill, Paint::Color(Color::new(0xFF, 0xCC, 0x00)));
        assert_eq!(style.stroke, Paint::Other("url(#g)".to_string()));
        assert_eq!(style.stroke_width, 0.0);
        assert_eq!(style.opacity, 1.0);
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let (doc, node) = doc_with(r#"stroke-width="thick" opacity="""#);
        let style = read_style(&doc, node);
        assert_eq!(style.stroke_width, 0.0);
        assert_eq!(style.opacity, 1.0);
    }

    #[test]
    fn test_inline_style_wins() {
        let (doc, node) = doc_with(r##"fill="#111111" style="fill: #222222; stroke-width: 3""##);
        let style = read_style(&doc, node);
        assert_eq!(style.fill.to_string(), "#222222");
        assert_eq!(style.stroke_width, 3.0);
    }

    #[test]
    fn test_partial_write_leaves_other_fields() {
        let (mut doc, node) = doc_with(r##"fill="#111111" stroke="#222222" stroke-width="2" opacity="0.5""##);
        write_style(&mut doc, node, &StylePatch::fill(Color::new(0xAB, 0xCD, 0xEF)));
        let style = read_style(&doc, node);
        assert_eq!(style.fill.to_string(), "#ABCDEF");
        assert_eq!(style.stroke.to_string(), "#222222");
        assert_eq!(style.stroke_width, 2.0);
        assert_eq!(style.opacity, 0.5);
    }

    #[test]
    fn test_write_drops_inline_declaration() {
        let (mut doc, node) = doc_with(r#"style="fill: red; stroke: blue""#);
        write_style(&mut doc, node, &StylePatch::fill(Paint::None));
        assert_eq!(doc.attr(node, "fill"), Some("none"));
        assert_eq!(doc.attr(node, "style"), Some("stroke: blue"));
        write_style(
            &mut doc,
            node,
            &StylePatch {
                stroke: Some(Paint::None),
                opacity: Some(0.25),
                ..StylePatch::default()
            },
        );
        assert_eq!(doc.attr(node, "style"), None);
        assert_eq!(doc.attr(node, "opacity"), Some("0.25"));
    }

    #[test]
    fn test_paint_serde() {
        let style: Style = serde_json::from_str(
            r##"{"fill":"#abc","stroke":"none","strokeWidth":1,"opacity":0.5}"##,
        )
        .unwrap();
        assert_eq!(style.fill, Paint::Color(Color::new(0xAA, 0xBB, 0xCC)));
        let json = serde_json::to_string(&style).unwrap();
        assert_eq!(json, r##"{"fill":"#AABBCC","stroke":"none","strokeWidth":1.0,"opacity":0.5}"##);
    }

    #[test]
    fn test_malformed_paint_is_rejected() {
        for raw in ["#12", "#ABCD", "#GGGGGG", "rgb(1,2)", "chartreuse-ish", ""] {
            assert_eq!(Paint::parse_input(raw), None, "{raw:?}");
        }
        assert_eq!(Paint::parse_input("url(#g)"), Some(Paint::Other("url(#g)".to_string())));
        assert_eq!(Paint::parse_input("currentColor"), Some(Paint::Other("currentColor".to_string())));
        assert_eq!(Paint::parse_input("#abc"), Some(Paint::Color(Color::new(0xAA, 0xBB, 0xCC))));

        assert!(serde_json::from_str::<StylePatch>(r##"{"fill":"#12"}"##).is_err());
        let patch: StylePatch = serde_json::from_str(r##"{"stroke":"url(#g)"}"##).unwrap();
        assert_eq!(patch.stroke, Some(Paint::Other("url(#g)".to_string())));
    }
}
