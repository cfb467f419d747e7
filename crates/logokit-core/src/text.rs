//! Engine-created text elements.
//!
//! The scene does not keep a text registry of its own: callers pass the full
//! desired [`TextElement`] (or a [`TextPatch`]) and the `<text>` node is made
//! to match it.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::dom::{Document, NodeId};
use crate::geometry::Point;
use crate::transform::format_number;

/// Horizontal anchor of a text element. `center` is accepted as `middle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Start,
    #[default]
    #[serde(alias = "center")]
    Middle,
    End,
}

impl TextAlign {
    pub fn as_anchor(self) -> &'static str {
        match self {
            TextAlign::Start => "start",
            TextAlign::Middle => "middle",
            TextAlign::End => "end",
        }
    }
}

/// UI bookkeeping only; never affects rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextKind {
    #[default]
    CompanyName,
    Tagline,
}

/// One of the weights the font catalog ships: 300, 400, 500 or 700.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FontWeight(u16);

impl FontWeight {
    pub const LIGHT: Self = Self(300);
    pub const REGULAR: Self = Self(400);
    pub const MEDIUM: Self = Self(500);
    pub const BOLD: Self = Self(700);

    pub fn new(weight: u16) -> Option<Self> {
        matches!(weight, 300 | 400 | 500 | 700).then_some(Self(weight))
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::REGULAR
    }
}

impl<'de> Deserialize<'de> for FontWeight {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum FontWeightValue {
            Number(u16),
            String(String),
        }

        let weight = match FontWeightValue::deserialize(deserializer)? {
            FontWeightValue::Number(n) => n,
            FontWeightValue::String(s) => match s.to_lowercase().as_str() {
                "light" => 300,
                "normal" => 400,
                "medium" => 500,
                "bold" => 700,
                _ => s
                    .parse()
                    .map_err(|_| serde::de::Error::custom(format!("invalid font weight: {s}")))?,
            },
        };
        FontWeight::new(weight)
            .ok_or_else(|| serde::de::Error::custom(format!("unsupported font weight: {weight}")))
    }
}

/// Full desired state of a synthetic text node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub id: String,
    /// Empty content renders nothing but keeps the node.
    pub content: String,
    pub font_family: String,
    /// Pixels, `> 0`
    pub font_size: f64,
    #[serde(default)]
    pub font_weight: FontWeight,
    pub fill: Color,
    pub position: Point,
    #[serde(default)]
    pub alignment: TextAlign,
    #[serde(rename = "type", default)]
    pub kind: TextKind,
}

/// Partial text update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextPatch {
    pub content: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub font_weight: Option<FontWeight>,
    pub fill: Option<Color>,
    pub position: Option<Point>,
    pub alignment: Option<TextAlign>,
    #[serde(rename = "type")]
    pub kind: Option<TextKind>,
}

impl TextPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

impl TextElement {
    /// Merge a patch into this descriptor. Non-positive font sizes are ignored.
    pub fn apply(&mut self, patch: &TextPatch) {
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(family) = &patch.font_family {
            self.font_family = family.clone();
        }
        if let Some(size) = patch.font_size.filter(|s| *s > 0.0) {
            self.font_size = size;
        }
        if let Some(weight) = patch.font_weight {
            self.font_weight = weight;
        }
        if let Some(fill) = patch.fill {
            self.fill = fill;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(alignment) = patch.alignment {
            self.alignment = alignment;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
    }

    /// The patch that turns any text node into this one.
    pub fn to_patch(&self) -> TextPatch {
        TextPatch {
            content: Some(self.content.clone()),
            font_family: Some(self.font_family.clone()),
            font_size: Some(self.font_size),
            font_weight: Some(self.font_weight),
            fill: Some(self.fill),
            position: Some(self.position),
            alignment: Some(self.alignment),
            kind: Some(self.kind),
        }
    }
}

/// Write the patched properties onto a `<text>` node.
pub(crate) fn write_text(doc: &mut Document, node: NodeId, patch: &TextPatch) {
    if let Some(content) = &patch.content {
        doc.set_text_content(node, content);
    }
    if let Some(family) = &patch.font_family {
        doc.set_attr(node, "font-family", family.as_str());
    }
    match patch.font_size {
        Some(size) if size > 0.0 => doc.set_attr(node, "font-size", format_number(size)),
        Some(size) => warn!("ignoring font size {size}; must be positive"),
        None => {}
    }
    if let Some(weight) = patch.font_weight {
        doc.set_attr(node, "font-weight", weight.value().to_string());
    }
    if let Some(fill) = patch.fill {
        doc.set_attr(node, "fill", fill.to_hex());
    }
    if let Some(position) = patch.position {
        doc.set_attr(node, "x", format_number(position.x));
        doc.set_attr(node, "y", format_number(position.y));
    }
    if let Some(alignment) = patch.alignment {
        doc.set_attr(node, "text-anchor", alignment.as_anchor());
    }
    doc.set_attr(node, "dominant-baseline", "middle");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_text_element() {
        let json = r##"{
            "id": "text-1",
            "content": "Acme",
            "fontFamily": "Roboto",
            "fontSize": 24,
            "fontWeight": "700",
            "fill": "#000",
            "position": { "x": 200, "y": 350 },
            "alignment": "center",
            "type": "tagline"
        }"##;
        let text: TextElement = serde_json::from_str(json).unwrap();
        assert_eq!(text.font_weight, FontWeight::BOLD);
        assert_eq!(text.alignment, TextAlign::Middle);
        assert_eq!(text.kind, TextKind::Tagline);
        assert_eq!(text.fill, Color::BLACK);
    }

    #[test]
    fn test_font_weight_is_restricted() {
        assert!(serde_json::from_str::<FontWeight>("600").is_err());
        assert_eq!(serde_json::from_str::<FontWeight>(r#""normal""#).unwrap(), FontWeight::REGULAR);
        assert_eq!(serde_json::from_str::<FontWeight>("500").unwrap(), FontWeight::MEDIUM);
        assert_eq!(FontWeight::new(300), Some(FontWeight::LIGHT));
    }

    #[test]
    fn test_apply_patch() {
        let mut text = TextElement {
            id: "t".to_string(),
            content: "Acme".to_string(),
            font_family: "Roboto".to_string(),
            font_size: 24.0,
            font_weight: FontWeight::REGULAR,
            fill: Color::BLACK,
            position: Point::new(200.0, 350.0),
            alignment: TextAlign::Middle,
            kind: TextKind::CompanyName,
        };
        text.apply(&TextPatch {
            content: Some("Acme Inc".to_string()),
            font_size: Some(-4.0),
            alignment: Some(TextAlign::End),
            ..TextPatch::default()
        });
        assert_eq!(text.content, "Acme Inc");
        assert_eq!(text.font_size, 24.0);
        assert_eq!(text.alignment, TextAlign::End);
    }
}
