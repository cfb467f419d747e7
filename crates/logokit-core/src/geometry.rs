//! Bounding boxes and rotation pivots.
//!
//! Boxes are computed from the element's own attributes in its local user
//! space (before its own `transform`), like `getBBox()`. Group boxes are the
//! union of their children's boxes, each mapped through the child's transform.

use kurbo::{BezPath, Rect, Shape};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId, parse_number};
use crate::transform::to_affine;

/// A point in SVG user units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pivot used when the element's own geometry gives no usable box and the
/// document has no parseable `viewBox`.
pub const CANVAS_CENTER: Point = Point::new(200.0, 200.0);

/// Approximate average character width as a fraction of font size.
const CHAR_WIDTH_RATIO: f64 = 0.55;
/// Approximate ascent as a fraction of font size.
const ASCENT_RATIO: f64 = 0.8;
/// Approximate descent as a fraction of font size.
const DESCENT_RATIO: f64 = 0.2;
const DEFAULT_FONT_SIZE: f64 = 16.0;

/// `min-x min-y width height`, separated by whitespace and/or commas.
pub fn parse_view_box(raw: &str) -> Option<Rect> {
    let parts: Vec<f64> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f64>().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [x, y, w, h] if *w > 0.0 && *h > 0.0 => Some(Rect::new(*x, *y, x + w, y + h)),
        _ => None,
    }
}

/// Geometric bounding box of an attached element, or `None` when it cannot
/// be computed.
pub fn bounding_box(doc: &Document, node: NodeId) -> Option<Rect> {
    if !doc.is_attached(node) {
        return None;
    }
    local_box(doc, node)
}

fn local_box(doc: &Document, node: NodeId) -> Option<Rect> {
    let num = |name: &str| doc.attr_f64(node, name);
    match doc.tag(node)? {
        "rect" => {
            let (x, y) = (num("x").unwrap_or(0.0), num("y").unwrap_or(0.0));
            let (w, h) = (num("width")?, num("height")?);
            Some(Rect::new(x, y, x + w, y + h))
        }
        "circle" => {
            let (cx, cy, r) = (num("cx").unwrap_or(0.0), num("cy").unwrap_or(0.0), num("r")?);
            Some(Rect::new(cx - r, cy - r, cx + r, cy + r))
        }
        "ellipse" => {
            let (cx, cy) = (num("cx").unwrap_or(0.0), num("cy").unwrap_or(0.0));
            let (rx, ry) = (num("rx")?, num("ry")?);
            Some(Rect::new(cx - rx, cy - ry, cx + rx, cy + ry))
        }
        "line" => Some(Rect::from_points(
            (num("x1").unwrap_or(0.0), num("y1").unwrap_or(0.0)),
            (num("x2").unwrap_or(0.0), num("y2").unwrap_or(0.0)),
        )),
        "polygon" | "polyline" => points_box(doc.attr(node, "points")?),
        "path" => {
            let path = BezPath::from_svg(doc.attr(node, "d")?).ok()?;
            if path.elements().is_empty() {
                return None;
            }
            Some(path.bounding_box())
        }
        "text" => text_box(doc, node),
        "g" => doc
            .children(node)
            .iter()
            .filter_map(|&child| {
                let rect = local_box(doc, child)?;
                let affine = to_affine(doc.attr(child, "transform").unwrap_or_default());
                Some(affine.transform_rect_bbox(rect))
            })
            .reduce(|a, b| a.union(b)),
        _ => None,
    }
}

fn points_box(raw: &str) -> Option<Rect> {
    let coords: Vec<f64> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(parse_number)
        .collect();
    coords
        .chunks_exact(2)
        .map(|pair| Rect::from_points((pair[0], pair[1]), (pair[0], pair[1])))
        .reduce(|a, b| a.union(b))
}

/// Estimated from character count; no font metrics are available here.
fn text_box(doc: &Document, node: NodeId) -> Option<Rect> {
    let first = |name: &str| {
        doc.attr(node, name)
            .and_then(|raw| raw.split(|c: char| c == ',' || c.is_whitespace()).find(|p| !p.is_empty()))
            .and_then(parse_number)
    };
    let x = first("x").unwrap_or(0.0);
    let y = first("y").unwrap_or(0.0);
    let size = doc.attr_f64(node, "font-size").unwrap_or(DEFAULT_FONT_SIZE);
    let width = doc.text_content(node).chars().count() as f64 * size * CHAR_WIDTH_RATIO;

    let x0 = match doc.attr(node, "text-anchor") {
        Some("middle") => x - width / 2.0,
        Some("end") => x - width,
        _ => x,
    };
    let (y0, y1) = match doc.attr(node, "dominant-baseline") {
        Some("middle" | "central") => (y - size / 2.0, y + size / 2.0),
        _ => (y - size * ASCENT_RATIO, y + size * DESCENT_RATIO),
    };
    Some(Rect::new(x0, y0, x0 + width, y1))
}

/// Centre of the root `viewBox`, or [`CANVAS_CENTER`].
pub fn canvas_center(doc: &Document) -> Point {
    doc.attr(doc.root(), "viewBox")
        .and_then(parse_view_box)
        .map(|rect| Point::new(rect.center().x, rect.center().y))
        .unwrap_or(CANVAS_CENTER)
}

/// Rotation pivot for a node.
///
/// `rect` rotates about half its width/height and `circle`/`ellipse` about
/// `cx`/`cy`. Everything else uses its bounding-box centre, falling back to
/// the canvas centre when no non-empty box can be computed.
pub fn pivot(doc: &Document, node: NodeId) -> Point {
    let num = |name: &str| doc.attr_f64(node, name).unwrap_or(0.0);
    match doc.tag(node) {
        Some("rect") => Point::new(num("width") / 2.0, num("height") / 2.0),
        Some("circle" | "ellipse") => Point::new(num("cx"), num("cy")),
        tag => match bounding_box(doc, node) {
            Some(rect) if rect.width() > 0.0 || rect.height() > 0.0 => {
                Point::new(rect.center().x, rect.center().y)
            }
            _ => {
                let fallback = canvas_center(doc);
                warn!(
                    "no bounding box for <{}>; rotating about canvas centre ({}, {})",
                    tag.unwrap_or("?"),
                    fallback.x,
                    fallback.y
                );
                fallback
            }
        },
    }
}
