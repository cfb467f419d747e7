//! The `transform` attribute codec.
//!
//! Reading picks `translate`, `rotate` and `scale` out of the attribute
//! independently, in whatever order they appear. Writing always emits the
//! canonical `translate(..) rotate(angle,px,py) scale(..)` form.

use std::sync::OnceLock;

use kurbo::{Affine, Vec2};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId};
use crate::geometry::Point;

/// Structured view of an element's transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub translate: Point,
    /// Degrees, clockwise.
    pub rotate: f64,
    pub scale: Point,
    /// Rotation pivot
    pub origin: Point,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translate: Point::ZERO,
            rotate: 0.0,
            scale: Point::new(1.0, 1.0),
            origin: Point::ZERO,
        }
    }
}

/// Absolute transform values as passed to `apply_transform`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformValues {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for TransformValues {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl From<&Transform> for TransformValues {
    fn from(t: &Transform) -> Self {
        Self {
            x: t.translate.x,
            y: t.translate.y,
            rotation: t.rotate,
            scale_x: t.scale.x,
            scale_y: t.scale.y,
        }
    }
}

/// A partial update of [`TransformValues`]; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub rotation: Option<f64>,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
}

impl TransformValues {
    pub fn merged(mut self, patch: &TransformPatch) -> Self {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
        if let Some(scale_x) = patch.scale_x {
            self.scale_x = scale_x;
        }
        if let Some(scale_y) = patch.scale_y {
            self.scale_y = scale_y;
        }
        self
    }
}

fn function_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Za-z]+)\s*\(([^)]*)\)").expect("regex must compile"))
}

/// Transform functions in source order, with their numeric arguments.
/// Functions whose arguments do not parse are skipped.
fn functions(raw: &str) -> Vec<(&str, Vec<f64>)> {
    function_pattern()
        .captures_iter(raw)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            let args = caps.get(2)?.as_str();
            let values: Option<Vec<f64>> = args
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|part| !part.is_empty())
                .map(|part| part.parse::<f64>().ok())
                .collect();
            Some((name, values?))
        })
        .collect()
}

pub fn parse_transform(raw: &str) -> Transform {
    let mut transform = Transform::default();
    let (mut translate_seen, mut rotate_seen, mut scale_seen) = (false, false, false);

    for (name, args) in functions(raw) {
        match (name, args.as_slice()) {
            ("translate", [x]) if !translate_seen => {
                transform.translate = Point::new(*x, 0.0);
                translate_seen = true;
            }
            ("translate", [x, y]) if !translate_seen => {
                transform.translate = Point::new(*x, *y);
                translate_seen = true;
            }
            ("rotate", [angle]) if !rotate_seen => {
                transform.rotate = *angle;
                rotate_seen = true;
            }
            ("rotate", [angle, cx, cy]) if !rotate_seen => {
                transform.rotate = *angle;
                transform.origin = Point::new(*cx, *cy);
                rotate_seen = true;
            }
            ("scale", [s]) if !scale_seen => {
                transform.scale = Point::new(*s, *s);
                scale_seen = true;
            }
            ("scale", [sx, sy]) if !scale_seen => {
                transform.scale = Point::new(*sx, *sy);
                scale_seen = true;
            }
            (other, _) => debug!("ignoring transform function {other}() in {raw:?}"),
        }
    }
    transform
}

pub fn read_transform(doc: &Document, node: NodeId) -> Transform {
    parse_transform(doc.attr(node, "transform").unwrap_or_default())
}

pub fn format_transform(values: &TransformValues, pivot: Point) -> String {
    format!(
        "translate({},{}) rotate({},{},{}) scale({},{})",
        format_number(values.x),
        format_number(values.y),
        format_number(values.rotation),
        format_number(pivot.x),
        format_number(pivot.y),
        format_number(values.scale_x),
        format_number(values.scale_y),
    )
}

/// Overwrite the node's `transform` attribute with the canonical form.
pub fn write_transform(doc: &mut Document, node: NodeId, values: &TransformValues, pivot: Point) {
    doc.set_attr(node, "transform", format_transform(values, pivot));
}

/// The full matrix of a `transform` attribute, including `matrix` and `skew`.
pub fn to_affine(raw: &str) -> Affine {
    functions(raw)
        .into_iter()
        .fold(Affine::IDENTITY, |acc, (name, args)| {
            let step = match (name, args.as_slice()) {
                ("translate", [x]) => Affine::translate(Vec2::new(*x, 0.0)),
                ("translate", [x, y]) => Affine::translate(Vec2::new(*x, *y)),
                ("rotate", [a]) => Affine::rotate(a.to_radians()),
                ("rotate", [a, cx, cy]) => Affine::rotate_about(a.to_radians(), kurbo::Point::new(*cx, *cy)),
                ("scale", [s]) => Affine::scale(*s),
                ("scale", [sx, sy]) => Affine::scale_non_uniform(*sx, *sy),
                ("matrix", [a, b, c, d, e, f]) => Affine::new([*a, *b, *c, *d, *e, *f]),
                ("skewX", [a]) => Affine::skew(a.to_radians().tan(), 0.0),
                ("skewY", [a]) => Affine::skew(0.0, a.to_radians().tan()),
                _ => Affine::IDENTITY,
            };
            acc * step
        })
}

/// At most three decimals, no trailing zeros, never `-0`.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 || !rounded.is_finite() {
        return "0".to_string();
    }
    rounded.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(x: f64, y: f64, rotation: f64, scale_x: f64, scale_y: f64) -> TransformValues {
        TransformValues {
            x,
            y,
            rotation,
            scale_x,
            scale_y,
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(-12.34567), "-12.346");
        assert_eq!(format_number(-0.0001), "0");
        assert_eq!(format_number(f64::NAN), "0");
    }

    #[test]
    fn test_format_canonical_order() {
        let raw = format_transform(&values(10.0, -5.5, 45.0, 2.0, 0.5), Point::new(200.0, 200.0));
        assert_eq!(raw, "translate(10,-5.5) rotate(45,200,200) scale(2,0.5)");
    }

    #[test]
    fn test_parse_any_order() {
        let t = parse_transform("scale(2, 3) rotate(30 5 6) translate(7,8)");
        assert_eq!(t.translate, Point::new(7.0, 8.0));
        assert_eq!(t.rotate, 30.0);
        assert_eq!(t.scale, Point::new(2.0, 3.0));
        assert_eq!(t.origin, Point::new(5.0, 6.0));
    }

    #[test]
    fn test_parse_defaults_and_short_forms() {
        assert_eq!(parse_transform(""), Transform::default());
        let t = parse_transform("translate(4) scale(3)");
        assert_eq!(t.translate, Point::new(4.0, 0.0));
        assert_eq!(t.scale, Point::new(3.0, 3.0));
        assert_eq!(t.rotate, 0.0);

        let skewed = parse_transform("matrix(1 0 0 1 5 5) skewX(10)");
        assert_eq!(skewed, Transform::default());
    }

    #[test]
    fn test_round_trip_over_existing_attribute() {
        let mut doc = Document::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><rect id="r" transform="scale(9) translate(1,1)"/></svg>"#,
        )
        .unwrap();
        let node = doc.find_by_id("r").unwrap();
        let cases = [
            values(0.0, 0.0, 0.0, 1.0, 1.0),
            values(12.5, -3.25, 90.0, 1.5, 0.75),
            values(-100.0, 40.0, -33.333, 2.0, 2.0),
        ];
        for expected in cases {
            write_transform(&mut doc, node, &expected, Point::new(50.0, 25.0));
            let read = TransformValues::from(&read_transform(&doc, node));
            assert!((read.x - expected.x).abs() < 1e-3);
            assert!((read.y - expected.y).abs() < 1e-3);
            assert!((read.rotation - expected.rotation).abs() < 1e-3);
            assert!((read.scale_x - expected.scale_x).abs() < 1e-3);
            assert!((read.scale_y - expected.scale_y).abs() < 1e-3);
            assert_eq!(read_transform(&doc, node).origin, Point::new(50.0, 25.0));
        }
    }

    #[test]
    fn test_patch_merge() {
        let current = values(1.0, 2.0, 3.0, 4.0, 5.0);
        let patch = TransformPatch {
            rotation: Some(90.0),
            scale_y: Some(1.0),
            ..TransformPatch::default()
        };
        assert_eq!(current.merged(&patch), values(1.0, 2.0, 90.0, 4.0, 1.0));
    }

    #[test]
    fn test_to_affine_composes_in_order() {
        let affine = to_affine("translate(10,0) scale(2)");
        let p = affine * kurbo::Point::new(1.0, 1.0);
        assert!((p.x - 12.0).abs() < 1e-9);
        assert!((p.y - 2.0).abs() < 1e-9);
    }
}
