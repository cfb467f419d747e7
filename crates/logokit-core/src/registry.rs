//! Element registry: SVG markup in, one descriptor per editable element out.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId};
use crate::error::ParseError;
use crate::style::{Style, read_style};
use crate::time::now_millis;
use crate::transform::{Transform, read_transform};

/// Tags that take part in editing.
pub const EDITABLE_TAGS: [&str; 8] = ["path", "circle", "rect", "ellipse", "polygon", "polyline", "g", "text"];

/// Containers whose content is referenced rather than drawn.
const NON_RENDERED: [&str; 6] = ["defs", "clipPath", "mask", "pattern", "marker", "symbol"];

pub fn is_editable_tag(tag: &str) -> bool {
    EDITABLE_TAGS.contains(&tag)
}

/// Palette slot an element's fill follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "primary-color-element")]
    Primary,
    #[serde(rename = "secondary-color-element")]
    Secondary,
    #[serde(rename = "accent-color-element")]
    Accent,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Primary, Role::Secondary, Role::Accent];

    pub fn class_name(self) -> &'static str {
        match self {
            Role::Primary => "primary-color-element",
            Role::Secondary => "secondary-color-element",
            Role::Accent => "accent-color-element",
        }
    }

    fn from_data_attr(raw: &str) -> Option<Self> {
        match raw.trim() {
            "primary" => Some(Role::Primary),
            "secondary" => Some(Role::Secondary),
            "accent" => Some(Role::Accent),
            _ => None,
        }
    }
}

/// Role from the `class` list, else from `data-role`.
pub fn role_of(doc: &Document, node: NodeId) -> Option<Role> {
    Role::ALL
        .into_iter()
        .find(|role| doc.has_class(node, role.class_name()))
        .or_else(|| doc.attr(node, "data-role").and_then(Role::from_data_attr))
}

/// Structured state of one editable element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub style: Style,
    pub original_style: Style,
    pub transform: Transform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Descriptors keyed by id, in document order.
pub type Descriptors = IndexMap<String, ElementDescriptor>;

pub(crate) fn describe(doc: &Document, node: NodeId, id: &str, original_style: Style) -> ElementDescriptor {
    ElementDescriptor {
        id: id.to_string(),
        kind: doc.tag(node).unwrap_or_default().to_string(),
        style: read_style(doc, node),
        original_style,
        transform: read_transform(doc, node),
        role: role_of(doc, node),
    }
}

/// Parse markup into descriptors. `style` and `original_style` start equal.
pub fn parse(svg: &str) -> Result<Descriptors, ParseError> {
    let mut doc = Document::parse(svg)?;
    let descriptors = assign_ids(&mut doc, now_millis())
        .into_iter()
        .map(|(id, node)| {
            let descriptor = describe(&doc, node, &id, read_style(&doc, node));
            (id, descriptor)
        })
        .collect();
    Ok(descriptors)
}

/// Give every editable element a unique id, writing synthetic ones back onto
/// the nodes. Returns `(id, node)` pairs in document order.
///
/// An element keeps its own id unless an earlier element already holds it.
/// Synthetic ids look like `element-<millis>-<index>` and never match any id
/// present anywhere in the document.
pub(crate) fn assign_ids(doc: &mut Document, millis: u64) -> Vec<(String, NodeId)> {
    let all_ids: HashSet<String> = doc
        .descendant_elements(doc.root())
        .into_iter()
        .filter_map(|node| doc.attr(node, "id").map(str::to_string))
        .collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut assigned = Vec::new();

    for node in doc.descendant_elements(doc.root()) {
        let current = doc.attr(node, "id").map(str::to_string);
        if !is_editable(doc, node) {
            if let Some(id) = current {
                seen.insert(id);
            }
            continue;
        }

        let id = match current {
            Some(id) if !id.is_empty() && !seen.contains(&id) => id,
            _ => {
                let base = format!("element-{}-{}", millis, assigned.len());
                let mut candidate = base.clone();
                let mut suffix = 1;
                while seen.contains(&candidate) || all_ids.contains(&candidate) {
                    candidate = format!("{base}-{suffix}");
                    suffix += 1;
                }
                doc.set_attr(node, "id", candidate.as_str());
                candidate
            }
        };
        seen.insert(id.clone());
        assigned.push((id, node));
    }
    assigned
}

/// Editable tag outside any non-rendered container.
pub(crate) fn is_editable(doc: &Document, node: NodeId) -> bool {
    if !doc.tag(node).is_some_and(is_editable_tag) {
        return false;
    }
    let mut ancestor = doc.parent(node);
    while let Some(current) = ancestor {
        if doc.tag(current).is_some_and(|tag| NON_RENDERED.contains(&tag)) {
            return false;
        }
        ancestor = doc.parent(current);
    }
    true
}
