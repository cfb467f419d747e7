//! Owned, mutable XML tree.
//!
//! `roxmltree` gives a fast read-only view of the input; the editor needs to
//! mutate attributes, insert and remove nodes, and clone the whole document
//! before serializing, so the parsed tree is copied into an arena owned by
//! [`Document`]. Writing goes through `quick_xml::Writer`, which takes care of
//! escaping.

use std::io;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::{DomError, ParseError};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Index of a node inside its [`Document`].
///
/// Ids stay valid after the node is detached; they are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct ElementData {
    /// Qualified name as written (`path`, `xlink:href`, ...)
    name: String,
    attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An SVG document held as an arena of nodes.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Document {
    /// Parse SVG markup. The root element must be `<svg>`.
    pub fn parse(xml: &str) -> Result<Self, ParseError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let source = roxmltree::Document::parse_with_options(xml, options)?;
        let source_root = source.root_element();
        if source_root.tag_name().name() != "svg" {
            return Err(ParseError::NotSvg(source_root.tag_name().name().to_string()));
        }

        let mut doc = Document {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        doc.root = doc.import(source_root, None);
        Ok(doc)
    }

    fn import(&mut self, source: roxmltree::Node<'_, '_>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let kind = if source.is_text() {
            NodeKind::Text(source.text().unwrap_or_default().to_string())
        } else {
            NodeKind::Element(ElementData {
                name: qualified_element_name(source),
                attributes: imported_attributes(source),
            })
        };
        self.nodes.push(NodeData {
            kind,
            parent,
            children: Vec::new(),
        });

        for child in source.children() {
            if child.is_element() || child.is_text() {
                let child_id = self.import(child, Some(id));
                self.nodes[id.0].children.push(child_id);
            }
        }
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    /// Tag name of an element node, `None` for text nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name.as_str())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Numeric attribute; absent or unparseable values yield `None`.
    pub fn attr_f64(&self, id: NodeId, name: &str) -> Option<f64> {
        parse_number(self.attr(id, name)?)
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        let value = value.into();
        match el.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => el.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        let el = self.element_mut(id)?;
        let index = el.attributes.iter().position(|(key, _)| key == name)?;
        Some(el.attributes.remove(index).1)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    /// Element descendants of `id` in document order, excluding `id` itself.
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if self.is_element(next) {
                out.push(next);
                stack.extend(self.children(next).iter().rev().copied());
            }
        }
        out
    }

    /// Whether the node is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// First attached element carrying `id="<value>"`.
    pub fn find_by_id(&self, value: &str) -> Option<NodeId> {
        if self.attr(self.root, "id") == Some(value) {
            return Some(self.root);
        }
        self.descendant_elements(self.root)
            .into_iter()
            .find(|&node| self.attr(node, "id") == Some(value))
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind: NodeKind::Element(ElementData {
                name: name.to_string(),
                attributes: Vec::new(),
            }),
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind: NodeKind::Text(text.to_string()),
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Unlink a node (and its subtree) from its parent.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        self.nodes[parent.0].children.retain(|&child| child != id);
        self.nodes[id.0].parent = None;
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.nodes.get(id.0).map(|node| &node.kind) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Element(_)) => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            None => {}
        }
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        for child in self.children(id).to_vec() {
            self.detach(child);
        }
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let list = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", list);
    }

    /// Remove a class; a `class` attribute left empty is removed entirely.
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> bool {
        if !self.has_class(id, class) {
            return false;
        }
        let remaining: Vec<String> = self
            .attr(id, "class")
            .unwrap_or_default()
            .split_whitespace()
            .filter(|c| *c != class)
            .map(str::to_string)
            .collect();
        if remaining.is_empty() {
            self.remove_attr(id, "class");
        } else {
            self.set_attr(id, "class", remaining.join(" "));
        }
        true
    }

    /// Serialize the document, without an XML declaration.
    pub fn to_xml(&self) -> Result<String, DomError> {
        let mut writer = Writer::new(Vec::new());
        self.write_node(&mut writer, self.root)?;
        String::from_utf8(writer.into_inner())
            .map_err(|err| DomError::from(io::Error::new(io::ErrorKind::InvalidData, err)))
    }

    fn write_node<W: io::Write>(&self, writer: &mut Writer<W>, id: NodeId) -> io::Result<()> {
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Text(text) => writer.write_event(Event::Text(BytesText::new(text))),
            NodeKind::Element(el) => {
                let mut start = BytesStart::new(el.name.as_str());
                for (key, value) in &el.attributes {
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                if node.children.is_empty() {
                    return writer.write_event(Event::Empty(start));
                }
                writer.write_event(Event::Start(start))?;
                for &child in &node.children {
                    self.write_node(writer, child)?;
                }
                writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))
            }
        }
    }
}

/// Parse an SVG number, tolerating surrounding whitespace and a `px` suffix.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix("px").unwrap_or(trimmed);
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn qualified_element_name(node: roxmltree::Node<'_, '_>) -> String {
    let tag = node.tag_name();
    match tag.namespace().and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, tag.name()),
        _ => tag.name().to_string(),
    }
}

fn imported_attributes(node: roxmltree::Node<'_, '_>) -> Vec<(String, String)> {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|parent| parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();

    let mut attributes: Vec<(String, String)> = node
        .namespaces()
        .filter(|ns| ns.uri() != XML_NAMESPACE)
        .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| {
            let key = match ns.name() {
                Some(prefix) => format!("xmlns:{prefix}"),
                None => "xmlns".to_string(),
            };
            (key, ns.uri().to_string())
        })
        .collect();

    for attr in node.attributes() {
        let key = match attr.namespace() {
            Some(XML_NAMESPACE) => format!("xml:{}", attr.name()),
            Some(uri) => match node.lookup_prefix(uri) {
                Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, attr.name()),
                _ => attr.name().to_string(),
            },
            None => attr.name().to_string(),
        };
        attributes.push((key, attr.value().to_string()));
    }
    attributes
}
