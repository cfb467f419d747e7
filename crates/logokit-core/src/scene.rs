//! The scene manager.
//!
//! A [`Scene`] owns at most one mounted document and is the only writer to
//! it. The document itself is authoritative: descriptors, styles and
//! transforms are read back from it on every call instead of being cached.
//!
//! The host delivers pointer events through [`Scene::click`] and
//! [`Scene::hover`]. Each mount wires an explicit listener registry of
//! `(node, event, reaction)` entries; it is released in full before the next
//! mount so no reaction can fire against a replaced document.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, error, warn};

use crate::config::EditorConfig;
use crate::dom::{Document, NodeId, SVG_NAMESPACE};
use crate::error::SceneError;
use crate::geometry::{parse_view_box, pivot};
use crate::palette::Palette;
use crate::registry::{Descriptors, Role, assign_ids, describe, role_of};
use crate::style::{Style, StylePatch, read_style, write_style};
use crate::text::{TextElement, TextPatch, write_text};
use crate::time::now_millis;
use crate::transform::{Transform, TransformValues, read_transform, write_transform};

/// Highlight class written by older editor builds.
const LEGACY_SELECTED_CLASS: &str = "selected-element";
const ORIGINAL_STROKE_ATTR: &str = "data-original-stroke";
const EDITABLE_CLASSES: [&str; 3] = ["editable", "editable-fill", "editable-stroke"];

/// Invoked with the new selection after every selection change.
pub type SelectionCallback = Box<dyn FnMut(Option<&str>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    MouseEnter,
    MouseLeave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reaction {
    Select,
    ClearSelection,
    HoverOn,
    HoverOff,
}

#[derive(Debug, Clone, Copy)]
struct Listener {
    node: NodeId,
    event: EventKind,
    reaction: Reaction,
}

/// Where a click landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    /// The element carrying this id (or one of its descendants without an id
    /// of their own, as reported by the host).
    Element(String),
    /// The root `<svg>` itself.
    Background,
}

struct Mounted {
    container: String,
    doc: Document,
    /// Editable and synthetic elements by id, in document order.
    index: IndexMap<String, NodeId>,
    original_styles: HashMap<String, Style>,
    listeners: Vec<Listener>,
}

impl Mounted {
    fn node(&self, id: &str) -> Option<NodeId> {
        let node = *self.index.get(id)?;
        (self.doc.is_attached(node) && self.doc.attr(node, "id") == Some(id)).then_some(node)
    }

    fn listener(&self, node: NodeId, event: EventKind) -> Option<Reaction> {
        self.listeners
            .iter()
            .find(|l| l.node == node && l.event == event)
            .map(|l| l.reaction)
    }

    fn wire_element(&mut self, node: NodeId) {
        for (event, reaction) in [
            (EventKind::Click, Reaction::Select),
            (EventKind::MouseEnter, Reaction::HoverOn),
            (EventKind::MouseLeave, Reaction::HoverOff),
        ] {
            self.listeners.push(Listener { node, event, reaction });
        }
    }

    fn unwire(&mut self, node: NodeId) {
        self.listeners.retain(|l| l.node != node);
    }
}

/// One editable, interactive SVG document plus its selection state.
pub struct Scene {
    config: EditorConfig,
    mounted: Option<Mounted>,
    selected: Option<String>,
    on_select: Option<SelectionCallback>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        Self {
            config,
            mounted: None,
            selected: None,
            on_select: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    // ========================================================================
    // Mounting
    // ========================================================================

    /// Mount `svg` into `container_id`, replacing whatever was mounted.
    ///
    /// The previous document and all its listeners are released first, so a
    /// failed mount leaves the scene empty.
    pub fn mount(&mut self, svg: &str, container_id: &str) -> Result<(), SceneError> {
        self.unmount();
        if container_id.trim().is_empty() {
            return Err(SceneError::MissingContainer);
        }

        let mut doc = Document::parse(svg)?;
        self.normalize_root(&mut doc);

        let assigned = assign_ids(&mut doc, now_millis());
        let root = doc.root();
        let mut mounted = Mounted {
            container: container_id.to_string(),
            original_styles: assigned
                .iter()
                .map(|(id, node)| (id.clone(), read_style(&doc, *node)))
                .collect(),
            index: assigned.into_iter().collect(),
            doc,
            listeners: vec![Listener {
                node: root,
                event: EventKind::Click,
                reaction: Reaction::ClearSelection,
            }],
        };

        let wired: Vec<NodeId> = mounted
            .index
            .values()
            .copied()
            .filter(|&node| self.accepts_interaction(&mounted.doc, node))
            .collect();
        for node in wired {
            mounted.wire_element(node);
        }

        debug!(
            "mounted {} elements into #{} with {} listeners",
            mounted.index.len(),
            mounted.container,
            mounted.listeners.len()
        );
        self.mounted = Some(mounted);
        Ok(())
    }

    /// Drop the mounted document, its listeners and the selection.
    pub fn unmount(&mut self) {
        if let Some(previous) = self.mounted.take() {
            debug!(
                "released {} listeners from #{}",
                previous.listeners.len(),
                previous.container
            );
        }
        self.selected = None;
    }

    fn normalize_root(&self, doc: &mut Document) {
        let root = doc.root();
        if doc.attr(root, "viewBox").and_then(parse_view_box).is_none() {
            doc.set_attr(root, "viewBox", self.config.default_view_box.as_str());
        }
        doc.set_attr(root, "width", "100%");
        doc.set_attr(root, "height", "100%");
    }

    fn accepts_interaction(&self, doc: &Document, node: NodeId) -> bool {
        !self.config.require_editable_class || EDITABLE_CLASSES.iter().any(|class| doc.has_class(node, class))
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    pub fn container(&self) -> Option<&str> {
        self.mounted.as_ref().map(|m| m.container.as_str())
    }

    /// Number of live `(node, event, reaction)` registrations.
    pub fn listener_count(&self) -> usize {
        self.mounted.as_ref().map_or(0, |m| m.listeners.len())
    }

    /// Ids of mounted elements, in document order.
    pub fn element_ids(&self) -> Vec<String> {
        self.mounted
            .as_ref()
            .map(|m| {
                m.index
                    .keys()
                    .filter(|id| m.node(id).is_some())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    // ========================================================================
    // Interaction
    // ========================================================================

    /// Replace the selection callback.
    pub fn set_selection_callback(&mut self, callback: impl FnMut(Option<&str>) + 'static) {
        self.on_select = Some(Box::new(callback));
    }

    pub fn clear_selection_callback(&mut self) {
        self.on_select = None;
    }

    fn notify(&mut self) {
        let selected = self.selected.clone();
        if let Some(callback) = self.on_select.as_mut() {
            callback(selected.as_deref());
        }
    }

    /// Deliver a click. The nearest listening node on the path from the
    /// target up to the root reacts; returns whether anything did.
    pub fn click(&mut self, target: &ClickTarget) -> bool {
        let Some(mounted) = self.mounted.as_ref() else {
            return false;
        };
        let root = mounted.doc.root();
        let target_node = match target {
            ClickTarget::Background => root,
            ClickTarget::Element(id) => match mounted.doc.find_by_id(id) {
                Some(node) => node,
                None => {
                    debug!("click on unknown element {id:?}");
                    return false;
                }
            },
        };

        let mut current = Some(target_node);
        let mut handler = None;
        while let Some(node) = current {
            if let Some(reaction) = mounted.listener(node, EventKind::Click) {
                handler = Some((node, reaction));
                break;
            }
            current = mounted.doc.parent(node);
        }

        match handler {
            Some((node, Reaction::Select)) => {
                let Some(id) = mounted.doc.attr(node, "id").map(str::to_string) else {
                    return false;
                };
                self.highlight_selection(Some(&id));
                self.notify();
                true
            }
            Some((_, Reaction::ClearSelection)) if target_node == root => {
                self.highlight_selection(None);
                self.notify();
                true
            }
            _ => false,
        }
    }

    /// Deliver a pointer enter/leave on the element with `id`.
    pub fn hover(&mut self, id: &str, entering: bool) -> bool {
        let selected = self.selected.clone();
        let hover_class = self.config.hover_class.clone();
        let Some(mounted) = self.mounted.as_mut() else {
            return false;
        };
        let Some(node) = mounted.node(id) else {
            return false;
        };
        let event = if entering {
            EventKind::MouseEnter
        } else {
            EventKind::MouseLeave
        };
        match mounted.listener(node, event) {
            Some(Reaction::HoverOn) if selected.as_deref() != Some(id) => {
                mounted.doc.add_class(node, &hover_class);
                true
            }
            Some(Reaction::HoverOff) => {
                mounted.doc.remove_class(node, &hover_class);
                true
            }
            _ => false,
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Move the selection highlight to `id`, or clear it with `None`.
    ///
    /// The previous highlight is removed first, even if that node has since
    /// left the document. Returns false when `id` does not resolve, in which
    /// case nothing is selected afterwards. The callback is not invoked.
    pub fn highlight_selection(&mut self, id: Option<&str>) -> bool {
        let selected_class = self.config.selected_class.clone();
        let hover_class = self.config.hover_class.clone();
        let previous = self.selected.take();
        let Some(mounted) = self.mounted.as_mut() else {
            return id.is_none();
        };

        if let Some(node) = previous.as_deref().and_then(|prev| mounted.index.get(prev).copied()) {
            mounted.doc.remove_class(node, &selected_class);
        }

        let Some(id) = id else {
            debug!("selection cleared");
            return true;
        };
        match mounted.node(id) {
            Some(node) => {
                mounted.doc.remove_class(node, &hover_class);
                mounted.doc.add_class(node, &selected_class);
                self.selected = Some(id.to_string());
                debug!("selected {id}");
                true
            }
            None => {
                warn!("cannot select unknown element {id:?}");
                false
            }
        }
    }

    /// Ids currently carrying the selection highlight.
    pub fn highlighted(&self) -> Vec<String> {
        self.ids_with_class(&self.config.selected_class)
    }

    /// Ids currently carrying the hover highlight.
    pub fn hovered(&self) -> Vec<String> {
        self.ids_with_class(&self.config.hover_class)
    }

    fn ids_with_class(&self, class: &str) -> Vec<String> {
        let Some(mounted) = self.mounted.as_ref() else {
            return Vec::new();
        };
        mounted
            .doc
            .descendant_elements(mounted.doc.root())
            .into_iter()
            .filter(|&node| mounted.doc.has_class(node, class))
            .filter_map(|node| mounted.doc.attr(node, "id").map(str::to_string))
            .collect()
    }

    // ========================================================================
    // Style and transform
    // ========================================================================

    fn resolve(&self, id: &str) -> Option<(&Mounted, NodeId)> {
        let mounted = self.mounted.as_ref()?;
        mounted.node(id).map(|node| (mounted, node))
    }

    fn resolve_mut(&mut self, id: &str, operation: &str) -> Option<(&mut Mounted, NodeId)> {
        let Some(mounted) = self.mounted.as_mut() else {
            warn!("{operation}: nothing mounted");
            return None;
        };
        match mounted.node(id) {
            Some(node) => Some((mounted, node)),
            None => {
                warn!("{operation}: unknown element {id:?}");
                None
            }
        }
    }

    /// Write the fields present in `patch` onto the element.
    pub fn apply_style(&mut self, id: &str, patch: &StylePatch) -> bool {
        let Some((mounted, node)) = self.resolve_mut(id, "apply_style") else {
            return false;
        };
        write_style(&mut mounted.doc, node, patch);
        true
    }

    /// Overwrite the element's transform with absolute values, rotating
    /// about the element's pivot.
    pub fn apply_transform(&mut self, id: &str, values: &TransformValues) -> bool {
        let Some((mounted, node)) = self.resolve_mut(id, "apply_transform") else {
            return false;
        };
        let pivot = pivot(&mounted.doc, node);
        write_transform(&mut mounted.doc, node, values, pivot);
        true
    }

    /// Restore the style captured at mount (or at creation, for text).
    pub fn reset_style(&mut self, id: &str) -> bool {
        let Some(original) = self
            .mounted
            .as_ref()
            .and_then(|m| m.original_styles.get(id))
            .cloned()
        else {
            return false;
        };
        self.apply_style(id, &StylePatch::from(original))
    }

    /// Live style of the element.
    pub fn get_style(&self, id: &str) -> Option<Style> {
        let (mounted, node) = self.resolve(id)?;
        Some(read_style(&mounted.doc, node))
    }

    /// Live transform of the element.
    pub fn get_transform(&self, id: &str) -> Option<Transform> {
        let (mounted, node) = self.resolve(id)?;
        Some(read_transform(&mounted.doc, node))
    }

    /// Fresh descriptors for every mounted element, in document order.
    pub fn descriptors(&self) -> Descriptors {
        let Some(mounted) = self.mounted.as_ref() else {
            return Descriptors::new();
        };
        mounted
            .index
            .keys()
            .filter_map(|id| {
                let node = mounted.node(id)?;
                let original = mounted
                    .original_styles
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| read_style(&mounted.doc, node));
                Some((id.clone(), describe(&mounted.doc, node, id, original)))
            })
            .collect()
    }

    /// Ids of mounted elements following `role`.
    pub fn elements_with_role(&self, role: Role) -> Vec<String> {
        let Some(mounted) = self.mounted.as_ref() else {
            return Vec::new();
        };
        mounted
            .index
            .iter()
            .filter(|(id, node)| mounted.node(id).is_some() && role_of(&mounted.doc, **node) == Some(role))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Recolor every role-bearing element with its palette slot. Elements
    /// without a role are left alone. Returns how many were recolored.
    pub fn apply_palette(&mut self, palette: &Palette) -> usize {
        let mut changed = 0;
        for role in Role::ALL {
            for id in self.elements_with_role(role) {
                if self.apply_style(&id, &StylePatch::fill(palette.color_for(role))) {
                    changed += 1;
                }
            }
        }
        debug!("palette {} recolored {changed} elements", palette.id);
        changed
    }

    // ========================================================================
    // Synthetic text
    // ========================================================================

    /// Create a `<text>` node for `text`, or bring the existing node with the
    /// same id in line with it. Text nodes are always interactive.
    pub fn add_text(&mut self, text: &TextElement) -> bool {
        let Some(mounted) = self.mounted.as_mut() else {
            warn!("add_text: nothing mounted");
            return false;
        };

        if let Some(node) = mounted.node(&text.id) {
            if mounted.doc.tag(node) != Some("text") {
                warn!("add_text: {:?} is not a text element", text.id);
                return false;
            }
            write_text(&mut mounted.doc, node, &text.to_patch());
            return true;
        }
        if mounted.doc.find_by_id(&text.id).is_some() {
            warn!("add_text: id {:?} already belongs to another element", text.id);
            return false;
        }

        let node = mounted.doc.create_element("text");
        mounted.doc.set_attr(node, "id", text.id.as_str());
        write_text(&mut mounted.doc, node, &text.to_patch());
        let root = mounted.doc.root();
        mounted.doc.append_child(root, node);
        mounted.index.insert(text.id.clone(), node);
        mounted
            .original_styles
            .insert(text.id.clone(), read_style(&mounted.doc, node));
        mounted.wire_element(node);
        debug!("added text {}", text.id);
        true
    }

    pub fn update_text(&mut self, id: &str, patch: &TextPatch) -> bool {
        let Some((mounted, node)) = self.resolve_mut(id, "update_text") else {
            return false;
        };
        if mounted.doc.tag(node) != Some("text") {
            warn!("update_text: {id:?} is not a text element");
            return false;
        }
        write_text(&mut mounted.doc, node, patch);
        true
    }

    /// Remove a text node. Removing the selected node clears the selection
    /// and notifies the callback.
    pub fn remove_text(&mut self, id: &str) -> bool {
        let Some((mounted, node)) = self.resolve_mut(id, "remove_text") else {
            return false;
        };
        if mounted.doc.tag(node) != Some("text") {
            warn!("remove_text: {id:?} is not a text element");
            return false;
        }
        mounted.doc.detach(node);
        mounted.unwire(node);
        mounted.index.shift_remove(id);
        mounted.original_styles.remove(id);

        if self.selected.as_deref() == Some(id) {
            self.selected = None;
            self.notify();
        }
        true
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Clean markup of the mounted document, or `None` when nothing is
    /// mounted. Works on a copy; the live document is never touched.
    pub fn serialize(&self) -> Option<String> {
        let mounted = self.mounted.as_ref()?;
        let mut clone = mounted.doc.clone();
        let root = clone.root();
        if clone.attr(root, "xmlns").is_none() {
            clone.set_attr(root, "xmlns", SVG_NAMESPACE);
        }

        let transient = [
            self.config.selected_class.as_str(),
            self.config.hover_class.as_str(),
            LEGACY_SELECTED_CLASS,
        ];
        let mut nodes = clone.descendant_elements(root);
        nodes.push(root);
        for node in nodes {
            for class in transient {
                clone.remove_class(node, class);
            }
            if clone.attr(node, "class").is_some_and(|c| c.trim().is_empty()) {
                clone.remove_attr(node, "class");
            }
            if let Some(stroke) = clone.remove_attr(node, ORIGINAL_STROKE_ATTR) {
                if !stroke.is_empty() {
                    clone.set_attr(node, "stroke", stroke);
                }
            }
        }

        match clone.to_xml() {
            Ok(xml) => Some(xml),
            Err(err) => {
                error!("serializing the scene failed: {err}");
                None
            }
        }
    }
}
