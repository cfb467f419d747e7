//! Editing session for one logo.
//!
//! A [`Project`] wraps the [`Scene`] with the state the editor screens share:
//! which template is loaded, the canonical markup, the text elements, the
//! absolute transform values per element and the active palette. The
//! canonical markup is re-serialized after every successful mutation and is
//! what previews and exports consume.

use std::collections::HashMap;

use log::{debug, warn};
use serde::Serialize;

use crate::catalog::{FontLoader, TemplateCatalog};
use crate::color::{Color, pick_text_color};
use crate::config::EditorConfig;
use crate::error::ProjectError;
use crate::export::{PngImage, SvgBlob, to_png, to_svg};
use crate::palette::Palette;
use crate::scene::{ClickTarget, Scene};
use crate::style::{Style, StylePatch};
use crate::text::{TextElement, TextPatch};
use crate::time::now_millis;
use crate::transform::{TransformPatch, TransformValues};

/// Container id the session mounts into.
const CANVAS_CONTAINER: &str = "logo-canvas";

/// What the property panel shows for the selected element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedState {
    pub id: String,
    pub style: Style,
    pub transform: TransformValues,
}

pub struct Project {
    scene: Scene,
    template_id: Option<String>,
    svg: Option<String>,
    texts: Vec<TextElement>,
    transforms: HashMap<String, TransformValues>,
    palette: Option<Palette>,
    selected: Option<String>,
    text_counter: usize,
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

impl Project {
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        Self {
            scene: Scene::with_config(config),
            template_id: None,
            svg: None,
            texts: Vec::new(),
            transforms: HashMap::new(),
            palette: None,
            selected: None,
            text_counter: 0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn config(&self) -> &EditorConfig {
        self.scene.config()
    }

    pub fn template_id(&self) -> Option<&str> {
        self.template_id.as_deref()
    }

    /// Canonical markup of the current design.
    pub fn svg(&self) -> Option<&str> {
        self.svg.as_deref()
    }

    pub fn texts(&self) -> &[TextElement] {
        &self.texts
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    fn refresh(&mut self) {
        self.svg = self.scene.serialize();
        self.selected = self.scene.selected().map(str::to_string);
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Resolve, fetch and mount a template. Session state from the previous
    /// design is discarded.
    pub async fn load_template(&mut self, catalog: &impl TemplateCatalog, id: &str) -> Result<(), ProjectError> {
        let template = catalog
            .template(id)
            .ok_or_else(|| ProjectError::TemplateNotFound(id.to_string()))?;
        let content = catalog
            .load_template_content(&template.id)
            .await
            .ok_or_else(|| ProjectError::TemplateUnavailable(template.id.clone()))?;
        self.load_svg(&content)?;
        debug!("loaded template {} ({})", template.id, template.name);
        self.template_id = Some(template.id);
        Ok(())
    }

    /// Mount raw markup as the current design.
    pub fn load_svg(&mut self, svg: &str) -> Result<(), ProjectError> {
        self.template_id = None;
        self.svg = None;
        self.texts.clear();
        self.transforms.clear();
        self.palette = None;
        self.selected = None;
        self.scene.mount(svg, CANVAS_CONTAINER)?;
        self.refresh();
        Ok(())
    }

    // ========================================================================
    // Interaction
    // ========================================================================

    pub fn set_selection_callback(&mut self, callback: impl FnMut(Option<&str>) + 'static) {
        self.scene.set_selection_callback(callback);
    }

    pub fn click(&mut self, target: &ClickTarget) -> bool {
        let handled = self.scene.click(target);
        self.selected = self.scene.selected().map(str::to_string);
        handled
    }

    /// Hover highlights are transient, so the canonical markup is not
    /// refreshed.
    pub fn hover(&mut self, id: &str, entering: bool) -> bool {
        self.scene.hover(id, entering)
    }

    /// Select programmatically without notifying the selection callback.
    pub fn highlight(&mut self, id: Option<&str>) -> bool {
        let found = self.scene.highlight_selection(id);
        self.selected = self.scene.selected().map(str::to_string);
        found
    }

    /// Live style and transform values of the selected element.
    pub fn selected_state(&self) -> Option<SelectedState> {
        let id = self.selected.as_deref()?;
        Some(SelectedState {
            id: id.to_string(),
            style: self.scene.get_style(id)?,
            transform: self.transform_values(id)?,
        })
    }

    fn transform_values(&self, id: &str) -> Option<TransformValues> {
        match self.transforms.get(id) {
            Some(values) => Some(*values),
            None => self.scene.get_transform(id).map(|t| TransformValues::from(&t)),
        }
    }

    // ========================================================================
    // Edits
    // ========================================================================

    pub fn update_style(&mut self, id: &str, patch: &StylePatch) -> bool {
        if !self.scene.apply_style(id, patch) {
            return false;
        }
        self.refresh();
        true
    }

    /// Merge `patch` into the element's current absolute values and write
    /// the result.
    pub fn update_transform(&mut self, id: &str, patch: &TransformPatch) -> bool {
        let Some(current) = self.transform_values(id) else {
            warn!("update_transform: unknown element {id:?}");
            return false;
        };
        let values = current.merged(patch);
        if !self.scene.apply_transform(id, &values) {
            return false;
        }
        self.transforms.insert(id.to_string(), values);
        self.refresh();
        true
    }

    /// Recolor role-bearing elements and switch every text to the color
    /// that reads best on the primary. Returns the number of shapes
    /// recolored.
    pub fn apply_palette(&mut self, palette: &Palette) -> usize {
        let changed = self.scene.apply_palette(palette);
        let text_fill = pick_text_color(palette.primary);
        for text in &mut self.texts {
            text.fill = text_fill;
            let patch = TextPatch {
                fill: Some(text_fill),
                ..TextPatch::default()
            };
            self.scene.update_text(&text.id, &patch);
        }
        self.palette = Some(palette.clone());
        self.refresh();
        changed
    }

    /// Create a text element from a draft. Fields missing from the draft
    /// take the configured defaults; the fill defaults to the color that
    /// reads best on the palette's primary (or on white). Returns the new id,
    /// or `None` when nothing is mounted.
    pub fn add_text(&mut self, draft: &TextPatch) -> Option<String> {
        if !self.scene.is_mounted() {
            warn!("add_text: nothing mounted");
            return None;
        }
        let id = format!("text-{}-{}", now_millis(), self.text_counter);
        self.text_counter += 1;

        let config = self.scene.config();
        let background = self.palette.as_ref().map_or(Color::WHITE, |p| p.primary);
        let text = TextElement {
            id: id.clone(),
            content: draft.content.clone().unwrap_or_default(),
            font_family: draft
                .font_family
                .clone()
                .unwrap_or_else(|| config.default_font_family.clone()),
            font_size: draft
                .font_size
                .filter(|size| *size > 0.0)
                .unwrap_or(config.default_font_size),
            font_weight: draft.font_weight.unwrap_or_default(),
            fill: draft.fill.unwrap_or_else(|| pick_text_color(background)),
            position: draft.position.unwrap_or(config.default_text_position),
            alignment: draft.alignment.unwrap_or_default(),
            kind: draft.kind.unwrap_or_default(),
        };

        if !self.scene.add_text(&text) {
            return None;
        }
        self.texts.push(text);
        self.refresh();
        Some(id)
    }

    pub fn update_text(&mut self, id: &str, patch: &TextPatch) -> bool {
        if !self.scene.update_text(id, patch) {
            return false;
        }
        if let Some(text) = self.texts.iter_mut().find(|t| t.id == id) {
            text.apply(patch);
        }
        self.refresh();
        true
    }

    pub fn delete_text(&mut self, id: &str) -> bool {
        if !self.scene.remove_text(id) {
            return false;
        }
        self.texts.retain(|t| t.id != id);
        self.transforms.remove(id);
        self.refresh();
        true
    }

    // ========================================================================
    // Export
    // ========================================================================

    pub fn export_svg(&self) -> Result<SvgBlob, ProjectError> {
        self.svg.as_deref().map(to_svg).ok_or(ProjectError::NothingMounted)
    }

    pub async fn export_png(&self, scale: f32, fonts: &impl FontLoader) -> Result<PngImage, ProjectError> {
        let svg = self.svg.as_deref().ok_or(ProjectError::NothingMounted)?;
        Ok(to_png(svg, scale, &self.config().export, fonts).await?)
    }
}
