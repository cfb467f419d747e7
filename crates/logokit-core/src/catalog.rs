//! Collaborators the engine consumes: template markup and font bytes.
//!
//! Both are asynchronous because the browser fetches them over the network.
//! The in-memory implementations serve tests and hosts that preload assets.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::FontLoadError;

/// Catalog entry for a logo template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    /// Where the host fetches the markup from.
    pub path: String,
}

pub trait TemplateCatalog {
    fn template(&self, id: &str) -> Option<Template>;

    /// Raw markup of the template, `None` when it cannot be loaded.
    fn load_template_content(&self, id: &str) -> impl Future<Output = Option<String>>;
}

pub trait FontLoader {
    /// Font file bytes (TTF/OTF) for a family.
    fn load_font(&self, family: &str) -> impl Future<Output = Result<Vec<u8>, FontLoadError>>;
}

/// Templates held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplates {
    entries: Vec<(Template, Option<String>)>,
}

impl MemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template. `content: None` models an entry whose markup is
    /// missing.
    pub fn insert(&mut self, template: Template, content: Option<String>) {
        self.entries.retain(|(existing, _)| existing.id != template.id);
        self.entries.push((template, content));
    }

    pub fn with(mut self, id: &str, name: &str, content: &str) -> Self {
        let template = Template {
            id: id.to_string(),
            name: name.to_string(),
            path: format!("/templates/{id}.svg"),
        };
        self.insert(template, Some(content.to_string()));
        self
    }

    pub fn templates(&self) -> Vec<Template> {
        self.entries.iter().map(|(t, _)| t.clone()).collect()
    }
}

impl TemplateCatalog for MemoryTemplates {
    fn template(&self, id: &str) -> Option<Template> {
        self.entries.iter().find(|(t, _)| t.id == id).map(|(t, _)| t.clone())
    }

    async fn load_template_content(&self, id: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|(t, _)| t.id == id)
            .and_then(|(_, content)| content.clone())
    }
}

/// Font files held in memory, keyed by family name. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryFonts {
    fonts: HashMap<String, Arc<[u8]>>,
}

impl MemoryFonts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, family: impl Into<String>, data: Vec<u8>) {
        self.fonts.insert(family.into(), Arc::from(data));
    }

    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.fonts.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

impl FontLoader for MemoryFonts {
    async fn load_font(&self, family: &str) -> Result<Vec<u8>, FontLoadError> {
        self.fonts
            .get(family)
            .map(|data| data.to_vec())
            .ok_or_else(|| FontLoadError::new(family, "not registered"))
    }
}
