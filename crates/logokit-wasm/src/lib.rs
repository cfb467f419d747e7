use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use logokit_core::{
    BuiltinPalettes, ClickTarget, Color, EditorConfig, MemoryFonts, Palette, PaletteCatalog, Project, StylePatch,
    TextPatch, TransformPatch, contrast_ratio, pick_text_color, to_png,
};

/// Initialize the WASM module (sets up panic hook for better error messages).
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Plain JS objects rather than `Map`s, so descriptor maps read like JSON.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

fn parse_color(raw: &str) -> Result<Color, JsValue> {
    Color::parse(raw).ok_or_else(|| JsValue::from_str(&format!("Invalid color: {}", raw)))
}

/// The logo editor, one design at a time.
#[wasm_bindgen]
pub struct LogoEditor {
    project: Project,
    fonts: MemoryFonts,
}

#[wasm_bindgen]
impl LogoEditor {
    /// `config_json`: optional `EditorConfig` JSON, e.g. `{ "requireEditableClass": true }`
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<LogoEditor, JsValue> {
        let config = match config_json.as_deref() {
            Some(json) => EditorConfig::from_json(json)
                .map_err(|e| JsValue::from_str(&format!("Invalid options: {}", e)))?,
            None => EditorConfig::default(),
        };
        Ok(LogoEditor {
            project: Project::with_config(config),
            fonts: MemoryFonts::new(),
        })
    }

    /// Replace the current design with `svg`.
    pub fn mount(&mut self, svg: &str) -> Result<(), JsValue> {
        self.project.load_svg(svg).map_err(js_error)
    }

    pub fn click(&mut self, id: &str) -> bool {
        self.project.click(&ClickTarget::Element(id.to_string()))
    }

    #[wasm_bindgen(js_name = "clickBackground")]
    pub fn click_background(&mut self) -> bool {
        self.project.click(&ClickTarget::Background)
    }

    pub fn hover(&mut self, id: &str, entering: bool) -> bool {
        self.project.hover(id, entering)
    }

    /// `callback(id | null)` runs after every selection change.
    #[wasm_bindgen(js_name = "setSelectionCallback")]
    pub fn set_selection_callback(&mut self, callback: js_sys::Function) {
        self.project.set_selection_callback(move |id| {
            let arg = id.map_or(JsValue::NULL, JsValue::from_str);
            if let Err(err) = callback.call1(&JsValue::NULL, &arg) {
                log::warn!("selection callback threw: {:?}", err);
            }
        });
    }

    /// `patch`: `{ fill?, stroke?, strokeWidth?, opacity? }`
    #[wasm_bindgen(js_name = "applyStyle")]
    pub fn apply_style(&mut self, id: &str, patch: JsValue) -> Result<bool, JsValue> {
        let patch: StylePatch = from_js(patch, "style")?;
        Ok(self.project.update_style(id, &patch))
    }

    /// `patch`: `{ x?, y?, rotation?, scaleX?, scaleY? }`, merged into the
    /// element's current values.
    #[wasm_bindgen(js_name = "applyTransform")]
    pub fn apply_transform(&mut self, id: &str, patch: JsValue) -> Result<bool, JsValue> {
        let patch: TransformPatch = from_js(patch, "transform")?;
        Ok(self.project.update_transform(id, &patch))
    }

    /// Select `id` (or clear with `null`) without running the callback.
    pub fn highlight(&mut self, id: Option<String>) -> bool {
        self.project.highlight(id.as_deref())
    }

    /// Returns the new text id, or `undefined` when nothing is mounted.
    #[wasm_bindgen(js_name = "addText")]
    pub fn add_text(&mut self, draft: JsValue) -> Result<Option<String>, JsValue> {
        let draft: TextPatch = from_js(draft, "text")?;
        Ok(self.project.add_text(&draft))
    }

    #[wasm_bindgen(js_name = "updateText")]
    pub fn update_text(&mut self, id: &str, patch: JsValue) -> Result<bool, JsValue> {
        let patch: TextPatch = from_js(patch, "text")?;
        Ok(self.project.update_text(id, &patch))
    }

    #[wasm_bindgen(js_name = "removeText")]
    pub fn remove_text(&mut self, id: &str) -> bool {
        self.project.delete_text(id)
    }

    /// `palette`: a built-in palette id, or `{ id, name, primary, secondary, accent }`.
    /// Returns how many shapes were recolored.
    #[wasm_bindgen(js_name = "applyPalette")]
    pub fn apply_palette(&mut self, palette: JsValue) -> Result<u32, JsValue> {
        let palette: Palette = match palette.as_string() {
            Some(id) => BuiltinPalettes
                .palette(&id)
                .ok_or_else(|| JsValue::from_str(&format!("Unknown palette: {}", id)))?,
            None => from_js(palette, "palette")?,
        };
        Ok(self.project.apply_palette(&palette) as u32)
    }

    #[wasm_bindgen(js_name = "getStyle")]
    pub fn get_style(&self, id: &str) -> Result<JsValue, JsValue> {
        match self.project.scene().get_style(id) {
            Some(style) => to_js(&style),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    #[wasm_bindgen(js_name = "getTransform")]
    pub fn get_transform(&self, id: &str) -> Result<JsValue, JsValue> {
        match self.project.scene().get_transform(id) {
            Some(transform) => to_js(&transform),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// `{ id, style, transform }` of the selection, or `undefined`.
    #[wasm_bindgen(js_name = "selectedState")]
    pub fn selected_state(&self) -> Result<JsValue, JsValue> {
        match self.project.selected_state() {
            Some(state) => to_js(&state),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// `{ [id]: { id, type, style, originalStyle, transform, role? } }` in
    /// document order.
    pub fn descriptors(&self) -> Result<JsValue, JsValue> {
        to_js(&self.project.scene().descriptors())
    }

    /// Clean markup of the current design.
    pub fn serialize(&self) -> Option<String> {
        self.project.svg().map(str::to_string)
    }

    /// Make font bytes (TTF/OTF) available to PNG export.
    #[wasm_bindgen(js_name = "registerFont")]
    pub fn register_font(&mut self, family: &str, bytes: Vec<u8>) {
        self.fonts.insert(family, bytes);
    }

    /// Resolves to a `data:image/png;base64,...` URL.
    #[wasm_bindgen(js_name = "exportPng")]
    pub fn export_png(&self, scale: f32) -> Result<js_sys::Promise, JsValue> {
        let svg = self
            .project
            .svg()
            .ok_or_else(|| JsValue::from_str("no logo is loaded"))?
            .to_string();
        let config = self.project.config().export.clone();
        let fonts = self.fonts.clone();
        Ok(future_to_promise(async move {
            let png = to_png(&svg, scale, &config, &fonts).await.map_err(js_error)?;
            Ok(JsValue::from_str(&png.to_data_url()))
        }))
    }
}

#[derive(Serialize)]
struct Rgb {
    r: u8,
    g: u8,
    b: u8,
}

/// `"#0B3C5D"` -> `{ r: 11, g: 60, b: 93 }`, `null` when not a hex color.
#[wasm_bindgen(js_name = "hexToRgb")]
pub fn hex_to_rgb(hex: &str) -> Result<JsValue, JsValue> {
    match logokit_core::hex_to_rgb(hex) {
        Some(Color { r, g, b }) => to_js(&Rgb { r, g, b }),
        None => Ok(JsValue::NULL),
    }
}

/// WCAG contrast ratio between two colors, 1 to 21.
#[wasm_bindgen(js_name = "contrastRatio")]
pub fn contrast_ratio_wasm(a: &str, b: &str) -> Result<f64, JsValue> {
    Ok(contrast_ratio(parse_color(a)?, parse_color(b)?))
}

/// `#000000` or `#FFFFFF`, whichever reads better on `background`.
#[wasm_bindgen(js_name = "pickTextColor")]
pub fn pick_text_color_wasm(background: &str) -> Result<String, JsValue> {
    Ok(pick_text_color(parse_color(background)?).to_hex())
}

/// The built-in palettes.
#[wasm_bindgen]
pub fn palettes() -> Result<JsValue, JsValue> {
    to_js(&BuiltinPalettes.palettes())
}

/// Get version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
