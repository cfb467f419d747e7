#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

use logokit_wasm::{LogoEditor, contrast_ratio_wasm, hex_to_rgb, pick_text_color_wasm};

const LOGO: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 400 400"><rect id="bg" class="primary-color-element" width="400" height="400" fill="#000000"/></svg>"##;

#[wasm_bindgen_test]
fn test_color_helpers() {
    let rgb = hex_to_rgb("#0B3C5D").unwrap();
    let g = js_sys::Reflect::get(&rgb, &JsValue::from_str("g")).unwrap();
    assert_eq!(g.as_f64(), Some(60.0));
    assert!(hex_to_rgb("nope").unwrap().is_null());
    assert_eq!(contrast_ratio_wasm("#000000", "#FFFFFF").unwrap(), 21.0);
    assert_eq!(pick_text_color_wasm("#0B3C5D").unwrap(), "#FFFFFF");
}

#[wasm_bindgen_test]
fn test_editor_round_trip() {
    let mut editor = LogoEditor::new(None).unwrap();
    editor.mount(LOGO).unwrap();
    assert!(editor.click("bg"));
    assert_eq!(editor.apply_palette(JsValue::from_str("modern")).unwrap(), 1);
    let svg = editor.serialize().unwrap();
    assert!(svg.contains(r##"fill="#0B3C5D""##));
    assert!(!svg.contains("selected-highlight"));
    assert!(editor.mount("<svg><g></svg>").is_err());
}
