use std::cell::RefCell;
use std::rc::Rc;

use futures::executor::block_on;
use logokit_core::dom::Document;
use logokit_core::{
    BuiltinPalettes, ClickTarget, Color, MemoryFonts, MemoryTemplates, Palette, PaletteCatalog, Project, Scene,
    StylePatch, TextElement, TextPatch, contrast_ratio, hex_to_rgb,
};

const TEMPLATE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 400 400">
    <rect id="badge" class="primary-color-element" x="50" y="50" width="300" height="300" fill="#000000"/>
    <circle id="ring" class="secondary-color-element" cx="200" cy="200" r="100" fill="none" stroke="#333333"/>
    <path id="spark" class="accent-color-element" d="M200 120 L220 200 L200 280 L180 200 Z"/>
</svg>"##;

fn element(doc: &Document, id: &str) -> logokit_core::dom::NodeId {
    doc.find_by_id(id).unwrap_or_else(|| panic!("no element {id}"))
}

#[test]
fn palette_fill_reaches_serialized_output() {
    let mut scene = Scene::new();
    scene.mount(TEMPLATE, "canvas").unwrap();
    let palette = Palette::new(
        "red",
        "Red",
        Color::new(0xFF, 0, 0),
        Color::new(0x22, 0x22, 0x22),
        Color::new(0x33, 0x33, 0x33),
    );
    assert_eq!(scene.apply_palette(&palette), 3);

    let out = scene.serialize().unwrap();
    let doc = Document::parse(&out).unwrap();
    assert_eq!(doc.attr(element(&doc, "badge"), "fill"), Some("#FF0000"));
    assert_eq!(doc.attr(element(&doc, "ring"), "fill"), Some("#222222"));
    assert_eq!(doc.attr(element(&doc, "ring"), "stroke"), Some("#333333"));
    assert_eq!(doc.attr(element(&doc, "spark"), "fill"), Some("#333333"));
}

#[test]
fn click_background_then_other_element() {
    let mut scene = Scene::new();
    scene.mount(TEMPLATE, "canvas").unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    scene.set_selection_callback(move |id| sink.borrow_mut().push(id.map(str::to_string)));

    assert!(scene.click(&ClickTarget::Element("badge".to_string())));
    assert_eq!(scene.highlighted(), ["badge"]);

    assert!(scene.click(&ClickTarget::Background));
    assert!(scene.highlighted().is_empty());
    assert_eq!(scene.selected(), None);

    assert!(scene.click(&ClickTarget::Element("spark".to_string())));
    assert_eq!(scene.highlighted(), ["spark"]);

    assert_eq!(
        *seen.borrow(),
        [Some("badge".to_string()), None, Some("spark".to_string())]
    );
}

#[test]
fn text_update_does_not_duplicate_nodes() {
    let mut scene = Scene::new();
    scene.mount(TEMPLATE, "canvas").unwrap();
    let text: TextElement = serde_json::from_str(
        r##"{
            "id": "name",
            "content": "Acme",
            "fontFamily": "Roboto",
            "fontSize": 24,
            "fill": "#000000",
            "position": { "x": 200, "y": 350 }
        }"##,
    )
    .unwrap();
    assert!(scene.add_text(&text));
    assert!(scene.update_text("name", &TextPatch::content("Acme Inc")));

    let out = scene.serialize().unwrap();
    let doc = Document::parse(&out).unwrap();
    let texts: Vec<_> = doc
        .descendant_elements(doc.root())
        .into_iter()
        .filter(|node| doc.tag(*node) == Some("text"))
        .collect();
    assert_eq!(texts.len(), 1);
    assert_eq!(doc.attr(texts[0], "id"), Some("name"));
    assert_eq!(doc.text_content(texts[0]), "Acme Inc");
}

#[test]
fn color_utilities() {
    let color = hex_to_rgb("#0B3C5D").unwrap();
    assert_eq!((color.r, color.g, color.b), (11, 60, 93));
    assert_eq!(contrast_ratio(Color::BLACK, Color::WHITE), 21.0);
}

#[test]
fn project_session_flow() {
    let templates = MemoryTemplates::new().with("badge", "Badge", TEMPLATE);
    let mut project = Project::new();
    block_on(project.load_template(&templates, "badge")).unwrap();

    project.click(&ClickTarget::Element("ring".to_string()));
    assert_eq!(project.selected(), Some("ring"));
    assert!(project.update_style(
        "ring",
        &StylePatch {
            stroke_width: Some(4.0),
            ..StylePatch::default()
        }
    ));

    let modern = BuiltinPalettes.palette("modern").unwrap();
    project.apply_palette(&modern);
    let name = project.add_text(&TextPatch::content("Acme")).unwrap();

    let svg = project.svg().unwrap().to_string();
    let doc = Document::parse(&svg).unwrap();
    assert_eq!(doc.attr(element(&doc, "badge"), "fill"), Some("#0B3C5D"));
    assert_eq!(doc.attr(element(&doc, "ring"), "stroke-width"), Some("4"));
    assert_eq!(doc.attr(element(&doc, &name), "fill"), Some("#FFFFFF"));
    assert!(!svg.contains("selected-highlight"));

    let png = block_on(project.export_png(1.0, &MemoryFonts::new())).unwrap();
    assert_eq!((png.width, png.height), (400, 400));
    assert!(png.to_data_url().starts_with("data:image/png;base64,"));
}
