#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Builder, drag and viewer scenarios.

mod common;

use serde_json::json;
use tessera_kernel::content::{BlockTypeDefinition, BlockTypeRegistry};
use tessera_kernel::editor::{DragOutcome, Point};
use tessera_kernel::{ContentError, ContentViewer};
use tessera_sdk::BlockId;
use tessera_test_utils::{assert, heading, paragraph, paragraphs, test_block};

use common::{ROW_HEIGHT, block_ids, builder, stacked};

/// Pointer position inside row `index` of a stacked layout.
fn over_row(index: usize, fraction: f64) -> Point {
    Point::new(10.0, (index as f64 + fraction) * ROW_HEIGHT)
}

#[test]
fn heading_then_paragraph_scenario() {
    let registry = BlockTypeRegistry::new();
    for definition in tessera_kernel::content::standard_definitions() {
        if matches!(definition.type_name.as_str(), "paragraph" | "heading") {
            registry.register(definition).unwrap();
        }
    }
    let mut builder = tessera_kernel::ContentBuilder::new(registry.clone());

    builder.insert_block_at("heading", 0).unwrap();
    builder.insert_block_at("paragraph", 1).unwrap();
    let blocks = builder.serialize();

    let types: Vec<_> = blocks.iter().map(|b| b.block_type()).collect();
    assert_eq!(types, ["heading", "paragraph"]);
    assert_eq!(
        blocks[0].data(),
        &registry.get("heading").unwrap().create_default_data()
    );
    assert_eq!(
        blocks[1].data(),
        &registry.get("paragraph").unwrap().create_default_data()
    );

    let err = builder.insert_block_at("quote", 0).unwrap_err();
    assert!(matches!(err, ContentError::UnknownBlockType { .. }));
    assert_eq!(builder.model().len(), 2);
}

#[test]
fn drag_first_block_to_index_two_commits_once() {
    let mut builder = builder();
    builder.load(paragraphs(&["a", "b", "c", "d"]));
    let layout = stacked(&block_ids(&["a", "b", "c", "d"]));

    assert!(builder.handle_drag_start(&BlockId::new("a"), over_row(0, 0.5)));
    builder.handle_drag_move(over_row(1, 0.6), &layout);
    let target = builder.handle_drag_move(over_row(3, 0.0), &layout);
    assert_eq!(target, Some(2));

    let outcome = builder.handle_drag_end(true).unwrap();
    assert_eq!(
        outcome,
        DragOutcome::Moved {
            id: BlockId::new("a"),
            from: 0,
            to: 2
        }
    );
    assert::order(&builder.serialize(), &["b", "c", "a", "d"]);
}

#[test]
fn cancelled_drag_leaves_order_unchanged() {
    let mut builder = builder();
    builder.load(paragraphs(&["a", "b", "c", "d"]));
    let layout = stacked(&block_ids(&["a", "b", "c", "d"]));

    builder.handle_drag_start(&BlockId::new("a"), over_row(0, 0.5));
    builder.handle_drag_move(over_row(3, 0.0), &layout);
    assert_eq!(builder.handle_drag_end(false).unwrap(), DragOutcome::Cancelled);
    assert::order(&builder.serialize(), &["a", "b", "c", "d"]);
}

#[test]
fn drop_without_movement_is_unchanged() {
    let mut builder = builder();
    builder.load(paragraphs(&["a", "b"]));
    builder.handle_drag_start(&BlockId::new("b"), over_row(1, 0.5));
    assert_eq!(builder.handle_drag_end(true).unwrap(), DragOutcome::Unchanged);
    assert!(!builder.drag().is_dragging());
}

#[test]
fn removing_dragged_block_cancels_drag() {
    let mut builder = builder();
    builder.load(paragraphs(&["a", "b", "c"]));
    builder.handle_drag_start(&BlockId::new("b"), over_row(1, 0.5));
    builder.remove_block(&BlockId::new("b")).unwrap();
    assert!(!builder.drag().is_dragging());
    assert_eq!(builder.handle_drag_end(true).unwrap(), DragOutcome::NotDragging);
    assert::order(&builder.serialize(), &["a", "c"]);
}

#[test]
fn render_shows_preview_order_while_dragging() {
    let mut builder = builder();
    builder.load(paragraphs(&["a", "b", "c"]));
    let layout = stacked(&block_ids(&["a", "b", "c"]));
    builder.handle_drag_start(&BlockId::new("a"), over_row(0, 0.5));
    builder.handle_drag_move(over_row(2, 0.9), &layout);

    let surface = builder.render();
    let blocks = &surface.children["blocks"];
    let order: Vec<_> = blocks
        .ordered_children()
        .iter()
        .map(|w| w.attr("data-block-id").unwrap().to_string())
        .collect();
    assert_eq!(order, ["b", "c", "a"]);
    assert!(blocks.children["block_0002"].has_class("block--dragging"));

    // The document itself has not moved yet
    assert::order(&builder.serialize(), &["a", "b", "c"]);
}

#[test]
fn settings_patch_accepts_and_flags() {
    let mut builder = builder();
    builder.load(vec![
        test_block("image")
            .with_id("img")
            .with_data(json!({ "file": { "url": "https://cdn.example.com/a.png" }, "caption": "" }))
            .build(),
    ]);
    let id = BlockId::new("img");
    assert!(!builder.has_validation_errors(&id));

    let result = builder
        .apply_settings_patch(&id, &json!({ "url": "javascript:alert(1)" }))
        .unwrap();
    assert!(!result.is_valid());
    assert!(builder.has_validation_errors(&id));
    // Data is kept even though it is invalid
    assert_eq!(
        builder.model().get(&id).unwrap().data()["file"]["url"],
        "javascript:alert(1)"
    );

    builder
        .apply_settings_patch(&id, &json!({ "url": "https://cdn.example.com/b.png" }))
        .unwrap();
    assert!(!builder.has_validation_errors(&id));
}

#[test]
fn stale_ids_are_reported() {
    let mut builder = builder();
    builder.load(paragraphs(&["a"]));
    let gone = BlockId::new("gone");
    assert!(matches!(
        builder.select_block(&gone),
        Err(ContentError::BlockNotFound { .. })
    ));
    assert!(matches!(
        builder.apply_settings_patch(&gone, &json!({})),
        Err(ContentError::BlockNotFound { .. })
    ));
    assert!(!builder.handle_drag_start(&gone, Point::default()));
}

#[test]
fn insertion_menu_lifecycle() {
    let mut builder = builder();
    builder.load(paragraphs(&["a"]));
    builder.open_insertion_menu(7);
    assert_eq!(builder.insertion_menu(), Some(1));

    let id = builder.insert_block_at("divider", 1).unwrap();
    assert_eq!(builder.insertion_menu(), None);
    assert_eq!(builder.active_block(), Some(&id));
}

#[test]
fn viewer_renders_past_unknown_types() {
    let registry = BlockTypeRegistry::with_standard_types();
    assert!(matches!(
        registry.get("nonexistent-type"),
        Err(ContentError::UnknownBlockType { .. })
    ));

    let blocks = vec![
        heading("h", "Intro", 2),
        test_block("nonexistent-type").with_id("x").build(),
        paragraph("p", "After the gap"),
    ];
    let html = ContentViewer::new(registry).render_html(&blocks);
    assert::appears_before(&html, "<h2>Intro</h2>", "block--unsupported");
    assert::appears_before(&html, "block--unsupported", "After the gap");
}

#[test]
fn viewer_escapes_and_sanitizes_text() {
    let blocks = vec![
        paragraph("p", "<b>bold</b><script>alert(1)</script>"),
        test_block("code")
            .with_id("c")
            .with_data(json!({ "code": "<tag>", "language": "" }))
            .build(),
    ];
    let html = ContentViewer::new(BlockTypeRegistry::with_standard_types()).render_html(&blocks);
    assert::contains(&html, "<b>bold</b>");
    assert::not_contains(&html, "<script>");
    assert::contains(&html, "&lt;tag&gt;");
}

#[test]
fn types_registered_later_are_used_by_open_builders() {
    use serde_json::Value;
    use tessera_kernel::content::BlockBehavior;
    use tessera_sdk::RenderElement;
    use tessera_sdk::render;

    struct Callout;

    impl BlockBehavior for Callout {
        fn default_data(&self) -> Value {
            json!({ "text": "" })
        }

        fn validate(&self, _data: &Value) -> tessera_sdk::ValidationResult {
            tessera_sdk::ValidationResult::ok()
        }

        fn view(&self, data: &Value) -> RenderElement {
            render::markup("aside", data["text"].as_str().unwrap_or_default()).build()
        }
    }

    let registry = BlockTypeRegistry::with_standard_types();
    let mut builder = tessera_kernel::ContentBuilder::new(registry.clone());
    assert!(builder.insert_block_at("callout", 0).is_err());

    registry
        .register(BlockTypeDefinition::new("callout", "Callout", Callout))
        .unwrap();
    assert!(builder.insert_block_at("callout", 0).is_ok());

    let duplicate = registry.register(BlockTypeDefinition::new("callout", "Again", Callout));
    assert!(matches!(duplicate, Err(ContentError::DuplicateBlockType { .. })));
}
