//! Tessera test utilities.
//!
//! Fixture builders for blocks and documents, plus assertion helpers for
//! block lists and rendered HTML.

use serde_json::{Value as JsonValue, json};
use tessera_sdk::{Block, BlockId, RowId, TableBlockData, TableRow};

/// Start building a test block of the given type with empty data.
pub fn test_block(block_type: &str) -> TestBlock {
    TestBlock {
        id: BlockId::generate(),
        block_type: block_type.to_string(),
        data: json!({}),
    }
}

/// A test block builder.
#[derive(Debug, Clone)]
pub struct TestBlock {
    pub id: BlockId,
    pub block_type: String,
    pub data: JsonValue,
}

impl TestBlock {
    /// Set a custom ID.
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = BlockId::new(id);
        self
    }

    /// Replace the data payload.
    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = data;
        self
    }

    /// Set a single data field.
    pub fn with_field(mut self, name: &str, value: JsonValue) -> Self {
        if let Some(obj) = self.data.as_object_mut() {
            obj.insert(name.to_string(), value);
        }
        self
    }

    pub fn build(self) -> Block {
        Block::new(self.id, self.block_type, self.data)
    }
}

/// Paragraph block with the given id and text.
pub fn paragraph(id: &str, text: &str) -> Block {
    test_block("paragraph")
        .with_id(id)
        .with_field("text", json!(text))
        .build()
}

/// Heading block with the given id, text and level.
pub fn heading(id: &str, text: &str, level: u8) -> Block {
    test_block("heading")
        .with_id(id)
        .with_data(json!({ "text": text, "level": level }))
        .build()
}

/// Divider block with the given id.
pub fn divider(id: &str) -> Block {
    test_block("divider").with_id(id).build()
}

/// Table block whose cells are labelled `r{row}c{column}`.
///
/// Row ids are `row-{row}` so tests can address them directly.
pub fn table(id: &str, rows: usize, columns: usize) -> Block {
    let data = TableBlockData {
        with_headings: false,
        rows: (0..rows)
            .map(|r| TableRow {
                id: RowId::new(format!("row-{r}")),
                cells: (0..columns).map(|c| json!(format!("r{r}c{c}"))).collect(),
            })
            .collect(),
        column_order: (0..columns).collect(),
    };
    test_block("table").with_id(id).with_data(data.to_value()).build()
}

/// A document of paragraphs with the given ids, text equal to the id.
pub fn paragraphs(ids: &[&str]) -> Vec<Block> {
    ids.iter().map(|id| paragraph(id, id)).collect()
}

/// Block ids of a document, in order.
pub fn ids(blocks: &[Block]) -> Vec<String> {
    blocks.iter().map(|b| b.id().as_str().to_string()).collect()
}

/// Assertion helpers for documents and rendered output.
pub mod assert {
    use tessera_sdk::Block;

    /// Assert the document order by block id.
    pub fn order(blocks: &[Block], expected: &[&str]) {
        let actual = super::ids(blocks);
        assert_eq!(actual, expected, "unexpected block order");
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that `first` appears before `second` in `haystack`.
    pub fn appears_before(haystack: &str, first: &str, second: &str) {
        let a = haystack.find(first);
        let b = haystack.find(second);
        assert!(
            matches!((a, b), (Some(a), Some(b)) if a < b),
            "Expected '{first}' before '{second}'\nActual: {haystack}"
        );
    }
}
