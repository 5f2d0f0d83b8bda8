//! Core content types shared by the kernel and block-type authors.
//!
//! A document travels as an ordered JSON array of `{id, type, data}` objects.
//! Array order is document order; nothing else carries position.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stable identifier of a block within a document.
///
/// Freshly created blocks get a UUIDv7 string. Ids read from stored
/// documents are kept verbatim, so any non-empty string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Wrap an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new time-ordered id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One typed, independently editable unit of content.
///
/// `id` and `type` are fixed at construction; only the payload can be
/// swapped, and only wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    id: BlockId,
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default = "empty_object")]
    data: Value,
}

impl Block {
    pub fn new(id: BlockId, block_type: impl Into<String>, data: Value) -> Self {
        Self {
            id,
            block_type: block_type.into(),
            data,
        }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    /// Block type tag (e.g. "paragraph", "heading").
    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Swap the payload in place, returning the previous one.
    pub fn replace_data(&mut self, data: Value) -> Value {
        std::mem::replace(&mut self.data, data)
    }

    /// Replace the payload, keeping id and type.
    pub fn with_data(self, data: Value) -> Self {
        Self { data, ..self }
    }

    /// Consume the block, returning `(id, type, data)`.
    pub fn into_parts(self) -> (BlockId, String, Value) {
        (self.id, self.block_type, self.data)
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Outcome of validating a block payload. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    errors: Vec<String>,
}

impl ValidationResult {
    /// A passing result.
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn from_errors(errors: Vec<String>) -> Self {
        Self { errors }
    }

    pub fn push(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }
}

/// Stable identifier of a table row, distinct from the owning block's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A table row: stable id plus cell payloads in storage order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub id: RowId,
    #[serde(default)]
    pub cells: Vec<Value>,
}

impl TableRow {
    pub fn new(cells: Vec<Value>) -> Self {
        Self {
            id: RowId::generate(),
            cells,
        }
    }
}

/// Payload of a `table` block.
///
/// Cells are stored in their original column positions; `column_order`
/// maps display column `j` to storage column `column_order[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlockData {
    #[serde(default)]
    pub with_headings: bool,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    #[serde(default)]
    pub column_order: Vec<usize>,
}

impl TableBlockData {
    /// An empty `rows` x `columns` grid of blank string cells.
    pub fn empty(rows: usize, columns: usize) -> Self {
        Self {
            with_headings: false,
            rows: (0..rows)
                .map(|_| TableRow::new(vec![Value::String(String::new()); columns]))
                .collect(),
            column_order: (0..columns).collect(),
        }
    }

    /// Parse a table payload from block data.
    pub fn from_value(data: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(data.clone())
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| empty_object())
    }

    /// Widest row length; rows are expected to be rectangular.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }

    /// The stored column order if it is a permutation of the columns,
    /// otherwise the identity order.
    pub fn normalized_column_order(&self) -> Vec<usize> {
        let columns = self.column_count();
        let mut seen = vec![false; columns];
        let is_permutation = self.column_order.len() == columns
            && self.column_order.iter().all(|&c| {
                if c < columns && !seen[c] {
                    seen[c] = true;
                    true
                } else {
                    false
                }
            });

        if is_permutation {
            self.column_order.clone()
        } else {
            (0..columns).collect()
        }
    }
}
