//! Ordered block collection for one document.
//!
//! All mutations are synchronous. Listeners see the new snapshot after
//! every successful mutating call; failed calls leave the document and
//! listeners untouched.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;
use tessera_sdk::{Block, BlockId};
use tracing::{debug, warn};

use crate::content::BlockTypeRegistry;
use crate::editor::drag::move_in_place;
use crate::error::{ContentError, ContentResult};

/// Handle returned by [`ContentDocumentModel::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&[Block]) + Send>;

/// Non-fatal problem found while loading a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Block dropped because an earlier block already used its id.
    DuplicateId { id: BlockId, index: usize },
    /// Entry dropped because it could not be read as a block.
    MalformedEntry { index: usize, reason: String },
    /// Entry had no usable id and was given a fresh one.
    MissingId { index: usize, assigned: BlockId },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId { id, index } => {
                write!(f, "entry {index}: duplicate block id '{id}' dropped")
            }
            Self::MalformedEntry { index, reason } => {
                write!(f, "entry {index}: malformed block dropped ({reason})")
            }
            Self::MissingId { index, assigned } => {
                write!(f, "entry {index}: missing id, assigned '{assigned}'")
            }
        }
    }
}

/// Outcome of a load: how many blocks survived and what was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub warnings: Vec<LoadWarning>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// The ordered blocks of one document plus its change listeners.
pub struct ContentDocumentModel {
    registry: BlockTypeRegistry,
    blocks: Vec<Block>,
    /// Ids removed from this document; never handed out again.
    retired: HashSet<BlockId>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for ContentDocumentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentDocumentModel")
            .field("blocks", &self.blocks)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl ContentDocumentModel {
    /// Create an empty document.
    pub fn new(registry: BlockTypeRegistry) -> Self {
        Self {
            registry,
            blocks: Vec::new(),
            retired: HashSet::new(),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn registry(&self) -> &BlockTypeRegistry {
        &self.registry
    }

    /// Replace the whole document.
    ///
    /// A block whose id collides with an earlier one is dropped; the first
    /// occurrence wins.
    pub fn load(&mut self, blocks: Vec<Block>) -> LoadReport {
        let mut report = LoadReport::default();
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(blocks.len());

        for (index, block) in blocks.into_iter().enumerate() {
            if seen.contains(block.id()) {
                warn!(block_id = %block.id(), index, "dropping block with duplicate id");
                report.warnings.push(LoadWarning::DuplicateId {
                    id: block.id().clone(),
                    index,
                });
                continue;
            }
            seen.insert(block.id().clone());
            kept.push(block);
        }

        report.loaded = kept.len();
        self.blocks = kept;
        self.retired.clear();
        debug!(blocks = report.loaded, warnings = report.warnings.len(), "document loaded");
        self.notify();
        report
    }

    /// Load from the JSON wire format, tolerating malformed entries.
    ///
    /// Accepts a bare array or an object with a `blocks` array. Never fails;
    /// anything unusable is reported and skipped.
    pub fn load_json(&mut self, value: &Value) -> LoadReport {
        let entries: &[Value] = match value {
            Value::Array(entries) => entries.as_slice(),
            Value::Object(obj) => match obj.get("blocks") {
                Some(Value::Array(entries)) => entries.as_slice(),
                _ => {
                    warn!("document object has no 'blocks' array; loading empty document");
                    &[]
                }
            },
            _ => {
                warn!("document is neither an array nor an object; loading empty document");
                &[]
            }
        };

        let mut warnings = Vec::new();
        let mut blocks = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            if let Some(block) = parse_entry(index, entry, &mut warnings) {
                blocks.push(block);
            }
        }

        let mut report = self.load(blocks);
        warnings.append(&mut report.warnings);
        report.warnings = warnings;
        report
    }

    /// Insert a block of `block_type` with its default data.
    ///
    /// `at_index` is clamped to `[0, len]`.
    pub fn insert_block(&mut self, block_type: &str, at_index: usize) -> ContentResult<BlockId> {
        let definition = self.registry.get(block_type)?;
        let id = self.fresh_id();
        let index = at_index.min(self.blocks.len());
        self.blocks.insert(
            index,
            Block::new(id.clone(), block_type, definition.create_default_data()),
        );
        debug!(block_id = %id, block_type, index, "inserted block");
        self.notify();
        Ok(id)
    }

    /// Replace a block's data wholesale. Callers merge patches first.
    pub fn update_block_data(&mut self, id: &BlockId, data: Value) -> ContentResult<()> {
        let block = self
            .blocks
            .iter_mut()
            .find(|b| b.id() == id)
            .ok_or_else(|| ContentError::BlockNotFound { id: id.clone() })?;
        block.replace_data(data);
        debug!(block_id = %id, "updated block data");
        self.notify();
        Ok(())
    }

    /// Remove a block and close the gap. Its id is retired.
    pub fn remove_block(&mut self, id: &BlockId) -> ContentResult<Block> {
        let index = self.require_index(id)?;
        let block = self.blocks.remove(index);
        self.retired.insert(block.id().clone());
        debug!(block_id = %id, index, "removed block");
        self.notify();
        Ok(block)
    }

    /// Move a block to `to_index` in the resulting list (post-removal).
    pub fn move_block(&mut self, id: &BlockId, to_index: usize) -> ContentResult<()> {
        let from = self.require_index(id)?;
        if to_index >= self.blocks.len() {
            return Err(ContentError::IndexOutOfRange {
                index: to_index,
                len: self.blocks.len(),
            });
        }
        if from == to_index {
            return Ok(());
        }
        move_in_place(&mut self.blocks, from, to_index);
        debug!(block_id = %id, from, to = to_index, "moved block");
        self.notify();
        Ok(())
    }

    /// Order-preserving snapshot.
    pub fn serialize(&self) -> Vec<Block> {
        self.blocks.clone()
    }

    /// Snapshot in the JSON wire format.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.blocks
                .iter()
                .filter_map(|b| serde_json::to_value(b).ok())
                .collect(),
        )
    }

    /// Register a listener called with the new snapshot after each mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&[Block]) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    pub fn index_of(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id() == id)
    }

    /// Block ids in document order.
    pub fn ids(&self) -> Vec<BlockId> {
        self.blocks.iter().map(|b| b.id().clone()).collect()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn require_index(&self, id: &BlockId) -> ContentResult<usize> {
        self.index_of(id)
            .ok_or_else(|| ContentError::BlockNotFound { id: id.clone() })
    }

    fn fresh_id(&self) -> BlockId {
        loop {
            let id = BlockId::generate();
            if !self.retired.contains(&id) && self.get(&id).is_none() {
                return id;
            }
        }
    }

    fn notify(&mut self) {
        let snapshot = &self.blocks;
        for (_, listener) in &mut self.listeners {
            listener(snapshot);
        }
    }
}

/// Read one wire entry, recording why it was dropped or patched.
fn parse_entry(index: usize, entry: &Value, warnings: &mut Vec<LoadWarning>) -> Option<Block> {
    let Some(obj) = entry.as_object() else {
        warn!(index, "dropping non-object document entry");
        warnings.push(LoadWarning::MalformedEntry {
            index,
            reason: "entry is not an object".to_string(),
        });
        return None;
    };

    let Some(block_type) = obj.get("type").and_then(|t| t.as_str()) else {
        warn!(index, "dropping document entry without a type");
        warnings.push(LoadWarning::MalformedEntry {
            index,
            reason: "missing string 'type'".to_string(),
        });
        return None;
    };

    let id = match obj.get("id").and_then(|v| v.as_str()) {
        Some(id) if !id.is_empty() => BlockId::new(id),
        _ => {
            let assigned = BlockId::generate();
            warn!(index, block_id = %assigned, "document entry has no id; assigning one");
            warnings.push(LoadWarning::MissingId {
                index,
                assigned: assigned.clone(),
            });
            assigned
        }
    };

    let data = match obj.get("data") {
        None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
        Some(data) => data.clone(),
    };

    Some(Block::new(id, block_type, data))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    fn model() -> ContentDocumentModel {
        ContentDocumentModel::new(BlockTypeRegistry::with_standard_types())
    }

    fn block(id: &str, block_type: &str) -> Block {
        Block::new(BlockId::new(id), block_type, json!({}))
    }

    fn ids(model: &ContentDocumentModel) -> Vec<String> {
        model.ids().iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn load_drops_duplicate_ids_first_wins() {
        let mut doc = model();
        let report = doc.load(vec![
            Block::new(BlockId::new("a"), "paragraph", json!({ "text": "first" })),
            block("b", "divider"),
            Block::new(BlockId::new("a"), "paragraph", json!({ "text": "second" })),
        ]);
        assert_eq!(report.loaded, 2);
        assert_eq!(
            report.warnings,
            vec![LoadWarning::DuplicateId {
                id: BlockId::new("a"),
                index: 2
            }]
        );
        assert_eq!(ids(&doc), ["a", "b"]);
        assert_eq!(doc.get(&BlockId::new("a")).unwrap().data()["text"], "first");
    }

    #[test]
    fn load_json_accepts_envelope_and_degrades() {
        let mut doc = model();
        let report = doc.load_json(&json!({
            "blocks": [
                { "id": "a", "type": "paragraph", "data": { "text": "x" } },
                "garbage",
                { "id": "c", "data": {} },
                { "type": "divider" },
                { "id": "e", "type": "carousel", "data": null }
            ]
        }));
        assert_eq!(report.loaded, 3);
        assert_eq!(report.warnings.len(), 3);
        assert!(matches!(report.warnings[0], LoadWarning::MalformedEntry { index: 1, .. }));
        assert!(matches!(report.warnings[1], LoadWarning::MalformedEntry { index: 2, .. }));
        assert!(matches!(report.warnings[2], LoadWarning::MissingId { index: 3, .. }));

        // Unknown types are kept; they only matter at render time.
        let carousel = doc.get(&BlockId::new("e")).unwrap();
        assert_eq!(carousel.block_type(), "carousel");
        assert_eq!(carousel.data(), &json!({}));
    }

    #[test]
    fn load_json_rejects_scalars_as_empty() {
        let mut doc = model();
        doc.load(vec![block("a", "divider")]);
        let report = doc.load_json(&json!(42));
        assert_eq!(report.loaded, 0);
        assert!(doc.is_empty());
    }

    #[test]
    fn insert_clamps_index_and_uses_defaults() {
        let mut doc = model();
        let first = doc.insert_block("heading", 0).unwrap();
        let second = doc.insert_block("paragraph", 99).unwrap();
        assert_eq!(doc.index_of(&first), Some(0));
        assert_eq!(doc.index_of(&second), Some(1));
        assert_eq!(doc.get(&first).unwrap().data(), &json!({ "text": "", "level": 2 }));
    }

    #[test]
    fn insert_unknown_type_fails() {
        let mut doc = model();
        let err = doc.insert_block("carousel", 0).unwrap_err();
        assert!(matches!(err, ContentError::UnknownBlockType { .. }));
        assert!(doc.is_empty());
    }

    #[test]
    fn update_replaces_data_keeping_identity() {
        let mut doc = model();
        let id = doc.insert_block("paragraph", 0).unwrap();
        doc.update_block_data(&id, json!({ "text": "new" })).unwrap();
        let block = doc.get(&id).unwrap();
        assert_eq!(block.block_type(), "paragraph");
        assert_eq!(block.data(), &json!({ "text": "new" }));

        let err = doc
            .update_block_data(&BlockId::new("missing"), json!({}))
            .unwrap_err();
        assert_eq!(
            err,
            ContentError::BlockNotFound {
                id: BlockId::new("missing")
            }
        );
    }

    #[test]
    fn remove_closes_gap() {
        let mut doc = model();
        doc.load(vec![block("a", "divider"), block("b", "divider"), block("c", "divider")]);
        let removed = doc.remove_block(&BlockId::new("b")).unwrap();
        assert_eq!(removed.id().as_str(), "b");
        assert_eq!(ids(&doc), ["a", "c"]);
        assert!(doc.remove_block(&BlockId::new("b")).is_err());
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn move_uses_post_removal_index() {
        let mut doc = model();
        doc.load(vec![
            block("a", "divider"),
            block("b", "divider"),
            block("c", "divider"),
            block("d", "divider"),
        ]);
        doc.move_block(&BlockId::new("a"), 2).unwrap();
        assert_eq!(ids(&doc), ["b", "c", "a", "d"]);
        doc.move_block(&BlockId::new("d"), 0).unwrap();
        assert_eq!(ids(&doc), ["d", "b", "c", "a"]);
    }

    #[test]
    fn move_out_of_range_is_rejected() {
        let mut doc = model();
        doc.load(vec![block("a", "divider"), block("b", "divider")]);
        let err = doc.move_block(&BlockId::new("a"), 2).unwrap_err();
        assert_eq!(err, ContentError::IndexOutOfRange { index: 2, len: 2 });
        assert_eq!(ids(&doc), ["a", "b"]);
    }

    #[test]
    fn listeners_see_each_mutation() {
        let mut doc = model();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = doc.subscribe(move |blocks| sink.lock().push(blocks.len()));

        let id = doc.insert_block("paragraph", 0).unwrap();
        doc.insert_block("divider", 1).unwrap();
        doc.update_block_data(&id, json!({ "text": "x" })).unwrap();
        doc.move_block(&id, 1).unwrap();
        // Failed and no-op calls notify nobody
        let _ = doc.remove_block(&BlockId::new("missing"));
        doc.move_block(&id, 1).unwrap();
        doc.remove_block(&id).unwrap();
        assert_eq!(*seen.lock(), vec![1, 2, 2, 2, 1]);

        assert!(doc.unsubscribe(sub));
        assert!(!doc.unsubscribe(sub));
        doc.insert_block("divider", 0).unwrap();
        assert_eq!(seen.lock().len(), 5);
    }

    #[test]
    fn to_json_round_trips() {
        let mut doc = model();
        doc.load(vec![
            Block::new(BlockId::new("a"), "heading", json!({ "text": "T", "level": 1 })),
            block("b", "divider"),
        ]);
        let json = doc.to_json();
        let mut other = model();
        assert!(other.load_json(&json).is_clean());
        assert_eq!(other.serialize(), doc.serialize());
    }
}
