//! Editor orchestration.
//!
//! `ContentBuilder` owns one document model, a registry handle and the
//! block drag controller. It tracks the active block, the insertion menu,
//! per-block validation flags and the drag state of open tables.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tessera_sdk::render::{self, RenderElement};
use tessera_sdk::{Block, BlockId, RowId, ValidationResult};
use tracing::{debug, warn};

use crate::content::{
    BlockTypeRegistry, ContentDocumentModel, LoadReport, SubscriptionId, render_unsupported,
    shallow_merge,
};
use crate::editor::drag::{
    Axis, DEFAULT_THROTTLE, DragOutcome, DragReorderController, Point, Sibling,
};
use crate::editor::table::{DraggableTable, TableAxis, TableDragOutcome};
use crate::error::{ContentError, ContentResult};

/// Editable surface over one document.
pub struct ContentBuilder {
    registry: BlockTypeRegistry,
    model: ContentDocumentModel,
    drag: DragReorderController<BlockId>,
    active: Option<BlockId>,
    insertion_menu: Option<usize>,
    /// Validation errors of flagged blocks. Flagged blocks are kept as-is.
    invalid: HashMap<BlockId, Vec<String>>,
    tables: HashMap<BlockId, DraggableTable>,
    drag_throttle: Duration,
    revision: u64,
}

impl std::fmt::Debug for ContentBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentBuilder")
            .field("blocks", &self.model.len())
            .field("active", &self.active)
            .field("insertion_menu", &self.insertion_menu)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl ContentBuilder {
    /// Create a builder over an empty document.
    pub fn new(registry: BlockTypeRegistry) -> Self {
        let model = ContentDocumentModel::new(registry.clone());
        Self::from_model(model)
    }

    /// Create a builder over an existing document.
    pub fn from_model(model: ContentDocumentModel) -> Self {
        let mut builder = Self {
            registry: model.registry().clone(),
            model,
            drag: DragReorderController::new(Axis::Vertical),
            active: None,
            insertion_menu: None,
            invalid: HashMap::new(),
            tables: HashMap::new(),
            drag_throttle: DEFAULT_THROTTLE,
            revision: 0,
        };
        builder.validate_all();
        builder
    }

    /// Set the drag recompute interval for blocks and tables.
    pub fn with_drag_throttle(mut self, throttle: Duration) -> Self {
        self.drag = self.drag.with_throttle(throttle);
        self.drag_throttle = throttle;
        self
    }

    pub fn registry(&self) -> &BlockTypeRegistry {
        &self.registry
    }

    /// Read-only view of the document.
    pub fn model(&self) -> &ContentDocumentModel {
        &self.model
    }

    /// Replace the document, dropping all transient editor state.
    pub fn load(&mut self, blocks: Vec<Block>) -> LoadReport {
        self.reset_transient();
        let report = self.model.load(blocks);
        self.validate_all();
        self.bump();
        report
    }

    /// [`load`](Self::load) from the JSON wire format.
    pub fn load_json(&mut self, value: &Value) -> LoadReport {
        self.reset_transient();
        let report = self.model.load_json(value);
        self.validate_all();
        self.bump();
        report
    }

    fn reset_transient(&mut self) {
        self.drag.cancel();
        self.active = None;
        self.insertion_menu = None;
        self.invalid.clear();
        self.tables.clear();
    }

    pub fn active_block(&self) -> Option<&BlockId> {
        self.active.as_ref()
    }

    /// Make `id` the active block, showing its settings panel.
    pub fn select_block(&mut self, id: &BlockId) -> ContentResult<()> {
        if self.model.get(id).is_none() {
            return Err(ContentError::BlockNotFound { id: id.clone() });
        }
        self.active = Some(id.clone());
        self.bump();
        Ok(())
    }

    pub fn deselect_all(&mut self) {
        if self.active.take().is_some() {
            self.bump();
        }
    }

    pub fn insertion_menu(&self) -> Option<usize> {
        self.insertion_menu
    }

    /// Open the "insert block" menu at `index` (clamped to the list).
    pub fn open_insertion_menu(&mut self, index: usize) {
        self.insertion_menu = Some(index.min(self.model.len()));
        self.bump();
    }

    pub fn close_insertion_menu(&mut self) {
        if self.insertion_menu.take().is_some() {
            self.bump();
        }
    }

    /// Insert a block, select it and close the insertion menu.
    pub fn insert_block_at(&mut self, block_type: &str, index: usize) -> ContentResult<BlockId> {
        let id = self.model.insert_block(block_type, index)?;
        self.active = Some(id.clone());
        self.insertion_menu = None;
        self.bump();
        Ok(id)
    }

    /// Merge a settings patch into a block and store the result.
    ///
    /// Invalid results are stored anyway and the block is flagged, so no
    /// input is lost. Returns the validation outcome of the merged data.
    pub fn apply_settings_patch(
        &mut self,
        id: &BlockId,
        patch: &Value,
    ) -> ContentResult<ValidationResult> {
        let block = self
            .model
            .get(id)
            .ok_or_else(|| ContentError::BlockNotFound { id: id.clone() })?;

        // Uncommitted table edits are the base the patch applies to.
        let table_data = self.tables.get_mut(id).map(|table| {
            if table.row_drag().is_dragging() || table.column_drag().is_dragging() {
                debug!(block_id = %id, "settings patch cancels table drag");
                table.cancel_drags();
            }
            table.to_value()
        });
        let base = table_data.as_ref().unwrap_or(block.data());

        let (merged, validation) = match self.registry.get(block.block_type()) {
            Ok(definition) => {
                let merged = definition.merge_patch(base, patch);
                let validation = definition.validate(&merged);
                (merged, validation)
            }
            Err(e) => (
                shallow_merge(base, patch),
                ValidationResult::from_errors(vec![e.to_string()]),
            ),
        };

        self.model.update_block_data(id, merged)?;
        // Rebuilt from the merged data on next use.
        self.tables.remove(id);
        self.set_flags(id, &validation);
        self.bump();
        Ok(validation)
    }

    pub fn has_validation_errors(&self, id: &BlockId) -> bool {
        self.invalid.contains_key(id)
    }

    pub fn validation_errors(&self, id: &BlockId) -> Option<&[String]> {
        self.invalid.get(id).map(Vec::as_slice)
    }

    /// Re-validate every block. Returns how many are flagged.
    pub fn validate_all(&mut self) -> usize {
        let results: Vec<_> = self
            .model
            .blocks()
            .iter()
            .map(|b| {
                (
                    b.id().clone(),
                    self.registry.validate_block(b.block_type(), b.data()),
                )
            })
            .collect();
        self.invalid.clear();
        for (id, validation) in &results {
            self.set_flags(id, validation);
        }
        self.invalid.len()
    }

    fn set_flags(&mut self, id: &BlockId, validation: &ValidationResult) {
        if validation.is_valid() {
            self.invalid.remove(id);
        } else {
            warn!(block_id = %id, errors = ?validation.errors(), "block flagged with validation errors");
            self.invalid.insert(id.clone(), validation.errors().to_vec());
        }
    }

    /// Remove a block, clearing any selection, flags or drag tied to it.
    pub fn remove_block(&mut self, id: &BlockId) -> ContentResult<Block> {
        let block = self.model.remove_block(id)?;
        if self.active.as_ref() == Some(id) {
            self.active = None;
        }
        self.invalid.remove(id);
        self.tables.remove(id);
        self.drag.cancel_if_source(id);
        self.bump();
        Ok(block)
    }

    pub fn move_block(&mut self, id: &BlockId, to_index: usize) -> ContentResult<()> {
        self.model.move_block(id, to_index)?;
        self.bump();
        Ok(())
    }

    /// Start dragging a block. Returns false for an unknown block or when
    /// a drag is already running.
    pub fn handle_drag_start(&mut self, id: &BlockId, pointer: Point) -> bool {
        let Some(index) = self.model.index_of(id) else {
            return false;
        };
        let started = self.drag.begin(id.clone(), index, pointer);
        if started {
            self.bump();
        }
        started
    }

    /// Feed a pointer move with the blocks' current bounds.
    pub fn handle_drag_move(&mut self, pointer: Point, siblings: &[Sibling<BlockId>]) -> Option<usize> {
        let before = (self.drag.phase(), self.drag.session().map(|s| s.current_target_index));
        let target = self.drag.update(pointer, siblings);
        let after = (self.drag.phase(), self.drag.session().map(|s| s.current_target_index));
        if before != after {
            self.bump();
        }
        target
    }

    /// Apply a throttled drag update; call once per frame.
    pub fn flush_drag(&mut self) -> Option<usize> {
        self.drag.flush()
    }

    pub fn handle_drag_end(&mut self, commit: bool) -> ContentResult<DragOutcome<BlockId>> {
        let outcome = self.drag.end(commit, &mut self.model);
        self.bump();
        outcome
    }

    pub fn drag(&self) -> &DragReorderController<BlockId> {
        &self.drag
    }

    /// Editable table state for a table block, created on first use.
    pub fn table_mut(&mut self, id: &BlockId) -> ContentResult<&mut DraggableTable> {
        let block = self
            .model
            .get(id)
            .ok_or_else(|| ContentError::BlockNotFound { id: id.clone() })?;
        if block.block_type() != "table" {
            return Err(ContentError::NotATable {
                id: id.clone(),
                found: block.block_type().to_string(),
            });
        }

        if !self.tables.contains_key(id) {
            let table = DraggableTable::from_value(block.data())
                .map_err(|e| ContentError::ValidationFailed {
                    id: id.clone(),
                    errors: vec![format!("table: malformed data: {e}")],
                })?
                .with_throttle(self.drag_throttle);
            self.tables.insert(id.clone(), table);
        }
        self.tables
            .get_mut(id)
            .ok_or_else(|| ContentError::BlockNotFound { id: id.clone() })
    }

    /// Write a table's current data back into the document.
    pub fn commit_table(&mut self, id: &BlockId) -> ContentResult<()> {
        let data = self.table_mut(id)?.to_value();
        self.model.update_block_data(id, data)?;
        let validation = match self.model.get(id) {
            Some(block) => self.registry.validate_block("table", block.data()),
            None => ValidationResult::ok(),
        };
        self.set_flags(id, &validation);
        self.bump();
        Ok(())
    }

    pub fn handle_table_row_drag_start(
        &mut self,
        id: &BlockId,
        row: RowId,
        pointer: Point,
    ) -> ContentResult<bool> {
        let started = self.table_mut(id)?.begin_row_drag(row, pointer);
        self.bump();
        Ok(started)
    }

    pub fn handle_table_row_drag_move(
        &mut self,
        id: &BlockId,
        pointer: Point,
        siblings: &[Sibling<RowId>],
    ) -> ContentResult<Option<usize>> {
        let target = self.table_mut(id)?.update_row_drag(pointer, siblings);
        self.bump();
        Ok(target)
    }

    pub fn handle_table_column_drag_start(
        &mut self,
        id: &BlockId,
        display_index: usize,
        pointer: Point,
    ) -> ContentResult<bool> {
        let started = self.table_mut(id)?.begin_column_drag(display_index, pointer);
        self.bump();
        Ok(started)
    }

    pub fn handle_table_column_drag_move(
        &mut self,
        id: &BlockId,
        pointer: Point,
        siblings: &[Sibling<usize>],
    ) -> ContentResult<Option<usize>> {
        let target = self.table_mut(id)?.update_column_drag(pointer, siblings);
        self.bump();
        Ok(target)
    }

    /// End a table drag; a committed move is written to the document.
    pub fn handle_table_drag_end(
        &mut self,
        id: &BlockId,
        axis: TableAxis,
        commit: bool,
    ) -> ContentResult<TableDragOutcome> {
        let outcome = self.table_mut(id)?.end_drag(axis, commit)?;
        if outcome.is_moved() {
            debug!(block_id = %id, ?axis, "table drag committed");
            self.commit_table(id)?;
        } else {
            self.bump();
        }
        Ok(outcome)
    }

    /// Register a listener for document snapshots.
    pub fn subscribe(&mut self, listener: impl FnMut(&[Block]) + Send + 'static) -> SubscriptionId {
        self.model.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.model.unsubscribe(id)
    }

    /// Bumped on every change that affects [`render`](Self::render).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn serialize(&self) -> Vec<Block> {
        self.model.serialize()
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Render the editor surface.
    ///
    /// Blocks appear in preview order while a drag is running. The active
    /// block's settings panel and the insertion menu are included when open.
    pub fn render(&self) -> RenderElement {
        let order = self.drag.preview_order(&self.model.ids());
        let dragging = self.drag.session().map(|s| &s.source_id);

        let mut blocks = render::container().class("content-builder__blocks").weight(0);
        for (i, id) in order.iter().enumerate() {
            let Some(block) = self.model.get(id) else {
                continue;
            };
            let content = match self.registry.get(block.block_type()) {
                Ok(definition) => definition.editor_component(id, block.data()),
                Err(_) => render_unsupported(block),
            };
            let mut wrapper = render::container()
                .class("block")
                .attr("data-block-id", id.as_str())
                .attr("data-block-type", block.block_type())
                .weight(i as i32);
            if self.active.as_ref() == Some(id) {
                wrapper = wrapper.class("block--active");
            }
            if self.has_validation_errors(id) {
                wrapper = wrapper.class("block--invalid");
            }
            if self.drag.is_dragging() && dragging == Some(id) {
                wrapper = wrapper.class("block--dragging");
            }
            blocks = blocks.child(&format!("block_{i:04}"), wrapper.child("content", content).build());
        }

        let mut surface = render::container()
            .class("content-builder")
            .child("blocks", blocks.build());

        if let Some(index) = self.insertion_menu {
            let mut menu = render::container()
                .class("insertion-menu")
                .attr("data-index", &index.to_string())
                .weight(1);
            for (i, (type_name, label)) in self.registry.labels().iter().enumerate() {
                menu = menu.child(
                    &format!("type_{i:02}"),
                    render::markup("button", label)
                        .attr("data-block-type", type_name)
                        .weight(i as i32)
                        .build(),
                );
            }
            surface = surface.child("insertion_menu", menu.build());
        }

        if let Some(active) = &self.active
            && let Some(block) = self.model.get(active)
            && let Ok(definition) = self.registry.get(block.block_type())
        {
            let mut settings = definition.settings_component(active, block.data());
            settings.weight = Some(2);
            surface = surface.child("settings", settings);
        }

        surface.build()
    }
}
