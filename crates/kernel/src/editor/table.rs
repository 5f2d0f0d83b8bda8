//! Row and column drag for table blocks.
//!
//! A `DraggableTable` owns a parsed `TableBlockData` and two independent
//! drag controllers: one over row ids (vertical), one over storage column
//! indices (horizontal). Row moves reorder `rows`; column moves only touch
//! `column_order`, so cells never change storage position.

use std::time::Duration;

use serde_json::Value;
use tessera_sdk::{RowId, TableBlockData, TableRow};

use crate::editor::drag::{
    Axis, DragOutcome, DragReorderController, Point, Reorderable, Sibling, move_in_place,
};
use crate::error::{ContentError, ContentResult};

/// Which table controller an event is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAxis {
    Rows,
    Columns,
}

/// Result of ending a table drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableDragOutcome {
    Row(DragOutcome<RowId>),
    Column(DragOutcome<usize>),
}

impl TableDragOutcome {
    /// Whether the table data changed.
    pub fn is_moved(&self) -> bool {
        matches!(
            self,
            Self::Row(DragOutcome::Moved { .. }) | Self::Column(DragOutcome::Moved { .. })
        )
    }
}

struct RowList<'a>(&'a mut Vec<TableRow>);

impl Reorderable<RowId> for RowList<'_> {
    fn position_of(&self, id: &RowId) -> Option<usize> {
        self.0.iter().position(|r| &r.id == id)
    }

    fn move_item(&mut self, id: &RowId, to_index: usize) -> ContentResult<()> {
        let from = self
            .position_of(id)
            .ok_or_else(|| ContentError::RowNotFound { id: id.clone() })?;
        if to_index >= self.0.len() {
            return Err(ContentError::IndexOutOfRange {
                index: to_index,
                len: self.0.len(),
            });
        }
        move_in_place(self.0.as_mut_slice(), from, to_index);
        Ok(())
    }
}

struct ColumnOrder<'a>(&'a mut Vec<usize>);

impl Reorderable<usize> for ColumnOrder<'_> {
    fn position_of(&self, column: &usize) -> Option<usize> {
        self.0.iter().position(|c| c == column)
    }

    fn move_item(&mut self, column: &usize, to_index: usize) -> ContentResult<()> {
        let len = self.0.len();
        let from = self
            .position_of(column)
            .ok_or(ContentError::IndexOutOfRange { index: *column, len })?;
        if to_index >= len {
            return Err(ContentError::IndexOutOfRange {
                index: to_index,
                len,
            });
        }
        move_in_place(self.0.as_mut_slice(), from, to_index);
        Ok(())
    }
}

/// A table payload being edited, with row and column drag state.
#[derive(Debug)]
pub struct DraggableTable {
    data: TableBlockData,
    rows: DragReorderController<RowId>,
    columns: DragReorderController<usize>,
}

impl DraggableTable {
    /// Wrap table data. A malformed `column_order` is reset to identity.
    pub fn new(mut data: TableBlockData) -> Self {
        data.column_order = data.normalized_column_order();
        Self {
            data,
            rows: DragReorderController::new(Axis::Vertical),
            columns: DragReorderController::new(Axis::Horizontal),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        TableBlockData::from_value(value).map(Self::new)
    }

    /// Set the recompute throttle on both controllers.
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.rows = self.rows.with_throttle(throttle);
        self.columns = self.columns.with_throttle(throttle);
        self
    }

    pub fn data(&self) -> &TableBlockData {
        &self.data
    }

    pub fn into_data(self) -> TableBlockData {
        self.data
    }

    pub fn to_value(&self) -> Value {
        self.data.to_value()
    }

    pub fn row_drag(&self) -> &DragReorderController<RowId> {
        &self.rows
    }

    pub fn column_drag(&self) -> &DragReorderController<usize> {
        &self.columns
    }

    pub fn row_ids(&self) -> Vec<RowId> {
        self.data.rows.iter().map(|r| r.id.clone()).collect()
    }

    /// Cells in display order: `rows[i].cells[column_order[j]]`.
    pub fn ordered_cells(&self) -> Vec<Vec<Value>> {
        self.data
            .rows
            .iter()
            .map(|row| {
                self.data
                    .column_order
                    .iter()
                    .map(|&c| row.cells.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect()
    }

    /// Row order as it should be drawn mid-drag.
    pub fn preview_row_order(&self) -> Vec<RowId> {
        self.rows.preview_order(&self.row_ids())
    }

    /// Column order as it should be drawn mid-drag.
    pub fn preview_column_order(&self) -> Vec<usize> {
        self.columns.preview_order(&self.data.column_order)
    }

    /// Start dragging a row. Returns false for an unknown row or a drag
    /// already in progress.
    pub fn begin_row_drag(&mut self, row: RowId, pointer: Point) -> bool {
        match self.data.rows.iter().position(|r| r.id == row) {
            Some(index) => self.rows.begin(row, index, pointer),
            None => false,
        }
    }

    /// `siblings` are row ids with bounds, in displayed order.
    pub fn update_row_drag(&mut self, pointer: Point, siblings: &[Sibling<RowId>]) -> Option<usize> {
        self.rows.update(pointer, siblings)
    }

    pub fn end_row_drag(&mut self, commit: bool) -> ContentResult<DragOutcome<RowId>> {
        self.rows.end(commit, &mut RowList(&mut self.data.rows))
    }

    /// Start dragging the column shown at `display_index`.
    pub fn begin_column_drag(&mut self, display_index: usize, pointer: Point) -> bool {
        match self.data.column_order.get(display_index) {
            Some(&column) => self.columns.begin(column, display_index, pointer),
            None => false,
        }
    }

    /// `siblings` are storage column indices with bounds, in displayed order.
    pub fn update_column_drag(&mut self, pointer: Point, siblings: &[Sibling<usize>]) -> Option<usize> {
        self.columns.update(pointer, siblings)
    }

    pub fn end_column_drag(&mut self, commit: bool) -> ContentResult<DragOutcome<usize>> {
        self.columns
            .end(commit, &mut ColumnOrder(&mut self.data.column_order))
    }

    /// End whichever controller `axis` names.
    pub fn end_drag(&mut self, axis: TableAxis, commit: bool) -> ContentResult<TableDragOutcome> {
        match axis {
            TableAxis::Rows => self.end_row_drag(commit).map(TableDragOutcome::Row),
            TableAxis::Columns => self.end_column_drag(commit).map(TableDragOutcome::Column),
        }
    }

    pub fn cancel_drags(&mut self) {
        self.rows.cancel();
        self.columns.cancel();
    }

    /// Insert an empty row at `at` (clamped) and return its id.
    pub fn add_row(&mut self, at: usize) -> RowId {
        let row = TableRow::new(vec![Value::String(String::new()); self.data.column_count()]);
        let id = row.id.clone();
        let index = at.min(self.data.rows.len());
        self.data.rows.insert(index, row);
        id
    }

    /// Remove a row, cancelling a drag of it.
    pub fn remove_row(&mut self, row: &RowId) -> ContentResult<TableRow> {
        let index = self
            .data
            .rows
            .iter()
            .position(|r| &r.id == row)
            .ok_or_else(|| ContentError::RowNotFound { id: row.clone() })?;
        self.rows.cancel_if_source(row);
        Ok(self.data.rows.remove(index))
    }

    /// Append an empty column, shown last. Returns its storage index.
    pub fn add_column(&mut self) -> usize {
        let column = self.data.column_count();
        for row in &mut self.data.rows {
            row.cells.resize(column, Value::String(String::new()));
            row.cells.push(Value::String(String::new()));
        }
        self.data.column_order.push(column);
        column
    }
}
