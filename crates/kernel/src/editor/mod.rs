//! Editing surfaces.
//!
//! - ContentBuilder: Insertion, selection, settings patches and drags over one document
//! - DragReorderController: Pointer events to a single reorder commit
//! - DraggableTable: Independent row and column drags over a table payload
//! - Autosave: Debounced, latest-wins persistence
//! - LessonBuilder/CourseBuilder: Autosaved lesson pages grouped by course

pub mod autosave;
pub mod builder;
pub mod drag;
pub mod lesson;
pub mod table;

pub use autosave::{Autosave, Persist, SaveStatus};
pub use builder::ContentBuilder;
pub use drag::{
    Axis, BoundingBox, DragOutcome, DragPhase, DragReorderController, DragSession, Point,
    Reorderable, Sibling,
};
pub use lesson::{CourseBuilder, LessonBuilder, LessonCloseError, LessonStore};
pub use table::{DraggableTable, TableAxis, TableDragOutcome};
