//! Tessera Kernel Library
//!
//! Block-based structured content: the block type registry, the document
//! model, drag reordering, the editor and viewer surfaces, and debounced
//! autosave for lesson pages. The `tessera` binary is a thin CLI on top.

pub mod cli;
pub mod config;
pub mod content;
pub mod editor;
pub mod error;
pub mod theme;
pub mod viewer;

pub use config::Config;
pub use content::{BlockTypeDefinition, BlockTypeRegistry, ContentDocumentModel};
pub use editor::{Autosave, ContentBuilder, CourseBuilder, DraggableTable, LessonBuilder};
pub use error::{ContentError, ContentResult};
pub use viewer::ContentViewer;
