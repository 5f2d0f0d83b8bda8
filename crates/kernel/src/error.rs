//! Content engine error types.
//!
//! Only `DuplicateBlockType` is a programmer error. Everything else is
//! recoverable: callers render a placeholder, refresh their view of the
//! document, or flag the block and keep going.

use tessera_sdk::{BlockId, RowId};
use thiserror::Error;

/// Errors raised by the registry, the document model, and the editors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    /// No definition is registered for the block type tag.
    #[error("unknown block type '{type_name}'")]
    UnknownBlockType { type_name: String },

    /// A definition for the tag already exists; re-registration is rejected.
    #[error("block type '{type_name}' is already registered")]
    DuplicateBlockType { type_name: String },

    /// A stale or foreign block id was passed to a mutator.
    #[error("block '{id}' not found")]
    BlockNotFound { id: BlockId },

    /// An explicit target index lies outside the list.
    #[error("index {index} out of range for {len} item(s)")]
    IndexOutOfRange { index: usize, len: usize },

    /// The block payload does not satisfy its type's validator.
    #[error("block '{id}' failed validation: {}", .errors.join("; "))]
    ValidationFailed { id: BlockId, errors: Vec<String> },

    /// A table operation was attempted on a block of another type.
    #[error("block '{id}' is a '{found}' block, not a table")]
    NotATable { id: BlockId, found: String },

    /// A stale row id was passed to a table operation.
    #[error("table row '{id}' not found")]
    RowNotFound { id: RowId },
}

/// Result type alias using ContentError.
pub type ContentResult<T> = Result<T, ContentError>;
