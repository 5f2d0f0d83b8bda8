//! Tessera SDK
//!
//! Shared types and the render element API for block-type authors.
//! Hosts that define their own block types depend on this crate only;
//! the kernel consumes the same types.

pub mod render;
pub mod types;

pub use render::RenderElement;
pub use types::{Block, BlockId, RowId, TableBlockData, TableRow, ValidationResult};

pub mod prelude {
    pub use crate::render;
    pub use crate::types::*;
}
