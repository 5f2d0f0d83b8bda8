//! Content module.
//!
//! This module provides:
//! - BlockTypeRegistry: Block type definitions, components and validation
//! - ContentDocumentModel: The ordered block list of one document
//! - FilterPipeline: Text format filtering for security
//! - Block renderers for the standard types

pub mod block_render;
pub mod block_types;
pub mod document;
pub mod filter;
mod standard_blocks;

pub use block_render::render_unsupported;
pub use block_types::{BlockBehavior, BlockTypeDefinition, BlockTypeRegistry, shallow_merge};
pub use document::{ContentDocumentModel, LoadReport, LoadWarning, SubscriptionId};
pub use filter::{FilterPipeline, TextFilter};
pub use standard_blocks::standard_definitions;
