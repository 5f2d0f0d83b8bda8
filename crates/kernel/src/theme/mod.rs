//! HTML output for render trees.

mod render;

pub use render::RenderTreeConsumer;
