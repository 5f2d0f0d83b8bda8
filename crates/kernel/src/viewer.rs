//! Read-only document rendering.

use tessera_sdk::render::{self, RenderElement};
use tessera_sdk::Block;
use tracing::debug;

use crate::content::{BlockTypeRegistry, ContentDocumentModel, render_unsupported};
use crate::theme::RenderTreeConsumer;

/// Renders document snapshots with each block type's view component.
///
/// Only shared borrows of a document are accepted.
#[derive(Debug, Clone)]
pub struct ContentViewer {
    registry: BlockTypeRegistry,
}

impl ContentViewer {
    pub fn new(registry: BlockTypeRegistry) -> Self {
        Self { registry }
    }

    /// Render blocks in document order.
    ///
    /// A block whose type is not registered renders as a placeholder; the
    /// remaining blocks are rendered normally.
    pub fn render(&self, blocks: &[Block]) -> RenderElement {
        let mut document = render::container().class("content-viewer");
        for (i, block) in blocks.iter().enumerate() {
            let content = match self.registry.get(block.block_type()) {
                Ok(definition) => definition.view_component(block.data()),
                Err(e) => {
                    debug!(block_id = %block.id(), error = %e, "rendering placeholder");
                    render_unsupported(block)
                }
            };
            let wrapper = render::container()
                .tag("section")
                .class("block")
                .class(&format!("block--{}", block.block_type()))
                .attr("data-block-id", block.id().as_str())
                .weight(i as i32)
                .child("content", content)
                .build();
            document = document.child(&format!("block_{i:04}"), wrapper);
        }
        document.build()
    }

    pub fn render_model(&self, model: &ContentDocumentModel) -> RenderElement {
        self.render(model.blocks())
    }

    /// Render blocks straight to HTML.
    pub fn render_html(&self, blocks: &[Block]) -> String {
        RenderTreeConsumer::new().render(&self.render(blocks))
    }
}
