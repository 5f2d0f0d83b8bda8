//! Block type registry.
//!
//! Provides:
//! - `BlockBehavior`: the component bundle a block type plugs in (default
//!   payload, validator, patch merge, view/editor/settings components)
//! - `BlockTypeDefinition`: metadata plus behavior for one block type
//! - `BlockTypeRegistry`: shared, read-mostly catalog keyed by type tag
//!
//! New block types are added by registration, never by subclassing. The
//! registry is a cheap-to-clone handle; types registered after a document
//! was opened become visible to it immediately.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use tessera_sdk::render::{self, RenderElement};
use tessera_sdk::{BlockId, ValidationResult};

use crate::content::standard_blocks;
use crate::error::{ContentError, ContentResult};

/// Behavior bundle for one block type.
///
/// Components return render trees; the kernel turns them into markup.
pub trait BlockBehavior: Send + Sync {
    /// Payload for a freshly inserted block.
    fn default_data(&self) -> Value;

    /// Check a payload. Errors are reported, never enforced by rejection.
    fn validate(&self, data: &Value) -> ValidationResult;

    /// Merge a settings patch into the current payload.
    fn merge_patch(&self, current: &Value, patch: &Value) -> Value {
        shallow_merge(current, patch)
    }

    /// Read-only rendering.
    fn view(&self, data: &Value) -> RenderElement;

    /// Inline editing surface. Defaults to the view inside an editor frame.
    fn editor(&self, id: &BlockId, data: &Value) -> RenderElement {
        render::container()
            .class("block-editor")
            .attr("data-block-id", id.as_str())
            .child("content", self.view(data))
            .build()
    }

    /// Settings panel shown while the block is active.
    fn settings(&self, id: &BlockId, _data: &Value) -> RenderElement {
        render::container()
            .tag("form")
            .class("block-settings")
            .attr("data-block-id", id.as_str())
            .child(
                "empty",
                render::markup("p", "This block has no settings.").build(),
            )
            .build()
    }
}

/// Shallow object merge: top-level keys of `patch` replace those of
/// `current`. A non-object on either side means the patch wins outright.
pub fn shallow_merge(current: &Value, patch: &Value) -> Value {
    match (current, patch) {
        (Value::Object(base), Value::Object(changes)) => {
            let mut merged = base.clone();
            for (key, value) in changes {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => patch.clone(),
    }
}

/// Definition of a single block type in the editor.
#[derive(Clone)]
pub struct BlockTypeDefinition {
    /// Machine name of the block type (e.g. "paragraph", "heading").
    pub type_name: String,
    /// Human-readable label (e.g. "Paragraph", "Heading").
    pub label: String,
    /// JSON Schema describing the expected data shape.
    pub schema: Value,
    /// Text formats this block can use (e.g. "filtered_html", "plain_text").
    pub allowed_formats: Vec<String>,
    /// Feature or plugin that provides this block type.
    pub plugin: String,
    behavior: Arc<dyn BlockBehavior>,
}

impl fmt::Debug for BlockTypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockTypeDefinition")
            .field("type_name", &self.type_name)
            .field("label", &self.label)
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}

impl BlockTypeDefinition {
    /// Create a definition with an empty schema, provided by "core".
    pub fn new(
        type_name: impl Into<String>,
        label: impl Into<String>,
        behavior: impl BlockBehavior + 'static,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            label: label.into(),
            schema: serde_json::json!({ "type": "object" }),
            allowed_formats: Vec::new(),
            plugin: "core".to_string(),
            behavior: Arc::new(behavior),
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_formats(mut self, formats: &[&str]) -> Self {
        self.allowed_formats = formats.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = plugin.into();
        self
    }

    pub fn create_default_data(&self) -> Value {
        self.behavior.default_data()
    }

    pub fn validate(&self, data: &Value) -> ValidationResult {
        self.behavior.validate(data)
    }

    pub fn merge_patch(&self, current: &Value, patch: &Value) -> Value {
        self.behavior.merge_patch(current, patch)
    }

    pub fn view_component(&self, data: &Value) -> RenderElement {
        self.behavior.view(data)
    }

    pub fn editor_component(&self, id: &BlockId, data: &Value) -> RenderElement {
        self.behavior.editor(id, data)
    }

    pub fn settings_component(&self, id: &BlockId, data: &Value) -> RenderElement {
        self.behavior.settings(id, data)
    }
}

#[derive(Default)]
struct RegistryInner {
    /// Tags in registration order, for "insert block" menus.
    order: Vec<String>,
    types: HashMap<String, Arc<BlockTypeDefinition>>,
}

impl RegistryInner {
    fn insert(&mut self, definition: BlockTypeDefinition) {
        self.order.push(definition.type_name.clone());
        self.types
            .insert(definition.type_name.clone(), Arc::new(definition));
    }
}

/// Registry of block type definitions, keyed by type name.
///
/// Register every supported type at startup, before constructing builders
/// or viewers. Types are never unregistered.
#[derive(Clone, Default)]
pub struct BlockTypeRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl fmt::Debug for BlockTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockTypeRegistry")
            .field("types", &self.inner.read().order)
            .finish()
    }
}

impl BlockTypeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the standard block types.
    pub fn with_standard_types() -> Self {
        let registry = Self::new();
        {
            let mut inner = registry.inner.write();
            for definition in standard_blocks::standard_definitions() {
                inner.insert(definition);
            }
        }
        registry
    }

    /// Register the standard block types on an existing registry.
    pub fn register_standard_types(&self) -> ContentResult<()> {
        for definition in standard_blocks::standard_definitions() {
            self.register(definition)?;
        }
        Ok(())
    }

    /// Register a single block type definition.
    ///
    /// Fails with `DuplicateBlockType` if the tag is taken; the existing
    /// definition is left in place.
    pub fn register(&self, definition: BlockTypeDefinition) -> ContentResult<()> {
        let mut inner = self.inner.write();
        if inner.types.contains_key(&definition.type_name) {
            warn!(
                type_name = %definition.type_name,
                plugin = %definition.plugin,
                "rejected duplicate block type registration"
            );
            return Err(ContentError::DuplicateBlockType {
                type_name: definition.type_name,
            });
        }

        debug!(type_name = %definition.type_name, plugin = %definition.plugin, "registered block type");
        inner.insert(definition);
        Ok(())
    }

    /// Look up a block type by name.
    pub fn get(&self, type_name: &str) -> ContentResult<Arc<BlockTypeDefinition>> {
        self.inner
            .read()
            .types
            .get(type_name)
            .cloned()
            .ok_or_else(|| ContentError::UnknownBlockType {
                type_name: type_name.to_string(),
            })
    }

    /// Check whether a block type is registered.
    pub fn has(&self, type_name: &str) -> bool {
        self.inner.read().types.contains_key(type_name)
    }

    /// Registered type names in registration order.
    pub fn list_types(&self) -> Vec<String> {
        self.inner.read().order.clone()
    }

    /// `(type_name, label)` pairs in registration order.
    pub fn labels(&self) -> Vec<(String, String)> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|name| inner.types.get(name))
            .map(|def| (def.type_name.clone(), def.label.clone()))
            .collect()
    }

    /// Return the number of registered block types.
    pub fn len(&self) -> usize {
        self.inner.read().types.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().types.is_empty()
    }

    /// Validate block data against the registered block type.
    ///
    /// An unregistered type yields a single "unknown block type" error.
    pub fn validate_block(&self, type_name: &str, data: &Value) -> ValidationResult {
        match self.get(type_name) {
            Ok(definition) => definition.validate(data),
            Err(e) => ValidationResult::from_errors(vec![e.to_string()]),
        }
    }
}
