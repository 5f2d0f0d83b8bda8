//! The standard block types: paragraph, heading, list, quote, table,
//! divider, image, code and embedded video.

use serde_json::{Value, json};
use tessera_sdk::render::{self, RenderElement};
use tessera_sdk::{BlockId, TableBlockData, ValidationResult};

use crate::content::block_render::{self, cell_text, heading_level, image_url, str_field};
use crate::content::block_types::{BlockBehavior, BlockTypeDefinition};
use crate::content::filter::sanitize_html;

const TEXT_FORMATS: &[&str] = &["filtered_html", "plain_text"];

/// Definitions for every standard type, in menu order.
pub fn standard_definitions() -> Vec<BlockTypeDefinition> {
    vec![
        BlockTypeDefinition::new("paragraph", "Paragraph", Paragraph)
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            }))
            .with_formats(TEXT_FORMATS),
        BlockTypeDefinition::new("heading", "Heading", Heading)
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" },
                    "level": { "type": "integer", "minimum": 1, "maximum": 6 }
                },
                "required": ["text", "level"]
            }))
            .with_formats(TEXT_FORMATS),
        BlockTypeDefinition::new("list", "List", List)
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "style": { "type": "string", "enum": ["ordered", "unordered"] },
                    "items": {
                        "type": "array",
                        "items": { "type": "string" }
                    }
                },
                "required": ["style", "items"]
            }))
            .with_formats(TEXT_FORMATS),
        BlockTypeDefinition::new("quote", "Quote", Quote)
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" },
                    "caption": { "type": "string" }
                },
                "required": ["text"]
            }))
            .with_formats(TEXT_FORMATS),
        BlockTypeDefinition::new("table", "Table", Table)
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "with_headings": { "type": "boolean" },
                    "rows": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "string" },
                                "cells": { "type": "array" }
                            },
                            "required": ["id"]
                        }
                    },
                    "column_order": {
                        "type": "array",
                        "items": { "type": "integer", "minimum": 0 }
                    }
                },
                "required": ["rows"]
            }))
            .with_formats(TEXT_FORMATS),
        BlockTypeDefinition::new("divider", "Divider", Divider).with_schema(json!({
            "type": "object",
            "properties": {}
        })),
        BlockTypeDefinition::new("image", "Image", Image).with_schema(json!({
            "type": "object",
            "properties": {
                "file": {
                    "type": "object",
                    "properties": {
                        "url": { "type": "string", "minLength": 1 }
                    },
                    "required": ["url"]
                },
                "caption": { "type": "string" },
                "alt": { "type": "string" }
            },
            "required": ["file"]
        })),
        BlockTypeDefinition::new("code", "Code", Code).with_schema(json!({
            "type": "object",
            "properties": {
                "code": { "type": "string" },
                "language": { "type": "string" }
            },
            "required": ["code"]
        })),
        BlockTypeDefinition::new("embed", "Embedded video", Embed).with_schema(json!({
            "type": "object",
            "properties": {
                "service": { "type": "string" },
                "source": { "type": "string" },
                "embed": { "type": "string" },
                "caption": { "type": "string" }
            },
            "required": ["service", "source"]
        })),
    ]
}

/// Flag a text field whose markup `ammonia` would strip. A missing field
/// passes, as does text that only gets its entities re-escaped.
fn validate_text_field(data: &Value, field: &str, block_type: &str, result: &mut ValidationResult) {
    if let Some(text) = data.get(field).and_then(|v| v.as_str())
        && unescape_entities(&sanitize_html(text)) != unescape_entities(text)
    {
        result.push(format!(
            "{block_type}: '{field}' contains disallowed HTML that was sanitized"
        ));
    }
}

/// Undo the entity escaping `ammonia` applies to plain text.
fn unescape_entities(html: &str) -> String {
    html.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

fn require_string(data: &Value, field: &str, block_type: &str, result: &mut ValidationResult) {
    match data.get(field) {
        Some(Value::String(_)) => {}
        Some(_) => result.push(format!("{block_type}: '{field}' must be a string")),
        None => result.push(format!("{block_type}: missing required field '{field}'")),
    }
}

/// Settings form wrapper shared by the standard types.
fn settings_form(id: &BlockId, fields: Vec<(&str, RenderElement)>) -> RenderElement {
    let mut form = render::container()
        .tag("form")
        .class("block-settings")
        .attr("data-block-id", id.as_str());
    for (i, (name, field)) in fields.into_iter().enumerate() {
        let label = render::container()
            .tag("label")
            .weight(i as i32)
            .child("title", render::markup("span", name).weight(0).build())
            .child("field", field)
            .build();
        form = form.child(&format!("field_{i:02}"), label);
    }
    form.build()
}

/// Editor frame around a single contenteditable text field.
fn text_editor(id: &BlockId, tag: &str, field: &str, text: &str) -> RenderElement {
    render::container()
        .class("block-editor")
        .attr("data-block-id", id.as_str())
        .child(
            "content",
            render::filtered_markup(tag, text, "filtered_html")
                .attr("contenteditable", "true")
                .attr("data-field", field)
                .build(),
        )
        .build()
}

struct Paragraph;

impl BlockBehavior for Paragraph {
    fn default_data(&self) -> Value {
        json!({ "text": "" })
    }

    fn validate(&self, data: &Value) -> ValidationResult {
        let mut result = ValidationResult::ok();
        require_string(data, "text", "paragraph", &mut result);
        validate_text_field(data, "text", "paragraph", &mut result);
        result
    }

    fn view(&self, data: &Value) -> RenderElement {
        block_render::render_paragraph(data)
    }

    fn editor(&self, id: &BlockId, data: &Value) -> RenderElement {
        text_editor(id, "p", "text", str_field(data, "text"))
    }
}

struct Heading;

impl BlockBehavior for Heading {
    fn default_data(&self) -> Value {
        json!({ "text": "", "level": 2 })
    }

    fn validate(&self, data: &Value) -> ValidationResult {
        let mut result = ValidationResult::ok();
        require_string(data, "text", "heading", &mut result);
        validate_text_field(data, "text", "heading", &mut result);
        if let Some(level) = data.get("level") {
            match level.as_i64() {
                Some(n) if (1..=6).contains(&n) => {}
                Some(n) => result.push(format!("heading: level must be between 1 and 6, got {n}")),
                None => result.push("heading: level must be an integer"),
            }
        }
        result
    }

    fn view(&self, data: &Value) -> RenderElement {
        block_render::render_heading(data)
    }

    fn editor(&self, id: &BlockId, data: &Value) -> RenderElement {
        let tag = format!("h{}", heading_level(data));
        text_editor(id, &tag, "text", str_field(data, "text"))
    }

    fn settings(&self, id: &BlockId, data: &Value) -> RenderElement {
        let level = heading_level(data).to_string();
        let choices = [
            ("1", "Heading 1"),
            ("2", "Heading 2"),
            ("3", "Heading 3"),
            ("4", "Heading 4"),
            ("5", "Heading 5"),
            ("6", "Heading 6"),
        ];
        settings_form(
            id,
            vec![("Level", render::select("level", &choices, &level).build())],
        )
    }
}

struct List;

impl BlockBehavior for List {
    fn default_data(&self) -> Value {
        json!({ "style": "unordered", "items": [] })
    }

    fn validate(&self, data: &Value) -> ValidationResult {
        let mut result = ValidationResult::ok();
        match str_field(data, "style") {
            "ordered" | "unordered" => {}
            other => result.push(format!(
                "list: style must be 'ordered' or 'unordered', got '{other}'"
            )),
        }
        match data.get("items").and_then(|v| v.as_array()) {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    match item.as_str() {
                        Some(text) if sanitize_html(text) != text => result.push(format!(
                            "list: item {i} contains disallowed HTML that was sanitized"
                        )),
                        Some(_) => {}
                        None => result.push(format!("list: item {i} must be a string")),
                    }
                }
            }
            None => result.push("list: items must be an array"),
        }
        result
    }

    fn view(&self, data: &Value) -> RenderElement {
        block_render::render_list(data)
    }

    fn editor(&self, id: &BlockId, data: &Value) -> RenderElement {
        let tag = if str_field(data, "style") == "ordered" {
            "ol"
        } else {
            "ul"
        };
        let mut list = render::container().tag(tag);
        if let Some(items) = data.get("items").and_then(|v| v.as_array()) {
            for (i, item) in items.iter().enumerate() {
                list = list.child(
                    &format!("item_{i:04}"),
                    render::filtered_markup("li", item.as_str().unwrap_or(""), "filtered_html")
                        .attr("contenteditable", "true")
                        .attr("data-item", &i.to_string())
                        .weight(i as i32)
                        .build(),
                );
            }
        }
        let list = list
            .child(
                "add",
                render::markup("button", "Add item")
                    .attr("data-action", "add-item")
                    .weight(i32::MAX)
                    .build(),
            )
            .build();
        render::container()
            .class("block-editor")
            .attr("data-block-id", id.as_str())
            .child("content", list)
            .build()
    }

    fn settings(&self, id: &BlockId, data: &Value) -> RenderElement {
        let style = match str_field(data, "style") {
            "ordered" => "ordered",
            _ => "unordered",
        };
        settings_form(
            id,
            vec![(
                "Style",
                render::select(
                    "style",
                    &[("unordered", "Bulleted"), ("ordered", "Numbered")],
                    style,
                )
                .build(),
            )],
        )
    }
}

struct Quote;

impl BlockBehavior for Quote {
    fn default_data(&self) -> Value {
        json!({ "text": "", "caption": "" })
    }

    fn validate(&self, data: &Value) -> ValidationResult {
        let mut result = ValidationResult::ok();
        require_string(data, "text", "quote", &mut result);
        validate_text_field(data, "text", "quote", &mut result);
        validate_text_field(data, "caption", "quote", &mut result);
        result
    }

    fn view(&self, data: &Value) -> RenderElement {
        block_render::render_quote(data)
    }

    fn editor(&self, id: &BlockId, data: &Value) -> RenderElement {
        text_editor(id, "blockquote", "text", str_field(data, "text"))
    }

    fn settings(&self, id: &BlockId, data: &Value) -> RenderElement {
        settings_form(
            id,
            vec![(
                "Caption",
                render::input("caption", "text", str_field(data, "caption")).build(),
            )],
        )
    }
}

struct Table;

impl BlockBehavior for Table {
    fn default_data(&self) -> Value {
        TableBlockData::empty(2, 2).to_value()
    }

    fn validate(&self, data: &Value) -> ValidationResult {
        let mut result = ValidationResult::ok();
        let table = match TableBlockData::from_value(data) {
            Ok(table) => table,
            Err(e) => {
                result.push(format!("table: malformed data: {e}"));
                return result;
            }
        };

        let columns = table.column_count();
        let mut seen = std::collections::HashSet::new();
        for (i, row) in table.rows.iter().enumerate() {
            if row.cells.len() != columns {
                result.push(format!(
                    "table: row {i} has {} cell(s), expected {columns}",
                    row.cells.len()
                ));
            }
            if !seen.insert(&row.id) {
                result.push(format!("table: duplicate row id '{}'", row.id));
            }
        }
        result
    }

    fn view(&self, data: &Value) -> RenderElement {
        block_render::render_table(data)
    }

    fn editor(&self, id: &BlockId, data: &Value) -> RenderElement {
        let frame = render::container()
            .class("block-editor")
            .class("table-editor")
            .attr("data-block-id", id.as_str());
        let Ok(table) = TableBlockData::from_value(data) else {
            return frame.child("content", self.view(data)).build();
        };
        let order = table.normalized_column_order();

        // Column handles sit in their own row above the data.
        let mut handles = render::container().tag("tr").class("column-handles").weight(-1);
        handles = handles.child("corner", render::markup("th", "").weight(-1).build());
        for (j, &column) in order.iter().enumerate() {
            handles = handles.child(
                &format!("handle_{j:04}"),
                render::markup("th", "")
                    .class("drag-handle")
                    .attr("data-column", &column.to_string())
                    .attr("draggable", "true")
                    .weight(j as i32)
                    .build(),
            );
        }

        let mut grid = render::container().tag("table").child("handles", handles.build());
        for (i, row) in table.rows.iter().enumerate() {
            let mut tr = render::container()
                .tag("tr")
                .attr("data-row-id", row.id.as_str())
                .weight(i as i32)
                .child(
                    "handle",
                    render::markup("td", "")
                        .class("drag-handle")
                        .attr("draggable", "true")
                        .weight(-1)
                        .build(),
                );
            for (j, &column) in order.iter().enumerate() {
                let text = row.cells.get(column).map(cell_text).unwrap_or_default();
                tr = tr.child(
                    &format!("cell_{j:04}"),
                    render::filtered_markup("td", &text, "filtered_html")
                        .attr("contenteditable", "true")
                        .attr("data-column", &column.to_string())
                        .weight(j as i32)
                        .build(),
                );
            }
            grid = grid.child(&format!("row_{i:04}"), tr.build());
        }
        frame.child("content", grid.build()).build()
    }

    fn settings(&self, id: &BlockId, data: &Value) -> RenderElement {
        let with_headings = data
            .get("with_headings")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        settings_form(
            id,
            vec![(
                "First row is a heading",
                render::input("with_headings", "checkbox", "true")
                    .flag("checked", with_headings)
                    .build(),
            )],
        )
    }
}

struct Divider;

impl BlockBehavior for Divider {
    fn default_data(&self) -> Value {
        json!({})
    }

    fn validate(&self, _data: &Value) -> ValidationResult {
        ValidationResult::ok()
    }

    fn view(&self, _data: &Value) -> RenderElement {
        block_render::render_divider()
    }
}

struct Image;

impl BlockBehavior for Image {
    fn default_data(&self) -> Value {
        json!({ "file": { "url": "" }, "caption": "", "alt": "" })
    }

    fn validate(&self, data: &Value) -> ValidationResult {
        let mut result = ValidationResult::ok();
        let url = data
            .get("file")
            .and_then(|f| f.get("url"))
            .and_then(|u| u.as_str());
        match url {
            None => result.push("image: missing required field file.url"),
            Some("") => result.push("image: file.url must not be empty"),
            Some(url) if !block_render::is_safe_url(url) => {
                result.push("image: file.url must be an http(s) URL");
            }
            Some(_) => {}
        }
        result
    }

    fn view(&self, data: &Value) -> RenderElement {
        block_render::render_image(data)
    }

    fn merge_patch(&self, current: &Value, patch: &Value) -> Value {
        // A flat "url" in the patch lands in file.url.
        let mut merged = crate::content::block_types::shallow_merge(current, patch);
        if let Some(url) = patch.get("url").and_then(|v| v.as_str())
            && let Some(obj) = merged.as_object_mut()
        {
            obj.remove("url");
            obj.insert("file".to_string(), json!({ "url": url }));
        }
        merged
    }

    fn settings(&self, id: &BlockId, data: &Value) -> RenderElement {
        settings_form(
            id,
            vec![
                ("Image URL", render::input("url", "url", image_url(data)).build()),
                (
                    "Caption",
                    render::input("caption", "text", str_field(data, "caption")).build(),
                ),
                (
                    "Alternative text",
                    render::input("alt", "text", str_field(data, "alt")).build(),
                ),
            ],
        )
    }
}

struct Code;

impl BlockBehavior for Code {
    fn default_data(&self) -> Value {
        json!({ "code": "", "language": "" })
    }

    fn validate(&self, data: &Value) -> ValidationResult {
        let mut result = ValidationResult::ok();
        require_string(data, "code", "code", &mut result);
        result
    }

    fn view(&self, data: &Value) -> RenderElement {
        block_render::render_code(data)
    }

    fn editor(&self, id: &BlockId, data: &Value) -> RenderElement {
        render::container()
            .class("block-editor")
            .attr("data-block-id", id.as_str())
            .child(
                "content",
                render::markup("textarea", str_field(data, "code"))
                    .attr("name", "code")
                    .attr("spellcheck", "false")
                    .build(),
            )
            .build()
    }

    fn settings(&self, id: &BlockId, data: &Value) -> RenderElement {
        settings_form(
            id,
            vec![(
                "Language",
                render::input("language", "text", str_field(data, "language")).build(),
            )],
        )
    }
}

struct Embed;

impl BlockBehavior for Embed {
    fn default_data(&self) -> Value {
        json!({ "service": "", "source": "", "caption": "" })
    }

    fn validate(&self, data: &Value) -> ValidationResult {
        let mut result = ValidationResult::ok();
        if data.get("service").is_none() {
            result.push("embed: missing required field 'service'");
        }
        match data.get("source").and_then(|v| v.as_str()) {
            None => result.push("embed: missing required field 'source'"),
            Some(source) if !block_render::is_whitelisted_embed(source) => {
                result.push("embed: source must be a YouTube or Vimeo URL");
            }
            Some(_) => {}
        }
        result
    }

    fn view(&self, data: &Value) -> RenderElement {
        block_render::render_embed(data)
    }

    fn settings(&self, id: &BlockId, data: &Value) -> RenderElement {
        settings_form(
            id,
            vec![
                (
                    "Video URL",
                    render::input("source", "url", str_field(data, "source")).build(),
                ),
                (
                    "Caption",
                    render::input("caption", "text", str_field(data, "caption")).build(),
                ),
            ],
        )
    }
}
