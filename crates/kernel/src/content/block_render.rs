//! View components for the standard block types.
//!
//! Each renderer turns a block payload into a render tree:
//! - Paragraph, heading, list, quote, table, divider, image, code, embed
//! - Code blocks use `syntect` for syntax highlighting
//! - Embed blocks enforce a video host whitelist for iframe rendering
//!
//! Renderers never fail: missing or mistyped fields fall back to empty
//! values so one malformed block cannot break a page.

use std::sync::LazyLock;

use serde_json::Value;
use tessera_sdk::render::{self, RenderElement};
use tessera_sdk::{Block, TableBlockData};

use crate::content::filter::html_escape;

const TEXT_FORMAT: &str = "filtered_html";

// Pre-loaded syntect resources (loading them per call is slow).
static SYNTAX_SET: LazyLock<syntect::parsing::SyntaxSet> =
    LazyLock::new(syntect::parsing::SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<syntect::highlighting::ThemeSet> =
    LazyLock::new(syntect::highlighting::ThemeSet::load_defaults);

/// Read a string field, defaulting to "".
pub(crate) fn str_field<'a>(data: &'a Value, field: &str) -> &'a str {
    data.get(field).and_then(|v| v.as_str()).unwrap_or("")
}

/// Validate that a URL uses a safe scheme (http or https).
pub(crate) fn is_safe_url(raw: &str) -> bool {
    url::Url::parse(raw.trim()).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

/// Neutral placeholder for a block whose type is not registered.
pub fn render_unsupported(block: &Block) -> RenderElement {
    render::container()
        .class("block")
        .class("block--unsupported")
        .attr("data-block-id", block.id().as_str())
        .attr("data-block-type", block.block_type())
        .child(
            "message",
            render::markup(
                "p",
                &format!("Unsupported block type '{}'", block.block_type()),
            )
            .build(),
        )
        .build()
}

/// Render a paragraph block.
/// Data: `{ "text": "..." }`
pub fn render_paragraph(data: &Value) -> RenderElement {
    render::filtered_markup("p", str_field(data, "text"), TEXT_FORMAT).build()
}

/// Heading level clamped to 1..=6, default 2.
pub(crate) fn heading_level(data: &Value) -> u64 {
    data.get("level")
        .and_then(|v| v.as_u64())
        .unwrap_or(2)
        .clamp(1, 6)
}

/// Render a heading block.
/// Data: `{ "text": "...", "level": 2 }`
pub fn render_heading(data: &Value) -> RenderElement {
    let tag = format!("h{}", heading_level(data));
    render::filtered_markup(&tag, str_field(data, "text"), TEXT_FORMAT).build()
}

/// Render a list block (ordered or unordered).
/// Data: `{ "style": "ordered"|"unordered", "items": ["...", ...] }`
pub fn render_list(data: &Value) -> RenderElement {
    let tag = if str_field(data, "style") == "ordered" {
        "ol"
    } else {
        "ul"
    };

    let mut list = render::container().tag(tag);
    if let Some(items) = data.get("items").and_then(|v| v.as_array()) {
        for (i, item) in items.iter().enumerate() {
            // Items can be plain strings or objects with a "content" field
            let content = item
                .as_str()
                .or_else(|| item.get("content").and_then(|v| v.as_str()))
                .unwrap_or("");
            list = list.child(
                &format!("item_{i:04}"),
                render::filtered_markup("li", content, TEXT_FORMAT)
                    .weight(i as i32)
                    .build(),
            );
        }
    }
    list.build()
}

/// Render a quote block.
/// Data: `{ "text": "...", "caption": "..." }`
pub fn render_quote(data: &Value) -> RenderElement {
    let mut quote = render::container().tag("blockquote").child(
        "text",
        render::filtered_markup("p", str_field(data, "text"), TEXT_FORMAT)
            .weight(0)
            .build(),
    );
    let caption = str_field(data, "caption");
    if !caption.trim().is_empty() {
        quote = quote.child(
            "caption",
            render::filtered_markup("cite", caption, TEXT_FORMAT)
                .weight(1)
                .build(),
        );
    }
    quote.build()
}

/// Text of a table cell; non-string payloads render as their JSON text.
pub(crate) fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other
            .get("content")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

/// Render a table block, honoring the stored column order.
/// Data: `{ "with_headings": bool, "rows": [{ "id", "cells" }], "column_order": [..] }`
pub fn render_table(data: &Value) -> RenderElement {
    let Ok(table) = TableBlockData::from_value(data) else {
        return render::container()
            .tag("table")
            .class("table--malformed")
            .build();
    };
    let order = table.normalized_column_order();

    let mut body = render::container().tag("tbody").weight(1);
    let mut head = None;
    for (i, row) in table.rows.iter().enumerate() {
        let heading_row = table.with_headings && i == 0;
        let cell_tag = if heading_row { "th" } else { "td" };
        let mut tr = render::container()
            .tag("tr")
            .attr("data-row-id", row.id.as_str())
            .weight(i as i32);
        for (j, &column) in order.iter().enumerate() {
            let text = row.cells.get(column).map(cell_text).unwrap_or_default();
            tr = tr.child(
                &format!("cell_{j:04}"),
                render::filtered_markup(cell_tag, &text, TEXT_FORMAT)
                    .weight(j as i32)
                    .build(),
            );
        }
        if heading_row {
            head = Some(
                render::container()
                    .tag("thead")
                    .weight(0)
                    .child("row", tr.build())
                    .build(),
            );
        } else {
            body = body.child(&format!("row_{i:04}"), tr.build());
        }
    }

    let mut el = render::container().tag("table");
    if let Some(head) = head {
        el = el.child("head", head);
    }
    el.child("body", body.build()).build()
}

/// Render a divider block as a horizontal rule.
pub fn render_divider() -> RenderElement {
    render::markup("hr", "").build()
}

/// Image URL from `file.url`, or a bare `url` field.
pub(crate) fn image_url(data: &Value) -> &str {
    data.get("file")
        .and_then(|f| f.get("url"))
        .and_then(|v| v.as_str())
        .or_else(|| data.get("url").and_then(|v| v.as_str()))
        .unwrap_or("")
}

/// Render an image block with a figure/figcaption wrapper.
/// Data: `{ "file": { "url": "..." }, "caption": "...", "alt": "..." }`
pub fn render_image(data: &Value) -> RenderElement {
    let url = image_url(data);
    let caption = str_field(data, "caption");
    let alt = match str_field(data, "alt") {
        "" => caption,
        alt => alt,
    };

    let mut figure = render::container().tag("figure");
    if is_safe_url(url) {
        figure = figure.child(
            "image",
            render::markup("img", "")
                .attr("src", url)
                .attr("alt", alt)
                .weight(0)
                .build(),
        );
    }
    if !caption.is_empty() {
        figure = figure.child(
            "caption",
            render::markup("figcaption", caption).weight(1).build(),
        );
    }
    figure.build()
}

/// Render a code block with syntax highlighting via `syntect`.
/// Data: `{ "code": "...", "language": "rust" }`
///
/// Uses the "InspiredGitHub" theme with a fallback to "base16-ocean.dark".
/// Unknown or missing languages render as HTML-escaped plain text.
pub fn render_code(data: &Value) -> RenderElement {
    let code = str_field(data, "code");
    let lang = str_field(data, "language").trim();

    let plain = || {
        render::container()
            .tag("pre")
            .child(
                "code",
                render::filtered_markup("code", &html_escape(code), "full_html").build(),
            )
            .build()
    };

    if lang.is_empty() {
        return plain();
    }

    let ss = &*SYNTAX_SET;
    let ts = &*THEME_SET;

    let Some(syntax) = ss
        .find_syntax_by_token(lang)
        .or_else(|| ss.find_syntax_by_name(lang))
    else {
        return plain();
    };

    let Some(theme) = ts
        .themes
        .get("InspiredGitHub")
        .or_else(|| ts.themes.get("base16-ocean.dark"))
    else {
        return plain();
    };

    match syntect::html::highlighted_html_for_string(code, ss, syntax, theme) {
        Ok(highlighted) => render::container()
            .tag("pre")
            .child(
                "code",
                render::filtered_markup("code", &highlighted, "full_html")
                    .class(&format!("language-{lang}"))
                    .build(),
            )
            .build(),
        Err(_) => plain(),
    }
}

/// Render an embed block.
///
/// Whitelisted video sources (YouTube, Vimeo) render as responsive iframes.
/// Other http(s) URLs render as plain links; anything else as inert text.
/// Data: `{ "service": "...", "source": "...", "embed": "...", "caption": "..." }`
pub fn render_embed(data: &Value) -> RenderElement {
    let embed_url = data
        .get("embed")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .or_else(|| data.get("source").and_then(|v| v.as_str()))
        .unwrap_or("");

    if embed_url.is_empty() {
        return render::container().class("embed--empty").build();
    }

    if is_whitelisted_embed(embed_url) {
        let mut el = render::container().class("embed-responsive").child(
            "frame",
            render::markup("iframe", "")
                .attr("src", embed_url)
                .attr("frameborder", "0")
                .flag("allowfullscreen", true)
                .weight(0)
                .build(),
        );
        let caption = str_field(data, "caption");
        if !caption.is_empty() {
            el = el.child(
                "caption",
                render::markup("p", caption)
                    .class("embed-caption")
                    .weight(1)
                    .build(),
            );
        }
        el.build()
    } else if is_safe_url(embed_url) {
        render::link(embed_url, embed_url).build()
    } else {
        // javascript: and friends render as text only
        render::markup("span", embed_url).build()
    }
}

/// Whitelisted embed hosts and the path prefixes allowed on each.
const EMBED_WHITELIST: &[(&str, &str)] = &[
    ("youtube.com", "/watch"),
    ("youtube.com", "/embed/"),
    ("youtu.be", "/"),
    ("vimeo.com", "/"),
    ("player.vimeo.com", "/"),
];

/// Check whether the given URL points at a whitelisted video host.
pub fn is_whitelisted_embed(raw: &str) -> bool {
    let Ok(parsed) = url::Url::parse(raw.trim()) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.strip_prefix("www.").unwrap_or(host);

    EMBED_WHITELIST
        .iter()
        .any(|(allowed, prefix)| host == *allowed && parsed.path().starts_with(prefix))
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::theme::RenderTreeConsumer;
    use serde_json::json;
    use tessera_sdk::BlockId;

    fn html(el: &RenderElement) -> String {
        RenderTreeConsumer::new().render(el)
    }

    #[test]
    fn paragraph_keeps_inline_html() {
        let out = html(&render_paragraph(
            &json!({ "text": "This is <b>bold</b> and <i>italic</i>." }),
        ));
        assert_eq!(out, "<p>This is <b>bold</b> and <i>italic</i>.</p>");
    }

    #[test]
    fn paragraph_strips_script_tags() {
        let out = html(&render_paragraph(
            &json!({ "text": "Hello <script>alert('xss')</script> world" }),
        ));
        assert!(!out.contains("<script>"), "script tags must be stripped");
        assert!(out.contains("Hello"));
    }

    #[test]
    fn heading_levels() {
        assert_eq!(
            html(&render_heading(&json!({ "text": "Section", "level": 3 }))),
            "<h3>Section</h3>"
        );
        assert_eq!(
            html(&render_heading(&json!({ "text": "Default" }))),
            "<h2>Default</h2>"
        );
        assert_eq!(
            html(&render_heading(&json!({ "text": "Too high", "level": 9 }))),
            "<h6>Too high</h6>"
        );
    }

    #[test]
    fn list_ordered_and_unordered() {
        let out = html(&render_list(
            &json!({ "style": "ordered", "items": ["First", "Second"] }),
        ));
        assert_eq!(out, "<ol><li>First</li><li>Second</li></ol>");

        let out = html(&render_list(&json!({ "items": ["Apple"] })));
        assert_eq!(out, "<ul><li>Apple</li></ul>");
    }

    #[test]
    fn quote_with_and_without_caption() {
        let out = html(&render_quote(
            &json!({ "text": "To be.", "caption": "Shakespeare" }),
        ));
        assert_eq!(
            out,
            "<blockquote><p>To be.</p><cite>Shakespeare</cite></blockquote>"
        );
        let out = html(&render_quote(&json!({ "text": "Just a quote." })));
        assert_eq!(out, "<blockquote><p>Just a quote.</p></blockquote>");
    }

    #[test]
    fn table_renders_in_column_order() {
        let data = json!({
            "with_headings": true,
            "rows": [
                { "id": "r1", "cells": ["Name", "Age"] },
                { "id": "r2", "cells": ["Ada", "36"] }
            ],
            "column_order": [1, 0]
        });
        let out = html(&render_table(&data));
        assert!(out.contains("<thead><tr data-row-id=\"r1\"><th>Age</th><th>Name</th></tr></thead>"));
        assert!(out.contains("<tbody><tr data-row-id=\"r2\"><td>36</td><td>Ada</td></tr></tbody>"));
    }

    #[test]
    fn malformed_table_renders_marker() {
        let el = render_table(&json!({ "rows": "nope" }));
        assert!(el.has_class("table--malformed"));
    }

    #[test]
    fn divider_is_hr() {
        assert_eq!(html(&render_divider()), "<hr />");
    }

    #[test]
    fn image_escapes_url_and_caption() {
        let out = html(&render_image(&json!({
            "url": "https://example.com/photo.jpg?a=1&b=2",
            "caption": "A <b>bold</b> caption"
        })));
        assert!(out.contains("&amp;b=2"), "URL ampersands should be escaped");
        assert!(
            out.contains("&lt;b&gt;bold&lt;/b&gt;"),
            "Caption HTML should be escaped"
        );
    }

    #[test]
    fn image_with_unsafe_url_omits_img() {
        let out = html(&render_image(&json!({
            "file": { "url": "javascript:alert(1)" },
            "caption": "x"
        })));
        assert!(!out.contains("<img"));
    }

    #[test]
    fn code_block_with_rust_highlighting() {
        let out = html(&render_code(&json!({
            "code": "fn main() {\n    println!(\"hello\");\n}",
            "language": "rust"
        })));
        assert!(
            out.contains("<code class=\"language-rust\">"),
            "Expected language class in output, got: {out}"
        );
        assert!(out.contains("<span"), "Expected highlighted spans, got: {out}");
    }

    #[test]
    fn code_block_unknown_language_escapes() {
        let out = html(&render_code(&json!({
            "code": "<script>alert('xss')</script>",
            "language": "nonexistent_language_xyz"
        })));
        assert!(!out.contains("<script>"), "HTML should be escaped");
        assert!(out.contains("&lt;script&gt;"));
    }

    #[test]
    fn embed_youtube_produces_iframe() {
        let out = html(&render_embed(&json!({
            "service": "youtube",
            "source": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "caption": "A video"
        })));
        assert!(out.contains("<iframe"), "got: {out}");
        assert!(out.contains("allowfullscreen"));
        assert!(out.contains("embed-caption"));
    }

    #[test]
    fn embed_non_whitelisted_url_is_link() {
        let out = html(&render_embed(
            &json!({ "embed": "https://evil.example.com/payload" }),
        ));
        assert!(!out.contains("<iframe"));
        assert!(out.contains("<a href=\"https://evil.example.com/payload\""));
    }

    #[test]
    fn embed_javascript_uri_rejected() {
        let out = html(&render_embed(&json!({ "embed": "javascript:alert('xss')" })));
        assert!(!out.contains("href"), "got: {out}");
        assert!(out.contains("<span>"));
    }

    #[test]
    fn embed_whitelist_rejects_similar_domains() {
        assert!(!is_whitelisted_embed("https://notyoutube.com/watch?v=abc"));
        assert!(!is_whitelisted_embed("https://youtube.com.evil.com/watch?v=abc"));
        assert!(!is_whitelisted_embed("https://fakevimeo.com/12345"));
        assert!(!is_whitelisted_embed("https://youtube.com/feed"));
    }

    #[test]
    fn embed_whitelist_accepts_known_sources() {
        assert!(is_whitelisted_embed("https://youtube.com/watch?v=abc123"));
        assert!(is_whitelisted_embed("https://www.youtube.com/watch?v=abc123"));
        assert!(is_whitelisted_embed("https://youtu.be/abc123"));
        assert!(is_whitelisted_embed("https://www.vimeo.com/123456"));
        assert!(is_whitelisted_embed("https://player.vimeo.com/video/123"));
        assert!(is_whitelisted_embed("https://youtube.com/embed/abc123"));
    }

    #[test]
    fn unsupported_placeholder_names_type() {
        let block = Block::new(BlockId::new("b9"), "carousel", json!({}));
        let el = render_unsupported(&block);
        assert!(el.has_class("block--unsupported"));
        assert!(html(&el).contains("Unsupported block type &#x27;carousel&#x27;"));
    }
}
