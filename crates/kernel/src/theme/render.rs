//! Render tree consumer - converts RenderElement trees to HTML.

use std::fmt::Write;

use serde_json::Value;
use tessera_sdk::render::RenderElement;

use crate::content::FilterPipeline;
use crate::content::filter::html_escape;

/// Elements rendered without a closing tag.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "meta", "link"];

/// Consumer that converts RenderElement trees to HTML.
///
/// Markup values are filtered through the pipeline named by their
/// `#format`; values without a format are HTML-escaped.
pub struct RenderTreeConsumer {
    _private: (),
}

impl RenderTreeConsumer {
    /// Create a new render tree consumer.
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Render a RenderElement tree to HTML.
    pub fn render(&self, element: &RenderElement) -> String {
        let mut html = String::new();
        self.render_element(element, &mut html);
        html
    }

    /// Render a sequence of sibling trees, in the given order.
    pub fn render_all<'a>(&self, elements: impl IntoIterator<Item = &'a RenderElement>) -> String {
        let mut html = String::new();
        for element in elements {
            self.render_element(element, &mut html);
        }
        html
    }

    fn render_element(&self, element: &RenderElement, out: &mut String) {
        match element.element_type.as_str() {
            "container" => self.render_container(element, out),
            "markup" => self.render_markup(element, out),
            other => {
                // Unknown type - wrap children in a div
                let _ = write!(out, "<div class=\"element element--{}", html_escape(other));
                let class = self.get_class_string(element);
                if !class.is_empty() {
                    let _ = write!(out, " {}", html_escape(&class));
                }
                out.push_str("\">");
                self.render_children(element, out);
                out.push_str("</div>");
            }
        }
    }

    /// Render element children, sorted by weight.
    fn render_children(&self, element: &RenderElement, out: &mut String) {
        for child in element.ordered_children() {
            self.render_element(child, out);
        }
    }

    fn render_container(&self, element: &RenderElement, out: &mut String) {
        let tag = element.tag.as_deref().unwrap_or("div");
        self.open_tag(tag, element, out);
        out.push('>');
        self.render_children(element, out);
        let _ = write!(out, "</{tag}>");
    }

    fn render_markup(&self, element: &RenderElement, out: &mut String) {
        let tag = element.tag.as_deref().unwrap_or("span");
        self.open_tag(tag, element, out);

        if VOID_ELEMENTS.contains(&tag) {
            out.push_str(" />");
            return;
        }

        out.push('>');
        if let Some(value) = &element.value {
            out.push_str(&self.process_value(value, element.format.as_deref()));
        }
        self.render_children(element, out);
        let _ = write!(out, "</{tag}>");
    }

    fn open_tag(&self, tag: &str, element: &RenderElement, out: &mut String) {
        let _ = write!(out, "<{tag}");
        let class = self.get_class_string(element);
        if !class.is_empty() {
            let _ = write!(out, " class=\"{}\"", html_escape(&class));
        }
        out.push_str(&self.get_extra_attrs(element));
    }

    /// Process a value through the appropriate filter pipeline.
    fn process_value(&self, value: &str, format: Option<&str>) -> String {
        match format {
            Some(format_name) => FilterPipeline::for_format(format_name).process(value),
            None => html_escape(value),
        }
    }

    /// Convert a classes value (array or string) to a space-separated string.
    fn classes_to_string(&self, classes: &Value) -> String {
        match classes {
            Value::Array(arr) => arr
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            Value::String(s) => s.clone(),
            _ => String::new(),
        }
    }

    /// Get class string from element attributes.
    fn get_class_string(&self, element: &RenderElement) -> String {
        element
            .attributes
            .as_ref()
            .and_then(|attrs| attrs.get("class"))
            .map(|classes| self.classes_to_string(classes))
            .unwrap_or_default()
    }

    /// Get extra attributes (excluding class) as a string.
    fn get_extra_attrs(&self, element: &RenderElement) -> String {
        let Some(Value::Object(obj)) = &element.attributes else {
            return String::new();
        };

        obj.iter()
            .filter(|(k, _)| *k != "class")
            .map(|(k, v)| match v {
                Value::String(s) => format!(" {}=\"{}\"", k, html_escape(s)),
                Value::Bool(true) => format!(" {k}"),
                Value::Bool(false) | Value::Null => String::new(),
                other => format!(" {}=\"{}\"", k, html_escape(&other.to_string())),
            })
            .collect()
    }
}

impl Default for RenderTreeConsumer {
    fn default() -> Self {
        Self::new()
    }
}
