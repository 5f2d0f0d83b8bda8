//! Render element builder API.
//!
//! Block components return structured render elements, never raw HTML.
//! The kernel filters text values by format and turns the tree into markup.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A render element in the JSON render tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderElement {
    #[serde(rename = "#type")]
    pub element_type: String,
    #[serde(rename = "#weight", skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
    #[serde(rename = "#tag", skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(rename = "#value", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "#format", skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "#attributes", skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,
    #[serde(flatten)]
    pub children: BTreeMap<String, RenderElement>,
}

impl RenderElement {
    pub fn set_child(&mut self, key: &str, element: RenderElement) {
        self.children.insert(key.into(), element);
    }

    /// Look up a string attribute.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .as_ref()
            .and_then(|attrs| attrs.get(key))
            .and_then(|v| v.as_str())
    }

    /// Whether the element's class list contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attributes
            .as_ref()
            .and_then(|attrs| attrs.get("class"))
            .and_then(|v| v.as_array())
            .is_some_and(|classes| classes.iter().any(|c| c.as_str() == Some(class)))
    }

    /// Children sorted by weight, then by key.
    pub fn ordered_children(&self) -> Vec<&RenderElement> {
        let mut children: Vec<_> = self.children.iter().collect();
        children.sort_by_key(|(_, child)| child.weight.unwrap_or(0));
        children.into_iter().map(|(_, child)| child).collect()
    }
}

/// Builder for constructing render elements.
pub struct ElementBuilder {
    element_type: String,
    weight: Option<i32>,
    tag: Option<String>,
    value: Option<String>,
    format: Option<String>,
    classes: Vec<String>,
    attrs: serde_json::Map<String, Value>,
    children: BTreeMap<String, RenderElement>,
}

impl ElementBuilder {
    fn new(element_type: &str) -> Self {
        Self {
            element_type: element_type.into(),
            weight: None,
            tag: None,
            value: None,
            format: None,
            classes: Vec::new(),
            attrs: serde_json::Map::new(),
            children: BTreeMap::new(),
        }
    }

    pub fn weight(mut self, w: i32) -> Self {
        self.weight = Some(w);
        self
    }

    /// Override the HTML tag (containers default to `div`).
    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.attrs.insert(key.into(), Value::String(value.into()));
        self
    }

    /// Boolean attribute; rendered bare when true, omitted when false.
    pub fn flag(mut self, key: &str, on: bool) -> Self {
        self.attrs.insert(key.into(), Value::Bool(on));
        self
    }

    pub fn child(mut self, key: &str, element: RenderElement) -> Self {
        self.children.insert(key.into(), element);
        self
    }

    pub fn build(self) -> RenderElement {
        let attributes = if self.classes.is_empty() && self.attrs.is_empty() {
            None
        } else {
            let mut map = self.attrs;
            if !self.classes.is_empty() {
                map.insert(
                    "class".into(),
                    Value::Array(self.classes.into_iter().map(Value::String).collect()),
                );
            }
            Some(Value::Object(map))
        };

        RenderElement {
            element_type: self.element_type,
            weight: self.weight,
            tag: self.tag,
            value: self.value,
            format: self.format,
            attributes,
            children: self.children,
        }
    }
}

/// Create a container element (groups children).
pub fn container() -> ElementBuilder {
    ElementBuilder::new("container")
}

/// Create a markup element with an HTML tag and plain text value.
pub fn markup(tag: &str, value: &str) -> ElementBuilder {
    let mut b = ElementBuilder::new("markup");
    b.tag = Some(tag.into());
    b.value = Some(value.into());
    b
}

/// Create a markup element whose value is filtered by a text format
/// (e.g. "filtered_html").
pub fn filtered_markup(tag: &str, value: &str, format: &str) -> ElementBuilder {
    let mut b = markup(tag, value);
    b.format = Some(format.into());
    b
}

/// Create a link element.
pub fn link(href: &str, text: &str) -> ElementBuilder {
    let mut b = ElementBuilder::new("markup");
    b.tag = Some("a".into());
    b.value = Some(text.into());
    b.attrs.insert("href".into(), Value::String(href.into()));
    b
}

/// Create a settings form input.
pub fn input(name: &str, input_type: &str, value: &str) -> ElementBuilder {
    let mut b = ElementBuilder::new("markup");
    b.tag = Some("input".into());
    b.attrs.insert("name".into(), Value::String(name.into()));
    b.attrs
        .insert("type".into(), Value::String(input_type.into()));
    b.attrs.insert("value".into(), Value::String(value.into()));
    b
}

/// Create a settings select with one `<option>` per choice.
pub fn select(name: &str, choices: &[(&str, &str)], selected: &str) -> ElementBuilder {
    let mut b = container().tag("select").attr("name", name);
    for (i, (value, label)) in choices.iter().enumerate() {
        let option = markup("option", label)
            .attr("value", value)
            .flag("selected", *value == selected)
            .weight(i as i32)
            .build();
        b = b.child(&format!("option_{i}"), option);
    }
    b
}
