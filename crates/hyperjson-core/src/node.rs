//! Input document model and the document provider capability.
//!
//! The engine never parses markup. Hosts hand it an already-built [`Node`]
//! tree, either constructed in code or deserialized from the JSON shape below:
//!
//! ```json
//! {"tag": "record", "attributes": {"class": "a"}, "children": ["text", {"tag": "b"}]}
//! ```
//!
//! Strings are text leaves, objects are elements; `attributes` and `children`
//! may be omitted.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub type Attributes = IndexMap<String, String>;

/// One node of the input document, and the leaf/element items of a
/// `NodeFragment` value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Text(String),
    Element(Element),
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    /// Reads a node from its JSON shape.
    pub fn deserialize_from(input: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Node::deserialize(input)
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn is_blank_text(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Text(t) => t.clone(),
            Node::Element(el) => el.text_content(),
        }
    }

    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        match self {
            Node::Text(t) => escape_into(out, t, false),
            Node::Element(el) => el.write_markup(out),
        }
    }
}

impl From<Element> for Node {
    fn from(value: Element) -> Self {
        Node::Element(value)
    }
}

/// Attribute-bearing structural node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_text(self, content: impl Into<String>) -> Self {
        self.with_child(Node::Text(content.into()))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attribute("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }

    /// Replaces the `class` attribute; an empty list removes it.
    pub fn set_classes(&mut self, classes: &[String]) {
        if classes.is_empty() {
            self.attributes.shift_remove("class");
        } else {
            self.attributes.insert("class".to_string(), classes.join(" "));
        }
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(Node::text_content).collect()
    }

    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_into(out, value, true);
            out.push('"');
        }
        out.push('>');
        for child in &self.children {
            child.write_markup(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

fn escape_into(out: &mut String, raw: &str, attribute: bool) {
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// Creates and clones document nodes on behalf of the engine.
///
/// Elements produced by evaluation (structural wraps, the `element` and
/// `clone` smart tags) all go through the tree's provider, so hosts can
/// normalize tags or attach bookkeeping without touching the engine.
pub trait DocumentProvider {
    fn create_text(&self, content: &str) -> Node {
        Node::Text(content.to_string())
    }

    fn create_element(&self, tag: &str, attributes: &Attributes) -> Element {
        Element {
            tag: tag.to_string(),
            attributes: attributes.clone(),
            children: Vec::new(),
        }
    }

    fn clone_node(&self, node: &Node) -> Node {
        node.clone()
    }
}

/// Plain in-memory provider used by default.
#[derive(Debug, Default, Clone, Copy)]
pub struct OwnedDocument;

impl DocumentProvider for OwnedDocument {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_json_shape() {
        let node: Node = serde_json::from_value(json!({
            "tag": "record",
            "attributes": {"class": "a b"},
            "children": ["hello", {"tag": "string"}]
        }))
        .expect("node");
        let Node::Element(el) = node else {
            panic!("expected element");
        };
        assert_eq!(el.tag, "record");
        assert_eq!(el.classes(), vec!["a", "b"]);
        assert_eq!(el.children.len(), 2);
        assert_eq!(el.children[0], Node::text("hello"));
        assert_eq!(el.children[1], Node::Element(Element::new("string")));
    }

    #[test]
    fn markup_escapes_text_and_attributes() {
        let el = Element::new("p")
            .with_attribute("title", "say \"hi\"")
            .with_text("a < b & c");
        assert_eq!(
            el.to_markup(),
            "<p title=\"say &quot;hi&quot;\">a &lt; b &amp; c</p>"
        );
    }

    #[test]
    fn text_content_is_recursive() {
        let el = Element::new("div")
            .with_text("a")
            .with_child(Element::new("b").with_text("c"));
        assert_eq!(el.text_content(), "ac");
    }
}
