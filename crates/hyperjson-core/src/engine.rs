use crate::config::Options;
use crate::error::EvalError;
use crate::node::Node;
use crate::smart_tags::{SmartTag, SmartTags};
use crate::tree::Tree;
use crate::value::Value;
use serde_json::Value as Json;

/// Engine-scoped evaluation surface for HyperJSON documents.
///
/// Smart-tag registration is instance-local (no global registry), so
/// different hosts can run different tag sets side by side.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    tags: SmartTags,
    options: Options,
}

impl Engine {
    /// Create a new engine with the built-in smart tags and default options.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            tags: SmartTags::new(),
            options,
        }
    }

    /// Register or replace a smart tag.
    pub fn register(&mut self, name: impl Into<String>, tag: SmartTag) -> Option<SmartTag> {
        self.tags.register(name, tag)
    }

    /// Parse a JSON-shaped document into a node.
    pub fn check(&self, input: &Json) -> Result<Node, serde_json::Error> {
        Node::deserialize_from(input)
    }

    /// Build an evaluation tree; keep it around to reuse its cache.
    pub fn tree(&self, root: &Node) -> Tree {
        Tree::build(root, self.tags.clone(), self.options.clone())
    }

    /// Run one-shot.
    pub fn evaluate(&self, root: &Node) -> Result<Value, EvalError> {
        self.tree(root).evaluate()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Access the smart-tag registry (read-only).
    pub fn tags(&self) -> &SmartTags {
        &self.tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn evaluates_json_documents() {
        let engine = Engine::new();
        let root = engine
            .check(&json!({"tag": "record", "children": [
                {"tag": "string", "attributes": {"_key": "greeting"}, "children": ["hi"]},
                {"tag": "array", "attributes": {"_key": "items"}, "children": [
                    {"tag": "number", "children": ["1"]},
                    {"tag": "boolean", "children": ["true"]}
                ]}
            ]}))
            .expect("document");
        let out = engine.evaluate(&root).expect("evaluate");
        assert_eq!(out.to_json(), json!({"greeting": "hi", "items": [1, true]}));
    }

    #[test]
    fn registered_tags_reach_trees() {
        let mut engine = Engine::new();
        engine.register(
            "shout",
            SmartTag::coalescion(
                crate::smart_tags::main_textual,
                crate::smart_tags::args_none,
                |main, _, _, _| Ok(Value::String(main.as_str().unwrap_or_default().to_uppercase())),
            ),
        );
        let root = engine
            .check(&json!({"tag": "string", "children": [
                {"tag": "string", "children": ["hey"]},
                {"tag": "shout"}
            ]}))
            .expect("document");
        assert_eq!(engine.evaluate(&root), Ok(Value::string("HEY")));
        assert!(engine.tags().contains("shout"));
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(Engine::new().check(&json!({"children": []})).is_err());
    }
}
