//! Deep snapshots of values for the evaluation cache.
//!
//! A snapshot shares nothing with the value it came from, so mutating a
//! result handed to a caller never leaks into later cache hits.
//!
//! Restoring a snapshot gives back an equal value, except that a `NaN`
//! number is restored as `NaN` and so never compares equal to itself.

use crate::node::{Element, Node};
use crate::smart_tags::SmartTags;
use crate::transformer::{Method, Mode, Transformer};
use crate::tree::{NodeId, TreeId};
use crate::value::{Record, Value};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SerializedValue {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Text(String),
    Element(SerializedElement),
    NodeList(Vec<SerializedValue>),
    Array(Vec<SerializedValue>),
    Record(Vec<(String, SerializedValue)>),
    Transformer(SerializedTransformer),
    Method(SerializedTransformer),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<SerializedValue>,
}

/// Smart tags are stored by name and looked up again on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedTransformer {
    pub name: String,
    pub mode: Mode,
    pub captured: Box<SerializedValue>,
    pub origin: TreeId,
    pub source: NodeId,
}

pub fn serialize(value: &Value) -> SerializedValue {
    match value {
        Value::Null => SerializedValue::Null,
        Value::Boolean(b) => SerializedValue::Boolean(*b),
        Value::Number(n) => SerializedValue::Number(*n),
        Value::String(s) => SerializedValue::String(s.clone()),
        Value::Text(s) => SerializedValue::Text(s.clone()),
        Value::Structural(el) => SerializedValue::Element(serialize_element(el)),
        Value::NodeFragment(items) => {
            SerializedValue::NodeList(items.iter().map(serialize_node).collect())
        }
        Value::Array(items) => SerializedValue::Array(items.iter().map(serialize).collect()),
        Value::Record(record) => SerializedValue::Record(
            record
                .iter()
                .map(|(k, v)| (k.clone(), serialize(v)))
                .collect(),
        ),
        Value::Transformer(t) => SerializedValue::Transformer(serialize_transformer(t)),
        Value::Method(m) => SerializedValue::Method(serialize_transformer(m.transformer())),
    }
}

fn serialize_node(node: &Node) -> SerializedValue {
    match node {
        Node::Text(t) => SerializedValue::Text(t.clone()),
        Node::Element(el) => SerializedValue::Element(serialize_element(el)),
    }
}

fn serialize_element(el: &Element) -> SerializedElement {
    SerializedElement {
        tag: el.tag.clone(),
        attributes: el
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        children: el.children.iter().map(serialize_node).collect(),
    }
}

fn serialize_transformer(t: &Transformer) -> SerializedTransformer {
    SerializedTransformer {
        name: t.name.clone(),
        mode: t.mode,
        captured: Box::new(serialize(&t.captured)),
        origin: t.origin,
        source: t.source,
    }
}

/// Restores a snapshot. `None` when the snapshot names a smart tag that is
/// no longer registered or holds a malformed node list.
pub fn deserialize(snapshot: &SerializedValue, tags: &SmartTags) -> Option<Value> {
    Some(match snapshot {
        SerializedValue::Null => Value::Null,
        SerializedValue::Boolean(b) => Value::Boolean(*b),
        SerializedValue::Number(n) => Value::Number(*n),
        SerializedValue::String(s) => Value::String(s.clone()),
        SerializedValue::Text(s) => Value::Text(s.clone()),
        SerializedValue::Element(el) => Value::Structural(deserialize_element(el)?),
        SerializedValue::NodeList(items) => Value::NodeFragment(
            items
                .iter()
                .map(deserialize_node)
                .collect::<Option<Vec<_>>>()?,
        ),
        SerializedValue::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| deserialize(item, tags))
                .collect::<Option<Vec<_>>>()?,
        ),
        SerializedValue::Record(entries) => {
            let mut record = Record::with_capacity(entries.len());
            for (k, v) in entries {
                record.insert(k.clone(), deserialize(v, tags)?);
            }
            Value::Record(record)
        }
        SerializedValue::Transformer(t) => Value::Transformer(deserialize_transformer(t, tags)?),
        SerializedValue::Method(t) => Value::Method(Method::new(deserialize_transformer(t, tags)?)),
    })
}

fn deserialize_node(snapshot: &SerializedValue) -> Option<Node> {
    match snapshot {
        SerializedValue::Text(t) => Some(Node::Text(t.clone())),
        SerializedValue::Element(el) => Some(Node::Element(deserialize_element(el)?)),
        _ => None,
    }
}

fn deserialize_element(snapshot: &SerializedElement) -> Option<Element> {
    Some(Element {
        tag: snapshot.tag.clone(),
        attributes: snapshot.attributes.iter().cloned().collect(),
        children: snapshot
            .children
            .iter()
            .map(deserialize_node)
            .collect::<Option<Vec<_>>>()?,
    })
}

fn deserialize_transformer(
    snapshot: &SerializedTransformer,
    tags: &SmartTags,
) -> Option<Rc<Transformer>> {
    let tag = tags.get(&snapshot.name)?;
    let captured = deserialize(&snapshot.captured, tags)?;
    Some(Rc::new(Transformer::new(
        snapshot.name.clone(),
        tag,
        snapshot.mode,
        captured,
        snapshot.origin,
        snapshot.source,
    )))
}
