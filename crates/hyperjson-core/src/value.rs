use crate::node::{Element, Node};
use crate::transformer::{Method, Transformer};
use indexmap::IndexMap;
use serde_json::{Map, Number, Value as Json};
use std::fmt;
use std::rc::Rc;

pub type Record = IndexMap<String, Value>;

/// Closed value union produced by evaluation.
///
/// `Text` and `String` carry the same payload; `Text` marks content that came
/// from a leaf text node and survives string operations as such.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Text(String),
    Structural(Element),
    NodeFragment(Vec<Node>),
    Array(Vec<Value>),
    Record(Record),
    Transformer(Rc<Transformer>),
    Method(Method),
}

/// Kind tag of a [`Value`], used for type-check reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    String,
    Text,
    Element,
    NodeList,
    Array,
    Record,
    Transformer,
    Method,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Text => "text",
            ValueKind::Element => "element",
            ValueKind::NodeList => "nodelist",
            ValueKind::Array => "array",
            ValueKind::Record => "record",
            ValueKind::Transformer => "transformer",
            ValueKind::Method => "method",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Text(_) => ValueKind::Text,
            Value::Structural(_) => ValueKind::Element,
            Value::NodeFragment(_) => ValueKind::NodeList,
            Value::Array(_) => ValueKind::Array,
            Value::Record(_) => ValueKind::Record,
            Value::Transformer(_) => ValueKind::Transformer,
            Value::Method(_) => ValueKind::Method,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Values that can live inside a `NodeFragment`.
    #[inline]
    pub fn is_node_like(&self) -> bool {
        matches!(
            self,
            Value::Structural(_) | Value::Text(_) | Value::NodeFragment(_)
        )
    }

    #[inline]
    pub fn is_textual(&self) -> bool {
        matches!(self, Value::String(_) | Value::Text(_))
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Converts a fragment item back into a standalone value.
    pub fn from_node(node: Node) -> Self {
        match node {
            Node::Text(t) => Value::Text(t),
            Node::Element(el) => Value::Structural(el),
        }
    }

    /// Host-facing JSON rendering.
    ///
    /// Elements and fragments render as markup strings, transformers and
    /// methods as a `[transformer name]` marker, non-finite numbers as `null`.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Boolean(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) | Value::Text(s) => Json::String(s.clone()),
            Value::Structural(el) => Json::String(el.to_markup()),
            Value::NodeFragment(items) => {
                Json::String(items.iter().map(Node::to_markup).collect())
            }
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Record(record) => {
                let map: Map<String, Json> = record
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                Json::Object(map)
            }
            Value::Transformer(t) => Json::String(format!("[transformer {}]", t.name)),
            Value::Method(m) => Json::String(format!("[method {}]", m.name())),
        }
    }
}

fn number_to_json(n: f64) -> Json {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Json::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

impl From<Json> for Value {
    fn from(v: Json) -> Self {
        match v {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Boolean(b),
            Json::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            Json::String(s) => Value::String(s),
            Json::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            Json::Object(obj) => Value::Record(
                obj.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Element> for Value {
    fn from(value: Element) -> Self {
        Value::Structural(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_rendering() {
        let value = Value::from(json!({"a": [1, 2.5, "x"], "b": null, "c": true}));
        assert_eq!(value.to_json(), json!({"a": [1, 2.5, "x"], "b": null, "c": true}));
    }

    #[test]
    fn elements_render_as_markup() {
        let el = Element::new("b").with_text("bold");
        assert_eq!(Value::Structural(el).to_json(), json!("<b>bold</b>"));
        assert_eq!(Value::Number(f64::NAN).to_json(), json!(null));
    }

    #[test]
    fn record_order_is_preserved() {
        let value = Value::from(json!({"z": 1, "a": 2}));
        let keys: Vec<_> = value.as_record().expect("record").keys().cloned().collect();
        assert_eq!(keys, vec!["z".to_string(), "a".to_string()]);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-0.5), "-0.5");
        assert_eq!(format_number(f64::NAN), "NaN");
    }
}
