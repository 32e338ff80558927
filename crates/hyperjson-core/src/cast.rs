//! Pure coercions between value kinds.
//!
//! Boolean coercion has exactly one rule ([`to_boolean`]); the merge engine,
//! the `boolean` wrap, logic tags and `toboolean` all go through it.

use crate::node::Node;
use crate::value::{Record, Value, format_number};

#[inline]
fn falsy_text(text: &str) -> bool {
    let t = text.trim();
    t.is_empty() || t.eq_ignore_ascii_case("false") || t == "0"
}

pub fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) | Value::Text(s) => !falsy_text(s),
        Value::Structural(_) => true,
        Value::NodeFragment(items) => {
            items.iter().any(|n| matches!(n, Node::Element(_)))
                || !falsy_text(&fragment_text(items))
        }
        Value::Array(a) => !a.is_empty(),
        Value::Record(r) => !r.is_empty(),
        Value::Transformer(_) | Value::Method(_) => true,
    }
}

fn parse_number(text: &str) -> f64 {
    let t = text.trim();
    if t.is_empty() {
        return 0.0;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::String(s) | Value::Text(s) => parse_number(s),
        Value::Structural(el) => parse_number(&el.text_content()),
        Value::NodeFragment(items) => parse_number(&fragment_text(items)),
        Value::Array(_) | Value::Record(_) | Value::Transformer(_) | Value::Method(_) => f64::NAN,
    }
}

pub fn to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) | Value::Text(s) => s.clone(),
        Value::Structural(el) => el.to_markup(),
        Value::NodeFragment(items) => items
            .iter()
            .map(|n| match n {
                Node::Text(t) => t.clone(),
                Node::Element(el) => el.to_markup(),
            })
            .collect(),
        Value::Array(_) | Value::Record(_) => value.to_json().to_string(),
        Value::Transformer(t) => format!("[transformer {}]", t.name),
        Value::Method(m) => format!("[method {}]", m.name()),
    }
}

pub fn to_text(value: &Value) -> Value {
    Value::Text(to_string(value))
}

/// Concatenated text content of fragment items.
pub fn fragment_text(items: &[Node]) -> String {
    items.iter().map(Node::text_content).collect()
}

/// Items a value contributes to a `NodeFragment`. `Null` and empty strings
/// contribute nothing; arrays contribute their flattened items.
pub fn to_fragment(value: Value) -> Vec<Node> {
    match value {
        Value::Null => Vec::new(),
        Value::Structural(el) => vec![Node::Element(el)],
        Value::Text(t) => vec![Node::Text(t)],
        Value::NodeFragment(items) => items,
        Value::Array(items) => items.into_iter().flat_map(to_fragment).collect(),
        Value::String(s) if s.is_empty() => Vec::new(),
        other => vec![Node::Text(to_string(&other))],
    }
}

pub fn to_array(value: Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        Value::NodeFragment(items) => items.into_iter().map(Value::from_node).collect(),
        other => vec![other],
    }
}

/// Records pass through, arrays become index-keyed records, anything else
/// yields an empty record.
pub fn to_record(value: Value) -> Record {
    match value {
        Value::Record(r) => r,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Record::new(),
    }
}

pub fn to_null(_value: Value) -> Value {
    Value::Null
}

/// Reads a value out of its textual form: booleans, `null`, numbers and JSON
/// arrays/objects are recognized, anything else stays a string.
pub fn guess(text: &str) -> Value {
    let t = text.trim();
    match t {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        "null" => return Value::Null,
        _ => {}
    }
    let numeric_shape = t.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
        && t.ends_with(|c: char| c.is_ascii_digit() || c == '.');
    if numeric_shape {
        if let Ok(n) = t.parse::<f64>() {
            return Value::Number(n);
        }
    }
    if t.starts_with('[') || t.starts_with('{') {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(t) {
            return Value::from(json);
        }
    }
    Value::String(text.to_string())
}

/// Equality used by `equals`: textual kinds compare by content, numbers by
/// value, everything else structurally.
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(x) | Value::Text(x), Value::String(y) | Value::Text(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| loosely_equal(l, r))
        }
        (Value::Record(x), Value::Record(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| loosely_equal(v, other)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Element;
    use serde_json::json;

    #[test]
    fn boolean_rule() {
        assert!(!to_boolean(&Value::Null));
        assert!(!to_boolean(&Value::Number(0.0)));
        assert!(!to_boolean(&Value::Number(f64::NAN)));
        assert!(to_boolean(&Value::Number(-2.0)));
        assert!(!to_boolean(&Value::text(" FALSE ")));
        assert!(!to_boolean(&Value::string("0")));
        assert!(!to_boolean(&Value::string("")));
        assert!(to_boolean(&Value::string("no")));
        assert!(!to_boolean(&Value::Array(vec![])));
        assert!(to_boolean(&Value::NodeFragment(vec![Node::text("true")])));
        assert!(to_boolean(&Value::NodeFragment(vec![Node::Element(Element::new("img"))])));
        assert!(!to_boolean(&Value::NodeFragment(vec![])));
    }

    #[test]
    fn number_parsing() {
        assert_eq!(to_number(&Value::text(" 42 ")), 42.0);
        assert_eq!(to_number(&Value::text("-3.5")), -3.5);
        assert_eq!(to_number(&Value::Boolean(true)), 1.0);
        assert!(to_number(&Value::text("abc")).is_nan());
        assert_eq!(to_number(&Value::NodeFragment(vec![Node::text("7")])), 7.0);
    }

    #[test]
    fn stringification() {
        assert_eq!(to_string(&Value::Null), "");
        assert_eq!(to_string(&Value::Number(3.0)), "3");
        assert_eq!(to_string(&Value::from(json!([1, "a"]))), "[1,\"a\"]");
        let frag = Value::NodeFragment(vec![
            Node::text("a "),
            Node::Element(Element::new("b").with_text("c")),
        ]);
        assert_eq!(to_string(&frag), "a <b>c</b>");
    }

    #[test]
    fn fragments_and_arrays() {
        assert!(to_fragment(Value::Null).is_empty());
        assert_eq!(to_fragment(Value::Number(1.0)), vec![Node::text("1")]);
        assert_eq!(
            to_fragment(Value::from(json!(["a", "b"]))),
            vec![Node::text("a"), Node::text("b")]
        );
        assert_eq!(
            to_array(Value::NodeFragment(vec![Node::text("x")])),
            vec![Value::text("x")]
        );
        assert_eq!(to_array(Value::Number(1.0)), vec![Value::Number(1.0)]);
    }

    #[test]
    fn guessing() {
        assert_eq!(guess("true"), Value::Boolean(true));
        assert_eq!(guess(" 12 "), Value::Number(12.0));
        assert_eq!(guess("null"), Value::Null);
        assert_eq!(guess("[1,2]"), Value::from(json!([1, 2])));
        assert_eq!(guess("hello"), Value::string("hello"));
    }

    #[test]
    fn loose_equality() {
        assert!(loosely_equal(&Value::text("a"), &Value::string("a")));
        assert!(!loosely_equal(&Value::string("1"), &Value::Number(1.0)));
        assert!(loosely_equal(
            &Value::from(json!({"a": [1]})),
            &Value::from(json!({"a": [1]}))
        ));
    }
}
