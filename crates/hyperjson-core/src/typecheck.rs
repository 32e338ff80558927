//! Type-check combinators.
//!
//! Every smart tag validates its main value and arguments exclusively through
//! these functions, so mismatch reports share one format: an `expected`
//! description built from [`Kind`]s and the `found` kind name of the value.

use crate::value::Value;
use std::fmt;

/// Expected kind of a value. `Array`/`Record` list the kinds accepted for
/// their elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Any,
    Null,
    Boolean,
    Number,
    String,
    Text,
    Element,
    NodeList,
    Array(&'static [Kind]),
    Record(&'static [Kind]),
    Transformer,
    Method,
}

impl Kind {
    pub const ANY_ARRAY: Kind = Kind::Array(&[Kind::Any]);
    pub const ANY_RECORD: Kind = Kind::Record(&[Kind::Any]);
}

/// `string` or `text`.
pub const TEXTUAL: &[Kind] = &[Kind::String, Kind::Text];

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Any => f.write_str("any"),
            Kind::Null => f.write_str("null"),
            Kind::Boolean => f.write_str("boolean"),
            Kind::Number => f.write_str("number"),
            Kind::String => f.write_str("string"),
            Kind::Text => f.write_str("text"),
            Kind::Element => f.write_str("element"),
            Kind::NodeList => f.write_str("nodelist"),
            Kind::Transformer => f.write_str("transformer"),
            Kind::Method => f.write_str("method"),
            Kind::Array(items) => write_container(f, "array", items),
            Kind::Record(items) => write_container(f, "record", items),
        }
    }
}

fn write_container(f: &mut fmt::Formatter<'_>, name: &str, items: &[Kind]) -> fmt::Result {
    if items == [Kind::Any] {
        return f.write_str(name);
    }
    write!(f, "{name}<{}>", describe(items))
}

/// `number|string` style description of several accepted kinds.
pub fn describe(kinds: &[Kind]) -> String {
    kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("|")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    pub expected: String,
    pub found: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgsMismatch {
    pub position: usize,
    pub expected: String,
    pub found: String,
}

pub fn single_type_check(value: &Value, kind: Kind) -> bool {
    match (kind, value) {
        (Kind::Any, _) => true,
        (Kind::Null, Value::Null) => true,
        (Kind::Boolean, Value::Boolean(_)) => true,
        (Kind::Number, Value::Number(_)) => true,
        (Kind::String, Value::String(_)) => true,
        (Kind::Text, Value::Text(_)) => true,
        (Kind::Element, Value::Structural(_)) => true,
        (Kind::NodeList, Value::NodeFragment(_)) => true,
        (Kind::Transformer, Value::Transformer(_)) => true,
        (Kind::Method, Value::Method(_)) => true,
        (Kind::Array(items), Value::Array(values)) => values
            .iter()
            .all(|v| items.iter().any(|k| single_type_check(v, *k))),
        (Kind::Record(items), Value::Record(record)) => record
            .values()
            .all(|v| items.iter().any(|k| single_type_check(v, *k))),
        _ => false,
    }
}

pub fn type_check(value: Value, kinds: &[Kind]) -> Result<Value, TypeMismatch> {
    if kinds.iter().any(|k| single_type_check(&value, *k)) {
        return Ok(value);
    }
    Err(TypeMismatch {
        expected: describe(kinds),
        found: value.kind_name().to_string(),
    })
}

/// Positional check: `values[i]` must match one of `kinds[i]`, and both lists
/// must have the same length.
pub fn type_check_many(values: Vec<Value>, kinds: &[&[Kind]]) -> Result<Vec<Value>, ArgsMismatch> {
    if values.len() != kinds.len() {
        return Err(arity_mismatch(values.len(), kinds.len().to_string()));
    }
    check_positions(values, |i| kinds[i])
}

/// Like [`type_check_many`], but trailing positions from `min` on are optional.
pub fn type_check_between(
    values: Vec<Value>,
    min: usize,
    kinds: &[&[Kind]],
) -> Result<Vec<Value>, ArgsMismatch> {
    if values.len() < min || values.len() > kinds.len() {
        let expected = if min == kinds.len() {
            min.to_string()
        } else {
            format!("{min} to {}", kinds.len())
        };
        return Err(arity_mismatch(values.len(), expected));
    }
    check_positions(values, |i| kinds[i])
}

/// Variadic check: at least `min` values, each matching one of `kinds`.
pub fn type_check_rest(
    values: Vec<Value>,
    min: usize,
    kinds: &[Kind],
) -> Result<Vec<Value>, ArgsMismatch> {
    if values.len() < min {
        return Err(arity_mismatch(values.len(), format!("at least {min}")));
    }
    check_positions(values, |_| kinds)
}

fn check_positions<'k>(
    values: Vec<Value>,
    kinds_at: impl Fn(usize) -> &'k [Kind],
) -> Result<Vec<Value>, ArgsMismatch> {
    for (position, value) in values.iter().enumerate() {
        let kinds = kinds_at(position);
        if !kinds.iter().any(|k| single_type_check(value, *k)) {
            return Err(ArgsMismatch {
                position,
                expected: describe(kinds),
                found: value.kind_name().to_string(),
            });
        }
    }
    Ok(values)
}

fn arity_mismatch(found: usize, expected: String) -> ArgsMismatch {
    ArgsMismatch {
        position: found,
        expected: format!("{expected} arguments"),
        found: format!("{found} arguments"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_checks_follow_kind() {
        assert!(single_type_check(&Value::Number(1.0), Kind::Number));
        assert!(!single_type_check(&Value::Text("1".into()), Kind::String));
        assert!(single_type_check(&Value::Null, Kind::Any));
    }

    #[test]
    fn containers_check_elements_recursively() {
        let numbers = Value::from(json!([1, 2, 3]));
        let mixed = Value::from(json!([1, "a"]));
        const NUMBERS: Kind = Kind::Array(&[Kind::Number]);
        assert!(single_type_check(&numbers, NUMBERS));
        assert!(!single_type_check(&mixed, NUMBERS));
        assert!(single_type_check(&mixed, Kind::ANY_ARRAY));

        const STRINGS: Kind = Kind::Record(&[Kind::String]);
        assert!(single_type_check(&Value::from(json!({"a": "x"})), STRINGS));
        assert!(!single_type_check(&Value::from(json!({"a": 1})), STRINGS));
    }

    #[test]
    fn type_check_reports_expected_and_found() {
        let err = type_check(Value::Boolean(true), &[Kind::Number, Kind::String])
            .expect_err("mismatch");
        assert_eq!(err.expected, "number|string");
        assert_eq!(err.found, "boolean");
        assert_eq!(
            Kind::Array(&[Kind::Number, Kind::Text]).to_string(),
            "array<number|text>"
        );
    }

    #[test]
    fn type_check_many_reports_first_failing_position() {
        let values = vec![Value::Number(1.0), Value::Null, Value::Boolean(false)];
        let err = type_check_many(values, &[&[Kind::Number], &[Kind::Number], &[Kind::Null]])
            .expect_err("mismatch");
        assert_eq!(err.position, 1);
        assert_eq!(err.expected, "number");
        assert_eq!(err.found, "null");
    }

    #[test]
    fn arity_is_checked() {
        let err = type_check_many(vec![Value::Null], &[&[Kind::Any], &[Kind::Any]])
            .expect_err("arity");
        assert_eq!(err.expected, "2 arguments");
        assert_eq!(err.found, "1 arguments");

        assert!(type_check_between(vec![], 0, &[TEXTUAL]).is_ok());
        assert!(type_check_between(vec![Value::Null, Value::Null], 0, &[&[Kind::Any]]).is_err());
        assert!(type_check_rest(vec![], 1, &[Kind::Any]).is_err());
    }
}
