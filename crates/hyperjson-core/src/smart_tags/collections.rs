use super::same_textual;
use crate::cast;
use crate::error::EvalError;
use crate::transformer::Call;
use crate::tree::Context;
use crate::typecheck::{
    ArgsMismatch, Kind, TypeMismatch, type_check, type_check_many, type_check_rest,
};
use crate::value::{Record, Value};
use std::cmp::Ordering;

const RECORDS: Kind = Kind::Array(&[Kind::ANY_RECORD]);

pub(super) fn main_indexable(value: Value) -> Result<Value, TypeMismatch> {
    type_check(
        value,
        &[Kind::ANY_ARRAY, Kind::String, Kind::Text, Kind::NodeList],
    )
}

pub(super) fn main_sized(value: Value) -> Result<Value, TypeMismatch> {
    type_check(
        value,
        &[
            Kind::ANY_ARRAY,
            Kind::String,
            Kind::Text,
            Kind::NodeList,
            Kind::ANY_RECORD,
        ],
    )
}

pub(super) fn main_records(value: Value) -> Result<Value, TypeMismatch> {
    type_check(value, &[RECORDS])
}

pub(super) fn args_arrays(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_rest(args, 1, &[Kind::ANY_ARRAY])
}

pub(super) fn args_index(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_many(args, &[&[Kind::Number]])
}

fn into_items(main: Value) -> Vec<Value> {
    match main {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

pub(super) fn push(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let mut items = into_items(main);
    items.extend(args);
    Ok(Value::Array(items))
}

pub(super) fn push_each(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let mut items = into_items(main);
    for arg in args {
        items.extend(into_items(arg));
    }
    Ok(Value::Array(items))
}

/// Invokes the method argument on every item.
pub(super) fn map(main: Value, args: Vec<Value>, ctx: &mut Context, call: &Call) -> Result<Value, EvalError> {
    let Some(Value::Method(method)) = args.into_iter().next() else {
        return Err(call.fail("expects a method argument"));
    };
    let items = into_items(main);
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match method.invoke(item, ctx) {
            Ok(value) => out.push(value),
            Err(err) if err.passes_through() => return Err(err),
            Err(err) => return Err(call.fail(format!("item {i}: {err}"))),
        }
    }
    Ok(Value::Array(out))
}

fn resolve_index(raw: f64, len: usize) -> Option<usize> {
    if !raw.is_finite() || raw.fract() != 0.0 {
        return None;
    }
    let index = raw as i64;
    let index = if index < 0 { len as i64 + index } else { index };
    (0..len as i64).contains(&index).then_some(index as usize)
}

pub(super) fn at(main: Value, args: Vec<Value>, _: &mut Context, call: &Call) -> Result<Value, EvalError> {
    let raw = args.first().and_then(Value::as_f64).unwrap_or(f64::NAN);
    let out_of_range = || call.fail(format!("index {} is out of range", cast::to_string(&Value::Number(raw))));
    match main {
        Value::Array(mut items) => {
            let i = resolve_index(raw, items.len()).ok_or_else(out_of_range)?;
            Ok(items.swap_remove(i))
        }
        Value::NodeFragment(mut items) => {
            let i = resolve_index(raw, items.len()).ok_or_else(out_of_range)?;
            Ok(Value::from_node(items.swap_remove(i)))
        }
        like @ (Value::String(_) | Value::Text(_)) => {
            let chars: Vec<char> = like.as_str().unwrap_or_default().chars().collect();
            let i = resolve_index(raw, chars.len()).ok_or_else(out_of_range)?;
            Ok(same_textual(&like, chars[i].to_string()))
        }
        _ => Err(out_of_range()),
    }
}

fn compare_entries(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Boolean(x)), Some(Value::Boolean(y))) => x.cmp(y),
        (Some(x), Some(y)) => cast::to_string(x).cmp(&cast::to_string(y)),
    }
}

/// Stable sort of records on one or more keys, missing keys last.
pub(super) fn sort_on(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let keys: Vec<&str> = args.iter().filter_map(Value::as_str).collect();
    let mut items = into_items(main);
    items.sort_by(|a, b| {
        keys.iter()
            .map(|k| {
                compare_entries(
                    a.as_record().and_then(|r| r.get(*k)),
                    b.as_record().and_then(|r| r.get(*k)),
                )
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    Ok(Value::Array(items))
}

pub(super) fn pick_random(main: Value, _: Vec<Value>, _: &mut Context, call: &Call) -> Result<Value, EvalError> {
    let mut items = into_items(main);
    if items.is_empty() {
        return Err(call.fail("cannot pick from an empty array"));
    }
    let seed = getrandom::u64().map_err(|err| call.fail(format!("random source failed: {err}")))?;
    let index = (seed % items.len() as u64) as usize;
    Ok(items.swap_remove(index))
}

pub(super) fn record_to_array(main: Value, _: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let Value::Record(record) = main else {
        return Ok(Value::Array(Vec::new()));
    };
    let entries = record
        .into_iter()
        .map(|(key, value)| {
            let mut entry = Record::with_capacity(2);
            entry.insert("key".to_string(), Value::String(key));
            entry.insert("value".to_string(), value);
            Value::Record(entry)
        })
        .collect();
    Ok(Value::Array(entries))
}

pub(super) fn length(main: Value, _: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let len = match &main {
        Value::Array(items) => items.len(),
        Value::NodeFragment(items) => items.len(),
        Value::String(s) | Value::Text(s) => s.chars().count(),
        Value::Record(record) => record.len(),
        _ => 0,
    };
    Ok(Value::Number(len as f64))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::error::EvalError;
    use crate::node::Node;
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn push_and_push_each() {
        assert_eq!(
            coalesce("push", Value::from(json!([1])), vec![Value::Number(2.0), Value::from(json!([3]))]),
            Ok(Value::from(json!([1, 2, [3]])))
        );
        assert_eq!(
            coalesce("pusheach", Value::from(json!([1])), vec![Value::from(json!([2, 3])), Value::from(json!([]))]),
            Ok(Value::from(json!([1, 2, 3])))
        );
        assert!(coalesce("pusheach", Value::from(json!([])), vec![Value::Number(1.0)]).is_err());
    }

    #[test]
    fn at_supports_negative_indexes() {
        let items = Value::from(json!(["a", "b", "c"]));
        assert_eq!(coalesce("at", items.clone(), vec![Value::Number(-1.0)]), Ok(Value::string("c")));
        assert_eq!(coalesce("at", items.clone(), vec![Value::Number(0.0)]), Ok(Value::string("a")));
        assert!(matches!(
            coalesce("at", items.clone(), vec![Value::Number(3.0)]),
            Err(EvalError::Transformation { .. })
        ));
        assert!(coalesce("at", items, vec![Value::Number(0.5)]).is_err());
        assert_eq!(coalesce("at", Value::text("héllo"), vec![Value::Number(1.0)]), Ok(Value::text("é")));
        assert_eq!(coalesce("at", Value::string("héllo"), vec![Value::Number(-1.0)]), Ok(Value::string("o")));
        assert_eq!(
            coalesce("at", Value::NodeFragment(vec![Node::text("x")]), vec![Value::Number(0.0)]),
            Ok(Value::text("x"))
        );
    }

    #[test]
    fn sort_on_is_stable_with_missing_last() {
        let items = Value::from(json!([
            {"n": 2, "id": "a"},
            {"id": "b"},
            {"n": 1, "id": "c"},
            {"n": 2, "id": "d"}
        ]));
        let out = coalesce("sorton", items, vec![Value::string("n")]).expect("sorted");
        let ids: Vec<_> = out
            .as_array()
            .expect("array")
            .iter()
            .map(|r| r.as_record().and_then(|r| r.get("id")).and_then(Value::as_str).map(String::from))
            .collect();
        assert_eq!(ids, vec![Some("c".into()), Some("a".into()), Some("d".into()), Some("b".into())]);
    }

    #[test]
    fn pick_random_member() {
        let items = Value::from(json!([1, 2, 3]));
        let picked = coalesce("pickrandom", items.clone(), vec![]).expect("picked");
        assert!(items.as_array().expect("array").contains(&picked));
        assert!(coalesce("pickrandom", Value::from(json!([])), vec![]).is_err());
    }

    #[test]
    fn record_to_array_and_length() {
        assert_eq!(
            coalesce("recordtoarray", Value::from(json!({"a": 1})), vec![]),
            Ok(Value::from(json!([{"key": "a", "value": 1}])))
        );
        assert_eq!(coalesce("length", Value::from(json!({"a": 1, "b": 2})), vec![]), Ok(Value::Number(2.0)));
        assert_eq!(coalesce("length", Value::text("abc"), vec![]), Ok(Value::Number(3.0)));
        assert!(coalesce("length", Value::Number(1.0), vec![]).is_err());
    }

    #[test]
    fn map_invokes_method_on_items() {
        let out = eval(json!({"tag": "array", "children": [
            {"tag": "number", "children": ["1"]},
            {"tag": "number", "children": ["2"]},
            {"tag": "map", "children": [
                {"tag": "method", "children": [
                    {"tag": "add", "children": [{"tag": "number", "children": ["10"]}]}
                ]}
            ]}
        ]}));
        assert_eq!(out, Ok(Value::from(json!([11, 12]))));
    }

    #[test]
    fn map_reports_item_failures() {
        let out = eval(json!({"tag": "array", "children": [
            {"tag": "_map", "children": [
                {"tag": "array", "children": [{"tag": "string", "children": ["x"]}]},
                {"tag": "method", "children": [{"tag": "add"}]}
            ]}
        ]}));
        assert!(matches!(out, Err(EvalError::Transformation { ref tag, .. }) if tag == "map"));
    }

    #[test]
    fn map_passes_missing_references_through() {
        let out = eval(json!({"tag": "array", "children": [
            {"tag": "_map", "children": [
                {"tag": "array", "children": [{"tag": "number", "children": ["1"]}]},
                {"tag": "method", "children": [{"tag": "get", "children": ["nope"]}]}
            ]}
        ]}));
        assert!(matches!(out, Err(EvalError::ReferenceNotFound { ref reference, .. }) if reference == "nope"));
    }
}
