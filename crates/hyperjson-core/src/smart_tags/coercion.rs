use crate::cast;
use crate::error::EvalError;
use crate::transformer::Call;
use crate::tree::Context;
use crate::value::Value;

pub(super) fn to_boolean(main: Value, _: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    Ok(Value::Boolean(cast::to_boolean(&main)))
}

pub(super) fn to_number(main: Value, _: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    Ok(Value::Number(cast::to_number(&main)))
}

pub(super) fn to_string(main: Value, _: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    Ok(Value::String(cast::to_string(&main)))
}

pub(super) fn to_text(main: Value, _: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    Ok(cast::to_text(&main))
}

pub(super) fn to_nodelist(main: Value, _: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    Ok(Value::NodeFragment(cast::to_fragment(main)))
}

pub(super) fn to_record(main: Value, _: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    Ok(Value::Record(cast::to_record(main)))
}

pub(super) fn to_null(main: Value, _: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    Ok(cast::to_null(main))
}

pub(super) fn to_array(main: Value, _: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    Ok(Value::Array(cast::to_array(main)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::node::Node;
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn coercions() {
        assert_eq!(coalesce("toboolean", Value::text("false"), vec![]), Ok(Value::Boolean(false)));
        assert_eq!(coalesce("tonumber", Value::string(" 7 "), vec![]), Ok(Value::Number(7.0)));
        assert_eq!(coalesce("tostring", Value::Number(1.5), vec![]), Ok(Value::string("1.5")));
        assert_eq!(coalesce("totext", Value::Boolean(true), vec![]), Ok(Value::text("true")));
        assert_eq!(
            coalesce("tonodelist", Value::Number(2.0), vec![]),
            Ok(Value::NodeFragment(vec![Node::text("2")]))
        );
        assert_eq!(
            coalesce("torecord", Value::from(json!(["a"])), vec![]),
            Ok(Value::from(json!({"0": "a"})))
        );
        assert_eq!(coalesce("tonull", Value::Number(1.0), vec![]), Ok(Value::Null));
        assert_eq!(coalesce("toarray", Value::Null, vec![]), Ok(Value::Array(vec![])));
        assert!(coalesce("tonumber", Value::Null, vec![Value::Null]).is_err());
    }

    #[test]
    fn coercion_in_a_fold() {
        let out = eval(json!({"tag": "array", "children": [
            {"tag": "_tonumber", "children": ["12"]}
        ]}));
        assert_eq!(out, Ok(Value::from(json!([12]))));
    }
}
