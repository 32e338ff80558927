use crate::error::EvalError;
use crate::transformer::Call;
use crate::tree::Context;
use crate::typecheck::{ArgsMismatch, Kind, TypeMismatch, type_check, type_check_rest};
use crate::value::Value;

pub(super) fn main_number(value: Value) -> Result<Value, TypeMismatch> {
    type_check(value, &[Kind::Number])
}

pub(super) fn args_numbers(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_rest(args, 0, &[Kind::Number])
}

pub(super) fn add(
    main: Value,
    args: Vec<Value>,
    _ctx: &mut Context,
    _call: &Call,
) -> Result<Value, EvalError> {
    let mut total = main.as_f64().unwrap_or(0.0);
    for arg in &args {
        total += arg.as_f64().unwrap_or(0.0);
    }
    Ok(Value::Number(total))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::error::EvalError;
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn add_sums_main_and_args() {
        let out = coalesce("add", Value::Number(3.0), vec![Value::Number(4.0), Value::Number(5.0)]);
        assert_eq!(out, Ok(Value::Number(12.0)));
        assert_eq!(coalesce("add", Value::Number(-1.5), vec![]), Ok(Value::Number(-1.5)));
    }

    #[test]
    fn add_rejects_non_numbers() {
        let err = coalesce("add", Value::Number(1.0), vec![Value::text("2")]).expect_err("args");
        assert!(matches!(err, EvalError::ArgsValue { position: 0, .. }));
    }

    #[test]
    fn add_in_a_number_fold() {
        let out = eval(json!({"tag": "number", "children": [
            {"tag": "number", "children": ["3"]},
            {"tag": "add", "children": [
                {"tag": "number", "children": ["4"]},
                {"tag": "number", "children": ["5"]}
            ]}
        ]}));
        assert_eq!(out, Ok(Value::Number(12.0)));
    }

    #[test]
    fn isolated_add_inside_array() {
        let out = eval(json!({"tag": "array", "children": [
            {"tag": "_add", "children": [
                {"tag": "number", "children": ["1"]},
                {"tag": "number", "children": ["2"]}
            ]}
        ]}));
        assert_eq!(out, Ok(Value::from(json!([3]))));
    }
}
