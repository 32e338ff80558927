use crate::cast::{loosely_equal, to_boolean};
use crate::error::EvalError;
use crate::transformer::Call;
use crate::tree::Context;
use crate::typecheck::{ArgsMismatch, Kind, TypeMismatch, type_check, type_check_many};
use crate::value::Value;

pub(super) fn main_negatable(value: Value) -> Result<Value, TypeMismatch> {
    type_check(value, &[Kind::Boolean, Kind::Number])
}

pub(super) fn args_if(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_many(args, &[&[Kind::Any], &[Kind::Any]])
}

pub(super) fn and(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    Ok(Value::Boolean(to_boolean(&main) && args.iter().all(to_boolean)))
}

pub(super) fn or(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    Ok(Value::Boolean(to_boolean(&main) || args.iter().any(to_boolean)))
}

pub(super) fn negate(main: Value, _: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    Ok(match main {
        Value::Number(n) => Value::Number(-n),
        other => Value::Boolean(!to_boolean(&other)),
    })
}

pub(super) fn if_(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let mut branches = args.into_iter();
    let then = branches.next().unwrap_or(Value::Null);
    let otherwise = branches.next().unwrap_or(Value::Null);
    Ok(if to_boolean(&main) { then } else { otherwise })
}

pub(super) fn equals(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    Ok(Value::Boolean(args.iter().all(|arg| loosely_equal(&main, arg))))
}
