use super::{lookup_path, same_textual};
use crate::cast;
use crate::error::EvalError;
use crate::transformer::Call;
use crate::tree::Context;
use crate::typecheck::{ArgsMismatch, Kind, TEXTUAL, type_check_between, type_check_many};
use crate::value::Value;

pub(super) fn args_join(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_between(args, 0, &[TEXTUAL])
}

pub(super) fn args_replace(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_many(args, &[TEXTUAL, TEXTUAL])
}

pub(super) fn args_populate(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_many(args, &[&[Kind::ANY_RECORD]])
}

fn text_of(value: &Value) -> &str {
    value.as_str().unwrap_or_default()
}

pub(super) fn join(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let separator = args.first().map(text_of).unwrap_or(",");
    let Value::Array(items) = main else {
        return Ok(Value::String(String::new()));
    };
    let joined = items
        .iter()
        .map(cast::to_string)
        .collect::<Vec<_>>()
        .join(separator);
    Ok(Value::String(joined))
}

pub(super) fn split(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let text = text_of(&main);
    let separator = args.first().map(text_of).unwrap_or_default();
    let parts: Vec<Value> = if separator.is_empty() {
        text.chars()
            .map(|c| same_textual(&main, c.to_string()))
            .collect()
    } else {
        text.split(separator)
            .map(|part| same_textual(&main, part.to_string()))
            .collect()
    };
    Ok(Value::Array(parts))
}

pub(super) fn replace(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let pattern = args.first().map(text_of).unwrap_or_default();
    let replacement = args.get(1).map(text_of).unwrap_or_default();
    if pattern.is_empty() {
        return Ok(main);
    }
    let out = text_of(&main).replace(pattern, replacement);
    Ok(same_textual(&main, out))
}

pub(super) fn trim(main: Value, _: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let out = text_of(&main).trim().to_string();
    Ok(same_textual(&main, out))
}

pub(super) fn notrailing(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let suffix = args.first().map(text_of).unwrap_or("/");
    if suffix.is_empty() {
        return Ok(main);
    }
    let mut text = text_of(&main);
    while let Some(rest) = text.strip_suffix(suffix) {
        text = rest;
    }
    Ok(same_textual(&main, text.to_string()))
}

/// Replaces `{{ key }}` placeholders with values from the record argument.
/// Dotted keys reach into nested records; unknown keys stay untouched.
pub(super) fn populate(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let Some(Value::Record(values)) = args.first() else {
        return Ok(main);
    };
    let template = text_of(&main);
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let key = after[..end].trim();
        match lookup_path(values, key) {
            Some(value) => out.push_str(&cast::to_string(value)),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(same_textual(&main, out))
}
