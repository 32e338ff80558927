use crate::error::EvalError;
use crate::transformer::Call;
use crate::tree::Context;
use crate::typecheck::{ArgsMismatch, Kind, TEXTUAL, type_check_many};
use crate::value::{Record, Value};

pub(super) fn args_set_property(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_many(args, &[TEXTUAL, &[Kind::Any]])
}

pub(super) fn args_one_record(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_many(args, &[&[Kind::ANY_RECORD]])
}

pub(super) fn args_rename(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_many(args, &[TEXTUAL, TEXTUAL])
}

/// Dotted lookup: `a.b` descends into records, `a.0` into arrays.
pub(crate) fn lookup_path<'r>(record: &'r Record, path: &str) -> Option<&'r Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = record.get(first)?;
    for part in parts {
        match current {
            Value::Record(inner) => current = inner.get(part)?,
            Value::Array(items) => {
                let idx = part.parse::<usize>().ok()?;
                current = items.get(idx)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Dotted assignment, replacing non-record intermediates with records.
fn assign_path(record: &mut Record, path: &str, value: Value) {
    let parts: Vec<&str> = path.split('.').filter(|p| !p.is_empty()).collect();
    let Some((last, parents)) = parts.split_last() else {
        return;
    };
    let mut cur = record;
    for part in parents {
        let entry = cur
            .entry((*part).to_string())
            .or_insert_with(|| Value::Record(Record::new()));
        if !matches!(entry, Value::Record(_)) {
            *entry = Value::Record(Record::new());
        }
        let Value::Record(next) = entry else {
            return;
        };
        cur = next;
    }
    cur.insert((*last).to_string(), value);
}

fn into_record(main: Value) -> Record {
    match main {
        Value::Record(record) => record,
        _ => Record::new(),
    }
}

fn key_names(args: &[Value]) -> impl Iterator<Item = &str> {
    args.iter().filter_map(Value::as_str)
}

pub(super) fn get_property(main: Value, args: Vec<Value>, _: &mut Context, call: &Call) -> Result<Value, EvalError> {
    let key = args.first().and_then(Value::as_str).unwrap_or_default();
    let record = into_record(main);
    lookup_path(&record, key)
        .cloned()
        .ok_or_else(|| call.fail(format!("no property `{key}`")))
}

pub(super) fn set_property(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let mut args = args.into_iter();
    let key = args.next().unwrap_or(Value::Null);
    let value = args.next().unwrap_or(Value::Null);
    let mut record = into_record(main);
    assign_path(&mut record, key.as_str().unwrap_or_default(), value);
    Ok(Value::Record(record))
}

pub(super) fn delete_properties(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let mut record = into_record(main);
    for key in key_names(&args) {
        record.shift_remove(key);
    }
    Ok(Value::Record(record))
}

pub(super) fn get_properties(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let mut record = into_record(main);
    let subset: Record = key_names(&args)
        .filter_map(|key| record.shift_remove_entry(key))
        .collect();
    Ok(Value::Record(subset))
}

pub(super) fn set_properties(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let mut record = into_record(main);
    for arg in args {
        record.extend(into_record(arg));
    }
    Ok(Value::Record(record))
}

pub(super) fn rename_property(main: Value, args: Vec<Value>, _: &mut Context, call: &Call) -> Result<Value, EvalError> {
    let old = args.first().and_then(Value::as_str).unwrap_or_default();
    let new = args.get(1).and_then(Value::as_str).unwrap_or_default();
    let record = into_record(main);
    if !record.contains_key(old) {
        return Err(call.fail(format!("no property `{old}` to rename")));
    }
    let renamed = record
        .into_iter()
        .map(|(k, v)| if k == old { (new.to_string(), v) } else { (k, v) })
        .collect();
    Ok(Value::Record(renamed))
}
