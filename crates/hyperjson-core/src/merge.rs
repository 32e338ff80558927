//! Deterministic fold step.
//!
//! `merge_values` is applied once per child, left to right. The outcome only
//! depends on the kinds of `current` and `incoming` and on whether the child
//! is addressed by key or by position:
//!
//! | current | incoming | key | result |
//! |---|---|---|---|
//! | any | transformer | any | applied, then replaced/merged |
//! | array | any | index | appended |
//! | array | any | key | unchanged |
//! | scalar/element/text | null/boolean/number/string/array/record/method | any | incoming |
//! | scalar/element/text | element/text/nodelist | any | nodelist: current, then incoming |
//! | nodelist | element/text/nodelist | any | concatenated |
//! | nodelist | null/boolean/number/string | any | appended as text |
//! | nodelist | array | any | array: current items, then incoming items |
//! | nodelist | record/method | any | incoming |
//! | record | any | key | `current[key] = incoming` |
//! | record | any | index | unchanged |

use crate::cast;
use crate::error::EvalError;
use crate::node::Node;
use crate::path::PathSegment;
use crate::transformer::{Action, Mode, Transformer};
use crate::tree::Context;
use crate::value::Value;
use tracing::{trace, warn};

pub fn merge_values(
    current: Value,
    incoming: Value,
    key: &PathSegment,
    ctx: &mut Context,
) -> Result<Value, EvalError> {
    trace!(
        current = current.kind_name(),
        incoming = incoming.kind_name(),
        key = %key,
        "merge"
    );
    match (current, incoming) {
        (current, Value::Transformer(t)) => merge_transformer(current, &t, key, ctx),
        (Value::Array(mut items), incoming) => {
            if key.is_index() {
                items.push(incoming);
            }
            Ok(Value::Array(items))
        }
        (Value::NodeFragment(items), incoming) => Ok(merge_into_fragment(items, incoming)),
        (Value::Record(mut record), incoming) => {
            if let PathSegment::Key(k) = key {
                record.insert(k.clone(), incoming);
            }
            Ok(Value::Record(record))
        }
        (current, incoming) if incoming.is_node_like() => {
            let mut items = cast::to_fragment(current);
            items.extend(cast::to_fragment(incoming));
            Ok(Value::NodeFragment(items))
        }
        (_, incoming) => Ok(incoming),
    }
}

fn merge_into_fragment(mut items: Vec<Node>, incoming: Value) -> Value {
    match incoming {
        Value::Structural(el) => {
            items.push(Node::Element(el));
            Value::NodeFragment(items)
        }
        Value::Text(t) => {
            items.push(Node::Text(t));
            Value::NodeFragment(items)
        }
        Value::NodeFragment(more) => {
            items.extend(more);
            Value::NodeFragment(items)
        }
        scalar @ (Value::Null | Value::Boolean(_) | Value::Number(_) | Value::String(_)) => {
            items.push(Node::Text(cast::to_string(&scalar)));
            Value::NodeFragment(items)
        }
        Value::Array(more) => {
            let mut promoted: Vec<Value> = items.into_iter().map(Value::from_node).collect();
            promoted.extend(more);
            Value::Array(promoted)
        }
        replacing @ (Value::Record(_) | Value::Method(_) | Value::Transformer(_)) => replacing,
    }
}

/// Applies a folded-in transformer under the cycle guard.
///
/// Coalescion failures are logged and leave `current` unchanged. Isolation
/// failures and circular references abort the fold.
fn merge_transformer(
    current: Value,
    transformer: &Transformer,
    key: &PathSegment,
    ctx: &mut Context,
) -> Result<Value, EvalError> {
    ctx.enter(transformer)?;
    let outcome = transformer
        .apply(current.clone(), ctx)
        .and_then(|value| match transformer.action() {
            Action::Replace => Ok(value),
            Action::Merge => merge_values(current.clone(), value, key, ctx),
        });
    ctx.leave();

    match outcome {
        Ok(value) => Ok(value),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) if transformer.mode == Mode::Coalescion => {
            warn!(code = err.code(), "skipping failed <{}>: {err}", transformer.name);
            Ok(current)
        }
        Err(err) => Err(err),
    }
}
