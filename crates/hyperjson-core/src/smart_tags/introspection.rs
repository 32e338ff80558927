use super::InitKind;
use crate::cast;
use crate::error::EvalError;
use crate::node::{Attributes, Node};
use crate::transformer::Call;
use crate::tree::Context;
use crate::value::{Value, ValueKind};
use tracing::info;

/// Logs the main value (with any labels) and passes it through.
pub(super) fn print(main: Value, args: Vec<Value>, _: &mut Context, call: &Call) -> Result<Value, EvalError> {
    let labels: Vec<String> = args.iter().map(cast::to_string).collect();
    info!(
        target: "hyperjson::print",
        path = %call.path,
        labels = %labels.join(" "),
        value = %main.to_json(),
        "print"
    );
    Ok(main)
}

/// Deep copy; elements go through the document provider.
pub(super) fn clone(main: Value, _: Vec<Value>, ctx: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let provider = ctx.provider();
    Ok(match main {
        Value::Structural(el) => match provider.clone_node(&Node::Element(el)) {
            Node::Element(copy) => Value::Structural(copy),
            Node::Text(t) => Value::Text(t),
        },
        Value::NodeFragment(items) => {
            Value::NodeFragment(items.iter().map(|n| provider.clone_node(n)).collect())
        }
        other => other,
    })
}

fn init_kind_of(kind: ValueKind) -> Option<InitKind> {
    Some(match kind {
        ValueKind::Null => InitKind::Null,
        ValueKind::Boolean => InitKind::Boolean,
        ValueKind::Number => InitKind::Number,
        ValueKind::String => InitKind::String,
        ValueKind::Text => InitKind::Text,
        ValueKind::NodeList => InitKind::NodeList,
        ValueKind::Array => InitKind::Array,
        ValueKind::Record => InitKind::Record,
        ValueKind::Element | ValueKind::Transformer | ValueKind::Method => return None,
    })
}

/// Zero value of the named kind, or of the main value's own kind.
pub(super) fn initialize(main: Value, args: Vec<Value>, ctx: &mut Context, call: &Call) -> Result<Value, EvalError> {
    if let Some(name) = args.first().and_then(Value::as_str) {
        return InitKind::parse(name)
            .map(InitKind::seed)
            .ok_or_else(|| call.fail(format!("unknown kind `{name}`")));
    }
    match main {
        Value::Structural(el) => Ok(Value::Structural(
            ctx.provider().create_element(&el.tag, &Attributes::new()),
        )),
        other => init_kind_of(other.kind())
            .map(InitKind::seed)
            .ok_or_else(|| call.fail(format!("cannot initialize a {}", other.kind_name()))),
    }
}

pub(super) fn guess(main: Value, _: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    Ok(cast::guess(main.as_str().unwrap_or_default()))
}
