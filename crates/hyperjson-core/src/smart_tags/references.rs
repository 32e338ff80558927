use super::lookup_path;
use crate::error::EvalError;
use crate::path::Reference;
use crate::transformer::Call;
use crate::tree::Context;
use crate::value::Value;
use tracing::trace;

fn name_of(main: &Value) -> &str {
    main.as_str().map(str::trim).unwrap_or_default()
}

fn not_found(reference: &str, call: &Call) -> EvalError {
    EvalError::ReferenceNotFound {
        reference: reference.to_string(),
        path: call.path.clone(),
    }
}

/// Evaluates the node a path reference points at.
///
/// The target may not be the referencing node, one of its ancestors or one
/// of its descendants.
pub(super) fn reference(main: Value, _: Vec<Value>, ctx: &mut Context, call: &Call) -> Result<Value, EvalError> {
    let raw = name_of(&main);
    let arena = ctx.arena();
    let target = arena
        .resolve_reference(call.source, &Reference::parse(raw))
        .ok_or_else(|| not_found(raw, call))?;
    if arena.are_related(call.source, target) {
        return Err(EvalError::CircularReference {
            path: arena.node(target).path().clone(),
        });
    }
    trace!(from = %call.path, to = %arena.node(target).path(), "ref");
    ctx.evaluate(target)
}

pub(super) fn get(main: Value, _: Vec<Value>, ctx: &mut Context, call: &Call) -> Result<Value, EvalError> {
    let name = name_of(&main);
    ctx.variable(name).cloned().ok_or_else(|| not_found(name, call))
}

/// Stores the main value under the name argument and passes it through.
pub(super) fn set(main: Value, args: Vec<Value>, ctx: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let name = args.first().map(name_of).unwrap_or_default();
    ctx.set_variable(name, main.clone());
    Ok(main)
}

pub(super) fn global(main: Value, _: Vec<Value>, ctx: &mut Context, call: &Call) -> Result<Value, EvalError> {
    let name = name_of(&main);
    lookup_path(ctx.globals(), name)
        .cloned()
        .ok_or_else(|| not_found(name, call))
}
