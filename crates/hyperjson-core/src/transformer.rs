//! Transformer and Method call protocol.
//!
//! A smart-tag node evaluates to an unapplied [`Transformer`] capturing the
//! folded value of its own children. It is applied when folded into its
//! parent's accumulator:
//!
//! | mode | main | args | action |
//! |---|---|---|---|
//! | isolation | first captured item, or the whole captured value | remaining captured items | result merged into the accumulator |
//! | coalescion | the accumulator | captured value as array | result replaces the accumulator |

use crate::error::EvalError;
use crate::merge::merge_values;
use crate::path::{Path, PathSegment};
use crate::smart_tags::SmartTag;
use crate::tree::{Context, NodeId, TreeId};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Isolation,
    Coalescion,
}

impl Mode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "isolation" => Some(Mode::Isolation),
            "coalescion" => Some(Mode::Coalescion),
            _ => None,
        }
    }

    pub fn action(self) -> Action {
        match self {
            Mode::Isolation => Action::Merge,
            Mode::Coalescion => Action::Replace,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Isolation => f.write_str("isolation"),
            Mode::Coalescion => f.write_str("coalescion"),
        }
    }
}

/// What the merge engine does with a successful application result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Replace,
    Merge,
}

/// Call site handed to smart-tag functions.
#[derive(Debug, Clone, Copy)]
pub struct Call<'c> {
    pub name: &'c str,
    pub mode: Mode,
    pub source: NodeId,
    pub path: &'c Path,
}

impl Call<'_> {
    /// Operator-specific failure at this call site.
    pub fn fail(&self, details: impl Into<String>) -> EvalError {
        EvalError::Transformation {
            tag: self.name.to_string(),
            path: self.path.clone(),
            details: details.into(),
        }
    }
}

/// Lazy application of a smart tag.
#[derive(Debug, Clone)]
pub struct Transformer {
    pub name: String,
    pub mode: Mode,
    pub captured: Value,
    pub origin: TreeId,
    pub source: NodeId,
    tag: SmartTag,
}

impl PartialEq for Transformer {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.mode == other.mode
            && self.origin == other.origin
            && self.source == other.source
            && self.captured == other.captured
    }
}

impl Transformer {
    pub fn new(
        name: impl Into<String>,
        tag: SmartTag,
        mode: Mode,
        captured: Value,
        origin: TreeId,
        source: NodeId,
    ) -> Self {
        Self {
            name: name.into(),
            mode,
            captured,
            origin,
            source,
            tag,
        }
    }

    pub fn tag(&self) -> &SmartTag {
        &self.tag
    }

    pub fn action(&self) -> Action {
        self.mode.action()
    }

    /// Splits the inputs of an application into `(main, args)`.
    pub fn split(&self, outer: Value) -> (Value, Vec<Value>) {
        match self.mode {
            Mode::Isolation => match self.captured.clone() {
                Value::Array(items) => {
                    let mut items = items.into_iter();
                    let main = items.next().unwrap_or(Value::Null);
                    (main, items.collect())
                }
                other => (other, Vec::new()),
            },
            Mode::Coalescion => match self.captured.clone() {
                Value::Array(items) => (outer, items),
                other => (outer, vec![other]),
            },
        }
    }

    /// Validates the inputs and runs the smart-tag function.
    pub fn apply(&self, outer: Value, ctx: &mut Context) -> Result<Value, EvalError> {
        let path = ctx.source_of(self)?.path();
        let (main, args) = self.split(outer);

        let main = (self.tag.main_check)(main).map_err(|m| EvalError::MainValue {
            tag: self.name.clone(),
            path: path.clone(),
            expected: m.expected,
            found: m.found,
        })?;
        let args = (self.tag.args_check)(args, &main).map_err(|m| EvalError::ArgsValue {
            tag: self.name.clone(),
            path: path.clone(),
            position: m.position,
            expected: m.expected,
            found: m.found,
        })?;

        let call = Call {
            name: &self.name,
            mode: self.mode,
            source: self.source,
            path,
        };
        (self.tag.func)(main, args, ctx, &call)
    }
}

/// First-class handle on a transformer, passed to tags such as `map`.
#[derive(Debug, Clone, PartialEq)]
pub struct Method(Rc<Transformer>);

impl Method {
    pub fn new(transformer: Rc<Transformer>) -> Self {
        Self(transformer)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn transformer(&self) -> &Rc<Transformer> {
        &self.0
    }

    /// Applies the wrapped transformer with `value` as the outer value.
    ///
    /// Errors are returned to the caller whatever the mode; isolation results
    /// are merged into `value` the same way the fold would.
    pub fn invoke(&self, value: Value, ctx: &mut Context) -> Result<Value, EvalError> {
        ctx.enter(&self.0)?;
        let result = self.0.apply(value.clone(), ctx).and_then(|out| match self.0.action() {
            Action::Replace => Ok(out),
            Action::Merge => merge_values(value, out, &PathSegment::Index(0), ctx),
        });
        ctx.leave();
        result
    }
}
