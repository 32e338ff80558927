//! HyperJSON core crate.
//!
//! Evaluates attribute-bearing node trees into JSON-like values. The crate
//! is layered bottom-up:
//!
//! - `node` + `path`: input document model and addressing.
//! - `value` + `cast` + `typecheck`: the closed value union, its coercions
//!   and the type-check combinators every smart tag validates with.
//! - `merge` + `transformer`: the deterministic fold step and the lazy
//!   isolation/coalescion call protocol.
//! - `tree`: arena construction, cached evaluation and the cycle guard.
//! - `smart_tags`: instance-local operator registry with the built-in tags.
//! - `engine`: host-facing facade.
//!
//! Evaluation is single-threaded; a [`Tree`] owns its cache, variables and
//! callstack, and trees never share mutable state.

pub mod cast;
pub mod config;
pub mod engine;
pub mod error;
pub mod merge;
pub mod node;
pub mod path;
pub mod serialized;
pub mod smart_tags;
pub mod transformer;
pub mod tree;
pub mod typecheck;
pub mod value;

pub use config::Options;
pub use engine::Engine;
pub use error::EvalError;
pub use node::{Attributes, DocumentProvider, Element, Node, OwnedDocument};
pub use path::{Path, PathSegment, Reference};
pub use smart_tags::{InitKind, SmartTag, SmartTags};
pub use transformer::{Action, Call, Method, Mode, Transformer};
pub use tree::{Context, NodeId, NodePerf, Tree, TreeId};
pub use value::{Record, Value, ValueKind};
