//! Typed evaluation tree.
//!
//! A document is turned once into an arena of [`TreeNode`]s. Every node
//! knows its parent, its [`Path`] from the root and its addressable children
//! (`subtrees`, in source order). Evaluation folds children left to right
//! into a seed value through [`merge_values`], then wraps the folded value
//! according to the node's [`NodeType`].
//!
//! Results are cached per node as deep snapshots; a node is computed at most
//! once per tree unless the cache is cleared. A callstack of in-flight paths
//! rejects re-entrant evaluation with [`EvalError::CircularReference`].

use crate::cast;
use crate::config::Options;
use crate::error::EvalError;
use crate::merge::merge_values;
use crate::node::{DocumentProvider, Element, Node, OwnedDocument};
use crate::path::{Path, PathSegment, Reference};
use crate::serialized::{SerializedValue, deserialize, serialize};
use crate::smart_tags::{SmartTag, SmartTags};
use crate::transformer::{Method, Mode, Transformer};
use crate::value::{Record, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Index of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Identity of a built tree. Transformers carry the id of the tree they
/// were built in so handles leaking into another tree are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(u64);

impl TreeId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        TreeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Built-in value-producing tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Null,
    Boolean,
    Number,
    String,
    Text,
    NodeList,
    Array,
    Record,
    Method,
}

impl Primitive {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "null" => Primitive::Null,
            "boolean" => Primitive::Boolean,
            "number" => Primitive::Number,
            "string" => Primitive::String,
            "text" => Primitive::Text,
            "nodelist" => Primitive::NodeList,
            "array" => Primitive::Array,
            "record" => Primitive::Record,
            "method" => Primitive::Method,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Null => "null",
            Primitive::Boolean => "boolean",
            Primitive::Number => "number",
            Primitive::String => "string",
            Primitive::Text => "text",
            Primitive::NodeList => "nodelist",
            Primitive::Array => "array",
            Primitive::Record => "record",
            Primitive::Method => "method",
        }
    }

    fn seed(self) -> Value {
        match self {
            Primitive::Null | Primitive::Method => Value::Null,
            Primitive::Boolean => Value::Boolean(false),
            Primitive::Number => Value::Number(0.0),
            Primitive::String => Value::String(String::new()),
            Primitive::Text => Value::Text(String::new()),
            Primitive::NodeList => Value::NodeFragment(Vec::new()),
            Primitive::Array => Value::Array(Vec::new()),
            Primitive::Record => Value::Record(Record::new()),
        }
    }

    fn wrap(self, folded: Value) -> Value {
        match self {
            Primitive::Null => Value::Null,
            Primitive::Boolean => Value::Boolean(cast::to_boolean(&folded)),
            Primitive::Number => Value::Number(cast::to_number(&folded)),
            Primitive::String => Value::String(cast::to_string(&folded)),
            Primitive::Text => Value::Text(cast::to_string(&folded)),
            Primitive::NodeList => Value::NodeFragment(cast::to_fragment(folded)),
            Primitive::Array => Value::Array(cast::to_array(folded)),
            Primitive::Record => match folded {
                Value::Record(r) => Value::Record(r),
                _ => Value::Record(Record::new()),
            },
            Primitive::Method => folded,
        }
    }
}

/// Classification of a tree node, fixed at construction.
#[derive(Debug, Clone)]
pub enum NodeType {
    Text,
    Primitive(Primitive),
    SmartTag {
        name: String,
        mode: Mode,
        tag: SmartTag,
    },
    Element,
}

impl NodeType {
    pub fn seed(&self) -> Value {
        match self {
            NodeType::Text => Value::Text(String::new()),
            NodeType::Primitive(p) => p.seed(),
            NodeType::SmartTag { tag, .. } => tag.init.seed(),
            NodeType::Element => Value::NodeFragment(Vec::new()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Source node without children; reserved attributes are stripped.
    node: Node,
    name: Option<String>,
    parent: Option<NodeId>,
    path: Path,
    subtrees: IndexMap<PathSegment, NodeId>,
    node_type: NodeType,
}

impl TreeNode {
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Value of the key attribute, when the node was keyed.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn subtrees(&self) -> &IndexMap<PathSegment, NodeId> {
        &self.subtrees
    }

    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }
}

#[derive(Debug, Default)]
pub struct Arena {
    id: TreeId,
    nodes: Vec<TreeNode>,
}

impl Arena {
    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    /// Node `id`, provided it belongs to the tree identified by `origin`.
    pub fn source(&self, origin: TreeId, id: NodeId) -> Option<&TreeNode> {
        if origin != self.id {
            return None;
        }
        self.get(id)
    }

    /// Walks `path` down from the root.
    pub fn resolve(&self, path: &Path) -> Option<NodeId> {
        let mut current = self.root();
        for segment in path.segments() {
            current = *self.node(current).subtrees.get(segment)?;
        }
        Some(current)
    }

    /// Resolves a textual reference as seen from node `from`.
    ///
    /// Numeric segments match an `Index` child first and fall back to a
    /// `Key` child with the same text.
    pub fn resolve_reference(&self, from: NodeId, reference: &Reference) -> Option<NodeId> {
        let (mut current, segments) = match reference {
            Reference::Absolute(segments) => (self.root(), segments),
            Reference::Relative { up, segments } => {
                let mut base = self.node(from).parent.unwrap_or(from);
                for _ in 0..*up {
                    base = self.node(base).parent?;
                }
                (base, segments)
            }
        };
        for raw in segments {
            let subtrees = &self.node(current).subtrees;
            let by_index = raw
                .parse::<usize>()
                .ok()
                .and_then(|i| subtrees.get(&PathSegment::Index(i)));
            current = *by_index.or_else(|| subtrees.get(&PathSegment::Key(raw.clone())))?;
        }
        Some(current)
    }

    /// True when `a` and `b` are the same node or one contains the other.
    pub fn are_related(&self, a: NodeId, b: NodeId) -> bool {
        let (pa, pb) = (self.node(a).path(), self.node(b).path());
        pa.is_prefix_of(pb) || pb.is_prefix_of(pa)
    }
}

/// Per-node evaluation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodePerf {
    pub evaluations: u64,
    pub cache_hits: u64,
    pub elapsed: Duration,
}

/// Mutable evaluation state owned by a tree.
#[derive(Debug, Default)]
pub struct EvalState {
    variables: Record,
    cache: Vec<Option<SerializedValue>>,
    callstack: Vec<Path>,
    perf: Vec<NodePerf>,
}

impl EvalState {
    fn with_nodes(count: usize) -> Self {
        Self {
            variables: Record::new(),
            cache: vec![None; count],
            callstack: Vec::new(),
            perf: vec![NodePerf::default(); count],
        }
    }

    fn write_variable(&mut self, name: String, value: Value, invalidate: bool) {
        self.variables.insert(name, value);
        if invalidate {
            self.clear_cache();
        }
    }

    fn clear_cache(&mut self) {
        self.cache.iter_mut().for_each(|slot| *slot = None);
    }
}

/// Borrowed view of a tree handed to smart-tag functions.
pub struct Context<'a> {
    arena: &'a Arena,
    state: &'a mut EvalState,
    tags: &'a SmartTags,
    options: &'a Options,
    provider: &'a dyn DocumentProvider,
    globals: &'a Record,
}

impl<'a> Context<'a> {
    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    pub fn tags(&self) -> &'a SmartTags {
        self.tags
    }

    pub fn options(&self) -> &'a Options {
        self.options
    }

    pub fn provider(&self) -> &'a dyn DocumentProvider {
        self.provider
    }

    pub fn globals(&self) -> &'a Record {
        self.globals
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.state.variables.get(name)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        let invalidate = self.options.invalidate_cache_on_set;
        self.state.write_variable(name.into(), value, invalidate);
    }

    /// Evaluates another node of the same tree, through cache and guard.
    pub fn evaluate(&mut self, id: NodeId) -> Result<Value, EvalError> {
        evaluate_node(id, self)
    }

    /// Node a transformer was built from. Fails for handles that come from
    /// another tree.
    pub fn source_of(&self, transformer: &Transformer) -> Result<&'a TreeNode, EvalError> {
        self.arena
            .source(transformer.origin, transformer.source)
            .ok_or_else(|| EvalError::Transformation {
                tag: transformer.name.clone(),
                path: Path::root(),
                details: "transformer belongs to another tree".into(),
            })
    }

    /// Marks the transformer's source node as in flight, failing if it or
    /// one of its ancestors already is.
    pub fn enter(&mut self, transformer: &Transformer) -> Result<(), EvalError> {
        let path = self.source_of(transformer)?.path();
        self.check_cycle(path)?;
        self.state.callstack.push(path.clone());
        Ok(())
    }

    pub fn leave(&mut self) {
        self.state.callstack.pop();
    }

    fn check_cycle(&self, path: &Path) -> Result<(), EvalError> {
        if self.state.callstack.iter().any(|p| path.is_prefix_of(p)) {
            return Err(EvalError::CircularReference { path: path.clone() });
        }
        Ok(())
    }
}

fn evaluate_node(id: NodeId, ctx: &mut Context) -> Result<Value, EvalError> {
    let node = ctx.arena.node(id);
    ctx.check_cycle(node.path())?;

    let cached = ctx.state.cache[id.0]
        .as_ref()
        .and_then(|snapshot| deserialize(snapshot, ctx.tags));
    if let Some(value) = cached {
        ctx.state.perf[id.0].cache_hits += 1;
        debug!(path = %node.path(), "cache hit");
        return Ok(value);
    }

    ctx.state.callstack.push(node.path().clone());
    let started = Instant::now();
    let result = compute(id, node, ctx);
    ctx.state.callstack.pop();

    let perf = &mut ctx.state.perf[id.0];
    perf.evaluations += 1;
    perf.elapsed += started.elapsed();

    if let Ok(value) = &result {
        ctx.state.cache[id.0] = Some(serialize(value));
    }
    result
}

fn compute(id: NodeId, node: &TreeNode, ctx: &mut Context) -> Result<Value, EvalError> {
    match node.node_type() {
        NodeType::Text => Ok(match node.node() {
            Node::Text(t) => Value::Text(t.clone()),
            Node::Element(el) => Value::Text(el.text_content()),
        }),
        NodeType::Primitive(Primitive::Method) => compute_method(node, ctx),
        node_type => {
            let folded = fold(node, node_type.seed(), ctx)?;
            Ok(wrap(id, node, folded, ctx))
        }
    }
}

#[inline]
fn is_scalar_seed(value: &Value) -> bool {
    matches!(
        value,
        Value::Null | Value::Boolean(_) | Value::Number(_) | Value::String(_) | Value::Text(_)
    )
}

/// Folds the children of `node` into `seed`.
///
/// A scalar seed that no child has touched yet is dropped in favour of an
/// empty node list when the first child is node-like, so `<number>42</number>`
/// folds to the text `42` and not to `042`.
fn fold(node: &TreeNode, seed: Value, ctx: &mut Context) -> Result<Value, EvalError> {
    let mut acc = seed;
    let mut pristine = true;
    for (segment, &child) in node.subtrees() {
        let incoming = evaluate_node(child, ctx)?;
        let current = if pristine && is_scalar_seed(&acc) && incoming.is_node_like() {
            Value::NodeFragment(Vec::new())
        } else {
            acc
        };
        acc = merge_values(current, incoming, segment, ctx)?;
        pristine = false;
    }
    Ok(acc)
}

fn wrap(id: NodeId, node: &TreeNode, folded: Value, ctx: &Context) -> Value {
    match node.node_type() {
        NodeType::Primitive(p) => p.wrap(folded),
        NodeType::Element => {
            let Node::Element(shell) = node.node() else {
                return folded;
            };
            let mut el = ctx.provider.create_element(&shell.tag, &shell.attributes);
            el.children = cast::to_fragment(folded);
            Value::Structural(el)
        }
        NodeType::SmartTag { name, mode, tag } => Value::Transformer(Rc::new(Transformer::new(
            name.clone(),
            *tag,
            *mode,
            folded,
            ctx.arena.id(),
            id,
        ))),
        NodeType::Text => folded,
    }
}

/// `<method>` wraps the last smart tag among its children.
fn compute_method(node: &TreeNode, ctx: &mut Context) -> Result<Value, EvalError> {
    let mut method = None;
    for &child in node.subtrees().values() {
        match evaluate_node(child, ctx)? {
            Value::Transformer(t) => method = Some(Method::new(t)),
            Value::Method(m) => method = Some(m),
            _ => {}
        }
    }
    method.map(Value::Method).ok_or_else(|| EvalError::Transformation {
        tag: Primitive::Method.name().to_string(),
        path: node.path().clone(),
        details: "expects a smart tag child".to_string(),
    })
}

/// Evaluation tree built from a document.
pub struct Tree {
    arena: Arena,
    state: EvalState,
    tags: SmartTags,
    options: Options,
    provider: Box<dyn DocumentProvider>,
    globals: Record,
}

impl Tree {
    /// Builds a tree with the built-in smart tags and default options.
    pub fn new(root: &Node) -> Self {
        Self::build(root, SmartTags::new(), Options::default())
    }

    pub fn build(root: &Node, tags: SmartTags, options: Options) -> Self {
        let mut builder = Builder {
            nodes: Vec::new(),
            tags: &tags,
            options: &options,
        };
        builder.add(root, None, Path::root());
        let nodes = builder.nodes;
        debug!(nodes = nodes.len(), "tree built");

        Self {
            state: EvalState::with_nodes(nodes.len()),
            arena: Arena {
                id: TreeId::next(),
                nodes,
            },
            tags,
            options,
            provider: Box::new(OwnedDocument),
            globals: Record::new(),
        }
    }

    pub fn with_provider(mut self, provider: impl DocumentProvider + 'static) -> Self {
        self.provider = Box::new(provider);
        self
    }

    /// Read-only values reachable through the `global` smart tag.
    pub fn with_globals(mut self, globals: Record) -> Self {
        self.globals = globals;
        self
    }

    pub fn root(&self) -> NodeId {
        self.arena.root()
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.arena.get(id)
    }

    pub fn resolve(&self, path: &Path) -> Option<NodeId> {
        self.arena.resolve(path)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Evaluates the root node.
    pub fn evaluate(&mut self) -> Result<Value, EvalError> {
        self.run(self.root())
    }

    pub fn evaluate_path(&mut self, path: &Path) -> Result<Value, EvalError> {
        let id = self
            .resolve(path)
            .ok_or_else(|| EvalError::ReferenceNotFound {
                reference: path.to_string(),
                path: Path::root(),
            })?;
        self.run(id)
    }

    pub fn evaluate_at(&mut self, id: NodeId) -> Result<Value, EvalError> {
        if self.arena.get(id).is_none() {
            return Err(EvalError::ReferenceNotFound {
                reference: format!("#{}", id.0),
                path: Path::root(),
            });
        }
        self.run(id)
    }

    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.state.variables.get(name)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.state
            .write_variable(name.into(), value, self.options.invalidate_cache_on_set);
    }

    pub fn variables(&self) -> &Record {
        &self.state.variables
    }

    pub fn clear_cache(&mut self) {
        self.state.clear_cache();
    }

    pub fn cached(&self, id: NodeId) -> Option<&SerializedValue> {
        self.state.cache.get(id.0)?.as_ref()
    }

    pub fn perf(&self, id: NodeId) -> Option<NodePerf> {
        self.state.perf.get(id.0).copied()
    }

    pub(crate) fn context(&mut self) -> Context<'_> {
        Context {
            arena: &self.arena,
            state: &mut self.state,
            tags: &self.tags,
            options: &self.options,
            provider: self.provider.as_ref(),
            globals: &self.globals,
        }
    }

    fn run(&mut self, id: NodeId) -> Result<Value, EvalError> {
        let mut ctx = self.context();
        let result = evaluate_node(id, &mut ctx);
        ctx.state.callstack.clear();
        if let Err(err) = &result {
            debug!(code = err.code(), "evaluation failed: {err}");
        }
        result
    }
}

struct Builder<'b> {
    nodes: Vec<TreeNode>,
    tags: &'b SmartTags,
    options: &'b Options,
}

impl Builder<'_> {
    fn add(&mut self, source: &Node, parent: Option<NodeId>, path: Path) -> NodeId {
        let id = NodeId(self.nodes.len());
        let el = match source {
            Node::Text(t) => {
                self.nodes.push(TreeNode {
                    node: Node::Text(t.clone()),
                    name: None,
                    parent,
                    path,
                    subtrees: IndexMap::new(),
                    node_type: NodeType::Text,
                });
                return id;
            }
            Node::Element(el) => el,
        };

        let attributes = el
            .attributes
            .iter()
            .filter(|(k, _)| !self.options.is_reserved_attribute(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let name = el.attribute(&self.options.key_attribute).map(String::from);
        let node_type = self.classify(el);
        self.nodes.push(TreeNode {
            node: Node::Element(Element {
                tag: el.tag.clone(),
                attributes,
                children: Vec::new(),
            }),
            name,
            parent,
            path: path.clone(),
            subtrees: IndexMap::new(),
            node_type,
        });

        let mut index = 0;
        for child in &el.children {
            if !self.options.preserve_whitespace && child.is_blank_text() {
                continue;
            }
            let key = child
                .as_element()
                .and_then(|c| c.attribute(&self.options.key_attribute));
            let segment = match key {
                Some(k) => PathSegment::Key(k.to_string()),
                None => {
                    index += 1;
                    PathSegment::Index(index - 1)
                }
            };
            let child_id = self.add(child, Some(id), path.child(segment.clone()));
            if let Some(shadowed) = self.nodes[id.0].subtrees.insert(segment, child_id) {
                debug!(
                    path = %self.nodes[shadowed.0].path,
                    "duplicate key, later sibling wins"
                );
            }
        }
        id
    }

    fn classify(&self, el: &Element) -> NodeType {
        let tag = el.tag.to_ascii_lowercase();
        let (lookup, prefixed) = match tag.strip_prefix('_') {
            Some(rest) if !rest.is_empty() => (rest, true),
            _ => (tag.as_str(), false),
        };
        if let Some(p) = Primitive::from_tag(lookup) {
            return NodeType::Primitive(p);
        }
        let Some(def) = self.tags.get(lookup) else {
            return NodeType::Element;
        };
        let default_mode = if prefixed {
            Mode::Isolation
        } else {
            def.default_mode
        };
        let mode = el
            .attribute(&self.options.mode_attribute)
            .and_then(Mode::parse)
            .unwrap_or(default_mode);
        NodeType::SmartTag {
            name: lookup.to_string(),
            mode,
            tag: def,
        }
    }
}
