use serde::{Deserialize, Serialize};
use std::fmt;

/// One step from a node to one of its children.
///
/// Unkeyed children are addressed by position (`Index`), children carrying the
/// key attribute by name (`Key`). Keyed children never consume a position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl PathSegment {
    pub fn is_index(&self) -> bool {
        matches!(self, PathSegment::Index(_))
    }

    pub fn is_key(&self) -> bool {
        matches!(self, PathSegment::Key(_))
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "{i}"),
            PathSegment::Key(k) => f.write_str(k),
        }
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        PathSegment::Index(value)
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        PathSegment::Key(value.to_string())
    }
}

/// Absolute position of a node inside its tree. The root is the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// `true` when `self` equals `other` or is one of its ancestors.
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        self.0.len() <= other.0.len() && other.0[..self.0.len()] == self.0[..]
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(value: Vec<PathSegment>) -> Self {
        Self(value)
    }
}

/// Textual reference as written inside `ref`/`toref` nodes.
///
/// - `/a/0/b` and `a/0/b` are resolved from the root;
/// - `./a` and `../a` are resolved from the referencing node's parent, each
///   extra `..` moving one level further up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Absolute(Vec<String>),
    Relative { up: usize, segments: Vec<String> },
}

impl Reference {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let mut parts = raw.split('/').peekable();
        let relative = matches!(parts.peek(), Some(&".") | Some(&".."));
        if !relative {
            let segments = parts
                .filter(|p| !p.is_empty())
                .map(ToString::to_string)
                .collect();
            return Reference::Absolute(segments);
        }

        let mut up = 0usize;
        let mut segments = Vec::new();
        for part in parts {
            match part {
                "" | "." => {}
                ".." if segments.is_empty() => up += 1,
                ".." => {
                    segments.pop();
                }
                other => segments.push(other.to_string()),
            }
        }
        Reference::Relative { up, segments }
    }
}
