use crate::path::Path;
use thiserror::Error;

/// Failure produced while evaluating a tree.
///
/// `code()` gives a stable identifier in the `HYPERJSON_E_*` namespace.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("<{tag}> at {path}: main value expected {expected}, found {found}")]
    MainValue {
        tag: String,
        path: Path,
        expected: String,
        found: String,
    },

    #[error("<{tag}> at {path}: argument {position} expected {expected}, found {found}")]
    ArgsValue {
        tag: String,
        path: Path,
        position: usize,
        expected: String,
        found: String,
    },

    #[error("<{tag}> at {path}: {details}")]
    Transformation {
        tag: String,
        path: Path,
        details: String,
    },

    #[error("circular reference: {path} is already being evaluated")]
    CircularReference { path: Path },

    #[error("reference not found: {reference} (requested from {path})")]
    ReferenceNotFound { reference: String, path: Path },
}

impl EvalError {
    pub fn code(&self) -> &'static str {
        match self {
            EvalError::MainValue { .. } => "HYPERJSON_E_MAIN_VALUE",
            EvalError::ArgsValue { .. } => "HYPERJSON_E_ARGS_VALUE",
            EvalError::Transformation { .. } => "HYPERJSON_E_TRANSFORMATION",
            EvalError::CircularReference { .. } => "HYPERJSON_E_CIRCULAR_REFERENCE",
            EvalError::ReferenceNotFound { .. } => "HYPERJSON_E_REFERENCE_NOT_FOUND",
        }
    }

    /// Fatal errors abort the whole evaluation, whatever the transformer mode.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EvalError::CircularReference { .. })
    }

    /// Errors that operators invoking methods re-raise unchanged instead of
    /// wrapping them in a transformation error.
    pub fn passes_through(&self) -> bool {
        matches!(
            self,
            EvalError::CircularReference { .. } | EvalError::ReferenceNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathSegment;

    #[test]
    fn messages_and_codes() {
        let err = EvalError::ArgsValue {
            tag: "if".into(),
            path: Path::new(vec![PathSegment::Index(0)]),
            position: 1,
            expected: "2 arguments".into(),
            found: "1 arguments".into(),
        };
        assert_eq!(err.code(), "HYPERJSON_E_ARGS_VALUE");
        assert_eq!(
            err.to_string(),
            "<if> at /0: argument 1 expected 2 arguments, found 1 arguments"
        );
        assert!(!err.is_fatal());
        assert!(!err.passes_through());
        assert!(EvalError::CircularReference { path: Path::root() }.is_fatal());
        let missing = EvalError::ReferenceNotFound {
            reference: "x".into(),
            path: Path::root(),
        };
        assert!(missing.passes_through());
        assert!(!missing.is_fatal());
    }
}
