//! Error taxonomy shared by the path parser, query evaluator, and node
//! conversions. Mirrors the per-crate `thiserror` error enums in the
//! `json-joy` workspace (e.g. `json-joy-json-pointer`'s `JsonPointerError`).

use thiserror::Error;

/// The kind of failure, independent of where in a chain it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("malformed input: {0}")]
    ParseError(String),

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("index out of range: {0}")]
    IndexOutOfRange(String),

    #[error("kind mismatch: {0}")]
    KindMismatch(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("conversion error: {0}")]
    ConversionError(String),
}

/// An error recorded on a node, carrying the breadcrumb at the point of
/// failure for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}{}", .path.as_ref().map(|p| format!(" (at {p})")).unwrap_or_default())]
pub struct Error {
    pub kind: ErrorKind,
    pub path: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, path: None }
    }

    pub fn at(kind: ErrorKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: Some(path.into()),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        if self.path.is_none() {
            self.path = Some(path.into());
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, Error>;
