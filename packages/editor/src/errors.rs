//! Error types for the editor

use std::path::PathBuf;
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Element {oid} appears {count} times in {path}")]
    AmbiguousSource {
        oid: String,
        path: PathBuf,
        count: usize,
    },

    #[error("Source of {path} changed since {oid} was resolved")]
    StaleSource { oid: String, path: PathBuf },

    #[error("Unsupported edit: {0}")]
    UnsupportedEdit(String),

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: onlook_parser::ParseError,
    },
}

impl CompileError {
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedEdit(message.into())
    }
}

/// Failure reported by an [`crate::ActionExecutor`]
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ExecutionError {
    pub message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    #[error("Nothing was applied: {0}")]
    NothingApplied(String),

    #[error("Only part of the change was applied: {0}")]
    PartiallyApplied(String),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}
