//! Error types for the workspace

use onlook_common::{CodeDiff, DiffMismatch, SurfaceId};
use onlook_editor::{CompileError, HistoryError};
use onlook_parser::ParseError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Element {oid} is claimed by more than one source element: {paths:?}")]
    AmbiguousSource { oid: String, paths: Vec<PathBuf> },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Could not read {path}: {message}")]
    Read { path: PathBuf, message: String },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Why one diff did not reach disk
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiffFailure {
    #[error("source no longer matches ({0})")]
    Stale(DiffMismatch),

    #[error("skipped after an earlier failure in the same file")]
    Skipped,

    #[error("could not read file: {0}")]
    Read(String),

    #[error("could not write file: {0}")]
    Write(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDiff {
    pub diff: CodeDiff,
    pub reason: DiffFailure,
}

impl std::fmt::Display for FailedDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.diff.path.display(), self.reason)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("Surface not registered: {0}")]
    UnknownSurface(SurfaceId),

    #[error("Surface {0} is not ready for editing")]
    Unavailable(SurfaceId),

    #[error("Surface query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Surface query failed: {0}")]
    Query(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    Create(#[from] notify::Error),

    #[error("Watch error: {0}")]
    Watch(String),
}

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("{path} changed externally while editing {oid}")]
    ChangedExternally { oid: String, path: PathBuf },

    #[error("Could not apply change: {}", failed_summary(.0))]
    Write(Vec<FailedDiff>),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Watcher(#[from] WatcherError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

fn failed_summary(failed: &[FailedDiff]) -> String {
    failed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
