//! Diff Application & Write-Back
//!
//! Diffs are grouped per file. Each file is read once, its diffs applied in
//! the order supplied, and the result written once. The first diff whose
//! `original` is not found uniquely stops that file: it and every later diff
//! to the same file are reported as failed and nothing is written for them.
//! Files are independent and are written concurrently.

use crate::error::{DiffFailure, FailedDiff};
use crate::registry::TemplateRegistry;
use futures::future::join_all;
use onlook_common::{CodeDiff, FileSystem};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One fair mutex per file; waiters are served in arrival order
#[derive(Debug, Default)]
pub struct FileLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .await
            .entry(path.to_path_buf())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Locks every path, always in sorted order
    pub async fn lock_all(&self, paths: impl IntoIterator<Item = PathBuf>) -> FileGuards {
        let sorted: BTreeSet<PathBuf> = paths.into_iter().collect();
        let mut guards = Vec::with_capacity(sorted.len());
        for path in sorted {
            let guard = self.lock(&path).await;
            guards.push((path, guard));
        }
        FileGuards { guards }
    }
}

/// Locks held on a set of files
#[derive(Debug)]
pub struct FileGuards {
    guards: Vec<(PathBuf, OwnedMutexGuard<()>)>,
}

impl FileGuards {
    pub fn holds(&self, path: &Path) -> bool {
        self.guards.iter().any(|(held, _)| held == path)
    }
}

/// Outcome of one write-back batch
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyReport {
    /// Diffs now on disk, in the order supplied
    pub applied: Vec<CodeDiff>,
    pub failed: Vec<FailedDiff>,
    pub timestamp: i64,
}

impl ApplyReport {
    fn new() -> Self {
        Self {
            applied: Vec::new(),
            failed: Vec::new(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Files at least one diff was written to
    pub fn touched_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for diff in &self.applied {
            if !paths.contains(&diff.path) {
                paths.push(diff.path.clone());
            }
        }
        paths
    }

    pub fn into_result(self) -> Result<usize, Vec<FailedDiff>> {
        if self.failed.is_empty() {
            Ok(self.applied.len())
        } else {
            Err(self.failed)
        }
    }
}

pub struct DiffWriter {
    fs: Arc<dyn FileSystem>,
    registry: Arc<TemplateRegistry>,
    locks: Arc<FileLocks>,
}

impl DiffWriter {
    pub fn new(fs: Arc<dyn FileSystem>, registry: Arc<TemplateRegistry>) -> Self {
        Self {
            fs,
            registry,
            locks: Arc::new(FileLocks::new()),
        }
    }

    pub fn locks(&self) -> &Arc<FileLocks> {
        &self.locks
    }

    /// Locks the touched files, then applies
    pub async fn apply(&self, diffs: &[CodeDiff]) -> ApplyReport {
        let guards = self
            .locks
            .lock_all(diffs.iter().map(|diff| diff.path.clone()))
            .await;
        self.apply_held(diffs, &guards).await
    }

    /// Applies with the touched files' locks already held by the caller
    pub async fn apply_held(&self, diffs: &[CodeDiff], guards: &FileGuards) -> ApplyReport {
        let mut groups: Vec<(&Path, Vec<&CodeDiff>)> = Vec::new();
        for diff in diffs {
            debug_assert!(guards.holds(&diff.path), "write without file lock");
            match groups.iter_mut().find(|(path, _)| *path == diff.path.as_path()) {
                Some((_, group)) => group.push(diff),
                None => groups.push((diff.path.as_path(), vec![diff])),
            }
        }

        let outcomes = join_all(
            groups
                .iter()
                .map(|(path, group)| self.apply_file(path, group)),
        )
        .await;

        let mut report = ApplyReport::new();
        for (applied, failed) in outcomes {
            report.failed.extend(failed);
            report.applied.extend(applied);
        }
        // Keep supplied order across files
        report
            .applied
            .sort_by_key(|diff| diffs.iter().position(|d| d == diff).unwrap_or(usize::MAX));

        if !report.is_complete() {
            tracing::warn!(
                applied = report.applied.len(),
                failed = report.failed.len(),
                "write-back incomplete"
            );
        }
        report
    }

    async fn apply_file(&self, path: &Path, diffs: &[&CodeDiff]) -> (Vec<CodeDiff>, Vec<FailedDiff>) {
        let fail_rest = |from: usize, reason: DiffFailure| -> Vec<FailedDiff> {
            diffs[from..]
                .iter()
                .enumerate()
                .map(|(i, diff)| FailedDiff {
                    diff: (*diff).clone(),
                    reason: if i == 0 { reason.clone() } else { DiffFailure::Skipped },
                })
                .collect()
        };

        let mut text = match self.fs.read_to_string(path).await {
            Ok(text) => text,
            Err(err) => return (Vec::new(), fail_rest(0, DiffFailure::Read(err.to_string()))),
        };

        let mut applied: Vec<CodeDiff> = Vec::new();
        let mut failed = Vec::new();
        for (i, diff) in diffs.iter().enumerate() {
            match diff.apply_to(&text) {
                Ok(next) => {
                    text = next;
                    applied.push((*diff).clone());
                }
                Err(mismatch) => {
                    tracing::warn!(path = ?path, %mismatch, "stale diff");
                    failed = fail_rest(i, DiffFailure::Stale(mismatch));
                    break;
                }
            }
        }

        if applied.is_empty() {
            return (applied, failed);
        }
        if let Err(err) = self.fs.write(path, &text).await {
            tracing::error!(path = ?path, error = %err, "write failed");
            let reason = DiffFailure::Write(err.to_string());
            let mut all: Vec<FailedDiff> = applied
                .into_iter()
                .map(|diff| FailedDiff {
                    diff,
                    reason: reason.clone(),
                })
                .collect();
            all.extend(failed);
            return (Vec::new(), all);
        }

        self.registry.invalidate(path).await;
        tracing::debug!(path = ?path, diffs = applied.len(), "applied diffs");
        (applied, failed)
    }
}
