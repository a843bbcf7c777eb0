//! # History / Transaction Manager
//!
//! Linear undo/redo over [`Action`]s, with transactions that collapse a
//! continuous gesture into one undo step.
//!
//! ## Design
//!
//! - Running an action persists it through an [`ActionExecutor`] and records
//!   only what the executor reports as applied
//! - Undo persists the inverse; redo persists the action again
//! - New actions clear the redo stack
//! - Inside a transaction, actions are previewed on the surface and merged;
//!   nothing reaches source until the transaction commits
//! - Starting a transaction while one is open commits the open one first
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new();
//!
//! history.start_transaction(&executor).await?;
//! for step in drag {
//!     history.run(Action::style("Move", step), &executor).await?;
//! }
//! history.commit_transaction(&executor).await?; // one undo step
//!
//! history.undo(&executor).await?;
//! ```

use crate::action::Action;
use crate::errors::{ExecutionError, HistoryError};
use async_trait::async_trait;

/// Result of persisting an action
#[derive(Debug, Clone, PartialEq)]
pub struct Persisted {
    /// The part of the action that took effect
    pub action: Action,
    /// Why the rest did not
    pub failures: Vec<String>,
}

impl Persisted {
    pub fn complete(action: Action) -> Self {
        Self {
            action,
            failures: Vec::new(),
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    fn failure_summary(&self) -> String {
        self.failures.join("; ")
    }
}

/// Carries actions to the rendering surface and to source
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Reflect the action on the rendering surfaces only
    async fn preview(&self, action: &Action) -> Result<(), ExecutionError>;

    /// Write the action to source (and the surfaces), reporting what applied
    async fn persist(&self, action: &Action) -> Result<Persisted, ExecutionError>;
}

#[derive(Debug, Default)]
struct Transaction {
    action: Option<Action>,
}

impl Transaction {
    fn absorb(&mut self, action: Action) {
        match &mut self.action {
            Some(existing) => existing.absorb(action),
            None => self.action = Some(action),
        }
    }
}

/// Undo/redo history for visual edits
#[derive(Debug)]
pub struct History {
    /// Applied actions (most recent last)
    undo_stack: Vec<Action>,

    /// Undone actions (most recent last)
    redo_stack: Vec<Action>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    transaction: Option<Transaction>,
}

impl History {
    /// Create a history with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            transaction: None,
        }
    }

    /// Apply an action and record it for undo
    pub async fn run<E>(&mut self, action: Action, executor: &E) -> Result<(), HistoryError>
    where
        E: ActionExecutor + ?Sized,
    {
        if action.is_empty() {
            return Ok(());
        }
        if let Some(transaction) = &mut self.transaction {
            executor.preview(&action).await?;
            transaction.absorb(action);
            return Ok(());
        }
        let persisted = executor.persist(&action).await?;
        self.settle(persisted)
    }

    fn settle(&mut self, persisted: Persisted) -> Result<(), HistoryError> {
        if persisted.action.is_empty() {
            tracing::warn!(failures = %persisted.failure_summary(), "action not applied");
            return Err(HistoryError::NothingApplied(persisted.failure_summary()));
        }
        let partial = persisted.is_partial().then(|| persisted.failure_summary());
        self.push(persisted.action);
        match partial {
            Some(summary) => {
                tracing::warn!(failures = %summary, "action partially applied");
                Err(HistoryError::PartiallyApplied(summary))
            }
            None => Ok(()),
        }
    }

    /// Record an action the caller already applied
    pub fn record(&mut self, action: Action) {
        if !action.is_empty() {
            self.push(action);
        }
    }

    fn push(&mut self, action: Action) {
        tracing::debug!(label = %action.label, diffs = action.diffs.len(), "recorded action");
        self.undo_stack.push(action);

        // Trim if exceeded max levels
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // New action invalidates the redo tail
        self.redo_stack.clear();
    }

    /// Start collapsing actions into one undo step. An open transaction is
    /// committed first.
    pub async fn start_transaction<E>(&mut self, executor: &E) -> Result<(), HistoryError>
    where
        E: ActionExecutor + ?Sized,
    {
        let committed = if self.transaction.is_some() {
            tracing::debug!("transaction already open, committing it first");
            self.commit_transaction(executor).await.map(|_| ())
        } else {
            Ok(())
        };
        self.transaction = Some(Transaction::default());
        committed
    }

    /// Persist the transaction's net effect as one action. Returns `false`
    /// when there was nothing to commit.
    pub async fn commit_transaction<E>(&mut self, executor: &E) -> Result<bool, HistoryError>
    where
        E: ActionExecutor + ?Sized,
    {
        let Some(action) = self.transaction.take().and_then(|t| t.action) else {
            return Ok(false);
        };
        if action.is_empty() {
            return Ok(false);
        }
        let persisted = executor.persist(&action).await?;
        self.settle(persisted).map(|_| true)
    }

    /// Drop the open transaction, reverting its preview. Nothing is written.
    pub async fn abandon_transaction<E>(&mut self, executor: &E) -> Result<bool, HistoryError>
    where
        E: ActionExecutor + ?Sized,
    {
        let Some(transaction) = self.transaction.take() else {
            return Ok(false);
        };
        if let Some(action) = transaction.action {
            executor.preview(&action.inverse()).await?;
        }
        Ok(true)
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Undo the most recent action
    pub async fn undo<E>(&mut self, executor: &E) -> Result<bool, HistoryError>
    where
        E: ActionExecutor + ?Sized,
    {
        let Some(action) = self.undo_stack.pop() else {
            return Ok(false); // Nothing to undo
        };
        let persisted = match executor.persist(&action.inverse()).await {
            Ok(persisted) => persisted,
            Err(err) => {
                self.undo_stack.push(action);
                return Err(err.into());
            }
        };
        if !persisted.is_partial() {
            self.redo_stack.push(action);
            return Ok(true);
        }
        if persisted.action.is_empty() {
            self.undo_stack.push(action);
            return Err(HistoryError::NothingApplied(persisted.failure_summary()));
        }

        // Only what was actually reverted becomes redoable
        let undone = persisted.action.inverse();
        let remaining = action.without_diffs(&undone.diffs);
        if !remaining.diffs.is_empty() {
            self.undo_stack.push(remaining);
        }
        self.redo_stack.push(undone);
        Err(HistoryError::PartiallyApplied(persisted.failure_summary()))
    }

    /// Redo the most recently undone action
    pub async fn redo<E>(&mut self, executor: &E) -> Result<bool, HistoryError>
    where
        E: ActionExecutor + ?Sized,
    {
        let Some(action) = self.redo_stack.pop() else {
            return Ok(false); // Nothing to redo
        };
        let persisted = match executor.persist(&action).await {
            Ok(persisted) => persisted,
            Err(err) => {
                self.redo_stack.push(action);
                return Err(err.into());
            }
        };
        if !persisted.is_partial() {
            self.undo_stack.push(action);
            return Ok(true);
        }
        if persisted.action.is_empty() {
            self.redo_stack.push(action);
            return Err(HistoryError::NothingApplied(persisted.failure_summary()));
        }

        let remaining = action.without_diffs(&persisted.action.diffs);
        if !remaining.diffs.is_empty() {
            self.redo_stack.push(remaining);
        }
        self.undo_stack.push(persisted.action.clone());
        Err(HistoryError::PartiallyApplied(persisted.failure_summary()))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all undo/redo history and any open transaction
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.transaction = None;
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|action| action.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(|action| action.label.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onlook_common::{invert_diffs, CodeDiff};
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Records calls; persists everything
    #[derive(Default)]
    struct Recorder {
        previews: Mutex<Vec<Action>>,
        persists: Mutex<Vec<Action>>,
    }

    #[async_trait]
    impl ActionExecutor for Recorder {
        async fn preview(&self, action: &Action) -> Result<(), ExecutionError> {
            self.previews.lock().unwrap().push(action.clone());
            Ok(())
        }

        async fn persist(&self, action: &Action) -> Result<Persisted, ExecutionError> {
            self.persists.lock().unwrap().push(action.clone());
            Ok(Persisted::complete(action.clone()))
        }
    }

    /// Persists everything except diffs to the `failing` paths
    #[derive(Default)]
    struct Selective {
        failing: Mutex<Vec<PathBuf>>,
    }

    impl Selective {
        fn fail(&self, path: &str) {
            self.failing.lock().unwrap().push(PathBuf::from(path));
        }

        fn heal(&self) {
            self.failing.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl ActionExecutor for Selective {
        async fn preview(&self, _action: &Action) -> Result<(), ExecutionError> {
            Ok(())
        }

        async fn persist(&self, action: &Action) -> Result<Persisted, ExecutionError> {
            let failing = self.failing.lock().unwrap();
            let (applied, failed): (Vec<CodeDiff>, Vec<CodeDiff>) = action
                .diffs
                .iter()
                .cloned()
                .partition(|diff| !failing.contains(&diff.path));
            Ok(Persisted {
                action: Action {
                    inverse_diffs: invert_diffs(&applied),
                    diffs: applied,
                    ..action.clone()
                },
                failures: failed.iter().map(|diff| diff.path.display().to_string()).collect(),
            })
        }
    }

    fn edit(n: usize) -> Action {
        Action::code(format!("edit {}", n), vec![CodeDiff::new("/a", format!("{}", n), format!("{}", n + 1))])
    }

    #[tokio::test]
    async fn test_history_creation() {
        let history = History::new();
        assert_eq!(history.undo_levels(), 0);
        assert_eq!(history.redo_levels(), 0);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[tokio::test]
    async fn test_run_undo_redo() {
        let exec = Recorder::default();
        let mut history = History::new();

        history.run(edit(1), &exec).await.unwrap();
        assert_eq!(history.undo_label(), Some("edit 1"));

        assert!(history.undo(&exec).await.unwrap());
        assert_eq!(history.undo_levels(), 0);
        assert_eq!(history.redo_levels(), 1);
        assert_eq!(exec.persists.lock().unwrap()[1].diffs, vec![CodeDiff::new("/a", "2", "1")]);

        assert!(history.redo(&exec).await.unwrap());
        assert_eq!(history.undo_levels(), 1);
        assert_eq!(history.redo_levels(), 0);

        assert!(!history.redo(&exec).await.unwrap());
    }

    #[tokio::test]
    async fn test_new_action_clears_redo() {
        let exec = Recorder::default();
        let mut history = History::new();

        history.run(edit(1), &exec).await.unwrap();
        history.undo(&exec).await.unwrap();
        assert_eq!(history.redo_levels(), 1);

        history.run(edit(5), &exec).await.unwrap();
        assert_eq!(history.redo_levels(), 0);
    }

    #[tokio::test]
    async fn test_record_skips_executor() {
        let exec = Recorder::default();
        let mut history = History::new();
        history.record(edit(1));
        history.record(Action::code("empty", vec![]));

        assert_eq!(history.undo_levels(), 1);
        assert!(exec.persists.lock().unwrap().is_empty());
        assert!(history.undo(&exec).await.unwrap());
    }

    #[tokio::test]
    async fn test_max_levels_enforced() {
        let exec = Recorder::default();
        let mut history = History::with_max_levels(2);
        for n in 0..3 {
            history.run(edit(n), &exec).await.unwrap();
        }
        assert_eq!(history.undo_levels(), 2);
        assert_eq!(history.undo_label(), Some("edit 2"));
    }

    #[tokio::test]
    async fn test_transaction_previews_then_persists_once() {
        let exec = Recorder::default();
        let mut history = History::new();

        history.start_transaction(&exec).await.unwrap();
        history.run(edit(1), &exec).await.unwrap();
        history.run(edit(2), &exec).await.unwrap();
        assert_eq!(exec.previews.lock().unwrap().len(), 2);
        assert!(exec.persists.lock().unwrap().is_empty());

        assert!(history.commit_transaction(&exec).await.unwrap());
        assert_eq!(exec.persists.lock().unwrap().len(), 1);
        assert_eq!(history.undo_levels(), 1);
        assert!(!history.in_transaction());
    }

    #[tokio::test]
    async fn test_nested_start_commits_open_transaction() {
        let exec = Recorder::default();
        let mut history = History::new();

        history.start_transaction(&exec).await.unwrap();
        history.run(edit(1), &exec).await.unwrap();
        history.start_transaction(&exec).await.unwrap();

        assert_eq!(history.undo_levels(), 1);
        assert!(history.in_transaction());
    }

    #[tokio::test]
    async fn test_abandon_reverts_preview_without_writing() {
        let exec = Recorder::default();
        let mut history = History::new();

        history.start_transaction(&exec).await.unwrap();
        history.run(edit(1), &exec).await.unwrap();
        assert!(history.abandon_transaction(&exec).await.unwrap());

        assert!(exec.persists.lock().unwrap().is_empty());
        let previews = exec.previews.lock().unwrap();
        assert_eq!(previews.last().unwrap().diffs, vec![CodeDiff::new("/a", "2", "1")]);
        assert_eq!(history.undo_levels(), 0);
    }

    #[tokio::test]
    async fn test_empty_commit_records_nothing() {
        let exec = Recorder::default();
        let mut history = History::new();
        history.start_transaction(&exec).await.unwrap();
        assert!(!history.commit_transaction(&exec).await.unwrap());
        assert_eq!(history.undo_levels(), 0);
    }

    fn two_files() -> (CodeDiff, CodeDiff, Action) {
        let a = CodeDiff::new("/a", "1", "2");
        let b = CodeDiff::new("/b", "x", "y");
        let action = Action::code("edit both", vec![a.clone(), b.clone()]);
        (a, b, action)
    }

    #[tokio::test]
    async fn test_partial_run_records_applied_part() {
        let exec = Selective::default();
        let mut history = History::new();
        let (_, _, action) = two_files();

        exec.fail("/b");
        let err = history.run(action, &exec).await.unwrap_err();
        assert!(matches!(err, HistoryError::PartiallyApplied(_)));
        assert_eq!(history.undo_levels(), 1);

        exec.heal();
        assert!(history.undo(&exec).await.unwrap());
        assert_eq!(history.redo_levels(), 1);
        assert!(!history.can_undo());
    }

    #[tokio::test]
    async fn test_partial_undo_splits_action() {
        let exec = Selective::default();
        let mut history = History::new();
        let (a, b, action) = two_files();
        history.run(action, &exec).await.unwrap();

        exec.fail("/b");
        let err = history.undo(&exec).await.unwrap_err();
        assert!(matches!(err, HistoryError::PartiallyApplied(_)));

        // "/b" is still edited on disk: only its diff stays undoable
        assert_eq!(history.undo_levels(), 1);
        assert_eq!(history.undo_stack[0].diffs, vec![b.clone()]);
        assert_eq!(history.undo_stack[0].inverse_diffs, vec![b.inverse()]);

        // Only the reverted "/a" diff can be redone
        assert_eq!(history.redo_levels(), 1);
        assert_eq!(history.redo_stack[0].diffs, vec![a.clone()]);
        assert_eq!(history.redo_stack[0].inverse_diffs, vec![a.inverse()]);

        exec.heal();
        assert!(history.undo(&exec).await.unwrap());
        assert!(!history.can_undo());
        assert_eq!(history.redo_levels(), 2);
    }

    #[tokio::test]
    async fn test_partial_redo_splits_action() {
        let exec = Selective::default();
        let mut history = History::new();
        let (a, b, action) = two_files();
        history.run(action, &exec).await.unwrap();
        history.undo(&exec).await.unwrap();

        exec.fail("/b");
        let err = history.redo(&exec).await.unwrap_err();
        assert!(matches!(err, HistoryError::PartiallyApplied(_)));

        assert_eq!(history.undo_levels(), 1);
        assert_eq!(history.undo_stack[0].diffs, vec![a.clone()]);
        assert_eq!(history.undo_stack[0].inverse_diffs, vec![a.inverse()]);
        assert_eq!(history.redo_levels(), 1);
        assert_eq!(history.redo_stack[0].diffs, vec![b]);
    }

    #[tokio::test]
    async fn test_failed_undo_keeps_action() {
        let exec = Selective::default();
        let mut history = History::new();
        history.run(edit(1), &exec).await.unwrap();

        exec.fail("/a");
        let err = history.undo(&exec).await.unwrap_err();
        assert!(matches!(err, HistoryError::NothingApplied(_)));
        assert_eq!(history.undo_levels(), 1);
        assert_eq!(history.redo_levels(), 0);
    }
}
