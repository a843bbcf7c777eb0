//! # Onlook Editor
//!
//! Turns visual edits into source patches and keeps them undoable.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: .tsx / .html text → element tree    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: edit requests → code diffs          │
//! │  - attribute / class / text patches         │
//! │  - insert, move, remove, group, ungroup     │
//! │  - actions with undo / redo / transactions  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ workspace: write-back, surfaces, mirror     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Source is the truth**: the rendered page is a derived view
//! 2. **Minimal patches**: a diff covers only the region the edit touched
//! 3. **Exact inverses**: applying a diff's inverse restores the bytes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use onlook_common::CodeDiffRequest;
//! use onlook_editor::compile;
//!
//! let request = CodeDiffRequest::new("a1b2c3d").with_classes("p-4", false);
//! let diffs = compile(&node, &source, &request)?;
//! ```

mod action;
pub mod classes;
pub mod codegen;
mod compiler;
mod errors;
mod history;

pub use action::Action;
pub use compiler::{compile, DiffCompiler};
pub use errors::{CompileError, CompileResult, ExecutionError, HistoryError};
pub use history::{ActionExecutor, History, Persisted};
