//! # Workspace
//!
//! The operations the rest of the editor calls. Ties the registry, the
//! compiler, write-back, the surfaces and the history together.
//!
//! ## Ordering
//!
//! - History-recorded edits run under the history lock, one at a time
//! - Edits to a file hold that file's lock from compile through write-back,
//!   so a second edit compiles against the text the first one wrote
//! - Locks are always taken history first, then files in path order
//! - An open transaction keeps a working copy of every file it touched;
//!   its code edits compile against that copy, so each step builds on the
//!   text the previous ones produced

use crate::config::WorkspaceConfig;
use crate::error::{RegistryError, WorkspaceError, WorkspaceResult};
use crate::mirror::ElementMirror;
use crate::opener::{CommandOpener, LoggingOpener, SourceOpener};
use crate::registry::TemplateRegistry;
use crate::surface::SurfaceHub;
use crate::watcher::{changed_paths, FileWatcher};
use crate::writer::{ApplyReport, DiffWriter, FileGuards};
use async_trait::async_trait;
use onlook_common::{
    invert_diffs, CodeDiff, CodeDiffRequest, FileSystem, RealFileSystem, StyleChange, StyleMode,
    TemplateNode,
};
use onlook_editor::classes::apply_styles;
use onlook_editor::{
    Action, ActionExecutor, CompileError, DiffCompiler, ExecutionError, History, Persisted,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub struct Workspace {
    root: PathBuf,
    config: WorkspaceConfig,
    fs: Arc<dyn FileSystem>,
    registry: Arc<TemplateRegistry>,
    writer: Arc<DiffWriter>,
    hub: Arc<SurfaceHub>,
    mirror: Arc<ElementMirror>,
    history: Mutex<History>,
    /// Working text of the open transaction. Taken after the history lock.
    working: Mutex<Option<DiffCompiler>>,
    opener: Arc<dyn SourceOpener>,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, config: WorkspaceConfig, fs: Arc<dyn FileSystem>) -> Self {
        let root = root.into();
        let registry = Arc::new(TemplateRegistry::new(root.clone(), config.clone(), fs.clone()));
        let writer = Arc::new(DiffWriter::new(fs.clone(), registry.clone()));
        let hub = Arc::new(SurfaceHub::new(&config));
        let mirror = Arc::new(ElementMirror::new(hub.clone()));
        let opener: Arc<dyn SourceOpener> = match &config.editor_command {
            Some(program) => Arc::new(CommandOpener::new(program.clone())),
            None => Arc::new(LoggingOpener),
        };
        Self {
            history: Mutex::new(History::with_max_levels(config.history_depth)),
            working: Mutex::new(None),
            root,
            config,
            fs,
            registry,
            writer,
            hub,
            mirror,
            opener,
        }
    }

    /// Opens a project on disk: loads its config and indexes it
    pub async fn open(root: impl Into<PathBuf>) -> WorkspaceResult<Self> {
        let root = root.into();
        let config = WorkspaceConfig::load(&root)?;
        let workspace = Self::new(root, config, Arc::new(RealFileSystem));
        workspace.registry.index_project().await;
        Ok(workspace)
    }

    pub fn with_opener(mut self, opener: Arc<dyn SourceOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    pub fn hub(&self) -> &Arc<SurfaceHub> {
        &self.hub
    }

    pub fn mirror(&self) -> &Arc<ElementMirror> {
        &self.mirror
    }

    // ---- queries ----

    /// `None` when no element carries `oid`
    pub async fn get_template_node_by_id(&self, oid: &str) -> WorkspaceResult<Option<TemplateNode>> {
        match self.registry.resolve(oid).await {
            Ok(node) => Ok(Some(node)),
            Err(RegistryError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Compiles requests against current source without writing
    pub async fn get_code_diffs(&self, requests: &[CodeDiffRequest]) -> WorkspaceResult<Vec<CodeDiff>> {
        let nodes = self.resolve_requests(requests).await?;
        let guards = self.writer.locks().lock_all(node_paths(&nodes)).await;
        self.compile_held(requests, nodes, &guards).await
    }

    // ---- edits ----

    /// Compiles and writes one gesture's requests. With `record_history`
    /// the applied diffs become one undo step; inside an open transaction
    /// they are deferred to its commit.
    pub async fn get_and_write_code_diff(
        &self,
        requests: &[CodeDiffRequest],
        record_history: bool,
    ) -> WorkspaceResult<bool> {
        if requests.is_empty() {
            return Ok(false);
        }
        if !record_history {
            let report = self.compile_and_write(requests).await?;
            return finish(report);
        }

        let mut history = self.history.lock().await;
        if history.in_transaction() {
            let (diffs, compiler) = self.compile_in_transaction(requests).await?;
            history
                .run(Action::code(describe(requests), diffs), &self.executor())
                .await?;
            *self.working.lock().await = Some(compiler);
            return Ok(true);
        }
        let report = self.compile_and_write(requests).await?;
        history.record(Action::code(describe(requests), report.applied.clone()));
        finish(report)
    }

    /// Writes literal diffs; not recorded in history
    pub async fn run_code_diffs(&self, diffs: &[CodeDiff]) -> WorkspaceResult<bool> {
        if diffs.is_empty() {
            return Ok(false);
        }
        let report = self.writer.apply(diffs).await;
        self.after_write(&report).await;
        finish(report)
    }

    /// Previews inline styles on an element and, outside a transaction,
    /// persists them as utility classes
    pub async fn update_style(
        &self,
        surface_id: &str,
        oid: &str,
        mode: StyleMode,
        styles: &[(&str, Option<&str>)],
    ) -> WorkspaceResult<()> {
        let element = self
            .mirror
            .snapshot(surface_id, oid)
            .await?
            .ok_or_else(|| RegistryError::NotFound(oid.to_string()))?;
        let target = element.target_oid(mode).to_string();
        let changes: Vec<StyleChange> = styles
            .iter()
            .map(|(property, value)| {
                StyleChange::new(
                    surface_id,
                    target.clone(),
                    element.dom_id.clone(),
                    *property,
                    element.computed_styles.get(*property).cloned(),
                    value.map(String::from),
                )
            })
            .collect();

        let mut history = self.history.lock().await;
        history
            .run(Action::style("Update style", changes), &self.executor())
            .await?;
        Ok(())
    }

    /// Opens the element's source location. `false` when it is unknown.
    pub async fn view_source(&self, oid: &str) -> WorkspaceResult<bool> {
        match self.registry.element_location(oid).await {
            Ok(location) => {
                self.opener.open(&location).await?;
                Ok(true)
            }
            Err(RegistryError::NotFound(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    // ---- history ----

    pub async fn start_transaction(&self) -> WorkspaceResult<()> {
        let mut history = self.history.lock().await;
        let started = history.start_transaction(&self.executor()).await;
        *self.working.lock().await = None;
        started?;
        Ok(())
    }

    pub async fn commit_transaction(&self) -> WorkspaceResult<bool> {
        let mut history = self.history.lock().await;
        let committed = history.commit_transaction(&self.executor()).await;
        *self.working.lock().await = None;
        Ok(committed?)
    }

    pub async fn abandon_transaction(&self) -> WorkspaceResult<bool> {
        let mut history = self.history.lock().await;
        *self.working.lock().await = None;
        Ok(history.abandon_transaction(&self.executor()).await?)
    }

    pub async fn undo(&self) -> WorkspaceResult<bool> {
        let mut history = self.history.lock().await;
        Ok(history.undo(&self.executor()).await?)
    }

    pub async fn redo(&self) -> WorkspaceResult<bool> {
        let mut history = self.history.lock().await;
        Ok(history.redo(&self.executor()).await?)
    }

    pub async fn can_undo(&self) -> bool {
        self.history.lock().await.can_undo()
    }

    pub async fn can_redo(&self) -> bool {
        self.history.lock().await.can_redo()
    }

    pub async fn undo_label(&self) -> Option<String> {
        self.history.lock().await.undo_label().map(String::from)
    }

    pub async fn in_transaction(&self) -> bool {
        self.history.lock().await.in_transaction()
    }

    // ---- external edits ----

    /// Invalidates registry entries for source files changed outside the
    /// editor, until the returned task is aborted
    pub fn watch_external_edits(&self) -> WorkspaceResult<JoinHandle<()>> {
        let mut watcher = FileWatcher::new(&self.root)?;
        let registry = self.registry.clone();
        let config = self.config.clone();
        let root = self.root.clone();

        Ok(tokio::spawn(async move {
            while let Some(event) = watcher.next_event().await {
                for path in changed_paths(&event) {
                    let relative = path.strip_prefix(&root).unwrap_or(&path);
                    if config.is_source_file(&path) && !config.is_ignored_path(relative) {
                        registry.invalidate(&path).await;
                    }
                }
            }
        }))
    }

    // ---- internals ----

    fn executor(&self) -> WorkspaceExecutor<'_> {
        WorkspaceExecutor { workspace: self }
    }

    async fn resolve_requests(&self, requests: &[CodeDiffRequest]) -> WorkspaceResult<Vec<TemplateNode>> {
        let mut nodes = Vec::with_capacity(requests.len());
        for request in requests {
            nodes.push(self.registry.resolve(&request.oid).await?);
        }
        Ok(nodes)
    }

    async fn compile_and_write(&self, requests: &[CodeDiffRequest]) -> WorkspaceResult<ApplyReport> {
        let nodes = self.resolve_requests(requests).await?;
        let guards = self.writer.locks().lock_all(node_paths(&nodes)).await;
        let diffs = self.compile_held(requests, nodes, &guards).await?;
        let report = self.writer.apply_held(&diffs, &guards).await;
        drop(guards);
        self.after_write(&report).await;
        Ok(report)
    }

    /// Compiles with the nodes' files locked. A stale node is re-resolved
    /// and compiled once more.
    async fn compile_held(
        &self,
        requests: &[CodeDiffRequest],
        nodes: Vec<TemplateNode>,
        guards: &FileGuards,
    ) -> WorkspaceResult<Vec<CodeDiff>> {
        let mut compiler = DiffCompiler::new();
        for (request, node) in requests.iter().zip(nodes) {
            self.load_source(&mut compiler, &node.path).await?;
            match compiler.compile(&node, request) {
                Ok(_) => {}
                Err(CompileError::StaleSource { oid, path }) => {
                    tracing::warn!(oid = %oid, path = ?path, "stale source, re-resolving");
                    self.registry.invalidate(&path).await;
                    let changed = || WorkspaceError::ChangedExternally {
                        oid: oid.clone(),
                        path: path.clone(),
                    };
                    let fresh = match self.registry.resolve(&oid).await {
                        Ok(fresh) if guards.holds(&fresh.path) => fresh,
                        Ok(_) | Err(RegistryError::NotFound(_)) => return Err(changed()),
                        Err(err) => return Err(err.into()),
                    };
                    self.load_source(&mut compiler, &fresh.path).await?;
                    match compiler.compile(&fresh, request) {
                        Ok(_) => {}
                        Err(CompileError::StaleSource { .. }) => return Err(changed()),
                        Err(err) => return Err(err.into()),
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(compiler.finish())
    }

    /// Compiles against the open transaction's working copy, seeded from
    /// disk the first time a file is touched. Returns the advanced copy;
    /// the caller stores it once the step is part of the transaction.
    async fn compile_in_transaction(
        &self,
        requests: &[CodeDiffRequest],
    ) -> WorkspaceResult<(Vec<CodeDiff>, DiffCompiler)> {
        let nodes = self.resolve_requests(requests).await?;
        let guards = self.writer.locks().lock_all(node_paths(&nodes)).await;
        let mut compiler = self.working.lock().await.clone().unwrap_or_default();

        let mut diffs = Vec::new();
        for (request, node) in requests.iter().zip(&nodes) {
            self.load_source(&mut compiler, &node.path).await?;
            match compiler.compile(node, request) {
                Ok(step) => diffs.extend(step),
                Err(CompileError::StaleSource { oid, path }) => {
                    return Err(WorkspaceError::ChangedExternally { oid, path })
                }
                Err(err) => return Err(err.into()),
            }
        }
        drop(guards);
        Ok((diffs, compiler))
    }

    async fn load_source(&self, compiler: &mut DiffCompiler, path: &Path) -> WorkspaceResult<()> {
        if !compiler.has_source(path) {
            let text = self.fs.read_to_string(path).await?;
            compiler.add_source(path, text);
        }
        Ok(())
    }

    async fn after_write(&self, report: &ApplyReport) {
        if report.applied.is_empty() {
            return;
        }
        self.mirror.clear();
        self.hub.resync_all().await;
    }
}

fn node_paths(nodes: &[TemplateNode]) -> Vec<PathBuf> {
    nodes.iter().map(|node| node.path.clone()).collect()
}

fn finish(report: ApplyReport) -> WorkspaceResult<bool> {
    report
        .into_result()
        .map(|applied| applied > 0)
        .map_err(WorkspaceError::Write)
}

fn describe(requests: &[CodeDiffRequest]) -> String {
    match requests {
        [request] if !request.structure_changes.is_empty() => "Edit structure".to_string(),
        [request] if request.text_content.is_some() => "Edit text".to_string(),
        [_] => "Edit attributes".to_string(),
        _ => format!("Edit {} elements", requests.len()),
    }
}

/// Carries history actions to the surfaces and to disk
struct WorkspaceExecutor<'a> {
    workspace: &'a Workspace,
}

impl WorkspaceExecutor<'_> {
    /// Class requests for style changes not yet in source
    async fn style_requests(
        &self,
        action: &Action,
        failures: &mut Vec<String>,
    ) -> Vec<(TemplateNode, CodeDiffRequest)> {
        let mut by_oid: Vec<(&str, Vec<(&str, Option<&str>)>)> = Vec::new();
        for style in &action.styles {
            let entry = (style.property.as_str(), style.change.updated.as_deref());
            match by_oid.iter_mut().find(|(oid, _)| *oid == style.oid) {
                Some((_, list)) => list.push(entry),
                None => by_oid.push((style.oid.as_str(), vec![entry])),
            }
        }

        let registry = &self.workspace.registry;
        let mut requests = Vec::new();
        for (oid, styles) in by_oid {
            let node = match registry.resolve(oid).await {
                Ok(node) => node,
                Err(err) => {
                    failures.push(format!("{}: {}", oid, err));
                    continue;
                }
            };
            let request = match registry.class_list(&node).await {
                // Expression values can only be extended
                Ok(list) if list.dynamic => {
                    CodeDiffRequest::new(oid).with_classes(apply_styles("", styles), false)
                }
                Ok(list) => CodeDiffRequest::new(oid)
                    .with_classes(apply_styles(&list.classes.join(" "), styles), true),
                Err(err) => {
                    failures.push(format!("{}: {}", oid, err));
                    continue;
                }
            };
            requests.push((node, request));
        }
        requests
    }
}

#[async_trait]
impl ActionExecutor for WorkspaceExecutor<'_> {
    async fn preview(&self, action: &Action) -> Result<(), ExecutionError> {
        self.workspace
            .hub
            .apply_styles(&action.styles)
            .await
            .map_err(|err| ExecutionError::new(err.to_string()))
    }

    async fn persist(&self, action: &Action) -> Result<Persisted, ExecutionError> {
        let workspace = self.workspace;
        let mut failures = Vec::new();

        if let Err(err) = workspace.hub.apply_styles(&action.styles).await {
            tracing::warn!(error = %err, "could not preview styles");
        }

        let requests = if action.has_pending_styles() {
            self.style_requests(action, &mut failures).await
        } else {
            Vec::new()
        };

        let paths = action
            .diffs
            .iter()
            .map(|diff| diff.path.clone())
            .chain(requests.iter().map(|(node, _)| node.path.clone()));
        let guards = workspace.writer.locks().lock_all(paths).await;

        let mut applied = Vec::new();
        if !action.diffs.is_empty() {
            let report = workspace.writer.apply_held(&action.diffs, &guards).await;
            failures.extend(report.failed.iter().map(ToString::to_string));
            applied.extend(report.applied);
        }

        if !requests.is_empty() {
            let mut compiler = DiffCompiler::new();
            for (node, request) in &requests {
                if let Err(err) = workspace.load_source(&mut compiler, &node.path).await {
                    failures.push(format!("{}: {}", request.oid, err));
                    continue;
                }
                if let Err(err) = compiler.compile(node, request) {
                    failures.push(format!("{}: {}", request.oid, err));
                }
            }
            let style_diffs = compiler.finish();
            if !style_diffs.is_empty() {
                let report = workspace.writer.apply_held(&style_diffs, &guards).await;
                failures.extend(report.failed.iter().map(ToString::to_string));
                applied.extend(report.applied);
            }
        }
        drop(guards);

        if !applied.is_empty() {
            workspace.mirror.clear();
            workspace.hub.resync_all().await;
        }

        Ok(Persisted {
            action: Action {
                label: action.label.clone(),
                styles: action.styles.clone(),
                inverse_diffs: invert_diffs(&applied),
                diffs: applied,
                styles_persisted: true,
                timestamp: action.timestamp,
            },
            failures,
        })
    }
}
