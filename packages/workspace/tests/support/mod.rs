//! Scripted rendering surface and an in-memory project
#![allow(dead_code)]

use async_trait::async_trait;
use onlook_common::{DomElement, MemoryFileSystem, Rect, StyleChange};
use onlook_workspace::{RenderSurface, SurfaceError, Workspace, WorkspaceConfig};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct FakeSurface {
    id: String,
    pub elements: Mutex<HashMap<String, DomElement>>,
    pub instrumented: AtomicBool,
    /// Every query sleeps this long first
    pub latency: Mutex<Option<Duration>>,
    pub styles: Mutex<Vec<StyleChange>>,
    pub reloads: AtomicUsize,
    pub resyncs: AtomicUsize,
}

impl FakeSurface {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            elements: Mutex::new(HashMap::new()),
            instrumented: AtomicBool::new(true),
            latency: Mutex::new(None),
            styles: Mutex::new(Vec::new()),
            reloads: AtomicUsize::new(0),
            resyncs: AtomicUsize::new(0),
        })
    }

    pub fn add(&self, oid: &str, parent: Option<&str>, rect: Rect) {
        let element = DomElement {
            oid: oid.into(),
            dom_id: format!("dom-{}", oid),
            selector: DomElement::oid_selector(oid),
            tag_name: "DIV".into(),
            rect,
            parent_oid: parent.map(String::from),
            ..Default::default()
        };
        let mut elements = self.elements.lock().unwrap();
        if let Some(parent) = parent.and_then(|p| elements.get_mut(p)) {
            parent.child_oids.push(oid.into());
        }
        elements.insert(oid.into(), element);
    }

    pub fn set_style(&self, oid: &str, property: &str, value: &str) {
        if let Some(element) = self.elements.lock().unwrap().get_mut(oid) {
            element.computed_styles.insert(property.into(), value.into());
        }
    }

    async fn pause(&self) {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn by_selector(&self, selector: &str) -> Option<DomElement> {
        let oid = selector
            .strip_prefix("[data-oid=\"")
            .and_then(|rest| rest.strip_suffix("\"]"))?;
        self.elements.lock().unwrap().get(oid).cloned()
    }
}

#[async_trait]
impl RenderSurface for FakeSurface {
    fn id(&self) -> &str {
        &self.id
    }

    async fn get_element_at_point(
        &self,
        x: f64,
        y: f64,
        _deep: bool,
    ) -> Result<Option<DomElement>, SurfaceError> {
        self.pause().await;
        let elements = self.elements.lock().unwrap();
        // Smallest hit wins
        Ok(elements
            .values()
            .filter(|element| element.rect.contains(x, y))
            .min_by(|a, b| {
                (a.rect.width * a.rect.height)
                    .partial_cmp(&(b.rect.width * b.rect.height))
                    .unwrap()
            })
            .cloned())
    }

    async fn get_element_by_selector(
        &self,
        selector: &str,
    ) -> Result<Option<DomElement>, SurfaceError> {
        self.pause().await;
        Ok(self.by_selector(selector))
    }

    async fn get_element_index(&self, selector: &str) -> Result<Option<usize>, SurfaceError> {
        self.pause().await;
        let Some(element) = self.by_selector(selector) else {
            return Ok(None);
        };
        let elements = self.elements.lock().unwrap();
        Ok(element
            .parent_oid
            .and_then(|parent| elements.get(&parent).cloned())
            .and_then(|parent| parent.child_oids.iter().position(|oid| *oid == element.oid)))
    }

    async fn get_parent_element(
        &self,
        selector: &str,
    ) -> Result<Option<DomElement>, SurfaceError> {
        self.pause().await;
        let parent = self.by_selector(selector).and_then(|element| element.parent_oid);
        Ok(parent.and_then(|oid| self.elements.lock().unwrap().get(&oid).cloned()))
    }

    async fn probe_instrumentation(&self) -> Result<bool, SurfaceError> {
        self.pause().await;
        Ok(self.instrumented.load(Ordering::SeqCst))
    }

    async fn apply_styles(&self, changes: &[StyleChange]) -> Result<(), SurfaceError> {
        self.styles.lock().unwrap().extend(changes.iter().cloned());
        Ok(())
    }

    async fn reload(&self) -> Result<(), SurfaceError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn resync(&self) -> Result<(), SurfaceError> {
        self.resyncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Rect {
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Workspace over an in-memory project
pub async fn project(files: &[(&str, &str)]) -> (Arc<MemoryFileSystem>, Workspace) {
    project_with(WorkspaceConfig::default(), files).await
}

pub async fn project_with(
    config: WorkspaceConfig,
    files: &[(&str, &str)],
) -> (Arc<MemoryFileSystem>, Workspace) {
    let fs = Arc::new(MemoryFileSystem::new());
    for (path, text) in files {
        fs.insert(*path, *text);
    }
    let workspace = Workspace::new("/app", config, fs.clone());
    workspace.registry().index_paths(fs.paths()).await;
    (fs, workspace)
}

/// Registers `surface` and drives it to the editable state
pub async fn attach(workspace: &Workspace, surface: Arc<FakeSurface>) {
    let hub = workspace.hub().clone();
    hub.register(surface.clone()).await;
    hub.process_started(surface.id());
    hub.dom_ready(surface.id()).await;
}

pub fn read(fs: &MemoryFileSystem, path: &str) -> String {
    fs.contents(Path::new(path)).unwrap_or_default()
}
