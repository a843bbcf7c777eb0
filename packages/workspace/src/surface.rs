//! Rendering surfaces
//!
//! [`RenderSurface`] is the request/response contract a live preview
//! exposes. [`SurfaceHub`] owns the registered surfaces, feeds their
//! lifecycle into the [`ReadinessMachine`] and puts a deadline on every
//! query.

use crate::config::{RetryPolicy, WorkspaceConfig};
use crate::error::SurfaceError;
use crate::readiness::{LifecycleEvent, ReadinessMachine, WebviewState};
use async_trait::async_trait;
use onlook_common::{DomElement, StyleChange, SurfaceId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[async_trait]
pub trait RenderSurface: Send + Sync {
    fn id(&self) -> &str;

    async fn get_element_at_point(
        &self,
        x: f64,
        y: f64,
        deep: bool,
    ) -> Result<Option<DomElement>, SurfaceError>;

    async fn get_element_by_selector(&self, selector: &str)
        -> Result<Option<DomElement>, SurfaceError>;

    /// Position among the element's siblings
    async fn get_element_index(&self, selector: &str) -> Result<Option<usize>, SurfaceError>;

    async fn get_parent_element(&self, selector: &str) -> Result<Option<DomElement>, SurfaceError>;

    /// Whether the page carries the editor's marker element
    async fn probe_instrumentation(&self) -> Result<bool, SurfaceError>;

    async fn apply_styles(&self, changes: &[StyleChange]) -> Result<(), SurfaceError>;

    async fn reload(&self) -> Result<(), SurfaceError>;

    /// Drops preview-only state after source has been rewritten
    async fn resync(&self) -> Result<(), SurfaceError>;
}

pub struct SurfaceHub {
    machine: Arc<ReadinessMachine>,
    surfaces: RwLock<HashMap<SurfaceId, Arc<dyn RenderSurface>>>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl SurfaceHub {
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            machine: Arc::new(ReadinessMachine::new()),
            surfaces: RwLock::new(HashMap::new()),
            timeout: config.surface_timeout(),
            retry: config.reload,
        }
    }

    pub fn machine(&self) -> &Arc<ReadinessMachine> {
        &self.machine
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn register(&self, surface: Arc<dyn RenderSurface>) {
        let id = surface.id().to_string();
        self.machine.register(&id);
        self.surfaces.write().await.insert(id.clone(), surface);
        tracing::info!(surface = %id, "surface registered");
    }

    pub async fn remove(&self, surface_id: &str) {
        self.surfaces.write().await.remove(surface_id);
        self.machine.remove(surface_id);
    }

    pub async fn surface(&self, surface_id: &str) -> Option<Arc<dyn RenderSurface>> {
        self.surfaces.read().await.get(surface_id).cloned()
    }

    pub async fn surface_ids(&self) -> Vec<SurfaceId> {
        let mut ids: Vec<SurfaceId> = self.surfaces.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn state(&self, surface_id: &str) -> WebviewState {
        self.machine.current_state(surface_id)
    }

    pub fn process_started(&self, surface_id: &str) {
        self.machine.handle(surface_id, LifecycleEvent::ProcessStarted);
    }

    pub fn navigation_started(&self, surface_id: &str) {
        self.machine.handle(surface_id, LifecycleEvent::NavigationStarted);
    }

    pub fn process_stopped(&self, surface_id: &str) {
        self.machine.handle(surface_id, LifecycleEvent::ProcessStopped);
    }

    /// Probes the new page and records whether it is editable. A page
    /// without instrumentation gets a delayed reload. Ignored unless a
    /// navigation is in progress.
    pub async fn dom_ready(self: &Arc<Self>, surface_id: &str) -> WebviewState {
        let instrumented = match self.surface(surface_id).await {
            Some(surface) => match tokio::time::timeout(self.timeout, surface.probe_instrumentation()).await {
                Ok(Ok(found)) => found,
                Ok(Err(err)) => {
                    tracing::warn!(surface = %surface_id, error = %err, "instrumentation probe failed");
                    false
                }
                Err(_) => {
                    tracing::warn!(surface = %surface_id, timeout = ?self.timeout, "instrumentation probe timed out");
                    false
                }
            },
            None => return self.state(surface_id),
        };

        let change = self
            .machine
            .handle(surface_id, LifecycleEvent::DomReady { instrumented });
        if matches!(&change, Some(change) if change.current == WebviewState::DomNoOnlook) {
            self.schedule_reload(surface_id);
        }
        self.state(surface_id)
    }

    fn schedule_reload(self: &Arc<Self>, surface_id: &str) {
        let Some(delay) = self.machine.next_reload_delay(surface_id, &self.retry) else {
            tracing::warn!(surface = %surface_id, "page still not instrumented, giving up on reloads");
            return;
        };
        tracing::info!(surface = %surface_id, delay = ?delay, "reloading uninstrumented page");

        let hub = Arc::clone(self);
        let surface_id = surface_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if hub.state(&surface_id) != WebviewState::DomNoOnlook {
                return;
            }
            let Some(surface) = hub.surface(&surface_id).await else {
                return;
            };
            hub.navigation_started(&surface_id);
            if let Err(err) = surface.reload().await {
                tracing::warn!(surface = %surface_id, error = %err, "reload failed");
            }
        });
    }

    /// Runs a query against an editable surface with the configured deadline
    pub async fn query<T, F, Fut>(&self, surface_id: &str, query: F) -> Result<T, SurfaceError>
    where
        F: FnOnce(Arc<dyn RenderSurface>) -> Fut,
        Fut: Future<Output = Result<T, SurfaceError>>,
    {
        if !self.machine.is_editable(surface_id) {
            return Err(SurfaceError::Unavailable(surface_id.to_string()));
        }
        let surface = self
            .surface(surface_id)
            .await
            .ok_or_else(|| SurfaceError::UnknownSurface(surface_id.to_string()))?;
        tokio::time::timeout(self.timeout, query(surface))
            .await
            .map_err(|_| SurfaceError::Timeout(self.timeout))?
    }

    /// Pushes style changes to their surfaces. Surfaces that are not
    /// editable are skipped.
    pub async fn apply_styles(&self, changes: &[StyleChange]) -> Result<(), SurfaceError> {
        let mut by_surface: Vec<(&str, Vec<StyleChange>)> = Vec::new();
        for change in changes {
            match by_surface
                .iter_mut()
                .find(|(id, _)| *id == change.surface_id.as_str())
            {
                Some((_, list)) => list.push(change.clone()),
                None => by_surface.push((change.surface_id.as_str(), vec![change.clone()])),
            }
        }

        for (surface_id, list) in by_surface {
            if !self.machine.is_editable(surface_id) {
                tracing::debug!(surface = %surface_id, "skipping styles for surface that is not ready");
                continue;
            }
            self.query(surface_id, |surface| async move { surface.apply_styles(&list).await })
                .await?;
        }
        Ok(())
    }

    /// Asks every editable surface to catch up with rewritten source
    pub async fn resync_all(&self) {
        for surface_id in self.surface_ids().await {
            if !self.machine.is_editable(&surface_id) {
                continue;
            }
            if let Err(err) = self
                .query(&surface_id, |surface| async move { surface.resync().await })
                .await
            {
                tracing::warn!(surface = %surface_id, error = %err, "resync failed");
            }
        }
    }
}
