//! Live Element Mirror
//!
//! Read-through snapshots of rendered elements. Every query goes to the
//! surface; the last answer per (surface, oid) is kept as a point-in-time
//! read until the surface changes state or source is rewritten.

use crate::error::SurfaceError;
use crate::surface::SurfaceHub;
use onlook_common::{DomElement, SurfaceId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Snapshot {
    generation: u64,
    element: DomElement,
}

pub struct ElementMirror {
    hub: Arc<SurfaceHub>,
    snapshots: Mutex<HashMap<(SurfaceId, String), Snapshot>>,
}

impl ElementMirror {
    pub fn new(hub: Arc<SurfaceHub>) -> Self {
        Self {
            hub,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    fn snapshots(&self) -> MutexGuard<'_, HashMap<(SurfaceId, String), Snapshot>> {
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh snapshot of the element carrying `oid`
    pub async fn snapshot(
        &self,
        surface_id: &str,
        oid: &str,
    ) -> Result<Option<DomElement>, SurfaceError> {
        let selector = DomElement::oid_selector(oid);
        let element = self
            .read(surface_id, |surface| async move {
                surface.get_element_by_selector(&selector).await
            })
            .await?;
        self.remember(surface_id, element.as_ref());
        Ok(element)
    }

    /// Hit-test at a canvas point
    pub async fn element_at(
        &self,
        surface_id: &str,
        x: f64,
        y: f64,
        deep: bool,
    ) -> Result<Option<DomElement>, SurfaceError> {
        let element = self
            .read(surface_id, |surface| async move {
                surface.get_element_at_point(x, y, deep).await
            })
            .await?;
        self.remember(surface_id, element.as_ref());
        Ok(element)
    }

    pub async fn children(&self, surface_id: &str, oid: &str) -> Result<Vec<String>, SurfaceError> {
        Ok(self
            .snapshot(surface_id, oid)
            .await?
            .map(|element| element.child_oids)
            .unwrap_or_default())
    }

    pub async fn parent(
        &self,
        surface_id: &str,
        oid: &str,
    ) -> Result<Option<DomElement>, SurfaceError> {
        let selector = DomElement::oid_selector(oid);
        let parent = self
            .read(surface_id, |surface| async move {
                surface.get_parent_element(&selector).await
            })
            .await?;
        self.remember(surface_id, parent.as_ref());
        Ok(parent)
    }

    pub async fn index_of(&self, surface_id: &str, oid: &str) -> Result<Option<usize>, SurfaceError> {
        let selector = DomElement::oid_selector(oid);
        self.read(surface_id, |surface| async move {
            surface.get_element_index(&selector).await
        })
        .await
    }

    /// Last snapshot taken since the surface last changed state
    pub fn cached(&self, surface_id: &str, oid: &str) -> Option<DomElement> {
        let generation = self.hub.machine().generation(surface_id);
        self.snapshots()
            .get(&(surface_id.to_string(), oid.to_string()))
            .filter(|snapshot| snapshot.generation == generation)
            .map(|snapshot| snapshot.element.clone())
    }

    pub fn clear(&self) {
        self.snapshots().clear();
    }

    fn remember(&self, surface_id: &str, element: Option<&DomElement>) {
        let Some(element) = element else {
            return;
        };
        let generation = self.hub.machine().generation(surface_id);
        let mut snapshots = self.snapshots();
        snapshots.retain(|(surface, _), snapshot| {
            surface != surface_id || snapshot.generation == generation
        });
        snapshots.insert(
            (surface_id.to_string(), element.oid.clone()),
            Snapshot {
                generation,
                element: element.clone(),
            },
        );
    }

    /// Gated, bounded query; every failure reads as unavailable
    async fn read<T, F, Fut>(&self, surface_id: &str, query: F) -> Result<T, SurfaceError>
    where
        F: FnOnce(Arc<dyn crate::surface::RenderSurface>) -> Fut,
        Fut: std::future::Future<Output = Result<T, SurfaceError>>,
    {
        self.hub.query(surface_id, query).await.map_err(|err| {
            tracing::debug!(surface = %surface_id, error = %err, "surface unavailable");
            SurfaceError::Unavailable(surface_id.to_string())
        })
    }
}
