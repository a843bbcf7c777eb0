use crate::dom::SurfaceId;
use serde::{Deserialize, Serialize};

/// Before/after pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change<T> {
    pub original: T,
    pub updated: T,
}

impl<T: Clone> Change<T> {
    pub fn new(original: T, updated: T) -> Self {
        Self { original, updated }
    }

    pub fn inverse(&self) -> Self {
        Self {
            original: self.updated.clone(),
            updated: self.original.clone(),
        }
    }
}

/// One inline style property change on one rendered element.
/// `None` means the property is unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleChange {
    pub surface_id: SurfaceId,
    pub oid: String,
    pub dom_id: String,
    pub property: String,
    pub change: Change<Option<String>>,
}

impl StyleChange {
    pub fn new(
        surface_id: impl Into<SurfaceId>,
        oid: impl Into<String>,
        dom_id: impl Into<String>,
        property: impl Into<String>,
        original: Option<String>,
        updated: Option<String>,
    ) -> Self {
        Self {
            surface_id: surface_id.into(),
            oid: oid.into(),
            dom_id: dom_id.into(),
            property: property.into(),
            change: Change::new(original, updated),
        }
    }

    pub fn inverse(&self) -> Self {
        Self {
            change: self.change.inverse(),
            ..self.clone()
        }
    }

    /// Same element and property
    pub fn same_target(&self, other: &StyleChange) -> bool {
        self.surface_id == other.surface_id
            && self.oid == other.oid
            && self.dom_id == other.dom_id
            && self.property == other.property
    }
}
