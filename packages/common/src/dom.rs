use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of one rendering surface (a preview frame)
pub type SurfaceId = String;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && y >= self.y && x <= self.x + self.width && y <= self.y + self.height
    }
}

/// Whether style edits on a component instance target the instance or the
/// component's own root element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StyleMode {
    #[default]
    Instance,
    Root,
}

/// Point-in-time snapshot of a rendered element
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomElement {
    pub oid: String,
    pub dom_id: String,
    pub selector: String,
    pub tag_name: String,
    pub rect: Rect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_oid: Option<String>,
    #[serde(default)]
    pub child_oids: Vec<String>,
    /// Oid of the component usage site when this element is a component root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub text_content: String,
    #[serde(default)]
    pub computed_styles: BTreeMap<String, String>,
}

impl DomElement {
    pub fn target_oid(&self, mode: StyleMode) -> &str {
        match (mode, &self.instance_id) {
            (StyleMode::Instance, Some(instance)) => instance,
            _ => &self.oid,
        }
    }

    pub fn oid_selector(oid: &str) -> String {
        format!("[{}=\"{}\"]", onlook_parser::OID_ATTRIBUTE, oid)
    }
}
