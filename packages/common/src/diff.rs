use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Literal text patch: `original` is replaced by `generated` in `path`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDiff {
    pub path: PathBuf,
    pub original: String,
    pub generated: String,
}

impl CodeDiff {
    pub fn new(path: impl Into<PathBuf>, original: impl Into<String>, generated: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            original: original.into(),
            generated: generated.into(),
        }
    }

    pub fn inverse(&self) -> Self {
        Self {
            path: self.path.clone(),
            original: self.generated.clone(),
            generated: self.original.clone(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.original == self.generated
    }

    /// Replaces the single occurrence of `original` in `text`
    pub fn apply_to(&self, text: &str) -> Result<String, DiffMismatch> {
        let mut matches = text.match_indices(self.original.as_str());
        let Some((start, _)) = matches.next() else {
            return Err(DiffMismatch::Missing);
        };
        let extra = matches.count();
        if extra > 0 {
            return Err(DiffMismatch::Ambiguous(extra + 1));
        }
        let mut out = String::with_capacity(text.len() + self.generated.len());
        out.push_str(&text[..start]);
        out.push_str(&self.generated);
        out.push_str(&text[start + self.original.len()..]);
        Ok(out)
    }
}

/// Why a diff's `original` could not be located
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffMismatch {
    Missing,
    Ambiguous(usize),
}

impl std::fmt::Display for DiffMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffMismatch::Missing => write!(f, "original text not found"),
            DiffMismatch::Ambiguous(count) => write!(f, "original text found {} times", count),
        }
    }
}

/// Inverse of a diff sequence: each diff swapped, in reverse order
pub fn invert_diffs(diffs: &[CodeDiff]) -> Vec<CodeDiff> {
    diffs.iter().rev().map(CodeDiff::inverse).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

/// Element to create in source
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewElement {
    pub tag_name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Minted on insert when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(default)]
    pub children: Vec<NewElement>,
    /// Pasted source used verbatim instead of generating from the fields above
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_block: Option<String>,
}

impl NewElement {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertedElement {
    pub index: usize,
    pub element: NewElement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovedElement {
    pub oid: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedElement {
    pub oid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedElements {
    pub container: NewElement,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UngroupedElement {
    pub oid: String,
}

/// Structural edits under the request's element. Removed and moved entries
/// name the affected child; inserts, move targets and groups are placed
/// under the request's element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureChanges {
    #[serde(default)]
    pub inserted: Vec<InsertedElement>,
    #[serde(default)]
    pub moved: Vec<MovedElement>,
    #[serde(default)]
    pub removed: Vec<RemovedElement>,
    #[serde(default)]
    pub grouped: Vec<GroupedElements>,
    #[serde(default)]
    pub ungrouped: Vec<UngroupedElement>,
}

impl StructureChanges {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
            && self.moved.is_empty()
            && self.removed.is_empty()
            && self.grouped.is_empty()
            && self.ungrouped.is_empty()
    }
}

/// Semantic edit request for one element, in wire form
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeDiffRequest {
    pub oid: String,
    /// `null` removes the attribute
    #[serde(default)]
    pub attributes: BTreeMap<String, Option<AttributeValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(default)]
    pub override_classes: bool,
    #[serde(default, skip_serializing_if = "StructureChanges::is_empty")]
    pub structure_changes: StructureChanges,
}

/// One closed edit, lowered from a [`CodeDiffRequest`]
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    AttributeSet {
        name: String,
        value: Option<AttributeValue>,
    },
    ClassMerge {
        classes: String,
        override_classes: bool,
    },
    TextSet {
        text: String,
    },
    StructuralInsert {
        index: usize,
        element: NewElement,
    },
    StructuralMove {
        oid: String,
        index: usize,
    },
    StructuralRemove {
        oid: String,
    },
    StructuralGroup {
        container: NewElement,
        children: Vec<String>,
    },
    StructuralUngroup {
        oid: String,
    },
}

impl Edit {
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            Edit::AttributeSet { .. } | Edit::ClassMerge { .. } | Edit::TextSet { .. }
        )
    }
}

pub fn is_class_attribute(name: &str) -> bool {
    name == "className" || name == "class"
}

impl CodeDiffRequest {
    pub fn new(oid: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Option<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_classes(mut self, classes: impl Into<String>, override_classes: bool) -> Self {
        self.attributes.insert(
            "className".to_string(),
            Some(AttributeValue::Text(classes.into())),
        );
        self.override_classes = override_classes;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// Closed edit list: attribute and text edits first, then structural
    /// edits with removes and moves ahead of inserts, groups and ungroups.
    pub fn edits(&self) -> Vec<Edit> {
        let mut edits = Vec::new();
        for (name, value) in &self.attributes {
            match value {
                Some(AttributeValue::Text(classes)) if is_class_attribute(name) => {
                    edits.push(Edit::ClassMerge {
                        classes: classes.clone(),
                        override_classes: self.override_classes,
                    })
                }
                _ => edits.push(Edit::AttributeSet {
                    name: name.clone(),
                    value: value.clone(),
                }),
            }
        }
        if let Some(text) = &self.text_content {
            edits.push(Edit::TextSet { text: text.clone() });
        }

        let structure = &self.structure_changes;
        edits.extend(structure.removed.iter().map(|removed| Edit::StructuralRemove {
            oid: removed.oid.clone(),
        }));
        edits.extend(structure.moved.iter().map(|moved| Edit::StructuralMove {
            oid: moved.oid.clone(),
            index: moved.index,
        }));
        edits.extend(structure.inserted.iter().map(|inserted| Edit::StructuralInsert {
            index: inserted.index,
            element: inserted.element.clone(),
        }));
        edits.extend(structure.grouped.iter().map(|grouped| Edit::StructuralGroup {
            container: grouped.container.clone(),
            children: grouped.children.clone(),
        }));
        edits.extend(structure.ungrouped.iter().map(|ungrouped| Edit::StructuralUngroup {
            oid: ungrouped.oid.clone(),
        }));
        edits
    }
}
