use onlook_common::{invert_diffs, CodeDiff, StyleChange};
use serde::{Deserialize, Serialize};

/// An undoable unit: live style changes and/or source patches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub label: String,
    #[serde(default)]
    pub styles: Vec<StyleChange>,
    #[serde(default)]
    pub diffs: Vec<CodeDiff>,
    #[serde(default)]
    pub inverse_diffs: Vec<CodeDiff>,
    /// Set once `styles` are reflected in `diffs`
    #[serde(default)]
    pub styles_persisted: bool,
    pub timestamp: i64,
}

impl Action {
    pub fn code(label: impl Into<String>, diffs: Vec<CodeDiff>) -> Self {
        let inverse_diffs = invert_diffs(&diffs);
        Self {
            label: label.into(),
            styles: Vec::new(),
            diffs,
            inverse_diffs,
            styles_persisted: false,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn style(label: impl Into<String>, styles: Vec<StyleChange>) -> Self {
        Self {
            label: label.into(),
            styles,
            diffs: Vec::new(),
            inverse_diffs: Vec::new(),
            styles_persisted: false,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty() && self.diffs.is_empty()
    }

    /// Style changes not yet written to source
    pub fn has_pending_styles(&self) -> bool {
        !self.styles.is_empty() && !self.styles_persisted
    }

    /// The action that reverts this one
    pub fn inverse(&self) -> Self {
        Self {
            label: self.label.clone(),
            styles: self.styles.iter().rev().map(StyleChange::inverse).collect(),
            diffs: self.inverse_diffs.clone(),
            inverse_diffs: self.diffs.clone(),
            styles_persisted: self.styles_persisted,
            timestamp: self.timestamp,
        }
    }

    /// Folds a later step of the same gesture into this action. Style changes
    /// to the same property keep the first original and the last value.
    pub fn absorb(&mut self, later: Action) {
        for style in later.styles {
            match self.styles.iter_mut().find(|existing| existing.same_target(&style)) {
                Some(existing) => existing.change.updated = style.change.updated,
                None => self.styles.push(style),
            }
        }
        self.diffs.extend(later.diffs);
        let mut inverse = later.inverse_diffs;
        inverse.extend(std::mem::take(&mut self.inverse_diffs));
        self.inverse_diffs = inverse;
        self.styles_persisted = self.styles_persisted && later.styles_persisted;
        self.timestamp = later.timestamp;
    }

    /// This action with `done` (diffs that already took effect) removed
    pub fn without_diffs(&self, done: &[CodeDiff]) -> Self {
        let mut remaining = done.to_vec();
        let diffs: Vec<CodeDiff> = self
            .diffs
            .iter()
            .filter(|diff| match remaining.iter().position(|d| d == *diff) {
                Some(idx) => {
                    remaining.remove(idx);
                    false
                }
                None => true,
            })
            .cloned()
            .collect();
        Self {
            inverse_diffs: invert_diffs(&diffs),
            diffs,
            styles: Vec::new(),
            ..self.clone()
        }
    }
}
