//! Single-value selections: which label a face carries, and which label the
//! label editor is pointed at.
//!
//! Both resolve display text through the [`LabelCatalog`] before acting. A
//! selection only shows its new text immediately; the face's `label_id` is
//! trusted again once the next refresh lands.

use std::collections::HashMap;

use tracing::debug;

use crate::catalog::{LabelCatalog, NOT_SET};
use crate::model::{Face, FaceId, LabelId};

/// Result of [`SelectionState::select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The text names no label in the catalog. Nothing was sent.
    Unresolved,
    /// The face already carries (or is already being moved to) this label.
    Unchanged,
    /// The backend must be told to relabel `face`.
    Update { face: FaceId, label: LabelId },
}

#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    display: HashMap<FaceId, String>,
    pending: HashMap<FaceId, LabelId>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, face: &Face, text: &str, catalog: &LabelCatalog) -> SelectOutcome {
        let Some(label) = catalog.id_for(text) else {
            debug!(face = %face.id, text, "label text did not resolve; selection skipped");
            return SelectOutcome::Unresolved;
        };
        self.display.insert(face.id.clone(), text.to_string());

        let target = self.pending.get(&face.id).copied().or(face.label_id);
        if target == Some(label) {
            return SelectOutcome::Unchanged;
        }
        self.pending.insert(face.id.clone(), label);
        SelectOutcome::Update {
            face: face.id.clone(),
            label,
        }
    }

    /// Text to show for `face`: a pending selection wins over the fetched label.
    pub fn display_text<'a>(&'a self, face: &Face, catalog: &'a LabelCatalog) -> &'a str {
        self.display
            .get(&face.id)
            .map(String::as_str)
            .unwrap_or_else(|| catalog.text_for(face.label_id))
    }

    pub fn is_pending(&self, face: &FaceId) -> bool {
        self.pending.contains_key(face)
    }

    /// Settle the update of `face` to `label`. A failed update drops the
    /// optimistic display text. Returns `false` when a later selection has
    /// superseded this request; its state is left alone.
    pub fn complete(&mut self, face: &FaceId, label: LabelId, succeeded: bool) -> bool {
        if self.pending.get(face) != Some(&label) {
            debug!(%face, %label, "completion for a superseded selection");
            return false;
        }
        self.pending.remove(face);
        if !succeeded {
            self.display.remove(face);
        }
        true
    }

    /// Fresh data arrived: the backend's `label_id` is authoritative again.
    pub fn clear_settled(&mut self) {
        let pending = &self.pending;
        self.display.retain(|face, _| pending.contains_key(face));
    }
}

/// The label the editor acts on (rename, delete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSelection {
    text: String,
}

impl Default for EditorSelection {
    fn default() -> Self {
        Self {
            text: NOT_SET.to_string(),
        }
    }
}

impl EditorSelection {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn choose(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn reset(&mut self) {
        self.text = NOT_SET.to_string();
    }

    pub fn label_id(&self, catalog: &LabelCatalog) -> Option<LabelId> {
        catalog.id_for(&self.text)
    }
}
