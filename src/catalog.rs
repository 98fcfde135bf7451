//! Label catalog: the id ↔ text vocabulary the filters and selections run on.
//!
//! The catalog is a snapshot. A refresh replaces it wholesale through
//! [`LabelCatalog::replace`]; entries are never patched in place.

use crate::model::{Label, LabelId};

/// Display text for a face with no label, or a label id the catalog does not know.
pub const NOT_SET: &str = "Not Set";

#[derive(Debug, Clone, Default)]
pub struct LabelCatalog {
    labels: Vec<Label>,
    generation: u64,
}

impl LabelCatalog {
    pub fn new(labels: Vec<Label>) -> Self {
        Self {
            labels,
            generation: 1,
        }
    }

    /// Swap in a freshly fetched snapshot.
    pub fn replace(&mut self, labels: Vec<Label>) {
        self.labels = labels;
        self.generation += 1;
    }

    /// Bumped on every [`replace`](Self::replace); 0 means never loaded.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loaded(&self) -> bool {
        self.generation > 0
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Text for `id`, or [`NOT_SET`] when the id is absent or unknown.
    pub fn text_for(&self, id: Option<LabelId>) -> &str {
        id.and_then(|id| self.labels.iter().find(|l| l.id == id))
            .map(|l| l.text.as_str())
            .unwrap_or(NOT_SET)
    }

    /// Id for an exact text match. `None` is a normal outcome: callers skip
    /// the mutation instead of sending an unresolved id to the backend.
    pub fn id_for(&self, text: &str) -> Option<LabelId> {
        self.labels.iter().find(|l| l.text == text).map(|l| l.id)
    }

    pub fn contains(&self, id: LabelId) -> bool {
        self.labels.iter().any(|l| l.id == id)
    }

    /// Option texts in catalog order.
    pub fn texts(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.text.clone()).collect()
    }

    /// Filter tokens (stringified ids) in catalog order.
    pub fn universe(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.id.to_string()).collect()
    }

    /// Map filter tokens back to display texts, skipping tokens the catalog
    /// cannot resolve.
    pub fn texts_for_tokens<'a>(&'a self, tokens: &'a [String]) -> impl Iterator<Item = &'a str> {
        tokens.iter().filter_map(|token| {
            let id = token.parse::<LabelId>().ok()?;
            self.labels
                .iter()
                .find(|l| l.id == id)
                .map(|l| l.text.as_str())
        })
    }
}
