//! In-process [`FaceSource`] holding faces and labels in memory.
//!
//! Ordering matches the service: newest first, ties broken by descending
//! face id, so the `(before, before_id)` cursor walks the history without
//! gaps or repeats. Faces carry no attribute besides their label, so
//! filters other than `label_ids` match every face.

use std::cmp::Ordering;

use parking_lot::Mutex;
use tracing::debug;

use super::{FaceSource, SourceError};
use crate::filters::FilterValue;
use crate::model::{Face, FaceId, Label, LabelId, Page};
use crate::pagination::PageQuery;

#[derive(Debug, Default)]
struct Store {
    faces: Vec<Face>,
    labels: Vec<Label>,
    next_label_id: i64,
    capturing: bool,
    retrains: u32,
    page_fetches: u32,
    fail_fetches: u32,
}

#[derive(Debug, Default)]
pub struct MemoryFaceSource {
    store: Mutex<Store>,
}

fn newest_first(a: &Face, b: &Face) -> Ordering {
    b.capture_time
        .cmp(&a.capture_time)
        .then_with(|| b.id.cmp(&a.id))
}

impl MemoryFaceSource {
    pub fn new(labels: Vec<Label>, mut faces: Vec<Face>) -> Self {
        faces.sort_by(newest_first);
        let next_label_id = labels.iter().map(|l| l.id.0).max().unwrap_or(0) + 1;
        Self {
            store: Mutex::new(Store {
                faces,
                labels,
                next_label_id,
                ..Store::default()
            }),
        }
    }

    /// Make the next `n` page fetches fail.
    pub fn fail_next_fetches(&self, n: u32) {
        self.store.lock().fail_fetches = n;
    }

    pub fn page_fetches(&self) -> u32 {
        self.store.lock().page_fetches
    }

    pub fn is_capturing(&self) -> bool {
        self.store.lock().capturing
    }

    pub fn retrains(&self) -> u32 {
        self.store.lock().retrains
    }

    pub fn face(&self, id: &FaceId) -> Option<Face> {
        self.store.lock().faces.iter().find(|f| &f.id == id).cloned()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.store.lock().labels.clone()
    }

    fn matches(query: &PageQuery, face: &Face) -> bool {
        let label_ok = match &query.label_ids {
            FilterValue::All => true,
            FilterValue::Only(set) => face
                .label_id
                .is_some_and(|id| set.contains(&id.to_string())),
        };
        let after_ok = query.after.is_none_or(|after| face.capture_time >= after);
        let before_ok = match (query.before, &query.before_id) {
            (None, _) => true,
            (Some(before), None) => face.capture_time < before,
            (Some(before), Some(before_id)) => {
                face.capture_time < before || (face.capture_time == before && &face.id < before_id)
            }
        };
        label_ok && after_ok && before_ok
    }
}

impl FaceSource for MemoryFaceSource {
    fn fetch_page(&self, query: &PageQuery) -> Result<Page, SourceError> {
        let mut store = self.store.lock();
        store.page_fetches += 1;
        if store.fail_fetches > 0 {
            store.fail_fetches -= 1;
            return Err(SourceError::Unavailable("injected fetch failure".into()));
        }
        let page: Page = store
            .faces
            .iter()
            .filter(|face| Self::matches(query, face))
            .take(query.limit)
            .cloned()
            .collect();
        debug!(faces = page.len(), before = ?query.before, "served page from memory");
        Ok(page)
    }

    fn fetch_labels(&self) -> Result<Vec<Label>, SourceError> {
        Ok(self.store.lock().labels.clone())
    }

    fn update_face_label(&self, face: &FaceId, label: LabelId) -> Result<(), SourceError> {
        let mut store = self.store.lock();
        if !store.labels.iter().any(|l| l.id == label) {
            return Err(SourceError::NotFound(format!("label {label}")));
        }
        let target = store
            .faces
            .iter_mut()
            .find(|f| &f.id == face)
            .ok_or_else(|| SourceError::NotFound(format!("face {face}")))?;
        target.label_id = Some(label);
        Ok(())
    }

    fn create_label(&self, text: &str) -> Result<(), SourceError> {
        let mut store = self.store.lock();
        let id = store.next_label_id;
        store.next_label_id += 1;
        store.labels.push(Label::new(id, text));
        Ok(())
    }

    fn rename_label(&self, id: LabelId, text: &str) -> Result<(), SourceError> {
        let mut store = self.store.lock();
        let label = store
            .labels
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| SourceError::NotFound(format!("label {id}")))?;
        label.text = text.to_string();
        Ok(())
    }

    fn delete_label(&self, id: LabelId) -> Result<(), SourceError> {
        let mut store = self.store.lock();
        let before = store.labels.len();
        store.labels.retain(|l| l.id != id);
        if store.labels.len() == before {
            return Err(SourceError::NotFound(format!("label {id}")));
        }
        for face in store.faces.iter_mut().filter(|f| f.label_id == Some(id)) {
            face.label_id = None;
        }
        Ok(())
    }

    fn delete_face(&self, face: &FaceId) -> Result<(), SourceError> {
        let mut store = self.store.lock();
        let before = store.faces.len();
        store.faces.retain(|f| &f.id != face);
        if store.faces.len() == before {
            return Err(SourceError::NotFound(format!("face {face}")));
        }
        Ok(())
    }

    fn start_capture(&self) -> Result<(), SourceError> {
        self.store.lock().capturing = true;
        Ok(())
    }

    fn stop_capture(&self) -> Result<(), SourceError> {
        self.store.lock().capturing = false;
        Ok(())
    }

    fn force_retrain(&self) -> Result<(), SourceError> {
        self.store.lock().retrains += 1;
        Ok(())
    }
}
