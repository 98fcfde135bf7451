//! Backend data sources.
//!
//! [`FaceSource`] is the whole surface the console needs from the recognition
//! service. [`HttpFaceSource`] talks to the real API; [`MemoryFaceSource`]
//! serves the same contract from process memory for tests and offline runs.

pub mod http;
pub mod memory;

use thiserror::Error;

use crate::model::{FaceId, Label, LabelId, Page};
use crate::pagination::PageQuery;

pub use http::HttpFaceSource;
pub use memory::MemoryFaceSource;

/// Failures surfaced by a data source. The console never retries on its own.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{method} {path} returned HTTP {status}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
    },

    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),
}

pub trait FaceSource {
    fn fetch_page(&self, query: &PageQuery) -> Result<Page, SourceError>;
    fn fetch_labels(&self) -> Result<Vec<Label>, SourceError>;
    fn update_face_label(&self, face: &FaceId, label: LabelId) -> Result<(), SourceError>;
    fn create_label(&self, text: &str) -> Result<(), SourceError>;
    fn rename_label(&self, id: LabelId, text: &str) -> Result<(), SourceError>;
    fn delete_label(&self, id: LabelId) -> Result<(), SourceError>;
    fn delete_face(&self, face: &FaceId) -> Result<(), SourceError>;
    fn start_capture(&self) -> Result<(), SourceError>;
    fn stop_capture(&self) -> Result<(), SourceError>;
    fn force_retrain(&self) -> Result<(), SourceError>;
}

impl<S: FaceSource + ?Sized> FaceSource for &S {
    fn fetch_page(&self, query: &PageQuery) -> Result<Page, SourceError> {
        (**self).fetch_page(query)
    }
    fn fetch_labels(&self) -> Result<Vec<Label>, SourceError> {
        (**self).fetch_labels()
    }
    fn update_face_label(&self, face: &FaceId, label: LabelId) -> Result<(), SourceError> {
        (**self).update_face_label(face, label)
    }
    fn create_label(&self, text: &str) -> Result<(), SourceError> {
        (**self).create_label(text)
    }
    fn rename_label(&self, id: LabelId, text: &str) -> Result<(), SourceError> {
        (**self).rename_label(id, text)
    }
    fn delete_label(&self, id: LabelId) -> Result<(), SourceError> {
        (**self).delete_label(id)
    }
    fn delete_face(&self, face: &FaceId) -> Result<(), SourceError> {
        (**self).delete_face(face)
    }
    fn start_capture(&self) -> Result<(), SourceError> {
        (**self).start_capture()
    }
    fn stop_capture(&self) -> Result<(), SourceError> {
        (**self).stop_capture()
    }
    fn force_retrain(&self) -> Result<(), SourceError> {
        (**self).force_retrain()
    }
}
