//! Backend entities.

pub mod types;

pub use types::{Face, FaceId, LIMIT, Label, LabelId, Page};
