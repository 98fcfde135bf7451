//! Infinite-scroll trigger.
//!
//! The trigger watches the last rendered face. When that face becomes
//! visible it asks for exactly one pagination advance, then stays quiet
//! until the tail moves (a page was appended) or the engine re-arms it after
//! a failed fetch.

use tracing::debug;

use crate::model::FaceId;
use crate::pagination::PaginationCursor;

#[derive(Debug, Clone, Default)]
pub struct ScrollTrigger {
    target: Option<FaceId>,
    armed: bool,
}

impl ScrollTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Option<&FaceId> {
        self.target.as_ref()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Point the trigger at the current tail. A new tail re-arms it.
    pub fn observe(&mut self, tail: Option<&FaceId>) {
        if self.target.as_ref() != tail {
            self.target = tail.cloned();
            self.armed = self.target.is_some();
        }
    }

    pub fn rearm(&mut self) {
        self.armed = self.target.is_some();
    }

    /// Visibility signal for `face`. Returns `true` when the caller should
    /// fetch the next page.
    pub fn on_visible(&mut self, face: &FaceId, pagination: &PaginationCursor) -> bool {
        if self.target.as_ref() != Some(face) {
            debug!(%face, "visibility signal for a face that is no longer the tail");
            return false;
        }
        if !self.armed {
            return false;
        }
        if pagination.is_fetching() {
            debug!(%face, "scroll advance suppressed: fetch in flight");
            return false;
        }
        if pagination.is_done() {
            return false;
        }
        self.armed = false;
        true
    }
}
