//! Synchronous effect runner.
//!
//! The driver feeds a message to the console, performs the returned effects
//! against a [`FaceSource`] one by one, and feeds each result back in until
//! nothing is left to do. It is what the CLI uses, and what integration
//! tests use to run the console against an in-memory backend.

use std::collections::VecDeque;

use tracing::{debug, trace};

use super::{BackgroundAction, ConsoleMsg, Effect, FaceConsole, LabelMutation};
use crate::source::FaceSource;

#[derive(Debug)]
pub struct Driver<S> {
    console: FaceConsole,
    source: S,
    queue: VecDeque<ConsoleMsg>,
    last_route: Option<String>,
}

impl<S: FaceSource> Driver<S> {
    pub fn new(console: FaceConsole, source: S) -> Self {
        Self {
            console,
            source,
            queue: VecDeque::new(),
            last_route: None,
        }
    }

    pub fn console(&self) -> &FaceConsole {
        &self.console
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Most recent URL pushed by a query change.
    pub fn last_route(&self) -> Option<&str> {
        self.last_route.as_deref()
    }

    /// Handle `msg` and everything it causes.
    pub fn dispatch(&mut self, msg: ConsoleMsg) {
        self.queue.push_back(msg);
        while let Some(msg) = self.queue.pop_front() {
            trace!(?msg, "dispatch");
            for effect in self.console.update(msg) {
                if let Some(reply) = self.perform(effect) {
                    self.queue.push_back(reply);
                }
            }
        }
    }

    /// Hand the console its effects without performing them. Used to hold a
    /// response back and deliver it late.
    pub fn dispatch_deferred(&mut self, msg: ConsoleMsg) -> Vec<Effect> {
        self.console.update(msg)
    }

    /// Perform one effect now and feed its result back in.
    pub fn resolve(&mut self, effect: Effect) {
        if let Some(reply) = self.perform(effect) {
            self.dispatch(reply);
        }
    }

    /// Signal that the current tail is visible. Returns whether a page was
    /// fetched.
    pub fn scroll_to_end(&mut self) -> bool {
        let Some(tail) = self.console.pagination().tail().map(|f| f.id.clone()) else {
            return false;
        };
        let before = self.console.pagination().pages().len();
        self.dispatch(ConsoleMsg::TailVisible(tail));
        self.console.pagination().pages().len() != before
    }

    /// Scroll until `max_pages` pages are loaded or the history is exhausted.
    pub fn load_pages(&mut self, max_pages: usize) {
        while self.console.pagination().pages().len() < max_pages
            && !self.console.pagination().is_done()
        {
            if !self.scroll_to_end() {
                break;
            }
        }
    }

    fn perform(&mut self, effect: Effect) -> Option<ConsoleMsg> {
        debug!(?effect, "performing effect");
        let reply = match effect {
            Effect::FetchPage(request) => {
                let result = self.source.fetch_page(&request.query);
                ConsoleMsg::PageLoaded { request, result }
            }
            Effect::FetchLabels => ConsoleMsg::CatalogLoaded(self.source.fetch_labels()),
            Effect::PushRoute(url) => {
                self.last_route = Some(url);
                return None;
            }
            Effect::UpdateFaceLabel { face, label } => {
                let result = self.source.update_face_label(&face, label);
                ConsoleMsg::FaceLabelUpdated {
                    face,
                    label,
                    result,
                }
            }
            Effect::DeleteFace(face) => {
                let result = self.source.delete_face(&face);
                ConsoleMsg::FaceDeleted { face, result }
            }
            Effect::MutateLabel(mutation) => {
                let result = match &mutation {
                    LabelMutation::Create { text } => self.source.create_label(text),
                    LabelMutation::Rename { id, text } => self.source.rename_label(*id, text),
                    LabelMutation::Delete { id } => self.source.delete_label(*id),
                };
                ConsoleMsg::LabelMutated { mutation, result }
            }
            Effect::Run(action) => {
                let result = match action {
                    BackgroundAction::StartCapture => self.source.start_capture(),
                    BackgroundAction::StopCapture => self.source.stop_capture(),
                    BackgroundAction::ForceRetrain => self.source.force_retrain(),
                };
                ConsoleMsg::ActionCompleted { action, result }
            }
        };
        Some(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Face, FaceId, LIMIT, Label, LabelId};
    use crate::source::MemoryFaceSource;

    fn source(n: usize) -> MemoryFaceSource {
        let faces = (0..n)
            .map(|i| Face {
                id: FaceId::new(format!("face-{i:03}")),
                label_id: Some(LabelId((i % 2) as i64 + 1)),
                capture_time: 10_000 - i as i64,
            })
            .collect();
        MemoryFaceSource::new(vec![Label::new(1, "alice"), Label::new(2, "bob")], faces)
    }

    #[test]
    fn init_loads_catalog_and_first_page() {
        let mut driver = Driver::new(FaceConsole::default(), source(30));
        driver.dispatch(ConsoleMsg::Init);
        assert_eq!(driver.console().catalog().len(), 2);
        assert_eq!(driver.console().pagination().len(), LIMIT);
        assert!(!driver.console().pagination().is_fetching());
    }

    #[test]
    fn load_pages_stops_at_short_page() {
        let mut driver = Driver::new(FaceConsole::default(), source(30));
        driver.dispatch(ConsoleMsg::Init);
        driver.load_pages(10);
        assert_eq!(driver.console().pagination().pages().len(), 2);
        assert_eq!(driver.console().pagination().len(), 30);
        assert!(driver.console().pagination().is_done());
        assert!(!driver.scroll_to_end());
    }

    #[test]
    fn background_actions_reach_source() {
        let mut driver = Driver::new(FaceConsole::default(), source(0));
        driver.dispatch(ConsoleMsg::ActionRequested(BackgroundAction::StartCapture));
        assert!(driver.source().is_capturing());
        driver.dispatch(ConsoleMsg::ActionRequested(BackgroundAction::ForceRetrain));
        assert_eq!(driver.source().retrains(), 1);
        assert_eq!(driver.console().status(), "force retrain: ok");
    }

    #[test]
    fn toggle_records_route() {
        let mut driver = Driver::new(FaceConsole::default(), source(4));
        driver.dispatch(ConsoleMsg::Init);
        driver.dispatch(ConsoleMsg::FilterToggled {
            name: crate::filters::LABEL_IDS.into(),
            text: "alice".into(),
        });
        assert_eq!(driver.last_route(), Some("/faces?label_ids=2"));
        assert!(
            driver
                .console()
                .faces()
                .all(|f| f.label_id == Some(LabelId(2)))
        );
    }
}
