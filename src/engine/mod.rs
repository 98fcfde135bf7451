//! Console state machine.
//!
//! [`FaceConsole`] is the explicit state object behind the faces view: label
//! catalog, filters, date range, the pagination session, the scroll trigger
//! and pending selections. Every event goes through [`FaceConsole::update`],
//! which mutates state and returns the [`Effect`]s the caller must perform.
//! Effect results come back as further [`ConsoleMsg`]s, so the whole flow is
//! single-threaded and free of rendering concerns.
//!
//! Filter and date changes open a new pagination session keyed by the new
//! [`QueryKey`]; a page response is only applied if it still matches the
//! session it was requested for.

pub mod driver;

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::catalog::LabelCatalog;
use crate::filters::{DateRange, FilterSet, LABEL_IDS, ToggleOutcome};
use crate::model::{Face, FaceId, LIMIT, Label, LabelId, Page};
use crate::pagination::{FetchOutcome, PageRequest, PaginationCursor, QueryKey};
use crate::route;
use crate::scroll::ScrollTrigger;
use crate::selection::{EditorSelection, SelectOutcome, SelectionState};
use crate::source::SourceError;

pub use driver::Driver;

/// Fire-and-forget service actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundAction {
    StartCapture,
    StopCapture,
    ForceRetrain,
}

impl std::fmt::Display for BackgroundAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StartCapture => write!(f, "start capture"),
            Self::StopCapture => write!(f, "stop capture"),
            Self::ForceRetrain => write!(f, "force retrain"),
        }
    }
}

/// Changes to the label vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelMutation {
    Create { text: String },
    Rename { id: LabelId, text: String },
    Delete { id: LabelId },
}

#[derive(Debug)]
pub enum ConsoleMsg {
    /// Load the catalog and the first page of the initial query.
    Init,
    CatalogLoaded(Result<Vec<Label>, SourceError>),
    /// Toggle one option of a filter, named by its display text.
    FilterToggled { name: String, text: String },
    FilterShowAll { name: String },
    DateRangeSet(DateRange),
    /// The face currently rendered last became visible.
    TailVisible(FaceId),
    PageLoaded {
        request: PageRequest,
        result: Result<Page, SourceError>,
    },
    /// Drop every page and refetch the current query.
    RefreshRequested,
    LabelSelected { face: FaceId, text: String },
    FaceLabelUpdated {
        face: FaceId,
        label: LabelId,
        result: Result<(), SourceError>,
    },
    FaceDeleteRequested(FaceId),
    FaceDeleted {
        face: FaceId,
        result: Result<(), SourceError>,
    },
    EditorLabelChosen(String),
    LabelCreateRequested(String),
    /// Rename the editor's current label.
    LabelRenameRequested(String),
    /// Delete the editor's current label.
    LabelDeleteRequested,
    LabelMutated {
        mutation: LabelMutation,
        result: Result<(), SourceError>,
    },
    ActionRequested(BackgroundAction),
    ActionCompleted {
        action: BackgroundAction,
        result: Result<(), SourceError>,
    },
}

/// Work the caller performs on the console's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchPage(PageRequest),
    FetchLabels,
    /// Persist the current query into the navigable URL.
    PushRoute(String),
    UpdateFaceLabel { face: FaceId, label: LabelId },
    DeleteFace(FaceId),
    MutateLabel(LabelMutation),
    Run(BackgroundAction),
}

#[derive(Debug)]
pub struct FaceConsole {
    path: String,
    catalog: LabelCatalog,
    filters: FilterSet,
    range: DateRange,
    universes: HashMap<String, Vec<String>>,
    pagination: PaginationCursor,
    scroll: ScrollTrigger,
    selection: SelectionState,
    editor: EditorSelection,
    labels_in_flight: bool,
    /// A label change landed while a catalog fetch was in flight.
    labels_stale: bool,
    status: String,
}

impl Default for FaceConsole {
    fn default() -> Self {
        Self::new("/faces", QueryKey::default(), LIMIT)
    }
}

impl FaceConsole {
    pub fn new(path: impl Into<String>, initial: QueryKey, limit: usize) -> Self {
        Self {
            path: path.into(),
            catalog: LabelCatalog::default(),
            filters: initial.filters.clone(),
            range: initial.range,
            universes: HashMap::new(),
            pagination: PaginationCursor::new(initial, limit),
            scroll: ScrollTrigger::new(),
            selection: SelectionState::new(),
            editor: EditorSelection::default(),
            labels_in_flight: false,
            labels_stale: false,
            status: String::new(),
        }
    }

    /// Start from a bookmarked URL such as `/faces?label_ids=1,2&after=1700000000`.
    pub fn from_route(url: &str, limit: usize) -> Self {
        let path = url.split_once('?').map_or(url, |(p, _)| p);
        Self::new(path, route::parse_query_string(url), limit)
    }

    /// Declare the option universe of a filter other than the label filter,
    /// whose universe is the catalog.
    pub fn register_filter(&mut self, name: impl Into<String>, universe: Vec<String>) {
        self.universes.insert(name.into(), universe);
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn pagination(&self) -> &PaginationCursor {
        &self.pagination
    }

    pub fn scroll(&self) -> &ScrollTrigger {
        &self.scroll
    }

    pub fn editor(&self) -> &EditorSelection {
        &self.editor
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn query_key(&self) -> QueryKey {
        QueryKey::new(self.filters.clone(), self.range)
    }

    pub fn faces(&self) -> impl Iterator<Item = &Face> {
        self.pagination.faces()
    }

    pub fn face(&self, id: &FaceId) -> Option<&Face> {
        self.pagination.faces().find(|f| &f.id == id)
    }

    /// Label text shown next to `face`.
    pub fn face_label_text(&self, face: &Face) -> &str {
        self.selection.display_text(face, &self.catalog)
    }

    /// Display texts of the label filter: `["all"]` or the selected labels.
    pub fn label_filter_texts(&self) -> Vec<String> {
        match self.filters.get(LABEL_IDS).tokens() {
            None => vec![crate::filters::ALL_WIRE.to_string()],
            Some(tokens) => self
                .catalog
                .texts_for_tokens(tokens)
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn update(&mut self, msg: ConsoleMsg) -> Vec<Effect> {
        match msg {
            ConsoleMsg::Init => {
                let mut effects = self.fetch_labels();
                effects.extend(self.fetch_next());
                effects
            }
            ConsoleMsg::CatalogLoaded(result) => {
                self.labels_in_flight = false;
                if std::mem::take(&mut self.labels_stale) {
                    debug!("catalog snapshot predates a label change; refetching");
                    return self.fetch_labels();
                }
                match result {
                    Ok(labels) => {
                        self.catalog.replace(labels);
                        let universe = self.catalog.universe();
                        if self.filters.sanitize(LABEL_IDS, &universe).changed() {
                            info!(
                                label_ids = %self.filters.get(LABEL_IDS),
                                "label filter pruned to current catalog"
                            );
                        }
                        self.query_changed()
                    }
                    Err(err) => {
                        warn!(error = %err, "label catalog refresh failed");
                        self.status = format!("Failed to load labels: {err}");
                        Vec::new()
                    }
                }
            }
            ConsoleMsg::FilterToggled { name, text } => {
                let Some(token) = self.resolve_token(&name, &text) else {
                    debug!(filter = %name, text = %text, "toggle text did not resolve; ignored");
                    return Vec::new();
                };
                let universe = self.universe(&name);
                match self.filters.toggle(&name, &token, &universe) {
                    ToggleOutcome::Changed => self.query_changed(),
                    ToggleOutcome::Unchanged => {
                        debug!(filter = %name, token = %token, "toggle left filter unchanged");
                        Vec::new()
                    }
                }
            }
            ConsoleMsg::FilterShowAll { name } => match self.filters.show_all(&name) {
                ToggleOutcome::Changed => self.query_changed(),
                ToggleOutcome::Unchanged => Vec::new(),
            },
            ConsoleMsg::DateRangeSet(range) => {
                self.range = range;
                self.query_changed()
            }
            ConsoleMsg::TailVisible(face) => {
                if self.scroll.on_visible(&face, &self.pagination) {
                    self.fetch_next()
                } else {
                    Vec::new()
                }
            }
            ConsoleMsg::PageLoaded { request, result } => {
                match self
                    .pagination
                    .complete(&request.key, request.session, result)
                {
                    FetchOutcome::Appended => {
                        if self.pagination.pages().len() == 1 {
                            self.selection.clear_settled();
                        }
                        self.scroll.observe(self.pagination.tail().map(|f| &f.id));
                        self.status = format!("{} faces", self.pagination.len());
                    }
                    FetchOutcome::Failed => {
                        self.scroll.rearm();
                        self.status = format!(
                            "Failed to load faces: {}",
                            self.pagination.last_error().unwrap_or("unknown error")
                        );
                    }
                    FetchOutcome::Stale => {}
                }
                Vec::new()
            }
            ConsoleMsg::RefreshRequested => self.refresh(),
            ConsoleMsg::LabelSelected { face, text } => {
                let Some(current) = self.face(&face).cloned() else {
                    debug!(%face, "selection for a face that is not loaded");
                    return Vec::new();
                };
                match self.selection.select(&current, &text, &self.catalog) {
                    SelectOutcome::Update { face, label } => {
                        vec![Effect::UpdateFaceLabel { face, label }]
                    }
                    SelectOutcome::Unchanged | SelectOutcome::Unresolved => Vec::new(),
                }
            }
            ConsoleMsg::FaceLabelUpdated {
                face,
                label,
                result,
            } => {
                if !self.selection.complete(&face, label, result.is_ok()) {
                    return Vec::new();
                }
                match result {
                    Ok(()) => self.refresh(),
                    Err(err) => {
                        warn!(%face, error = %err, "face label update failed");
                        self.status = format!("Failed to relabel {face}: {err}");
                        Vec::new()
                    }
                }
            }
            ConsoleMsg::FaceDeleteRequested(face) => vec![Effect::DeleteFace(face)],
            ConsoleMsg::FaceDeleted { face, result } => match result {
                Ok(()) => {
                    info!(%face, "face deleted");
                    self.refresh()
                }
                Err(err) => {
                    warn!(%face, error = %err, "face delete failed");
                    self.status = format!("Failed to delete {face}: {err}");
                    Vec::new()
                }
            },
            ConsoleMsg::EditorLabelChosen(text) => {
                self.editor.choose(text);
                Vec::new()
            }
            ConsoleMsg::LabelCreateRequested(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return Vec::new();
                }
                vec![Effect::MutateLabel(LabelMutation::Create { text })]
            }
            ConsoleMsg::LabelRenameRequested(text) => {
                let text = text.trim().to_string();
                let Some(id) = self.editor.label_id(&self.catalog) else {
                    debug!(selected = self.editor.text(), "rename skipped: no label selected");
                    return Vec::new();
                };
                if text.is_empty() {
                    return Vec::new();
                }
                vec![Effect::MutateLabel(LabelMutation::Rename { id, text })]
            }
            ConsoleMsg::LabelDeleteRequested => {
                let Some(id) = self.editor.label_id(&self.catalog) else {
                    debug!(selected = self.editor.text(), "delete skipped: no label selected");
                    return Vec::new();
                };
                vec![Effect::MutateLabel(LabelMutation::Delete { id })]
            }
            ConsoleMsg::LabelMutated { mutation, result } => match result {
                Ok(()) => {
                    info!(?mutation, "label catalog changed");
                    match mutation {
                        LabelMutation::Create { text } | LabelMutation::Rename { text, .. } => {
                            self.editor.choose(text);
                        }
                        LabelMutation::Delete { .. } => self.editor.reset(),
                    }
                    let mut effects = self.refresh();
                    effects.extend(self.fetch_labels());
                    effects
                }
                Err(err) => {
                    warn!(?mutation, error = %err, "label change failed");
                    self.status = format!("Label change failed: {err}");
                    Vec::new()
                }
            },
            ConsoleMsg::ActionRequested(action) => vec![Effect::Run(action)],
            ConsoleMsg::ActionCompleted { action, result } => {
                match result {
                    Ok(()) => {
                        info!(%action, "action completed");
                        self.status = format!("{action}: ok");
                    }
                    Err(err) => {
                        warn!(%action, error = %err, "action failed");
                        self.status = format!("{action} failed: {err}");
                    }
                }
                Vec::new()
            }
        }
    }

    fn resolve_token(&self, name: &str, text: &str) -> Option<String> {
        if name == LABEL_IDS {
            self.catalog.id_for(text).map(|id| id.to_string())
        } else {
            Some(text.to_string())
        }
    }

    fn universe(&self, name: &str) -> Vec<String> {
        if name == LABEL_IDS {
            self.catalog.universe()
        } else {
            self.universes.get(name).cloned().unwrap_or_default()
        }
    }

    /// Open a new session if the effective key moved.
    fn query_changed(&mut self) -> Vec<Effect> {
        let key = self.query_key();
        if key == *self.pagination.key() {
            return Vec::new();
        }
        let url = route::to_query_string(&self.path, &key);
        self.pagination.reset(key);
        self.scroll.observe(None);
        let mut effects = vec![Effect::PushRoute(url)];
        effects.extend(self.fetch_next());
        effects
    }

    /// Same key, new session: every page is refetched.
    fn refresh(&mut self) -> Vec<Effect> {
        self.pagination.reset(self.query_key());
        self.scroll.observe(None);
        self.fetch_next()
    }

    fn fetch_next(&mut self) -> Vec<Effect> {
        self.pagination
            .begin_fetch()
            .map(Effect::FetchPage)
            .into_iter()
            .collect()
    }

    fn fetch_labels(&mut self) -> Vec<Effect> {
        if self.labels_in_flight {
            self.labels_stale = true;
            return Vec::new();
        }
        self.labels_in_flight = true;
        vec![Effect::FetchLabels]
    }
}
