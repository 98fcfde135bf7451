//! Cursor pagination over the newest-first `faces` history.
//!
//! A [`PaginationCursor`] owns one session: the [`QueryKey`] it was opened
//! for, the pages fetched so far and the `done`/`fetching` flags. Any key
//! change replaces the session through [`PaginationCursor::reset`], so pages
//! fetched for one filter combination never leak into another.
//!
//! The next page is requested strictly older than the last face seen. The
//! cursor carries the face id as a tie-breaker: `before` alone cannot tell
//! apart two faces captured in the same second.

use std::fmt::Display;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::filters::{DateRange, FilterSet, FilterValue, LABEL_IDS};
use crate::model::{Face, FaceId, LIMIT, Page};

/// Everything that identifies a pagination session. Equality is structural.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub filters: FilterSet,
    pub range: DateRange,
}

impl QueryKey {
    pub fn new(filters: FilterSet, range: DateRange) -> Self {
        Self { filters, range }
    }

    pub fn label_ids(&self) -> &FilterValue {
        self.filters.get(LABEL_IDS)
    }
}

/// Position of the oldest face seen so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageCursor {
    pub capture_time: i64,
    pub face_id: FaceId,
}

impl From<&Face> for PageCursor {
    fn from(face: &Face) -> Self {
        Self {
            capture_time: face.capture_time,
            face_id: face.id.clone(),
        }
    }
}

/// Parameters of one `faces` fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub label_ids: FilterValue,
    /// Every other narrowed filter as `(name, wire value)`, sorted by name.
    pub filters: Vec<(String, String)>,
    /// Exclusive upper capture-time bound: the cursor, or the range's own bound on page one.
    pub before: Option<i64>,
    /// Tie-breaker for `before`: among faces captured at `before`, only ids
    /// ordered below this one are older.
    pub before_id: Option<FaceId>,
    pub after: Option<i64>,
    pub limit: usize,
}

impl PageQuery {
    /// Query-string pairs. Unbounded values and non-label filters left at
    /// `all` are omitted; the label filter always goes out, as `all` if need be.
    pub fn params(&self) -> Vec<(&str, String)> {
        let mut params = vec![(LABEL_IDS, self.label_ids.to_wire())];
        params.extend(
            self.filters
                .iter()
                .map(|(name, value)| (name.as_str(), value.clone())),
        );
        if let Some(before) = self.before {
            params.push(("before", before.to_string()));
        }
        if let Some(before_id) = &self.before_id {
            params.push(("before_id", before_id.to_string()));
        }
        if let Some(after) = self.after {
            params.push(("after", after.to_string()));
        }
        params.push(("limit", self.limit.to_string()));
        params
    }

    pub fn cursor(&self) -> Option<PageCursor> {
        match (self.before, &self.before_id) {
            (Some(capture_time), Some(face_id)) => Some(PageCursor {
                capture_time,
                face_id: face_id.clone(),
            }),
            _ => None,
        }
    }
}

/// A fetch handed out by [`PaginationCursor::begin_fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub key: QueryKey,
    pub session: u64,
    pub query: PageQuery,
}

/// What [`PaginationCursor::complete`] did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Appended,
    /// The response belongs to a superseded session and was dropped.
    Stale,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PaginationCursor {
    key: QueryKey,
    session: u64,
    limit: usize,
    pages: Vec<Page>,
    is_done: bool,
    is_fetching: bool,
    last_error: Option<String>,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self::new(QueryKey::default(), LIMIT)
    }
}

impl PaginationCursor {
    pub fn new(key: QueryKey, limit: usize) -> Self {
        Self {
            key,
            session: 1,
            limit: limit.max(1),
            pages: Vec::new(),
            is_done: false,
            is_fetching: false,
            last_error: None,
        }
    }

    /// Open a fresh session for `key`, discarding every page.
    pub fn reset(&mut self, key: QueryKey) {
        self.session += 1;
        info!(
            session = self.session,
            label_ids = %key.label_ids(),
            before = ?key.range.before,
            after = ?key.range.after,
            "pagination session reset"
        );
        self.key = key;
        self.pages.clear();
        self.is_done = false;
        self.is_fetching = false;
        self.last_error = None;
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn faces(&self) -> impl Iterator<Item = &Face> {
        self.pages.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_done(&self) -> bool {
        self.is_done
    }

    pub fn is_fetching(&self) -> bool {
        self.is_fetching
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Last face of the last page that has any.
    pub fn tail(&self) -> Option<&Face> {
        self.pages.iter().rev().find_map(|page| page.last())
    }

    pub fn cursor(&self) -> Option<PageCursor> {
        self.tail().map(PageCursor::from)
    }

    /// Parameters for the next fetch: the bare query on page one, then
    /// bounded strictly below the oldest face seen.
    pub fn next_cursor_params(&self) -> PageQuery {
        let cursor = self.cursor();
        PageQuery {
            label_ids: self.key.label_ids().clone(),
            filters: self
                .key
                .filters
                .iter()
                .filter(|(name, value)| *name != LABEL_IDS && !value.is_all())
                .map(|(name, value)| (name.to_string(), value.to_wire()))
                .collect(),
            before: cursor
                .as_ref()
                .map(|c| c.capture_time)
                .or(self.key.range.before),
            before_id: cursor.map(|c| c.face_id),
            after: self.key.range.after,
            limit: self.limit,
        }
    }

    /// Claim the single in-flight slot. `None` while a fetch is running or
    /// once the history is exhausted.
    pub fn begin_fetch(&mut self) -> Option<PageRequest> {
        if self.is_fetching {
            debug!(session = self.session, "fetch already in flight");
            return None;
        }
        if self.is_done {
            debug!(session = self.session, "history exhausted");
            return None;
        }
        self.is_fetching = true;
        Some(PageRequest {
            key: self.key.clone(),
            session: self.session,
            query: self.next_cursor_params(),
        })
    }

    pub fn append_page(&mut self, page: Page) {
        if let (Some(cursor), Some(first)) = (self.cursor(), page.first())
            && first.capture_time == cursor.capture_time
        {
            warn!(
                capture_time = cursor.capture_time,
                last = %cursor.face_id,
                first = %first.id,
                "page boundary falls inside a capture_time tie"
            );
        }
        self.is_done = page.len() < self.limit;
        self.is_fetching = false;
        self.last_error = None;
        debug!(
            session = self.session,
            page = self.pages.len() + 1,
            faces = page.len(),
            done = self.is_done,
            "page appended"
        );
        self.pages.push(page);
    }

    /// Apply the response for `request`. Responses for a superseded session
    /// are dropped without touching the current one.
    pub fn complete<E: Display>(
        &mut self,
        request_key: &QueryKey,
        request_session: u64,
        result: Result<Page, E>,
    ) -> FetchOutcome {
        if request_session != self.session || *request_key != self.key {
            debug!(
                stale_session = request_session,
                session = self.session,
                "discarding response for superseded query"
            );
            return FetchOutcome::Stale;
        }
        match result {
            Ok(page) => {
                self.append_page(page);
                FetchOutcome::Appended
            }
            Err(err) => {
                warn!(session = self.session, error = %err, "page fetch failed");
                self.is_fetching = false;
                self.last_error = Some(err.to_string());
                FetchOutcome::Failed
            }
        }
    }
}
