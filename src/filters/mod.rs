//! Multi-select filters with an `ALL` sentinel.
//!
//! Each named filter holds either [`FilterValue::All`] or a non-empty
//! [`TokenSet`]. [`FilterSet::toggle`] implements the expand/collapse rules:
//!
//! - toggling a token while `All` expands to "universe minus token" (unless the
//!   universe has a single member, in which case nothing changes);
//! - removing the last token of an explicit set is refused;
//! - adding the token that completes the universe collapses back to `All`.
//!
//! Tokens are label ids rendered as strings. Resolving display text to a token
//! happens before the set algorithm runs (see [`crate::engine`]).

pub mod date;

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

pub use date::{DatePreset, DateRange};

/// Name of the label filter, also its query-string key.
pub const LABEL_IDS: &str = "label_ids";

/// Wire form of the sentinel.
pub const ALL_WIRE: &str = "all";

static ALL: FilterValue = FilterValue::All;

/// Ordered, duplicate-free, never-empty set of tokens.
///
/// Order is kept for display and for the wire string; equality and hashing
/// ignore it.
#[derive(Debug, Clone, Eq)]
pub struct TokenSet(Vec<String>);

impl TokenSet {
    /// Build a set, dropping empty and duplicate tokens. Returns `None` if
    /// nothing is left.
    pub fn new<I, S>(tokens: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for token in tokens {
            let token = token.into();
            let token = token.trim();
            if token.is_empty() || out.iter().any(|t| t == token) {
                continue;
            }
            out.push(token.to_string());
        }
        (!out.is_empty()).then_some(Self(out))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    fn covers(&self, universe: &[String]) -> bool {
        universe.iter().all(|u| self.contains(u))
    }

    fn without(&self, token: &str) -> Option<Self> {
        Self::new(self.0.iter().filter(|t| t.as_str() != token).cloned())
    }

    fn with(&self, token: &str) -> Self {
        let mut tokens = self.0.clone();
        if !self.contains(token) {
            tokens.push(token.to_string());
        }
        Self(tokens)
    }
}

impl PartialEq for TokenSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|t| other.contains(t))
    }
}

impl Hash for TokenSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut sorted: Vec<&str> = self.iter().collect();
        sorted.sort_unstable();
        sorted.hash(state);
    }
}

/// Value of one filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum FilterValue {
    /// Every current universe member, whatever the universe is right now.
    #[default]
    All,
    Only(TokenSet),
}

impl FilterValue {
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Parse the wire form: `all` (or an empty string) is the sentinel,
    /// anything else is a comma-joined token list.
    pub fn parse_wire(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case(ALL_WIRE) {
            return Self::All;
        }
        TokenSet::new(raw.split(',')).map_or(Self::All, Self::Only)
    }

    pub fn to_wire(&self) -> String {
        match self {
            Self::All => ALL_WIRE.to_string(),
            Self::Only(set) => set.as_slice().join(","),
        }
    }

    /// Explicit tokens, or `None` for the sentinel.
    pub fn tokens(&self) -> Option<&[String]> {
        match self {
            Self::All => None,
            Self::Only(set) => Some(set.as_slice()),
        }
    }

    /// Whether `token` is selected.
    pub fn selects(&self, token: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(token),
        }
    }

    /// Apply one toggle of `token` against `universe`.
    pub fn toggled(&self, token: &str, universe: &[String]) -> Self {
        if !universe.iter().any(|u| u == token) {
            return self.clone();
        }
        match self {
            Self::All => {
                if universe.len() <= 1 {
                    return Self::All;
                }
                TokenSet::new(universe.iter().filter(|u| u.as_str() != token).cloned())
                    .map_or(Self::All, Self::Only)
            }
            Self::Only(set) if set.contains(token) => match set.without(token) {
                Some(rest) => Self::Only(rest),
                None => self.clone(),
            },
            Self::Only(set) => {
                let grown = set.with(token);
                if grown.covers(universe) {
                    Self::All
                } else {
                    Self::Only(grown)
                }
            }
        }
    }

    /// Drop tokens that left the universe. An emptied set, or one that now
    /// names every universe member, becomes `All`.
    pub fn sanitized(&self, universe: &[String]) -> Self {
        match self {
            Self::All => Self::All,
            Self::Only(set) => {
                let kept =
                    TokenSet::new(set.iter().filter(|t| universe.iter().any(|u| u.as_str() == *t)));
                match kept {
                    Some(kept) if !kept.covers(universe) => Self::Only(kept),
                    _ => Self::All,
                }
            }
        }
    }
}

impl std::fmt::Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// Whether a filter operation produced a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Changed,
    Unchanged,
}

impl ToggleOutcome {
    pub fn changed(self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// Named collection of independent filters. Absent names read as `All`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterSet {
    values: BTreeMap<String, FilterValue>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> &FilterValue {
        self.values.get(name).unwrap_or(&ALL)
    }

    pub fn set(&mut self, name: &str, value: FilterValue) -> ToggleOutcome {
        self.store(name, value)
    }

    pub fn toggle(&mut self, name: &str, token: &str, universe: &[String]) -> ToggleOutcome {
        let next = self.get(name).toggled(token, universe);
        self.store(name, next)
    }

    pub fn show_all(&mut self, name: &str) -> ToggleOutcome {
        self.store(name, FilterValue::All)
    }

    pub fn sanitize(&mut self, name: &str, universe: &[String]) -> ToggleOutcome {
        let next = self.get(name).sanitized(universe);
        self.store(name, next)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn store(&mut self, name: &str, next: FilterValue) -> ToggleOutcome {
        if *self.get(name) == next {
            return ToggleOutcome::Unchanged;
        }
        // `All` entries are dropped so that structurally equal sets compare equal.
        if next.is_all() {
            self.values.remove(name);
        } else {
            self.values.insert(name.to_string(), next);
        }
        ToggleOutcome::Changed
    }
}
