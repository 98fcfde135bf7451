//! Navigable URL form of a [`QueryKey`].
//!
//! Filter changes are pushed out as a query string so a view can be
//! bookmarked. The string is only read back on initial load.

use url::form_urlencoded;

use crate::filters::{DateRange, FilterSet, FilterValue};
use crate::pagination::QueryKey;

/// Render `path?before=..&after=..&label_ids=..`, omitting unbounded dates
/// and the `all` sentinel.
pub fn to_query_string(path: &str, key: &QueryKey) -> String {
    let mut pairs: Vec<String> = Vec::new();
    if let Some(before) = key.range.before {
        pairs.push(format!("before={before}"));
    }
    if let Some(after) = key.range.after {
        pairs.push(format!("after={after}"));
    }
    for (name, value) in key.filters.iter() {
        if let Some(tokens) = value.tokens() {
            let encoded: Vec<_> = tokens.iter().map(|t| urlencoding::encode(t)).collect();
            pairs.push(format!("{}={}", urlencoding::encode(name), encoded.join(",")));
        }
    }
    format!("{path}?{}", pairs.join("&"))
}

/// Keys that belong to the page request rather than to a filter.
const RESERVED: [&str; 2] = ["before_id", "limit"];

/// Read a key back from a query string (with or without the leading `?`
/// or a path prefix). Every key other than the date bounds is a filter.
/// Unparsable bounds are ignored.
pub fn parse_query_string(raw: &str) -> QueryKey {
    let query = raw.split_once('?').map_or(raw, |(_, q)| q);
    let mut filters = FilterSet::new();
    let mut range = DateRange::UNBOUNDED;
    for (name, value) in form_urlencoded::parse(query.as_bytes()) {
        match &*name {
            "before" => range.before = value.trim().parse().ok(),
            "after" => range.after = value.trim().parse().ok(),
            name if name.is_empty() || RESERVED.contains(&name) => {}
            name => {
                filters.set(name, FilterValue::parse_wire(&value));
            }
        }
    }
    QueryKey::new(filters, range)
}
