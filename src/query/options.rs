//! Search options and configuration types.

use crate::model::ObjectKind;
use crate::SortMode;

/// Result cap applied when the caller does not ask for less.
pub const DEFAULT_LIMIT: usize = 10_000;

/// Options for a search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Object kind the caller already restricts the search to
    /// (e.g. a "search files" endpoint). `None` searches all objects.
    pub object_kind: Option<ObjectKind>,
    /// Maximum results to return, capped at [`DEFAULT_LIMIT`]
    pub limit: usize,
    /// Result ordering
    pub sort_by: SortMode,
    /// Keyset pivot: only return objects after the one with this dhash in
    /// sort order (older for newest-first, newer for oldest-first)
    pub older_than: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            object_kind: None,
            limit: DEFAULT_LIMIT,
            sort_by: SortMode::default(),
            older_than: None,
        }
    }
}

impl SearchOptions {
    pub fn for_kind(kind: ObjectKind) -> Self {
        Self {
            object_kind: Some(kind),
            ..Self::default()
        }
    }

    /// Limit actually applied to the query.
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, DEFAULT_LIMIT)
    }
}
