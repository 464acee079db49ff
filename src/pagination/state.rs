// Fetch state for one paginated list

use super::page::Cursor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    /// First page (or full refresh) in flight
    Loading,
    /// Next page in flight
    LoadingMore,
    Loaded,
    /// First page failed
    Error(String),
}

impl FetchStatus {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, FetchStatus::Loading | FetchStatus::LoadingMore)
    }
}

/// Accumulated list plus the position in the result stream
///
/// While `Loaded`, `has_more` is exactly `next_cursor.is_some()`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub items: Vec<T>,
    pub status: FetchStatus,
    pub next_cursor: Option<Cursor>,
    pub has_more: bool,
    /// Total reported by the most recent page
    pub total_count: i64,
    /// Last failure message; a failed load-more leaves it next to the retained items
    pub error: Option<String>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            status: FetchStatus::Idle,
            next_cursor: None,
            has_more: true,
            total_count: 0,
            error: None,
        }
    }
}

impl<T> FetchState<T> {
    /// Whether a `load_more` would be accepted right now
    pub fn can_load_more(&self) -> bool {
        self.status == FetchStatus::Loaded && self.has_more && self.next_cursor.is_some()
    }
}
