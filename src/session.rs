//! Per-search client session state: the pagination cursor, the exclusion
//! set, and the buffer deferred explanation streams merge into.
//!
//! A session belongs to exactly one search (one query); a new query means a
//! fresh session. Nothing here is shared across unrelated sessions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::catalog::search::Cursor;
use crate::pipeline::SearchOutcome;

/// Cursor + exclusion set threaded between pipeline invocations so "load
/// more" never repeats or skips a result.
#[derive(Debug, Default)]
pub struct SearchSession {
    cursor: Cursor,
    seen_ids: HashSet<i64>,
    has_more: bool,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor boundary for the next page request.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Ids already shown, passed as `exclude_ids` on every subsequent page.
    /// The cursor alone is not enough: concurrent popularity updates or
    /// floating-point reordering can resurface an id the boundary would
    /// otherwise admit.
    pub fn exclude_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.seen_ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Fold one page into the session: extend the exclusion set and move
    /// the cursor to the page's boundary.
    pub fn advance(&mut self, outcome: &SearchOutcome) {
        for record in &outcome.results {
            self.seen_ids.insert(record.id);
        }
        self.cursor = Cursor {
            last_score: outcome.pagination.last_score,
            last_id: outcome.pagination.last_id,
        };
        self.has_more = outcome.pagination.has_more;
    }
}

/// Explanation texts merged from concurrent deferred streams, keyed by
/// course id. Writes replace the whole text (last-write-wins), so streams
/// arriving in any order can never interleave into a corrupted value.
///
/// This is the deferred-mode consumer's buffer: whatever drives /api/explain
/// fan-out holds one per search session. The server itself is stateless and
/// has no call site for it.
#[derive(Debug, Clone, Default)]
pub struct ExplanationMerge {
    texts: Arc<RwLock<HashMap<i64, String>>>,
}

impl ExplanationMerge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored text for `course_id`.
    pub fn set(&self, course_id: i64, text: String) {
        self.texts.write().insert(course_id, text);
    }

    pub fn get(&self, course_id: i64) -> Option<String> {
        self.texts.read().get(&course_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.texts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.read().is_empty()
    }
}
