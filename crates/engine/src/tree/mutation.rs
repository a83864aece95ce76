// Structural mutations applied to the page tree.

use chrono::{DateTime, Utc};
use folio_common::types::PageId;

/// One structural change to a single page.
///
/// Each field is a patch: `None` leaves the page's current value alone. The
/// nested options on `parent` and `deleted_at` distinguish "unchanged" from
/// "set to null" (move to root, restore from trash).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub page_id: PageId,
    pub parent: Option<Option<PageId>>,
    pub position: Option<u32>,
    pub deleted_at: Option<Option<DateTime<Utc>>>,
}

impl Mutation {
    /// Change only the sibling position.
    pub fn reposition(page_id: PageId, position: u32) -> Self {
        Self { page_id, parent: None, position: Some(position), deleted_at: None }
    }

    /// Move under `parent` (or to the root) at `position`.
    pub fn reparent(page_id: PageId, parent: Option<PageId>, position: u32) -> Self {
        Self { page_id, parent: Some(parent), position: Some(position), deleted_at: None }
    }

    pub fn trash(page_id: PageId, at: DateTime<Utc>) -> Self {
        Self { page_id, parent: None, position: None, deleted_at: Some(Some(at)) }
    }

    pub fn restore(page_id: PageId) -> Self {
        Self { page_id, parent: None, position: None, deleted_at: Some(None) }
    }
}
