// REST route builders for the page gateway.

use crate::types::{PageId, WorkspaceId};

/// Prefix shared by every gateway route.
pub const API_PREFIX: &str = "/api";

// ── Collection routes ──────────────────────────────────────────────

pub const CREATE_PAGE: &str = "/api/pages";
pub const REORDER_PAGES: &str = "/api/pages/reorder";

/// `GET`: non-deleted pages of a workspace.
pub fn workspace_pages(workspace_id: &WorkspaceId) -> String {
    format!("{API_PREFIX}/workspaces/{workspace_id}/pages")
}

// ── Single-page routes ─────────────────────────────────────────────

/// `GET` (read), `PATCH` (autosave) and `DELETE` (soft delete).
pub fn page(page_id: &PageId) -> String {
    format!("{API_PREFIX}/pages/{page_id}")
}

/// `POST`: reparent a page.
pub fn move_page(page_id: &PageId) -> String {
    format!("{API_PREFIX}/pages/{page_id}/move")
}

/// `POST`: clear `deleted_at`.
pub fn restore_page(page_id: &PageId) -> String {
    format!("{API_PREFIX}/pages/{page_id}/restore")
}
