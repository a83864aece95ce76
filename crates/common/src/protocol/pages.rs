// Request and response bodies for the page gateway.

use serde::{Deserialize, Serialize};

use crate::types::{PageId, PageNode, WorkspaceId};

// ── Requests ───────────────────────────────────────────────────────

/// Body of `createPage`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatePageRequest {
    pub workspace_id: WorkspaceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<PageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Body of `movePage`. A `null` parent moves the page to the workspace root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovePageRequest {
    pub new_parent_id: Option<PageId>,
}

/// Body of `reorderPages`. The server persists positions `0..n-1` in the
/// order given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReorderPagesRequest {
    pub parent_id: Option<PageId>,
    pub ordered_page_ids: Vec<PageId>,
}

/// Body of `patchPage` (the autosave path). Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatchPageRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

// ── Responses ──────────────────────────────────────────────────────

/// Body returned by `listPages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListPagesResponse {
    #[serde(default)]
    pub pages: Vec<PageNode>,
}

/// Error envelope returned with any non-success status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}
