// Persistence gateway: the only path between the engine and the page server.
//
// The server is authoritative. Every operation returns the server's view of
// the affected page(s); the engine reconciles its optimistic state against
// that response, never the other way around.
//
// `HttpGateway` talks to the REST API; `InMemoryGateway` is a deterministic
// stand-in used by tests and offline tooling.

pub mod http;
pub mod memory;

pub use http::HttpGateway;
pub use memory::{GatewayOp, InMemoryGateway};

use std::sync::Arc;

use async_trait::async_trait;
use folio_common::protocol::pages::{CreatePageRequest, PatchPageRequest};
use folio_common::types::{PageDocument, PageId, PageNode, WorkspaceId};
use thiserror::Error;

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The server answered and refused (validation, conflict, not found).
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Network trouble or a 5xx; the same request may succeed later.
    #[error("transient gateway failure: {0}")]
    Transient(String),

    /// The response body did not match the expected shape.
    #[error("malformed gateway response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected { status, message: message.into() }
    }

    pub fn not_found(page_id: &PageId) -> Self {
        Self::rejected(404, format!("page {page_id} not found"))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Rejected { status: 404, .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Rejected { status: 409, .. })
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

// ── Trait ──────────────────────────────────────────────────────────

/// Server operations the engine depends on.
#[async_trait]
pub trait PageGateway: Send + Sync {
    /// Non-deleted pages of a workspace.
    async fn list_pages(&self, workspace_id: &WorkspaceId) -> GatewayResult<Vec<PageNode>>;

    /// Create a page as the last child of `parent_id` (or last root).
    async fn create_page(&self, request: CreatePageRequest) -> GatewayResult<PageNode>;

    /// Reparent a page. The server recomputes depth for the whole subtree
    /// and appends the page to the new sibling group.
    async fn move_page(&self, page_id: &PageId, new_parent: Option<&PageId>) -> GatewayResult<PageNode>;

    /// Persist positions `0..n-1` for `ordered` under `parent`.
    async fn reorder_pages(&self, parent: Option<&PageId>, ordered: &[PageId]) -> GatewayResult<()>;

    async fn soft_delete_page(&self, page_id: &PageId) -> GatewayResult<PageNode>;

    async fn restore_page(&self, page_id: &PageId) -> GatewayResult<PageNode>;

    /// Full document including content; `updated_at` is the server version.
    async fn get_page(&self, page_id: &PageId) -> GatewayResult<PageDocument>;

    /// Autosave. Only fields present in `patch` are written.
    async fn patch_page(&self, page_id: &PageId, patch: PatchPageRequest) -> GatewayResult<PageNode>;
}

#[async_trait]
impl<G: PageGateway + ?Sized> PageGateway for Arc<G> {
    async fn list_pages(&self, workspace_id: &WorkspaceId) -> GatewayResult<Vec<PageNode>> {
        (**self).list_pages(workspace_id).await
    }

    async fn create_page(&self, request: CreatePageRequest) -> GatewayResult<PageNode> {
        (**self).create_page(request).await
    }

    async fn move_page(&self, page_id: &PageId, new_parent: Option<&PageId>) -> GatewayResult<PageNode> {
        (**self).move_page(page_id, new_parent).await
    }

    async fn reorder_pages(&self, parent: Option<&PageId>, ordered: &[PageId]) -> GatewayResult<()> {
        (**self).reorder_pages(parent, ordered).await
    }

    async fn soft_delete_page(&self, page_id: &PageId) -> GatewayResult<PageNode> {
        (**self).soft_delete_page(page_id).await
    }

    async fn restore_page(&self, page_id: &PageId) -> GatewayResult<PageNode> {
        (**self).restore_page(page_id).await
    }

    async fn get_page(&self, page_id: &PageId) -> GatewayResult<PageDocument> {
        (**self).get_page(page_id).await
    }

    async fn patch_page(&self, page_id: &PageId, patch: PatchPageRequest) -> GatewayResult<PageNode> {
        (**self).patch_page(page_id, patch).await
    }
}
