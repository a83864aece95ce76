// In-memory page server.
//
// Behaves like the real server for everything the engine relies on: depth is
// recomputed authoritatively on move, sibling groups are kept dense, every
// write advances a monotonic logical clock that becomes `updated_at`.
// Failure injection, an offline switch and a call log make it usable as a
// test double for the sidebar and document session.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use folio_common::protocol::pages::{CreatePageRequest, PatchPageRequest};
use folio_common::types::{PageDocument, PageId, PageNode, WorkspaceId};

use super::{GatewayError, GatewayResult, PageGateway};

/// Gateway operation, used to target injected failures and in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    ListPages,
    CreatePage,
    MovePage,
    ReorderPages,
    SoftDeletePage,
    RestorePage,
    GetPage,
    PatchPage,
}

#[derive(Debug, Clone)]
struct StoredPage {
    node: PageNode,
    cover: Option<String>,
    content: Value,
}

impl StoredPage {
    fn document(&self) -> PageDocument {
        PageDocument { page: self.node.clone(), cover: self.cover.clone(), content: self.content.clone() }
    }
}

#[derive(Debug, Default)]
struct ServerState {
    pages: HashMap<PageId, StoredPage>,
    clock: DateTime<Utc>,
    failures: HashMap<GatewayOp, VecDeque<GatewayError>>,
    offline: bool,
    calls: Vec<GatewayOp>,
}

pub struct InMemoryGateway {
    workspace_id: WorkspaceId,
    latency: Duration,
    state: Mutex<ServerState>,
}

impl InMemoryGateway {
    pub fn new(workspace_id: impl Into<WorkspaceId>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            latency: Duration::ZERO,
            state: Mutex::new(ServerState::default()),
        }
    }

    /// Every call sleeps this long (tokio time) before touching state.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Load pages as-is. Depth is recomputed; positions are kept.
    pub fn seed(&self, pages: impl IntoIterator<Item = PageNode>) {
        let mut state = self.lock();
        for node in pages {
            if node.updated_at > state.clock {
                state.clock = node.updated_at;
            }
            state.pages.insert(node.id.clone(), StoredPage { node, cover: None, content: Value::Null });
        }
        state.recompute_depths();
    }

    pub fn seed_document(&self, document: PageDocument) {
        let mut state = self.lock();
        if document.updated_at() > state.clock {
            state.clock = document.updated_at();
        }
        let PageDocument { page, cover, content } = document;
        state.pages.insert(page.id.clone(), StoredPage { node: page, cover, content });
        state.recompute_depths();
    }

    /// Server-side snapshot of a page, trashed or not.
    pub fn page(&self, page_id: &PageId) -> Option<PageNode> {
        self.lock().pages.get(page_id).map(|stored| stored.node.clone())
    }

    pub fn document(&self, page_id: &PageId) -> Option<PageDocument> {
        self.lock().pages.get(page_id).map(StoredPage::document)
    }

    /// Non-deleted children of `parent` in position order.
    pub fn children(&self, parent: Option<&PageId>) -> Vec<PageNode> {
        let state = self.lock();
        state
            .children(parent)
            .into_iter()
            .filter_map(|id| state.pages.get(&id).map(|stored| stored.node.clone()))
            .collect()
    }

    /// Simulate another session writing to the page.
    pub fn edit_externally(&self, page_id: &PageId, patch: PatchPageRequest) -> GatewayResult<PageNode> {
        self.lock().patch(page_id, patch)
    }

    /// Queue an error for the next call of `op`.
    pub fn fail_next(&self, op: GatewayOp, error: GatewayError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    /// While offline every call fails with `Transient`.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn calls(&self) -> Vec<GatewayOp> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, op: GatewayOp) -> usize {
        self.lock().calls.iter().filter(|call| **call == op).count()
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulated network hop: latency, call log, injected failures.
    async fn enter(&self, op: GatewayOp) -> GatewayResult<MutexGuard<'_, ServerState>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut state = self.lock();
        state.calls.push(op);
        if state.offline {
            return Err(GatewayError::Transient("server unreachable".into()));
        }
        if let Some(error) = state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            debug!(?op, %error, "injected gateway failure");
            return Err(error);
        }
        Ok(state)
    }
}

#[async_trait]
impl PageGateway for InMemoryGateway {
    async fn list_pages(&self, workspace_id: &WorkspaceId) -> GatewayResult<Vec<PageNode>> {
        let state = self.enter(GatewayOp::ListPages).await?;
        if *workspace_id != self.workspace_id {
            return Err(GatewayError::rejected(404, format!("workspace {workspace_id} not found")));
        }
        let mut pages: Vec<PageNode> =
            state.pages.values().filter(|p| !p.node.is_trashed()).map(|p| p.node.clone()).collect();
        pages.sort_by(|a, b| (a.depth, a.position, &a.id).cmp(&(b.depth, b.position, &b.id)));
        Ok(pages)
    }

    async fn create_page(&self, request: CreatePageRequest) -> GatewayResult<PageNode> {
        let mut state = self.enter(GatewayOp::CreatePage).await?;
        if request.workspace_id != self.workspace_id {
            return Err(GatewayError::rejected(404, format!("workspace {} not found", request.workspace_id)));
        }
        let depth = match &request.parent_id {
            None => 0,
            Some(parent) => state.live(parent)?.depth + 1,
        };
        let position = state.append_slot(request.parent_id.as_ref());
        let now = state.tick();
        let mut node = PageNode::new(PageId::generate(), now)
            .with_parent(request.parent_id, depth)
            .with_position(position)
            .with_title(request.title.unwrap_or_default());
        node.icon = request.icon;
        state.pages.insert(node.id.clone(), StoredPage { node: node.clone(), cover: None, content: Value::Null });
        Ok(node)
    }

    async fn move_page(&self, page_id: &PageId, new_parent: Option<&PageId>) -> GatewayResult<PageNode> {
        let mut state = self.enter(GatewayOp::MovePage).await?;
        let old_parent = state.live(page_id)?.parent_id.clone();
        if let Some(parent) = new_parent {
            state.live(parent)?;
            if parent == page_id || state.is_ancestor(page_id, parent) {
                return Err(GatewayError::rejected(409, format!("moving {page_id} under {parent} creates a cycle")));
            }
        }
        if old_parent.as_ref() == new_parent {
            return state.live(page_id).cloned();
        }

        let position = state.append_slot(new_parent);
        let now = state.tick();
        if let Some(stored) = state.pages.get_mut(page_id) {
            stored.node.parent_id = new_parent.cloned();
            stored.node.position = position;
            stored.node.updated_at = now;
        }
        state.renumber(old_parent.as_ref());
        state.recompute_depths();
        state.live(page_id).cloned()
    }

    async fn reorder_pages(&self, parent: Option<&PageId>, ordered: &[PageId]) -> GatewayResult<()> {
        let mut state = self.enter(GatewayOp::ReorderPages).await?;
        let mut current = state.children(parent);
        let mut requested = ordered.to_vec();
        current.sort();
        requested.sort();
        if current != requested {
            return Err(GatewayError::rejected(409, "ordered ids do not match the sibling group"));
        }
        let now = state.tick();
        for (index, id) in ordered.iter().enumerate() {
            if let Some(stored) = state.pages.get_mut(id) {
                if stored.node.position != index as u32 {
                    stored.node.position = index as u32;
                    stored.node.updated_at = now;
                }
            }
        }
        Ok(())
    }

    async fn soft_delete_page(&self, page_id: &PageId) -> GatewayResult<PageNode> {
        let mut state = self.enter(GatewayOp::SoftDeletePage).await?;
        let parent = state.live(page_id)?.parent_id.clone();
        let now = state.tick();
        let stored = state.pages.get_mut(page_id).ok_or_else(|| GatewayError::not_found(page_id))?;
        stored.node.deleted_at = Some(now);
        stored.node.updated_at = now;
        let trashed = stored.node.clone();
        state.renumber(parent.as_ref());
        Ok(trashed)
    }

    async fn restore_page(&self, page_id: &PageId) -> GatewayResult<PageNode> {
        let mut state = self.enter(GatewayOp::RestorePage).await?;
        let node = state
            .pages
            .get(page_id)
            .map(|stored| &stored.node)
            .ok_or_else(|| GatewayError::not_found(page_id))?;
        if !node.is_trashed() {
            return Ok(node.clone());
        }
        let parent = node.parent_id.clone();
        let position = state.append_slot(parent.as_ref());
        let now = state.tick();
        let stored = state.pages.get_mut(page_id).ok_or_else(|| GatewayError::not_found(page_id))?;
        stored.node.deleted_at = None;
        stored.node.position = position;
        stored.node.updated_at = now;
        Ok(stored.node.clone())
    }

    async fn get_page(&self, page_id: &PageId) -> GatewayResult<PageDocument> {
        let state = self.enter(GatewayOp::GetPage).await?;
        state.pages.get(page_id).map(StoredPage::document).ok_or_else(|| GatewayError::not_found(page_id))
    }

    async fn patch_page(&self, page_id: &PageId, patch: PatchPageRequest) -> GatewayResult<PageNode> {
        self.enter(GatewayOp::PatchPage).await?.patch(page_id, patch)
    }
}

// ── Server state ───────────────────────────────────────────────────

impl ServerState {
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += chrono::Duration::milliseconds(1);
        self.clock
    }

    fn live(&self, page_id: &PageId) -> GatewayResult<&PageNode> {
        match self.pages.get(page_id) {
            Some(stored) if !stored.node.is_trashed() => Ok(&stored.node),
            _ => Err(GatewayError::not_found(page_id)),
        }
    }

    fn children(&self, parent: Option<&PageId>) -> Vec<PageId> {
        let mut children: Vec<&PageNode> = self
            .pages
            .values()
            .map(|stored| &stored.node)
            .filter(|node| !node.is_trashed() && node.parent_id.as_ref() == parent)
            .collect();
        children.sort_by(|a, b| (a.position, &a.id).cmp(&(b.position, &b.id)));
        children.into_iter().map(|node| node.id.clone()).collect()
    }

    fn renumber(&mut self, parent: Option<&PageId>) {
        for (index, id) in self.children(parent).into_iter().enumerate() {
            if let Some(stored) = self.pages.get_mut(&id) {
                stored.node.position = index as u32;
            }
        }
    }

    /// Renumber `parent`'s children and return the position after the last.
    fn append_slot(&mut self, parent: Option<&PageId>) -> u32 {
        self.renumber(parent);
        self.children(parent).len() as u32
    }

    /// Whether `ancestor` sits on the parent chain above `node`.
    fn is_ancestor(&self, ancestor: &PageId, node: &PageId) -> bool {
        let mut current = self.pages.get(node).and_then(|p| p.node.parent_id.as_ref());
        for _ in 0..=self.pages.len() {
            match current {
                Some(id) if id == ancestor => return true,
                Some(id) => current = self.pages.get(id).and_then(|p| p.node.parent_id.as_ref()),
                None => return false,
            }
        }
        false
    }

    fn recompute_depths(&mut self) {
        let depths: Vec<(PageId, u32)> = self
            .pages
            .keys()
            .map(|id| {
                let mut depth = 0u32;
                let mut current = self.pages.get(id).and_then(|p| p.node.parent_id.as_ref());
                while let Some(parent) = current {
                    depth += 1;
                    if depth as usize > self.pages.len() {
                        break;
                    }
                    current = self.pages.get(parent).and_then(|p| p.node.parent_id.as_ref());
                }
                (id.clone(), depth)
            })
            .collect();
        for (id, depth) in depths {
            if let Some(stored) = self.pages.get_mut(&id) {
                stored.node.depth = depth;
            }
        }
    }

    fn patch(&mut self, page_id: &PageId, patch: PatchPageRequest) -> GatewayResult<PageNode> {
        if !self.pages.contains_key(page_id) {
            return Err(GatewayError::not_found(page_id));
        }
        let now = self.tick();
        let stored = self.pages.get_mut(page_id).ok_or_else(|| GatewayError::not_found(page_id))?;
        if let Some(title) = patch.title {
            stored.node.title = title;
        }
        if let Some(icon) = patch.icon {
            stored.node.icon = Some(icon);
        }
        if let Some(cover) = patch.cover {
            stored.cover = Some(cover);
        }
        if let Some(content) = patch.content {
            stored.content = content;
        }
        stored.node.updated_at = now;
        Ok(stored.node.clone())
    }
}
