// Sidebar controller: the page tree as the UI sees it, wired to the gateway.
//
// Structural changes are applied to the local tree first and published, then
// sent to the server. A failed request restores the pre-change snapshot
// before the error is returned, so the UI and server never disagree for
// longer than one in-flight request.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use folio_common::protocol::pages::CreatePageRequest;
use folio_common::types::{PageId, PageNode, WorkspaceId};

use crate::gateway::{GatewayError, PageGateway};
use crate::reorder::{
    plan_move, plan_reorder, Collision, DragPreview, DropPlan, PendingDrop, PlanKind, Rejection,
    ReorderEngine,
};
use crate::tree::{Mutation, PageTree, TreeError};

#[derive(Debug, Error)]
pub enum SidebarError {
    /// Rejected locally; nothing was sent and the tree is unchanged.
    #[error(transparent)]
    Drop(#[from] Rejection),

    /// The server refused or could not be reached. `rolled_back` is set when
    /// an optimistic change was undone before returning.
    #[error("{op} failed: {source}")]
    Gateway { op: &'static str, source: GatewayError, rolled_back: bool },

    /// Trashed, or hidden under a trashed ancestor.
    #[error("page {0} is not visible in the sidebar")]
    NotVisible(PageId),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl SidebarError {
    fn gateway(op: &'static str) -> impl FnOnce(GatewayError) -> Self {
        move |source| Self::Gateway { op, source, rolled_back: false }
    }

    fn reverted(op: &'static str) -> impl FnOnce(GatewayError) -> Self {
        move |source| Self::Gateway { op, source, rolled_back: true }
    }

    /// Whether an optimistic change was undone.
    pub fn rolled_back(&self) -> bool {
        matches!(self, Self::Gateway { rolled_back: true, .. })
    }
}

pub struct SidebarController<G: ?Sized> {
    gateway: Arc<G>,
    workspace_id: WorkspaceId,
    tree: PageTree,
    engine: ReorderEngine,
    updates: watch::Sender<Arc<PageTree>>,
}

impl<G> SidebarController<G>
where
    G: PageGateway + ?Sized,
{
    pub fn new(gateway: Arc<G>, workspace_id: WorkspaceId) -> Self {
        let (updates, _) = watch::channel(Arc::new(PageTree::new()));
        Self { gateway, workspace_id, tree: PageTree::new(), engine: ReorderEngine::new(), updates }
    }

    pub fn workspace_id(&self) -> &WorkspaceId {
        &self.workspace_id
    }

    pub fn tree(&self) -> &PageTree {
        &self.tree
    }

    /// Receiver notified with a fresh snapshot after every tree change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<PageTree>> {
        self.updates.subscribe()
    }

    /// Reload the whole tree from the server.
    pub async fn refresh(&mut self) -> Result<(), SidebarError> {
        let pages = self
            .gateway
            .list_pages(&self.workspace_id)
            .await
            .map_err(SidebarError::gateway("list pages"))?;
        let count = pages.len();
        self.tree.replace_all(pages)?;
        info!(workspace_id = %self.workspace_id, pages = count, "sidebar refreshed");
        self.publish();
        Ok(())
    }

    // ── Drag gestures ──────────────────────────────────────────────

    pub fn drag_start(&mut self, page: PageId) -> Result<(), SidebarError> {
        Ok(self.engine.on_drag_start(&self.tree, page)?)
    }

    pub fn drag_over(&mut self, collisions: &[Collision]) -> DragPreview {
        self.engine.on_drag_over(&self.tree, collisions)
    }

    pub fn drag_cancel(&mut self) -> bool {
        self.engine.on_drag_cancel()
    }

    /// Drop, apply optimistically, then persist.
    pub async fn drag_end(&mut self, collisions: &[Collision]) -> Result<DropPlan, SidebarError> {
        let pending = self.engine.on_drag_end(&mut self.tree, collisions)?;
        self.publish();
        self.commit(pending).await
    }

    // ── Programmatic moves ─────────────────────────────────────────

    /// Move `page` to `index` among its current siblings.
    pub async fn reorder_page(&mut self, page: &PageId, index: usize) -> Result<DropPlan, SidebarError> {
        let parent = self
            .tree
            .get(page)
            .ok_or_else(|| TreeError::UnknownPage(page.clone()))?
            .parent_id
            .clone();
        let plan = plan_reorder(&self.tree, page, parent.as_ref(), index)?;
        let pending = self.engine.apply_plan(&mut self.tree, plan)?;
        self.publish();
        self.commit(pending).await
    }

    /// Make `page` the last child of `new_parent` (`None` = root).
    pub async fn move_page(&mut self, page: &PageId, new_parent: Option<&PageId>) -> Result<DropPlan, SidebarError> {
        let plan = plan_move(&self.tree, page, new_parent)?;
        let pending = self.engine.apply_plan(&mut self.tree, plan)?;
        self.publish();
        self.commit(pending).await
    }

    async fn commit(&mut self, pending: PendingDrop) -> Result<DropPlan, SidebarError> {
        let result = match &pending.plan.kind {
            PlanKind::Reorder { parent, ordered } => self
                .gateway
                .reorder_pages(parent.as_ref(), ordered)
                .await
                .map(|()| None)
                .map_err(SidebarError::reverted("reorder pages")),
            PlanKind::Move { page, new_parent } => self
                .gateway
                .move_page(page, new_parent.as_ref())
                .await
                .map(Some)
                .map_err(SidebarError::reverted("move page")),
        };

        match result {
            Ok(confirmed) => {
                let plan = pending.confirm();
                if let Some(node) = confirmed {
                    self.adopt(node).await?;
                }
                debug!(page_id = %plan.dragged, "drop confirmed");
                Ok(plan)
            }
            Err(err) => {
                warn!(page_id = %pending.plan.dragged, error = %err, "drop rolled back");
                pending.rollback(&mut self.tree);
                self.publish();
                Err(err)
            }
        }
    }

    /// Take the server's copy of a page; fall back to a full refresh if it
    /// does not fit the local tree.
    async fn adopt(&mut self, node: PageNode) -> Result<(), SidebarError> {
        let page_id = node.id.clone();
        if let Err(err) = self.tree.upsert(node) {
            warn!(page_id = %page_id, error = %err, "server copy rejected locally, refreshing");
            return self.refresh().await;
        }
        self.publish();
        Ok(())
    }

    // ── Create / trash / restore ───────────────────────────────────

    /// Create a page as the last child of `parent` and reload the tree.
    pub async fn create_page(
        &mut self,
        parent: Option<PageId>,
        title: Option<String>,
    ) -> Result<PageNode, SidebarError> {
        let request = CreatePageRequest {
            workspace_id: self.workspace_id.clone(),
            parent_id: parent,
            title,
            icon: None,
        };
        let created =
            self.gateway.create_page(request).await.map_err(SidebarError::gateway("create page"))?;
        info!(page_id = %created.id, "page created");
        self.refresh().await?;
        Ok(created)
    }

    /// Soft-delete a page and close the gap it leaves among its siblings.
    /// Descendants keep their own `deleted_at` and simply become invisible.
    pub async fn trash_page(&mut self, page: &PageId) -> Result<(), SidebarError> {
        let Some(node) = self.tree.get(page).filter(|_| self.tree.is_visible(page)) else {
            return Err(SidebarError::NotVisible(page.clone()));
        };
        let parent = node.parent_id.clone();
        let mut mutations = vec![Mutation::trash(page.clone(), Utc::now())];
        let remaining = self.tree.children_of(parent.as_ref()).into_iter().filter(|p| &p.id != page);
        mutations.extend(
            remaining
                .enumerate()
                .filter(|(index, p)| p.position != *index as u32)
                .map(|(index, p)| Mutation::reposition(p.id.clone(), index as u32)),
        );

        let snapshot = self.tree.clone();
        self.tree.apply(&mutations)?;
        self.publish();

        match self.gateway.soft_delete_page(page).await {
            Ok(node) => {
                info!(page_id = %page, "page trashed");
                self.adopt(node).await
            }
            Err(err) => {
                warn!(page_id = %page, error = %err, "trash rolled back");
                self.tree = snapshot;
                self.publish();
                Err(SidebarError::reverted("trash page")(err))
            }
        }
    }

    /// Bring a page back from the trash as the last child of its parent.
    pub async fn restore_page(&mut self, page: &PageId) -> Result<(), SidebarError> {
        let snapshot = self.tree.clone();
        let optimistic = match self.tree.get(page).filter(|node| node.is_trashed()) {
            Some(node) => {
                let position = self.tree.children_of(node.parent_id.as_ref()).len() as u32;
                self.tree.apply(&[
                    Mutation::restore(page.clone()),
                    Mutation::reposition(page.clone(), position),
                ])?;
                self.publish();
                true
            }
            None => false,
        };

        match self.gateway.restore_page(page).await {
            Ok(node) => {
                info!(page_id = %page, "page restored");
                self.adopt(node).await
            }
            Err(err) if optimistic => {
                warn!(page_id = %page, error = %err, "restore rolled back");
                self.tree = snapshot;
                self.publish();
                Err(SidebarError::reverted("restore page")(err))
            }
            Err(err) => Err(SidebarError::gateway("restore page")(err)),
        }
    }

    fn publish(&self) {
        self.updates.send_replace(Arc::new(self.tree.clone()));
    }
}
