// Reorder/reparent engine: turns drag gestures into validated tree mutations.
//
// A gesture goes through three callbacks:
//   on_drag_start → on_drag_over* → on_drag_end | on_drag_cancel
//
// Nothing touches the tree until `on_drag_end` accepts a plan. The accepted
// plan is applied optimistically and handed back as a `PendingDrop` that
// carries the pre-drop snapshot until the gateway confirms or fails it.

pub mod collision;
pub mod plan;

pub use collision::{classify, Collision, CollisionTarget, DropIntent};
pub use plan::{plan_drop, plan_move, plan_reorder, DropPlan, PlanKind, Rejection};

use folio_common::types::PageId;
use tracing::debug;

use crate::tree::PageTree;

/// What the UI should render while hovering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPreview {
    pub intent: Option<DropIntent>,
    /// Whether dropping here would change anything.
    pub accepted: bool,
}

/// An optimistically applied drop awaiting gateway confirmation.
#[derive(Debug)]
pub struct PendingDrop {
    pub plan: DropPlan,
    snapshot: PageTree,
}

impl PendingDrop {
    /// Restore the tree to exactly its pre-drop state.
    pub fn rollback(self, tree: &mut PageTree) {
        *tree = self.snapshot;
    }

    /// The server accepted the drop; discard the snapshot.
    pub fn confirm(self) -> DropPlan {
        self.plan
    }
}

#[derive(Debug, Clone)]
struct ActiveDrag {
    dragged: PageId,
    hover: Option<DropIntent>,
}

/// Drag state for one sidebar.
#[derive(Debug, Default)]
pub struct ReorderEngine {
    active: Option<ActiveDrag>,
}

impl ReorderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dragging(&self) -> Option<&PageId> {
        self.active.as_ref().map(|drag| &drag.dragged)
    }

    pub fn hover(&self) -> Option<&DropIntent> {
        self.active.as_ref().and_then(|drag| drag.hover.as_ref())
    }

    pub fn on_drag_start(&mut self, tree: &PageTree, page: PageId) -> Result<(), Rejection> {
        if !tree.is_visible(&page) {
            return Err(Rejection::NotDraggable(page));
        }
        debug!(page_id = %page, "drag started");
        self.active = Some(ActiveDrag { dragged: page, hover: None });
        Ok(())
    }

    /// Classify the current collisions without mutating anything.
    pub fn on_drag_over(&mut self, tree: &PageTree, collisions: &[Collision]) -> DragPreview {
        let Some(drag) = self.active.as_mut() else {
            return DragPreview { intent: None, accepted: false };
        };
        let intent = classify(&drag.dragged, collisions);
        let accepted =
            intent.as_ref().is_some_and(|intent| plan_drop(tree, &drag.dragged, intent).is_ok());
        drag.hover = intent.clone();
        DragPreview { intent, accepted }
    }

    /// Finish the gesture. On success the tree already reflects the drop.
    pub fn on_drag_end(
        &mut self,
        tree: &mut PageTree,
        collisions: &[Collision],
    ) -> Result<PendingDrop, Rejection> {
        let drag = self.active.take().ok_or(Rejection::NoActiveDrag)?;
        let result = classify(&drag.dragged, collisions)
            .ok_or(Rejection::NoTarget)
            .and_then(|intent| plan_drop(tree, &drag.dragged, &intent));
        let plan = match result {
            Ok(plan) => plan,
            Err(rejection) => {
                debug!(page_id = %drag.dragged, %rejection, "drop rejected");
                return Err(rejection);
            }
        };
        self.apply_plan(tree, plan)
    }

    /// Apply an already computed plan (programmatic moves, CLI).
    pub fn apply_plan(&self, tree: &mut PageTree, plan: DropPlan) -> Result<PendingDrop, Rejection> {
        let snapshot = tree.clone();
        tree.apply(&plan.mutations).map_err(Rejection::from_tree)?;
        debug!(page_id = %plan.dragged, mutations = plan.mutations.len(), "drop applied optimistically");
        Ok(PendingDrop { plan, snapshot })
    }

    /// Abort the gesture. The tree was never touched.
    pub fn on_drag_cancel(&mut self) -> bool {
        match self.active.take() {
            Some(drag) => {
                debug!(page_id = %drag.dragged, "drag cancelled");
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use folio_common::types::PageNode;

    fn id(value: &str) -> PageId {
        PageId::from(value)
    }

    fn page(value: &str, parent: Option<&str>, position: u32) -> PageNode {
        PageNode::new(value, Utc.timestamp_opt(1, 0).single().unwrap())
            .with_parent(parent.map(PageId::from), 0)
            .with_position(position)
    }

    fn sample() -> PageTree {
        PageTree::from_pages(vec![
            page("A", None, 0),
            page("B", None, 1),
            page("C", None, 2),
            page("X", Some("A"), 0),
        ])
        .unwrap()
    }

    #[test]
    fn drag_over_previews_without_mutating() {
        let tree = sample();
        let before = tree.clone();
        let mut engine = ReorderEngine::new();
        engine.on_drag_start(&tree, id("C")).unwrap();

        let preview = engine.on_drag_over(&tree, &[Collision::gap(None, 0, 1.0)]);
        assert_eq!(preview.intent, Some(DropIntent::Reorder { parent: None, index: 0 }));
        assert!(preview.accepted);
        assert_eq!(engine.hover(), preview.intent.as_ref());
        assert_eq!(tree, before);
    }

    #[test]
    fn drag_over_flags_cycle_as_not_accepted() {
        let tree = sample();
        let mut engine = ReorderEngine::new();
        engine.on_drag_start(&tree, id("A")).unwrap();
        let preview = engine.on_drag_over(&tree, &[Collision::body(id("X"), true, 0.0)]);
        assert_eq!(preview.intent, Some(DropIntent::Nest { parent: id("X") }));
        assert!(!preview.accepted);
    }

    #[test]
    fn drag_end_applies_and_rollback_restores() {
        let mut tree = sample();
        let before = tree.clone();
        let mut engine = ReorderEngine::new();
        engine.on_drag_start(&tree, id("B")).unwrap();

        let pending =
            engine.on_drag_end(&mut tree, &[Collision::body(id("A"), true, 0.0)]).unwrap();
        assert_eq!(tree.get(&id("B")).unwrap().parent_id, Some(id("A")));
        assert!(engine.dragging().is_none());

        pending.rollback(&mut tree);
        assert_eq!(tree, before);
    }

    #[test]
    fn cycle_drop_leaves_tree_unchanged() {
        let mut tree = sample();
        let before = tree.clone();
        let mut engine = ReorderEngine::new();
        engine.on_drag_start(&tree, id("A")).unwrap();

        let err = engine.on_drag_end(&mut tree, &[Collision::body(id("X"), true, 0.0)]).unwrap_err();
        assert!(err.is_cycle());
        assert_eq!(tree, before);
    }

    #[test]
    fn drop_outside_any_target_is_rejected() {
        let mut tree = sample();
        let mut engine = ReorderEngine::new();
        engine.on_drag_start(&tree, id("A")).unwrap();
        let err = engine.on_drag_end(&mut tree, &[]).unwrap_err();
        assert_eq!(err, Rejection::NoTarget);
    }

    #[test]
    fn cancel_clears_drag_state() {
        let tree = sample();
        let mut engine = ReorderEngine::new();
        engine.on_drag_start(&tree, id("A")).unwrap();
        assert!(engine.on_drag_cancel());
        assert!(engine.dragging().is_none());
        assert!(!engine.on_drag_cancel());
    }

    #[test]
    fn drag_end_without_start_is_rejected() {
        let mut tree = sample();
        let mut engine = ReorderEngine::new();
        let err = engine.on_drag_end(&mut tree, &[Collision::gap(None, 0, 0.0)]).unwrap_err();
        assert_eq!(err, Rejection::NoActiveDrag);
    }

    #[test]
    fn unknown_page_cannot_start_drag() {
        let tree = sample();
        let mut engine = ReorderEngine::new();
        assert_eq!(
            engine.on_drag_start(&tree, id("ghost")).unwrap_err(),
            Rejection::NotDraggable(id("ghost"))
        );
    }
}
