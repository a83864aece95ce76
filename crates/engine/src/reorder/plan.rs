// Drop planning: validate an intent against the tree and emit the minimal
// mutation list that realizes it.

use folio_common::types::{PageId, PageNode};
use thiserror::Error;

use super::collision::DropIntent;
use crate::tree::{Mutation, PageTree, TreeError};

/// Why a drop produced no mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("drop would create a cycle: {0}")]
    Cycle(TreeError),

    #[error("drop leaves the tree unchanged")]
    NoChange,

    #[error("gap belongs to a different sibling group than {0}")]
    ForeignSiblingGroup(PageId),

    #[error("page {0} cannot be dragged")]
    NotDraggable(PageId),

    #[error("page {0} is not a valid drop target")]
    InvalidTarget(PageId),

    #[error("no drop target under the pointer")]
    NoTarget,

    #[error("no drag in progress")]
    NoActiveDrag,

    #[error(transparent)]
    Tree(TreeError),
}

impl Rejection {
    pub(crate) fn from_tree(error: TreeError) -> Self {
        match error {
            TreeError::CycleDetected { .. } => Self::Cycle(error),
            other => Self::Tree(other),
        }
    }

    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle(_))
    }
}

/// Shape of the gateway request a plan maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanKind {
    /// Persist the full sibling order of `parent`.
    Reorder { parent: Option<PageId>, ordered: Vec<PageId> },
    /// Reparent `page` under `new_parent`.
    Move { page: PageId, new_parent: Option<PageId> },
}

/// A validated drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropPlan {
    pub dragged: PageId,
    pub kind: PlanKind,
    pub mutations: Vec<Mutation>,
}

/// Validate `intent` for `dragged` and compute its mutations.
pub fn plan_drop(tree: &PageTree, dragged: &PageId, intent: &DropIntent) -> Result<DropPlan, Rejection> {
    let node = draggable(tree, dragged)?;
    match intent {
        DropIntent::Reorder { parent, index } => {
            if node.parent_id != *parent {
                return Err(Rejection::ForeignSiblingGroup(dragged.clone()));
            }
            plan_reorder(tree, dragged, parent.as_ref(), *index)
        }
        DropIntent::Nest { parent } => plan_move(tree, dragged, Some(parent)),
    }
}

/// Move `dragged` to `index` (final order index, clamped) among its current
/// siblings and renumber the whole group densely.
pub fn plan_reorder(
    tree: &PageTree,
    dragged: &PageId,
    parent: Option<&PageId>,
    index: usize,
) -> Result<DropPlan, Rejection> {
    let mut ordered = tree.child_ids(parent);
    let old_index = ordered
        .iter()
        .position(|id| id == dragged)
        .ok_or_else(|| Rejection::NotDraggable(dragged.clone()))?;
    let new_index = index.min(ordered.len() - 1);
    if old_index == new_index {
        return Err(Rejection::NoChange);
    }

    let moved = ordered.remove(old_index);
    ordered.insert(new_index, moved);

    let mutations = renumber(tree, &ordered);
    Ok(DropPlan {
        dragged: dragged.clone(),
        kind: PlanKind::Reorder { parent: parent.cloned(), ordered },
        mutations,
    })
}

/// Reparent `dragged` as the last child of `new_parent` (`None` = root).
///
/// Besides the reparent itself, siblings left behind and siblings at the
/// destination are renumbered so both groups stay dense.
pub fn plan_move(
    tree: &PageTree,
    dragged: &PageId,
    new_parent: Option<&PageId>,
) -> Result<DropPlan, Rejection> {
    let node = draggable(tree, dragged)?;

    if let Some(target) = new_parent {
        if target == dragged {
            return Err(Rejection::Cycle(TreeError::CycleDetected {
                node: dragged.clone(),
                parent: target.clone(),
            }));
        }
        if !tree.is_visible(target) {
            return Err(Rejection::InvalidTarget(target.clone()));
        }
        if tree.is_descendant(dragged, target).map_err(Rejection::Tree)? {
            return Err(Rejection::Cycle(TreeError::CycleDetected {
                node: dragged.clone(),
                parent: target.clone(),
            }));
        }
    }

    if node.parent_id.as_ref() == new_parent {
        return plan_reorder(tree, dragged, new_parent, usize::MAX);
    }

    let destination = tree.child_ids(new_parent);
    let mut mutations = renumber(tree, &destination);
    mutations.push(Mutation::reparent(
        dragged.clone(),
        new_parent.cloned(),
        destination.len() as u32,
    ));

    let vacated: Vec<PageId> =
        tree.child_ids(node.parent_id.as_ref()).into_iter().filter(|id| id != dragged).collect();
    mutations.extend(renumber(tree, &vacated));

    Ok(DropPlan {
        dragged: dragged.clone(),
        kind: PlanKind::Move { page: dragged.clone(), new_parent: new_parent.cloned() },
        mutations,
    })
}

fn draggable<'a>(tree: &'a PageTree, dragged: &PageId) -> Result<&'a PageNode, Rejection> {
    match tree.get(dragged) {
        Some(node) if tree.is_visible(dragged) => Ok(node),
        _ => Err(Rejection::NotDraggable(dragged.clone())),
    }
}

/// Position mutations for every page in `ordered` whose position differs
/// from its index.
fn renumber(tree: &PageTree, ordered: &[PageId]) -> Vec<Mutation> {
    ordered
        .iter()
        .enumerate()
        .filter(|(index, id)| tree.get(id).is_some_and(|page| page.position != *index as u32))
        .map(|(index, id)| Mutation::reposition(id.clone(), index as u32))
        .collect()
}
