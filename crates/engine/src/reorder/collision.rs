// Drop-target classification.
//
// The pointer layer reports every region it currently overlaps as a
// `Collision`; this module turns that set into at most one `DropIntent`.
// Nesting only wins when the pointer is unambiguously inside a page body;
// every other ambiguity resolves to the nearest reorder gap.

use folio_common::types::PageId;
use serde::{Deserialize, Serialize};

/// A region the dragged item overlaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollisionTarget {
    /// The vertical gap that would put the dragged page at `index` among the
    /// children of `parent`.
    Gap { parent: Option<PageId>, index: usize },
    /// The body of a page that could become the new parent.
    Body { page: PageId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    pub target: CollisionTarget,
    /// The pointer itself lies inside the region (not just the dragged
    /// item's bounding box).
    pub pointer_within: bool,
    /// Distance from the pointer to the region's center, in layout units.
    pub distance: f32,
}

impl Collision {
    pub fn gap(parent: Option<PageId>, index: usize, distance: f32) -> Self {
        Self { target: CollisionTarget::Gap { parent, index }, pointer_within: false, distance }
    }

    pub fn body(page: PageId, pointer_within: bool, distance: f32) -> Self {
        Self { target: CollisionTarget::Body { page }, pointer_within, distance }
    }
}

/// What a drop would do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropIntent {
    /// Move among the current siblings to `index` (final order index).
    Reorder { parent: Option<PageId>, index: usize },
    /// Become the last child of `parent`.
    Nest { parent: PageId },
}

/// Resolve a collision set into a single intent.
pub fn classify(dragged: &PageId, collisions: &[Collision]) -> Option<DropIntent> {
    let nest = collisions
        .iter()
        .filter(|c| c.pointer_within)
        .filter_map(|c| match &c.target {
            CollisionTarget::Body { page } if page != dragged => Some((page, c.distance)),
            _ => None,
        })
        .min_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((page, _)) = nest {
        return Some(DropIntent::Nest { parent: page.clone() });
    }

    collisions
        .iter()
        .filter_map(|c| match &c.target {
            CollisionTarget::Gap { parent, index } => Some((parent, *index, c.distance)),
            CollisionTarget::Body { .. } => None,
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(parent, index, _)| DropIntent::Reorder { parent: parent.clone(), index })
}
