// Page tree model: structural queries, transactional mutation, depth derivation.
//
// Holds every page the client knows about (including trashed ones, which are
// retained for restore). Traversal helpers skip trashed pages and everything
// beneath them without touching the descendants' own `deleted_at`.

mod mutation;

pub use mutation::Mutation;

use std::collections::{HashMap, HashSet, VecDeque};

use folio_common::types::{PageId, PageNode};
use thiserror::Error;
use tracing::warn;

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("moving {node} under {parent} would create a cycle")]
    CycleDetected { node: PageId, parent: PageId },

    #[error("unknown page: {0}")]
    UnknownPage(PageId),

    #[error("page {node} references missing parent {parent}")]
    UnknownParent { node: PageId, parent: PageId },

    #[error("parent chain of {node} loops back on itself")]
    CorruptHierarchy { node: PageId },

    #[error("duplicate page id: {0}")]
    DuplicatePage(PageId),

    #[error("page {node} has depth {actual}, expected {expected}")]
    DepthMismatch { node: PageId, expected: u32, actual: u32 },

    #[error("siblings under {parent:?} share position {position}")]
    DuplicatePosition { parent: Option<PageId>, position: u32 },
}

// ── Tree ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    node: PageNode,
    /// Insertion order, used to break position ties deterministically.
    seq: u64,
}

/// One row of the rendered sidebar outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutlineRow<'a> {
    pub depth: u32,
    pub page: &'a PageNode,
}

/// The client-side set of pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTree {
    entries: HashMap<PageId, Entry>,
    next_seq: u64,
}

impl PageTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a server listing. Depths are re-derived from the
    /// parent chain; a listing that contains a cycle is rejected.
    pub fn from_pages(pages: impl IntoIterator<Item = PageNode>) -> Result<Self, TreeError> {
        let mut tree = Self::new();
        for page in pages {
            if tree.entries.contains_key(&page.id) {
                return Err(TreeError::DuplicatePage(page.id));
            }
            tree.insert_entry(page);
        }
        derive_depths(&mut tree.entries)?;
        Ok(tree)
    }

    fn insert_entry(&mut self, node: PageNode) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(node.id.clone(), Entry { node, seq });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &PageId) -> Option<&PageNode> {
        self.entries.get(id).map(|entry| &entry.node)
    }

    pub fn contains(&self, id: &PageId) -> bool {
        self.entries.contains_key(id)
    }

    /// Every known page, trashed or not, in no particular order.
    pub fn pages(&self) -> impl Iterator<Item = &PageNode> {
        self.entries.values().map(|entry| &entry.node)
    }

    /// Non-deleted children of `parent` (`None` = root), ordered by position
    /// with insertion order breaking ties.
    pub fn children_of(&self, parent: Option<&PageId>) -> Vec<&PageNode> {
        sorted_children(&self.entries, parent).into_iter().map(|entry| &entry.node).collect()
    }

    pub fn child_ids(&self, parent: Option<&PageId>) -> Vec<PageId> {
        self.children_of(parent).into_iter().map(|page| page.id.clone()).collect()
    }

    pub fn roots(&self) -> Vec<&PageNode> {
        self.children_of(None)
    }

    /// Distinct parents that have at least one non-deleted child.
    pub fn sibling_groups(&self) -> Vec<Option<PageId>> {
        let mut groups: Vec<Option<PageId>> = self
            .entries
            .values()
            .filter(|entry| !entry.node.is_trashed())
            .map(|entry| entry.node.parent_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        groups.sort();
        groups
    }

    /// True when the children of `parent` carry positions exactly `0..k-1`.
    pub fn is_densely_ordered(&self, parent: Option<&PageId>) -> bool {
        self.children_of(parent).iter().enumerate().all(|(index, page)| page.position == index as u32)
    }

    /// Whether `ancestor` appears on the parent chain above `node`.
    ///
    /// The walk is bounded by the number of known pages, so a hierarchy that
    /// already contains a cycle yields `CorruptHierarchy` instead of looping.
    pub fn is_descendant(&self, ancestor: &PageId, node: &PageId) -> Result<bool, TreeError> {
        is_descendant_in(&self.entries, ancestor, node)
    }

    /// A page is visible when neither it nor any ancestor is trashed and the
    /// whole parent chain resolves.
    pub fn is_visible(&self, id: &PageId) -> bool {
        let mut current = id;
        for _ in 0..=self.entries.len() {
            let Some(entry) = self.entries.get(current) else {
                return false;
            };
            if entry.node.is_trashed() {
                return false;
            }
            match &entry.node.parent_id {
                Some(parent) => current = parent,
                None => return true,
            }
        }
        warn!(page_id = %id, "parent chain exceeded tree size while checking visibility");
        false
    }

    /// Depth-first, position-ordered rows for rendering the sidebar.
    pub fn visible_outline(&self) -> Vec<OutlineRow<'_>> {
        let mut rows = Vec::with_capacity(self.entries.len());
        let mut stack: Vec<&PageNode> = self.roots().into_iter().rev().collect();
        while let Some(page) = stack.pop() {
            rows.push(OutlineRow { depth: page.depth, page });
            stack.extend(self.children_of(Some(&page.id)).into_iter().rev());
        }
        rows
    }

    /// The trash partition, most recently trashed first.
    pub fn trashed(&self) -> Vec<&PageNode> {
        let mut pages: Vec<&PageNode> =
            self.entries.values().map(|entry| &entry.node).filter(|page| page.is_trashed()).collect();
        pages.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at).then_with(|| a.id.cmp(&b.id)));
        pages
    }

    /// Apply structural mutations all-or-nothing, then re-derive depth for
    /// every page whose ancestor chain changed.
    ///
    /// Any mutation that would make a page its own ancestor fails the whole
    /// batch with `CycleDetected` and leaves the tree untouched.
    pub fn apply(&mut self, mutations: &[Mutation]) -> Result<(), TreeError> {
        let mut staged = self.entries.clone();
        for mutation in mutations {
            apply_one(&mut staged, mutation)?;
        }
        derive_depths(&mut staged)?;
        self.entries = staged;
        Ok(())
    }

    /// Insert or replace one page with the server's copy.
    pub fn upsert(&mut self, node: PageNode) -> Result<(), TreeError> {
        let mut staged = self.entries.clone();
        let mut next_seq = self.next_seq;
        match staged.get_mut(&node.id) {
            Some(entry) => entry.node = node,
            None => {
                staged.insert(node.id.clone(), Entry { node, seq: next_seq });
                next_seq += 1;
            }
        }
        derive_depths(&mut staged)?;
        self.entries = staged;
        self.next_seq = next_seq;
        Ok(())
    }

    /// Replace the tree with a fresh server listing.
    ///
    /// Listings only carry non-deleted pages, so locally known trashed pages
    /// absent from the listing are kept for the trash view. Known pages keep
    /// their insertion order.
    pub fn replace_all(&mut self, pages: impl IntoIterator<Item = PageNode>) -> Result<(), TreeError> {
        let mut staged: HashMap<PageId, Entry> = HashMap::new();
        let mut next_seq = self.next_seq;
        for page in pages {
            if staged.contains_key(&page.id) {
                return Err(TreeError::DuplicatePage(page.id));
            }
            let seq = match self.entries.get(&page.id) {
                Some(existing) => existing.seq,
                None => {
                    next_seq += 1;
                    next_seq - 1
                }
            };
            staged.insert(page.id.clone(), Entry { node: page, seq });
        }
        for (id, entry) in &self.entries {
            if entry.node.is_trashed() && !staged.contains_key(id) {
                staged.insert(id.clone(), entry.clone());
            }
        }
        derive_depths(&mut staged)?;
        self.entries = staged;
        self.next_seq = next_seq;
        Ok(())
    }

    /// Verify acyclicity, depth consistency, resolvable parents and unique
    /// sibling positions. Reports the first violation found.
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        let mut ids: Vec<&PageId> = self.entries.keys().collect();
        ids.sort();

        for id in &ids {
            if is_descendant_in(&self.entries, id, id)? {
                return Err(TreeError::CorruptHierarchy { node: (*id).clone() });
            }
        }

        for id in &ids {
            let node = &self.entries[*id].node;
            let expected = match &node.parent_id {
                None => 0,
                Some(parent) => match self.entries.get(parent) {
                    Some(parent_entry) => parent_entry.node.depth + 1,
                    None if node.is_trashed() => continue,
                    None => {
                        return Err(TreeError::UnknownParent {
                            node: node.id.clone(),
                            parent: parent.clone(),
                        })
                    }
                },
            };
            if node.depth != expected {
                return Err(TreeError::DepthMismatch {
                    node: node.id.clone(),
                    expected,
                    actual: node.depth,
                });
            }
        }

        for parent in self.sibling_groups() {
            let mut seen = HashSet::new();
            for page in self.children_of(parent.as_ref()) {
                if !seen.insert(page.position) {
                    return Err(TreeError::DuplicatePosition { parent, position: page.position });
                }
            }
        }
        Ok(())
    }
}

// ── Internals ──────────────────────────────────────────────────────

fn sorted_children<'a>(entries: &'a HashMap<PageId, Entry>, parent: Option<&PageId>) -> Vec<&'a Entry> {
    let mut children: Vec<&Entry> = entries
        .values()
        .filter(|entry| !entry.node.is_trashed() && entry.node.parent_id.as_ref() == parent)
        .collect();
    children.sort_by_key(|entry| (entry.node.position, entry.seq));
    children
}

fn is_descendant_in(
    entries: &HashMap<PageId, Entry>,
    ancestor: &PageId,
    node: &PageId,
) -> Result<bool, TreeError> {
    let start = entries.get(node).ok_or_else(|| TreeError::UnknownPage(node.clone()))?;
    let mut current = start.node.parent_id.as_ref();
    let mut steps = 0usize;
    while let Some(id) = current {
        if id == ancestor {
            return Ok(true);
        }
        steps += 1;
        if steps > entries.len() {
            warn!(page_id = %node, "cycle detected in existing parent chain");
            return Err(TreeError::CorruptHierarchy { node: node.clone() });
        }
        current = entries.get(id).and_then(|entry| entry.node.parent_id.as_ref());
    }
    Ok(false)
}

fn apply_one(entries: &mut HashMap<PageId, Entry>, mutation: &Mutation) -> Result<(), TreeError> {
    let page_id = &mutation.page_id;
    if !entries.contains_key(page_id) {
        return Err(TreeError::UnknownPage(page_id.clone()));
    }

    if let Some(Some(parent)) = &mutation.parent {
        if parent == page_id {
            return Err(TreeError::CycleDetected { node: page_id.clone(), parent: parent.clone() });
        }
        if !entries.contains_key(parent) {
            return Err(TreeError::UnknownParent { node: page_id.clone(), parent: parent.clone() });
        }
        if is_descendant_in(entries, page_id, parent)? {
            return Err(TreeError::CycleDetected { node: page_id.clone(), parent: parent.clone() });
        }
    }

    let entry = entries.get_mut(page_id).ok_or_else(|| TreeError::UnknownPage(page_id.clone()))?;
    if let Some(parent) = &mutation.parent {
        entry.node.parent_id = parent.clone();
    }
    if let Some(position) = mutation.position {
        entry.node.position = position;
    }
    if let Some(deleted_at) = mutation.deleted_at {
        entry.node.deleted_at = deleted_at;
    }
    Ok(())
}

/// Recompute `depth` for every page by walking down from the roots.
///
/// Pages whose parent is unknown keep their stored depth and seed their own
/// subtree. Pages that cannot be reached at all sit on a cycle.
fn derive_depths(entries: &mut HashMap<PageId, Entry>) -> Result<(), TreeError> {
    let mut children: HashMap<PageId, Vec<PageId>> = HashMap::new();
    let mut queue: VecDeque<(PageId, u32)> = VecDeque::new();

    for (id, entry) in entries.iter() {
        match &entry.node.parent_id {
            None => queue.push_back((id.clone(), 0)),
            Some(parent) if !entries.contains_key(parent) => {
                queue.push_back((id.clone(), entry.node.depth));
            }
            Some(parent) => children.entry(parent.clone()).or_default().push(id.clone()),
        }
    }

    let mut depths: HashMap<PageId, u32> = HashMap::with_capacity(entries.len());
    while let Some((id, depth)) = queue.pop_front() {
        if let Some(kids) = children.get(&id) {
            for kid in kids {
                queue.push_back((kid.clone(), depth + 1));
            }
        }
        depths.insert(id, depth);
    }

    if depths.len() != entries.len() {
        let mut unreached: Vec<&PageId> =
            entries.keys().filter(|id| !depths.contains_key(*id)).collect();
        unreached.sort();
        if let Some(node) = unreached.first() {
            return Err(TreeError::CorruptHierarchy { node: (*node).clone() });
        }
    }

    for (id, depth) in depths {
        if let Some(entry) = entries.get_mut(&id) {
            entry.node.depth = depth;
        }
    }
    Ok(())
}
