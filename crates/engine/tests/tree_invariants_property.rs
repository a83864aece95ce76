use chrono::{TimeZone, Utc};
use folio_common::types::{PageId, PageNode};
use folio_engine::reorder::{plan_move, plan_reorder};
use folio_engine::tree::{Mutation, PageTree, TreeError};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Reorder { page: usize, index: usize },
    Nest { page: usize, under: usize },
    ToRoot { page: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<usize>(), 0usize..12).prop_map(|(page, index)| Op::Reorder { page, index }),
        (any::<usize>(), any::<usize>()).prop_map(|(page, under)| Op::Nest { page, under }),
        any::<usize>().prop_map(|page| Op::ToRoot { page }),
    ]
}

/// Parent choices for pages `1..n`: `None` is root, `Some(k)` picks one of
/// the earlier pages, which keeps the generated hierarchy acyclic.
fn parents(max: usize) -> impl Strategy<Value = Vec<Option<usize>>> {
    proptest::collection::vec(proptest::option::weighted(0.7, any::<usize>()), 1..max)
}

fn build(parents: &[Option<usize>]) -> PageTree {
    let updated_at = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
    let mut next_position: Vec<(Option<usize>, u32)> = Vec::new();
    let mut pages = Vec::with_capacity(parents.len());
    for (i, parent) in parents.iter().enumerate() {
        let parent = if i == 0 { None } else { parent.map(|p| p % i) };
        let position = match next_position.iter_mut().find(|(group, _)| *group == parent) {
            Some((_, next)) => {
                *next += 1;
                *next - 1
            }
            None => {
                next_position.push((parent, 1));
                0
            }
        };
        pages.push(
            PageNode::new(name(i), updated_at)
                .with_parent(parent.map(name), 0)
                .with_position(position),
        );
    }
    PageTree::from_pages(pages).unwrap()
}

fn name(i: usize) -> PageId {
    PageId::new(format!("p{i}"))
}

fn assert_dense(tree: &PageTree) {
    for parent in tree.sibling_groups() {
        assert!(tree.is_densely_ordered(parent.as_ref()), "group {parent:?} is not dense");
    }
}

fn run(tree: &mut PageTree, op: &Op, n: usize) {
    let plan = match op {
        Op::Reorder { page, index } => {
            let page = name(page % n);
            let parent = tree.get(&page).unwrap().parent_id.clone();
            plan_reorder(tree, &page, parent.as_ref(), *index)
        }
        Op::Nest { page, under } => plan_move(tree, &name(page % n), Some(&name(under % n))),
        Op::ToRoot { page } => plan_move(tree, &name(page % n), None),
    };
    if let Ok(plan) = plan {
        tree.apply(&plan.mutations).unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        max_shrink_iters: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn invariants_hold_after_any_sequence_of_moves(
        parents in parents(16),
        ops in proptest::collection::vec(op(), 0..40),
    ) {
        let mut tree = build(&parents);
        let n = parents.len();
        tree.check_invariants().unwrap();
        for op in &ops {
            run(&mut tree, op, n);
            prop_assert_eq!(tree.check_invariants(), Ok(()));
            assert_dense(&tree);
        }
        prop_assert_eq!(tree.len(), n);
    }

    #[test]
    fn reparenting_under_own_subtree_is_rejected(
        parents in parents(16),
        pick in any::<usize>(),
    ) {
        let tree = build(&parents);
        let n = parents.len();
        let page = name(pick % n);

        for candidate in (0..n).map(name) {
            let is_self_or_descendant =
                candidate == page || tree.is_descendant(&page, &candidate).unwrap();
            if !is_self_or_descendant {
                continue;
            }
            let rejection = plan_move(&tree, &page, Some(&candidate)).unwrap_err();
            prop_assert!(rejection.is_cycle());

            let mut attempt = tree.clone();
            let err = attempt
                .apply(&[Mutation::reparent(page.clone(), Some(candidate.clone()), 0)])
                .unwrap_err();
            prop_assert_eq!(err, TreeError::CycleDetected { node: page.clone(), parent: candidate });
            prop_assert_eq!(&attempt, &tree);
        }
    }

    #[test]
    fn reorder_mutations_are_idempotent(
        parents in parents(16),
        pick in any::<usize>(),
        index in 0usize..16,
    ) {
        let tree = build(&parents);
        let page = name(pick % parents.len());
        let parent = tree.get(&page).unwrap().parent_id.clone();
        if let Ok(plan) = plan_reorder(&tree, &page, parent.as_ref(), index) {
            let mut once = tree.clone();
            once.apply(&plan.mutations).unwrap();
            let mut twice = once.clone();
            twice.apply(&plan.mutations).unwrap();
            prop_assert_eq!(once, twice);
        }
    }

    #[test]
    fn depth_matches_parent_chain_after_moves(
        parents in parents(12),
        ops in proptest::collection::vec(op(), 1..20),
    ) {
        let mut tree = build(&parents);
        let n = parents.len();
        for op in &ops {
            run(&mut tree, op, n);
        }
        for page in tree.pages() {
            let expected = match &page.parent_id {
                None => 0,
                Some(parent) => tree.get(parent).unwrap().depth + 1,
            };
            prop_assert_eq!(page.depth, expected);
        }
    }
}

#[test]
fn scenario_drag_last_root_to_front() {
    let mut tree = build(&[None, None, None]);
    let plan = plan_reorder(&tree, &name(2), None, 0).unwrap();
    tree.apply(&plan.mutations).unwrap();
    let order: Vec<(&str, u32)> =
        tree.roots().iter().map(|page| (page.id.as_str(), page.position)).collect();
    assert_eq!(order, vec![("p2", 0), ("p0", 1), ("p1", 2)]);
}
