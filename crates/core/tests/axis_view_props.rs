// Property tests for AxisView coordinate consistency.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::BTreeSet;

use gridgroup_core::{AxisView, IndexPositionConverter};
use proptest::prelude::*;

const LEN: usize = 12;

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

#[derive(Debug, Clone)]
enum Op {
    Hide(Vec<usize>),
    Show(Vec<usize>),
    Reorder(Vec<usize>, usize),
    Reset,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop::collection::vec(0..LEN, 1..3).prop_map(Op::Hide),
        2 => prop::collection::vec(0..LEN, 1..3).prop_map(Op::Show),
        4 => (prop::collection::btree_set(0..LEN, 1..4), 0..=LEN)
            .prop_map(|(moved, d)| Op::Reorder(moved.into_iter().collect(), d)),
        1 => Just(Op::Reset),
    ]
}

fn apply(view: &mut AxisView, op: &Op) {
    match op {
        Op::Hide(indices) => view.request_hide(&indices.iter().copied().collect()),
        Op::Show(indices) => view.request_show(&indices.iter().copied().collect()),
        Op::Reorder(moved, d) => {
            // Out-of-range destinations are rejected; state must not change
            let before = view.order().to_vec();
            if view.request_reorder(moved, *d).is_err() {
                assert_eq!(view.order(), &before[..]);
            }
        }
        Op::Reset => view.request_reset_order(),
    }
}

proptest! {
    #![proptest_config(config_256())]

    /// position_of and index_of stay inverse, and positions follow the order.
    #[test]
    fn coordinates_stay_consistent(ops in prop::collection::vec(arb_op(), 0..30)) {
        let mut view = AxisView::new(LEN);
        for op in &ops {
            apply(&mut view, op);

            let order: BTreeSet<usize> = view.order().iter().copied().collect();
            prop_assert_eq!(order.len(), LEN);
            prop_assert_eq!(view.visible_count() + view.hidden_indices().len(), LEN);

            for position in 0..view.visible_count() {
                let index = view.index_of(position).unwrap();
                prop_assert_eq!(view.position_of(index), Some(position));
            }
            let positions: Vec<usize> = view.order().iter().filter_map(|&i| view.position_of(i)).collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));

            for (slot, &index) in view.order().iter().enumerate() {
                prop_assert_eq!(view.ordinal_of(index), Some(slot));
            }
        }
    }

    /// A reorder lands the moved indices as one block in the given order.
    #[test]
    fn reorder_moves_a_block(
        hidden in prop::collection::btree_set(0..LEN, 0..4),
        moved in prop::collection::btree_set(0..LEN, 1..4),
        destination in 0..=LEN,
    ) {
        let mut view = AxisView::new(LEN);
        view.request_hide(&hidden);
        let moved: Vec<usize> = moved.into_iter().collect();
        if destination > view.visible_count() {
            prop_assert!(view.request_reorder(&moved, destination).is_err());
            return Ok(());
        }
        view.request_reorder(&moved, destination).unwrap();

        let start = view.ordinal_of(moved[0]).unwrap();
        let block: Vec<usize> = view.order()[start..start + moved.len()].to_vec();
        prop_assert_eq!(block, moved);
        prop_assert_eq!(view.hidden_indices(), hidden);
    }

    /// Reset restores identity order and leaves visibility alone.
    #[test]
    fn reset_keeps_visibility(ops in prop::collection::vec(arb_op(), 0..20)) {
        let mut view = AxisView::new(LEN);
        for op in &ops {
            apply(&mut view, op);
        }
        let hidden = view.hidden_indices();
        view.request_reset_order();
        prop_assert!(!view.is_reordered());
        prop_assert_eq!(view.order(), &(0..LEN).collect::<Vec<_>>()[..]);
        prop_assert_eq!(view.hidden_indices(), hidden);
    }
}
