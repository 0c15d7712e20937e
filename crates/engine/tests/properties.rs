// Property-based tests for header invariants under random operation mixes.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::BTreeSet;

use gridgroup_core::{Axis, AxisView, IndexPositionConverter};
use gridgroup_engine::{GroupHeader, GroupId, GroupModelState, ReorderOutcome};
use proptest::prelude::*;

const LEN: usize = 16;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

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

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    Hide(usize),
    Show(usize),
    ShowAll,
    Toggle(usize),
    Static(usize, usize),
    Reorder(Vec<usize>, usize),
    ReorderGroup(usize, usize),
    DirectShow(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..LEN).prop_map(Op::Hide),
        1 => (0..LEN).prop_map(Op::Show),
        1 => Just(Op::ShowAll),
        3 => (0..LEN).prop_map(Op::Toggle),
        1 => (0..4usize, 0..LEN).prop_map(|(g, i)| Op::Static(g, i)),
        4 => (prop::collection::vec(0..LEN, 1..3), 0..=LEN).prop_map(|(p, d)| Op::Reorder(p, d)),
        1 => (0..4usize, 0..=LEN).prop_map(|(g, d)| Op::ReorderGroup(g, d)),
        1 => (0..LEN).prop_map(Op::DirectShow),
    ]
}

/// Four groups of varying width over sixteen columns, some left ungrouped.
fn header() -> (GroupHeader<AxisView>, Vec<GroupId>) {
    let mut header = GroupHeader::new(Axis::Column, AxisView::new(LEN));
    let ids = vec![
        header.add_group("A", 0, 3).unwrap(),
        header.add_group("B", 3, 4).unwrap(),
        header.add_group("C", 8, 1).unwrap(),
        header.add_group("D", 10, 4).unwrap(),
    ];
    (header, ids)
}

fn apply(header: &mut GroupHeader<AxisView>, ids: &[GroupId], op: &Op) {
    // Rejections are expected; the invariants must hold either way
    match op {
        Op::Hide(i) => {
            let _ = header.hide_indices(&[*i]);
        }
        Op::Show(i) => {
            let _ = header.show_indices(&[*i]);
        }
        Op::ShowAll => header.show_all(),
        Op::Toggle(p) => {
            let _ = header.toggle_at(*p);
        }
        Op::Static(g, i) => {
            let _ = header.add_static_indexes(ids[*g], &[*i]);
        }
        Op::Reorder(positions, d) => {
            let _ = header.reorder(positions, *d);
        }
        Op::ReorderGroup(g, d) => {
            let _ = header.reorder_group(ids[*g], *d);
        }
        Op::DirectShow(i) => {
            if header.converter().is_hidden(*i) {
                header.converter_mut().request_show(&BTreeSet::from([*i]));
                header.on_indices_shown(&[*i]);
            }
        }
    }
}

fn snapshot(header: &GroupHeader<AxisView>) -> (GroupModelState, Vec<usize>, BTreeSet<usize>) {
    (
        header.save_state(),
        header.converter().order().to_vec(),
        header.converter().hidden_indices(),
    )
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    /// 0 <= visible_span <= original_span, and the model stays well formed.
    #[test]
    fn span_never_exceeds_membership(ops in prop::collection::vec(arb_op(), 0..40)) {
        let (mut header, ids) = header();
        for op in &ops {
            apply(&mut header, &ids, op);
            header.model().check_invariants().map_err(TestCaseError::fail)?;
            for group in header.model().groups() {
                prop_assert!(group.visible_span(header.converter()) <= group.original_span());
            }
        }
    }

    /// A collapsed group with no visible static but a visible member shows
    /// exactly one cell.
    #[test]
    fn collapsed_without_statics_spans_one(ops in prop::collection::vec(arb_op(), 0..30)) {
        let (mut header, ids) = header();
        for op in &ops {
            apply(&mut header, &ids, op);
        }
        for group in header.model().groups() {
            let conv = header.converter();
            let visible_static = group.static_members().iter().any(|&i| conv.position_of(i).is_some());
            if group.is_collapsed() && !visible_static && group.is_anchorable(conv) {
                prop_assert_eq!(group.visible_span(conv), 1);
                prop_assert_eq!(group.visible_members(conv).len(), 1);
            }
        }
    }

    /// collapse∘collapse == collapse, and expand after collapse restores the
    /// hidden set when nothing else happened in between.
    #[test]
    fn collapse_expand_idempotent(ops in prop::collection::vec(arb_op(), 0..30), pick in 0..4usize) {
        let (mut header, ids) = header();
        for op in &ops {
            apply(&mut header, &ids, op);
        }
        let Some(id) = header.model().group_ids().get(pick).copied() else {
            return Ok(());
        };
        if header.group(id).map(|g| g.is_collapsed()).unwrap_or(true) {
            return Ok(());
        }

        let before = header.converter().hidden_indices();
        header.collapse(id).unwrap();
        let collapsed = header.converter().hidden_indices();
        prop_assert!(!header.collapse(id).unwrap());
        prop_assert_eq!(&header.converter().hidden_indices(), &collapsed);

        header.expand(id).unwrap();
        prop_assert!(!header.expand(id).unwrap());
        prop_assert_eq!(header.converter().hidden_indices(), before);
    }

    /// A rejected reorder changes neither membership nor the converter.
    #[test]
    fn reorder_is_atomic(
        ops in prop::collection::vec(arb_op(), 0..20),
        positions in prop::collection::vec(0..LEN, 1..4),
        destination in 0..=LEN,
        lock in 0..4usize,
    ) {
        let (mut header, ids) = header();
        for op in &ops {
            apply(&mut header, &ids, op);
        }
        if let Some(&id) = header.model().group_ids().get(lock) {
            header.set_unbreakable(id, true).unwrap();
        }

        let before = snapshot(&header);
        match header.reorder(&positions, destination) {
            Err(_) | Ok(ReorderOutcome::Unchanged) => prop_assert_eq!(snapshot(&header), before),
            Ok(_) => header.model().check_invariants().map_err(TestCaseError::fail)?,
        }
    }

    /// save -> load into a fresh header -> save is the identity, and every
    /// group shows the same number of cells.
    #[test]
    fn save_load_round_trip(ops in prop::collection::vec(arb_op(), 0..30)) {
        let (mut header, ids) = header();
        for op in &ops {
            apply(&mut header, &ids, op);
        }
        header.show_all();
        header.reset_reorder();
        let state = header.save_state();
        let json = state.to_json().unwrap();

        let mut fresh = GroupHeader::new(Axis::Column, AxisView::new(LEN));
        fresh.load_state(&GroupModelState::from_json(&json).unwrap()).unwrap();
        prop_assert_eq!(fresh.save_state(), state);

        let spans = |h: &GroupHeader<AxisView>| -> Vec<usize> {
            h.model().groups().map(|g| g.visible_span(h.converter())).collect()
        };
        prop_assert_eq!(spans(&fresh), spans(&header));
    }

    /// Dropping a group's sole member onto its own gaps never deletes it.
    #[test]
    fn sole_member_self_reorder(index in 0..LEN, offset in 0..2usize) {
        let mut header = GroupHeader::new(Axis::Column, AxisView::new(LEN));
        let id = header.add_group("Solo", index, 1).unwrap();
        let position = header.converter().position_of(index).unwrap();
        prop_assert_eq!(header.reorder(&[position], position + offset).unwrap(), ReorderOutcome::Unchanged);
        prop_assert_eq!(header.group(id).unwrap().members(), &[index]);
    }
}
