//! Group entity and its derived span/position values.
//!
//! A group stores indices only. Every position-flavoured value is derived on
//! demand from the converter, because positions change with each hide, show
//! and reorder.

use std::collections::BTreeSet;

use gridgroup_core::{IndexPositionConverter, PositionRange};
use serde::{Deserialize, Serialize};

/// Stable identity of a group (names are not unique, never reused).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl GroupId {
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named set of indices rendered as one spanning header cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    id: GroupId,
    name: String,
    /// Insertion order: original grouping order, later members appended
    members: Vec<usize>,
    /// Members that stay visible while collapsed. Always a subset of members.
    static_members: BTreeSet<usize>,
    collapsed: bool,
    unbreakable: bool,
    /// Indices this group's collapse hid (collapse-owned hides)
    collapse_hidden: BTreeSet<usize>,
    /// Members as of the last deliberate edit; reorder never touches it
    baseline: Vec<usize>,
}

impl Group {
    pub(crate) fn new(id: GroupId, name: impl Into<String>, members: Vec<usize>) -> Self {
        debug_assert!(!members.is_empty(), "groups are never empty");
        Self {
            id,
            name: name.into(),
            baseline: members.clone(),
            members,
            static_members: BTreeSet::new(),
            collapsed: false,
            unbreakable: false,
            collapse_hidden: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn static_members(&self) -> &BTreeSet<usize> {
        &self.static_members
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn is_unbreakable(&self) -> bool {
        self.unbreakable
    }

    /// Indices hidden by this group's own collapse
    pub fn collapse_hidden(&self) -> &BTreeSet<usize> {
        &self.collapse_hidden
    }

    /// Member list as of the last structural edit (used by reorder reset)
    pub fn baseline(&self) -> &[usize] {
        &self.baseline
    }

    pub fn contains(&self, index: usize) -> bool {
        self.members.contains(&index)
    }

    pub fn is_static(&self, index: usize) -> bool {
        self.static_members.contains(&index)
    }

    pub fn original_span(&self) -> usize {
        self.members.len()
    }

    /// Lowest member index; the anchor when nothing is visible.
    pub fn start_index(&self) -> usize {
        self.members.iter().copied().min().unwrap_or(0)
    }

    // -------------------------------------------------------------------------
    // Derived values (always recomputed against the converter)
    // -------------------------------------------------------------------------

    /// Visible members as (position, index), ascending by position.
    pub fn visible_members(&self, conv: &dyn IndexPositionConverter) -> Vec<(usize, usize)> {
        let mut visible: Vec<(usize, usize)> = self
            .members
            .iter()
            .filter_map(|&i| conv.position_of(i).map(|p| (p, i)))
            .collect();
        visible.sort_unstable();
        visible
    }

    /// First visible member by position, not by member order.
    pub fn visible_start_index(&self, conv: &dyn IndexPositionConverter) -> Option<usize> {
        self.visible_start(conv).map(|(_, i)| i)
    }

    pub fn visible_start_position(&self, conv: &dyn IndexPositionConverter) -> Option<usize> {
        self.visible_start(conv).map(|(p, _)| p)
    }

    fn visible_start(&self, conv: &dyn IndexPositionConverter) -> Option<(usize, usize)> {
        self.members
            .iter()
            .filter_map(|&i| conv.position_of(i).map(|p| (p, i)))
            .min()
    }

    /// At least one member resolves to a position.
    pub fn is_anchorable(&self, conv: &dyn IndexPositionConverter) -> bool {
        self.members.iter().any(|&i| conv.position_of(i).is_some())
    }

    /// Expanded: visible member count. Collapsed: visible static members,
    /// floored at 1 while the group is anchorable (placeholder cell).
    pub fn visible_span(&self, conv: &dyn IndexPositionConverter) -> usize {
        if !self.collapsed {
            return self.members.iter().filter(|&&i| conv.position_of(i).is_some()).count();
        }
        let statics = self
            .static_members
            .iter()
            .filter(|&&i| conv.position_of(i).is_some())
            .count();
        if statics == 0 && self.is_anchorable(conv) {
            1
        } else {
            statics
        }
    }

    /// First to last visible position. Gaps inside are allowed.
    pub fn visible_range(&self, conv: &dyn IndexPositionConverter) -> Option<PositionRange> {
        PositionRange::covering(self.members.iter().filter_map(|&i| conv.position_of(i)))
    }

    // -------------------------------------------------------------------------
    // Mutators (the model keeps its index ownership table in sync)
    // -------------------------------------------------------------------------

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub(crate) fn set_unbreakable(&mut self, unbreakable: bool) {
        self.unbreakable = unbreakable;
    }

    pub(crate) fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
    }

    pub(crate) fn push_member(&mut self, index: usize) {
        if !self.members.contains(&index) {
            self.members.push(index);
        }
    }

    /// Drop a member along with its static and collapse-owned status.
    /// Returns whether the index was collapse-hidden by this group.
    pub(crate) fn remove_member(&mut self, index: usize) -> bool {
        self.members.retain(|&i| i != index);
        self.static_members.remove(&index);
        self.collapse_hidden.remove(&index)
    }

    pub(crate) fn add_static(&mut self, index: usize) -> bool {
        debug_assert!(self.contains(index));
        self.static_members.insert(index)
    }

    pub(crate) fn remove_static(&mut self, index: usize) -> bool {
        self.static_members.remove(&index)
    }

    pub(crate) fn record_collapse_hidden(&mut self, indices: &BTreeSet<usize>) {
        self.collapse_hidden.extend(indices.iter().copied());
    }

    pub(crate) fn release_collapse_hidden(&mut self, index: usize) -> bool {
        self.collapse_hidden.remove(&index)
    }

    pub(crate) fn take_collapse_hidden(&mut self) -> BTreeSet<usize> {
        std::mem::take(&mut self.collapse_hidden)
    }

    /// Mark the current membership as the reset target.
    pub(crate) fn commit_baseline(&mut self) {
        self.baseline = self.members.clone();
    }

    pub(crate) fn strip_baseline(&mut self, indices: &BTreeSet<usize>) {
        self.baseline.retain(|i| !indices.contains(i));
    }

    /// Replace membership wholesale, keeping statics that survive. Returns
    /// collapse-owned hides that no longer belong to a member.
    pub(crate) fn replace_members(&mut self, members: Vec<usize>) -> BTreeSet<usize> {
        self.static_members.retain(|i| members.contains(i));
        let (kept, released): (BTreeSet<usize>, BTreeSet<usize>) = std::mem::take(&mut self.collapse_hidden)
            .into_iter()
            .partition(|i| members.contains(i));
        self.collapse_hidden = kept;
        self.members = members;
        released
    }
}
