//! Group model: ownership of groups for one axis at one level.
//!
//! The model is the single place where index -> group ownership lives.
//! It never mutates the converter; operations that need hide/show side
//! effects go through [`crate::header::GroupHeader`].

use std::collections::BTreeSet;

use gridgroup_core::{Axis, IndexPositionConverter};
use rustc_hash::FxHashMap;

use crate::error::{GroupError, GroupResult};
use crate::group::{Group, GroupId};

#[derive(Debug, Clone, Default)]
pub struct GroupModel {
    axis: Axis,
    /// Sorted by start index
    groups: Vec<Group>,
    /// index -> owning group
    owners: FxHashMap<usize, GroupId>,
    next_id: u64,
    /// Groups emptied by reorder, kept so a reorder reset can bring them back
    retired: Vec<Group>,
}

impl GroupModel {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            next_id: 1,
            ..Self::default()
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in start-index order
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    pub fn group_ids(&self) -> Vec<GroupId> {
        self.groups.iter().map(Group::id).collect()
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id() == id)
    }

    pub(crate) fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id() == id)
    }

    pub(crate) fn require(&self, id: GroupId) -> GroupResult<&Group> {
        self.group(id).ok_or(GroupError::UnknownGroup(id))
    }

    pub(crate) fn require_mut(&mut self, id: GroupId) -> GroupResult<&mut Group> {
        self.group_mut(id).ok_or(GroupError::UnknownGroup(id))
    }

    pub fn owner_of(&self, index: usize) -> Option<GroupId> {
        self.owners.get(&index).copied()
    }

    pub fn group_by_index(&self, index: usize) -> Option<&Group> {
        self.owner_of(index).and_then(|id| self.group(id))
    }

    /// Hidden indices cannot be located by position.
    pub fn group_by_position(&self, conv: &dyn IndexPositionConverter, position: usize) -> Option<&Group> {
        conv.index_of(position).and_then(|i| self.group_by_index(i))
    }

    /// First group (in start-index order) with this name
    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name() == name)
    }

    /// True if at least one group currently shows something.
    pub fn visible(&self, conv: &dyn IndexPositionConverter) -> bool {
        self.groups.iter().any(|g| g.visible_span(conv) > 0)
    }

    /// Resolve positions to indices, rejecting any that has no visible index.
    /// Duplicates are dropped; the result is in ascending position order.
    pub fn resolve_positions(
        &self,
        conv: &dyn IndexPositionConverter,
        positions: &[usize],
    ) -> GroupResult<Vec<usize>> {
        let unique: BTreeSet<usize> = positions.iter().copied().collect();
        unique
            .into_iter()
            .map(|p| conv.index_of(p).ok_or(GroupError::InvalidPosition(p)))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Structural edits
    // -------------------------------------------------------------------------

    /// Create a group over `[start_index, start_index + span)`.
    pub fn add_group(&mut self, name: impl Into<String>, start_index: usize, span: usize) -> GroupResult<GroupId> {
        if span == 0 {
            return Err(GroupError::InvalidSpan);
        }
        let end = start_index.checked_add(span).ok_or(GroupError::InvalidIndex(start_index))?;
        self.insert_group(name, (start_index..end).collect())
    }

    /// Create a group with exactly these members, in this order.
    pub(crate) fn insert_group(&mut self, name: impl Into<String>, members: Vec<usize>) -> GroupResult<GroupId> {
        if members.is_empty() {
            return Err(GroupError::InvalidSpan);
        }
        let mut seen = BTreeSet::new();
        for &index in &members {
            if let Some(group) = self.owner_of(index) {
                return Err(GroupError::Overlap { index, group });
            }
            if !seen.insert(index) {
                return Err(GroupError::InvalidState(format!("index {index} listed twice")));
            }
        }

        let id = GroupId(self.next_id);
        self.next_id += 1;
        for &index in &members {
            self.owners.insert(index, id);
        }
        self.forget_retired(&seen);
        self.groups.push(Group::new(id, name, members));
        self.sort_groups();
        log::debug!("{:?} group {} created", self.axis, id);
        Ok(id)
    }

    /// Remove a group and release its members. Hide bookkeeping is the
    /// caller's concern.
    pub(crate) fn take_group(&mut self, id: GroupId) -> Option<Group> {
        let pos = self.groups.iter().position(|g| g.id() == id)?;
        let group = self.groups.remove(pos);
        for index in group.members() {
            self.owners.remove(index);
        }
        Some(group)
    }

    /// Remove every group, returning them.
    pub(crate) fn take_all(&mut self) -> Vec<Group> {
        self.owners.clear();
        self.retired.clear();
        std::mem::take(&mut self.groups)
    }

    /// Append `index` to `id`. The index must be unowned.
    pub(crate) fn add_member(&mut self, id: GroupId, index: usize) -> GroupResult<()> {
        if let Some(owner) = self.owner_of(index) {
            if owner == id {
                return Ok(());
            }
            return Err(GroupError::Overlap { index, group: owner });
        }
        self.require_mut(id)?.push_member(index);
        self.owners.insert(index, id);
        self.sort_groups();
        Ok(())
    }

    /// Remove `index` from its group. Returns whether the index was
    /// collapse-hidden by that group. An emptied group is taken out of the
    /// model and returned as well.
    pub(crate) fn remove_member(&mut self, index: usize) -> Option<(GroupId, bool, Option<Group>)> {
        let id = self.owners.remove(&index)?;
        let group = self.group_mut(id)?;
        let was_hidden = group.remove_member(index);
        let emptied = if group.members().is_empty() {
            self.take_group(id)
        } else {
            self.sort_groups();
            None
        };
        Some((id, was_hidden, emptied))
    }

    /// Keep an emptied group so a reorder reset can restore it.
    pub(crate) fn retire(&mut self, group: Group) {
        self.retired.push(group);
    }

    /// Deliberate edits take precedence over reset targets of retired groups.
    pub(crate) fn forget_retired(&mut self, indices: &BTreeSet<usize>) {
        for group in &mut self.retired {
            group.strip_baseline(indices);
        }
        self.retired.retain(|g| !g.baseline().is_empty());
    }

    pub(crate) fn take_retired(&mut self) -> Vec<Group> {
        std::mem::take(&mut self.retired)
    }

    /// Re-insert a group object under its existing id (reset / load paths).
    pub(crate) fn reinstate(&mut self, group: Group) {
        for &index in group.members() {
            self.owners.insert(index, group.id());
        }
        self.next_id = self.next_id.max(group.id().raw() + 1);
        self.groups.push(group);
        self.sort_groups();
    }

    fn sort_groups(&mut self) {
        self.groups.sort_by_key(|g| (g.start_index(), g.id()));
    }

    /// Verify structural invariants. Used by tests.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen: FxHashMap<usize, GroupId> = FxHashMap::default();
        for group in &self.groups {
            if group.members().is_empty() {
                return Err(format!("group {} is empty", group.id()));
            }
            for &index in group.members() {
                if let Some(other) = seen.insert(index, group.id()) {
                    return Err(format!("index {index} in groups {other} and {}", group.id()));
                }
                if self.owner_of(index) != Some(group.id()) {
                    return Err(format!("owner table out of sync for index {index}"));
                }
            }
            if let Some(s) = group.static_members().iter().find(|&&s| !group.contains(s)) {
                return Err(format!("static index {s} not a member of {}", group.id()));
            }
            if let Some(h) = group.collapse_hidden().iter().find(|&&h| !group.contains(h)) {
                return Err(format!("collapse-hidden index {h} not a member of {}", group.id()));
            }
        }
        if seen.len() != self.owners.len() {
            return Err("owner table has stale entries".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridgroup_core::AxisView;

    #[test]
    fn test_add_group_and_lookup() {
        let view = AxisView::new(12);
        let mut model = GroupModel::new(Axis::Column);
        let person = model.add_group("Person", 0, 4).unwrap();
        let address = model.add_group("Address", 4, 4).unwrap();

        assert_eq!(model.len(), 2);
        assert_eq!(model.group(person).unwrap().members(), &[0, 1, 2, 3]);
        assert_eq!(model.group_by_index(5).unwrap().id(), address);
        assert_eq!(model.group_by_position(&view, 2).unwrap().id(), person);
        assert!(model.group_by_position(&view, 9).is_none());
        assert_eq!(model.group_by_name("Address").unwrap().id(), address);
        assert!(model.visible(&view));
        model.check_invariants().unwrap();
    }

    #[test]
    fn test_add_group_overlap_and_span() {
        let mut model = GroupModel::new(Axis::Column);
        let person = model.add_group("Person", 0, 4).unwrap();
        assert_eq!(
            model.add_group("Other", 3, 2),
            Err(GroupError::Overlap { index: 3, group: person })
        );
        assert_eq!(model.add_group("Empty", 8, 0), Err(GroupError::InvalidSpan));
        assert_eq!(model.add_group("Wrap", usize::MAX, 2), Err(GroupError::InvalidIndex(usize::MAX)));
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn test_duplicate_names_resolve_to_first() {
        let mut model = GroupModel::new(Axis::Row);
        let late = model.add_group("Same", 6, 2).unwrap();
        let early = model.add_group("Same", 1, 2).unwrap();
        assert_ne!(late, early);
        // Lookup follows start-index order
        assert_eq!(model.group_by_name("Same").unwrap().id(), early);
    }

    #[test]
    fn test_hidden_index_not_found_by_position() {
        let mut view = AxisView::new(6);
        let mut model = GroupModel::new(Axis::Column);
        let id = model.add_group("G", 2, 2).unwrap();
        view.request_hide(&[2, 3].into_iter().collect());

        assert!(model.group_by_position(&view, 2).is_none());
        assert_eq!(model.group_by_index(2).unwrap().id(), id);
        assert!(!model.visible(&view));
    }

    #[test]
    fn test_remove_member_deletes_empty_group() {
        let mut model = GroupModel::new(Axis::Column);
        let id = model.add_group("G", 5, 1).unwrap();
        let (owner, was_hidden, emptied) = model.remove_member(5).unwrap();
        assert_eq!(owner, id);
        assert!(!was_hidden);
        assert_eq!(emptied.unwrap().id(), id);
        assert!(model.is_empty());
        assert!(model.remove_member(5).is_none());
        model.check_invariants().unwrap();
    }

    #[test]
    fn test_resolve_positions_rejects_unresolvable() {
        let view = AxisView::new(3);
        let model = GroupModel::new(Axis::Column);
        assert_eq!(model.resolve_positions(&view, &[2, 0, 2]).unwrap(), vec![0, 2]);
        assert_eq!(model.resolve_positions(&view, &[1, 7]), Err(GroupError::InvalidPosition(7)));
    }
}
