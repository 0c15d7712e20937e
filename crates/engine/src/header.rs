//! `GroupHeader`: the facade the grid talks to.
//!
//! Owns one axis' `GroupModel` together with the converter it is measured
//! against, the hidden-state ledger and the settings. Every public operation
//! validates first and mutates second, so an `Err` leaves the model, the
//! ledger and the converter untouched. Events go to the optional callback
//! after the change is complete.

use std::collections::BTreeSet;

use gridgroup_config::GroupSettings;
use gridgroup_core::{Axis, IndexPositionConverter, PositionRange};
use rustc_hash::FxHashMap;

use crate::collapse;
use crate::error::{GroupError, GroupResult};
use crate::events::{EventCallback, GroupChange, GroupEvent};
use crate::group::{Group, GroupId};
use crate::model::GroupModel;
use crate::projection::{self, HeaderCell, ProjectionPass};
use crate::reorder::{self, ReorderOutcome};
use crate::state::GroupModelState;
use crate::visibility::{self, HiddenLedger};

/// Groups touched by an operation, with their visible range before it.
type Touched = Vec<(GroupId, Option<PositionRange>)>;

pub struct GroupHeader<C: IndexPositionConverter> {
    converter: C,
    model: GroupModel,
    ledger: HiddenLedger,
    settings: GroupSettings,
    on_event: Option<EventCallback>,
}

impl<C: IndexPositionConverter> GroupHeader<C> {
    pub fn new(axis: Axis, converter: C) -> Self {
        Self::with_settings(axis, converter, GroupSettings::default())
    }

    pub fn with_settings(axis: Axis, converter: C, settings: GroupSettings) -> Self {
        Self {
            converter,
            model: GroupModel::new(axis),
            ledger: HiddenLedger::new(),
            settings,
            on_event: None,
        }
    }

    pub fn set_event_callback(&mut self, callback: EventCallback) {
        self.on_event = Some(callback);
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// Direct access to the coordinate layer. Hides and shows made here are
    /// invisible to the engine until reported through
    /// [`on_indices_hidden`](Self::on_indices_hidden) /
    /// [`on_indices_shown`](Self::on_indices_shown).
    pub fn converter_mut(&mut self) -> &mut C {
        &mut self.converter
    }

    pub fn model(&self) -> &GroupModel {
        &self.model
    }

    pub fn ledger(&self) -> &HiddenLedger {
        &self.ledger
    }

    pub fn settings(&self) -> &GroupSettings {
        &self.settings
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.model.group(id)
    }

    pub fn group_by_position(&self, position: usize) -> Option<&Group> {
        self.model.group_by_position(&self.converter, position)
    }

    pub fn group_by_index(&self, index: usize) -> Option<&Group> {
        self.model.group_by_index(index)
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.model.group_by_name(name)
    }

    pub fn visible_span(&self, id: GroupId) -> GroupResult<usize> {
        Ok(self.model.require(id)?.visible_span(&self.converter))
    }

    pub fn visible_start_index(&self, id: GroupId) -> GroupResult<Option<usize>> {
        Ok(self.model.require(id)?.visible_start_index(&self.converter))
    }

    pub fn visible_start_position(&self, id: GroupId) -> GroupResult<Option<usize>> {
        Ok(self.model.require(id)?.visible_start_position(&self.converter))
    }

    /// True if any group currently shows at least one cell.
    pub fn is_visible(&self) -> bool {
        self.model.visible(&self.converter)
    }

    pub fn project(&self, position: usize) -> Option<HeaderCell> {
        projection::project(&self.model, &self.converter, position)
    }

    /// Start a memoized projection pass. The pass borrows the header, so no
    /// mutation can happen while it is alive.
    pub fn projection(&self) -> ProjectionPass<'_> {
        ProjectionPass::new(&self.model, &self.converter)
    }

    // =========================================================================
    // Group structure
    // =========================================================================

    /// Create a group over `[start_index, start_index + span)`.
    pub fn add_group(&mut self, name: impl Into<String>, start_index: usize, span: usize) -> GroupResult<GroupId> {
        let count = self.converter.index_count();
        let end = start_index.checked_add(span).ok_or(GroupError::InvalidIndex(start_index))?;
        if span > 0 && end > count {
            return Err(GroupError::InvalidIndex(start_index.max(count)));
        }
        let id = self.model.add_group(name, start_index, span)?;
        self.emit_membership(vec![(id, None)], false);
        Ok(id)
    }

    /// Create a group from visible positions; members take position order.
    /// Members of breakable groups move over, members of unbreakable groups
    /// reject the call.
    pub fn create_group_from_selection(&mut self, name: impl Into<String>, positions: &[usize]) -> GroupResult<GroupId> {
        let indices = self.model.resolve_positions(&self.converter, positions)?;
        if indices.is_empty() {
            return Err(GroupError::InvalidSpan);
        }
        self.check_sources_breakable(&indices)?;

        let count_before = self.converter.visible_count();
        let mut touched = Touched::new();
        for &index in &indices {
            if let Some(owner) = self.model.owner_of(index) {
                self.touch(&mut touched, owner);
            }
        }
        let sources: Vec<GroupId> = indices.iter().filter_map(|&i| self.detach(i)).collect();
        let id = self.model.insert_group(name, indices)?;
        for source in sources {
            self.settle(source);
        }
        touched.push((id, None));
        let shifted = self.converter.visible_count() != count_before;
        self.emit_membership(touched, shifted);
        Ok(id)
    }

    /// Remove a group, expanding it first so its collapse hides are released.
    pub fn remove_group(&mut self, id: GroupId) -> GroupResult<()> {
        let before = self.model.require(id)?.visible_range(&self.converter);
        self.expand(id)?;
        let after_expand = self.range_of(id);
        self.model.take_group(id);
        log::debug!("group {} removed", id);
        let repaint = self.repaint(before, after_expand, false);
        self.emit(GroupEvent::MembershipChanged(GroupChange { group: id, repaint }));
        Ok(())
    }

    /// Remove every group, expanding collapsed ones first.
    pub fn clear_all_groups(&mut self) {
        self.expand_all();
        let touched: Touched = self.model.groups().map(|g| (g.id(), g.visible_range(&self.converter))).collect();
        self.model.take_all();
        self.emit_membership(touched, false);
    }

    /// Add the indices at `positions` to `id`, appended in position order.
    pub fn add_positions_to_group(&mut self, id: GroupId, positions: &[usize]) -> GroupResult<()> {
        let target = self.model.require(id)?;
        let indices = self.model.resolve_positions(&self.converter, positions)?;
        let new: Vec<usize> = indices.into_iter().filter(|&i| !target.contains(i)).collect();
        if new.is_empty() {
            return Ok(());
        }
        self.check_sources_breakable(&new)?;
        if target.is_unbreakable() && !self.extends_at_edge(target, &new) {
            return Err(GroupError::Unbreakable(id));
        }

        let count_before = self.converter.visible_count();
        let mut touched = Touched::new();
        self.touch(&mut touched, id);
        let mut sources = Vec::new();
        for &index in &new {
            if let Some(owner) = self.model.owner_of(index) {
                self.touch(&mut touched, owner);
            }
            if let Some(source) = self.detach(index) {
                sources.push(source);
            }
            self.model.add_member(id, index)?;
        }
        self.model.forget_retired(&new.iter().copied().collect());
        if let Some(group) = self.model.group_mut(id) {
            group.commit_baseline();
        }
        for source in sources {
            self.settle(source);
        }
        self.settle(id);

        log::debug!("added {:?} to group {}", new, id);
        let shifted = self.converter.visible_count() != count_before;
        self.emit_membership(touched, shifted);
        Ok(())
    }

    /// Remove the indices at `positions` from `id`. An emptied group is
    /// deleted.
    pub fn remove_positions_from_group(&mut self, id: GroupId, positions: &[usize]) -> GroupResult<()> {
        let group = self.model.require(id)?;
        if group.is_unbreakable() {
            return Err(GroupError::Unbreakable(id));
        }
        let indices = self.model.resolve_positions(&self.converter, positions)?;
        if let Some(&index) = indices.iter().find(|&&i| !group.contains(i)) {
            return Err(GroupError::NotAMember { group: id, index });
        }
        if indices.is_empty() {
            return Ok(());
        }

        let count_before = self.converter.visible_count();
        let mut touched = Touched::new();
        self.touch(&mut touched, id);
        for &index in &indices {
            self.detach(index);
        }
        self.model.forget_retired(&indices.iter().copied().collect());
        self.settle(id);

        let shifted = self.converter.visible_count() != count_before;
        self.emit_membership(touched, shifted);
        Ok(())
    }

    /// Flag the group shown at `position`.
    pub fn set_group_unbreakable(&mut self, position: usize, unbreakable: bool) -> GroupResult<GroupId> {
        let id = self
            .group_by_position(position)
            .map(Group::id)
            .ok_or(GroupError::InvalidPosition(position))?;
        self.set_unbreakable(id, unbreakable)?;
        Ok(id)
    }

    pub fn set_unbreakable(&mut self, id: GroupId, unbreakable: bool) -> GroupResult<()> {
        self.model.require_mut(id)?.set_unbreakable(unbreakable);
        Ok(())
    }

    /// Mark members as static. A collapse-hidden member that becomes static
    /// is shown (unless hidden for another reason).
    pub fn add_static_indexes(&mut self, id: GroupId, indices: &[usize]) -> GroupResult<()> {
        self.check_members(id, indices)?;
        let before = self.range_of(id);
        let count_before = self.converter.visible_count();

        let group = self.model.require_mut(id)?;
        let mut reveal = BTreeSet::new();
        for &index in indices {
            group.add_static(index);
            if group.release_collapse_hidden(index) && !self.ledger.is_externally_hidden(index) {
                reveal.insert(index);
            }
        }
        if !reveal.is_empty() {
            self.converter.request_show(&reveal);
        }
        // A visible static replaces the placeholder
        collapse::resync(group, &mut self.converter);
        let collapsed = group.is_collapsed();

        if collapsed {
            let shifted = self.converter.visible_count() != count_before;
            let change = GroupChange { group: id, repaint: self.repaint(before, self.range_of(id), shifted) };
            self.emit(GroupEvent::VisibilityChanged(change));
        }
        Ok(())
    }

    /// Clear static status. A collapsed group hides the released members.
    pub fn remove_static_indexes(&mut self, id: GroupId, indices: &[usize]) -> GroupResult<()> {
        self.check_members(id, indices)?;
        let before = self.range_of(id);
        let count_before = self.converter.visible_count();

        let group = self.model.require_mut(id)?;
        for &index in indices {
            group.remove_static(index);
        }
        if self.settle(id) {
            let shifted = self.converter.visible_count() != count_before;
            let change = GroupChange { group: id, repaint: self.repaint(before, self.range_of(id), shifted) };
            self.emit(GroupEvent::VisibilityChanged(change));
        }
        Ok(())
    }

    pub fn rename_group(&mut self, id: GroupId, name: impl Into<String>) -> GroupResult<()> {
        self.model.require_mut(id)?.rename(name);
        Ok(())
    }

    /// Append every member of `from` to `into` and delete `from`. Statics
    /// carry over. A collapsed `from` is expanded first.
    pub fn merge_groups(&mut self, into: GroupId, from: GroupId) -> GroupResult<()> {
        if into == from {
            self.model.require(into)?;
            return Ok(());
        }
        for id in [into, from] {
            if self.model.require(id)?.is_unbreakable() {
                return Err(GroupError::Unbreakable(id));
            }
        }

        let count_before = self.converter.visible_count();
        let mut touched = Touched::new();
        self.touch(&mut touched, into);
        self.touch(&mut touched, from);

        if let Some(group) = self.model.group_mut(from) {
            collapse::expand(group, &mut self.converter, &self.ledger);
        }
        let Some(merged) = self.model.take_group(from) else {
            return Err(GroupError::UnknownGroup(from));
        };
        for &index in merged.members() {
            self.model.add_member(into, index)?;
        }
        let target = self.model.require_mut(into)?;
        for &index in merged.static_members() {
            target.add_static(index);
        }
        target.commit_baseline();
        self.model.forget_retired(&merged.members().iter().copied().collect());
        self.settle(into);

        log::debug!("merged {} '{}' into {}", from, merged.name(), into);
        let shifted = self.converter.visible_count() != count_before;
        self.emit_membership(touched, shifted);
        Ok(())
    }

    /// Split `id` in front of the member shown at `position`. Members earlier
    /// in the underlying order stay, the rest form a new group with the same
    /// name. Returns `None` when `position` is the group's first member.
    pub fn split_group(&mut self, id: GroupId, position: usize) -> GroupResult<Option<GroupId>> {
        let group = self.model.require(id)?;
        if group.is_unbreakable() {
            return Err(GroupError::Unbreakable(id));
        }
        if group.is_collapsed() {
            return Err(GroupError::Collapsed(id));
        }
        let pivot_index = self
            .converter
            .index_of(position)
            .ok_or(GroupError::InvalidPosition(position))?;
        if !group.contains(pivot_index) {
            return Err(GroupError::NotAMember { group: id, index: pivot_index });
        }

        let ordinal = |i: usize| self.converter.ordinal_of(i).unwrap_or(usize::MAX);
        let pivot = ordinal(pivot_index);
        let (kept, split_off): (Vec<usize>, Vec<usize>) = group.members().iter().partition(|&&i| ordinal(i) < pivot);
        if kept.is_empty() {
            return Ok(None);
        }
        let name = group.name().to_string();
        let statics: Vec<usize> = split_off.iter().copied().filter(|&i| group.is_static(i)).collect();
        let before = group.visible_range(&self.converter);

        for &index in &split_off {
            self.model.remove_member(index);
        }
        if let Some(group) = self.model.group_mut(id) {
            group.commit_baseline();
        }
        let new_id = self.model.insert_group(name, split_off)?;
        let created = self.model.require_mut(new_id)?;
        for index in statics {
            created.add_static(index);
        }

        log::debug!("split {} at position {} into {}", id, position, new_id);
        self.emit_membership(vec![(id, before), (new_id, None)], false);
        Ok(Some(new_id))
    }

    // =========================================================================
    // Collapse / expand
    // =========================================================================

    /// Returns false if the group was already collapsed.
    pub fn collapse(&mut self, id: GroupId) -> GroupResult<bool> {
        let before = self.model.require(id)?.visible_range(&self.converter);
        let group = self.model.require_mut(id)?;
        let Some(hidden) = collapse::collapse(group, &mut self.converter) else {
            return Ok(false);
        };
        let change = GroupChange { group: id, repaint: self.repaint(before, self.range_of(id), !hidden.is_empty()) };
        self.emit(GroupEvent::Collapsed(change));
        Ok(true)
    }

    /// Returns false if the group was not collapsed.
    pub fn expand(&mut self, id: GroupId) -> GroupResult<bool> {
        let before = self.model.require(id)?.visible_range(&self.converter);
        let group = self.model.require_mut(id)?;
        let Some(shown) = collapse::expand(group, &mut self.converter, &self.ledger) else {
            return Ok(false);
        };
        let change = GroupChange { group: id, repaint: self.repaint(before, self.range_of(id), !shown.is_empty()) };
        self.emit(GroupEvent::Expanded(change));
        Ok(true)
    }

    /// Toggle the group shown at `position`. Returns the new collapsed state.
    pub fn toggle_at(&mut self, position: usize) -> GroupResult<bool> {
        let group = self.group_by_position(position).ok_or(GroupError::InvalidPosition(position))?;
        let id = group.id();
        if group.is_collapsed() {
            self.expand(id)?;
            Ok(false)
        } else {
            self.collapse(id)?;
            Ok(true)
        }
    }

    /// Returns the number of groups that changed state.
    pub fn collapse_all(&mut self) -> usize {
        let mut changed = 0;
        for id in self.model.group_ids() {
            if let Ok(true) = self.collapse(id) {
                changed += 1;
            }
        }
        changed
    }

    pub fn expand_all(&mut self) -> usize {
        let mut changed = 0;
        for id in self.model.group_ids() {
            if let Ok(true) = self.expand(id) {
                changed += 1;
            }
        }
        changed
    }

    // =========================================================================
    // Hide / show
    // =========================================================================

    /// Hide indices for a reason outside grouping (user hide, filter).
    pub fn hide_indices(&mut self, indices: &[usize]) -> GroupResult<()> {
        self.check_indices(indices)?;
        let before = self.span_snapshot();
        self.ledger.record_hidden(indices.iter().copied());
        let to_hide: BTreeSet<usize> = indices.iter().copied().filter(|&i| !self.converter.is_hidden(i)).collect();
        if !to_hide.is_empty() {
            self.converter.request_hide(&to_hide);
        }
        self.emit_visibility(before);
        Ok(())
    }

    pub fn hide_positions(&mut self, positions: &[usize]) -> GroupResult<()> {
        let indices = self.model.resolve_positions(&self.converter, positions)?;
        self.hide_indices(&indices)
    }

    /// Show indices hidden outside grouping. Collapse-owned hides stay.
    pub fn show_indices(&mut self, indices: &[usize]) -> GroupResult<()> {
        self.check_indices(indices)?;
        let before = self.span_snapshot();
        self.ledger.record_shown(indices.iter().copied());
        self.reveal(indices.iter().copied().collect());
        self.emit_visibility(before);
        Ok(())
    }

    /// Show everything except what collapsed groups hide.
    pub fn show_all(&mut self) {
        let before = self.span_snapshot();
        self.ledger.clear();
        let hidden = self.converter.hidden_indices();
        self.reveal(hidden);
        self.emit_visibility(before);
    }

    /// The coordinate layer hid these indices on its own.
    pub fn on_indices_hidden(&mut self, indices: &[usize]) {
        let owned = visibility::collapse_owned(&self.model);
        let external: Vec<usize> = indices.iter().copied().filter(|i| !owned.contains(i)).collect();
        self.ledger.record_hidden(external.iter().copied());
        self.notify_visibility(&external);
    }

    /// The coordinate layer showed these indices on its own. Collapse state
    /// wins: collapse-owned indices are hidden again.
    pub fn on_indices_shown(&mut self, indices: &[usize]) {
        self.ledger.record_shown(indices.iter().copied());
        let owned = visibility::collapse_owned(&self.model);
        let rehide: BTreeSet<usize> = indices
            .iter()
            .copied()
            .filter(|&i| owned.contains(&i) && !self.converter.is_hidden(i))
            .collect();
        if !rehide.is_empty() {
            log::debug!("re-hiding collapse-owned {:?} after direct show", rehide);
            self.converter.request_hide(&rehide);
        }
        let collapsed: BTreeSet<GroupId> = indices
            .iter()
            .filter_map(|&i| self.model.group_by_index(i))
            .filter(|g| g.is_collapsed())
            .map(Group::id)
            .collect();
        for id in collapsed {
            self.settle(id);
        }
        self.notify_visibility(indices);
    }

    // =========================================================================
    // Reorder
    // =========================================================================

    /// Move the cells at `positions` to the gap at `destination`.
    pub fn reorder(&mut self, positions: &[usize], destination: usize) -> GroupResult<ReorderOutcome> {
        let plan = match reorder::plan_reorder(&self.model, &self.converter, positions, destination, &self.settings.reorder)? {
            Some(plan) => plan,
            None => return Ok(ReorderOutcome::Unchanged),
        };

        let count_before = self.converter.visible_count();
        let mut touched = Touched::new();
        for transfer in &plan.transfers {
            for id in [transfer.from, transfer.to].into_iter().flatten() {
                self.touch(&mut touched, id);
            }
        }
        let mut moved_groups: Vec<GroupId> = Vec::new();
        for id in plan.moved.iter().filter_map(|&i| self.model.owner_of(i)) {
            if !moved_groups.contains(&id) {
                moved_groups.push(id);
            }
        }
        let span = PositionRange::covering(
            positions
                .iter()
                .copied()
                .chain([plan.requested_destination, plan.destination]),
        );

        if plan.reposition {
            if let Err(rejected) = self.converter.request_reorder(&plan.moved, plan.destination) {
                log::debug!("reorder of {:?} refused: {}", plan.moved, rejected);
                return Err(rejected.into());
            }
        }

        for transfer in &plan.transfers {
            if transfer.from.is_some() {
                if let Some((source, _, Some(emptied))) = self.model.remove_member(transfer.index) {
                    log::debug!("group {} '{}' emptied by reorder", source, emptied.name());
                    self.model.retire(emptied);
                }
            }
            if let Some(to) = transfer.to {
                self.model.add_member(to, transfer.index)?;
            }
        }
        for &(id, _) in &touched {
            self.settle(id);
        }

        let shifted = self.converter.visible_count() != count_before;
        if plan.transfers.is_empty() {
            let repaint = span.and_then(|r| r.clipped(self.converter.visible_count()));
            for id in moved_groups {
                self.emit(GroupEvent::Moved(GroupChange { group: id, repaint }));
            }
            return Ok(ReorderOutcome::Repositioned);
        }
        for (id, before) in touched {
            let before = match (before, span) {
                (Some(a), Some(b)) => Some(a.union(&b)),
                (a, b) => a.or(b),
            };
            let repaint = self.repaint(before, self.range_of(id), shifted);
            self.emit(GroupEvent::MembershipChanged(GroupChange { group: id, repaint }));
        }
        Ok(ReorderOutcome::Regrouped(plan.transfers))
    }

    /// Move a whole group, hidden members included, to the gap at
    /// `destination`. Membership is unchanged. Returns false for a move onto
    /// the group's own range.
    pub fn reorder_group(&mut self, id: GroupId, destination: usize) -> GroupResult<bool> {
        let Some(plan) =
            reorder::plan_group_reorder(&self.model, &self.converter, id, destination, &self.settings.reorder)?
        else {
            return Ok(false);
        };
        let before = self.range_of(id);
        self.converter.request_reorder(&plan.moved, plan.destination)?;

        let landing = PositionRange::single(plan.destination.min(self.converter.visible_count().saturating_sub(1)));
        let before = before.map(|r| r.union(&landing)).or(Some(landing));
        let repaint = self.repaint(before, self.range_of(id), false);
        self.emit(GroupEvent::Moved(GroupChange { group: id, repaint }));
        Ok(true)
    }

    /// Restore the identity order and every group's membership as of its
    /// last deliberate edit, including groups emptied by reorders.
    pub fn reset_reorder(&mut self) {
        let mut touched: Touched = self.model.groups().map(|g| (g.id(), g.visible_range(&self.converter))).collect();
        self.converter.request_reset_order();

        let retired = self.model.take_retired();
        let live = self.model.take_all();
        let assignments = reorder::reset_assignments(live.iter().chain(retired.iter()), self.converter.index_count());
        let mut pool: FxHashMap<GroupId, Group> = live.into_iter().chain(retired).map(|g| (g.id(), g)).collect();

        let mut released = BTreeSet::new();
        for (id, members) in assignments {
            if let Some(mut group) = pool.remove(&id) {
                released.extend(group.replace_members(members));
                group.commit_baseline();
                self.model.reinstate(group);
                if !touched.iter().any(|(t, _)| *t == id) {
                    touched.push((id, None));
                }
            }
        }
        for (id, mut group) in pool {
            released.extend(group.take_collapse_hidden());
            log::debug!("group {} '{}' has nothing to restore, dropped", id, group.name());
        }

        let released: BTreeSet<usize> = self.ledger.releasable(&released);
        self.reveal(released);
        for id in self.model.group_ids() {
            self.settle(id);
        }
        self.emit_membership(touched, true);
    }

    // =========================================================================
    // Persisted state
    // =========================================================================

    pub fn save_state(&self) -> GroupModelState {
        GroupModelState::capture(&self.model)
    }

    /// Replace the model wholesale. Groups saved as collapsed are collapsed
    /// against the current converter so their hides take effect.
    pub fn load_state(&mut self, state: &GroupModelState) -> GroupResult<()> {
        state.validate(self.converter.index_count())?;

        self.expand_all();
        let mut touched: Touched = self.model.groups().map(|g| (g.id(), g.visible_range(&self.converter))).collect();
        self.model.take_all();

        for saved in &state.groups {
            let id = self.model.insert_group(saved.name.clone(), saved.member_indices.clone())?;
            let group = self.model.require_mut(id)?;
            group.set_unbreakable(saved.unbreakable);
            for &index in &saved.static_indices {
                group.add_static(index);
            }
            if saved.collapsed {
                collapse::collapse(group, &mut self.converter);
            }
            touched.push((id, None));
        }
        log::debug!("loaded {} groups", state.groups.len());
        self.emit_membership(touched, true);
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn emit(&mut self, event: GroupEvent) {
        if let Some(callback) = self.on_event.as_mut() {
            callback(event);
        }
    }

    fn range_of(&self, id: GroupId) -> Option<PositionRange> {
        self.model.group(id).and_then(|g| g.visible_range(&self.converter))
    }

    fn touch(&self, touched: &mut Touched, id: GroupId) {
        if !touched.iter().any(|(t, _)| *t == id) {
            touched.push((id, self.range_of(id)));
        }
    }

    /// Area covering `before` and `after`; runs to the last visible position
    /// when the hide/show state changed, since everything after shifts.
    fn repaint(
        &self,
        before: Option<PositionRange>,
        after: Option<PositionRange>,
        shifted: bool,
    ) -> Option<PositionRange> {
        let merged = match (before, after) {
            (Some(a), Some(b)) => a.union(&b),
            (Some(r), None) | (None, Some(r)) => r,
            (None, None) => return None,
        };
        let count = self.converter.visible_count();
        let range = if shifted {
            PositionRange::new(merged.start, merged.end.max(count.saturating_sub(1)))
        } else {
            merged
        };
        range.clipped(count)
    }

    fn emit_membership(&mut self, touched: Touched, shifted: bool) {
        for (id, before) in touched {
            let repaint = self.repaint(before, self.range_of(id), shifted);
            self.emit(GroupEvent::MembershipChanged(GroupChange { group: id, repaint }));
        }
    }

    fn span_snapshot(&self) -> Vec<(GroupId, usize, Option<PositionRange>)> {
        self.model
            .groups()
            .map(|g| (g.id(), g.visible_span(&self.converter), g.visible_range(&self.converter)))
            .collect()
    }

    fn emit_visibility(&mut self, before: Vec<(GroupId, usize, Option<PositionRange>)>) {
        for (id, span, range) in before {
            let Some(group) = self.model.group(id) else {
                continue;
            };
            if group.visible_span(&self.converter) != span {
                let repaint = self.repaint(range, self.range_of(id), true);
                self.emit(GroupEvent::VisibilityChanged(GroupChange { group: id, repaint }));
            }
        }
    }

    /// Visibility events for changes the engine learns about after the fact.
    fn notify_visibility(&mut self, indices: &[usize]) {
        let mut groups: Vec<GroupId> = Vec::new();
        for &index in indices {
            if let Some(id) = self.model.owner_of(index) {
                if !groups.contains(&id) {
                    groups.push(id);
                }
            }
        }
        for id in groups {
            let repaint = self.repaint(self.range_of(id), None, true);
            self.emit(GroupEvent::VisibilityChanged(GroupChange { group: id, repaint }));
        }
    }

    /// Show `candidates` that are hidden and not collapse-owned. Non-static
    /// members of collapsed groups are handed to the collapse instead of
    /// being shown.
    fn reveal(&mut self, candidates: BTreeSet<usize>) {
        let owned = visibility::collapse_owned(&self.model);
        let mut show = BTreeSet::new();
        let mut adopt: Vec<(GroupId, usize)> = Vec::new();
        let mut affected: BTreeSet<GroupId> = BTreeSet::new();
        for index in candidates {
            if owned.contains(&index) || !self.converter.is_hidden(index) {
                continue;
            }
            match self.model.group_by_index(index) {
                Some(group) if group.is_collapsed() => {
                    affected.insert(group.id());
                    if group.is_static(index) {
                        show.insert(index);
                    } else {
                        adopt.push((group.id(), index));
                    }
                }
                _ => {
                    show.insert(index);
                }
            }
        }
        for (id, index) in adopt {
            if let Some(group) = self.model.group_mut(id) {
                group.record_collapse_hidden(&BTreeSet::from([index]));
            }
        }
        if !show.is_empty() {
            self.converter.request_show(&show);
        }
        for id in affected {
            self.settle(id);
        }
    }

    /// Bring a collapsed group back in line after its membership, statics or
    /// visibility changed. Returns whether anything was hidden or shown.
    fn settle(&mut self, id: GroupId) -> bool {
        let Some(group) = self.model.group_mut(id) else {
            return false;
        };
        if !group.is_collapsed() {
            return false;
        }
        let restored = collapse::restore_placeholder(group, &mut self.converter, &self.ledger);
        let hidden = collapse::resync(group, &mut self.converter);
        restored.is_some() || !hidden.is_empty()
    }

    /// Remove `index` from its group as a deliberate edit. Returns the former
    /// owner.
    fn detach(&mut self, index: usize) -> Option<GroupId> {
        let (id, was_hidden, emptied) = self.model.remove_member(index)?;
        if was_hidden && !self.ledger.is_externally_hidden(index) {
            self.converter.request_show(&BTreeSet::from([index]));
        }
        match emptied {
            Some(group) => log::debug!("group {} '{}' emptied and removed", id, group.name()),
            None => {
                if let Some(group) = self.model.group_mut(id) {
                    group.commit_baseline();
                }
            }
        }
        Some(id)
    }

    fn check_sources_breakable(&self, indices: &[usize]) -> GroupResult<()> {
        for &index in indices {
            if let Some(owner) = self.model.owner_of(index) {
                if self.model.require(owner)?.is_unbreakable() {
                    return Err(GroupError::Unbreakable(owner));
                }
            }
        }
        Ok(())
    }

    fn check_members(&self, id: GroupId, indices: &[usize]) -> GroupResult<()> {
        let group = self.model.require(id)?;
        match indices.iter().find(|&&i| !group.contains(i)) {
            Some(&index) => Err(GroupError::NotAMember { group: id, index }),
            None => Ok(()),
        }
    }

    fn check_indices(&self, indices: &[usize]) -> GroupResult<()> {
        let count = self.converter.index_count();
        match indices.iter().find(|&&i| i >= count) {
            Some(&index) => Err(GroupError::InvalidIndex(index)),
            None => Ok(()),
        }
    }

    /// An unbreakable group only grows by ungrouped cells that keep its
    /// visible block contiguous.
    fn extends_at_edge(&self, group: &Group, new: &[usize]) -> bool {
        if new.iter().any(|&i| self.model.owner_of(i).is_some()) {
            return false;
        }
        let positions: BTreeSet<usize> = group
            .visible_members(&self.converter)
            .into_iter()
            .map(|(p, _)| p)
            .chain(new.iter().filter_map(|&i| self.converter.position_of(i)))
            .collect();
        match (positions.first(), positions.last()) {
            (Some(&first), Some(&last)) => last - first + 1 == positions.len(),
            _ => false,
        }
    }
}
