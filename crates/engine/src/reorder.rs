//! Reorder reconciler: decides what a drag of header cells means for group
//! membership before anything is moved.
//!
//! Planning is pure. It reads the model and the converter and returns a plan
//! (or a rejection) without touching either, so a rejected reorder is a no-op
//! on both. `GroupHeader` applies the plan: one converter reorder, then the
//! membership transfers.

use std::collections::BTreeSet;

use gridgroup_config::{EdgePreference, ReorderSettings};
use gridgroup_core::IndexPositionConverter;

use crate::error::{GroupError, GroupResult};
use crate::group::{Group, GroupId};
use crate::model::GroupModel;

/// One index changing owner as part of a reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub index: usize,
    pub from: Option<GroupId>,
    pub to: Option<GroupId>,
}

/// A validated member reorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    /// Moved indices in ascending position order
    pub moved: Vec<usize>,
    pub requested_destination: usize,
    /// Destination after snapping to a group edge
    pub destination: usize,
    /// False when the block already sits at `destination`
    pub reposition: bool,
    pub transfers: Vec<Transfer>,
}

impl ReorderPlan {
    pub fn snapped(&self) -> bool {
        self.destination != self.requested_destination
    }
}

/// A validated whole-group reorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMovePlan {
    pub group: GroupId,
    /// Every member, hidden ones included, in underlying order
    pub moved: Vec<usize>,
    pub requested_destination: usize,
    pub destination: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// Self-targeted or otherwise empty move
    Unchanged,
    /// Positions changed, membership did not
    Repositioned,
    /// Membership changed (positions may also have changed)
    Regrouped(Vec<Transfer>),
}

/// Visible non-moved indices on either side of the gap at `destination`.
fn neighbours(
    conv: &dyn IndexPositionConverter,
    destination: usize,
    moving: &BTreeSet<usize>,
) -> (Option<usize>, Option<usize>) {
    let left = (0..destination)
        .rev()
        .filter_map(|p| conv.index_of(p))
        .find(|i| !moving.contains(i));
    let right = (destination..conv.visible_count())
        .filter_map(|p| conv.index_of(p))
        .find(|i| !moving.contains(i));
    (left, right)
}

/// Move an interior gap of `group` to its nearer edge. Moved indices are
/// excluded from the group's extent.
fn snap_to_edge(
    group: &Group,
    conv: &dyn IndexPositionConverter,
    destination: usize,
    moving: &BTreeSet<usize>,
    tie_break: EdgePreference,
) -> usize {
    let positions = group
        .members()
        .iter()
        .filter(|i| !moving.contains(i))
        .filter_map(|&i| conv.position_of(i));
    let (start, end) = positions.fold((usize::MAX, 0), |(s, e), p| (s.min(p), e.max(p)));
    if start == usize::MAX || destination <= start || destination > end {
        return destination;
    }
    let to_start = destination - start;
    let to_end = end + 1 - destination;
    let snapped = match to_start.cmp(&to_end) {
        std::cmp::Ordering::Less => start,
        std::cmp::Ordering::Greater => end + 1,
        std::cmp::Ordering::Equal => match tie_break {
            EdgePreference::Start => start,
            EdgePreference::End => end + 1,
        },
    };
    log::debug!(
        "reorder destination {} is inside {} '{}', snapped to {}",
        destination,
        group.id(),
        group.name(),
        snapped
    );
    snapped
}

/// A contiguous block of positions dropped anywhere on its own extent does
/// not move.
fn lands_in_place(positions: &[usize], destination: usize) -> bool {
    match (positions.first(), positions.last()) {
        (Some(&first), Some(&last)) => {
            last - first + 1 == positions.len() && (first..=last + 1).contains(&destination)
        }
        _ => true,
    }
}

/// Plan moving the indices at `positions` to the gap at `destination`.
///
/// Returns `Ok(None)` for a move that changes nothing.
pub fn plan_reorder(
    model: &GroupModel,
    conv: &dyn IndexPositionConverter,
    positions: &[usize],
    destination: usize,
    settings: &ReorderSettings,
) -> GroupResult<Option<ReorderPlan>> {
    if positions.is_empty() {
        return Ok(None);
    }
    let moved = model.resolve_positions(conv, positions)?;
    if destination > conv.visible_count() {
        return Err(GroupError::InvalidPosition(destination));
    }
    let sorted: Vec<usize> = moved.iter().filter_map(|&i| conv.position_of(i)).collect();
    if lands_in_place(&sorted, destination) {
        log::debug!("reorder of {:?} onto its own gap {} ignored", moved, destination);
        return Ok(None);
    }

    let moving: BTreeSet<usize> = moved.iter().copied().collect();
    let (left, right) = neighbours(conv, destination, &moving);
    let left_group = left.and_then(|i| model.owner_of(i));
    let right_group = right.and_then(|i| model.owner_of(i));

    let mut target_destination = destination;
    let mut transfers = Vec::new();

    match (left_group, right_group) {
        (Some(lg), Some(rg)) if lg == rg => {
            let group = model.require(lg)?;
            let all_inside = moved.iter().all(|&i| group.contains(i));
            if !all_inside {
                if group.is_unbreakable() {
                    return Err(GroupError::Unbreakable(lg));
                }
                target_destination = snap_to_edge(group, conv, destination, &moving, settings.edge_tie_break);
                for &index in &moved {
                    let from = model.owner_of(index);
                    if from != Some(lg) {
                        transfers.push(Transfer { index, from, to: Some(lg) });
                    }
                }
            }
        }
        _ => {
            let join = if settings.join_adjacent_groups {
                right_group.or(left_group)
            } else {
                None
            };
            for &index in &moved {
                let from = model.owner_of(index);
                let stays = match from {
                    Some(src) => {
                        Some(src) == left_group
                            || Some(src) == right_group
                            || model.require(src)?.members().iter().all(|i| moving.contains(i))
                    }
                    None => false,
                };
                if stays || from == join {
                    continue;
                }
                transfers.push(Transfer { index, from, to: join });
            }
        }
    }

    for transfer in &transfers {
        if let Some(from) = transfer.from {
            if model.require(from)?.is_unbreakable() {
                return Err(GroupError::Unbreakable(from));
            }
        }
        if let Some(to) = transfer.to {
            let target = model.require(to)?;
            if target.is_unbreakable() {
                return Err(GroupError::Unbreakable(to));
            }
            if target.is_collapsed() && !settings.join_collapsed_groups {
                return Err(GroupError::Collapsed(to));
            }
        }
    }

    let reposition = !lands_in_place(&sorted, target_destination);
    if !reposition && transfers.is_empty() {
        return Ok(None);
    }
    Ok(Some(ReorderPlan {
        moved,
        requested_destination: destination,
        destination: target_destination,
        reposition,
        transfers,
    }))
}

/// Plan moving every member of `id` as one block to the gap at
/// `destination`. Membership never changes.
pub fn plan_group_reorder(
    model: &GroupModel,
    conv: &dyn IndexPositionConverter,
    id: GroupId,
    destination: usize,
    settings: &ReorderSettings,
) -> GroupResult<Option<GroupMovePlan>> {
    let group = model.require(id)?;
    if destination > conv.visible_count() {
        return Err(GroupError::InvalidPosition(destination));
    }
    if let Some(range) = group.visible_range(conv) {
        if (range.start..=range.end + 1).contains(&destination) {
            return Ok(None);
        }
    }

    let mut moved = group.members().to_vec();
    moved.sort_by_key(|&i| conv.ordinal_of(i).unwrap_or(usize::MAX));
    let moving: BTreeSet<usize> = moved.iter().copied().collect();

    let (left, right) = neighbours(conv, destination, &moving);
    let mut target_destination = destination;
    if let (Some(lg), Some(rg)) = (left.and_then(|i| model.owner_of(i)), right.and_then(|i| model.owner_of(i))) {
        if lg == rg {
            let other = model.require(lg)?;
            if other.is_unbreakable() {
                return Err(GroupError::Unbreakable(lg));
            }
            target_destination = snap_to_edge(other, conv, destination, &moving, settings.edge_tie_break);
        }
    }

    Ok(Some(GroupMovePlan {
        group: id,
        moved,
        requested_destination: destination,
        destination: target_destination,
    }))
}

/// Member lists to restore on a reorder reset.
///
/// Candidates claim their baselines in order of lowest baseline index (then
/// id); an index already claimed, or past `index_count`, is skipped.
/// Candidates whose claim ends up empty are absent from the result.
pub fn reset_assignments<'a>(
    candidates: impl IntoIterator<Item = &'a Group>,
    index_count: usize,
) -> Vec<(GroupId, Vec<usize>)> {
    let mut ordered: Vec<&Group> = candidates.into_iter().collect();
    ordered.sort_by_key(|g| (g.baseline().iter().copied().min().unwrap_or(usize::MAX), g.id()));

    let mut claimed = BTreeSet::new();
    let mut assignments = Vec::new();
    for group in ordered {
        let members: Vec<usize> = group
            .baseline()
            .iter()
            .copied()
            .filter(|&i| i < index_count && claimed.insert(i))
            .collect();
        if !members.is_empty() {
            assignments.push((group.id(), members));
        }
    }
    assignments
}
