//! Collapse/expand engine.
//!
//! State machine per group: `Expanded <-> Collapsed`.
//!
//! - Collapse hides every visible non-static member. When no static member is
//!   visible, one member stays as the placeholder so the group keeps a
//!   clickable cell. Only indices this call newly hides become
//!   collapse-owned.
//! - Expand shows exactly the collapse-owned indices that have no external
//!   reason to stay hidden. It is not a blanket "show all members".

use std::collections::BTreeSet;

use gridgroup_core::IndexPositionConverter;

use crate::group::Group;
use crate::visibility::HiddenLedger;

/// Members a collapsed `group` must have hidden right now.
///
/// The placeholder is the first visible member in member order, so members
/// joining a collapsed group never displace it.
pub fn hide_plan(group: &Group, conv: &dyn IndexPositionConverter) -> BTreeSet<usize> {
    let visible = group.visible_members(conv);
    let has_visible_static = visible.iter().any(|&(_, i)| group.is_static(i));
    let placeholder = if has_visible_static {
        None
    } else {
        group.members().iter().copied().find(|&i| conv.position_of(i).is_some())
    };
    visible
        .into_iter()
        .map(|(_, i)| i)
        .filter(|&i| !group.is_static(i) && Some(i) != placeholder)
        .collect()
}

/// `Expanded -> Collapsed`. Returns the indices newly hidden, or `None` if
/// the group was already collapsed.
pub fn collapse(
    group: &mut Group,
    conv: &mut dyn IndexPositionConverter,
) -> Option<BTreeSet<usize>> {
    if group.is_collapsed() {
        return None;
    }
    let to_hide = hide_plan(group, conv);
    if !to_hide.is_empty() {
        conv.request_hide(&to_hide);
    }
    group.record_collapse_hidden(&to_hide);
    group.set_collapsed(true);
    log::debug!("collapse {} '{}' hid {:?}", group.id(), group.name(), to_hide);
    Some(to_hide)
}

/// `Collapsed -> Expanded`. Returns the indices shown, or `None` if the
/// group was not collapsed.
pub fn expand(
    group: &mut Group,
    conv: &mut dyn IndexPositionConverter,
    ledger: &HiddenLedger,
) -> Option<BTreeSet<usize>> {
    if !group.is_collapsed() {
        return None;
    }
    let owned = group.take_collapse_hidden();
    let to_show = ledger.releasable(&owned);
    if !to_show.is_empty() {
        conv.request_show(&to_show);
    }
    group.set_collapsed(false);
    log::debug!(
        "expand {} '{}' showed {:?} (kept {} externally hidden)",
        group.id(),
        group.name(),
        to_show,
        owned.len() - to_show.len()
    );
    Some(to_show)
}

/// Re-apply the collapse to a collapsed group after its membership or
/// static set changed. Returns indices newly hidden.
pub fn resync(
    group: &mut Group,
    conv: &mut dyn IndexPositionConverter,
) -> BTreeSet<usize> {
    if !group.is_collapsed() {
        return BTreeSet::new();
    }
    let to_hide = hide_plan(group, conv);
    if !to_hide.is_empty() {
        conv.request_hide(&to_hide);
        group.record_collapse_hidden(&to_hide);
    }
    to_hide
}

/// A collapsed group whose last visible member left gets a placeholder back:
/// the collapse-owned member earliest in the underlying order.
pub fn restore_placeholder(
    group: &mut Group,
    conv: &mut dyn IndexPositionConverter,
    ledger: &HiddenLedger,
) -> Option<usize> {
    if !group.is_collapsed() || group.is_anchorable(conv) {
        return None;
    }
    let candidate = group
        .collapse_hidden()
        .iter()
        .copied()
        .filter(|&i| !ledger.is_externally_hidden(i))
        .min_by_key(|&i| conv.ordinal_of(i).unwrap_or(usize::MAX))?;
    group.release_collapse_hidden(candidate);
    conv.request_show(&BTreeSet::from([candidate]));
    Some(candidate)
}
