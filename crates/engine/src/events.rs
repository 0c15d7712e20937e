//! Event types for group change notifications.
//!
//! The rendering/command layer subscribes to these to learn which header
//! area needs repainting. Every event names the affected group and the
//! minimal visible position range to repaint (`None` when nothing of the
//! change is on screen).

use gridgroup_core::PositionRange;

use crate::group::GroupId;

/// Events emitted by `GroupHeader` operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupEvent {
    /// Members were added or removed, or the group was created/removed.
    MembershipChanged(GroupChange),

    /// The group transitioned to collapsed.
    Collapsed(GroupChange),

    /// The group transitioned to expanded.
    Expanded(GroupChange),

    /// The group's visible span changed because of hide/show that was not a
    /// collapse or expand.
    VisibilityChanged(GroupChange),

    /// Members changed position without a membership change.
    Moved(GroupChange),
}

impl GroupEvent {
    pub fn change(&self) -> &GroupChange {
        match self {
            GroupEvent::MembershipChanged(c)
            | GroupEvent::Collapsed(c)
            | GroupEvent::Expanded(c)
            | GroupEvent::VisibilityChanged(c)
            | GroupEvent::Moved(c) => c,
        }
    }

    pub fn group(&self) -> GroupId {
        self.change().group
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupChange {
    pub group: GroupId,
    /// Positions to repaint, in the coordinates after the change.
    pub repaint: Option<PositionRange>,
}

/// Callback type for receiving group events.
pub type EventCallback = Box<dyn FnMut(GroupEvent)>;

/// Simple event collector for testing.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<GroupEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: GroupEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GroupEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Groups that received a Collapsed event, in order.
    pub fn collapsed(&self) -> Vec<GroupId> {
        self.filter(|e| matches!(e, GroupEvent::Collapsed(_)))
    }

    pub fn expanded(&self) -> Vec<GroupId> {
        self.filter(|e| matches!(e, GroupEvent::Expanded(_)))
    }

    pub fn membership_changed(&self) -> Vec<GroupId> {
        self.filter(|e| matches!(e, GroupEvent::MembershipChanged(_)))
    }

    pub fn visibility_changed(&self) -> Vec<GroupId> {
        self.filter(|e| matches!(e, GroupEvent::VisibilityChanged(_)))
    }

    pub fn moved(&self) -> Vec<GroupId> {
        self.filter(|e| matches!(e, GroupEvent::Moved(_)))
    }

    fn filter(&self, pred: impl Fn(&GroupEvent) -> bool) -> Vec<GroupId> {
        self.events.iter().filter(|e| pred(e)).map(GroupEvent::group).collect()
    }
}
