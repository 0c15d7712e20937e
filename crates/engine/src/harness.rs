//! Test harness for header operations with event tracking.
//!
//! This module provides `GroupHarness`, a wrapper around
//! `GroupHeader<AxisView>` that:
//! - Collects every emitted `GroupEvent`
//! - Builds the Person/Address/Facts fixture used across the engine tests
//! - Checks model invariants plus the span bound after each scenario
//!
//! Use this harness to test header behaviour without a rendering layer.

use std::cell::RefCell;
use std::rc::Rc;

use gridgroup_core::{Axis, AxisView};

use crate::events::EventCollector;
use crate::group::GroupId;
use crate::header::GroupHeader;

/// Test harness wrapping a column header with event tracking.
pub struct GroupHarness {
    pub header: GroupHeader<AxisView>,
    events: Rc<RefCell<EventCollector>>,
}

impl GroupHarness {
    /// Fresh header over `len` columns, no groups.
    pub fn new(len: usize) -> Self {
        let events = Rc::new(RefCell::new(EventCollector::new()));
        let mut header = GroupHeader::new(Axis::Column, AxisView::new(len));
        let sink = Rc::clone(&events);
        header.set_event_callback(Box::new(move |event| sink.borrow_mut().push(event)));
        Self { header, events }
    }

    /// Twelve columns: Person = [0..4), Address = [4..8), Facts = [8..11),
    /// column 11 ungrouped. Events from the setup are cleared.
    pub fn person_address_facts() -> Self {
        let mut harness = Self::new(12);
        harness.header.add_group("Person", 0, 4).unwrap();
        harness.header.add_group("Address", 4, 4).unwrap();
        harness.header.add_group("Facts", 8, 3).unwrap();
        harness.clear_events();
        harness
    }

    /// Id of the first group with this name.
    pub fn id(&self, name: &str) -> GroupId {
        self.header.group_by_name(name).map(|g| g.id()).unwrap()
    }

    /// Get collected events.
    pub fn events(&self) -> std::cell::Ref<'_, EventCollector> {
        self.events.borrow()
    }

    /// Clear collected events.
    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    /// Panics if a structural invariant or the span bound is broken.
    pub fn check(&self) {
        self.header.model().check_invariants().unwrap();
        for group in self.header.model().groups() {
            assert!(group.visible_span(self.header.converter()) <= group.original_span());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GroupEvent;

    #[test]
    fn test_harness_fixture() {
        let harness = GroupHarness::person_address_facts();
        assert_eq!(harness.header.model().len(), 3);
        assert!(harness.events().is_empty());
        assert!(harness.header.group_by_index(11).is_none());
        harness.check();
    }

    #[test]
    fn test_harness_collects_events() {
        let mut harness = GroupHarness::person_address_facts();
        let facts = harness.id("Facts");
        harness.header.collapse(facts).unwrap();

        let events = harness.events();
        assert_eq!(events.len(), 1);
        match &events.events()[0] {
            GroupEvent::Collapsed(change) => {
                assert_eq!(change.group, facts);
                // Facts keeps its placeholder at 8; 11 slides to position 9
                assert_eq!(change.repaint.map(|r| r.start), Some(8));
                assert_eq!(change.repaint.map(|r| r.end), Some(9));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
