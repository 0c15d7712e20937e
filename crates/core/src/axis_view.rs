//! AxisView - reference index/position layer
//!
//! This module provides an in-memory coordinate layer that maps between:
//! - Position space (what the header shows, affected by hide/reorder)
//! - Index space (stable logical identity, 0..N-1)
//!
//! Key invariants:
//! - `order` holds every index exactly once, hidden ones included
//! - visible_mask is indexed by INDEX (not by slot or position)
//! - Caches are rebuilt after every mutation, so all lookups are O(1)

use std::collections::BTreeSet;

use crate::converter::{IndexPositionConverter, ReorderRejected};

/// In-memory implementation of [`IndexPositionConverter`].
#[derive(Debug, Clone)]
pub struct AxisView {
    /// Maps slot -> index. Identity by default: [0, 1, 2, ..., N-1]
    order: Vec<usize>,

    /// Inverse map: index -> slot
    ordinal_map: Vec<usize>,

    /// Visibility mask indexed by index. true = visible
    visible_mask: Vec<bool>,

    /// Cached visible indices in position order (position -> index)
    visible: Vec<usize>,

    /// Cached index -> position (None when hidden)
    position_map: Vec<Option<usize>>,
}

impl Default for AxisView {
    fn default() -> Self {
        Self::new(0)
    }
}

impl AxisView {
    /// Identity mapping for N indices, all visible
    pub fn new(len: usize) -> Self {
        Self {
            order: (0..len).collect(),
            ordinal_map: (0..len).collect(),
            visible_mask: vec![true; len],
            visible: (0..len).collect(),
            position_map: (0..len).map(Some).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Underlying order (slot -> index), hidden indices included
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Visible indices in position order
    pub fn visible_indices(&self) -> &[usize] {
        &self.visible
    }

    /// Is the order a non-identity permutation?
    pub fn is_reordered(&self) -> bool {
        self.order.iter().enumerate().any(|(slot, &i)| slot != i)
    }

    // -------------------------------------------------------------------------
    // Internal rebuilders
    // -------------------------------------------------------------------------

    fn rebuild(&mut self) {
        for (slot, &index) in self.order.iter().enumerate() {
            self.ordinal_map[index] = slot;
        }

        self.visible.clear();
        self.position_map.clear();
        self.position_map.resize(self.order.len(), None);
        for &index in &self.order {
            if self.visible_mask[index] {
                self.position_map[index] = Some(self.visible.len());
                self.visible.push(index);
            }
        }
    }
}

impl IndexPositionConverter for AxisView {
    fn position_of(&self, index: usize) -> Option<usize> {
        self.position_map.get(index).copied().flatten()
    }

    fn index_of(&self, position: usize) -> Option<usize> {
        self.visible.get(position).copied()
    }

    fn visible_count(&self) -> usize {
        self.visible.len()
    }

    fn index_count(&self) -> usize {
        self.order.len()
    }

    fn ordinal_of(&self, index: usize) -> Option<usize> {
        self.ordinal_map.get(index).copied()
    }

    fn is_hidden(&self, index: usize) -> bool {
        self.visible_mask.get(index).is_some_and(|v| !v)
    }

    fn hidden_indices(&self) -> BTreeSet<usize> {
        self.visible_mask
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| if v { None } else { Some(i) })
            .collect()
    }

    fn request_hide(&mut self, indices: &BTreeSet<usize>) {
        let mut changed = false;
        for &i in indices {
            if let Some(v) = self.visible_mask.get_mut(i) {
                changed |= *v;
                *v = false;
            }
        }
        if changed {
            self.rebuild();
        }
    }

    fn request_show(&mut self, indices: &BTreeSet<usize>) {
        let mut changed = false;
        for &i in indices {
            if let Some(v) = self.visible_mask.get_mut(i) {
                changed |= !*v;
                *v = true;
            }
        }
        if changed {
            self.rebuild();
        }
    }

    fn request_reorder(&mut self, moved: &[usize], destination: usize) -> Result<(), ReorderRejected> {
        let visible_count = self.visible.len();
        if destination > visible_count {
            return Err(ReorderRejected::DestinationOutOfRange { destination, visible_count });
        }
        let mut moving = BTreeSet::new();
        for &i in moved {
            if i >= self.order.len() {
                return Err(ReorderRejected::IndexOutOfRange(i));
            }
            if !moving.insert(i) {
                return Err(ReorderRejected::DuplicateIndex(i));
            }
        }
        if moved.is_empty() {
            return Ok(());
        }

        // The block lands before the first visible non-moved index at or after
        // the destination; otherwise right after the last visible non-moved one.
        let anchor_before = self.visible[destination..]
            .iter()
            .copied()
            .find(|i| !moving.contains(i));
        let anchor_after = if anchor_before.is_none() {
            self.visible.iter().rev().copied().find(|i| !moving.contains(i))
        } else {
            None
        };

        let mut order: Vec<usize> = self
            .order
            .iter()
            .copied()
            .filter(|i| !moving.contains(i))
            .collect();
        let insert_at = match (anchor_before, anchor_after) {
            (Some(a), _) => order.iter().position(|&i| i == a).unwrap_or(order.len()),
            (None, Some(a)) => order.iter().position(|&i| i == a).map_or(order.len(), |p| p + 1),
            (None, None) => order.len(),
        };
        order.splice(insert_at..insert_at, moved.iter().copied());

        log::debug!("axis reorder {:?} -> position {}", moved, destination);
        self.order = order;
        self.rebuild();
        Ok(())
    }

    fn request_reset_order(&mut self) {
        self.order = (0..self.order.len()).collect();
        self.rebuild();
    }
}

// =============================================================================
// Tests
// =============================================================================
