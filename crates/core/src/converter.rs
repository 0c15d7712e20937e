//! The index/position contract consumed by the grouping engine.

use std::collections::BTreeSet;

use thiserror::Error;

/// A reorder request refused by the coordinate layer.
///
/// Refusal is all-or-nothing: the layer's ordering is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderRejected {
    #[error("index {0} is out of range")]
    IndexOutOfRange(usize),
    #[error("destination position {destination} exceeds visible count {visible_count}")]
    DestinationOutOfRange { destination: usize, visible_count: usize },
    #[error("index {0} listed more than once")]
    DuplicateIndex(usize),
    #[error("reorder refused by coordinate layer: {0}")]
    Refused(String),
}

/// Index/position lookups plus the mutation requests the engine may issue.
///
/// Implemented by the virtualization layer below the header. All requests are
/// synchronous and apply completely or not at all. Callers must re-query
/// positions after every request; nothing returned here may be cached across
/// a mutation.
pub trait IndexPositionConverter {
    /// Visible position of `index`, or `None` if hidden or out of range.
    fn position_of(&self, index: usize) -> Option<usize>;

    /// Index shown at `position`, or `None` past the visible end.
    fn index_of(&self, position: usize) -> Option<usize>;

    /// Number of visible positions.
    fn visible_count(&self) -> usize;

    /// Number of indices, hidden ones included.
    fn index_count(&self) -> usize;

    /// Slot of `index` in the underlying order, hidden indices included.
    fn ordinal_of(&self, index: usize) -> Option<usize>;

    fn is_hidden(&self, index: usize) -> bool {
        index < self.index_count() && self.position_of(index).is_none()
    }

    /// All currently hidden indices.
    fn hidden_indices(&self) -> BTreeSet<usize> {
        (0..self.index_count()).filter(|&i| self.is_hidden(i)).collect()
    }

    fn request_hide(&mut self, indices: &BTreeSet<usize>);

    fn request_show(&mut self, indices: &BTreeSet<usize>);

    /// Move `moved` (in the given order, contiguously) in front of the index
    /// currently visible at `destination`; `destination == visible_count()`
    /// appends after the last visible index. Hidden indices may be moved.
    fn request_reorder(&mut self, moved: &[usize], destination: usize) -> Result<(), ReorderRejected>;

    /// Restore the identity order.
    fn request_reset_order(&mut self);
}
