//! Hidden-state ledger.
//!
//! The converter only knows *that* an index is hidden. The ledger records
//! which hides came from outside the grouping engine (user hide, filter,
//! direct hides on the underlying layer) so that expand and show-all can tell
//! them apart from collapse-owned hides, which live on each group.

use std::collections::BTreeSet;

use crate::model::GroupModel;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenLedger {
    external: BTreeSet<usize>,
}

impl HiddenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hidden(&mut self, indices: impl IntoIterator<Item = usize>) {
        self.external.extend(indices);
    }

    pub fn record_shown(&mut self, indices: impl IntoIterator<Item = usize>) {
        for index in indices {
            self.external.remove(&index);
        }
    }

    pub fn clear(&mut self) {
        self.external.clear();
    }

    pub fn is_externally_hidden(&self, index: usize) -> bool {
        self.external.contains(&index)
    }

    pub fn externally_hidden(&self) -> &BTreeSet<usize> {
        &self.external
    }

    /// Of `candidates`, those with no external reason to stay hidden.
    pub fn releasable(&self, candidates: &BTreeSet<usize>) -> BTreeSet<usize> {
        candidates.difference(&self.external).copied().collect()
    }
}

/// Union of every group's collapse-owned hides.
pub fn collapse_owned(model: &GroupModel) -> BTreeSet<usize> {
    model
        .groups()
        .flat_map(|g| g.collapse_hidden().iter().copied())
        .collect()
}
