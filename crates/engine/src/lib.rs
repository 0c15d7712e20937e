//! Header grouping engine.
//!
//! Groups of contiguous rows or columns rendered as one spanning header
//! cell, collapsed and expanded independently, reordered and partially
//! hidden while the underlying grid hides, shows and reorders for its own
//! reasons. Group state is kept in index space; positions are always
//! re-derived from the [`gridgroup_core::IndexPositionConverter`].

pub mod collapse;
pub mod error;
pub mod events;
pub mod group;
pub mod header;
pub mod model;
pub mod projection;
pub mod reorder;
pub mod state;
pub mod visibility;

#[cfg(test)]
pub mod harness;

pub use error::{GroupError, GroupResult};
pub use events::{EventCallback, EventCollector, GroupChange, GroupEvent};
pub use group::{Group, GroupId};
pub use header::GroupHeader;
pub use model::GroupModel;
pub use projection::{HeaderCell, HeaderLabel, ProjectionPass};
pub use reorder::{ReorderOutcome, Transfer};
pub use state::{GroupModelState, GroupState};
pub use visibility::HiddenLedger;
