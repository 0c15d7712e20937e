use gridgroup_core::ReorderRejected;
use thiserror::Error;

use crate::group::GroupId;

/// Business-rule rejections. Every `Err` leaves the model and the converter
/// exactly as they were before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("index {index} already belongs to group {group}")]
    Overlap { index: usize, group: GroupId },
    #[error("group {0} is unbreakable")]
    Unbreakable(GroupId),
    #[error("position {0} has no visible index")]
    InvalidPosition(usize),
    #[error("index {0} is out of range")]
    InvalidIndex(usize),
    #[error("group span must be at least 1")]
    InvalidSpan,
    #[error("index {index} is not a member of group {group}")]
    NotAMember { group: GroupId, index: usize },
    #[error("unknown group {0}")]
    UnknownGroup(GroupId),
    #[error("group {0} is collapsed")]
    Collapsed(GroupId),
    #[error(transparent)]
    Reorder(#[from] ReorderRejected),
    #[error("invalid group state: {0}")]
    InvalidState(String),
}

pub type GroupResult<T> = Result<T, GroupError>;
