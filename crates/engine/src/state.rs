//! Persisted group state.
//!
//! Only the semantic state is stored: names, members, statics and flags.
//! Positions, spans and hidden sets are recomputed against the converter on
//! load.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{GroupError, GroupResult};
use crate::model::GroupModel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupState {
    pub name: String,
    pub member_indices: Vec<usize>,
    #[serde(default)]
    pub static_indices: Vec<usize>,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub unbreakable: bool,
}

/// Saved state of one `GroupModel`, groups in start-index order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupModelState {
    pub groups: Vec<GroupState>,
}

impl GroupModelState {
    pub fn capture(model: &GroupModel) -> Self {
        let groups = model
            .groups()
            .map(|g| GroupState {
                name: g.name().to_string(),
                member_indices: g.members().to_vec(),
                static_indices: g.static_members().iter().copied().collect(),
                collapsed: g.is_collapsed(),
                unbreakable: g.is_unbreakable(),
            })
            .collect();
        Self { groups }
    }

    /// Check the state can be loaded over an axis of `index_count` indices.
    pub fn validate(&self, index_count: usize) -> GroupResult<()> {
        let mut seen = BTreeSet::new();
        for group in &self.groups {
            if group.member_indices.is_empty() {
                return Err(GroupError::InvalidState(format!("group '{}' has no members", group.name)));
            }
            for &index in &group.member_indices {
                if index >= index_count {
                    return Err(GroupError::InvalidIndex(index));
                }
                if !seen.insert(index) {
                    return Err(GroupError::InvalidState(format!(
                        "index {index} appears in more than one group"
                    )));
                }
            }
            if let Some(s) = group.static_indices.iter().find(|s| !group.member_indices.contains(s)) {
                return Err(GroupError::InvalidState(format!(
                    "static index {s} is not a member of '{}'",
                    group.name
                )));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> GroupState {
        GroupState {
            name: "Person".to_string(),
            member_indices: vec![0, 1, 2, 3],
            static_indices: vec![],
            collapsed: false,
            unbreakable: false,
        }
    }

    #[test]
    fn test_json_shape() {
        let state = GroupModelState { groups: vec![person()] };
        let json = state.to_json().unwrap();
        assert!(json.contains("\"memberIndices\""));
        assert!(json.contains("\"staticIndices\""));
        assert_eq!(GroupModelState::from_json(&json).unwrap(), state);

        // Flags default when absent
        let parsed = GroupModelState::from_json(r#"{"groups":[{"name":"A","memberIndices":[3]}]}"#).unwrap();
        assert!(!parsed.groups[0].collapsed);
        assert!(parsed.groups[0].static_indices.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_state() {
        let mut overlap = person();
        overlap.member_indices = vec![3, 4];
        let state = GroupModelState { groups: vec![person(), overlap] };
        assert!(matches!(state.validate(12), Err(GroupError::InvalidState(_))));

        let state = GroupModelState { groups: vec![person()] };
        assert_eq!(state.validate(3), Err(GroupError::InvalidIndex(3)));

        let mut bad_static = person();
        bad_static.static_indices = vec![9];
        let state = GroupModelState { groups: vec![bad_static] };
        assert!(matches!(state.validate(12), Err(GroupError::InvalidState(_))));

        let mut empty = person();
        empty.member_indices.clear();
        assert!(GroupModelState { groups: vec![empty] }.validate(12).is_err());
        assert!(GroupModelState { groups: vec![person()] }.validate(12).is_ok());
    }
}
