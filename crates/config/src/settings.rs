// Grouping behaviour settings
// Loaded from ~/.config/gridgroup/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Which group edge an interior drop snaps to when both are equally near
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgePreference {
    #[default]
    Start,
    End,
}

/// Reorder reconciliation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReorderSettings {
    /// Tie-break for interior drops equidistant from both edges
    pub edge_tie_break: EdgePreference,

    /// A drop that adjoins a foreign group's edge joins that group.
    /// When false the moved index is ungrouped instead.
    pub join_adjacent_groups: bool,

    /// Allow reorder to add members to a collapsed group (they get hidden)
    pub join_collapsed_groups: bool,
}

impl Default for ReorderSettings {
    fn default() -> Self {
        Self {
            edge_tie_break: EdgePreference::Start,
            join_adjacent_groups: true,
            join_collapsed_groups: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSettings {
    pub reorder: ReorderSettings,
}

impl GroupSettings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridgroup");
        config_dir.join("settings.json")
    }

    /// Load settings from the default path, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{}; using default settings", e);
                Self::default()
            }
        }
    }

    /// Load settings from a JSON (or `.toml`) file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if path.extension().is_some_and(|ext| ext == "toml") {
            Self::from_toml(&contents)
        } else {
            Self::from_json(&contents)
        }
    }

    /// Parse JSON settings. Lines starting with `//` are comments.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(serde_json::from_str(&cleaned)?)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = GroupSettings::default();
        assert_eq!(settings.reorder.edge_tie_break, EdgePreference::Start);
        assert!(settings.reorder.join_adjacent_groups);
        assert!(settings.reorder.join_collapsed_groups);
    }

    #[test]
    fn test_json_with_comments_and_partial_keys() {
        let json = r#"{
    // Interior drops snap to the end edge on ties
    "reorder": { "edgeTieBreak": "end" }
}"#;
        let settings = GroupSettings::from_json(json).unwrap();
        assert_eq!(settings.reorder.edge_tie_break, EdgePreference::End);
        assert!(settings.reorder.join_adjacent_groups);
    }

    #[test]
    fn test_toml() {
        let toml = r#"
[reorder]
joinCollapsedGroups = false
"#;
        let settings = GroupSettings::from_toml(toml).unwrap();
        assert!(!settings.reorder.join_collapsed_groups);
        assert!(settings.reorder.join_adjacent_groups);
        assert_eq!(settings.reorder.edge_tie_break, EdgePreference::Start);
    }

    #[test]
    fn test_bad_json_is_error() {
        assert!(matches!(
            GroupSettings::from_json(r#"{ "reorder": { "edgeTieBreak": "middle" } }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_load_from_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("settings.json");
        std::fs::write(&json, r#"{ "reorder": { "joinAdjacentGroups": false } }"#).unwrap();
        let toml = dir.path().join("settings.toml");
        std::fs::write(&toml, "[reorder]\nedgeTieBreak = \"end\"\n").unwrap();

        assert!(!GroupSettings::load_from(&json).unwrap().reorder.join_adjacent_groups);
        assert_eq!(GroupSettings::load_from(&toml).unwrap().reorder.edge_tie_break, EdgePreference::End);
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = GroupSettings::load_from(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
