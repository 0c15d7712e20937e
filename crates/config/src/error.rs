use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("settings JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settings TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
