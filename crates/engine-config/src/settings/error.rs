use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating scan settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Every problem found in one validation pass.
    #[error("Invalid configuration:\n  - {}", .0.join("\n  - "))]
    ValidationFailed(Vec<String>),

    #[error("No table named '{0}' is configured")]
    UnknownTable(String),
}
