use connectors::{error::AdapterError, sql::base::error::DbError};
use engine_config::settings::error::SettingsError;
use engine_core::error::{RunError, ScanError, StateError};
use model::offset::OffsetError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to connect: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("{0}")]
    Offset(#[from] OffsetError),

    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("Scan failed: {0}")]
    Run(#[from] RunError),

    #[error("Offset store error: {0}")]
    State(#[from] StateError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("{0} of {1} table scans failed")]
    ScansFailed(usize, usize),
}
