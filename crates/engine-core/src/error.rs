use connectors::sql::base::{
    classify::{ErrorClass, classify_db_error},
    error::DbError,
};
use model::offset::OffsetError;
use thiserror::Error;

/// Errors surfaced by a scan. Every variant names the table and offset
/// column it happened on.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{table}.{column}: {source}")]
    MalformedOffset {
        table: String,
        column: String,
        #[source]
        source: OffsetError,
    },

    #[error("{table}.{column}: {source}")]
    InvalidInitialOffset {
        table: String,
        column: String,
        #[source]
        source: OffsetError,
    },

    #[error("{table}.{column}: {source}")]
    UnsupportedOffsetType {
        table: String,
        column: String,
        #[source]
        source: OffsetError,
    },

    /// Retry the same poll; the cursor has not moved.
    #[error("{table}.{column}: transient query failure: {source}")]
    TransientQuery {
        table: String,
        column: String,
        #[source]
        source: DbError,
    },

    #[error("{table}.{column}: schema error: {reason}")]
    Schema {
        table: String,
        column: String,
        reason: String,
    },

    #[error("{table}.{column}: query failed: {source}")]
    Query {
        table: String,
        column: String,
        #[source]
        source: DbError,
    },

    #[error("{table}.{column}: a scan is already running for this offset column")]
    AlreadyScanning { table: String, column: String },

    #[error("{table}.{column}: invalid scan request: {reason}")]
    InvalidRequest {
        table: String,
        column: String,
        reason: String,
    },

    #[error("{table}.{column}: scan cancelled")]
    Cancelled { table: String, column: String },

    #[error("{table}.{column}: scan is closed")]
    Closed { table: String, column: String },
}

impl ScanError {
    /// Maps an execution failure onto the transient, schema or fatal
    /// variant its class calls for.
    pub fn from_query(table: &str, column: &str, source: DbError) -> Self {
        let (table, column) = (table.to_string(), column.to_string());
        match classify_db_error(&source) {
            ErrorClass::Transient => ScanError::TransientQuery {
                table,
                column,
                source,
            },
            ErrorClass::Schema => ScanError::Schema {
                table,
                column,
                reason: source.to_string(),
            },
            ErrorClass::Fatal => ScanError::Query {
                table,
                column,
                source,
            },
        }
    }

    pub fn schema(table: &str, column: &str, reason: impl Into<String>) -> Self {
        ScanError::Schema {
            table: table.to_string(),
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    /// Only transient query failures may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, ScanError::TransientQuery { .. })
    }

    pub fn table(&self) -> &str {
        match self {
            ScanError::MalformedOffset { table, .. }
            | ScanError::InvalidInitialOffset { table, .. }
            | ScanError::UnsupportedOffsetType { table, .. }
            | ScanError::TransientQuery { table, .. }
            | ScanError::Schema { table, .. }
            | ScanError::Query { table, .. }
            | ScanError::AlreadyScanning { table, .. }
            | ScanError::InvalidRequest { table, .. }
            | ScanError::Cancelled { table, .. }
            | ScanError::Closed { table, .. } => table,
        }
    }

    pub fn column(&self) -> &str {
        match self {
            ScanError::MalformedOffset { column, .. }
            | ScanError::InvalidInitialOffset { column, .. }
            | ScanError::UnsupportedOffsetType { column, .. }
            | ScanError::TransientQuery { column, .. }
            | ScanError::Schema { column, .. }
            | ScanError::Query { column, .. }
            | ScanError::AlreadyScanning { column, .. }
            | ScanError::InvalidRequest { column, .. }
            | ScanError::Cancelled { column, .. }
            | ScanError::Closed { column, .. } => column,
        }
    }
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Offset store error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Failed to encode stored offset: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Stored offset for {key} is unreadable: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: OffsetError,
    },
}

/// Errors that stop a scan runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("Batch consumer failed: {0}")]
    Consumer(String),
}
