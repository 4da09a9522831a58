use chrono::{DateTime, Utc};
use model::offset::{OffsetToken, OffsetType};
use planner::query::ast::common::TableRef;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredOffset {
    pub table: TableRef,
    pub column: String,
    pub offset_type: OffsetType,
    /// Persisted token text; empty means start of table.
    pub token: String,
    pub rows_done: u64,
    pub updated_at: DateTime<Utc>,
}

impl StoredOffset {
    pub fn new(
        table: &TableRef,
        column: &str,
        offset_type: OffsetType,
        token: &OffsetToken,
        rows_done: u64,
    ) -> Self {
        Self {
            table: table.clone(),
            column: column.to_string(),
            offset_type,
            token: token.as_str().to_string(),
            rows_done,
            updated_at: Utc::now(),
        }
    }

    pub fn token(&self) -> OffsetToken {
        OffsetToken::from_persisted(&self.token)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The stored token was already further along.
    Skipped,
}
