use crate::{
    error::StateError,
    state::models::{SaveOutcome, StoredOffset},
};
use async_trait::async_trait;
use planner::query::ast::common::TableRef;

pub mod models;
pub mod sled_store;

/// Durable home for the last delivered token of each table + offset column.
#[async_trait]
pub trait OffsetStore: Send + Sync {
    /// Stores `entry` unless it would move the token backwards.
    async fn save(&self, entry: &StoredOffset) -> Result<SaveOutcome, StateError>;
    async fn load(&self, table: &TableRef, column: &str)
    -> Result<Option<StoredOffset>, StateError>;
    /// Returns whether an entry existed.
    async fn delete(&self, table: &TableRef, column: &str) -> Result<bool, StateError>;
    async fn list(&self) -> Result<Vec<StoredOffset>, StateError>;
}
