use crate::{
    error::StateError,
    scanner::registry::ScanKey,
    state::{
        OffsetStore,
        models::{SaveOutcome, StoredOffset},
    },
};
use async_trait::async_trait;
use model::offset::compare_tokens;
use planner::query::ast::common::TableRef;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::{cmp::Ordering, path::Path};
use tracing::debug;

const KEY_PREFIX: &str = "offset:";

pub struct SledOffsetStore {
    db: sled::Db,
}

impl SledOffsetStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Keys fold case the same way scan leases do.
    #[inline]
    fn offset_key(table: &TableRef, column: &str) -> String {
        ScanKey::new(table, column).storage_key(KEY_PREFIX)
    }
}

#[async_trait]
impl OffsetStore for SledOffsetStore {
    async fn save(&self, entry: &StoredOffset) -> Result<SaveOutcome, StateError> {
        let key = Self::offset_key(&entry.table, &entry.column);
        let new_bytes = bincode::serialize(entry)?;

        // Check-then-set in one transaction so concurrent writers cannot
        // move the token backwards.
        let result = self.db.transaction::<_, _, StateError>(|tx_db| {
            if let Some(existing_bytes) = tx_db.get(&key)? {
                let existing: StoredOffset = bincode::deserialize(&existing_bytes)
                    .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;

                // Lexical tokens are ordered by the database collation, which
                // byte order cannot reproduce; only opaque tokens are checked.
                if existing.offset_type == entry.offset_type && !entry.offset_type.is_lexical() {
                    let order = compare_tokens(entry.offset_type, &entry.token(), &existing.token())
                        .map_err(|source| {
                            ConflictableTransactionError::Abort(StateError::Corrupt {
                                key: key.clone(),
                                source,
                            })
                        })?;
                    if order == Ordering::Less {
                        return Ok(SaveOutcome::Skipped);
                    }
                }
            }

            tx_db.insert(key.as_bytes(), new_bytes.as_slice())?;
            Ok(SaveOutcome::Saved)
        });

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(TransactionError::Abort(e)) => return Err(e),
            Err(TransactionError::Storage(e)) => return Err(e.into()),
        };
        self.db.flush_async().await?;
        debug!(key = %key, offset = %entry.token, ?outcome, "Saved offset");
        Ok(outcome)
    }

    async fn load(
        &self,
        table: &TableRef,
        column: &str,
    ) -> Result<Option<StoredOffset>, StateError> {
        let key = Self::offset_key(table, column);
        match self.db.get(key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, table: &TableRef, column: &str) -> Result<bool, StateError> {
        let key = Self::offset_key(table, column);
        let removed = self.db.remove(key)?.is_some();
        self.db.flush_async().await?;
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<StoredOffset>, StateError> {
        let mut entries = Vec::new();
        for item in self.db.scan_prefix(KEY_PREFIX) {
            let (_key, value) = item?;
            entries.push(bincode::deserialize(&value)?);
        }
        Ok(entries)
    }
}
