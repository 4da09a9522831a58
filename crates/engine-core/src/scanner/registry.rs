use planner::query::ast::common::TableRef;
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};
use tracing::trace;

/// Case-folded identity of a table + offset column pair. Leases and
/// stored offsets are both keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ScanKey {
    schema: Option<String>,
    table: String,
    column: String,
}

impl ScanKey {
    pub(crate) fn new(table: &TableRef, column: &str) -> Self {
        Self {
            schema: table.schema.as_deref().map(str::to_ascii_lowercase),
            table: table.name.to_ascii_lowercase(),
            column: column.to_ascii_lowercase(),
        }
    }

    /// `<prefix><schema>:<table>:<column>`, empty schema when absent.
    pub(crate) fn storage_key(&self, prefix: &str) -> String {
        format!(
            "{prefix}{}:{}:{}",
            self.schema.as_deref().unwrap_or(""),
            self.table,
            self.column
        )
    }
}

/// Table + offset column pairs that currently have an open scan.
#[derive(Debug, Clone, Default)]
pub struct ScanRegistry {
    active: Arc<Mutex<HashSet<ScanKey>>>,
}

impl ScanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leases the pair, or returns `None` when it is already leased.
    pub fn try_acquire(&self, table: &TableRef, column: &str) -> Option<ScanLease> {
        let key = ScanKey::new(table, column);
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(key.clone()) {
            return None;
        }
        trace!(table = %table, column, "Scan lease acquired");
        Some(ScanLease {
            key,
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_active(&self, table: &TableRef, column: &str) -> bool {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.contains(&ScanKey::new(table, column))
    }

    pub fn len(&self) -> usize {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Released on drop.
#[derive(Debug)]
pub struct ScanLease {
    key: ScanKey,
    active: Arc<Mutex<HashSet<ScanKey>>>,
}

impl Drop for ScanLease {
    fn drop(&mut self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_leased_once() {
        let registry = ScanRegistry::new();
        let orders = TableRef::with_schema(Some("public"), "orders");

        let lease = registry.try_acquire(&orders, "id").unwrap();
        assert!(registry.try_acquire(&orders, "ID").is_none());
        // another column of the same table is a different scan
        assert!(registry.try_acquire(&orders, "updated_at").is_some());
        assert!(registry.is_active(&orders, "id"));

        drop(lease);
        assert!(!registry.is_active(&orders, "id"));
        assert!(registry.try_acquire(&orders, "id").is_some());
    }

    #[test]
    fn test_clones_share_leases() {
        let registry = ScanRegistry::new();
        let other = registry.clone();
        let table = TableRef::new("events");
        let _lease = registry.try_acquire(&table, "ts").unwrap();
        assert!(other.try_acquire(&table, "ts").is_none());
        assert_eq!(other.len(), 1);
    }
}
