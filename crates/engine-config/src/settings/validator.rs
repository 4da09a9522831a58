use crate::settings::{ScanConfig, error::SettingsError};
use connectors::sql::base::adapter::DatabaseKind;
use model::offset::resolve;
use std::collections::HashSet;
use tracing::warn;

const LARGE_BATCH: usize = 100_000;

/// Checks a parsed config before any scan starts. All problems are
/// reported together.
pub struct SettingsValidator<'a> {
    config: &'a ScanConfig,
}

impl<'a> SettingsValidator<'a> {
    pub fn new(config: &'a ScanConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut errors: Vec<String> = Vec::new();

        self.validate_source(&mut errors);
        self.validate_scan(&mut errors);
        self.validate_retry(&mut errors);
        self.validate_tables(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SettingsError::ValidationFailed(errors))
        }
    }

    fn validate_source(&self, errors: &mut Vec<String>) {
        let url = self.config.source.url.trim();
        if url.is_empty() {
            errors.push("source.url is empty".into());
        } else if DatabaseKind::from_url(url).is_none() {
            errors.push("source.url must start with mysql://, postgres:// or postgresql://".into());
        }
    }

    fn validate_scan(&self, errors: &mut Vec<String>) {
        let scan = &self.config.scan;
        if scan.batch_size == 0 {
            errors.push("scan.batch_size must be greater than zero".into());
        } else if scan.batch_size > LARGE_BATCH {
            warn!(
                batch_size = scan.batch_size,
                "Batch size is very large, may cause memory issues"
            );
        }
        if scan.state_path.trim().is_empty() {
            errors.push("scan.state_path is empty".into());
        }
    }

    fn validate_retry(&self, errors: &mut Vec<String>) {
        let retry = &self.config.retry;
        if retry.max_attempts == 0 {
            errors.push("retry.max_attempts must be at least 1".into());
        }
        if retry.base_delay_ms > retry.max_delay_ms {
            errors.push(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                retry.base_delay_ms, retry.max_delay_ms
            ));
        }
    }

    fn validate_tables(&self, errors: &mut Vec<String>) {
        if self.config.tables.is_empty() {
            errors.push("no [[tables]] configured".into());
        }

        let mut seen = HashSet::new();
        for table in &self.config.tables {
            let label = table.table_ref().to_string();
            if table.name.trim().is_empty() {
                errors.push("a table has an empty name".into());
            }
            if table.offset_column.trim().is_empty() {
                errors.push(format!("{label}: offset_column is empty"));
            }
            if table.batch_size == Some(0) {
                errors.push(format!("{label}: batch_size must be greater than zero"));
            }

            // One scan per table + offset column.
            let key = (
                table.schema.as_deref().map(str::to_ascii_lowercase),
                table.name.to_ascii_lowercase(),
                table.offset_column.to_ascii_lowercase(),
            );
            if !seen.insert(key) {
                errors.push(format!(
                    "{label}: offset column '{}' is configured more than once",
                    table.offset_column
                ));
            }

            // Without a declared type the initial offset is checked once the
            // type is read from the catalog.
            if let (Some(offset_type), Some(initial)) = (table.offset_type, &table.initial_offset)
                && let Err(err) = resolve(offset_type, initial)
            {
                errors.push(format!("{label}: {err}"));
            }
        }
    }
}
