//! Drives a scan handle until the table is drained or the scan is stopped.

use crate::{
    error::{RunError, ScanError},
    metrics::ScanMetrics,
    retry::RetryPolicy,
    scanner::{IncrementalScanner, ScanHandle, ScanRequest},
    state::{
        OffsetStore,
        models::{SaveOutcome, StoredOffset},
    },
};
use async_trait::async_trait;
use model::{offset::OffsetToken, records::batch::RowBatch};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub type ConsumerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives every non-empty batch, in order, before its token is persisted.
#[async_trait]
pub trait BatchConsumer: Send {
    async fn consume(&mut self, batch: &RowBatch) -> Result<(), ConsumerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub rows: u64,
    pub offset: OffsetToken,
}

pub struct ScanRunner<C: BatchConsumer> {
    handle: ScanHandle,
    consumer: C,
    store: Option<Arc<dyn OffsetStore>>,
    retry: RetryPolicy,
    poll_interval: Duration,
    once: bool,
    cancel: CancellationToken,
    metrics: ScanMetrics,
    rows_done: u64,
}

impl<C: BatchConsumer> ScanRunner<C> {
    pub fn new(handle: ScanHandle, consumer: C) -> Self {
        Self {
            handle,
            consumer,
            store: None,
            retry: RetryPolicy::default(),
            poll_interval: Duration::from_secs(1),
            once: false,
            cancel: CancellationToken::new(),
            metrics: ScanMetrics::new(),
            rows_done: 0,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn OffsetStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Stop after the first batch that reaches the end of the table.
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_metrics(mut self, metrics: ScanMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Row count carried over from an earlier run.
    pub fn with_rows_done(mut self, rows_done: u64) -> Self {
        self.rows_done = rows_done;
        self
    }

    pub async fn run(mut self) -> Result<RunSummary, RunError> {
        let mut attempt = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let batch = match self.handle.poll().await {
                Ok(batch) => {
                    attempt = 0;
                    batch
                }
                Err(ScanError::Cancelled { .. }) => break,
                Err(err) if err.is_transient() && attempt + 1 < self.retry.max_attempts => {
                    let delay = self.retry.backoff_delay(attempt);
                    attempt += 1;
                    self.metrics.increment_retries();
                    warn!(
                        table = %err.table(),
                        column = %err.column(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying poll: {err}"
                    );
                    if !pause(&self.cancel, delay).await {
                        break;
                    }
                    continue;
                }
                Err(err) => {
                    self.metrics.increment_failures();
                    error!(table = %err.table(), column = %err.column(), "Scan failed: {err}");
                    return Err(err.into());
                }
            };

            if !batch.is_empty() {
                self.consumer
                    .consume(&batch)
                    .await
                    .map_err(|err| RunError::Consumer(err.to_string()))?;
                self.rows_done += batch.len() as u64;
            }

            if batch.advanced()
                && let Some(store) = &self.store
            {
                persist(store.as_ref(), self.handle.request(), &batch.offset, self.rows_done)
                    .await?;
            }

            if batch.reached_end {
                if self.once {
                    break;
                }
                if !pause(&self.cancel, self.poll_interval).await {
                    break;
                }
            }
        }

        let offset = self.handle.token().clone();
        self.handle.close();
        info!(
            table = %self.handle.request().table,
            column = %self.handle.request().column,
            rows = self.rows_done,
            offset = %offset,
            "Scan stopped"
        );

        Ok(RunSummary {
            rows: self.rows_done,
            offset,
        })
    }
}

async fn persist(
    store: &dyn OffsetStore,
    request: &ScanRequest,
    token: &OffsetToken,
    rows_done: u64,
) -> Result<(), RunError> {
    let entry = StoredOffset::new(
        &request.table,
        &request.column,
        request.offset_type,
        token,
        rows_done,
    );
    match store.save(&entry).await? {
        SaveOutcome::Saved => {
            debug!(table = %request.table, column = %request.column, offset = %token, "Offset persisted");
        }
        SaveOutcome::Skipped => {
            warn!(table = %request.table, column = %request.column, offset = %token, "Stored offset is ahead of this scan; kept it");
        }
    }
    Ok(())
}

/// Sleeps unless cancelled first. Returns `false` on cancellation.
async fn pause(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Token persisted for the request's table + column, if any. An entry
/// written under a different offset type is rejected.
pub async fn load_offset(
    store: &dyn OffsetStore,
    request: &ScanRequest,
) -> Result<Option<StoredOffset>, RunError> {
    let Some(stored) = store.load(&request.table, &request.column).await? else {
        return Ok(None);
    };

    if stored.offset_type != request.offset_type {
        return Err(ScanError::schema(
            &request.table.to_string(),
            &request.column,
            format!(
                "stored offset was written for a {} column, scan expects {}; token invalidated",
                stored.offset_type, request.offset_type
            ),
        )
        .into());
    }
    Ok(Some(stored))
}

/// Resumes from the persisted token when there is one, otherwise starts
/// from `initial_offset`. Returns the handle and the row count carried over.
pub async fn open_scan(
    scanner: &IncrementalScanner,
    store: Option<&dyn OffsetStore>,
    request: ScanRequest,
    initial_offset: Option<&str>,
) -> Result<(ScanHandle, u64), RunError> {
    let stored = match store {
        Some(store) => load_offset(store, &request).await?,
        None => None,
    };

    match stored {
        Some(stored) => {
            info!(table = %request.table, column = %request.column, offset = %stored.token, "Resuming from stored offset");
            let handle = scanner.resume_scan(request, stored.token()).await?;
            Ok((handle, stored.rows_done))
        }
        None => Ok((scanner.start_scan(request, initial_offset).await?, 0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::sled_store::SledOffsetStore;
    use model::offset::OffsetType;
    use planner::query::ast::common::TableRef;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    fn request(offset_type: OffsetType) -> ScanRequest {
        ScanRequest::new(TableRef::new("orders"), "id", offset_type, 10)
    }

    #[tokio::test]
    async fn test_load_offset_without_entry() {
        let dir = TempDir::new().unwrap();
        let store = SledOffsetStore::open(dir.path()).unwrap();
        assert!(load_offset(&store, &request(OffsetType::Long)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_offset_returns_matching_entry() {
        let dir = TempDir::new().unwrap();
        let store = SledOffsetStore::open(dir.path()).unwrap();
        let entry = StoredOffset::new(
            &TableRef::new("orders"),
            "id",
            OffsetType::Long,
            &OffsetToken::at("42"),
            3,
        );
        store.save(&entry).await.unwrap();

        let loaded = load_offset(&store, &request(OffsetType::Long))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.token(), OffsetToken::at("42"));
        assert_eq!(loaded.rows_done, 3);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_type_change_invalidates_stored_token() {
        let dir = TempDir::new().unwrap();
        let store = SledOffsetStore::open(dir.path()).unwrap();
        let entry = StoredOffset::new(
            &TableRef::new("orders"),
            "id",
            OffsetType::Long,
            &OffsetToken::at("42"),
            0,
        );
        store.save(&entry).await.unwrap();

        let err = load_offset(&store, &request(OffsetType::DateTime))
            .await
            .unwrap_err();
        match err {
            RunError::Scan(ScanError::Schema { reason, .. }) => {
                assert!(reason.contains("token invalidated"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
