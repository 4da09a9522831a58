//! Poll-based incremental scanning over an ordered offset column.
//!
//! A scan moves `Idle -> Querying -> Delivering -> Idle` once per poll and
//! ends in `Closed`. The cursor only moves after a batch has been fully
//! assembled, so a failed or abandoned poll can simply be repeated.

use crate::{error::ScanError, metrics::ScanMetrics};
use connectors::sql::base::adapter::SqlAdapter;
use model::{
    core::data_type::DataType,
    offset::{OffsetToken, OffsetType, codec, resolve},
    pagination::cursor::ScanCursor,
};
use planner::query::ast::common::TableRef;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub mod handle;
pub mod registry;
pub mod request;
pub mod state;

pub use handle::ScanHandle;
pub use registry::{ScanLease, ScanRegistry};
pub use request::ScanRequest;
pub use state::ScanState;

#[derive(Debug, Clone, PartialEq)]
pub struct ScannerOptions {
    /// Check the offset column against the catalog before a scan starts.
    pub verify_schema: bool,
    pub query_timeout: Option<Duration>,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            verify_schema: true,
            query_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Opens scans against one database. Clones share the adapter, the lease
/// registry and the cancellation token.
#[derive(Clone)]
pub struct IncrementalScanner {
    adapter: Arc<dyn SqlAdapter + Send + Sync>,
    registry: ScanRegistry,
    options: ScannerOptions,
    cancel: CancellationToken,
    metrics: ScanMetrics,
}

impl IncrementalScanner {
    pub fn new(adapter: Arc<dyn SqlAdapter + Send + Sync>, options: ScannerOptions) -> Self {
        Self {
            adapter,
            registry: ScanRegistry::new(),
            options,
            cancel: CancellationToken::new(),
            metrics: ScanMetrics::new(),
        }
    }

    /// Handles opened afterwards stop at their next poll once `cancel`
    /// fires, aborting an in-flight query.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_metrics(mut self, metrics: ScanMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    pub fn registry(&self) -> &ScanRegistry {
        &self.registry
    }

    /// Starts a scan from `initial_offset`, or from the beginning of the
    /// table when none is given.
    pub async fn start_scan(
        &self,
        request: ScanRequest,
        initial_offset: Option<&str>,
    ) -> Result<ScanHandle, ScanError> {
        let lease = self.acquire(&request)?;
        validate_request(&request)?;

        let token = match initial_offset {
            Some(text) => resolve(request.offset_type, text).map_err(|source| {
                ScanError::InvalidInitialOffset {
                    table: request.table_label(),
                    column: request.column.clone(),
                    source,
                }
            })?,
            None => OffsetToken::Start,
        };

        self.open(request, token, lease).await
    }

    /// Continues a scan from a token an earlier scan emitted.
    pub async fn resume_scan(
        &self,
        request: ScanRequest,
        token: OffsetToken,
    ) -> Result<ScanHandle, ScanError> {
        let lease = self.acquire(&request)?;
        validate_request(&request)?;

        codec::decode(request.offset_type, &token).map_err(|source| {
            ScanError::MalformedOffset {
                table: request.table_label(),
                column: request.column.clone(),
                source,
            }
        })?;

        self.open(request, token, lease).await
    }

    pub fn close_scan(&self, mut handle: ScanHandle) {
        handle.close();
    }

    /// Reads the offset type of `column` from the catalog.
    pub async fn infer_offset_type(
        &self,
        table: &TableRef,
        column: &str,
    ) -> Result<OffsetType, ScanError> {
        let data_type = self.catalog_type(table, column).await?;
        OffsetType::from_data_type(&data_type).map_err(|source| ScanError::UnsupportedOffsetType {
            table: table.to_string(),
            column: column.to_string(),
            source,
        })
    }

    fn acquire(&self, request: &ScanRequest) -> Result<ScanLease, ScanError> {
        self.registry
            .try_acquire(&request.table, &request.column)
            .ok_or_else(|| ScanError::AlreadyScanning {
                table: request.table_label(),
                column: request.column.clone(),
            })
    }

    async fn open(
        &self,
        request: ScanRequest,
        token: OffsetToken,
        lease: ScanLease,
    ) -> Result<ScanHandle, ScanError> {
        if self.options.verify_schema {
            self.verify_column(&request).await?;
        }

        info!(
            table = %request.table,
            column = %request.column,
            offset_type = %request.offset_type,
            offset = %token,
            batch_size = request.batch_size,
            tie_policy = %request.tie_policy,
            "Scan opened"
        );

        let cursor = ScanCursor::new(token, request.batch_size);
        Ok(ScanHandle::new(
            request,
            cursor,
            Arc::clone(&self.adapter),
            self.options.clone(),
            self.cancel.child_token(),
            self.metrics.clone(),
            lease,
        ))
    }

    async fn verify_column(&self, request: &ScanRequest) -> Result<(), ScanError> {
        let data_type = self.catalog_type(&request.table, &request.column).await?;

        if let Err(source) = OffsetType::from_data_type(&data_type) {
            return Err(ScanError::UnsupportedOffsetType {
                table: request.table_label(),
                column: request.column.clone(),
                source,
            });
        }
        if !request.offset_type.matches_data_type(&data_type) {
            return Err(ScanError::schema(
                &request.table_label(),
                &request.column,
                format!(
                    "type changed: column is {data_type}, scan expects {}",
                    request.offset_type
                ),
            ));
        }

        debug!(table = %request.table, column = %request.column, %data_type, "Offset column verified");
        Ok(())
    }

    async fn catalog_type(&self, table: &TableRef, column: &str) -> Result<DataType, ScanError> {
        match self.adapter.column_type(table, column).await {
            Ok(Some(data_type)) => Ok(data_type),
            Ok(None) => Err(ScanError::schema(
                &table.to_string(),
                column,
                "offset column not found",
            )),
            Err(err) => Err(ScanError::from_query(&table.to_string(), column, err)),
        }
    }
}

fn validate_request(request: &ScanRequest) -> Result<(), ScanError> {
    let invalid = |reason: &str| ScanError::InvalidRequest {
        table: request.table_label(),
        column: request.column.clone(),
        reason: reason.to_string(),
    };

    if request.table.name.trim().is_empty() {
        return Err(invalid("table name is empty"));
    }
    if request.column.trim().is_empty() {
        return Err(invalid("offset column is empty"));
    }
    if request.batch_size == 0 {
        return Err(invalid("batch size must be greater than zero"));
    }
    Ok(())
}
