use crate::{
    error::ScanError,
    metrics::ScanMetrics,
    scanner::{ScannerOptions, registry::ScanLease, request::ScanRequest, state::ScanState},
};
use connectors::sql::base::{
    adapter::SqlAdapter, error::DbError, requests::FetchRowsRequestBuilder,
};
use model::{
    core::value::Value,
    offset::{OffsetError, OffsetToken, OffsetType, codec, compare},
    pagination::cursor::{ScanCursor, TiePolicy},
    records::{batch::RowBatch, row::RowData},
};
use planner::query::offsets::{self, PlanError, ScanPlan};
use std::{cmp::Ordering, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One open scan over a table + offset column pair.
///
/// `poll` takes `&mut self`, so a handle never has two queries in flight.
/// Dropping the handle releases its lease.
pub struct ScanHandle {
    request: ScanRequest,
    cursor: ScanCursor,
    state: ScanState,
    adapter: Arc<dyn SqlAdapter + Send + Sync>,
    options: ScannerOptions,
    cancel: CancellationToken,
    metrics: ScanMetrics,
    lease: Option<ScanLease>,
}

impl std::fmt::Debug for ScanHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanHandle")
            .field("request", &self.request)
            .field("state", &self.state)
            .field("options", &self.options)
            .field("lease", &self.lease)
            .finish_non_exhaustive()
    }
}

impl ScanHandle {
    pub(crate) fn new(
        request: ScanRequest,
        cursor: ScanCursor,
        adapter: Arc<dyn SqlAdapter + Send + Sync>,
        options: ScannerOptions,
        cancel: CancellationToken,
        metrics: ScanMetrics,
        lease: ScanLease,
    ) -> Self {
        Self {
            request,
            cursor,
            state: ScanState::Idle,
            adapter,
            options,
            cancel,
            metrics,
            lease: Some(lease),
        }
    }

    pub fn request(&self) -> &ScanRequest {
        &self.request
    }

    pub fn token(&self) -> &OffsetToken {
        &self.cursor.token
    }

    pub fn cursor(&self) -> &ScanCursor {
        &self.cursor
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Stops the handle and releases its lease. Later polls fail with
    /// [`ScanError::Closed`].
    pub fn close(&mut self) {
        if self.state.is_closed() {
            return;
        }
        self.state = ScanState::Closed;
        self.lease = None;
        debug!(table = %self.request.table, column = %self.request.column, offset = %self.cursor.token, "Scan closed");
    }

    /// Fetches the next batch after the current token.
    ///
    /// An empty batch keeps the token unchanged. On error the cursor is
    /// left where it was and the same poll can be repeated.
    pub async fn poll(&mut self) -> Result<RowBatch, ScanError> {
        if self.state.is_closed() {
            return Err(ScanError::Closed {
                table: self.table(),
                column: self.request.column.clone(),
            });
        }
        if self.cancel.is_cancelled() {
            return Err(self.cancelled());
        }

        // a poll whose future was dropped leaves Querying behind
        self.state = ScanState::Idle;
        let previous = self.cursor.token.clone();
        let batch_size = self.cursor.batch_size;

        let plan = offsets::plan(
            &self.request.table,
            &self.request.column,
            self.request.offset_type,
            &previous,
            batch_size,
        )
        .map_err(|err| self.plan_error(err))?;

        self.state = ScanState::Querying;
        let fetched = match self.fetch_validated(plan).await {
            Ok(rows) => rows,
            Err(err) => {
                self.state = ScanState::Idle;
                return Err(err);
            }
        };
        let reached_end = fetched.len() < batch_size;

        let rows = match self.request.tie_policy {
            TiePolicy::CompleteGroup if !reached_end => match self.complete_group(fetched).await {
                Ok(rows) => rows,
                Err(err) => {
                    self.state = ScanState::Idle;
                    return Err(err);
                }
            },
            TiePolicy::Exclusive if !reached_end => {
                self.warn_on_split_group(&fetched);
                fetched
            }
            _ => fetched,
        };

        self.state = ScanState::Delivering;
        let values: Vec<&Value> = rows.iter().map(|(_, value)| value).collect();
        let offset = next_token(self.request.offset_type, &previous, &values)
            .map_err(|err| self.schema_error(format!("cannot encode offset value: {err}")))?;
        let rows: Vec<RowData> = rows.into_iter().map(|(row, _)| row).collect();

        self.metrics.record_poll(rows.len());
        debug!(
            table = %self.request.table,
            column = %self.request.column,
            rows = rows.len(),
            offset = %offset,
            reached_end,
            "Poll complete"
        );

        self.cursor = self.cursor.advance(offset.clone());
        self.state = ScanState::Idle;

        Ok(RowBatch {
            rows,
            offset,
            previous,
            reached_end,
            ts: chrono::Utc::now(),
        })
    }

    /// Replaces the trailing rows that share the batch's last value with
    /// the complete set of rows carrying that value.
    async fn complete_group(
        &self,
        mut rows: Vec<(RowData, Value)>,
    ) -> Result<Vec<(RowData, Value)>, ScanError> {
        let Some((_, boundary)) = rows.last() else {
            return Ok(rows);
        };
        let boundary = boundary.clone();

        let keep = trailing_group_start(self.request.offset_type, &rows, &boundary)
            .map_err(|err| self.schema_error(err.to_string()))?;
        rows.truncate(keep);

        let plan = offsets::plan_boundary(
            &self.request.table,
            &self.request.column,
            self.request.offset_type,
            &boundary,
        )
        .map_err(|err| self.plan_error(err))?;

        let group = self.fetch_validated(plan).await?;
        self.metrics.increment_boundary_queries();
        debug!(
            table = %self.request.table,
            column = %self.request.column,
            group = group.len(),
            "Completed boundary group"
        );

        rows.extend(group);
        Ok(rows)
    }

    fn warn_on_split_group(&self, rows: &[(RowData, Value)]) {
        if let [.., (_, a), (_, b)] = rows
            && matches!(compare(self.request.offset_type, a, b), Ok(Ordering::Equal))
        {
            warn!(
                table = %self.request.table,
                column = %self.request.column,
                value = %b,
                "Batch ends inside a group of equal offset values; the rest of the group will be skipped"
            );
        }
    }

    async fn fetch_validated(&self, plan: ScanPlan) -> Result<Vec<(RowData, Value)>, ScanError> {
        let rows = self.fetch(plan).await?;
        rows.into_iter()
            .map(|row| {
                let value = self.offset_value(&row)?;
                Ok((row, value))
            })
            .collect()
    }

    async fn fetch(&self, plan: ScanPlan) -> Result<Vec<RowData>, ScanError> {
        let request = FetchRowsRequestBuilder::new(plan)
            .columns(self.request.columns.clone())
            .build();
        let query = self.adapter.fetch_rows(&request);

        let result = match self.options.query_timeout {
            Some(limit) => tokio::select! {
                _ = self.cancel.cancelled() => return Err(self.cancelled()),
                res = tokio::time::timeout(limit, query) => {
                    res.unwrap_or_else(|_| Err(DbError::Timeout(limit.as_millis() as u64)))
                }
            },
            None => tokio::select! {
                _ = self.cancel.cancelled() => return Err(self.cancelled()),
                res = query => res,
            },
        };

        result.map_err(|err| ScanError::from_query(&self.table(), &self.request.column, err))
    }

    /// Reads and normalizes the offset column of a fetched row.
    fn offset_value(&self, row: &RowData) -> Result<Value, ScanError> {
        let field = row
            .get(&self.request.column)
            .ok_or_else(|| self.schema_error("offset column missing from result row"))?;

        match &field.value {
            None | Some(Value::Null) => Err(self.schema_error("offset column is NULL")),
            Some(value) => codec::normalize(self.request.offset_type, value)
                .map_err(|err| self.schema_error(format!("type changed: {err}"))),
        }
    }

    fn table(&self) -> String {
        self.request.table_label()
    }

    fn cancelled(&self) -> ScanError {
        ScanError::Cancelled {
            table: self.table(),
            column: self.request.column.clone(),
        }
    }

    fn schema_error(&self, reason: impl Into<String>) -> ScanError {
        ScanError::schema(&self.table(), &self.request.column, reason)
    }

    fn plan_error(&self, err: PlanError) -> ScanError {
        let (table, column) = (self.table(), self.request.column.clone());
        match err {
            PlanError::Offset(source) => ScanError::MalformedOffset {
                table,
                column,
                source,
            },
            PlanError::InvalidRequest(reason) => ScanError::InvalidRequest {
                table,
                column,
                reason,
            },
        }
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Token after delivering `values`. Lexical types take the last row since
/// their order belongs to the database collation; everything else takes
/// the maximum.
fn next_token(
    offset_type: OffsetType,
    previous: &OffsetToken,
    values: &[&Value],
) -> Result<OffsetToken, OffsetError> {
    let newest = if offset_type.is_lexical() {
        values.last().copied()
    } else {
        let mut max: Option<&Value> = None;
        for value in values {
            max = match max {
                Some(current) if compare(offset_type, current, value)? != Ordering::Less => {
                    Some(current)
                }
                _ => Some(value),
            };
        }
        max
    };

    match newest {
        Some(value) => codec::encode(offset_type, value),
        None => Ok(previous.clone()),
    }
}

/// Index of the first row in the trailing run equal to `boundary`.
fn trailing_group_start(
    offset_type: OffsetType,
    rows: &[(RowData, Value)],
    boundary: &Value,
) -> Result<usize, OffsetError> {
    let mut start = rows.len();
    while start > 0 {
        if compare(offset_type, &rows[start - 1].1, boundary)? != Ordering::Equal {
            break;
        }
        start -= 1;
    }
    Ok(start)
}
