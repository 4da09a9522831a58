use crate::{error::CliError, output::JsonLinesConsumer};
use connectors::{adapter::Adapter, sql::base::classify::classify_adapter_error};
use engine_config::settings::{ScanConfig, ScanSettings, TableSettings};
use engine_core::{
    metrics::ScanMetrics,
    retry::{RetryError, RetryPolicy},
    runner::{ScanRunner, open_scan},
    scanner::{IncrementalScanner, ScanRequest, ScannerOptions},
    state::{OffsetStore, sled_store::SledOffsetStore},
};
use futures_util::future::join_all;
use model::offset::OffsetType;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Scans every configured table (or just `table`) concurrently until
/// cancelled, or until each is drained when `once` is set.
pub async fn run(
    config_path: &str,
    table: Option<&str>,
    once: bool,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let mut config = ScanConfig::from_file(config_path)?;
    config.retain_table(table)?;
    let retry = RetryPolicy::from_settings(&config.retry);

    let adapter = retry
        .run(
            || Adapter::connect(&config.source.url),
            |err| classify_adapter_error(err).into(),
        )
        .await
        .map_err(RetryError::into_inner)?;

    let metrics = ScanMetrics::new();
    let scanner = IncrementalScanner::new(
        adapter.into_shared(),
        ScannerOptions {
            verify_schema: config.scan.verify_schema,
            query_timeout: config.scan.query_timeout(),
        },
    )
    .with_cancellation(cancel.clone())
    .with_metrics(metrics.clone());
    let store: Arc<dyn OffsetStore> = Arc::new(SledOffsetStore::open(&config.scan.state_path)?);
    let stdout = Arc::new(Mutex::new(tokio::io::stdout()));

    // open every scan before starting any, so a bad table fails the run up front
    let mut runners = Vec::with_capacity(config.tables.len());
    for table in &config.tables {
        let offset_type = match table.offset_type {
            Some(offset_type) => offset_type,
            None => {
                let inferred = scanner
                    .infer_offset_type(&table.table_ref(), &table.offset_column)
                    .await?;
                info!(table = %table.name, column = %table.offset_column, offset_type = %inferred, "Inferred offset type");
                inferred
            }
        };

        let request = scan_request(table, &config.scan, offset_type);
        let (handle, rows_done) = open_scan(
            &scanner,
            Some(&*store),
            request,
            table.initial_offset.as_deref(),
        )
        .await?;

        let runner = ScanRunner::new(handle, JsonLinesConsumer::new(&table.name, stdout.clone()))
            .with_store(store.clone())
            .with_retry(retry.clone())
            .with_poll_interval(config.scan.poll_interval())
            .once(once)
            .with_cancellation(cancel.clone())
            .with_metrics(metrics.clone())
            .with_rows_done(rows_done);
        runners.push((table.name.clone(), runner));
    }

    let total = runners.len();
    let (names, tasks): (Vec<_>, Vec<_>) = runners
        .into_iter()
        .map(|(name, runner)| (name, tokio::spawn(runner.run())))
        .unzip();

    let mut failed = 0;
    for (name, result) in names.iter().zip(join_all(tasks).await) {
        match result {
            Ok(Ok(summary)) => {
                info!(table = %name, rows = summary.rows, offset = %summary.offset, "Table scan finished");
            }
            Ok(Err(err)) => {
                failed += 1;
                error!(table = %name, "{err}");
            }
            Err(err) => {
                failed += 1;
                error!(table = %name, "Scan task panicked: {err}");
            }
        }
    }

    info!(metrics = %metrics.snapshot(), "Scan summary");
    if failed > 0 {
        return Err(CliError::ScansFailed(failed, total));
    }
    Ok(())
}

pub fn scan_request(table: &TableSettings, scan: &ScanSettings, offset_type: OffsetType) -> ScanRequest {
    ScanRequest::new(
        table.table_ref(),
        &table.offset_column,
        offset_type,
        table.batch_size(scan),
    )
    .columns(table.columns.clone())
    .tie_policy(table.tie_policy(scan))
}
