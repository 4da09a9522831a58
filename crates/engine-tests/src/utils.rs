use crate::memory::MemoryAdapter;
use async_trait::async_trait;
use engine_core::{
    runner::{BatchConsumer, ConsumerError},
    scanner::{IncrementalScanner, ScanHandle, ScannerOptions},
};
use model::{
    core::{data_type::DataType, value::Value},
    offset::{OffsetType, SeededGenerator, generate_unique},
    records::{batch::RowBatch, row::RowData},
};
use std::sync::{Arc, Mutex};

/// Name of the offset column in seeded tables.
pub const OFFSET_COLUMN: &str = "k";
/// Insertion sequence number carried by every seeded row.
pub const SEQ_COLUMN: &str = "seq";

pub fn data_type_for(offset_type: OffsetType) -> DataType {
    match offset_type {
        OffsetType::Short => DataType::Short,
        OffsetType::Integer => DataType::Int,
        OffsetType::Long => DataType::Long,
        OffsetType::Float => DataType::Float,
        OffsetType::Double => DataType::Double,
        OffsetType::Decimal => DataType::Decimal,
        OffsetType::String => DataType::VarChar,
        OffsetType::Char => DataType::Char,
        OffsetType::Date => DataType::Date,
        OffsetType::Time => DataType::Time,
        OffsetType::DateTime => DataType::Timestamp,
    }
}

/// Creates `table (k <offset_type>, seq bigint)` holding `values` in the
/// given insertion order.
pub fn seed_table(adapter: &MemoryAdapter, table: &str, offset_type: OffsetType, values: &[Value]) {
    adapter.create_table(
        table,
        &[
            (OFFSET_COLUMN, data_type_for(offset_type)),
            (SEQ_COLUMN, DataType::Long),
        ],
    );
    for value in values {
        append_row(adapter, table, value.clone());
    }
}

/// Appends one row; its `seq` is the current row count.
pub fn append_row(adapter: &MemoryAdapter, table: &str, value: Value) {
    let seq = adapter.row_count(table) as i64;
    adapter.insert(table, vec![value, Value::Int(seq)]);
}

pub fn seeded_values(offset_type: OffsetType, seed: u64, count: usize) -> Vec<Value> {
    let mut generator = SeededGenerator::new(offset_type, seed);
    generate_unique(&mut generator, count).expect("distinct values")
}

pub fn scanner(adapter: &MemoryAdapter) -> IncrementalScanner {
    IncrementalScanner::new(
        Arc::new(adapter.clone()),
        ScannerOptions {
            verify_schema: true,
            query_timeout: None,
        },
    )
}

pub fn seqs(rows: &[RowData]) -> Vec<i64> {
    rows.iter()
        .filter_map(|row| row.get_value(SEQ_COLUMN).as_i64())
        .collect()
}

pub fn offsets(rows: &[RowData]) -> Vec<Value> {
    rows.iter().map(|row| row.get_value(OFFSET_COLUMN)).collect()
}

/// Polls until a batch reaches the end of the table.
pub async fn drain(handle: &mut ScanHandle) -> Vec<RowData> {
    let mut rows = Vec::new();
    loop {
        let batch = handle.poll().await.expect("poll");
        rows.extend(batch.rows);
        if batch.reached_end {
            return rows;
        }
    }
}

/// Keeps every batch it is handed.
#[derive(Debug, Clone, Default)]
pub struct CollectingConsumer {
    batches: Arc<Mutex<Vec<RowBatch>>>,
}

impl CollectingConsumer {
    pub fn batches(&self) -> Vec<RowBatch> {
        self.batches.lock().expect("consumer lock").clone()
    }

    pub fn rows(&self) -> Vec<RowData> {
        self.batches().into_iter().flat_map(|b| b.rows).collect()
    }
}

#[async_trait]
impl BatchConsumer for CollectingConsumer {
    async fn consume(&mut self, batch: &RowBatch) -> Result<(), ConsumerError> {
        self.batches.lock().expect("consumer lock").push(batch.clone());
        Ok(())
    }
}

/// Rejects every batch.
pub struct FailingConsumer;

#[async_trait]
impl BatchConsumer for FailingConsumer {
    async fn consume(&mut self, _batch: &RowBatch) -> Result<(), ConsumerError> {
        Err("sink unavailable".into())
    }
}
