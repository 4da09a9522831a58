use crate::error::CliError;
use async_trait::async_trait;
use engine_core::{
    runner::{BatchConsumer, ConsumerError},
    state::models::StoredOffset,
};
use model::records::batch::RowBatch;
use serde::Serialize;
use std::sync::Arc;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

/// Writes every delivered row as one JSON object per line. Scans running
/// concurrently share the writer, so lines never interleave.
pub struct JsonLinesConsumer<W> {
    table: String,
    writer: Arc<Mutex<W>>,
}

impl<W> JsonLinesConsumer<W> {
    pub fn new(table: &str, writer: Arc<Mutex<W>>) -> Self {
        Self {
            table: table.to_string(),
            writer,
        }
    }
}

#[derive(Serialize)]
struct RowLine<'a> {
    table: &'a str,
    offset: &'a str,
    row: serde_json::Value,
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> BatchConsumer for JsonLinesConsumer<W> {
    async fn consume(&mut self, batch: &RowBatch) -> Result<(), ConsumerError> {
        let mut out = Vec::with_capacity(batch.size_bytes() * 2);
        for row in &batch.rows {
            let line = RowLine {
                table: &self.table,
                offset: batch.offset.as_str(),
                row: row.to_json(),
            };
            serde_json::to_writer(&mut out, &line)?;
            out.push(b'\n');
        }

        let mut writer = self.writer.lock().await;
        writer.write_all(&out).await?;
        writer.flush().await?;
        Ok(())
    }
}

pub fn print_offsets(offsets: &[StoredOffset], as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(offsets)?);
        return Ok(());
    }

    if offsets.is_empty() {
        println!("No stored offsets");
        return Ok(());
    }

    println!(
        "{:<32} {:<20} {:<10} {:>12}  {:<25} {}",
        "Table", "Column", "Type", "Rows done", "Updated", "Offset"
    );
    for entry in offsets {
        println!(
            "{:<32} {:<20} {:<10} {:>12}  {:<25} {}",
            entry.table.to_string(),
            entry.column,
            entry.offset_type.to_string(),
            entry.rows_done,
            entry.updated_at.to_rfc3339(),
            if entry.token.is_empty() { "<start>" } else { &entry.token }
        );
    }
    Ok(())
}
