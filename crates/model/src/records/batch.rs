use crate::{offset::token::OffsetToken, records::row::RowData};

/// Result of one poll.
#[derive(Debug, Clone)]
pub struct RowBatch {
    pub rows: Vec<RowData>, // ascending by the offset column
    pub offset: OffsetToken,   // watermark after this batch
    pub previous: OffsetToken, // watermark the poll started from
    /// Fewer rows than requested came back; the table is drained for now.
    pub reached_end: bool,
    pub ts: chrono::DateTime<chrono::Utc>,
}

impl RowBatch {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the watermark moved during this poll.
    pub fn advanced(&self) -> bool {
        self.offset != self.previous
    }

    pub fn size_bytes(&self) -> usize {
        self.rows.iter().map(|r| r.size_bytes()).sum()
    }
}
