use model::{offset::OffsetType, pagination::cursor::TiePolicy};
use planner::query::ast::common::TableRef;

/// What to scan: the table, its offset column and type, and how much to
/// read per poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    pub table: TableRef,
    pub column: String,
    pub offset_type: OffsetType,
    pub batch_size: usize,
    /// Projected columns; all columns when empty.
    pub columns: Vec<String>,
    pub tie_policy: TiePolicy,
}

impl ScanRequest {
    pub fn new(table: TableRef, column: &str, offset_type: OffsetType, batch_size: usize) -> Self {
        Self {
            table,
            column: column.to_string(),
            offset_type,
            batch_size,
            columns: Vec::new(),
            tie_policy: TiePolicy::default(),
        }
    }

    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn tie_policy(mut self, tie_policy: TiePolicy) -> Self {
        self.tie_policy = tie_policy;
        self
    }

    pub(crate) fn table_label(&self) -> String {
        self.table.to_string()
    }
}
