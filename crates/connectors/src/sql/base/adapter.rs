use crate::sql::base::{
    error::{ConnectorError, DbError},
    requests::FetchRowsRequest,
};
use async_trait::async_trait;
use model::{
    core::{data_type::DataType, value::Value},
    records::row::RowData,
};
use planner::query::{ast::common::TableRef, dialect::Dialect};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseKind {
    MySql,
    Postgres,
    Other(String),
}

impl DatabaseKind {
    /// Picks the database kind from a connection URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let (scheme, _) = url.split_once("://")?;
        match scheme.to_ascii_lowercase().as_str() {
            "mysql" => Some(DatabaseKind::MySql),
            "postgres" | "postgresql" => Some(DatabaseKind::Postgres),
            _ => None,
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseKind::MySql => write!(f, "mysql"),
            DatabaseKind::Postgres => write!(f, "postgres"),
            DatabaseKind::Other(name) => write!(f, "{name}"),
        }
    }
}

/// The SQL capability a scanner runs its plans through.
#[async_trait]
pub trait SqlAdapter {
    async fn connect(url: &str) -> Result<Self, ConnectorError>
    where
        Self: Sized;

    // Exec / Params
    async fn exec(&self, query: &str) -> Result<(), DbError>;
    async fn exec_params(&self, query: &str, params: Vec<Value>) -> Result<u64, DbError>;

    /// Runs the request's plan and returns every row it selects, in
    /// database order. Each row carries the typed value of every
    /// projected column.
    async fn fetch_rows(&self, request: &FetchRowsRequest) -> Result<Vec<RowData>, DbError>;

    // Introspection

    /// Catalog type of `column`, or `None` when the table or column does
    /// not exist.
    async fn column_type(&self, table: &TableRef, column: &str)
    -> Result<Option<DataType>, DbError>;

    async fn ping(&self) -> Result<(), DbError>;

    // Dialect
    fn kind(&self) -> DatabaseKind;
    fn dialect(&self) -> &dyn Dialect;
}
