//! An in-memory `SqlAdapter` that evaluates scan plans the way a database
//! would, with injectable faults.

use async_trait::async_trait;
use connectors::sql::base::{
    adapter::{DatabaseKind, SqlAdapter},
    error::{ConnectorError, DbError},
    requests::FetchRowsRequest,
};
use model::{
    core::{
        data_type::DataType,
        value::{FieldValue, Value},
    },
    offset::{OffsetType, compare},
    records::row::RowData,
};
use planner::query::{
    ast::{
        common::TableRef,
        expr::{BinaryOperator, Expr},
    },
    dialect::{self, Dialect},
    offsets::ScanPlan,
};
use std::{
    cmp::Ordering,
    collections::{HashMap, VecDeque},
    io,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

/// Failure injected into the next fetch.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Connection reset; classified transient.
    Transient,
    /// Bind failure; classified as a schema error.
    Schema,
    Fatal,
    /// A cell of the named column cannot be decoded.
    Undecodable(String),
    /// Sleeps before answering, to exercise timeouts and cancellation.
    Delay(Duration),
}

/// How string offsets are ordered and matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Collation {
    /// Byte order, like `COLLATE "C"`.
    #[default]
    Binary,
    /// ASCII case folded before comparing, like MySQL's `_ci` collations.
    CaseInsensitive,
}

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    columns: Vec<(String, DataType)>,
    rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    fn position(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(column))
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, MemoryTable>,
    faults: VecDeque<Fault>,
    queries: Vec<String>,
    collation: Collation,
}

#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    inner: Arc<Mutex<Inner>>,
    dialect: dialect::Postgres,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            dialect: dialect::Postgres,
        }
    }

    pub fn create_table(&self, name: &str, columns: &[(&str, DataType)]) {
        let table = MemoryTable {
            columns: columns
                .iter()
                .map(|(name, ty)| (name.to_string(), ty.clone()))
                .collect(),
            rows: Vec::new(),
        };
        self.lock().tables.insert(name.to_ascii_lowercase(), table);
    }

    /// Appends a row given in column order.
    pub fn insert(&self, table: &str, row: Vec<Value>) {
        let mut inner = self.lock();
        let table = inner
            .tables
            .get_mut(&table.to_ascii_lowercase())
            .unwrap_or_else(|| panic!("no table {table}"));
        assert_eq!(row.len(), table.columns.len(), "row arity");
        table.rows.push(row);
    }

    pub fn with_collation(self, collation: Collation) -> Self {
        self.lock().collation = collation;
        self
    }

    pub fn inject(&self, fault: Fault) {
        self.lock().faults.push_back(fault);
    }

    /// Rendered SQL of every fetch so far.
    pub fn queries(&self) -> Vec<String> {
        self.lock().queries.clone()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.lock()
            .tables
            .get(&table.to_ascii_lowercase())
            .map_or(0, |t| t.rows.len())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn select(&self, request: &FetchRowsRequest) -> Result<Vec<RowData>, DbError> {
        let inner = self.lock();
        let plan = &request.plan;
        let table = inner
            .tables
            .get(&plan.table.name.to_ascii_lowercase())
            .ok_or_else(|| DbError::Unknown(format!("relation {} does not exist", plan.table)))?;
        let offset_idx = table
            .position(&plan.column)
            .ok_or_else(|| DbError::Bind(format!("column {} does not exist", plan.column)))?;

        let collation = inner.collation;
        let mut selected = Vec::new();
        for row in &table.rows {
            if matches_predicate(plan, collation, &row[offset_idx])? {
                selected.push(row);
            }
        }
        // stable, like an index scan over equal keys in insertion order
        selected.sort_by(|a, b| {
            collate(plan.offset_type, collation, &a[offset_idx], &b[offset_idx])
                .unwrap_or(Ordering::Equal)
        });
        if let Some(limit) = plan.limit {
            selected.truncate(limit);
        }

        let projection = projection(table, &plan.column, &request.columns)?;
        let entity = plan.table.name.clone();
        Ok(selected
            .into_iter()
            .map(|row| {
                let fields = projection
                    .iter()
                    .map(|&idx| {
                        let (name, data_type) = &table.columns[idx];
                        FieldValue {
                            name: name.clone(),
                            value: Some(&row[idx])
                                .filter(|v| !v.is_null())
                                .cloned(),
                            data_type: data_type.clone(),
                        }
                    })
                    .collect();
                RowData::new(&entity, fields)
            })
            .collect())
    }
}

/// Evaluates the plan's predicate against one offset value. NULL never
/// matches a comparison.
fn matches_predicate(plan: &ScanPlan, collation: Collation, value: &Value) -> Result<bool, DbError> {
    match &plan.predicate {
        Expr::IsNull { negated, .. } => Ok(value.is_null() != *negated),
        Expr::BinaryOp(op) => {
            let Expr::Value(bound) = &op.right else {
                return Err(DbError::Unknown("unsupported predicate".into()));
            };
            if value.is_null() {
                return Ok(false);
            }
            let ordering = collate(plan.offset_type, collation, value, bound)?;
            match op.op {
                BinaryOperator::Gt => Ok(ordering == Ordering::Greater),
                BinaryOperator::Eq => Ok(ordering == Ordering::Equal),
                other => Err(DbError::Unknown(format!("unsupported operator {other:?}"))),
            }
        }
        other => Err(DbError::Unknown(format!("unsupported predicate {other:?}"))),
    }
}

fn collate(
    offset_type: OffsetType,
    collation: Collation,
    a: &Value,
    b: &Value,
) -> Result<Ordering, DbError> {
    match (collation, a, b) {
        (Collation::CaseInsensitive, Value::String(x), Value::String(y))
            if offset_type.is_lexical() =>
        {
            Ok(x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase()))
        }
        _ => compare(offset_type, a, b).map_err(|e| DbError::Bind(e.to_string())),
    }
}

fn projection(
    table: &MemoryTable,
    offset_column: &str,
    columns: &[String],
) -> Result<Vec<usize>, DbError> {
    if columns.is_empty() {
        return Ok((0..table.columns.len()).collect());
    }
    let mut names: Vec<&str> = columns.iter().map(String::as_str).collect();
    if !names.iter().any(|c| c.eq_ignore_ascii_case(offset_column)) {
        names.insert(0, offset_column);
    }
    names
        .into_iter()
        .map(|name| {
            table
                .position(name)
                .ok_or_else(|| DbError::Bind(format!("column {name} does not exist")))
        })
        .collect()
}

#[async_trait]
impl SqlAdapter for MemoryAdapter {
    async fn connect(_url: &str) -> Result<Self, ConnectorError> {
        Ok(Self::new())
    }

    async fn exec(&self, _query: &str) -> Result<(), DbError> {
        Ok(())
    }

    async fn exec_params(&self, _query: &str, _params: Vec<Value>) -> Result<u64, DbError> {
        Ok(0)
    }

    async fn fetch_rows(&self, request: &FetchRowsRequest) -> Result<Vec<RowData>, DbError> {
        let fault = {
            let mut inner = self.lock();
            let (sql, _) = request.render(&self.dialect);
            inner.queries.push(sql);
            inner.faults.pop_front()
        };

        match fault {
            Some(Fault::Transient) => {
                return Err(DbError::Io(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                )));
            }
            Some(Fault::Schema) => {
                return Err(DbError::Bind("column type changed".into()));
            }
            Some(Fault::Fatal) => return Err(DbError::Unknown("disk full".into())),
            Some(Fault::Undecodable(column)) => {
                return Err(DbError::Decode {
                    column,
                    reason: "invalid byte sequence for encoding \"UTF8\"".into(),
                });
            }
            Some(Fault::Delay(delay)) => tokio::time::sleep(delay).await,
            None => {}
        }

        self.select(request)
    }

    async fn column_type(
        &self,
        table: &TableRef,
        column: &str,
    ) -> Result<Option<DataType>, DbError> {
        let inner = self.lock();
        Ok(inner
            .tables
            .get(&table.name.to_ascii_lowercase())
            .and_then(|t| t.position(column).map(|idx| t.columns[idx].1.clone())))
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Other("memory".into())
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }
}
