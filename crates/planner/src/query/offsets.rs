//! Builds the query that selects the next batch after an offset token.
//!
//! A plan is `WHERE col > $1 ORDER BY col ASC LIMIT n`, or
//! `WHERE col IS NOT NULL ...` from the start token. Rows whose offset is
//! NULL can never be represented by a token and are never selected.

use crate::query::{
    ast::{
        common::{OrderDir, TableRef},
        expr::{BinaryOperator, Expr},
        select::{OrderByExpr, Select},
    },
    builder::select::SelectBuilder,
    dialect::Dialect,
    ident,
    renderer::render,
    value,
};
use model::{
    core::value::Value,
    offset::{OffsetError, OffsetToken, OffsetType, codec},
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Invalid scan request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Offset(#[from] OffsetError),
}

/// Predicate, ordering and bound for one query against the offset column.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPlan {
    pub table: TableRef,
    pub column: String,
    pub offset_type: OffsetType,
    pub predicate: Expr,
    pub order_by: Vec<OrderByExpr>,
    /// `None` for boundary plans, which fetch a whole tie group.
    pub limit: Option<usize>,
}

/// Plans the next batch strictly after `last`.
pub fn plan(
    table: &TableRef,
    column: &str,
    offset_type: OffsetType,
    last: &OffsetToken,
    batch_size: usize,
) -> Result<ScanPlan, PlanError> {
    validate(table, column)?;
    if batch_size == 0 {
        return Err(PlanError::InvalidRequest(
            "batch size must be greater than zero".into(),
        ));
    }

    let predicate = match codec::decode(offset_type, last)? {
        Some(bound) => Expr::binary(ident(column), BinaryOperator::Gt, value(bound)),
        None => Expr::is_not_null(ident(column)),
    };

    Ok(ScanPlan {
        table: table.clone(),
        column: column.to_string(),
        offset_type,
        predicate,
        order_by: ascending(column),
        limit: Some(batch_size),
    })
}

/// Plans the query for every row whose offset equals `boundary`.
pub fn plan_boundary(
    table: &TableRef,
    column: &str,
    offset_type: OffsetType,
    boundary: &Value,
) -> Result<ScanPlan, PlanError> {
    validate(table, column)?;
    let boundary = codec::normalize(offset_type, boundary)?;

    Ok(ScanPlan {
        table: table.clone(),
        column: column.to_string(),
        offset_type,
        predicate: Expr::binary(ident(column), BinaryOperator::Eq, value(boundary)),
        order_by: ascending(column),
        limit: None,
    })
}

impl ScanPlan {
    /// The lower bound the plan filters on, if any.
    pub fn bound(&self) -> Option<&Value> {
        self.predicate.params().into_iter().next()
    }

    pub fn is_boundary(&self) -> bool {
        matches!(
            &self.predicate,
            Expr::BinaryOp(op) if op.op == BinaryOperator::Eq
        )
    }

    /// Projects `columns` (all columns when empty). The offset column is
    /// always part of the projection.
    pub fn select(&self, columns: &[String]) -> Select {
        let projection = if columns.is_empty() {
            vec![Expr::Wildcard]
        } else {
            let mut projection: Vec<Expr> = columns.iter().map(|c| ident(c)).collect();
            if !columns.iter().any(|c| c.eq_ignore_ascii_case(&self.column)) {
                projection.insert(0, ident(&self.column));
            }
            projection
        };

        let mut builder = SelectBuilder::new()
            .select(projection)
            .from(self.table.clone(), None)
            .where_clause(self.predicate.clone());
        for order in &self.order_by {
            builder = builder.order_by(order.expr.clone(), order.direction);
        }
        if let Some(limit) = self.limit {
            builder = builder.limit(value(Value::Int(limit as i64)));
        }
        builder.build()
    }

    pub fn render(&self, columns: &[String], dialect: &dyn Dialect) -> (String, Vec<Value>) {
        render(&self.select(columns), dialect)
    }
}

fn validate(table: &TableRef, column: &str) -> Result<(), PlanError> {
    if table.name.trim().is_empty() {
        return Err(PlanError::InvalidRequest("table name is empty".into()));
    }
    if column.trim().is_empty() {
        return Err(PlanError::InvalidRequest(format!(
            "offset column for table {table} is empty"
        )));
    }
    Ok(())
}

fn ascending(column: &str) -> Vec<OrderByExpr> {
    vec![OrderByExpr {
        expr: ident(column),
        direction: Some(OrderDir::Asc),
    }]
}
