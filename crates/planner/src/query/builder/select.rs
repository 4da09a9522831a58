//! Provides a type-safe, fluent builder for constructing `Select` ASTs.

// --- Typestate Marker Structs ---
// These zero-sized structs represent the state of the builder.
// They ensure that methods are called in the correct SQL order at compile time.

use crate::query::ast::{
    common::{OrderDir, TableRef},
    expr::{BinaryOperator, Expr},
    select::{FromClause, OrderByExpr, Select},
};

/// The initial state of the builder before any clauses have been added.
#[derive(Debug, Default, Clone)]
pub struct InitialState;

/// The state after the `SELECT` clause has been added.
#[derive(Debug, Default, Clone)]
pub struct SelectState;

/// The state after the `FROM` clause has been added.
#[derive(Debug, Default, Clone)]
pub struct FromState;

// --- The Main Builder ---

#[derive(Debug, Clone)]
pub struct SelectBuilder<State> {
    pub(crate) ast: Select,
    #[allow(dead_code)]
    state: State,
}

impl Default for SelectBuilder<InitialState> {
    fn default() -> Self {
        Self::new()
    }
}

/// Implementation for the initial state of the builder.
impl SelectBuilder<InitialState> {
    pub fn new() -> Self {
        Self {
            ast: Select::default(),
            state: InitialState,
        }
    }

    /// Adds a `SELECT` clause with a list of columns.
    /// This is the entry point for building a select query.
    pub fn select(mut self, columns: Vec<Expr>) -> SelectBuilder<SelectState> {
        self.ast.columns = columns;
        SelectBuilder {
            ast: self.ast,
            state: SelectState,
        }
    }
}

/// Implementation for the state after `SELECT` has been called.
/// The only valid next step is to specify a `FROM` table.
impl SelectBuilder<SelectState> {
    /// Adds a `FROM` clause specifying the primary table.
    pub fn from(mut self, table: TableRef, alias: Option<&str>) -> SelectBuilder<FromState> {
        self.ast.from = Some(FromClause {
            table,
            alias: alias.map(String::from),
        });
        SelectBuilder {
            ast: self.ast,
            state: FromState,
        }
    }
}

/// Implementation for the state after `FROM` has been called.
impl SelectBuilder<FromState> {
    /// Sets the `WHERE` clause, replacing any previous condition.
    pub fn where_clause(mut self, condition: Expr) -> Self {
        self.ast.where_clause = Some(condition);
        self
    }

    /// Adds a condition, joined with `AND` to an existing `WHERE` clause.
    pub fn and_where(mut self, condition: Expr) -> Self {
        self.ast.where_clause = Some(match self.ast.where_clause.take() {
            Some(existing) => Expr::binary(existing, BinaryOperator::And, condition),
            None => condition,
        });
        self
    }

    /// Adds an `ORDER BY` clause to the query.
    pub fn order_by(mut self, expr: Expr, direction: Option<OrderDir>) -> Self {
        self.ast.order_by.push(OrderByExpr { expr, direction });
        self
    }

    /// Adds a `LIMIT` clause to the query.
    pub fn limit(mut self, limit: Expr) -> Self {
        self.ast.limit = Some(limit);
        self
    }

    /// Finalizes and returns the constructed `Select` AST.
    pub fn build(self) -> Select {
        self.ast
    }
}

#[cfg(test)]
mod tests {
    use model::core::value::Value;

    use crate::query::{
        ast::{
            common::{OrderDir, TableRef},
            expr::{BinaryOperator, Expr},
        },
        builder::select::SelectBuilder,
        ident, value,
    };

    fn table(name: &str) -> TableRef {
        TableRef::new(name)
    }

    #[test]
    fn test_build_simple_select() {
        let ast = SelectBuilder::new()
            .select(vec![ident("id"), ident("name")])
            .from(table("users"), None)
            .build();

        assert_eq!(ast.columns, vec![ident("id"), ident("name")]);
        assert_eq!(ast.from.unwrap().table.name, "users");
        assert!(ast.where_clause.is_none());
    }

    #[test]
    fn test_and_where_combines_conditions() {
        let first = Expr::is_not_null(ident("id"));
        let second = Expr::binary(ident("id"), BinaryOperator::Gt, value(Value::Int(5)));
        let ast = SelectBuilder::new()
            .select(vec![Expr::Wildcard])
            .from(table("users"), None)
            .and_where(first.clone())
            .and_where(second.clone())
            .build();

        assert_eq!(
            ast.where_clause,
            Some(Expr::binary(first, BinaryOperator::And, second))
        );
    }

    #[test]
    fn test_build_with_ordering_and_limit() {
        let ast = SelectBuilder::new()
            .select(vec![ident("id")])
            .from(table("products"), None)
            .order_by(ident("id"), Some(OrderDir::Asc))
            .limit(value(Value::Int(50)))
            .build();

        assert_eq!(ast.order_by.len(), 1);
        assert_eq!(ast.order_by[0].direction, Some(OrderDir::Asc));
        assert_eq!(ast.limit, Some(value(Value::Int(50))));
    }
}
