use planner::query::{
    ast::common::TableRef,
    dialect::Dialect,
    offsets::ScanPlan,
};
use model::core::value::Value;

/// One planned read of a table: the plan plus the columns to project.
#[derive(Debug, Clone)]
pub struct FetchRowsRequest {
    pub plan: ScanPlan,
    pub columns: Vec<String>,
}

impl FetchRowsRequest {
    pub fn table(&self) -> &TableRef {
        &self.plan.table
    }

    /// Renders the parameterized SELECT for `dialect`.
    pub fn render(&self, dialect: &dyn Dialect) -> (String, Vec<Value>) {
        self.plan.render(&self.columns, dialect)
    }
}

pub struct FetchRowsRequestBuilder {
    plan: ScanPlan,
    columns: Vec<String>,
}

impl FetchRowsRequestBuilder {
    pub fn new(plan: ScanPlan) -> Self {
        FetchRowsRequestBuilder {
            plan,
            columns: Vec::new(),
        }
    }

    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn build(self) -> FetchRowsRequest {
        FetchRowsRequest {
            plan: self.plan,
            columns: self.columns,
        }
    }
}
