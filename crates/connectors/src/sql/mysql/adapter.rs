use crate::sql::{
    base::{
        adapter::{DatabaseKind, SqlAdapter},
        error::{ConnectorError, DbError},
        requests::FetchRowsRequest,
        row::DbRow,
    },
    mysql::params::MySqlParamStore,
};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use model::{
    core::{data_type::DataType, value::Value},
    records::row::RowData,
};
use mysql_async::{Opts, OptsBuilder, Pool, Row as MySqlRow, prelude::Queryable};
use planner::query::{
    ast::common::TableRef,
    dialect::{self, Dialect},
};
use tracing::debug;

#[derive(Clone)]
pub struct MySqlAdapter {
    pool: Pool,
    dialect: dialect::MySql,
}

const QUERY_COLUMN_TYPE_SQL: &str = include_str!("sql/column_type.sql");

/// `TIMESTAMP` cells are read back as UTC.
const SESSION_INIT: &str = "SET time_zone = '+00:00'";

#[async_trait]
impl SqlAdapter for MySqlAdapter {
    async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let opts = Opts::from_url(url)?;
        let opts = OptsBuilder::from_opts(opts).init(vec![SESSION_INIT]);
        let pool = Pool::new(opts);

        // Fail fast on bad credentials instead of on the first poll.
        let conn = pool.get_conn().await?;
        drop(conn);

        Ok(MySqlAdapter {
            pool,
            dialect: dialect::MySql,
        })
    }

    async fn exec(&self, query: &str) -> Result<(), DbError> {
        let mut conn = self.pool.get_conn().await?;
        conn.query_drop(query).await?;
        Ok(())
    }

    async fn exec_params(&self, query: &str, params: Vec<Value>) -> Result<u64, DbError> {
        let mut conn = self.pool.get_conn().await?;
        conn.exec_drop(query, MySqlParamStore::from_values(&params).params())
            .await?;
        Ok(conn.affected_rows())
    }

    async fn fetch_rows(&self, request: &FetchRowsRequest) -> Result<Vec<RowData>, DbError> {
        let (sql, params) = request.render(&self.dialect);
        debug!(sql = %sql, params = params.len(), "Fetching rows");

        let table = request.table().name.as_str();
        let mut conn = self.pool.get_conn().await?;
        let mut stream = conn
            .exec_stream::<MySqlRow, _, _>(sql, MySqlParamStore::from_values(&params).params())
            .await?;

        let mut rows = Vec::with_capacity(request.plan.limit.unwrap_or_default());
        while let Some(row) = stream.try_next().await? {
            rows.push(DbRow::MySqlRow(&row).to_row_data(table)?);
        }
        Ok(rows)
    }

    async fn column_type(
        &self,
        table: &TableRef,
        column: &str,
    ) -> Result<Option<DataType>, DbError> {
        let mut conn = self.pool.get_conn().await?;
        let column_type = conn
            .exec_first::<Vec<u8>, _, _>(
                QUERY_COLUMN_TYPE_SQL,
                (table.schema.clone(), table.name.clone(), column.to_string()),
            )
            .await?;

        match column_type {
            Some(bytes) => {
                let type_name = String::from_utf8(bytes)?;
                Ok(Some(DataType::from_mysql_type(&type_name)))
            }
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), DbError> {
        let mut conn = self.pool.get_conn().await?;
        conn.ping().await?;
        Ok(())
    }

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::MySql
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }
}
