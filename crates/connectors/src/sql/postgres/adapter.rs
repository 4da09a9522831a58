use crate::sql::{
    base::{
        adapter::{DatabaseKind, SqlAdapter},
        error::{ConnectorError, DbError},
        requests::FetchRowsRequest,
        row::DbRow,
    },
    postgres::{params::PgParamStore, utils::connect_client},
};
use async_trait::async_trait;
use futures_util::{TryStreamExt, pin_mut};
use model::{
    core::{data_type::DataType, value::Value},
    records::row::RowData,
};
use planner::query::{
    ast::common::TableRef,
    dialect::{self, Dialect},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_postgres::Client;
use tracing::debug;

#[derive(Clone)]
pub struct PgAdapter {
    client: Arc<RwLock<Client>>,
    dialect: dialect::Postgres,
}

const QUERY_COLUMN_TYPE_SQL: &str = include_str!("sql/column_type.sql");

#[async_trait]
impl SqlAdapter for PgAdapter {
    async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let client = Arc::new(RwLock::new(connect_client(url).await?));
        Ok(PgAdapter {
            client,
            dialect: dialect::Postgres,
        })
    }

    async fn exec(&self, query: &str) -> Result<(), DbError> {
        let client = self.client.read().await;
        client.batch_execute(query).await?;
        Ok(())
    }

    async fn exec_params(&self, query: &str, params: Vec<Value>) -> Result<u64, DbError> {
        let client = self.client.read().await;
        let statement = client.prepare(query).await?;
        let bindings = PgParamStore::typed(params, statement.params())?;
        Ok(client.execute(&statement, &bindings.as_refs()).await?)
    }

    async fn fetch_rows(&self, request: &FetchRowsRequest) -> Result<Vec<RowData>, DbError> {
        let (sql, params) = request.render(&self.dialect);
        debug!(sql = %sql, params = params.len(), "Fetching rows");

        let client = self.client.read().await;
        let statement = client.prepare(&sql).await?;
        let bindings = PgParamStore::typed(params, statement.params())?;

        let stream = client.query_raw(&statement, bindings.as_refs()).await?;
        pin_mut!(stream);

        let table = request.table().name.as_str();
        let mut rows = Vec::with_capacity(request.plan.limit.unwrap_or_default());
        while let Some(row) = stream.try_next().await? {
            rows.push(DbRow::PostgresRow(&row).to_row_data(table)?);
        }
        Ok(rows)
    }

    async fn column_type(
        &self,
        table: &TableRef,
        column: &str,
    ) -> Result<Option<DataType>, DbError> {
        let client = self.client.read().await;
        let row = client
            .query_opt(
                QUERY_COLUMN_TYPE_SQL,
                &[&table.schema, &table.name, &column],
            )
            .await?;

        match row {
            Some(row) => {
                let type_name: String = row.try_get(0)?;
                Ok(Some(DataType::from_postgres_type(&type_name)))
            }
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), DbError> {
        let client = self.client.read().await;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }
}
