use crate::{
    error::AdapterError,
    sql::{
        base::adapter::{DatabaseKind, SqlAdapter},
        mysql::adapter::MySqlAdapter,
        postgres::adapter::PgAdapter,
    },
};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub enum Adapter {
    MySql(MySqlAdapter),
    Postgres(PgAdapter),
}

impl Adapter {
    /// Connects to the database named by the URL scheme
    /// (`mysql://`, `postgres://` or `postgresql://`).
    pub async fn connect(url: &str) -> Result<Self, AdapterError> {
        let kind = DatabaseKind::from_url(url)
            .ok_or_else(|| AdapterError::UnsupportedScheme(scheme(url).to_string()))?;

        let adapter = match &kind {
            DatabaseKind::MySql => Adapter::MySql(MySqlAdapter::connect(url).await?),
            DatabaseKind::Postgres => Adapter::Postgres(PgAdapter::connect(url).await?),
            DatabaseKind::Other(name) => return Err(AdapterError::UnsupportedScheme(name.clone())),
        };
        info!(database = %kind, "Connected to source database");
        Ok(adapter)
    }

    pub fn get_sql(&self) -> &(dyn SqlAdapter + Send + Sync) {
        match self {
            Adapter::MySql(adapter) => adapter,
            Adapter::Postgres(adapter) => adapter,
        }
    }

    /// Hands the adapter out as a shared capability for scanners.
    pub fn into_shared(self) -> Arc<dyn SqlAdapter + Send + Sync> {
        match self {
            Adapter::MySql(adapter) => Arc::new(adapter),
            Adapter::Postgres(adapter) => Arc::new(adapter),
        }
    }
}

fn scheme(url: &str) -> &str {
    url.split_once("://").map(|(scheme, _)| scheme).unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_scheme_is_rejected_before_connecting() {
        let err = Adapter::connect("sqlite://local.db").await.err().unwrap();
        assert!(matches!(err, AdapterError::UnsupportedScheme(ref s) if s == "sqlite"));
    }
}
