use std::string::FromUtf8Error;
use thiserror::Error;

/// All errors coming from the database/query layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Low‐level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MySQL error: {0}")]
    MySqlError(#[from] mysql_async::Error),

    #[error("Postgres error: {0}")]
    PgError(#[from] tokio_postgres::Error),

    /// UTF-8 decoding failed on some byte data.
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] FromUtf8Error),

    /// A parameter could not be bound to the placeholder type the
    /// database inferred for it.
    #[error("Cannot bind parameter: {0}")]
    Bind(String),

    /// A cell came back in a form its column type cannot be read as.
    #[error("Cannot decode column '{column}': {reason}")]
    Decode { column: String, reason: String },

    /// The query did not finish within the configured timeout.
    #[error("Query timed out after {0} ms")]
    Timeout(u64),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Errors happening during adapter or connection setup.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("MySQL connector creation failed: {0}")]
    MySql(#[from] mysql_async::Error),

    #[error("Postgres connection failed: {0}")]
    Connection(#[from] tokio_postgres::Error),

    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("TLS configuration failed: {0}")]
    TlsConfig(#[from] native_tls::Error),
}

impl From<mysql_async::UrlError> for ConnectorError {
    fn from(err: mysql_async::UrlError) -> Self {
        ConnectorError::InvalidUrl(err.to_string())
    }
}
