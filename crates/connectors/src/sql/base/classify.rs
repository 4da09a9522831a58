//! Sorts database failures into what a scanner may retry and what needs
//! an operator.

use crate::{
    error::AdapterError,
    sql::base::error::{ConnectorError, DbError},
};
use mysql_async::Error as MySqlError;
use tokio_postgres::{Error as PgError, error::SqlState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Safe to retry with unchanged state.
    Transient,
    /// The table or offset column is missing or has changed type.
    Schema,
    /// Anything else; retrying will not help.
    Fatal,
}

impl ErrorClass {
    pub fn is_transient(self) -> bool {
        self == ErrorClass::Transient
    }
}

pub fn classify_adapter_error(err: &AdapterError) -> ErrorClass {
    match err {
        AdapterError::Database(db_err) => classify_db_error(db_err),
        AdapterError::Connector(conn_err) => classify_connector_error(conn_err),
        AdapterError::UnsupportedScheme(_) => ErrorClass::Fatal,
    }
}

pub fn classify_db_error(err: &DbError) -> ErrorClass {
    match err {
        DbError::Io(_) | DbError::Timeout(_) => ErrorClass::Transient,
        DbError::MySqlError(mysql_err) => classify_mysql_error(mysql_err),
        DbError::PgError(pg_err) => classify_pg_error(pg_err),
        DbError::Bind(_) | DbError::Decode { .. } => ErrorClass::Schema,
        DbError::Utf8(_) | DbError::Unknown(_) => ErrorClass::Fatal,
    }
}

pub fn classify_connector_error(err: &ConnectorError) -> ErrorClass {
    match err {
        ConnectorError::MySql(mysql_err) => classify_mysql_error(mysql_err),
        ConnectorError::Connection(pg_err) => classify_pg_error(pg_err),
        ConnectorError::InvalidUrl(_) => ErrorClass::Fatal,
        ConnectorError::TlsConfig(_) => ErrorClass::Transient,
    }
}

fn classify_pg_error(err: &PgError) -> ErrorClass {
    if err.is_closed() {
        return ErrorClass::Transient;
    }

    match err.code() {
        Some(code) if is_retryable_pg_code(code) => ErrorClass::Transient,
        Some(code) if is_schema_pg_code(code) => ErrorClass::Schema,
        _ => ErrorClass::Fatal,
    }
}

fn is_retryable_pg_code(code: &SqlState) -> bool {
    matches!(
        *code,
        SqlState::T_R_SERIALIZATION_FAILURE
            | SqlState::T_R_DEADLOCK_DETECTED
            | SqlState::LOCK_NOT_AVAILABLE
            | SqlState::TOO_MANY_CONNECTIONS
            | SqlState::ADMIN_SHUTDOWN
            | SqlState::CRASH_SHUTDOWN
            | SqlState::CANNOT_CONNECT_NOW
            | SqlState::CONNECTION_FAILURE
            | SqlState::CONNECTION_DOES_NOT_EXIST
            | SqlState::SQLCLIENT_UNABLE_TO_ESTABLISH_SQLCONNECTION
            | SqlState::SQLSERVER_REJECTED_ESTABLISHMENT_OF_SQLCONNECTION
            | SqlState::CONNECTION_EXCEPTION
            | SqlState::QUERY_CANCELED
            | SqlState::OPERATOR_INTERVENTION
            | SqlState::FDW_UNABLE_TO_ESTABLISH_CONNECTION
    )
}

fn is_schema_pg_code(code: &SqlState) -> bool {
    matches!(
        *code,
        SqlState::UNDEFINED_COLUMN
            | SqlState::UNDEFINED_TABLE
            | SqlState::INVALID_SCHEMA_NAME
            | SqlState::DATATYPE_MISMATCH
            | SqlState::UNDEFINED_FUNCTION
    )
}

fn classify_mysql_error(err: &MySqlError) -> ErrorClass {
    match err {
        MySqlError::Io(_) | MySqlError::Other(_) => ErrorClass::Transient,
        MySqlError::Driver(_) => ErrorClass::Transient,
        MySqlError::Server(server_err) => {
            classify_mysql_server_error(server_err.code, server_err.state.as_str())
        }
        _ => ErrorClass::Fatal,
    }
}

fn classify_mysql_server_error(code: u16, state: &str) -> ErrorClass {
    // Lock wait timeout, deadlock, lost/refused connections, too many connections.
    // See: https://dev.mysql.com/doc/mysql-errors/8.0/en/server-error-reference.html
    const RETRYABLE_CODES: [u16; 8] = [1205, 1213, 2002, 2003, 2006, 2013, 1040, 1042];
    // Unknown database, unknown column, missing table.
    const SCHEMA_CODES: [u16; 3] = [1049, 1054, 1146];

    if RETRYABLE_CODES.contains(&code) || matches!(state, "40001" | "HYT00" | "08S01") {
        ErrorClass::Transient
    } else if SCHEMA_CODES.contains(&code) || state == "42S22" || state == "42S02" {
        ErrorClass::Schema
    } else {
        ErrorClass::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_server_codes() {
        assert_eq!(classify_mysql_server_error(1213, "40001"), ErrorClass::Transient);
        assert_eq!(classify_mysql_server_error(2013, "HY000"), ErrorClass::Transient);
        assert_eq!(classify_mysql_server_error(9999, "08S01"), ErrorClass::Transient);
        assert_eq!(classify_mysql_server_error(1054, "42S22"), ErrorClass::Schema);
        assert_eq!(classify_mysql_server_error(1146, "42S02"), ErrorClass::Schema);
        assert_eq!(classify_mysql_server_error(1064, "42000"), ErrorClass::Fatal);
    }

    #[test]
    fn test_pg_codes() {
        assert!(is_retryable_pg_code(&SqlState::T_R_DEADLOCK_DETECTED));
        assert!(is_retryable_pg_code(&SqlState::QUERY_CANCELED));
        assert!(!is_retryable_pg_code(&SqlState::UNDEFINED_COLUMN));
        assert!(is_schema_pg_code(&SqlState::UNDEFINED_COLUMN));
        assert!(is_schema_pg_code(&SqlState::UNDEFINED_TABLE));
        assert!(!is_schema_pg_code(&SqlState::SYNTAX_ERROR));
    }

    #[test]
    fn test_local_db_errors() {
        assert_eq!(classify_db_error(&DbError::Timeout(50)), ErrorClass::Transient);
        assert_eq!(
            classify_db_error(&DbError::Io(std::io::Error::other("reset"))),
            ErrorClass::Transient
        );
        assert_eq!(
            classify_db_error(&DbError::Bind("numeric as text".into())),
            ErrorClass::Schema
        );
        assert_eq!(
            classify_db_error(&DbError::Decode {
                column: "opened_at".into(),
                reason: "time out of range".into(),
            }),
            ErrorClass::Schema
        );
        assert_eq!(
            classify_db_error(&DbError::Unknown("?".into())),
            ErrorClass::Fatal
        );
        assert!(
            !classify_connector_error(&ConnectorError::InvalidUrl("x".into())).is_transient()
        );
    }
}
