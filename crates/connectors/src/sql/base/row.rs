use crate::sql::{
    base::error::DbError, mysql::data_type::column_data_type, postgres::numeric::PgNumeric,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use model::{
    core::{
        data_type::DataType,
        value::{FieldValue, Value},
    },
    records::row::RowData,
};
use mysql_async::{Row as MySqlRow, prelude::FromValue};
use tokio_postgres::{
    Row as PgRow,
    types::{FromSql, FromSqlOwned, Json as PgJson},
};
use uuid::Uuid;

/// A driver row, read column by column into [`Value`]s.
///
/// A NULL cell reads as `None`. A cell whose bytes do not decode as the
/// column's type is a [`DbError::Decode`]. Postgres types with no text
/// reading (`inet`, ranges, arrays) project as NULL.
pub enum DbRow<'a> {
    MySqlRow(&'a MySqlRow),
    PostgresRow(&'a PgRow),
}

impl DbRow<'_> {
    pub fn to_row_data(&self, table: &str) -> Result<RowData, DbError> {
        let columns = (0..self.len())
            .map(|idx| {
                let data_type = self.column_type(idx);
                Ok(FieldValue {
                    name: self.column_name(idx),
                    value: self.get_value(&data_type, idx)?,
                    data_type,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(RowData::new(table, columns))
    }

    pub fn get_value(&self, data_type: &DataType, idx: usize) -> Result<Option<Value>, DbError> {
        let value = match data_type {
            DataType::Short => self.try_get::<i16>(idx)?.map(Value::SmallInt),
            DataType::ShortUnsigned | DataType::Int | DataType::Year => {
                self.try_get::<i32>(idx)?.map(Value::Int32)
            }
            DataType::IntUnsigned | DataType::Long => self.try_get::<i64>(idx)?.map(Value::Int),
            DataType::LongLong => self.try_get_u64(idx)?.map(Value::Uint),
            DataType::Float => self.try_get::<f32>(idx)?.map(Value::Float32),
            DataType::Double => self.try_get::<f64>(idx)?.map(Value::Float),
            DataType::Decimal => self.try_get_bigdecimal(idx)?.map(Value::Decimal),
            DataType::String | DataType::VarChar | DataType::Char | DataType::Enum => {
                self.try_get::<String>(idx)?.map(Value::String)
            }
            DataType::Boolean => self.try_get::<bool>(idx)?.map(Value::Boolean),
            DataType::Json => self.try_get_json(idx)?.map(Value::Json),
            DataType::Uuid => self.try_get_uuid(idx)?.map(Value::Uuid),
            DataType::Date => self.try_get::<NaiveDate>(idx)?.map(Value::Date),
            DataType::Time => self.try_get::<NaiveTime>(idx)?.map(Value::Time),
            DataType::Timestamp => self.try_get::<NaiveDateTime>(idx)?.map(Value::TimestampNaive),
            DataType::TimestampTz => self.try_get_timestamp(idx)?.map(Value::Timestamp),
            DataType::Blob | DataType::Binary | DataType::Bytea | DataType::Bit => {
                self.try_get::<Vec<u8>>(idx)?.map(Value::Bytes)
            }
            DataType::Null => None,
            DataType::Custom(_) => self.try_get_custom(idx)?.map(Value::String),
        };
        Ok(value)
    }

    pub fn len(&self) -> usize {
        match self {
            DbRow::MySqlRow(row) => row.len(),
            DbRow::PostgresRow(row) => row.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_name(&self, idx: usize) -> String {
        match self {
            DbRow::MySqlRow(row) => row.columns_ref()[idx].name_str().into_owned(),
            DbRow::PostgresRow(row) => row.columns()[idx].name().to_string(),
        }
    }

    pub fn column_type(&self, idx: usize) -> DataType {
        match self {
            DbRow::MySqlRow(row) => column_data_type(&row.columns_ref()[idx]),
            DbRow::PostgresRow(row) => {
                DataType::from_postgres_type(row.columns()[idx].type_().name())
            }
        }
    }

    /// Reads a cell whose Rust type both drivers decode natively.
    pub fn try_get<T>(&self, idx: usize) -> Result<Option<T>, DbError>
    where
        T: FromValue + FromSqlOwned,
    {
        match self {
            DbRow::MySqlRow(row) => self.mysql_cell::<T>(row, idx),
            DbRow::PostgresRow(row) => row
                .try_get::<_, Option<T>>(idx)
                .map_err(|err| self.decode_error(idx, err)),
        }
    }

    pub fn try_get_u64(&self, idx: usize) -> Result<Option<u64>, DbError> {
        match self {
            DbRow::MySqlRow(row) => self.mysql_cell::<u64>(row, idx),
            DbRow::PostgresRow(row) => row
                .try_get::<_, Option<i64>>(idx)
                .map_err(|err| self.decode_error(idx, err))?
                .map(|v| u64::try_from(v).map_err(|err| self.decode_error(idx, err)))
                .transpose(),
        }
    }

    pub fn try_get_bigdecimal(&self, idx: usize) -> Result<Option<BigDecimal>, DbError> {
        match self {
            DbRow::MySqlRow(row) => self.mysql_cell::<BigDecimal>(row, idx),
            DbRow::PostgresRow(row) => Ok(row
                .try_get::<_, Option<PgNumeric>>(idx)
                .map_err(|err| self.decode_error(idx, err))?
                .map(|numeric| numeric.0)),
        }
    }

    pub fn try_get_json(&self, idx: usize) -> Result<Option<serde_json::Value>, DbError> {
        match self {
            DbRow::MySqlRow(row) => self.mysql_cell::<serde_json::Value>(row, idx),
            DbRow::PostgresRow(row) => Ok(row
                .try_get::<_, Option<PgJson<serde_json::Value>>>(idx)
                .map_err(|err| self.decode_error(idx, err))?
                .map(|json| json.0)),
        }
    }

    pub fn try_get_uuid(&self, idx: usize) -> Result<Option<Uuid>, DbError> {
        match self {
            DbRow::MySqlRow(row) => self
                .mysql_cell::<String>(row, idx)?
                .map(|s| Uuid::parse_str(&s).map_err(|err| self.decode_error(idx, err)))
                .transpose(),
            DbRow::PostgresRow(row) => row
                .try_get::<_, Option<Uuid>>(idx)
                .map_err(|err| self.decode_error(idx, err)),
        }
    }

    /// MySQL `TIMESTAMP` cells arrive in the session time zone, which the
    /// adapter pins to UTC.
    pub fn try_get_timestamp(&self, idx: usize) -> Result<Option<DateTime<Utc>>, DbError> {
        match self {
            DbRow::MySqlRow(row) => Ok(self
                .mysql_cell::<NaiveDateTime>(row, idx)?
                .map(|naive| naive.and_utc())),
            DbRow::PostgresRow(row) => row
                .try_get::<_, Option<DateTime<Utc>>>(idx)
                .map_err(|err| self.decode_error(idx, err)),
        }
    }

    pub fn try_get_custom(&self, idx: usize) -> Result<Option<String>, DbError> {
        match self {
            DbRow::PostgresRow(row) if !<String as FromSql>::accepts(row.columns()[idx].type_()) => {
                Ok(None)
            }
            _ => self.try_get::<String>(idx),
        }
    }

    fn mysql_cell<T: FromValue>(&self, row: &MySqlRow, idx: usize) -> Result<Option<T>, DbError> {
        match row.get_opt::<Option<T>, _>(idx) {
            Some(Ok(value)) => Ok(value),
            Some(Err(err)) => Err(self.decode_error(idx, err)),
            None => Err(self.decode_error(idx, "no value at this position")),
        }
    }

    fn decode_error(&self, idx: usize, reason: impl std::fmt::Display) -> DbError {
        DbError::Decode {
            column: self.column_name(idx),
            reason: reason.to_string(),
        }
    }
}
