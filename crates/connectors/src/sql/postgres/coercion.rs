use crate::sql::base::error::DbError;
use bigdecimal::{BigDecimal, FromPrimitive};
use chrono::NaiveTime;
use model::core::value::Value;
use tokio_postgres::types::Type;

/// Converts `value` into the variant matching the type Postgres inferred
/// for its placeholder, so a plan bound with `Int32` still runs against a
/// `bigint` column. Types outside the scanned families pass through.
pub(crate) fn coerce_param(value: Value, ty: &Type) -> Result<Value, DbError> {
    if value.is_null() {
        return Ok(value);
    }
    let found = value.data_type();

    let coerced = match *ty {
        Type::INT2 => value
            .as_i64()
            .and_then(|v| i16::try_from(v).ok())
            .map(Value::SmallInt),
        Type::INT4 => value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Value::Int32),
        Type::INT8 => value.as_i64().map(Value::Int),
        Type::FLOAT4 => numeric_f64(&value).map(|v| Value::Float32(v as f32)),
        Type::FLOAT8 => numeric_f64(&value).map(Value::Float),
        Type::NUMERIC => to_decimal(value).map(Value::Decimal),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => match value {
            Value::String(s) => Some(Value::String(s)),
            Value::Uuid(u) => Some(Value::String(u.to_string())),
            _ => None,
        },
        Type::DATE => match value {
            Value::Date(d) => Some(Value::Date(d)),
            Value::TimestampNaive(dt) => Some(Value::Date(dt.date())),
            Value::Timestamp(dt) => Some(Value::Date(dt.date_naive())),
            _ => None,
        },
        Type::TIME => match value {
            Value::Time(t) => Some(Value::Time(t)),
            _ => None,
        },
        Type::TIMESTAMP => match value {
            Value::TimestampNaive(dt) => Some(Value::TimestampNaive(dt)),
            Value::Timestamp(dt) => Some(Value::TimestampNaive(dt.naive_utc())),
            Value::Date(d) => Some(Value::TimestampNaive(d.and_time(NaiveTime::MIN))),
            _ => None,
        },
        Type::TIMESTAMPTZ => match value {
            Value::Timestamp(dt) => Some(Value::Timestamp(dt)),
            Value::TimestampNaive(dt) => Some(Value::Timestamp(dt.and_utc())),
            Value::Date(d) => Some(Value::Timestamp(d.and_time(NaiveTime::MIN).and_utc())),
            _ => None,
        },
        _ => return Ok(value),
    };

    coerced.ok_or_else(|| DbError::Bind(format!("{found} value as Postgres {ty}")))
}

fn numeric_f64(value: &Value) -> Option<f64> {
    match value {
        Value::String(_) | Value::Json(_) => None,
        other => other.as_f64(),
    }
}

fn to_decimal(value: Value) -> Option<BigDecimal> {
    match value {
        Value::Decimal(d) => Some(d),
        Value::Uint(u) => Some(BigDecimal::from(u)),
        Value::Float32(f) => BigDecimal::from_f32(f),
        Value::Float(f) => BigDecimal::from_f64(f),
        other => other.as_i64().map(BigDecimal::from),
    }
}
