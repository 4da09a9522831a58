use crate::core::data_type::DataType;
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, hash::Hash};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    SmallInt(i16),
    Int32(i32),
    Int(i64),
    Uint(u64),
    Float32(f32),
    Float(f64),
    Decimal(BigDecimal),
    String(String),
    Boolean(bool),
    Json(serde_json::Value),
    Uuid(Uuid),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    TimestampNaive(NaiveDateTime),
    Timestamp(DateTime<Utc>),
    Null,
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        use Value::*;
        std::mem::discriminant(self).hash(state);
        match self {
            SmallInt(v) => v.hash(state),
            Int32(v) => v.hash(state),
            Int(v) => v.hash(state),
            Uint(v) => v.hash(state),
            // Hash the bits so NaN and -0.0 hash consistently
            Float32(v) => v.to_bits().hash(state),
            Float(v) => v.to_bits().hash(state),
            Decimal(v) => v.normalized().to_string().hash(state),
            String(v) => v.hash(state),
            Boolean(v) => v.hash(state),
            Json(v) => v.to_string().hash(state),
            Uuid(v) => v.hash(state),
            Bytes(v) => v.hash(state),
            Date(v) => v.hash(state),
            Time(v) => v.hash(state),
            TimestampNaive(v) => v.hash(state),
            Timestamp(v) => v.hash(state),
            Null => {}
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Widens any integer variant to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::SmallInt(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int(v) => Some(*v),
            Value::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::SmallInt(v) => Some(*v as f64),
            Value::Int32(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            Value::Uint(v) => Some(*v as f64),
            Value::Float32(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Decimal(v) => v.to_f64(),
            Value::String(v) => v.parse::<f64>().ok(),
            Value::Json(v) => v.as_f64(),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::String(v) => Some(v.clone()),
            Value::Json(v) => v.as_str().map(|s| s.to_string()),
            Value::Uuid(v) => Some(v.to_string()),
            Value::Null | Value::Bytes(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Compares two values of the same family. Values of unrelated
    /// families (e.g. a date and a string) are not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Float32(a), Float32(b)) => Some(a.total_cmp(b)),
            (Float(a), Float(b)) => Some(a.total_cmp(b)),
            (Decimal(a), Decimal(b)) => Some(a.cmp(b)),
            (String(a), String(b)) => Some(a.cmp(b)),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            (TimestampNaive(a), TimestampNaive(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (TimestampNaive(a), Timestamp(b)) => Some(a.cmp(&b.naive_utc())),
            (Timestamp(a), TimestampNaive(b)) => Some(a.naive_utc().cmp(b)),
            (Uint(a), Uint(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
            },
        }
    }

    pub fn equal(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Value::SmallInt(_) => DataType::Short,
            Value::Int32(_) => DataType::Int,
            Value::Int(_) => DataType::Long,
            Value::Uint(_) => DataType::LongLong,
            Value::Float32(_) => DataType::Float,
            Value::Float(_) => DataType::Double,
            Value::Decimal(_) => DataType::Decimal,
            Value::String(_) => DataType::String,
            Value::Boolean(_) => DataType::Boolean,
            Value::Json(_) => DataType::Json,
            Value::Uuid(_) => DataType::Uuid,
            Value::Bytes(_) => DataType::Bytea,
            Value::Date(_) => DataType::Date,
            Value::Time(_) => DataType::Time,
            Value::TimestampNaive(_) => DataType::Timestamp,
            Value::Timestamp(_) => DataType::TimestampTz,
            Value::Null => DataType::Null,
        }
    }

    /// Natural JSON form used when rows leave the process.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::SmallInt(v) => Json::from(*v),
            Value::Int32(v) => Json::from(*v),
            Value::Int(v) => Json::from(*v),
            Value::Uint(v) => Json::from(*v),
            Value::Float32(v) => Json::from(*v as f64),
            Value::Float(v) => Json::from(*v),
            // Decimals keep their full precision as text
            Value::Decimal(v) => Json::String(v.to_string()),
            Value::String(v) => Json::String(v.clone()),
            Value::Boolean(v) => Json::Bool(*v),
            Value::Json(v) => v.clone(),
            Value::Uuid(v) => Json::String(v.to_string()),
            Value::Bytes(v) => Json::String(hex(v)),
            Value::Date(v) => Json::String(v.to_string()),
            Value::Time(v) => Json::String(v.to_string()),
            Value::TimestampNaive(v) => Json::String(v.to_string()),
            Value::Timestamp(v) => Json::String(v.to_rfc3339()),
            Value::Null => Json::Null,
        }
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            Value::SmallInt(_) => std::mem::size_of::<i16>(),
            Value::Int32(_) | Value::Float32(_) => 4,
            Value::Int(_) | Value::Uint(_) | Value::Float(_) => 8,
            Value::Decimal(v) => v.digits() as usize,
            Value::String(s) => s.len(),
            Value::Boolean(_) => 1,
            Value::Json(v) => v.to_string().len(),
            Value::Uuid(_) => 16,
            Value::Bytes(b) => b.len(),
            Value::Date(_) => std::mem::size_of::<NaiveDate>(),
            Value::Time(_) => std::mem::size_of::<NaiveTime>(),
            Value::TimestampNaive(_) => std::mem::size_of::<NaiveDateTime>(),
            Value::Timestamp(_) => std::mem::size_of::<DateTime<Utc>>(),
            Value::Null => 0,
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |acc, byte| acc + &format!("{byte:02x}"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValue {
    pub name: String,
    pub value: Option<Value>,
    pub data_type: DataType,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::SmallInt(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Json(v) => write!(f, "'{}'", v.to_string().replace('\'', "''")),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::Bytes(v) => write!(f, "E'\\\\x{}'", hex(v)),
            Value::Date(v) => write!(f, "'{v}'"),
            Value::Time(v) => write!(f, "'{v}'"),
            Value::TimestampNaive(v) => write!(f, "'{v}'"),
            Value::Timestamp(v) => write!(f, "'{v}'"),
            Value::Null => write!(f, "NULL"),
        }
    }
}
