use crate::{core::data_type::DataType, offset::error::OffsetError};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Closed set of column domains that can drive an incremental scan.
///
/// Every tag has a total order, a stable token encoding and a decoding back
/// into a typed [`Value`](crate::core::value::Value). Anything outside this
/// set (blobs, booleans, json, ...) is rejected before a scan starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetType {
    Short,
    Integer,
    Long,
    Float,
    Double,
    Decimal,
    String,
    Char,
    Date,
    Time,
    DateTime,
}

impl OffsetType {
    pub const ALL: [OffsetType; 11] = [
        OffsetType::Short,
        OffsetType::Integer,
        OffsetType::Long,
        OffsetType::Float,
        OffsetType::Double,
        OffsetType::Decimal,
        OffsetType::String,
        OffsetType::Char,
        OffsetType::Date,
        OffsetType::Time,
        OffsetType::DateTime,
    ];

    /// Infers the tag from a catalog column type.
    pub fn from_data_type(data_type: &DataType) -> Result<Self, OffsetError> {
        match data_type {
            DataType::Short => Ok(OffsetType::Short),
            DataType::ShortUnsigned | DataType::Int | DataType::Year => Ok(OffsetType::Integer),
            DataType::IntUnsigned | DataType::Long => Ok(OffsetType::Long),
            // u64 does not fit an i64 token; decimal keeps the full range
            DataType::LongLong | DataType::Decimal => Ok(OffsetType::Decimal),
            DataType::Float => Ok(OffsetType::Float),
            DataType::Double => Ok(OffsetType::Double),
            DataType::VarChar | DataType::String => Ok(OffsetType::String),
            DataType::Char => Ok(OffsetType::Char),
            DataType::Date => Ok(OffsetType::Date),
            DataType::Time => Ok(OffsetType::Time),
            DataType::Timestamp | DataType::TimestampTz => Ok(OffsetType::DateTime),
            other => Err(OffsetError::Unsupported(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OffsetType::Short => "short",
            OffsetType::Integer => "integer",
            OffsetType::Long => "long",
            OffsetType::Float => "float",
            OffsetType::Double => "double",
            OffsetType::Decimal => "decimal",
            OffsetType::String => "string",
            OffsetType::Char => "char",
            OffsetType::Date => "date",
            OffsetType::Time => "time",
            OffsetType::DateTime => "datetime",
        }
    }

    /// Tokens of lexical types order the same way as the values they encode.
    /// Every other token is opaque and has to be decoded before comparing.
    pub fn is_lexical(&self) -> bool {
        matches!(self, OffsetType::String | OffsetType::Char)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            OffsetType::Date | OffsetType::Time | OffsetType::DateTime
        )
    }

    /// Whether a catalog type stores values this tag can represent.
    pub fn matches_data_type(&self, data_type: &DataType) -> bool {
        match OffsetType::from_data_type(data_type) {
            Ok(inferred) if inferred == *self => true,
            Ok(inferred) => matches!(
                (self, inferred),
                (OffsetType::String, OffsetType::Char)
                    | (OffsetType::Char, OffsetType::String)
                    | (OffsetType::Long, OffsetType::Integer | OffsetType::Short)
                    | (OffsetType::Integer, OffsetType::Short)
                    | (OffsetType::Double, OffsetType::Float)
                    | (OffsetType::DateTime, OffsetType::Date)
            ),
            Err(_) => false,
        }
    }
}

impl fmt::Display for OffsetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OffsetType {
    type Err = OffsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "short" | "smallint" | "int2" | "tinyint" => Ok(OffsetType::Short),
            "integer" | "int" | "int4" | "mediumint" => Ok(OffsetType::Integer),
            "long" | "bigint" | "int8" => Ok(OffsetType::Long),
            "float" | "real" | "float4" => Ok(OffsetType::Float),
            "double" | "double_precision" | "float8" => Ok(OffsetType::Double),
            "decimal" | "numeric" => Ok(OffsetType::Decimal),
            "string" | "varchar" | "text" | "character_varying" => Ok(OffsetType::String),
            "char" | "character" | "bpchar" => Ok(OffsetType::Char),
            "date" => Ok(OffsetType::Date),
            "time" => Ok(OffsetType::Time),
            "datetime" | "date_time" | "timestamp" | "timestamptz" => Ok(OffsetType::DateTime),
            _ => Err(OffsetError::Unsupported(s.trim().to_string())),
        }
    }
}
