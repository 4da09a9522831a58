use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};

/// Column type as reported by a source catalog, folded into one vocabulary
/// for both MySQL and Postgres.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DataType {
    Decimal,
    Short,
    ShortUnsigned,
    Long,
    Float,
    Double,
    Boolean,
    Null,
    Date,
    Timestamp,
    TimestampTz,
    LongLong,
    Int,
    IntUnsigned,
    Time,
    Year,
    VarChar,
    Char,
    String,
    Bit,
    Json,
    Uuid,
    Enum,
    Blob,
    Binary,
    Bytea,
    Custom(String),
}

lazy_static! {
    static ref MYSQL_TYPE_MAP: HashMap<&'static str, DataType> = build_mysql_type_map();
    static ref POSTGRES_TYPE_MAP: HashMap<&'static str, DataType> = build_postgres_type_map();
}

impl DataType {
    /// Maps a MySQL `COLUMN_TYPE` / `DATA_TYPE` string. Length and precision
    /// modifiers are ignored, so `int(11) unsigned` and `INT UNSIGNED` agree.
    pub fn from_mysql_type(type_name: &str) -> Self {
        let normalized = Self::normalize_type_name(type_name);
        MYSQL_TYPE_MAP
            .get(normalized.as_str())
            .cloned()
            .unwrap_or(DataType::Custom(normalized))
    }

    pub fn from_postgres_type(type_name: &str) -> Self {
        let normalized = Self::normalize_type_name(type_name);
        POSTGRES_TYPE_MAP
            .get(normalized.as_str())
            .cloned()
            .unwrap_or(DataType::Custom(normalized))
    }

    /// Catalog-neutral name used in diagnostics.
    pub fn name(&self) -> &str {
        match self {
            DataType::Decimal => "decimal",
            DataType::Short => "smallint",
            DataType::ShortUnsigned => "smallint unsigned",
            DataType::Long => "bigint",
            DataType::LongLong => "bigint unsigned",
            DataType::Int => "int",
            DataType::IntUnsigned => "int unsigned",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Boolean => "boolean",
            DataType::Null => "null",
            DataType::Date => "date",
            DataType::Timestamp => "timestamp",
            DataType::TimestampTz => "timestamptz",
            DataType::Time => "time",
            DataType::Year => "year",
            DataType::VarChar => "varchar",
            DataType::Char => "char",
            DataType::String => "text",
            DataType::Bit => "bit",
            DataType::Json => "json",
            DataType::Uuid => "uuid",
            DataType::Enum => "enum",
            DataType::Blob => "blob",
            DataType::Binary => "binary",
            DataType::Bytea => "bytea",
            DataType::Custom(name) => name,
        }
    }

    fn normalize_type_name(type_name: &str) -> String {
        // "decimal(30,10)" -> "DECIMAL", "int(11) unsigned" -> "INT UNSIGNED"
        let mut out = String::with_capacity(type_name.len());
        let mut depth = 0usize;
        for ch in type_name.trim().chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                _ if depth == 0 => out.push(ch),
                _ => {}
            }
        }
        out.split_whitespace()
            .filter(|word| !word.eq_ignore_ascii_case("zerofill"))
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn build_mysql_type_map() -> HashMap<&'static str, DataType> {
    use DataType::*;

    let entries = [
        ("BOOLEAN", Boolean),
        ("BOOL", Boolean),
        ("TINYINT", Short),
        ("SMALLINT", Short),
        ("TINYINT UNSIGNED", ShortUnsigned),
        ("SMALLINT UNSIGNED", ShortUnsigned),
        ("MEDIUMINT", Int),
        ("MEDIUMINT UNSIGNED", IntUnsigned),
        ("INT", Int),
        ("INTEGER", Int),
        ("INT UNSIGNED", IntUnsigned),
        ("INTEGER UNSIGNED", IntUnsigned),
        ("BIGINT", Long),
        ("BIGINT UNSIGNED", LongLong),
        ("FLOAT", Float),
        ("DOUBLE", Double),
        ("DOUBLE PRECISION", Double),
        ("REAL", Double),
        ("DECIMAL", Decimal),
        ("NUMERIC", Decimal),
        ("NEWDECIMAL", Decimal),
        ("NULL", Null),
        ("DATETIME", Timestamp),
        ("TIMESTAMP", TimestampTz),
        ("DATE", Date),
        ("TIME", Time),
        ("YEAR", Year),
        ("BIT", Bit),
        ("ENUM", Enum),
        ("JSON", Json),
        ("CHAR", Char),
        ("CHARACTER", Char),
        ("VARCHAR", VarChar),
        ("CHARACTER VARYING", VarChar),
        ("TEXT", String),
        ("TINYTEXT", String),
        ("MEDIUMTEXT", String),
        ("LONGTEXT", String),
        ("BINARY", Binary),
        ("VARBINARY", Binary),
        ("TINYBLOB", Blob),
        ("BLOB", Blob),
        ("MEDIUMBLOB", Blob),
        ("LONGBLOB", Blob),
    ];

    entries.into_iter().collect()
}

fn build_postgres_type_map() -> HashMap<&'static str, DataType> {
    use DataType::*;

    let entries = [
        ("BOOLEAN", Boolean),
        ("BOOL", Boolean),
        ("SMALLINT", Short),
        ("INT2", Short),
        ("INTEGER", Int),
        ("INT", Int),
        ("INT4", Int),
        ("INT8", Long),
        ("BIGINT", Long),
        ("FLOAT4", Float),
        ("REAL", Float),
        ("FLOAT8", Double),
        ("DOUBLE PRECISION", Double),
        ("NUMERIC", Decimal),
        ("DECIMAL", Decimal),
        ("JSONB", Json),
        ("JSON", Json),
        ("UUID", Uuid),
        ("TEXT", String),
        ("NAME", String),
        ("CHARACTER VARYING", VarChar),
        ("VARCHAR", VarChar),
        ("CHARACTER", Char),
        ("CHAR", Char),
        ("BPCHAR", Char),
        ("BYTEA", Bytea),
        ("BIT", Bit),
        ("DATE", Date),
        ("TIME", Time),
        ("TIME WITHOUT TIME ZONE", Time),
        ("TIMESTAMP", Timestamp),
        ("TIMESTAMP WITHOUT TIME ZONE", Timestamp),
        ("TIMESTAMP WITH TIME ZONE", TimestampTz),
        ("TIMESTAMPTZ", TimestampTz),
    ];

    entries.into_iter().collect()
}
