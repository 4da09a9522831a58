use model::core::data_type::DataType;
use mysql_async::{
    Column,
    consts::{ColumnFlags, ColumnType},
};

/// `binary` collation id; byte strings and blobs carry it, text does not.
const BINARY_CHARSET: u16 = 63;

/// Folds a result-set column description into a [`DataType`].
pub(crate) fn column_data_type(column: &Column) -> DataType {
    let unsigned = column.flags().contains(ColumnFlags::UNSIGNED_FLAG);
    let binary = column.character_set() == BINARY_CHARSET;

    match column.column_type() {
        ColumnType::MYSQL_TYPE_TINY | ColumnType::MYSQL_TYPE_SHORT if unsigned => {
            DataType::ShortUnsigned
        }
        ColumnType::MYSQL_TYPE_TINY | ColumnType::MYSQL_TYPE_SHORT => DataType::Short,
        ColumnType::MYSQL_TYPE_INT24 | ColumnType::MYSQL_TYPE_LONG if unsigned => {
            DataType::IntUnsigned
        }
        ColumnType::MYSQL_TYPE_INT24 | ColumnType::MYSQL_TYPE_LONG => DataType::Int,
        ColumnType::MYSQL_TYPE_LONGLONG if unsigned => DataType::LongLong,
        ColumnType::MYSQL_TYPE_LONGLONG => DataType::Long,
        ColumnType::MYSQL_TYPE_FLOAT => DataType::Float,
        ColumnType::MYSQL_TYPE_DOUBLE => DataType::Double,
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => DataType::Decimal,
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => DataType::Date,
        ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => DataType::Time,
        ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_DATETIME2 => DataType::Timestamp,
        ColumnType::MYSQL_TYPE_TIMESTAMP | ColumnType::MYSQL_TYPE_TIMESTAMP2 => {
            DataType::TimestampTz
        }
        ColumnType::MYSQL_TYPE_YEAR => DataType::Year,
        ColumnType::MYSQL_TYPE_BIT => DataType::Bit,
        ColumnType::MYSQL_TYPE_JSON => DataType::Json,
        ColumnType::MYSQL_TYPE_ENUM | ColumnType::MYSQL_TYPE_SET => DataType::Enum,
        ColumnType::MYSQL_TYPE_STRING if binary => DataType::Binary,
        ColumnType::MYSQL_TYPE_STRING => DataType::Char,
        ColumnType::MYSQL_TYPE_VARCHAR | ColumnType::MYSQL_TYPE_VAR_STRING if binary => {
            DataType::Binary
        }
        ColumnType::MYSQL_TYPE_VARCHAR | ColumnType::MYSQL_TYPE_VAR_STRING => DataType::VarChar,
        ColumnType::MYSQL_TYPE_TINY_BLOB
        | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
        | ColumnType::MYSQL_TYPE_LONG_BLOB
        | ColumnType::MYSQL_TYPE_BLOB
            if binary =>
        {
            DataType::Blob
        }
        ColumnType::MYSQL_TYPE_TINY_BLOB
        | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
        | ColumnType::MYSQL_TYPE_LONG_BLOB
        | ColumnType::MYSQL_TYPE_BLOB => DataType::String,
        ColumnType::MYSQL_TYPE_NULL => DataType::Null,
        other => DataType::Custom(format!("{other:?}")),
    }
}
