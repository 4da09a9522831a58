use crate::{
    core::value::Value,
    offset::{
        codec::{self, from_epoch, parse_epoch},
        error::OffsetError,
        kind::OffsetType,
        token::OffsetToken,
    },
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Turns a human-supplied starting value into a scan token.
///
/// Temporal columns accept either a formatted literal or the epoch
/// milliseconds form a previously emitted token carries, so a token read
/// back from storage can be fed straight in.
pub fn resolve(offset_type: OffsetType, text: &str) -> Result<OffsetToken, OffsetError> {
    let value = parse_value(offset_type, text)?;
    codec::encode(offset_type, &value)
}

/// Parses `text` in the canonical textual form of `offset_type`.
pub fn parse_value(offset_type: OffsetType, text: &str) -> Result<Value, OffsetError> {
    let invalid = |reason: &str| OffsetError::InvalidInitialOffset {
        offset_type,
        text: text.to_string(),
        reason: reason.to_string(),
    };

    // Strings are taken verbatim, whitespace included
    if offset_type.is_lexical() {
        return Ok(Value::String(text.to_string()));
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(invalid("value is empty"));
    }

    match offset_type {
        OffsetType::Short => trimmed
            .parse::<i16>()
            .map(Value::SmallInt)
            .map_err(|e| invalid(&e.to_string())),
        OffsetType::Integer => trimmed
            .parse::<i32>()
            .map(Value::Int32)
            .map_err(|e| invalid(&e.to_string())),
        OffsetType::Long => trimmed
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| invalid(&e.to_string())),
        OffsetType::Float => trimmed
            .parse::<f32>()
            .map(Value::Float32)
            .map_err(|e| invalid(&e.to_string())),
        OffsetType::Double => trimmed
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| invalid(&e.to_string())),
        OffsetType::Decimal => BigDecimal::from_str(trimmed)
            .map(Value::Decimal)
            .map_err(|e| invalid(&e.to_string())),
        OffsetType::Date | OffsetType::Time | OffsetType::DateTime => {
            if let Some((millis, sub_nanos)) = parse_epoch(trimmed) {
                return from_epoch(offset_type, millis, sub_nanos)
                    .ok_or_else(|| invalid("epoch milliseconds out of range"));
            }
            parse_temporal_literal(offset_type, trimmed).ok_or_else(|| {
                invalid(match offset_type {
                    OffsetType::Date => "expected epoch milliseconds or YYYY-MM-DD",
                    OffsetType::Time => "expected epoch milliseconds or HH:MM[:SS[.fff]]",
                    _ => "expected epoch milliseconds, RFC 3339 or YYYY-MM-DD[ HH:MM:SS[.fff]]",
                })
            })
        }
        OffsetType::String | OffsetType::Char => Ok(Value::String(text.to_string())),
    }
}

fn parse_temporal_literal(offset_type: OffsetType, text: &str) -> Option<Value> {
    match offset_type {
        OffsetType::Date => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .ok()
            .or_else(|| parse_datetime(text).map(|dt| dt.date()))
            .map(Value::Date),
        OffsetType::Time => TIME_FORMATS
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
            .map(Value::Time),
        OffsetType::DateTime => parse_datetime(text).map(Value::TimestampNaive),
        _ => None,
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(aware) = DateTime::parse_from_rfc3339(text) {
        return Some(aware.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}
