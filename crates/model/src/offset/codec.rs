//! Conversion between typed offset values and persisted tokens.
//!
//! Token formats are stable per [`OffsetType`]:
//!
//! * integers: base-10 (`-12`, `7`)
//! * floats: shortest round-trip form
//! * decimal: full precision decimal text
//! * string / char: verbatim
//! * date: epoch milliseconds of midnight UTC
//! * time: milliseconds since midnight on 1970-01-01
//! * datetime: epoch milliseconds (UTC)
//!
//! Time and datetime tokens carry a `.nnnnnn` suffix holding the
//! sub-millisecond nanoseconds when the value has them, so a decoded token
//! always compares equal to the value it was built from.

use crate::{
    core::value::Value,
    offset::{error::OffsetError, kind::OffsetType, token::OffsetToken},
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::str::FromStr;

const MILLIS_PER_DAY: i64 = 86_400_000;
const NANOS_PER_MILLI: u32 = 1_000_000;

pub fn encode(offset_type: OffsetType, value: &Value) -> Result<OffsetToken, OffsetError> {
    encode_value(offset_type, value).map(OffsetToken::At)
}

/// Decodes a token into the canonical value for `offset_type`.
/// The start token has no value and decodes to `None`.
pub fn decode(offset_type: OffsetType, token: &OffsetToken) -> Result<Option<Value>, OffsetError> {
    match token {
        OffsetToken::Start => Ok(None),
        OffsetToken::At(raw) => decode_str(offset_type, raw).map(Some),
    }
}

pub fn encode_value(offset_type: OffsetType, value: &Value) -> Result<String, OffsetError> {
    let token = match normalize(offset_type, value)? {
        Value::SmallInt(v) => v.to_string(),
        Value::Int32(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Float32(v) => ryu::Buffer::new().format(v).to_string(),
        Value::Float(v) => ryu::Buffer::new().format(v).to_string(),
        Value::Decimal(v) => v.to_string(),
        Value::String(v) => v,
        Value::Date(d) => d.and_time(NaiveTime::MIN).and_utc().timestamp_millis().to_string(),
        Value::Time(t) => {
            let millis = t.num_seconds_from_midnight() as i64 * 1000
                + (t.nanosecond() / NANOS_PER_MILLI) as i64;
            millis_token(millis, t.nanosecond() % NANOS_PER_MILLI)
        }
        Value::TimestampNaive(dt) => {
            let utc = dt.and_utc();
            millis_token(
                utc.timestamp_millis(),
                utc.timestamp_subsec_nanos() % NANOS_PER_MILLI,
            )
        }
        other => {
            return Err(OffsetError::TypeMismatch {
                expected: offset_type,
                found: other.data_type().to_string(),
            });
        }
    };
    Ok(token)
}

pub fn decode_str(offset_type: OffsetType, raw: &str) -> Result<Value, OffsetError> {
    let malformed = |reason: &dyn ToString| OffsetError::malformed(offset_type, raw, reason.to_string());

    match offset_type {
        OffsetType::Short => raw.parse::<i16>().map(Value::SmallInt).map_err(|e| malformed(&e)),
        OffsetType::Integer => raw.parse::<i32>().map(Value::Int32).map_err(|e| malformed(&e)),
        OffsetType::Long => raw.parse::<i64>().map(Value::Int).map_err(|e| malformed(&e)),
        OffsetType::Float => raw
            .parse::<f32>()
            .map(|f| Value::Float32(unsigned_zero_f32(f)))
            .map_err(|e| malformed(&e)),
        OffsetType::Double => raw
            .parse::<f64>()
            .map(|f| Value::Float(unsigned_zero(f)))
            .map_err(|e| malformed(&e)),
        OffsetType::Decimal => BigDecimal::from_str(raw)
            .map(Value::Decimal)
            .map_err(|e| malformed(&e)),
        OffsetType::String | OffsetType::Char => Ok(Value::String(raw.to_string())),
        OffsetType::Date | OffsetType::Time | OffsetType::DateTime => {
            let (millis, sub_nanos) =
                parse_epoch(raw).ok_or_else(|| malformed(&"expected epoch milliseconds"))?;
            from_epoch(offset_type, millis, sub_nanos).ok_or_else(|| malformed(&"out of range"))
        }
    }
}

/// Coerces `value` into the single in-memory variant used for
/// `offset_type`. Narrower numeric widths are widened, `-0.0` becomes
/// `0.0` (databases treat them as one value), time-zone-aware
/// timestamps are taken in UTC and date-times feed date or time columns
/// through their date or time-of-day part.
pub fn normalize(offset_type: OffsetType, value: &Value) -> Result<Value, OffsetError> {
    let mismatch = || OffsetError::TypeMismatch {
        expected: offset_type,
        found: value.data_type().to_string(),
    };

    let normalized = match (offset_type, value) {
        (OffsetType::Short, v) => Value::SmallInt(
            v.as_i64()
                .and_then(|i| i16::try_from(i).ok())
                .ok_or_else(mismatch)?,
        ),
        (OffsetType::Integer, v) => Value::Int32(
            v.as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .ok_or_else(mismatch)?,
        ),
        (OffsetType::Long, v) => Value::Int(v.as_i64().ok_or_else(mismatch)?),
        (OffsetType::Float, Value::Float32(f)) => Value::Float32(unsigned_zero_f32(*f)),
        (OffsetType::Float, Value::Float(f)) => Value::Float32(unsigned_zero_f32(*f as f32)),
        (OffsetType::Float, v) => Value::Float32(v.as_i64().ok_or_else(mismatch)? as f32),
        (OffsetType::Double, Value::Float32(f)) => Value::Float(unsigned_zero(*f as f64)),
        (OffsetType::Double, Value::Float(f)) => Value::Float(unsigned_zero(*f)),
        (OffsetType::Double, v) => Value::Float(v.as_i64().ok_or_else(mismatch)? as f64),
        (OffsetType::Decimal, Value::Decimal(d)) => Value::Decimal(d.clone()),
        (OffsetType::Decimal, Value::Uint(u)) => Value::Decimal(BigDecimal::from(*u)),
        (OffsetType::Decimal, v) => Value::Decimal(BigDecimal::from(v.as_i64().ok_or_else(mismatch)?)),
        (OffsetType::String | OffsetType::Char, Value::String(s)) => Value::String(s.clone()),
        (OffsetType::String | OffsetType::Char, Value::Uuid(u)) => Value::String(u.to_string()),
        (OffsetType::Date, Value::Date(d)) => Value::Date(*d),
        (OffsetType::Date, Value::TimestampNaive(dt)) => Value::Date(dt.date()),
        (OffsetType::Date, Value::Timestamp(dt)) => Value::Date(dt.date_naive()),
        (OffsetType::Time, Value::Time(t)) => Value::Time(*t),
        (OffsetType::Time, Value::TimestampNaive(dt)) => Value::Time(dt.time()),
        (OffsetType::Time, Value::Timestamp(dt)) => Value::Time(dt.naive_utc().time()),
        (OffsetType::DateTime, Value::TimestampNaive(dt)) => Value::TimestampNaive(*dt),
        (OffsetType::DateTime, Value::Timestamp(dt)) => Value::TimestampNaive(dt.naive_utc()),
        (OffsetType::DateTime, Value::Date(d)) => Value::TimestampNaive(d.and_time(NaiveTime::MIN)),
        _ => return Err(mismatch()),
    };
    Ok(normalized)
}

// -0.0 == 0.0, so this only clears the sign of a zero
fn unsigned_zero(f: f64) -> f64 {
    if f == 0.0 { 0.0 } else { f }
}

fn unsigned_zero_f32(f: f32) -> f32 {
    if f == 0.0 { 0.0 } else { f }
}

fn millis_token(millis: i64, sub_nanos: u32) -> String {
    if sub_nanos == 0 {
        millis.to_string()
    } else {
        format!("{millis}.{sub_nanos:06}")
    }
}

/// Parses `-?\d+` optionally followed by `.` and exactly six digits of
/// sub-millisecond nanoseconds.
pub(crate) fn parse_epoch(raw: &str) -> Option<(i64, u32)> {
    let (whole, fraction) = match raw.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (raw, None),
    };

    let digits = whole.strip_prefix('-').unwrap_or(whole);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let millis = whole.parse::<i64>().ok()?;

    let sub_nanos = match fraction {
        None => 0,
        Some(f) if f.len() == 6 && f.bytes().all(|b| b.is_ascii_digit()) => f.parse::<u32>().ok()?,
        Some(_) => return None,
    };
    Some((millis, sub_nanos))
}

pub(crate) fn from_epoch(offset_type: OffsetType, millis: i64, sub_nanos: u32) -> Option<Value> {
    match offset_type {
        OffsetType::Date => DateTime::from_timestamp_millis(millis).map(|dt| Value::Date(dt.date_naive())),
        OffsetType::Time => {
            // Anything outside one day is folded onto the reference date
            let of_day = millis.rem_euclid(MILLIS_PER_DAY);
            NaiveTime::from_num_seconds_from_midnight_opt(
                (of_day / 1000) as u32,
                (of_day % 1000) as u32 * NANOS_PER_MILLI + sub_nanos,
            )
            .map(Value::Time)
        }
        OffsetType::DateTime => DateTime::from_timestamp_millis(millis)
            .and_then(|dt| dt.checked_add_signed(Duration::nanoseconds(sub_nanos as i64)))
            .map(|dt| Value::TimestampNaive(dt.naive_utc())),
        _ => None,
    }
}

/// The reference date time-of-day values are placed on.
pub fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Attaches a time of day to the reference date.
pub fn on_reference_date(time: NaiveTime) -> NaiveDateTime {
    reference_date().and_time(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn datetime(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    #[test]
    fn test_integer_tokens_are_base10() {
        assert_eq!(encode_value(OffsetType::Long, &Value::Int(-12)).unwrap(), "-12");
        assert_eq!(encode_value(OffsetType::Integer, &Value::Int(7)).unwrap(), "7");
        assert_eq!(decode_str(OffsetType::Short, "300").unwrap(), Value::SmallInt(300));
    }

    #[test]
    fn test_integer_out_of_range_is_a_mismatch() {
        assert!(matches!(
            encode_value(OffsetType::Short, &Value::Int(70_000)),
            Err(OffsetError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_float_tokens_round_trip_exactly() {
        for v in [0.1_f64, -3.5e-300, 1.0 / 3.0, 12345.678] {
            let token = encode_value(OffsetType::Double, &Value::Float(v)).unwrap();
            assert_eq!(decode_str(OffsetType::Double, &token).unwrap(), Value::Float(v));
        }
        let token = encode_value(OffsetType::Float, &Value::Float32(0.7)).unwrap();
        assert_eq!(token, "0.7");
        assert_eq!(decode_str(OffsetType::Float, &token).unwrap(), Value::Float32(0.7));
    }

    #[test]
    fn test_negative_zero_is_zero() {
        assert_eq!(encode_value(OffsetType::Double, &Value::Float(-0.0)).unwrap(), "0.0");
        assert_eq!(encode_value(OffsetType::Float, &Value::Float32(-0.0)).unwrap(), "0.0");
        match decode_str(OffsetType::Double, "-0.0").unwrap() {
            Value::Float(f) => assert!(f.is_sign_positive()),
            other => panic!("unexpected value: {other:?}"),
        }
        assert_eq!(
            crate::offset::compare(OffsetType::Double, &Value::Float(-0.0), &Value::Float(0.0)).unwrap(),
            std::cmp::Ordering::Equal
        );
    }

    #[test]
    fn test_decimal_keeps_full_precision() {
        let d = BigDecimal::from_str("-9876543210.0123456789").unwrap();
        let token = encode_value(OffsetType::Decimal, &Value::Decimal(d.clone())).unwrap();
        assert_eq!(token, "-9876543210.0123456789");
        assert_eq!(decode_str(OffsetType::Decimal, &token).unwrap(), Value::Decimal(d));
    }

    #[test]
    fn test_date_token_is_midnight_millis() {
        let d = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(encode_value(OffsetType::Date, &Value::Date(d)).unwrap(), "1577836800000");
        // a date-time feeding a date column drops its time of day
        let dt = datetime("2020-01-01 13:14:15.000");
        assert_eq!(
            encode_value(OffsetType::Date, &Value::TimestampNaive(dt)).unwrap(),
            "1577836800000"
        );
    }

    #[test]
    fn test_time_token_is_millis_on_reference_date() {
        let t = NaiveTime::from_hms_milli_opt(1, 0, 0, 250).unwrap();
        assert_eq!(encode_value(OffsetType::Time, &Value::Time(t)).unwrap(), "3600250");
        assert_eq!(decode_str(OffsetType::Time, "3600250").unwrap(), Value::Time(t));
    }

    #[test]
    fn test_time_outside_one_day_is_folded() {
        let t = NaiveTime::from_hms_opt(0, 0, 1).unwrap();
        // one day and one second later, and one day earlier
        assert_eq!(decode_str(OffsetType::Time, "86401000").unwrap(), Value::Time(t));
        assert_eq!(decode_str(OffsetType::Time, "-86399000").unwrap(), Value::Time(t));
    }

    #[test]
    fn test_datetime_sub_millisecond_suffix() {
        let dt = datetime("2020-01-01 00:00:00.000001");
        let token = encode_value(OffsetType::DateTime, &Value::TimestampNaive(dt)).unwrap();
        assert_eq!(token, "1577836800000.001000");
        assert_eq!(
            decode_str(OffsetType::DateTime, &token).unwrap(),
            Value::TimestampNaive(dt)
        );
    }

    #[test]
    fn test_datetime_before_epoch() {
        let dt = datetime("1969-12-31 23:59:59.999500");
        let token = encode_value(OffsetType::DateTime, &Value::TimestampNaive(dt)).unwrap();
        assert_eq!(token, "-1.500000");
        assert_eq!(
            decode_str(OffsetType::DateTime, &token).unwrap(),
            Value::TimestampNaive(dt)
        );
    }

    #[test]
    fn test_aware_timestamp_is_normalized_to_utc() {
        let aware = DateTime::parse_from_rfc3339("2020-01-01T02:00:00+02:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            encode_value(OffsetType::DateTime, &Value::Timestamp(aware)).unwrap(),
            "1577836800000"
        );
    }

    #[test]
    fn test_malformed_tokens() {
        for (kind, raw) in [
            (OffsetType::Long, "12a"),
            (OffsetType::Integer, "99999999999"),
            (OffsetType::Decimal, "1.2.3"),
            (OffsetType::DateTime, "2020-01-01"),
            (OffsetType::DateTime, "1.5"),
            (OffsetType::Date, ""),
        ] {
            assert!(
                matches!(decode_str(kind, raw), Err(OffsetError::Malformed { .. })),
                "{kind} {raw}"
            );
        }
    }

    #[test]
    fn test_start_token_decodes_to_none() {
        assert_eq!(decode(OffsetType::Long, &OffsetToken::Start).unwrap(), None);
    }

    #[test]
    fn test_wrong_value_family_is_rejected() {
        let err = encode(OffsetType::Date, &Value::String("2020-01-01".into())).unwrap_err();
        assert!(matches!(err, OffsetError::TypeMismatch { expected: OffsetType::Date, .. }));
        assert!(encode(OffsetType::Long, &Value::Null).is_err());
    }
}
