use chrono::{Datelike, NaiveDateTime, Timelike};
use model::core::value::Value;
use mysql_async::Value as MySqlValue;
use mysql_common::params::Params;

pub struct MySqlParam(MySqlValue);

impl MySqlParam {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::SmallInt(i) => MySqlParam(MySqlValue::Int(*i as i64)),
            Value::Int32(i) => MySqlParam(MySqlValue::Int(*i as i64)),
            Value::Int(i) => MySqlParam(MySqlValue::Int(*i)),
            Value::Uint(u) => MySqlParam(MySqlValue::UInt(*u)),
            Value::Float32(f) => MySqlParam(MySqlValue::Float(*f)),
            Value::Float(f) => MySqlParam(MySqlValue::Double(*f)),
            // decimals go over the wire as text to keep every digit
            Value::Decimal(d) => MySqlParam(MySqlValue::Bytes(d.to_string().into_bytes())),
            Value::String(s) => MySqlParam(MySqlValue::Bytes(s.clone().into_bytes())),
            Value::Boolean(b) => MySqlParam(MySqlValue::Int(if *b { 1 } else { 0 })),
            Value::Json(j) => MySqlParam(MySqlValue::Bytes(j.to_string().into_bytes())),
            Value::Uuid(u) => MySqlParam(MySqlValue::Bytes(u.to_string().into_bytes())),
            Value::Bytes(b) => MySqlParam(MySqlValue::Bytes(b.clone())),
            Value::Date(d) => MySqlParam(MySqlValue::Date(
                d.year() as u16,
                d.month() as u8,
                d.day() as u8,
                0,
                0,
                0,
                0,
            )),
            Value::Time(t) => MySqlParam(MySqlValue::Time(
                false,
                0,
                t.hour() as u8,
                t.minute() as u8,
                t.second() as u8,
                t.nanosecond() / 1_000,
            )),
            Value::TimestampNaive(ts) => MySqlParam(datetime(ts)),
            Value::Timestamp(ts) => MySqlParam(datetime(&ts.naive_utc())),
            Value::Null => MySqlParam(MySqlValue::NULL),
        }
    }
}

fn datetime(ts: &NaiveDateTime) -> MySqlValue {
    MySqlValue::Date(
        ts.year() as u16,
        ts.month() as u8,
        ts.day() as u8,
        ts.hour() as u8,
        ts.minute() as u8,
        ts.second() as u8,
        ts.nanosecond() / 1_000,
    )
}

pub struct MySqlParamStore {
    pub params: Vec<MySqlParam>,
}

impl MySqlParamStore {
    pub fn from_values(values: &[Value]) -> Self {
        let params = values.iter().map(MySqlParam::from_value).collect();
        MySqlParamStore { params }
    }

    pub fn params(&self) -> Params {
        if self.params.is_empty() {
            return Params::Empty;
        }
        let mysql_values: Vec<MySqlValue> = self.params.iter().map(|p| p.0.clone()).collect();
        Params::Positional(mysql_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::{NaiveDate, NaiveTime};
    use std::str::FromStr;

    #[test]
    fn test_temporal_values_keep_microseconds() {
        let ts = NaiveDate::from_ymd_opt(2020, 2, 29)
            .unwrap()
            .and_hms_micro_opt(23, 59, 58, 123_456)
            .unwrap();
        assert_eq!(
            MySqlParam::from_value(&Value::TimestampNaive(ts)).0,
            MySqlValue::Date(2020, 2, 29, 23, 59, 58, 123_456)
        );

        let time = NaiveTime::from_hms_milli_opt(1, 2, 3, 4).unwrap();
        assert_eq!(
            MySqlParam::from_value(&Value::Time(time)).0,
            MySqlValue::Time(false, 0, 1, 2, 3, 4_000)
        );
    }

    #[test]
    fn test_decimal_is_sent_as_text() {
        let d = BigDecimal::from_str("-12345678901234567890.1234567890").unwrap();
        assert_eq!(
            MySqlParam::from_value(&Value::Decimal(d)).0,
            MySqlValue::Bytes(b"-12345678901234567890.1234567890".to_vec())
        );
    }

    #[test]
    fn test_store_is_positional() {
        let store = MySqlParamStore::from_values(&[Value::Int32(3), Value::Int(10)]);
        assert_eq!(
            store.params(),
            Params::Positional(vec![MySqlValue::Int(3), MySqlValue::Int(10)])
        );
        assert_eq!(MySqlParamStore::from_values(&[]).params(), Params::Empty);
    }
}
