use crate::{
    core::value::Value,
    offset::{codec, error::OffsetError, kind::OffsetType, token::OffsetToken},
};
use std::cmp::Ordering;

/// Total order over values of one offset type.
///
/// Both sides are normalized to the canonical variant first, so an `Int32`
/// and an `Int` holding the same number compare equal under `Long`. Floats
/// use the IEEE total order; strings compare byte-wise, which only
/// approximates the database collation.
pub fn compare(offset_type: OffsetType, a: &Value, b: &Value) -> Result<Ordering, OffsetError> {
    let a = codec::normalize(offset_type, a)?;
    let b = codec::normalize(offset_type, b)?;
    let ordering = match (&a, &b) {
        (Value::SmallInt(x), Value::SmallInt(y)) => x.cmp(y),
        (Value::Int32(x), Value::Int32(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Float32(x), Value::Float32(y)) => x.total_cmp(y),
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        (Value::Decimal(x), Value::Decimal(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Time(x), Value::Time(y)) => x.cmp(y),
        (Value::TimestampNaive(x), Value::TimestampNaive(y)) => x.cmp(y),
        _ => {
            return Err(OffsetError::TypeMismatch {
                expected: offset_type,
                found: format!("{} and {}", a.data_type(), b.data_type()),
            });
        }
    };
    Ok(ordering)
}

/// Orders two tokens of the same type. The start token sorts before every
/// other token; opaque tokens are decoded first.
pub fn compare_tokens(
    offset_type: OffsetType,
    a: &OffsetToken,
    b: &OffsetToken,
) -> Result<Ordering, OffsetError> {
    match (a, b) {
        (OffsetToken::Start, OffsetToken::Start) => Ok(Ordering::Equal),
        (OffsetToken::Start, OffsetToken::At(_)) => Ok(Ordering::Less),
        (OffsetToken::At(_), OffsetToken::Start) => Ok(Ordering::Greater),
        (OffsetToken::At(x), OffsetToken::At(y)) if offset_type.is_lexical() => {
            Ok(x.as_bytes().cmp(y.as_bytes()))
        }
        (OffsetToken::At(x), OffsetToken::At(y)) => compare(
            offset_type,
            &codec::decode_str(offset_type, x)?,
            &codec::decode_str(offset_type, y)?,
        ),
    }
}

/// Outcome of offering a value to [`UniqueValues`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    Inserted,
    /// An equal value is already present; the producer should regenerate.
    AlreadyUsed,
}

/// Sorted set of offset values ordered by [`compare`].
#[derive(Debug, Clone)]
pub struct UniqueValues {
    offset_type: OffsetType,
    values: Vec<Value>,
}

impl UniqueValues {
    pub fn new(offset_type: OffsetType) -> Self {
        Self {
            offset_type,
            values: Vec::new(),
        }
    }

    pub fn insert(&mut self, value: Value) -> Result<Insert, OffsetError> {
        let value = codec::normalize(self.offset_type, &value)?;
        match self.position(&value)? {
            Ok(_) => Ok(Insert::AlreadyUsed),
            Err(index) => {
                self.values.insert(index, value);
                Ok(Insert::Inserted)
            }
        }
    }

    pub fn contains(&self, value: &Value) -> Result<bool, OffsetError> {
        Ok(self.position(value)?.is_ok())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in ascending order.
    pub fn into_sorted(self) -> Vec<Value> {
        self.values
    }

    fn position(&self, value: &Value) -> Result<Result<usize, usize>, OffsetError> {
        let mut failure = None;
        let found = self.values.binary_search_by(|candidate| {
            compare(self.offset_type, candidate, value).unwrap_or_else(|e| {
                failure.get_or_insert(e);
                Ordering::Equal
            })
        });
        match failure {
            Some(e) => Err(e),
            None => Ok(found),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;

    #[test]
    fn test_compare_across_integer_widths() {
        assert_eq!(
            compare(OffsetType::Long, &Value::Int32(5), &Value::Int(5)).unwrap(),
            Ordering::Equal
        );
        assert_eq!(
            compare(OffsetType::Short, &Value::SmallInt(-1), &Value::SmallInt(1)).unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn test_decimal_scale_does_not_matter() {
        let a = Value::Decimal(BigDecimal::from_str("1.50").unwrap());
        let b = Value::Decimal(BigDecimal::from_str("1.5").unwrap());
        assert_eq!(compare(OffsetType::Decimal, &a, &b).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_opaque_tokens_compare_by_value() {
        // lexically "9" > "10", numerically the other way round
        let nine = OffsetToken::at("9");
        let ten = OffsetToken::at("10");
        assert_eq!(
            compare_tokens(OffsetType::Long, &nine, &ten).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare_tokens(OffsetType::String, &nine, &ten).unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn test_start_token_sorts_first() {
        assert_eq!(
            compare_tokens(OffsetType::Long, &OffsetToken::Start, &OffsetToken::at("-999")).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare_tokens(OffsetType::String, &OffsetToken::at(""), &OffsetToken::Start).unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn test_malformed_token_fails_comparison() {
        assert!(compare_tokens(OffsetType::Date, &OffsetToken::at("x"), &OffsetToken::at("1")).is_err());
    }

    #[test]
    fn test_unique_values_reports_collisions() {
        let mut set = UniqueValues::new(OffsetType::Date);
        let d = NaiveDate::from_ymd_opt(2001, 2, 3).unwrap();
        assert_eq!(set.insert(Value::Date(d)).unwrap(), Insert::Inserted);
        // the same day as a date-time collides once normalized
        let dt = Value::TimestampNaive(d.and_hms_opt(10, 0, 0).unwrap());
        assert_eq!(set.insert(dt).unwrap(), Insert::AlreadyUsed);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_unique_values_are_kept_sorted() {
        let mut set = UniqueValues::new(OffsetType::Integer);
        for v in [20, 5, 12, 7] {
            set.insert(Value::Int32(v)).unwrap();
        }
        assert!(set.contains(&Value::Int32(12)).unwrap());
        assert_eq!(
            set.into_sorted(),
            vec![Value::Int32(5), Value::Int32(7), Value::Int32(12), Value::Int32(20)]
        );
    }
}
