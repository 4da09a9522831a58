use crate::{
    core::value::Value,
    offset::{
        compare::{Insert, UniqueValues},
        error::OffsetError,
        kind::OffsetType,
    },
};
use bigdecimal::{BigDecimal, num_bigint::BigInt};
use chrono::{NaiveDate, NaiveTime};
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Source of synthetic values for one offset type.
pub trait ValueGenerator {
    fn offset_type(&self) -> OffsetType;

    fn next_value(&mut self) -> Value;
}

/// Reproducible generator driven by an explicitly seeded RNG.
pub struct SeededGenerator {
    offset_type: OffsetType,
    rng: SmallRng,
}

impl SeededGenerator {
    pub fn new(offset_type: OffsetType, seed: u64) -> Self {
        Self {
            offset_type,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn date(&mut self) -> NaiveDate {
        let year = self.rng.random_range(1990..2020);
        let month = self.rng.random_range(1..=12);
        let day = self.rng.random_range(1..=28);
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
    }

    fn time(&mut self) -> NaiveTime {
        NaiveTime::from_hms_milli_opt(
            self.rng.random_range(0..24),
            self.rng.random_range(0..60),
            self.rng.random_range(0..60),
            self.rng.random_range(0..1000),
        )
        .unwrap_or_default()
    }

    fn text(&mut self) -> String {
        uuid::Builder::from_random_bytes(self.rng.random())
            .into_uuid()
            .to_string()
    }
}

impl ValueGenerator for SeededGenerator {
    fn offset_type(&self) -> OffsetType {
        self.offset_type
    }

    fn next_value(&mut self) -> Value {
        match self.offset_type {
            OffsetType::Short => Value::SmallInt(self.rng.random_range(0..=i16::MAX)),
            OffsetType::Integer => Value::Int32(self.rng.random()),
            OffsetType::Long => Value::Int(self.rng.random()),
            OffsetType::Float => Value::Float32(self.rng.random()),
            OffsetType::Double => Value::Float(self.rng.random()),
            OffsetType::Decimal => {
                // up to 20 digits with 10 of them after the point
                let bound = 10_i128.pow(20);
                let digits = self.rng.random_range(-bound + 1..bound);
                Value::Decimal(BigDecimal::new(BigInt::from(digits), 10))
            }
            OffsetType::String => Value::String(self.text()),
            OffsetType::Char => {
                let mut text = self.text();
                text.truncate(8);
                Value::String(text)
            }
            OffsetType::Date => Value::Date(self.date()),
            OffsetType::Time => Value::Time(self.time()),
            OffsetType::DateTime => {
                let date = self.date();
                let time = self.time();
                Value::TimestampNaive(date.and_time(time))
            }
        }
    }
}

/// Draws `count` distinct values, regenerating on every collision, and
/// returns them in ascending order.
pub fn generate_unique<G: ValueGenerator + ?Sized>(
    generator: &mut G,
    count: usize,
) -> Result<Vec<Value>, OffsetError> {
    let offset_type = generator.offset_type();
    let mut values = UniqueValues::new(offset_type);
    let max_attempts = count.saturating_mul(100).max(1000);

    let mut attempts = 0;
    while values.len() < count {
        if attempts == max_attempts {
            return Err(OffsetError::Exhausted {
                offset_type,
                requested: count,
                produced: values.len(),
            });
        }
        attempts += 1;

        if values.insert(generator.next_value())? == Insert::AlreadyUsed {
            tracing::trace!(%offset_type, "Regenerating duplicate offset value");
        }
    }

    Ok(values.into_sorted())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset::codec;
    use chrono::Timelike;

    #[test]
    fn test_same_seed_same_values() {
        for kind in OffsetType::ALL {
            let mut a = SeededGenerator::new(kind, 42);
            let mut b = SeededGenerator::new(kind, 42);
            for _ in 0..20 {
                assert_eq!(a.next_value(), b.next_value());
            }
        }
    }

    #[test]
    fn test_generated_values_encode_for_their_type() {
        for kind in OffsetType::ALL {
            let mut generator = SeededGenerator::new(kind, 7);
            for _ in 0..50 {
                let value = generator.next_value();
                assert!(codec::encode(kind, &value).is_ok(), "{kind}: {value:?}");
            }
        }
    }

    #[test]
    fn test_temporal_shapes() {
        let mut dates = SeededGenerator::new(OffsetType::Date, 1);
        let mut datetimes = SeededGenerator::new(OffsetType::DateTime, 1);
        for _ in 0..50 {
            match dates.next_value() {
                Value::Date(d) => assert!((1990..2020).contains(&chrono::Datelike::year(&d))),
                other => panic!("{other:?}"),
            }
            match datetimes.next_value() {
                Value::TimestampNaive(dt) => assert_eq!(dt.nanosecond() % 1_000_000, 0),
                other => panic!("{other:?}"),
            }
        }
    }

    #[test]
    fn test_generate_unique_is_sorted_and_distinct() {
        let mut generator = SeededGenerator::new(OffsetType::Short, 3);
        let values = generate_unique(&mut generator, 500).unwrap();
        assert_eq!(values.len(), 500);
        for pair in values.windows(2) {
            assert!(pair[0].as_i64() < pair[1].as_i64());
        }
    }

    struct Constant;

    impl ValueGenerator for Constant {
        fn offset_type(&self) -> OffsetType {
            OffsetType::Integer
        }

        fn next_value(&mut self) -> Value {
            Value::Int32(1)
        }
    }

    #[test]
    fn test_generate_unique_gives_up_on_a_narrow_domain() {
        let err = generate_unique(&mut Constant, 2).unwrap_err();
        assert!(matches!(err, OffsetError::Exhausted { produced: 1, .. }));
    }
}
