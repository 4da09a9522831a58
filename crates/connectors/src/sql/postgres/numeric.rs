//! Binary `NUMERIC` codec at full precision.
//!
//! Wire layout: `ndigits: i16, weight: i16, sign: u16, dscale: u16`, then
//! `ndigits` base-10000 digits, most significant first. The value is
//! `sum(digit[i] * 10000^(weight - i))`.

use bigdecimal::{
    BigDecimal,
    num_bigint::{BigInt, Sign},
};
use bytes::{Buf, BufMut, BytesMut};
use std::error::Error;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type, accepts, to_sql_checked};

const SIGN_POSITIVE: u16 = 0x0000;
const SIGN_NEGATIVE: u16 = 0x4000;
const SIGN_NAN: u16 = 0xC000;
const GROUP: u32 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct PgNumeric(pub BigDecimal);

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, mut raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if raw.len() < 8 {
            return Err("numeric header is truncated".into());
        }
        let ndigits = raw.get_i16();
        let weight = raw.get_i16() as i64;
        let sign = raw.get_u16();
        let dscale = raw.get_u16() as i64;

        if sign == SIGN_NAN {
            return Err("NaN has no decimal representation".into());
        }
        if ndigits < 0 || raw.len() != ndigits as usize * 2 {
            return Err("numeric digit count does not match payload".into());
        }

        let mut acc = BigInt::from(0u32);
        for _ in 0..ndigits {
            let digit = raw.get_i16();
            if !(0..GROUP as i16).contains(&digit) {
                return Err(format!("numeric digit {digit} out of range").into());
            }
            acc = acc * GROUP + BigInt::from(digit);
        }
        if sign == SIGN_NEGATIVE {
            acc = -acc;
        }

        // Position of the last digit, in groups of four decimal places.
        let exponent = weight - ndigits as i64 + 1;
        let value = if exponent >= 0 {
            BigDecimal::new(acc * BigInt::from(GROUP).pow(exponent as u32), 0)
        } else {
            BigDecimal::new(acc, -exponent * 4)
        };
        Ok(PgNumeric(value.with_scale(dscale)))
    }

    accepts!(NUMERIC);
}

impl ToSql for PgNumeric {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        let (int, scale) = self.0.as_bigint_and_exponent();
        let (int, scale) = if scale < 0 {
            (int * BigInt::from(10u32).pow((-scale) as u32), 0)
        } else {
            (int, scale)
        };
        let dscale = u16::try_from(scale).map_err(|_| "numeric scale exceeds 65535")?;

        let (sign, mut digits) = int.to_radix_be(10);
        let scale = scale as usize;
        if digits.len() <= scale {
            let mut padded = vec![0u8; scale + 1 - digits.len()];
            padded.append(&mut digits);
            digits = padded;
        }

        let (whole, fraction) = digits.split_at(digits.len() - scale);
        let mut groups: Vec<i16> = Vec::new();
        let lead = (4 - whole.len() % 4) % 4;
        let whole_padded: Vec<u8> = std::iter::repeat_n(0, lead).chain(whole.iter().copied()).collect();
        for chunk in whole_padded.chunks(4) {
            groups.push(group_value(chunk));
        }
        let mut weight = groups.len() as i64 - 1;
        for chunk in fraction.chunks(4) {
            let mut chunk = chunk.to_vec();
            chunk.resize(4, 0);
            groups.push(group_value(&chunk));
        }

        let leading_zeros = groups.iter().take_while(|g| **g == 0).count();
        groups.drain(..leading_zeros);
        weight -= leading_zeros as i64;
        while groups.last() == Some(&0) {
            groups.pop();
        }

        let (weight, sign) = if groups.is_empty() {
            (0, SIGN_POSITIVE)
        } else if sign == Sign::Minus {
            (weight, SIGN_NEGATIVE)
        } else {
            (weight, SIGN_POSITIVE)
        };

        out.put_i16(i16::try_from(groups.len()).map_err(|_| "numeric has too many digits")?);
        out.put_i16(i16::try_from(weight).map_err(|_| "numeric weight out of range")?);
        out.put_u16(sign);
        out.put_u16(dscale);
        for group in groups {
            out.put_i16(group);
        }
        Ok(IsNull::No)
    }

    accepts!(NUMERIC);
    to_sql_checked!();
}

fn group_value(chunk: &[u8]) -> i16 {
    chunk.iter().fold(0i16, |acc, d| acc * 10 + *d as i16)
}
