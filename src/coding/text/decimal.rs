//! Fixed-point decimal numbers of arbitrary precision.
//!
//! A [`FixedDecimal`] is a non-negative value `mantissa / 10^scale`. All
//! operations between two values assume the same scale and truncate toward
//! zero, which keeps results exactly reproducible: an encoder and a decoder
//! running the same sequence of operations at the same scale compute
//! bit-identical intervals.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::Zero;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

fn pow10(exp: u32) -> BigUint {
    num_traits::pow(BigUint::from(10u32), exp as usize)
}

#[derive(Debug, Clone)]
pub struct FixedDecimal {
    mantissa: BigUint,
    scale: u32,
}

impl FixedDecimal {
    pub fn new(mantissa: BigUint, scale: u32) -> Self {
        Self { mantissa, scale }
    }

    pub fn zero(scale: u32) -> Self {
        Self::new(BigUint::zero(), scale)
    }

    pub fn one(scale: u32) -> Self {
        Self::new(pow10(scale), scale)
    }

    /// `numerator / denominator` truncated to `scale` digits.
    ///
    /// # Panics
    ///
    /// Panics if `denominator` is zero.
    pub fn from_ratio(numerator: usize, denominator: usize, scale: u32) -> Self {
        let mantissa = BigUint::from(numerator) * pow10(scale) / BigUint::from(denominator);
        Self::new(mantissa, scale)
    }

    pub fn mantissa(&self) -> &BigUint {
        &self.mantissa
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// Change the number of fractional digits, truncating when shrinking.
    pub fn rescale(&self, scale: u32) -> Self {
        let mantissa = match scale.cmp(&self.scale) {
            Ordering::Equal => self.mantissa.clone(),
            Ordering::Greater => &self.mantissa * pow10(scale - self.scale),
            Ordering::Less => &self.mantissa / pow10(self.scale - scale),
        };
        Self::new(mantissa, scale)
    }

    /// Product truncated to the common scale.
    pub fn mul_trunc(&self, other: &Self) -> Self {
        debug_assert_eq!(self.scale, other.scale);
        let mantissa = (&self.mantissa * &other.mantissa) / pow10(self.scale);
        Self::new(mantissa, self.scale)
    }

    /// `(self + other) / 2`, truncated.
    pub fn midpoint(&self, other: &Self) -> Self {
        debug_assert_eq!(self.scale, other.scale);
        let sum = &self.mantissa + &other.mantissa;
        Self::new(sum >> 1usize, self.scale)
    }
}

impl<'a> Add<&'a FixedDecimal> for &'a FixedDecimal {
    type Output = FixedDecimal;

    fn add(self, rhs: &'a FixedDecimal) -> FixedDecimal {
        debug_assert_eq!(self.scale, rhs.scale);
        FixedDecimal::new(&self.mantissa + &rhs.mantissa, self.scale)
    }
}

impl<'a> Sub<&'a FixedDecimal> for &'a FixedDecimal {
    type Output = FixedDecimal;

    /// # Panics
    ///
    /// Panics if the result would be negative.
    fn sub(self, rhs: &'a FixedDecimal) -> FixedDecimal {
        debug_assert_eq!(self.scale, rhs.scale);
        FixedDecimal::new(&self.mantissa - &rhs.mantissa, self.scale)
    }
}

impl Ord for FixedDecimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.scale.cmp(&other.scale) {
            Ordering::Equal => self.mantissa.cmp(&other.mantissa),
            Ordering::Less => {
                (&self.mantissa * pow10(other.scale - self.scale)).cmp(&other.mantissa)
            }
            Ordering::Greater => self
                .mantissa
                .cmp(&(&other.mantissa * pow10(self.scale - other.scale))),
        }
    }
}

// Equality agrees with ordering: 0.5 and 0.50 are equal.
impl PartialEq for FixedDecimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FixedDecimal {}

impl PartialOrd for FixedDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let (int_part, frac_part) = self.mantissa.div_rem(&pow10(self.scale));
        write!(
            f,
            "{}.{:0>width$}",
            int_part,
            frac_part.to_string(),
            width = self.scale as usize
        )
    }
}

impl FromStr for FixedDecimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (int_digits, frac_digits) = s.split_once('.').unwrap_or((s, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (int_digits.is_empty() && frac_digits.is_empty())
            || !all_digits(int_digits)
            || !all_digits(frac_digits)
        {
            return Err(Error::ParseDecimal(s.to_string()));
        }

        let digits = format!("{}{}", int_digits, frac_digits);
        let mantissa = BigUint::parse_bytes(digits.as_bytes(), 10)
            .ok_or_else(|| Error::ParseDecimal(s.to_string()))?;
        let scale = u32::try_from(frac_digits.len())
            .map_err(|_| Error::ParseDecimal(s.to_string()))?;
        Ok(Self::new(mantissa, scale))
    }
}

impl Serialize for FixedDecimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct FixedDecimalVisitor;

impl Visitor<'_> for FixedDecimalVisitor {
    type Value = FixedDecimal;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a non-negative decimal literal")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FixedDecimal, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<FixedDecimal, E> {
        Ok(FixedDecimal::new(BigUint::from(v), 0))
    }
}

impl<'de> Deserialize<'de> for FixedDecimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FixedDecimalVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_and_display() {
        let half = FixedDecimal::from_ratio(1, 2, 4);
        assert_eq!(half.to_string(), "0.5000");
        let third = FixedDecimal::from_ratio(1, 3, 6);
        assert_eq!(third.to_string(), "0.333333");
        assert_eq!(FixedDecimal::one(3).to_string(), "1.000");
        assert_eq!(FixedDecimal::zero(0).to_string(), "0");
    }

    #[test]
    fn test_small_value_keeps_leading_zeros() {
        let tiny = FixedDecimal::new(BigUint::from(42u32), 5);
        assert_eq!(tiny.to_string(), "0.00042");
    }

    #[test]
    fn test_arithmetic_truncates() {
        let third = FixedDecimal::from_ratio(1, 3, 4);
        let product = third.mul_trunc(&third);
        // 0.3333 * 0.3333 = 0.11108889 -> 0.1110
        assert_eq!(product.to_string(), "0.1110");
        let sum = &third + &third;
        assert_eq!(sum.to_string(), "0.6666");
        let diff = &FixedDecimal::one(4) - &third;
        assert_eq!(diff.to_string(), "0.6667");
        assert_eq!(third.midpoint(&FixedDecimal::one(4)).to_string(), "0.6666");
    }

    #[test]
    fn test_parse_round_trip() {
        let value: FixedDecimal = "0.0012500".parse().unwrap();
        assert_eq!(value.scale(), 7);
        assert_eq!(value.to_string(), "0.0012500");
        let whole: FixedDecimal = "12".parse().unwrap();
        assert_eq!(whole.scale(), 0);
        assert!("".parse::<FixedDecimal>().is_err());
        assert!("0.1.2".parse::<FixedDecimal>().is_err());
        assert!("-0.5".parse::<FixedDecimal>().is_err());
        assert!("abc".parse::<FixedDecimal>().is_err());
    }

    #[test]
    fn test_ordering_across_scales() {
        let a: FixedDecimal = "0.5".parse().unwrap();
        let b: FixedDecimal = "0.49999".parse().unwrap();
        let c: FixedDecimal = "0.50000".parse().unwrap();
        assert!(a > b);
        assert_eq!(a.cmp(&c), Ordering::Equal);
        assert_eq!(a.rescale(5), c);
        assert_eq!(c.rescale(1), a);
    }

    #[test]
    fn test_serde_as_string() {
        let value = FixedDecimal::from_ratio(3, 8, 10);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"0.3750000000\"");
        let back: FixedDecimal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
