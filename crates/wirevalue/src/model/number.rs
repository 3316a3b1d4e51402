//! Arbitrary-precision decimal numbers.
//!
//! A [`Number`] is `mantissa * 10^exponent` with an unbounded integer
//! mantissa. Numbers are kept normalized (no trailing zeros in the mantissa,
//! zero has exponent 0) so structural equality is numeric equality.

use std::fmt;
use std::str::FromStr;

use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};

use crate::error::NumberError;
use crate::limits::MAX_NUMBER_EXPONENT;

/// An exact decimal number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Number {
    mantissa: BigInt,
    exponent: i64,
}

impl Number {
    /// Builds a number from a mantissa and base-10 exponent, normalizing it.
    pub fn from_parts(mantissa: BigInt, exponent: i64) -> Number {
        if mantissa.is_zero() {
            return Number::zero();
        }
        let mut mantissa = mantissa;
        let mut exponent = exponent;
        let ten = BigInt::from(10u8);
        while (&mantissa % &ten).is_zero() {
            mantissa /= &ten;
            exponent += 1;
        }
        Number { mantissa, exponent }
    }

    pub fn zero() -> Number {
        Number {
            mantissa: BigInt::zero(),
            exponent: 0,
        }
    }

    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.sign() == Sign::Minus
    }

    /// Returns true if the number has no fractional part.
    pub fn is_integer(&self) -> bool {
        self.exponent >= 0
    }

    /// Converts a finite float using its shortest round-trip decimal form.
    ///
    /// Returns `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Number> {
        if !value.is_finite() {
            return None;
        }
        format!("{value:e}").parse().ok()
    }

    /// Returns the value as an `i64` when it is an integer within range.
    pub fn to_i64(&self) -> Option<i64> {
        if self.exponent < 0 {
            return None;
        }
        // i64::MAX has 19 digits.
        if self.exponent > 19 {
            return None;
        }
        let scale = BigInt::from(10u8).pow(self.exponent as u32);
        (&self.mantissa * scale).to_i64()
    }

    /// Returns the nearest `f64`. Magnitudes beyond the float range become
    /// infinities.
    pub fn to_f64(&self) -> f64 {
        // Rust's float parser rounds decimal strings correctly.
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    /// Returns true if this number survives a trip through `f64` unchanged.
    pub fn is_exact_f64(&self) -> bool {
        Number::from_f64(self.to_f64()).as_ref() == Some(self)
    }

    /// Parses a decimal literal: optional sign, digits with an optional
    /// fraction, and an optional exponent (`-12.5e3`, `.5`, `7.`).
    pub fn parse(s: &str) -> Result<Number, NumberError> {
        let bytes = s.as_bytes();
        let mut pos = 0;

        let negative = match bytes.first() {
            Some(b'-') => {
                pos += 1;
                true
            }
            Some(b'+') => {
                pos += 1;
                false
            }
            _ => false,
        };

        let int_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        let int_digits = &s[int_start..pos];

        let mut frac_digits = "";
        if pos < bytes.len() && bytes[pos] == b'.' {
            pos += 1;
            let frac_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            frac_digits = &s[frac_start..pos];
        }
        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(NumberError::Invalid(s.to_string()));
        }

        let mut exponent: i64 = 0;
        if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
            pos += 1;
            let exp_negative = match bytes.get(pos) {
                Some(b'-') => {
                    pos += 1;
                    true
                }
                Some(b'+') => {
                    pos += 1;
                    false
                }
                _ => false,
            };
            let exp_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                let digit = (bytes[pos] - b'0') as i64;
                exponent = exponent
                    .checked_mul(10)
                    .and_then(|e| e.checked_add(digit))
                    .filter(|e| *e <= MAX_NUMBER_EXPONENT)
                    .ok_or_else(|| NumberError::ExponentOutOfRange(s.to_string()))?;
                pos += 1;
            }
            if pos == exp_start {
                return Err(NumberError::Invalid(s.to_string()));
            }
            if exp_negative {
                exponent = -exponent;
            }
        }
        if pos != bytes.len() {
            return Err(NumberError::Invalid(s.to_string()));
        }

        // Trailing zeros move into the exponent before the big-integer parse.
        let mut digits = String::with_capacity(int_digits.len() + frac_digits.len());
        digits.push_str(int_digits);
        digits.push_str(frac_digits);
        let trimmed = digits.trim_end_matches('0');
        let trailing = (digits.len() - trimmed.len()) as i64;
        let trimmed = trimmed.trim_start_matches('0');
        if trimmed.is_empty() {
            return Ok(Number::zero());
        }

        let exponent = exponent - frac_digits.len() as i64 + trailing;
        if exponent.abs() > MAX_NUMBER_EXPONENT {
            return Err(NumberError::ExponentOutOfRange(s.to_string()));
        }
        let mut mantissa = trimmed
            .parse::<BigInt>()
            .map_err(|_| NumberError::Invalid(s.to_string()))?;
        if negative {
            mantissa = -mantissa;
        }
        Ok(Number { mantissa, exponent })
    }
}

impl Default for Number {
    fn default() -> Self {
        Number::zero()
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::from_parts(BigInt::from(value), 0)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::from(value as i64)
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Number::from_parts(BigInt::from(value), 0)
    }
}

impl FromStr for Number {
    type Err = NumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Number::parse(s)
    }
}

impl fmt::Display for Number {
    /// Plain notation when the decimal point lands within a readable range,
    /// scientific notation (`1.5e+30`) otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mantissa.is_zero() {
            return f.write_str("0");
        }
        let digits = self.mantissa.magnitude().to_string();
        let sign = if self.is_negative() { "-" } else { "" };
        let len = digits.len() as i64;
        let point = len + self.exponent;

        if self.exponent >= 0 && point <= 21 {
            write!(f, "{sign}{digits}{}", "0".repeat(self.exponent as usize))
        } else if self.exponent < 0 && point > 0 {
            let (int, frac) = digits.split_at(point as usize);
            write!(f, "{sign}{int}.{frac}")
        } else if self.exponent < 0 && point > -6 {
            write!(f, "{sign}0.{}{digits}", "0".repeat((-point) as usize))
        } else {
            let (lead, rest) = digits.split_at(1);
            let exp = point - 1;
            let exp_sign = if exp < 0 { '-' } else { '+' };
            if rest.is_empty() {
                write!(f, "{sign}{lead}e{exp_sign}{}", exp.abs())
            } else {
                write!(f, "{sign}{lead}.{rest}e{exp_sign}{}", exp.abs())
            }
        }
    }
}
