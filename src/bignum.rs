//! Arbitrary-precision stack numbers and their canonical byte codec
//!
//! Every value on the interpreter stack is simultaneously a byte string and
//! a signed big integer. The integer form is little-endian magnitude bytes
//! with the sign carried in the most significant bit of the last byte: if
//! the magnitude alone would set that bit, an extra byte is appended to hold
//! it. The empty byte string encodes zero.

use std::cmp::Ordering;
use std::ops::{Add, Neg, Sub};

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};

use crate::constants::MAX_SHIFT_BITS;
use crate::error::{Result, ScriptError};

/// A script number backed by a big integer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScriptNum(BigInt);

impl ScriptNum {
    pub fn zero() -> Self {
        ScriptNum(BigInt::zero())
    }

    /// Decode the little-endian sign-magnitude form. The empty string is zero.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return ScriptNum(BigInt::zero());
        }
        let negative = bytes[bytes.len() - 1] & 0x80 != 0;
        let mut magnitude = bytes.to_vec();
        let last = magnitude.len() - 1;
        magnitude[last] &= 0x7f;
        let value = BigInt::from_bytes_le(Sign::Plus, &magnitude);
        ScriptNum(if negative { -value } else { value })
    }

    /// Encode as little-endian magnitude with a trailing sign bit.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.0.is_zero() {
            return Vec::new();
        }
        let (sign, mut bytes) = self.0.to_bytes_le();
        // The top magnitude bit doubles as the sign bit, so a set bit forces
        // an extra byte.
        if bytes[bytes.len() - 1] & 0x80 != 0 {
            bytes.push(0);
        }
        if sign == Sign::Minus {
            let last = bytes.len() - 1;
            bytes[last] |= 0x80;
        }
        bytes
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Clamp to the 32-bit integer range, matching the original `getint`.
    pub fn to_int(&self) -> i32 {
        match self.0.to_i32() {
            Some(n) => n,
            None => {
                if self.0.is_negative() {
                    i32::MIN
                } else {
                    i32::MAX
                }
            }
        }
    }

    pub fn abs(&self) -> Self {
        ScriptNum(self.0.abs())
    }

    pub fn mul(&self, other: &Self) -> Self {
        ScriptNum(&self.0 * &other.0)
    }

    /// Euclidean-style division truncating toward zero; division by zero is
    /// an arithmetic-domain error.
    pub fn div(&self, other: &Self) -> Result<Self> {
        if other.0.is_zero() {
            return Err(ScriptError::ArithmeticDomain("division by zero".to_string()));
        }
        Ok(ScriptNum(&self.0 / &other.0))
    }

    /// Remainder of [`div`](Self::div); takes the dividend's sign.
    pub fn rem(&self, other: &Self) -> Result<Self> {
        if other.0.is_zero() {
            return Err(ScriptError::ArithmeticDomain("remainder by zero".to_string()));
        }
        Ok(ScriptNum(&self.0 % &other.0))
    }

    fn shift_count(count: &Self) -> Result<usize> {
        if count.0.is_negative() {
            return Err(ScriptError::ArithmeticDomain("negative shift count".to_string()));
        }
        match count.0.to_usize() {
            Some(n) if n <= MAX_SHIFT_BITS => Ok(n),
            _ => Err(ScriptError::ArithmeticDomain("shift count too large".to_string())),
        }
    }

    pub fn shl(&self, count: &Self) -> Result<Self> {
        let n = Self::shift_count(count)?;
        Ok(ScriptNum(&self.0 << n))
    }

    /// Logical right shift of the magnitude; the sign is preserved, so
    /// `-5 >> 1 == -2` rather than the floor of `-2.5`.
    pub fn shr(&self, count: &Self) -> Result<Self> {
        let n = Self::shift_count(count)?;
        let shifted = self.0.abs() >> n;
        Ok(ScriptNum(if self.0.is_negative() { -shifted } else { shifted }))
    }

    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }

    pub fn cmp_value(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl From<i64> for ScriptNum {
    fn from(n: i64) -> Self {
        ScriptNum(BigInt::from(n))
    }
}

impl From<usize> for ScriptNum {
    fn from(n: usize) -> Self {
        ScriptNum(BigInt::from(n))
    }
}

impl From<bool> for ScriptNum {
    fn from(b: bool) -> Self {
        ScriptNum(BigInt::from(b as u8))
    }
}

impl Add for ScriptNum {
    type Output = ScriptNum;

    fn add(self, rhs: ScriptNum) -> ScriptNum {
        ScriptNum(self.0 + rhs.0)
    }
}

impl Sub for ScriptNum {
    type Output = ScriptNum;

    fn sub(self, rhs: ScriptNum) -> ScriptNum {
        ScriptNum(self.0 - rhs.0)
    }
}

impl Neg for ScriptNum {
    type Output = ScriptNum;

    fn neg(self) -> ScriptNum {
        ScriptNum(-self.0)
    }
}
