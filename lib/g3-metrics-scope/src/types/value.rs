/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::ops;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Signed(i64),
    Double(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Signed(i) => *i as f64,
            MetricValue::Double(f) => *f,
        }
    }
}

impl Default for MetricValue {
    fn default() -> Self {
        MetricValue::Signed(0)
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(
            impl From<$t> for MetricValue {
                fn from(v: $t) -> Self {
                    MetricValue::Signed(i64::from(v))
                }
            }
        )*
    };
}

impl_from_signed!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => MetricValue::Signed(i),
            Err(_) => MetricValue::Double(v as f64),
        }
    }
}

impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        MetricValue::from(v as u64)
    }
}

impl From<f32> for MetricValue {
    fn from(v: f32) -> Self {
        MetricValue::Double(f64::from(v))
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Double(v)
    }
}

/// Render a double without a trailing `.0` when it holds an integer.
pub(crate) fn write_f64(f: &mut impl fmt::Write, v: f64) -> fmt::Result {
    // 2^53, the integer range a double represents exactly
    if v.fract() == 0.0 && v.abs() < 9007199254740992.0 {
        f.write_str(itoa::Buffer::new().format(v as i64))
    } else {
        f.write_str(ryu::Buffer::new().format(v))
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Signed(i) => f.write_str(itoa::Buffer::new().format(*i)),
            MetricValue::Double(v) => write_f64(f, *v),
        }
    }
}

impl ops::Add for MetricValue {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (MetricValue::Signed(i1), MetricValue::Signed(i2)) => match i1.checked_add(i2) {
                Some(i) => MetricValue::Signed(i),
                None => MetricValue::Double(i1 as f64 + i2 as f64),
            },
            (MetricValue::Signed(i1), MetricValue::Double(f2)) => {
                MetricValue::Double(i1 as f64 + f2)
            }
            (MetricValue::Double(f1), MetricValue::Signed(i2)) => {
                MetricValue::Double(f1 + i2 as f64)
            }
            (MetricValue::Double(f1), MetricValue::Double(f2)) => MetricValue::Double(f1 + f2),
        }
    }
}

impl ops::Neg for MetricValue {
    type Output = Self;

    fn neg(self) -> Self::Output {
        match self {
            MetricValue::Signed(i) => match i.checked_neg() {
                Some(i) => MetricValue::Signed(i),
                None => MetricValue::Double(-(i as f64)),
            },
            MetricValue::Double(f) => MetricValue::Double(-f),
        }
    }
}

impl ops::Sub for MetricValue {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self + (-rhs)
    }
}

impl ops::AddAssign for MetricValue {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl ops::SubAssign for MetricValue {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(MetricValue::Signed(-3).to_string(), "-3");
        assert_eq!(MetricValue::Double(1.0).to_string(), "1");
        assert_eq!(MetricValue::Double(-2.0).to_string(), "-2");
        assert_eq!(MetricValue::Double(0.5).to_string(), "0.5");
        assert_eq!(MetricValue::Double(12.25).to_string(), "12.25");
    }

    #[test]
    fn from_unsigned() {
        assert_eq!(MetricValue::from(7u64), MetricValue::Signed(7));
        assert_eq!(
            MetricValue::from(u64::MAX),
            MetricValue::Double(u64::MAX as f64)
        );
    }

    #[test]
    fn arithmetic() {
        let mut v = MetricValue::Signed(1);
        v += MetricValue::Signed(2);
        assert_eq!(v, MetricValue::Signed(3));
        v -= MetricValue::Signed(5);
        assert_eq!(v, MetricValue::Signed(-2));
        v += MetricValue::Double(0.5);
        assert_eq!(v, MetricValue::Double(-1.5));

        let v = MetricValue::Signed(i64::MAX) + MetricValue::Signed(1);
        assert!(matches!(v, MetricValue::Double(_)));
        assert_eq!(-MetricValue::Signed(4), MetricValue::Signed(-4));
    }
}
