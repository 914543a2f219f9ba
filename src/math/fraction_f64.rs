use std::{
    borrow::Borrow,
    cmp::Ordering,
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use anyhow::{Error, Result};

use super::traits::{Infinite, One, Round, Signed, Zero};

/**
 * Approximate arithmetic. Comparisons are exact; tolerances are the business of the caller.
 */
#[derive(Debug, Clone, Copy, Default)]
pub struct FractionF64(pub f64);

impl FractionF64 {
    pub fn is_nan(&self) -> bool {
        self.0.is_nan()
    }

    /**
     * 1/self
     */
    pub fn recip(&self) -> Self {
        Self(self.0.recip())
    }
}

impl Display for FractionF64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<f64> for FractionF64 {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<i64> for FractionF64 {
    fn from(value: i64) -> Self {
        Self(value as f64)
    }
}

impl FromStr for FractionF64 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self(f64::from_str(s)?))
    }
}

impl One for FractionF64 {
    fn one() -> Self {
        Self(1.0)
    }

    fn is_one(&self) -> bool {
        self.0 == 1.0
    }
}

impl Zero for FractionF64 {
    fn zero() -> Self {
        Self(0.0)
    }

    fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

impl Signed for FractionF64 {
    fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    fn is_positive(&self) -> bool {
        self.0 > 0.0
    }

    fn is_negative(&self) -> bool {
        self.0 < 0.0
    }
}

impl Infinite for FractionF64 {
    fn infinity() -> Self {
        Self(f64::INFINITY)
    }

    fn neg_infinity() -> Self {
        Self(f64::NEG_INFINITY)
    }

    fn is_infinite(&self) -> bool {
        self.0.is_infinite()
    }
}

impl Round for FractionF64 {
    fn floor(&self) -> Self {
        Self(self.0.floor())
    }

    fn ceil(&self) -> Self {
        Self(self.0.ceil())
    }

    fn is_integer(&self) -> bool {
        self.0.fract() == 0.0
    }
}

impl PartialEq for FractionF64 {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for FractionF64 {}

impl PartialOrd for FractionF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FractionF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        //signed zeros compare equal; NaN is ordered last
        self.0
            .partial_cmp(&other.0)
            .unwrap_or_else(|| self.0.total_cmp(&other.0))
    }
}

impl Add<&FractionF64> for &FractionF64 {
    type Output = FractionF64;

    fn add(self, rhs: &FractionF64) -> Self::Output {
        FractionF64(self.0 + rhs.0)
    }
}

impl<T> AddAssign<T> for FractionF64
where
    T: Borrow<FractionF64>,
{
    fn add_assign(&mut self, rhs: T) {
        self.0 += rhs.borrow().0
    }
}

impl Sub<&FractionF64> for &FractionF64 {
    type Output = FractionF64;

    fn sub(self, rhs: &FractionF64) -> Self::Output {
        FractionF64(self.0 - rhs.0)
    }
}

impl<T> SubAssign<T> for FractionF64
where
    T: Borrow<FractionF64>,
{
    fn sub_assign(&mut self, rhs: T) {
        self.0 -= rhs.borrow().0
    }
}

impl Mul<&FractionF64> for &FractionF64 {
    type Output = FractionF64;

    fn mul(self, rhs: &FractionF64) -> Self::Output {
        FractionF64(self.0 * rhs.0)
    }
}

impl<T> MulAssign<T> for FractionF64
where
    T: Borrow<FractionF64>,
{
    fn mul_assign(&mut self, rhs: T) {
        self.0 *= rhs.borrow().0
    }
}

impl Div<&FractionF64> for &FractionF64 {
    type Output = FractionF64;

    fn div(self, rhs: &FractionF64) -> Self::Output {
        FractionF64(self.0 / rhs.0)
    }
}

impl<T> DivAssign<T> for FractionF64
where
    T: Borrow<FractionF64>,
{
    fn div_assign(&mut self, rhs: T) {
        self.0 /= rhs.borrow().0
    }
}

impl Neg for FractionF64 {
    type Output = FractionF64;

    fn neg(self) -> Self::Output {
        FractionF64(-self.0)
    }
}

impl<'a> Neg for &'a FractionF64 {
    type Output = FractionF64;

    fn neg(self) -> Self::Output {
        FractionF64(-self.0)
    }
}

impl Sum for FractionF64 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |sum, f| &sum + &f)
    }
}

impl<'a> Sum<&'a FractionF64> for FractionF64 {
    fn sum<I: Iterator<Item = &'a FractionF64>>(iter: I) -> Self {
        iter.fold(FractionF64::zero(), |sum, f| &sum + f)
    }
}
