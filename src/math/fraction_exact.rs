use anyhow::{Error, anyhow};
use fraction::{BigFraction, GenericFraction, Sign};
use num_bigint::ToBigUint;
use num_rational::Ratio;
use num_traits::ToPrimitive;
use std::{
    borrow::Borrow,
    cmp::Ordering,
    hash::Hash,
    iter::Sum,
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use super::{
    fraction::UInt,
    traits::{Infinite, One, Round, Signed, Zero},
};

#[derive(Clone)]
pub struct FractionExact(pub fraction::BigFraction);

impl FractionExact {
    pub fn is_sign_negative(&self) -> bool {
        self.0.is_sign_negative()
    }

    pub fn is_nan(&self) -> bool {
        self.0.is_nan()
    }

    pub fn sign(&self) -> Option<Sign> {
        self.0.sign()
    }

    /**
     * 1/self
     */
    pub fn recip(&self) -> Self {
        Self(self.0.recip())
    }

    /**
     * Closest double to this fraction. Infinite fractions map to the infinite doubles.
     */
    pub fn approximate(&self) -> f64 {
        if self.0.is_infinite() {
            if self.0.is_sign_negative() {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }
        } else {
            self.0.to_f64().unwrap_or(f64::NAN)
        }
    }

    /**
     * Exact value of a double. Infinite doubles map to the infinite fractions.
     */
    pub fn from_approximate(value: f64) -> Self {
        if value == f64::INFINITY {
            Self::infinity()
        } else if value == f64::NEG_INFINITY {
            Self::neg_infinity()
        } else {
            Self(BigFraction::from(value))
        }
    }
}

impl One for FractionExact {
    fn one() -> Self {
        Self(GenericFraction::Rational(Sign::Plus, num::One::one()))
    }

    fn is_one(&self) -> bool {
        fraction::One::is_one(&self.0)
    }
}

impl Zero for FractionExact {
    fn zero() -> Self {
        Self(GenericFraction::Rational(Sign::Plus, num::Zero::zero()))
    }

    fn is_zero(&self) -> bool {
        fraction::Zero::is_zero(&self.0)
    }
}

impl Signed for FractionExact {
    fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    fn is_positive(&self) -> bool {
        !self.0.is_zero() && fraction::Signed::is_positive(&self.0)
    }

    fn is_negative(&self) -> bool {
        !self.0.is_zero() && fraction::Signed::is_negative(&self.0)
    }
}

impl Infinite for FractionExact {
    fn infinity() -> Self {
        Self(BigFraction::infinity())
    }

    fn neg_infinity() -> Self {
        Self(BigFraction::neg_infinity())
    }

    fn is_infinite(&self) -> bool {
        self.0.is_infinite()
    }
}

impl Round for FractionExact {
    fn floor(&self) -> Self {
        Self(self.0.floor())
    }

    fn ceil(&self) -> Self {
        Self(self.0.ceil())
    }

    fn is_integer(&self) -> bool {
        match self.0.denom() {
            Some(denom) => num::One::is_one(denom),
            None => false,
        }
    }
}

impl FromStr for FractionExact {
    type Err = Error;

    fn from_str(s: &str) -> std::prelude::v1::Result<Self, Self::Err> {
        let value = BigFraction::from_str(s).map_err(|e| anyhow!("cannot parse fraction {}: {:?}", s, e))?;
        Ok(Self(value))
    }
}

impl From<&FractionExact> for FractionExact {
    fn from(value: &FractionExact) -> Self {
        value.clone()
    }
}

impl std::fmt::Display for FractionExact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::fmt::Debug for FractionExact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Exact ").field(&self.0).finish()
    }
}

impl Add<&FractionExact> for &FractionExact {
    type Output = FractionExact;

    fn add(self, rhs: &FractionExact) -> Self::Output {
        match (self, rhs) {
            (FractionExact(x), FractionExact(y)) => FractionExact(x.add(y)),
        }
    }
}

impl<T> AddAssign<T> for FractionExact
where
    T: Borrow<FractionExact>,
{
    fn add_assign(&mut self, rhs: T) {
        let rhs = rhs.borrow();
        match (self, rhs) {
            (FractionExact(x), FractionExact(y)) => x.add_assign(y),
        }
    }
}

impl Sub<&FractionExact> for &FractionExact {
    type Output = FractionExact;

    fn sub(self, rhs: &FractionExact) -> Self::Output {
        match (self, rhs) {
            (FractionExact(x), FractionExact(y)) => FractionExact(x.sub(y)),
        }
    }
}

impl<T> SubAssign<T> for FractionExact
where
    T: Borrow<FractionExact>,
{
    fn sub_assign(&mut self, rhs: T) {
        let rhs = rhs.borrow();
        match (self, rhs) {
            (FractionExact(x), FractionExact(y)) => x.sub_assign(y),
        }
    }
}

impl Mul<&FractionExact> for &FractionExact {
    type Output = FractionExact;

    fn mul(self, rhs: &FractionExact) -> Self::Output {
        match (self, rhs) {
            (FractionExact(x), FractionExact(y)) => FractionExact(x.mul(y)),
        }
    }
}

impl<T> MulAssign<T> for FractionExact
where
    T: Borrow<FractionExact>,
{
    fn mul_assign(&mut self, rhs: T) {
        let rhs = rhs.borrow();
        match (self, rhs) {
            (FractionExact(x), FractionExact(y)) => x.mul_assign(y),
        }
    }
}

impl Div<&FractionExact> for &FractionExact {
    type Output = FractionExact;

    fn div(self, rhs: &FractionExact) -> Self::Output {
        match (self, rhs) {
            (FractionExact(x), FractionExact(y)) => FractionExact(x.div(y)),
        }
    }
}

impl<T> DivAssign<T> for FractionExact
where
    T: Borrow<FractionExact>,
{
    fn div_assign(&mut self, rhs: T) {
        let rhs = rhs.borrow();
        match (self, rhs) {
            (FractionExact(x), FractionExact(y)) => x.div_assign(y),
        }
    }
}

impl Neg for FractionExact {
    type Output = FractionExact;

    fn neg(self) -> Self::Output {
        FractionExact(self.0.neg())
    }
}

impl<'a> Neg for &'a FractionExact {
    type Output = FractionExact;

    fn neg(self) -> Self::Output {
        match self {
            FractionExact(f) => FractionExact(f.neg()),
        }
    }
}

impl PartialEq for FractionExact {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FractionExact(x), FractionExact(y)) => x == y,
        }
    }
}

impl Eq for FractionExact {}

impl PartialOrd for FractionExact {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FractionExact {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Hash for FractionExact {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            FractionExact(f) => f.hash(state),
        }
    }
}

impl Sum for FractionExact {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |sum, f| &sum + &f)
    }
}

impl<'a> Sum<&'a FractionExact> for FractionExact {
    fn sum<I: Iterator<Item = &'a FractionExact>>(iter: I) -> Self {
        iter.fold(FractionExact::zero(), |sum, f| &sum + f)
    }
}

//======================== primitive types ========================//

macro_rules! from {
    ($t:ident) => {
        impl From<$t> for FractionExact {
            fn from(value: $t) -> Self {
                Self(GenericFraction::Rational(
                    Sign::Plus,
                    Ratio::new(UInt::from(value), UInt::from(1u32)),
                ))
            }
        }
    };
}

macro_rules! from_signed {
    ($t:ident) => {
        impl From<$t> for FractionExact {
            fn from(value: $t) -> Self {
                Self(GenericFraction::Rational(
                    if value < 0 { Sign::Minus } else { Sign::Plus },
                    Ratio::new(UInt::from(value.unsigned_abs()), UInt::from(1u32)),
                ))
            }
        }
    };
}

macro_rules! from_tuple_i_i {
    ($t:ident,$tt:ident) => {
        impl From<($t, $tt)> for FractionExact {
            fn from(value: ($t, $tt)) -> Self {
                let s0 = if value.0 < 0 { Sign::Minus } else { Sign::Plus };
                let s1 = if value.1 < 0 { Sign::Minus } else { Sign::Plus };
                Self(GenericFraction::Rational(
                    s0 * s1,
                    Ratio::new(
                        UInt::from(value.0.unsigned_abs()),
                        UInt::from(value.1.unsigned_abs()),
                    ),
                ))
            }
        }
    };
}

macro_rules! from_tuple_u_u {
    ($t:ident,$tt:ident) => {
        impl From<($t, $tt)> for FractionExact {
            fn from(value: ($t, $tt)) -> Self {
                FractionExact(GenericFraction::Rational(
                    Sign::Plus,
                    Ratio::new(UInt::from(value.0), UInt::from(value.1)),
                ))
            }
        }
    };
}

from!(usize);
from!(u64);
from!(u32);
from_signed!(i64);
from_signed!(i32);
from_tuple_i_i!(i64, i64);
from_tuple_i_i!(i32, i32);
from_tuple_u_u!(u64, u64);
from_tuple_u_u!(usize, usize);

impl From<u128> for FractionExact {
    fn from(value: u128) -> Self {
        Self(GenericFraction::Rational(
            Sign::Plus,
            Ratio::new(value.to_biguint().unwrap_or_default(), UInt::from(1u32)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::{ops::Neg, str::FromStr};

    use crate::math::{
        fraction_exact::FractionExact,
        traits::{Infinite, One, Round, Signed, Zero},
    };

    #[test]
    fn fraction_neg() {
        let one = FractionExact::one();
        assert!(one.is_positive());
        let one = one.neg();
        assert!(one.is_negative());
    }

    #[test]
    fn fraction_rounding() {
        let x = FractionExact::from((-7i64, 2i64));
        assert_eq!(x.floor(), FractionExact::from(-4i64));
        assert_eq!(x.ceil(), FractionExact::from(-3i64));
        assert!(!x.is_integer());
        assert!(FractionExact::from(6i64).is_integer());
    }

    #[test]
    fn fraction_infinity() {
        let inf = FractionExact::infinity();
        assert!(inf.is_infinite());
        assert!(inf > FractionExact::from(1_000_000i64));
        assert!(FractionExact::neg_infinity() < FractionExact::zero());
        assert_eq!(inf.approximate(), f64::INFINITY);
    }

    #[test]
    fn fraction_parse() {
        let x = FractionExact::from_str("3/4").unwrap();
        assert_eq!(x, FractionExact::from((3i64, 4i64)));
        assert_eq!(FractionExact::from_approximate(0.5), FractionExact::from((1i64, 2i64)));
    }
}
