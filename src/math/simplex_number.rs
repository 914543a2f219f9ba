use std::{
    fmt::{Debug, Display},
    ops::{AddAssign, DivAssign, MulAssign, Neg, SubAssign},
};

use super::{
    fraction_exact::FractionExact,
    fraction_f64::FractionF64,
    traits::{Infinite, One, Round, Signed, Zero},
};

/**
 * The arithmetic the simplex engines are generic over. There are two instantiations:
 * `FractionExact` (arbitrary precision, every tolerance is zero) and `FractionF64`
 * (doubles, tolerance guarded, products slammed to zero below a relative epsilon).
 */
pub trait SimplexNumber:
    Clone
    + Debug
    + Display
    + Eq
    + Ord
    + Send
    + Sync
    + 'static
    + Zero
    + One
    + Signed
    + Infinite
    + Round
    + Neg<Output = Self>
    + for<'a> AddAssign<&'a Self>
    + for<'a> SubAssign<&'a Self>
    + for<'a> MulAssign<&'a Self>
    + for<'a> DivAssign<&'a Self>
{
    const EXACT: bool;

    /// A tolerance of the given size; exact arithmetic has no tolerances.
    fn tolerance(value: f64) -> Self;

    /// Picks the representation of a matrix coefficient that belongs to this arithmetic.
    fn from_coefficient(exact: &FractionExact, approx: f64) -> Self;

    fn from_i64(value: i64) -> Self;

    fn to_exact(&self) -> FractionExact;

    fn approximate(&self) -> f64;

    /// False for results that carry no information anymore (NaN).
    fn is_valid(&self) -> bool {
        true
    }

    fn plus(&self, rhs: &Self) -> Self;

    fn minus(&self, rhs: &Self) -> Self;

    fn times(&self, rhs: &Self) -> Self;

    fn over(&self, rhs: &Self) -> Self;

    /// self += a * b
    fn add_product(&mut self, a: &Self, b: &Self);

    /// self -= a * b, where a result that is negligible relative to its operands becomes zero
    fn sub_product(&mut self, a: &Self, b: &Self, num_eps: f64);

    /// |self| <= tolerance
    fn is_negligible(&self, tolerance: &Self) -> bool {
        &self.abs() <= tolerance
    }

    /// Distance to the nearest integer below.
    fn fractional_part(&self) -> Self {
        self.minus(&self.floor())
    }
}

impl SimplexNumber for FractionExact {
    const EXACT: bool = true;

    fn tolerance(_value: f64) -> Self {
        Self::zero()
    }

    fn from_coefficient(exact: &FractionExact, _approx: f64) -> Self {
        exact.clone()
    }

    fn from_i64(value: i64) -> Self {
        Self::from(value)
    }

    fn to_exact(&self) -> FractionExact {
        self.clone()
    }

    fn approximate(&self) -> f64 {
        FractionExact::approximate(self)
    }

    fn plus(&self, rhs: &Self) -> Self {
        self + rhs
    }

    fn minus(&self, rhs: &Self) -> Self {
        self - rhs
    }

    fn times(&self, rhs: &Self) -> Self {
        self * rhs
    }

    fn over(&self, rhs: &Self) -> Self {
        self / rhs
    }

    fn add_product(&mut self, a: &Self, b: &Self) {
        *self += a * b;
    }

    fn sub_product(&mut self, a: &Self, b: &Self, _num_eps: f64) {
        *self -= a * b;
    }
}

impl SimplexNumber for FractionF64 {
    const EXACT: bool = false;

    fn tolerance(value: f64) -> Self {
        Self(value)
    }

    fn from_coefficient(_exact: &FractionExact, approx: f64) -> Self {
        Self(approx)
    }

    fn from_i64(value: i64) -> Self {
        Self(value as f64)
    }

    fn to_exact(&self) -> FractionExact {
        FractionExact::from_approximate(self.0)
    }

    fn approximate(&self) -> f64 {
        self.0
    }

    fn is_valid(&self) -> bool {
        !self.0.is_nan()
    }

    fn plus(&self, rhs: &Self) -> Self {
        self + rhs
    }

    fn minus(&self, rhs: &Self) -> Self {
        self - rhs
    }

    fn times(&self, rhs: &Self) -> Self {
        self * rhs
    }

    fn over(&self, rhs: &Self) -> Self {
        self / rhs
    }

    fn add_product(&mut self, a: &Self, b: &Self) {
        self.0 += a.0 * b.0;
    }

    fn sub_product(&mut self, a: &Self, b: &Self, num_eps: f64) {
        let product = a.0 * b.0;
        let result = self.0 - product;
        if result.abs() <= num_eps * self.0.abs().max(product.abs()) {
            self.0 = 0.0;
        } else {
            self.0 = result;
        }
    }
}
