use fraction::BigFraction;
use num::{Float, One as NumOne, Signed as NumSigned, Zero as NumZero};

pub trait One: Sized {
    fn one() -> Self;

    fn set_one(&mut self) {
        *self = One::one();
    }

    fn is_one(&self) -> bool;
}

pub trait Zero: Sized {
    fn zero() -> Self;

    fn set_zero(&mut self) {
        *self = Zero::zero();
    }

    fn is_zero(&self) -> bool;
}

pub trait Signed: Sized {
    fn abs(&self) -> Self;

    /// Returns true if the number is positive and false if the number is zero or negative.
    fn is_positive(&self) -> bool;

    /// Returns true if the number is negative and false if the number is zero or positive.
    fn is_negative(&self) -> bool;
}

pub trait Infinite: Sized {
    fn infinity() -> Self;

    fn neg_infinity() -> Self;

    /// Returns true if the value is infinite, regardless of its sign.
    fn is_infinite(&self) -> bool;

    fn is_finite(&self) -> bool {
        !self.is_infinite()
    }
}

pub trait Round: Sized {
    fn floor(&self) -> Self;

    fn ceil(&self) -> Self;

    fn is_integer(&self) -> bool;
}

// ============ implementations ============

impl One for f64 {
    fn one() -> Self {
        1.0
    }

    /// Exact comparison: tolerances are applied by the caller.
    fn is_one(&self) -> bool {
        *self == 1.0
    }
}

impl Zero for f64 {
    fn zero() -> Self {
        0.0
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl Signed for f64 {
    fn abs(&self) -> Self {
        <f64 as Float>::abs(*self)
    }

    fn is_positive(&self) -> bool {
        *self > 0.0
    }

    fn is_negative(&self) -> bool {
        *self < 0.0
    }
}

impl Infinite for f64 {
    fn infinity() -> Self {
        f64::INFINITY
    }

    fn neg_infinity() -> Self {
        f64::NEG_INFINITY
    }

    fn is_infinite(&self) -> bool {
        <f64 as Float>::is_infinite(*self)
    }
}

impl Round for f64 {
    fn floor(&self) -> Self {
        <f64 as Float>::floor(*self)
    }

    fn ceil(&self) -> Self {
        <f64 as Float>::ceil(*self)
    }

    fn is_integer(&self) -> bool {
        <f64 as Float>::fract(*self) == 0.0
    }
}

impl Zero for BigFraction {
    fn zero() -> Self {
        <BigFraction as NumZero>::zero()
    }

    fn is_zero(&self) -> bool {
        <BigFraction as NumZero>::is_zero(self)
    }
}

impl One for BigFraction {
    fn one() -> Self {
        <BigFraction as NumOne>::one()
    }

    fn is_one(&self) -> bool {
        <BigFraction as NumOne>::is_one(self)
    }
}

impl Signed for BigFraction {
    fn abs(&self) -> Self {
        <BigFraction as NumSigned>::abs(self)
    }

    fn is_positive(&self) -> bool {
        !<BigFraction as NumZero>::is_zero(self) && <BigFraction as NumSigned>::is_positive(self)
    }

    fn is_negative(&self) -> bool {
        !<BigFraction as NumZero>::is_zero(self) && <BigFraction as NumSigned>::is_negative(self)
    }
}

macro_rules! ttype {
    ($t:ident) => {
        impl Zero for $t {
            fn zero() -> Self {
                0
            }

            fn is_zero(&self) -> bool {
                num::Zero::is_zero(self)
            }
        }

        impl One for $t {
            fn one() -> Self {
                1
            }

            fn is_one(&self) -> bool {
                num::One::is_one(self)
            }
        }
    };
}

ttype!(usize);
ttype!(u64);
ttype!(i64);
