pub type UInt = fraction::BigUint;

/**
 * Default relative epsilon below which approximate results are slammed to zero.
 */
pub const EPSILON: f64 = 1e-13;

/**
 * Exact fraction literal: `f!(3)` or `f!(3, 4)`.
 */
#[macro_export]
macro_rules! f {
    ($e: expr) => {
        $crate::math::fraction_exact::FractionExact::from($e)
    };

    ($e: expr, $f: expr) => {
        $crate::math::fraction_exact::FractionExact::from(($e, $f))
    };
}

/**
 * Exact zero.
 */
#[macro_export]
macro_rules! f0 {
    () => {
        <$crate::math::fraction_exact::FractionExact as $crate::math::traits::Zero>::zero()
    };
}

/**
 * Exact one.
 */
#[macro_export]
macro_rules! f1 {
    () => {
        <$crate::math::fraction_exact::FractionExact as $crate::math::traits::One>::one()
    };
}

/**
 * Exact infinity; `finf!(-)` for negative infinity.
 */
#[macro_export]
macro_rules! finf {
    () => {
        <$crate::math::fraction_exact::FractionExact as $crate::math::traits::Infinite>::infinity()
    };

    (-) => {
        <$crate::math::fraction_exact::FractionExact as $crate::math::traits::Infinite>::neg_infinity()
    };
}
