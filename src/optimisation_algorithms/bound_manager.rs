use std::sync::Arc;

use log::trace;
use rustc_hash::FxHashMap;

use crate::math::simplex_number::SimplexNumber;

use super::basis::{Basis, VarStatus};

/**
 * Variable bounds of one solve context: sparse overrides on top of the immutable bounds of the model.
 * Cloning is cheap in the number of overrides; the base is shared.
 */
#[derive(Clone, Debug)]
pub struct BoundManager<T> {
    base_lower: Arc<Vec<T>>,
    base_upper: Arc<Vec<T>>,
    structural_count: usize,
    lower: FxHashMap<usize, T>,
    upper: FxHashMap<usize, T>,
    minor_pivots: usize,
}

impl<T: SimplexNumber> BoundManager<T> {
    /**
     * Variables `0..structural_count` are structural; variable `structural_count + r` is the slack of row r.
     */
    pub fn new(base_lower: Arc<Vec<T>>, base_upper: Arc<Vec<T>>, structural_count: usize) -> Self {
        Self {
            base_lower,
            base_upper,
            structural_count,
            lower: FxHashMap::default(),
            upper: FxHashMap::default(),
            minor_pivots: 0,
        }
    }

    pub fn structural_count(&self) -> usize {
        self.structural_count
    }

    pub fn slack_of_row(&self, row: usize) -> usize {
        self.structural_count + row
    }

    pub fn lower(&self, var: usize) -> T {
        match self.lower.get(&var) {
            Some(value) => value.clone(),
            None => self
                .base_lower
                .get(var)
                .cloned()
                .unwrap_or_else(T::neg_infinity),
        }
    }

    pub fn upper(&self, var: usize) -> T {
        match self.upper.get(&var) {
            Some(value) => value.clone(),
            None => self
                .base_upper
                .get(var)
                .cloned()
                .unwrap_or_else(T::infinity),
        }
    }

    pub fn bounds(&self, var: usize) -> (T, T) {
        (self.lower(var), self.upper(var))
    }

    /// Number of variables with an overridden lower bound.
    pub fn lower_override_count(&self) -> usize {
        self.lower.len()
    }

    /// Number of variables with an overridden upper bound.
    pub fn upper_override_count(&self) -> usize {
        self.upper.len()
    }

    /// Number of status changes caused by bound changes so far.
    pub fn minor_pivots(&self) -> usize {
        self.minor_pivots
    }

    pub fn set_lower(&mut self, var: usize, value: T, basis: &mut Basis) {
        self.lower.insert(var, value);
        self.fix_status(var, basis);
    }

    /**
     * Returns false, and changes nothing, if the value lies below the current lower bound.
     */
    pub fn set_upper(&mut self, var: usize, value: T, basis: &mut Basis) -> bool {
        if value < self.lower(var) {
            return false;
        }
        self.upper.insert(var, value);
        self.fix_status(var, basis);
        true
    }

    pub fn reset_lower(&mut self, var: usize, basis: &mut Basis) {
        if self.lower.remove(&var).is_some() {
            self.fix_status(var, basis);
        }
    }

    pub fn reset_upper(&mut self, var: usize, basis: &mut Basis) {
        if self.upper.remove(&var).is_some() {
            self.fix_status(var, basis);
        }
    }

    /**
     * Bounds on the activity of a row, derived from its slack variable. The row reads
     * `activity + coefficient * slack = 0`.
     */
    pub fn row_bounds(&self, row: usize, slack_coefficient: &T) -> (T, T) {
        let (lower, upper) = self.bounds(self.slack_of_row(row));
        let factor = -slack_coefficient.clone();
        if factor.is_positive() {
            (scale(&lower, &factor), scale(&upper, &factor))
        } else {
            (scale(&upper, &factor), scale(&lower, &factor))
        }
    }

    pub fn set_row_bounds(&mut self, row: usize, lower: T, upper: T, slack_coefficient: &T, basis: &mut Basis) {
        let slack = self.slack_of_row(row);
        let factor = -slack_coefficient.clone();
        let (slack_lower, slack_upper) = if factor.is_positive() {
            (divide(&lower, &factor), divide(&upper, &factor))
        } else {
            (divide(&upper, &factor), divide(&lower, &factor))
        };
        self.lower.insert(slack, slack_lower);
        self.upper.insert(slack, slack_upper);
        self.fix_status(slack, basis);
    }

    /**
     * The status a non-basic variable should have under its current bounds, given its current status.
     */
    pub fn valid_status(&self, var: usize, current: VarStatus) -> VarStatus {
        let (lower, upper) = self.bounds(var);
        status_within(&lower, &upper, current)
    }

    /**
     * Minor pivot: a status change of a non-basic variable that its new bounds require.
     */
    fn fix_status(&mut self, var: usize, basis: &mut Basis) {
        if var >= basis.variable_count() {
            return;
        }
        let current = basis.status(var);
        let valid = self.valid_status(var, current);
        if valid != current {
            trace!("minor pivot of variable {}: {} -> {}", var, current, valid);
            basis.set_status(var, valid);
            self.minor_pivots += 1;
        }
    }
}

/**
 * The status a variable with the given bounds should have, keeping `current` where it is still valid.
 */
pub fn status_within<T: SimplexNumber>(lower: &T, upper: &T, current: VarStatus) -> VarStatus {
    if current.is_basic() {
        return VarStatus::Basic;
    }
    if lower.is_finite() && lower == upper {
        return VarStatus::Fixed;
    }
    match current {
        VarStatus::Lower if lower.is_finite() => VarStatus::Lower,
        VarStatus::Upper if upper.is_finite() => VarStatus::Upper,
        VarStatus::Zero if !lower.is_positive() && !upper.is_negative() => VarStatus::Zero,
        _ => {
            if lower.is_finite() {
                VarStatus::Lower
            } else if upper.is_finite() {
                VarStatus::Upper
            } else {
                VarStatus::Zero
            }
        }
    }
}

fn scale<T: SimplexNumber>(bound: &T, factor: &T) -> T {
    bound.times(factor)
}

fn divide<T: SimplexNumber>(bound: &T, factor: &T) -> T {
    bound.over(factor)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use proptest::prelude::*;

    use crate::{
        f, finf,
        math::fraction_exact::FractionExact,
        optimisation_algorithms::basis::{Basis, VarStatus},
    };

    use super::BoundManager;

    fn manager() -> (BoundManager<FractionExact>, Basis) {
        //two structural variables and one row
        let lower = Arc::new(vec![f!(0), finf!(-), f!(-1)]);
        let upper = Arc::new(vec![f!(10), finf!(), f!(4)]);
        let basis = Basis::slack(vec![VarStatus::Lower, VarStatus::Zero], 1);
        (BoundManager::new(lower, upper, 2), basis)
    }

    #[test]
    fn minor_pivots() {
        let (mut bounds, mut basis) = manager();

        bounds.set_lower(1, f!(2), &mut basis);
        assert_eq!(basis.status(1), VarStatus::Lower);

        bounds.set_lower(0, finf!(-), &mut basis);
        assert_eq!(basis.status(0), VarStatus::Upper);

        assert!(bounds.set_upper(0, f!(3), &mut basis));
        bounds.set_lower(0, f!(3), &mut basis);
        assert_eq!(basis.status(0), VarStatus::Fixed);

        bounds.reset_lower(0, &mut basis);
        assert_eq!(basis.status(0), VarStatus::Lower);
        assert_eq!(bounds.minor_pivots(), 4);

        //basic variables are never touched
        bounds.set_lower(2, f!(7), &mut basis);
        assert_eq!(basis.status(2), VarStatus::Basic);
    }

    #[test]
    fn set_upper_rejects_crossing() {
        let (mut bounds, mut basis) = manager();
        bounds.set_lower(0, f!(5), &mut basis);
        assert!(!bounds.set_upper(0, f!(4), &mut basis));
        assert_eq!(bounds.upper(0), f!(10));
        assert_eq!(bounds.upper_override_count(), 0);
    }

    #[test]
    fn row_bounds_through_slack() {
        let (mut bounds, mut basis) = manager();
        //slack coefficient -1: the row activity equals the slack
        assert_eq!(bounds.row_bounds(0, &f!(-1)), (f!(-1), f!(4)));
        //slack coefficient 2: the activity is -2 * slack
        assert_eq!(bounds.row_bounds(0, &f!(2)), (f!(-8), f!(2)));

        bounds.set_row_bounds(0, f!(-8), f!(6), &f!(2), &mut basis);
        assert_eq!(bounds.bounds(2), (f!(-3), f!(4)));
        assert_eq!(bounds.row_bounds(0, &f!(2)), (f!(-8), f!(6)));
    }

    #[derive(Debug, Clone)]
    enum Operation {
        SetLower(usize, i64),
        SetUpper(usize, i64),
        ResetLower(usize),
        ResetUpper(usize),
    }

    fn operation() -> impl Strategy<Value = Operation> {
        prop_oneof![
            (0..3usize, -5..15i64).prop_map(|(v, x)| Operation::SetLower(v, x)),
            (0..3usize, -5..15i64).prop_map(|(v, x)| Operation::SetUpper(v, x)),
            (0..3usize).prop_map(Operation::ResetLower),
            (0..3usize).prop_map(Operation::ResetUpper),
        ]
    }

    proptest! {
        #[test]
        fn overlay_matches_model(operations in prop::collection::vec(operation(), 0..40)) {
            let (mut bounds, mut basis) = manager();
            let base_lower = vec![f!(0), finf!(-), f!(-1)];
            let base_upper = vec![f!(10), finf!(), f!(4)];
            let mut lower: HashMap<usize, FractionExact> = HashMap::new();
            let mut upper: HashMap<usize, FractionExact> = HashMap::new();

            for operation in operations {
                match operation {
                    Operation::SetLower(v, x) => {
                        bounds.set_lower(v, f!(x), &mut basis);
                        lower.insert(v, f!(x));
                    }
                    Operation::SetUpper(v, x) => {
                        let current_lower = lower.get(&v).cloned().unwrap_or_else(|| base_lower[v].clone());
                        let accepted = bounds.set_upper(v, f!(x), &mut basis);
                        prop_assert_eq!(accepted, f!(x) >= current_lower);
                        if accepted {
                            upper.insert(v, f!(x));
                        }
                    }
                    Operation::ResetLower(v) => {
                        bounds.reset_lower(v, &mut basis);
                        lower.remove(&v);
                    }
                    Operation::ResetUpper(v) => {
                        bounds.reset_upper(v, &mut basis);
                        upper.remove(&v);
                    }
                }
                prop_assert!(basis.is_consistent());
            }

            for v in 0..3 {
                prop_assert_eq!(bounds.lower(v), lower.get(&v).cloned().unwrap_or_else(|| base_lower[v].clone()));
                prop_assert_eq!(bounds.upper(v), upper.get(&v).cloned().unwrap_or_else(|| base_upper[v].clone()));
            }
        }
    }
}
