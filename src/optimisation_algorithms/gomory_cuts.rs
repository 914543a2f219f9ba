use bitvec::slice::BitSlice;
use log::trace;

use crate::math::simplex_number::SimplexNumber;

use super::{
    basis::VarStatus, cutting_plane_pool::CuttingPlane, pivot_engine::PivotEngine,
    solver_config::SolverConfig,
};

/**
 * Builds mixed-integer Gomory cuts from the optimal tableau of a relaxation.
 *
 * The tableau row of a basic variable reads `x = β - Σ a_j t_j`, where every non-basic variable is
 * shifted to its bound (`x_j = l_j + t_j` at lower, `x_j = u_j - t_j` at upper). With `f0` the
 * fractional part of β, the cut `Σ g_j t_j ≥ 1` holds for every integer solution, where
 * - integer t_j: `g_j = f_j / f0` if `f_j ≤ f0`, else `(1 - f_j) / (1 - f0)`;
 * - continuous t_j: `g_j = a_j / f0` if `a_j > 0`, else `-a_j / (1 - f0)`.
 */
pub struct GomoryCutBuilder<'b> {
    integrality: &'b BitSlice,
    min_fractionality: f64,
    rhs_relaxation: f64,
}

impl<'b> GomoryCutBuilder<'b> {
    /**
     * `integrality` flags the structural variables that must be integer; it also fixes the
     * number of structural variables.
     */
    pub fn new(integrality: &'b BitSlice, config: &SolverConfig) -> Self {
        Self {
            integrality,
            min_fractionality: config.cut_min_fractionality,
            rhs_relaxation: config.variable_tolerance,
        }
    }

    fn structural_count(&self) -> usize {
        self.integrality.len()
    }

    /**
     * A cut from the tableau row of `var`, which must be basic in the optimal basis of the
     * engine. None if the value of `var` is integer, too close to integer for the arithmetic, or
     * if a free non-basic variable appears in the row.
     */
    pub fn build<T: SimplexNumber>(&self, engine: &PivotEngine<T>, var: usize) -> Option<CuttingPlane> {
        let row = engine.tableau_row(var)?;
        let beta = engine.value(var);
        let f0 = beta.fractional_part();
        if f0.is_zero() {
            return None;
        }
        if !T::EXACT {
            let f = f0.approximate();
            if f < self.min_fractionality || f > 1.0 - self.min_fractionality {
                trace!("variable {} is too close to integer for a cut ({})", var, beta);
                return None;
            }
        }
        let one_minus_f0 = T::one().minus(&f0);

        //coefficients on x-space variables, before substituting slacks
        let mut terms: Vec<(usize, T)> = vec![];
        let mut rhs = T::one();
        for (j, r) in row.iter().enumerate() {
            if j == var || r.is_zero() {
                continue;
            }
            let at_upper = match engine.basis().status(j) {
                VarStatus::Lower => false,
                VarStatus::Upper => true,
                VarStatus::Fixed | VarStatus::Basic => continue,
                VarStatus::Zero => {
                    trace!("free non-basic variable {} in the row of {}: no cut", j, var);
                    return None;
                }
            };
            let a = if at_upper { -r.clone() } else { r.clone() };

            let g = if self.is_integer_column(j, engine.value(j)) {
                let fj = a.fractional_part();
                if fj <= f0 {
                    fj.over(&f0)
                } else {
                    T::one().minus(&fj).over(&one_minus_f0)
                }
            } else if a.is_positive() {
                a.over(&f0)
            } else {
                (-a).over(&one_minus_f0)
            };
            if g.is_zero() {
                continue;
            }

            let coefficient = if at_upper { -g } else { g };
            rhs.add_product(&coefficient, engine.value(j));
            terms.push((j, coefficient));
        }

        let coefficients = self.substitute_slacks(engine, terms)?;
        let relaxation = T::tolerance(self.rhs_relaxation * (1.0 + rhs.approximate().abs()));
        let rhs = rhs.minus(&relaxation);
        if coefficients.is_empty() && !rhs.is_positive() {
            return None;
        }

        Some(CuttingPlane {
            coefficients: coefficients
                .into_iter()
                .map(|(var, coefficient)| (var, coefficient.to_exact()))
                .collect(),
            lower: rhs.to_exact(),
        })
    }

    fn is_integer_column<T: SimplexNumber>(&self, var: usize, value: &T) -> bool {
        var < self.structural_count() && self.integrality[var] && value.is_integer()
    }

    /**
     * Rewrites the slack variables of the terms through their rows: the row `Σ a_k x_k + c s = 0`
     * gives `s = -Σ (a_k / c) x_k`. Rows may mention other slacks, hence the stack.
     */
    fn substitute_slacks<T: SimplexNumber>(
        &self,
        engine: &PivotEngine<T>,
        terms: Vec<(usize, T)>,
    ) -> Option<Vec<(usize, T)>> {
        let structural_count = self.structural_count();
        let rows = &engine.task().rows;
        let mut coefficients = vec![T::zero(); structural_count];
        let mut stack = terms;
        let mut budget = 64 * (rows.cols() + engine.task().variable_count());

        while let Some((var, multiplier)) = stack.pop() {
            if var < structural_count {
                coefficients[var] += &multiplier;
                continue;
            }
            budget = budget.checked_sub(1)?;

            let row = var - structural_count;
            let slack_coefficient = rows
                .col_iter(row)
                .find(|(k, _)| *k == var)
                .map(|(_, c)| c.clone())
                .filter(|c| !c.is_zero())?;
            let factor = multiplier.over(&slack_coefficient);
            for (k, a) in rows.col_iter(row) {
                if k != var {
                    stack.push((k, -factor.times(a)));
                }
            }
        }

        Some(
            coefficients
                .into_iter()
                .enumerate()
                .filter(|(_, coefficient)| !coefficient.is_zero())
                .collect(),
        )
    }
}
