use std::fmt::Display;

use log::trace;

use crate::math::simplex_number::SimplexNumber;

use super::linear_programming_sparse::{Perm, SparseMat, SparseVec};

/**
 * The selected basic columns could not all be eliminated.
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SingularBasis {
    /// Basis positions whose column could not be pivoted.
    pub rejected_positions: Vec<usize>,
    /// Rows that did not receive a pivot, as many as there are rejected positions.
    pub unpivoted_rows: Vec<usize>,
}

impl SingularBasis {
    pub fn rejected(&self) -> usize {
        self.rejected_positions.len()
    }
}

impl Display for SingularBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "singular basis, {} column(s) rejected", self.rejected())
    }
}

impl std::error::Error for SingularBasis {}

/**
 * LU factors of a basis, stored as the sequence of elimination steps.
 * Step k pivots on row `pivot_rows[k]` and basis position `pivot_positions[k]`.
 */
#[derive(Clone, Debug)]
struct LuFactors<T> {
    pivot_rows: Vec<usize>,
    pivot_positions: Vec<usize>,
    pivots: Vec<T>,
    /// multipliers of step k: (row, multiplier)
    lower: Vec<SparseVec<T>>,
    /// remainder of the pivot row of step k: (basis position, value)
    upper: Vec<SparseVec<T>>,
    nnz: usize,
}

impl<T: SimplexNumber> LuFactors<T> {
    fn empty() -> Self {
        Self {
            pivot_rows: vec![],
            pivot_positions: vec![],
            pivots: vec![],
            lower: vec![],
            upper: vec![],
            nnz: 0,
        }
    }
}

#[derive(Clone, Debug)]
struct EtaMatrices<T> {
    leaving_positions: Vec<usize>,
    coeff_cols: SparseMat<T>,
}

impl<T: SimplexNumber> EtaMatrices<T> {
    fn new(n_rows: usize) -> EtaMatrices<T> {
        EtaMatrices {
            leaving_positions: vec![],
            coeff_cols: SparseMat::new(n_rows),
        }
    }

    fn len(&self) -> usize {
        self.leaving_positions.len()
    }

    fn clear_and_resize(&mut self, n_rows: usize) {
        self.leaving_positions.clear();
        self.coeff_cols = SparseMat::new(n_rows);
    }

    fn push(&mut self, leaving_position: usize, column: &[T]) {
        self.leaving_positions.push(leaving_position);
        let pivot_coeff = &column[leaving_position];
        let mut coeffs = vec![];
        for (position, coeff) in column.iter().enumerate() {
            if coeff.is_zero() {
                continue;
            }
            let val = if position == leaving_position {
                T::one().minus(&T::one().over(pivot_coeff))
            } else {
                coeff.over(pivot_coeff)
            };
            coeffs.push((position, val));
        }
        self.coeff_cols.append_col(coeffs);
    }
}

/**
 * Factorisation of the basis matrix: Markowitz LU with an eta file of rank-one updates.
 */
#[derive(Clone, Debug)]
pub struct BasisFactorisation<T> {
    size: usize,
    lu: LuFactors<T>,
    row_perm: Perm,
    position_perm: Perm,
    etas: EtaMatrices<T>,

    num_eps: f64,
    pivot_tolerance: T,
    stability: T,
    refactor_frequency: usize,
}

impl<T: SimplexNumber> BasisFactorisation<T> {
    pub fn new(size: usize, num_eps: f64, pivot_tolerance: f64, refactor_frequency: usize) -> Self {
        Self {
            size,
            lu: LuFactors::empty(),
            row_perm: Perm::identity(size),
            position_perm: Perm::identity(size),
            etas: EtaMatrices::new(size),
            num_eps,
            pivot_tolerance: T::tolerance(pivot_tolerance),
            stability: T::tolerance(0.1),
            refactor_frequency,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn eta_count(&self) -> usize {
        self.etas.len()
    }

    /// Elimination step at which the given row was pivoted.
    pub fn row_step(&self, row: usize) -> usize {
        self.row_perm.orig2new[row]
    }

    /// Elimination step at which the given basis position was pivoted.
    pub fn position_step(&self, position: usize) -> usize {
        self.position_perm.orig2new[position]
    }

    /// Row and basis position pivoted at the given step.
    pub fn step(&self, step: usize) -> (usize, usize) {
        (self.row_perm.new2orig[step], self.position_perm.new2orig[step])
    }

    /// True when the eta file has grown beyond what is cheaper than a fresh factorisation.
    pub fn needs_refactor(&self) -> bool {
        self.etas.len() >= self.refactor_frequency || self.etas.coeff_cols.nnz() > self.lu.nnz.max(self.size)
    }

    /**
     * Factors the columns `basic` of `columns`. On failure, the positions that could not be
     * eliminated and the rows left without a pivot are reported; the factorisation is then
     * unusable until the next successful call.
     */
    pub fn factor(&mut self, columns: &SparseMat<T>, basic: &[usize]) -> Result<(), SingularBasis> {
        let m = basic.len();
        self.size = m;
        self.etas.clear_and_resize(m);

        let mut rows: Vec<Vec<(usize, T)>> = vec![vec![]; m];
        let mut col_rows: Vec<Vec<usize>> = vec![vec![]; m];
        for (position, &var) in basic.iter().enumerate() {
            for (row, value) in columns.col_iter(var) {
                if !value.is_zero() {
                    rows[row].push((position, value.clone()));
                    col_rows[position].push(row);
                }
            }
        }
        let mut row_active = vec![true; m];
        let mut col_active = vec![true; m];

        let mut lu = LuFactors::empty();
        for _ in 0..m {
            let (pivot_row, pivot_position) =
                match self.choose_pivot(&rows, &col_rows, &row_active, &col_active) {
                    Some(pivot) => pivot,
                    None => break,
                };

            let pivot = match rows[pivot_row]
                .iter()
                .find(|(position, _)| *position == pivot_position)
            {
                Some((_, value)) => value.clone(),
                None => break,
            };

            let mut upper = SparseVec::new();
            for (position, value) in &rows[pivot_row] {
                col_rows[*position].retain(|&r| r != pivot_row);
                if *position != pivot_position {
                    upper.push(*position, value.clone());
                }
            }

            let mut lower = SparseVec::new();
            let targets = std::mem::take(&mut col_rows[pivot_position]);
            for row in targets {
                let Some(index) = rows[row]
                    .iter()
                    .position(|(position, _)| *position == pivot_position)
                else {
                    continue;
                };
                let (_, coeff) = rows[row].swap_remove(index);
                let multiplier = coeff.over(&pivot);

                for (position, u) in upper.iter() {
                    match rows[row].iter().position(|(p, _)| *p == position) {
                        Some(k) => {
                            rows[row][k].1.sub_product(&multiplier, u, self.num_eps);
                            if rows[row][k].1.is_zero() {
                                rows[row].swap_remove(k);
                                col_rows[position].retain(|&r| r != row);
                            }
                        }
                        None => {
                            let fill = -multiplier.times(u);
                            if !fill.is_zero() {
                                rows[row].push((position, fill));
                                col_rows[position].push(row);
                            }
                        }
                    }
                }
                lower.push(row, multiplier);
            }

            lu.nnz += lower.len() + upper.len() + 1;
            lu.pivot_rows.push(pivot_row);
            lu.pivot_positions.push(pivot_position);
            lu.pivots.push(pivot);
            lu.lower.push(lower);
            lu.upper.push(upper);

            rows[pivot_row].clear();
            row_active[pivot_row] = false;
            col_active[pivot_position] = false;
        }

        if lu.pivots.len() < m {
            let singular = SingularBasis {
                rejected_positions: (0..m).filter(|&c| col_active[c]).collect(),
                unpivoted_rows: (0..m).filter(|&r| row_active[r]).collect(),
            };
            trace!("factorisation failed: {}", singular);
            self.lu = LuFactors::empty();
            return Err(singular);
        }

        let mut row_perm = Perm::identity(m);
        let mut position_perm = Perm::identity(m);
        for step in 0..m {
            row_perm.new2orig[step] = lu.pivot_rows[step];
            row_perm.orig2new[lu.pivot_rows[step]] = step;
            position_perm.new2orig[step] = lu.pivot_positions[step];
            position_perm.orig2new[lu.pivot_positions[step]] = step;
        }
        self.row_perm = row_perm;
        self.position_perm = position_perm;
        self.lu = lu;
        Ok(())
    }

    fn value_at(rows: &[Vec<(usize, T)>], row: usize, position: usize) -> Option<&T> {
        rows[row]
            .iter()
            .find(|(p, _)| *p == position)
            .map(|(_, value)| value)
    }

    fn acceptable(&self, value: &T, column_max: &T) -> bool {
        value.abs() > self.pivot_tolerance && value.abs() >= self.stability.times(column_max)
    }

    /**
     * Singleton columns first, then singleton rows, then the least (r-1)(c-1) among the
     * entries that pass the threshold test.
     */
    fn choose_pivot(
        &self,
        rows: &[Vec<(usize, T)>],
        col_rows: &[Vec<usize>],
        row_active: &[bool],
        col_active: &[bool],
    ) -> Option<(usize, usize)> {
        for (position, active) in col_active.iter().enumerate() {
            if *active && col_rows[position].len() == 1 {
                let row = col_rows[position][0];
                if let Some(value) = Self::value_at(rows, row, position) {
                    if value.abs() > self.pivot_tolerance {
                        return Some((row, position));
                    }
                }
            }
        }

        let column_max = |position: usize| {
            col_rows[position]
                .iter()
                .filter_map(|&r| Self::value_at(rows, r, position))
                .map(|v| v.abs())
                .max()
                .unwrap_or_else(T::zero)
        };

        for (row, active) in row_active.iter().enumerate() {
            if *active && rows[row].len() == 1 {
                let (position, value) = &rows[row][0];
                if self.acceptable(value, &column_max(*position)) {
                    return Some((row, *position));
                }
            }
        }

        let mut best: Option<(usize, usize, usize, T)> = None;
        for (position, active) in col_active.iter().enumerate() {
            if !*active || col_rows[position].is_empty() {
                continue;
            }
            let max = column_max(position);
            let col_count = col_rows[position].len();
            for &row in &col_rows[position] {
                let Some(value) = Self::value_at(rows, row, position) else {
                    continue;
                };
                if !self.acceptable(value, &max) {
                    continue;
                }
                let cost = (rows[row].len() - 1) * (col_count - 1);
                let better = match &best {
                    None => true,
                    Some((best_cost, _, _, best_value)) => {
                        cost < *best_cost || (cost == *best_cost && value.abs() > *best_value)
                    }
                };
                if better {
                    best = Some((cost, row, position, value.abs()));
                }
            }
        }
        best.map(|(_, row, position, _)| (row, position))
    }

    /**
     * Solves B·x = rhs. `rhs` is indexed by row on entry and by basis position on return.
     */
    pub fn solve_column(&self, rhs: &mut Vec<T>) {
        let lu = &self.lu;

        //L
        for step in 0..lu.pivots.len() {
            let value = rhs[lu.pivot_rows[step]].clone();
            if !value.is_zero() {
                for (row, multiplier) in lu.lower[step].iter() {
                    rhs[row].sub_product(multiplier, &value, self.num_eps);
                }
            }
        }

        //U
        let mut x = vec![T::zero(); self.size];
        for step in (0..lu.pivots.len()).rev() {
            let mut sum = rhs[lu.pivot_rows[step]].clone();
            for (position, u) in lu.upper[step].iter() {
                sum.sub_product(u, &x[position], self.num_eps);
            }
            x[lu.pivot_positions[step]] = sum.over(&lu.pivots[step]);
        }

        //etas, in chronological order
        for (i, &leaving) in self.etas.leaving_positions.iter().enumerate() {
            let coeff = x[leaving].clone();
            if coeff.is_zero() {
                continue;
            }
            for (position, val) in self.etas.coeff_cols.col_iter(i) {
                x[position].sub_product(val, &coeff, self.num_eps);
            }
        }

        *rhs = x;
    }

    /**
     * Solves y·B = rhs. `rhs` is indexed by basis position on entry and by row on return.
     */
    pub fn solve_row(&self, rhs: &mut Vec<T>) {
        let lu = &self.lu;

        //etas, in reverse chronological order
        for (i, &leaving) in self.etas.leaving_positions.iter().enumerate().rev() {
            let mut sum = T::zero();
            for (position, val) in self.etas.coeff_cols.col_iter(i) {
                sum.add_product(val, &rhs[position]);
            }
            rhs[leaving] -= &sum;
        }

        //Uᵀ
        let mut y = vec![T::zero(); self.size];
        for step in 0..lu.pivots.len() {
            let z = rhs[lu.pivot_positions[step]].over(&lu.pivots[step]);
            if !z.is_zero() {
                for (position, u) in lu.upper[step].iter() {
                    rhs[position].sub_product(&z, u, self.num_eps);
                }
            }
            y[lu.pivot_rows[step]] = z;
        }

        //Lᵀ
        for step in (0..lu.pivots.len()).rev() {
            let mut sum = T::zero();
            for (row, multiplier) in lu.lower[step].iter() {
                sum.add_product(multiplier, &y[row]);
            }
            y[lu.pivot_rows[step]] -= &sum;
        }

        *rhs = y;
    }

    /**
     * Records that the basic variable at `leaving_position` was replaced by a variable whose
     * solved column (`solve_column` of its matrix column) is `column`.
     */
    pub fn update(&mut self, leaving_position: usize, column: &[T]) {
        self.etas.push(leaving_position, column);
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::{
        f,
        math::{fraction_exact::FractionExact, fraction_f64::FractionF64, traits::Zero},
        optimisation_algorithms::linear_programming_sparse::SparseMat,
    };

    use super::BasisFactorisation;

    fn to_columns(dense: &[Vec<i64>]) -> SparseMat<FractionExact> {
        //dense is given row by row
        let m = dense.len();
        let n = dense[0].len();
        let mut mat = SparseMat::new(m);
        for c in 0..n {
            mat.append_col((0..m).filter(|&r| dense[r][c] != 0).map(|r| (r, f!(dense[r][c]))));
        }
        mat
    }

    fn multiply(dense: &[Vec<i64>], basic: &[usize], x: &[FractionExact]) -> Vec<FractionExact> {
        (0..dense.len())
            .map(|r| {
                basic
                    .iter()
                    .zip(x)
                    .map(|(&c, v)| &f!(dense[r][c]) * v)
                    .sum()
            })
            .collect()
    }

    fn multiply_left(dense: &[Vec<i64>], basic: &[usize], y: &[FractionExact]) -> Vec<FractionExact> {
        basic
            .iter()
            .map(|&c| (0..dense.len()).map(|r| &f!(dense[r][c]) * &y[r]).sum())
            .collect()
    }

    #[test]
    fn factor_solve_small() {
        let dense = vec![vec![2, 0, 1], vec![1, 3, 0], vec![0, 1, 4]];
        let columns = to_columns(&dense);
        let basic = vec![0, 1, 2];
        let mut factorisation: BasisFactorisation<FractionExact> = BasisFactorisation::new(3, 0.0, 0.0, 100);
        factorisation.factor(&columns, &basic).unwrap();

        let x = vec![f!(1), f!(-2), f!(1, 3)];
        let mut b = multiply(&dense, &basic, &x);
        factorisation.solve_column(&mut b);
        assert_eq!(b, x);

        let y = vec![f!(3, 2), f!(0), f!(-5)];
        let mut d = multiply_left(&dense, &basic, &y);
        factorisation.solve_row(&mut d);
        assert_eq!(d, y);
    }

    #[test]
    fn pivot_sequence() {
        //the last column is a singleton in row 2, the only choice of the first step
        let dense = vec![vec![1, 1, 0], vec![2, 3, 0], vec![1, 0, 5]];
        let columns = to_columns(&dense);
        let mut factorisation: BasisFactorisation<FractionExact> = BasisFactorisation::new(3, 0.0, 0.0, 100);
        factorisation.factor(&columns, &[0, 1, 2]).unwrap();

        let mut rows = vec![];
        let mut positions = vec![];
        for step in 0..3 {
            let (row, position) = factorisation.step(step);
            assert_eq!(factorisation.row_step(row), step);
            assert_eq!(factorisation.position_step(position), step);
            rows.push(row);
            positions.push(position);
        }
        rows.sort();
        positions.sort();
        assert_eq!(rows, vec![0, 1, 2]);
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn singular_is_reported() {
        let dense = vec![vec![1, 2, 0], vec![2, 4, 0], vec![0, 0, 1]];
        let columns = to_columns(&dense);
        let mut factorisation: BasisFactorisation<FractionExact> = BasisFactorisation::new(3, 0.0, 0.0, 100);
        let singular = factorisation.factor(&columns, &[0, 1, 2]).unwrap_err();
        assert_eq!(singular.rejected(), 1);
        assert_eq!(singular.unpivoted_rows.len(), 1);
    }

    #[test]
    fn approximate_solve() {
        let mut columns: SparseMat<FractionF64> = SparseMat::new(2);
        columns.append_col(vec![(0, FractionF64(4.0)), (1, FractionF64(2.0))]);
        columns.append_col(vec![(0, FractionF64(1.0)), (1, FractionF64(3.0))]);
        let mut factorisation: BasisFactorisation<FractionF64> = BasisFactorisation::new(2, 1e-13, 1e-11, 100);
        factorisation.factor(&columns, &[0, 1]).unwrap();

        //4x + y = 6, 2x + 3y = 8 -> x = 1, y = 2
        let mut b = vec![FractionF64(6.0), FractionF64(8.0)];
        factorisation.solve_column(&mut b);
        assert!((b[0].0 - 1.0).abs() < 1e-12);
        assert!((b[1].0 - 2.0).abs() < 1e-12);
    }

    /// A random nonsingular matrix: diagonally dominant, then with its columns shuffled.
    fn nonsingular(m: usize) -> impl Strategy<Value = (Vec<Vec<i64>>, Vec<usize>)> {
        (
            prop::collection::vec(prop::collection::vec(-3..4i64, m), m),
            Just((0..m).collect::<Vec<usize>>()).prop_shuffle(),
        )
            .prop_map(move |(mut dense, basic)| {
                for r in 0..m {
                    let sum: i64 = dense[r].iter().map(|v| v.abs()).sum();
                    dense[r][r] = sum + 1;
                }
                (dense, basic)
            })
    }

    proptest! {
        #[test]
        fn solves_recover_vectors(
            (dense, basic) in (1..6usize).prop_flat_map(nonsingular),
            xs in prop::collection::vec(-5..6i64, 6),
        ) {
            let m = dense.len();
            let columns = to_columns(&dense);
            let mut factorisation: BasisFactorisation<FractionExact> = BasisFactorisation::new(m, 0.0, 0.0, 100);
            prop_assert!(factorisation.factor(&columns, &basic).is_ok());

            let x: Vec<FractionExact> = xs[..m].iter().map(|v| f!(*v)).collect();
            let mut b = multiply(&dense, &basic, &x);
            factorisation.solve_column(&mut b);
            prop_assert_eq!(&b, &x);

            let mut d = multiply_left(&dense, &basic, &x);
            factorisation.solve_row(&mut d);
            prop_assert_eq!(&d, &x);
        }

        #[test]
        fn eta_updates_match_refactorisation(
            dense in (2..6usize).prop_flat_map(|m| nonsingular(m).prop_map(|(dense, _)| dense)),
            replacements in prop::collection::vec((0..6usize, prop::collection::vec(-3..4i64, 6)), 1..8),
            rhs in prop::collection::vec(-5..6i64, 6),
        ) {
            let m = dense.len();
            //the basis starts as the first m columns; every replacement appends a new column
            let mut extended: Vec<Vec<i64>> = dense.clone();
            let mut basic: Vec<usize> = (0..m).collect();
            let mut factorisation: BasisFactorisation<FractionExact> = BasisFactorisation::new(m, 0.0, 0.0, 100);
            let initial = to_columns(&extended);
            prop_assert!(factorisation.factor(&initial, &basic).is_ok());

            for (position, column) in replacements {
                let position = position % m;
                let mut alpha: Vec<FractionExact> = column[..m].iter().map(|v| f!(*v)).collect();
                factorisation.solve_column(&mut alpha);
                if alpha[position].is_zero() {
                    continue;
                }
                for r in 0..m {
                    extended[r].push(column[r]);
                }
                basic[position] = extended[0].len() - 1;
                factorisation.update(position, &alpha);
            }

            let columns = to_columns(&extended);
            let mut fresh: BasisFactorisation<FractionExact> = BasisFactorisation::new(m, 0.0, 0.0, 100);
            prop_assert!(fresh.factor(&columns, &basic).is_ok());

            let b: Vec<FractionExact> = rhs[..m].iter().map(|v| f!(*v)).collect();
            let mut updated = b.clone();
            factorisation.solve_column(&mut updated);
            let mut refactored = b.clone();
            fresh.solve_column(&mut refactored);
            prop_assert_eq!(&updated, &refactored);

            let mut updated = b.clone();
            factorisation.solve_row(&mut updated);
            let mut refactored = b;
            fresh.solve_row(&mut refactored);
            prop_assert_eq!(&updated, &refactored);
        }
    }
}
