use std::{fmt::Display, sync::Arc};

use log::trace;

use crate::math::{fraction_exact::FractionExact, traits::Zero};

use super::sparse_matrix::SparseMatrix;

/**
 * A valid inequality `Σ coefficients ≥ lower` over structural variables.
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CuttingPlane {
    pub coefficients: Vec<(usize, FractionExact)>,
    pub lower: FractionExact,
}

impl CuttingPlane {
    pub fn activity(&self, values: &[FractionExact]) -> FractionExact {
        let mut activity = FractionExact::zero();
        for (var, coefficient) in &self.coefficients {
            activity += coefficient * &values[*var];
        }
        activity
    }

    pub fn is_satisfied_by(&self, values: &[FractionExact]) -> bool {
        self.activity(values) >= self.lower
    }
}

impl Display for CuttingPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (var, coefficient)) in self.coefficients.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{} x{}", coefficient, var)?;
        }
        write!(f, " >= {}", self.lower)
    }
}

/**
 * The cuts of one search node on top of the cuts of its ancestors. A pool is frozen behind an
 * `Arc` once its node is done, so children share their ancestors' cuts.
 */
#[derive(Clone, Debug, Default)]
pub struct CuttingPlanePool {
    parent: Option<Arc<CuttingPlanePool>>,
    inherited: usize,
    cuts: Vec<CuttingPlane>,
}

impl CuttingPlanePool {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(parent: &Arc<CuttingPlanePool>) -> Self {
        Self {
            inherited: parent.len(),
            parent: Some(Arc::clone(parent)),
            cuts: vec![],
        }
    }

    pub fn add(&mut self, cut: CuttingPlane) {
        trace!("cut {}: {}", self.len(), cut);
        self.cuts.push(cut);
    }

    /// Cuts of this node and all its ancestors.
    pub fn len(&self) -> usize {
        self.inherited + self.cuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn local_len(&self) -> usize {
        self.cuts.len()
    }

    /// All cuts, those of the oldest ancestor first.
    pub fn iter(&self) -> impl Iterator<Item = &CuttingPlane> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = &current.parent {
            chain.push(parent);
            current = parent;
        }
        chain.into_iter().rev().flat_map(|pool| pool.cuts.iter())
    }

    /**
     * Appends every cut as a row with its own slack column (coefficient -1, lower bound the
     * right-hand side of the cut). Returns the number of rows before the cuts, for `remove`.
     */
    pub fn apply(&self, matrix: &mut SparseMatrix) -> usize {
        let base_rows = matrix.row_count();
        if self.is_empty() {
            return base_rows;
        }
        let structural_count = matrix.column_count() - base_rows;
        let rows = base_rows + self.len();
        matrix.resize(rows, structural_count + rows);
        for (i, cut) in self.iter().enumerate() {
            let row = base_rows + i;
            for (var, coefficient) in &cut.coefficients {
                matrix.set(row, *var, coefficient.clone());
            }
            matrix.set(row, structural_count + row, -FractionExact::from(1));
        }
        base_rows
    }

    /**
     * Undoes `apply`.
     */
    pub fn remove(matrix: &mut SparseMatrix, base_rows: usize) {
        let structural_count = matrix.column_count() - matrix.row_count();
        matrix.resize(base_rows, structural_count + base_rows);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{f, optimisation_algorithms::sparse_matrix::SparseMatrix};

    use super::{CuttingPlane, CuttingPlanePool};

    fn cut(var: usize, lower: i64) -> CuttingPlane {
        CuttingPlane {
            coefficients: vec![(var, f!(1))],
            lower: f!(lower),
        }
    }

    #[test]
    fn chain_order() {
        let mut root = CuttingPlanePool::root();
        root.add(cut(0, 1));
        let root = Arc::new(root);

        let mut child = CuttingPlanePool::child(&root);
        child.add(cut(1, 2));
        child.add(cut(0, 3));
        let child = Arc::new(child);
        let grandchild = CuttingPlanePool::child(&child);

        assert_eq!(grandchild.len(), 3);
        assert_eq!(grandchild.local_len(), 0);
        let lowers: Vec<_> = grandchild.iter().map(|cut| cut.lower.clone()).collect();
        assert_eq!(lowers, vec![f!(1), f!(2), f!(3)]);
        //the parent is untouched by its children
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn apply_and_remove() {
        //two structural variables, one row with its slack
        let mut matrix = SparseMatrix::new(1, 3);
        matrix.set(0, 0, f!(3));
        matrix.set(0, 1, f!(2));
        matrix.set(0, 2, f!(-1));

        let mut pool = CuttingPlanePool::root();
        pool.add(CuttingPlane {
            coefficients: vec![(0, f!(1)), (1, f!(-1))],
            lower: f!(0),
        });
        let base_rows = pool.apply(&mut matrix);
        assert_eq!(base_rows, 1);
        assert_eq!((matrix.row_count(), matrix.column_count()), (2, 4));
        assert_eq!(matrix.row_len(1), 3);
        assert_eq!(matrix.coefficient(1, 3).unwrap().exact, &f!(-1));
        assert_eq!(matrix.alive_count(), 6);

        CuttingPlanePool::remove(&mut matrix, base_rows);
        assert_eq!((matrix.row_count(), matrix.column_count()), (1, 3));
        assert_eq!(matrix.alive_count(), 3);
        assert_eq!(matrix.column_len(0), 1);
    }

    #[test]
    fn satisfaction() {
        let cut = CuttingPlane {
            coefficients: vec![(1, f!(-2))],
            lower: f!(-2),
        };
        assert!(cut.is_satisfied_by(&[f!(5), f!(1)]));
        assert!(!cut.is_satisfied_by(&[f!(0), f!(3, 2)]));
        assert_eq!(cut.to_string(), "-2 x1 >= -2");
    }
}
