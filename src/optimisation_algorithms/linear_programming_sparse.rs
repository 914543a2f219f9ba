use crate::math::simplex_number::SimplexNumber;

#[derive(Clone, Debug, Default)]
pub struct SparseVec<T> {
    indices: Vec<usize>,
    values: Vec<T>,
}

impl<T: SimplexNumber> SparseVec<T> {
    pub fn new() -> SparseVec<T> {
        SparseVec {
            indices: vec![],
            values: vec![],
        }
    }

    pub fn clear(&mut self) {
        self.indices.clear();
        self.values.clear();
    }

    pub fn push(&mut self, i: usize, val: T) {
        self.indices.push(i);
        self.values.push(val);
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.indices.iter().copied().zip(&self.values)
    }

    pub fn sq_norm(&self) -> T {
        let mut result = T::zero();
        for value in &self.values {
            result.add_product(value, value);
        }
        result
    }

    /// Dot product with a dense vector.
    pub fn dot(&self, dense: &[T]) -> T {
        let mut result = T::zero();
        for (i, value) in self.iter() {
            result.add_product(value, &dense[i]);
        }
        result
    }
}

/// Unordered sparse matrix with elements stored by columns
#[derive(Clone, Debug)]
pub struct SparseMat<T> {
    n_rows: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<T>,
}

impl<T: SimplexNumber> SparseMat<T> {
    pub fn new(n_rows: usize) -> SparseMat<T> {
        SparseMat {
            n_rows,
            indptr: vec![0],
            indices: vec![],
            data: vec![],
        }
    }

    pub fn rows(&self) -> usize {
        self.n_rows
    }

    pub fn cols(&self) -> usize {
        self.indptr.len() - 1
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn push(&mut self, row: usize, val: T) {
        self.indices.push(row);
        self.data.push(val);
    }

    pub fn seal_column(&mut self) {
        self.indptr.push(self.indices.len())
    }

    pub fn col_rows(&self, i_col: usize) -> &[usize] {
        &self.indices[self.indptr[i_col]..self.indptr[i_col + 1]]
    }

    pub fn col_data(&self, i_col: usize) -> &[T] {
        &self.data[self.indptr[i_col]..self.indptr[i_col + 1]]
    }

    pub fn col_iter(&self, i_col: usize) -> impl Iterator<Item = (usize, &T)> {
        self.col_rows(i_col)
            .iter()
            .copied()
            .zip(self.col_data(i_col))
    }

    pub fn col_len(&self, i_col: usize) -> usize {
        self.indptr[i_col + 1] - self.indptr[i_col]
    }

    /// Dot product of a column with a dense vector.
    pub fn col_dot(&self, i_col: usize, dense: &[T]) -> T {
        let mut result = T::zero();
        for (r, val) in self.col_iter(i_col) {
            result.add_product(val, &dense[r]);
        }
        result
    }

    pub fn append_col<I>(&mut self, col: I)
    where
        I: IntoIterator<Item = (usize, T)>,
    {
        for (idx, val) in col {
            self.indices.push(idx);
            self.data.push(val);
        }
        self.seal_column();
    }

    pub fn transpose(&self) -> SparseMat<T> {
        let mut out = SparseMat {
            n_rows: self.cols(),
            indptr: vec![],
            indices: vec![],
            data: vec![],
        };

        // calculate row counts and store them in the indptr array.
        out.indptr.resize(self.rows() + 1, 0);
        for c in 0..self.cols() {
            for &r in self.col_rows(c) {
                out.indptr[r] += 1;
            }
        }

        // calculate cumulative counts so that indptr elements point to
        // the *ends* of each resulting row.
        for r in 1..out.indptr.len() {
            out.indptr[r] += out.indptr[r - 1];
        }

        // place the elements
        out.indices.resize(self.nnz(), 0);
        out.data.resize(self.nnz(), T::zero());
        for c in 0..self.cols() {
            for (r, val) in self.col_iter(c) {
                out.indptr[r] -= 1;
                out.indices[out.indptr[r]] = c;
                out.data[out.indptr[r]] = val.clone();
            }
        }

        if let Some(last) = out.indptr.last_mut() {
            *last = self.nnz();
        }

        out
    }
}

#[derive(Clone, Debug)]
pub struct Perm {
    pub(crate) orig2new: Vec<usize>,
    pub(crate) new2orig: Vec<usize>,
}

impl Perm {
    pub fn identity(n: usize) -> Self {
        Self {
            orig2new: (0..n).collect(),
            new2orig: (0..n).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{f, math::fraction_exact::FractionExact};

    use super::*;

    #[test]
    fn mat_transpose() {
        let mut mat: SparseMat<FractionExact> = SparseMat::new(2);
        mat.push(0, f!(11, 10));
        mat.push(1, f!(22, 10));
        mat.seal_column();
        mat.push(1, f!(33, 10));
        mat.seal_column();
        mat.push(0, f!(44, 10));
        mat.seal_column();

        let transp = mat.transpose();
        assert_eq!(&transp.indptr, &[0, 2, 4]);
        assert_eq!(&transp.indices, &[2, 0, 1, 0]);
        assert_eq!(
            &transp.data,
            &[f!(44, 10), f!(11, 10), f!(33, 10), f!(22, 10)]
        );
    }
}
