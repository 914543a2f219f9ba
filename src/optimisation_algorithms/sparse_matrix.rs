use std::fmt::Display;

use crate::math::{fraction_exact::FractionExact, simplex_number::SimplexNumber, traits::Zero};

use super::linear_programming_sparse::SparseVec;

const NIL: usize = usize::MAX;

/**
 * A sparse matrix that stores every coefficient both exactly and approximately.
 *
 * Entries live in slots of flat arrays. Each slot is linked into a singly-linked list of its row
 * and a singly-linked list of its column; removed slots are cleaned (row = column = NIL) and
 * recycled through a free list.
 */
#[derive(Clone, Debug)]
pub struct SparseMatrix {
    row_count: usize,
    column_count: usize,

    slot_row: Vec<usize>,
    slot_column: Vec<usize>,
    slot_next_in_row: Vec<usize>,
    slot_next_in_column: Vec<usize>,
    slot_exact: Vec<FractionExact>,
    slot_approx: Vec<f64>,

    row_heads: Vec<usize>,
    column_heads: Vec<usize>,
    row_lengths: Vec<usize>,
    column_lengths: Vec<usize>,

    free_head: usize,
    alive: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct MatrixEntry<'a> {
    pub row: usize,
    pub column: usize,
    pub exact: &'a FractionExact,
    pub approx: f64,
}

impl<'a> MatrixEntry<'a> {
    pub fn value<T: SimplexNumber>(&self) -> T {
        T::from_coefficient(self.exact, self.approx)
    }
}

impl SparseMatrix {
    pub fn new(row_count: usize, column_count: usize) -> Self {
        Self {
            row_count,
            column_count,
            slot_row: vec![],
            slot_column: vec![],
            slot_next_in_row: vec![],
            slot_next_in_column: vec![],
            slot_exact: vec![],
            slot_approx: vec![],
            row_heads: vec![NIL; row_count],
            column_heads: vec![NIL; column_count],
            row_lengths: vec![0; row_count],
            column_lengths: vec![0; column_count],
            free_head: NIL,
            alive: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Number of nonzero entries.
    pub fn alive_count(&self) -> usize {
        self.alive
    }

    pub fn row_len(&self, row: usize) -> usize {
        self.row_lengths[row]
    }

    pub fn column_len(&self, column: usize) -> usize {
        self.column_lengths[column]
    }

    /// Number of allocated slots, live or free.
    pub fn slot_capacity(&self) -> usize {
        self.slot_row.len()
    }

    fn find_slot(&self, row: usize, column: usize) -> usize {
        //walk the shorter of the two lists
        if self.row_lengths[row] <= self.column_lengths[column] {
            let mut slot = self.row_heads[row];
            while slot != NIL {
                if self.slot_column[slot] == column {
                    return slot;
                }
                slot = self.slot_next_in_row[slot];
            }
        } else {
            let mut slot = self.column_heads[column];
            while slot != NIL {
                if self.slot_row[slot] == row {
                    return slot;
                }
                slot = self.slot_next_in_column[slot];
            }
        }
        NIL
    }

    fn allocate_slot(&mut self) -> usize {
        if self.free_head != NIL {
            let slot = self.free_head;
            self.free_head = self.slot_next_in_row[slot];
            slot
        } else {
            //Vec doubles its capacity when it runs out
            self.slot_row.push(NIL);
            self.slot_column.push(NIL);
            self.slot_next_in_row.push(NIL);
            self.slot_next_in_column.push(NIL);
            self.slot_exact.push(FractionExact::zero());
            self.slot_approx.push(0.0);
            self.slot_row.len() - 1
        }
    }

    fn free_slot(&mut self, slot: usize) {
        self.slot_row[slot] = NIL;
        self.slot_column[slot] = NIL;
        self.slot_next_in_column[slot] = NIL;
        self.slot_exact[slot] = FractionExact::zero();
        self.slot_approx[slot] = 0.0;
        self.slot_next_in_row[slot] = self.free_head;
        self.free_head = slot;
        self.alive -= 1;
    }

    fn unlink_from_row(&mut self, row: usize, slot: usize) {
        let mut previous = NIL;
        let mut current = self.row_heads[row];
        while current != NIL && current != slot {
            previous = current;
            current = self.slot_next_in_row[current];
        }
        debug_assert_eq!(current, slot, "slot {} is not in row {}", slot, row);
        if previous == NIL {
            self.row_heads[row] = self.slot_next_in_row[slot];
        } else {
            self.slot_next_in_row[previous] = self.slot_next_in_row[slot];
        }
        self.row_lengths[row] -= 1;
    }

    fn unlink_from_column(&mut self, column: usize, slot: usize) {
        let mut previous = NIL;
        let mut current = self.column_heads[column];
        while current != NIL && current != slot {
            previous = current;
            current = self.slot_next_in_column[current];
        }
        debug_assert_eq!(current, slot, "slot {} is not in column {}", slot, column);
        if previous == NIL {
            self.column_heads[column] = self.slot_next_in_column[slot];
        } else {
            self.slot_next_in_column[previous] = self.slot_next_in_column[slot];
        }
        self.column_lengths[column] -= 1;
    }

    /**
     * Sets the coefficient at (row, column). An exact zero removes the entry.
     */
    pub fn set_coefficient(&mut self, row: usize, column: usize, exact: FractionExact, approx: f64) {
        assert!(row < self.row_count && column < self.column_count);
        if exact.is_zero() {
            self.remove_coefficient(row, column);
            return;
        }

        let slot = self.find_slot(row, column);
        if slot != NIL {
            self.slot_exact[slot] = exact;
            self.slot_approx[slot] = approx;
            return;
        }

        let slot = self.allocate_slot();
        self.slot_row[slot] = row;
        self.slot_column[slot] = column;
        self.slot_exact[slot] = exact;
        self.slot_approx[slot] = approx;
        self.slot_next_in_row[slot] = self.row_heads[row];
        self.row_heads[row] = slot;
        self.slot_next_in_column[slot] = self.column_heads[column];
        self.column_heads[column] = slot;
        self.row_lengths[row] += 1;
        self.column_lengths[column] += 1;
        self.alive += 1;
    }

    /**
     * Sets the coefficient from its exact value; the approximation is derived.
     */
    pub fn set(&mut self, row: usize, column: usize, exact: FractionExact) {
        let approx = exact.approximate();
        self.set_coefficient(row, column, exact, approx);
    }

    pub fn coefficient(&self, row: usize, column: usize) -> Option<MatrixEntry<'_>> {
        if row >= self.row_count || column >= self.column_count {
            return None;
        }
        let slot = self.find_slot(row, column);
        if slot == NIL {
            None
        } else {
            Some(self.entry(slot))
        }
    }

    /**
     * Removes the coefficient at (row, column). Returns whether there was one.
     */
    pub fn remove_coefficient(&mut self, row: usize, column: usize) -> bool {
        if row >= self.row_count || column >= self.column_count {
            return false;
        }
        let slot = self.find_slot(row, column);
        if slot == NIL {
            return false;
        }
        self.unlink_from_row(row, slot);
        self.unlink_from_column(column, slot);
        self.free_slot(slot);
        true
    }

    pub fn scale_row(&mut self, row: usize, factor: &FractionExact) {
        let approx_factor = factor.approximate();
        let mut slot = self.row_heads[row];
        while slot != NIL {
            self.slot_exact[slot] *= factor;
            self.slot_approx[slot] *= approx_factor;
            slot = self.slot_next_in_row[slot];
        }
        if factor.is_zero() {
            self.clear_row(row);
        }
    }

    pub fn scale_column(&mut self, column: usize, factor: &FractionExact) {
        let approx_factor = factor.approximate();
        let mut slot = self.column_heads[column];
        while slot != NIL {
            self.slot_exact[slot] *= factor;
            self.slot_approx[slot] *= approx_factor;
            slot = self.slot_next_in_column[slot];
        }
        if factor.is_zero() {
            self.clear_column(column);
        }
    }

    fn clear_row(&mut self, row: usize) {
        while self.row_heads[row] != NIL {
            let slot = self.row_heads[row];
            let column = self.slot_column[slot];
            self.unlink_from_row(row, slot);
            self.unlink_from_column(column, slot);
            self.free_slot(slot);
        }
    }

    fn clear_column(&mut self, column: usize) {
        while self.column_heads[column] != NIL {
            let slot = self.column_heads[column];
            let row = self.slot_row[slot];
            self.unlink_from_row(row, slot);
            self.unlink_from_column(column, slot);
            self.free_slot(slot);
        }
    }

    /**
     * Changes the extent of the matrix. Entries outside the new extent are severed from the
     * surviving row and column lists before the heads are dropped.
     */
    pub fn resize(&mut self, row_count: usize, column_count: usize) {
        for row in row_count..self.row_count {
            self.clear_row(row);
        }
        self.row_heads.resize(row_count, NIL);
        self.row_lengths.resize(row_count, 0);
        self.row_count = row_count;

        for column in column_count..self.column_count {
            self.clear_column(column);
        }
        self.column_heads.resize(column_count, NIL);
        self.column_lengths.resize(column_count, 0);
        self.column_count = column_count;
    }

    fn entry(&self, slot: usize) -> MatrixEntry<'_> {
        MatrixEntry {
            row: self.slot_row[slot],
            column: self.slot_column[slot],
            exact: &self.slot_exact[slot],
            approx: self.slot_approx[slot],
        }
    }

    pub fn row(&self, row: usize) -> RowIterator<'_> {
        RowIterator {
            matrix: self,
            slot: self.row_heads[row],
        }
    }

    pub fn column(&self, column: usize) -> ColumnIterator<'_> {
        ColumnIterator {
            matrix: self,
            slot: self.column_heads[column],
        }
    }

    /**
     * The column in the given arithmetic, with sorted indices.
     */
    pub fn column_vector<T: SimplexNumber>(&self, column: usize) -> SparseVec<T> {
        let mut entries = self
            .column(column)
            .map(|entry| (entry.row, entry.value::<T>()))
            .collect::<Vec<_>>();
        entries.sort_by_key(|(row, _)| *row);
        let mut result = SparseVec::new();
        for (row, value) in entries {
            result.push(row, value);
        }
        result
    }
}

pub struct RowIterator<'a> {
    matrix: &'a SparseMatrix,
    slot: usize,
}

impl<'a> Iterator for RowIterator<'a> {
    type Item = MatrixEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.slot == NIL {
            return None;
        }
        let result = self.matrix.entry(self.slot);
        self.slot = self.matrix.slot_next_in_row[self.slot];
        Some(result)
    }
}

pub struct ColumnIterator<'a> {
    matrix: &'a SparseMatrix,
    slot: usize,
}

impl<'a> Iterator for ColumnIterator<'a> {
    type Item = MatrixEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.slot == NIL {
            return None;
        }
        let result = self.matrix.entry(self.slot);
        self.slot = self.matrix.slot_next_in_column[self.slot];
        Some(result)
    }
}

impl Display for SparseMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}x{} matrix, {} entries", self.row_count, self.column_count, self.alive)?;
        for row in 0..self.row_count {
            let mut entries = self.row(row).map(|e| (e.column, e.exact)).collect::<Vec<_>>();
            entries.sort_by_key(|(column, _)| *column);
            write!(f, "{}:", row)?;
            for (column, value) in entries {
                write!(f, " [{}] {}", column, value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
