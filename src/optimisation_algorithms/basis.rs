use std::fmt::Display;

use strum_macros::{Display as StrumDisplay, EnumIter};

/**
 * Where a variable sits with respect to the basis.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, StrumDisplay, EnumIter)]
pub enum VarStatus {
    Basic,
    /// non-basic at its lower bound
    Lower,
    /// non-basic at its upper bound
    Upper,
    /// non-basic free variable, at zero
    Zero,
    /// non-basic with equal bounds
    Fixed,
}

impl VarStatus {
    pub fn is_basic(&self) -> bool {
        *self == VarStatus::Basic
    }
}

const NOT_BASIC: usize = usize::MAX;

/**
 * The status of every variable, and the basic variables in basis-position order.
 * Invariant: the number of basic variables equals the number of rows.
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Basis {
    statuses: Vec<VarStatus>,
    basic: Vec<usize>,
    positions: Vec<usize>,
}

impl Basis {
    /**
     * The slack basis: every row's slack is basic, every structural variable takes the given status.
     */
    pub fn slack(structural_statuses: Vec<VarStatus>, row_count: usize) -> Self {
        let structural_count = structural_statuses.len();
        let mut statuses = structural_statuses;
        statuses.extend(std::iter::repeat_n(VarStatus::Basic, row_count));
        let basic = (structural_count..structural_count + row_count).collect();
        Self::from_parts(statuses, basic)
    }

    pub fn from_parts(statuses: Vec<VarStatus>, basic: Vec<usize>) -> Self {
        let mut positions = vec![NOT_BASIC; statuses.len()];
        for (position, &var) in basic.iter().enumerate() {
            positions[var] = position;
        }
        Self {
            statuses,
            basic,
            positions,
        }
    }

    pub fn row_count(&self) -> usize {
        self.basic.len()
    }

    pub fn variable_count(&self) -> usize {
        self.statuses.len()
    }

    pub fn status(&self, var: usize) -> VarStatus {
        self.statuses[var]
    }

    pub fn statuses(&self) -> &[VarStatus] {
        &self.statuses
    }

    /**
     * Changes the status of a non-basic variable without touching the basis.
     */
    pub fn set_status(&mut self, var: usize, status: VarStatus) {
        debug_assert!(!self.statuses[var].is_basic() && !status.is_basic());
        self.statuses[var] = status;
    }

    pub fn basic(&self) -> &[usize] {
        &self.basic
    }

    pub fn basic_var(&self, position: usize) -> usize {
        self.basic[position]
    }

    pub fn position(&self, var: usize) -> Option<usize> {
        match self.positions[var] {
            NOT_BASIC => None,
            position => Some(position),
        }
    }

    /**
     * Exchanges the basic variable at `position` for `entering`; the leaving variable gets `leaving_status`.
     */
    pub fn pivot(&mut self, position: usize, entering: usize, leaving_status: VarStatus) {
        let leaving = self.basic[position];
        self.statuses[leaving] = leaving_status;
        self.positions[leaving] = NOT_BASIC;
        self.statuses[entering] = VarStatus::Basic;
        self.positions[entering] = position;
        self.basic[position] = entering;
    }

    /**
     * Adds rows whose slack variables (appended as new variables) enter the basis.
     */
    pub fn add_slack_rows(&mut self, count: usize) {
        for _ in 0..count {
            let var = self.statuses.len();
            self.statuses.push(VarStatus::Basic);
            self.positions.push(self.basic.len());
            self.basic.push(var);
        }
    }

    /**
     * The basis over the first `variable_count` variables, if exactly `row_count` of them are basic.
     * Drops the rows of cuts appended after the model rows.
     */
    pub fn truncate(&self, variable_count: usize, row_count: usize) -> Option<Basis> {
        if self.statuses.len() < variable_count {
            return None;
        }
        let basic: Vec<usize> = self
            .basic
            .iter()
            .copied()
            .filter(|&var| var < variable_count)
            .collect();
        if basic.len() != row_count {
            return None;
        }
        Some(Self::from_parts(self.statuses[..variable_count].to_vec(), basic))
    }

    pub fn is_consistent(&self) -> bool {
        self.statuses.iter().filter(|s| s.is_basic()).count() == self.basic.len()
            && self
                .basic
                .iter()
                .enumerate()
                .all(|(position, &var)| self.positions[var] == position)
    }
}

impl Display for Basis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "basis {:?}", self.basic)
    }
}

#[cfg(test)]
mod tests {
    use super::{Basis, VarStatus};

    #[test]
    fn slack_basis_and_pivot() {
        let mut basis = Basis::slack(vec![VarStatus::Lower, VarStatus::Zero], 2);
        assert_eq!(basis.basic(), &[2, 3]);
        assert!(basis.is_consistent());

        basis.pivot(1, 0, VarStatus::Upper);
        assert_eq!(basis.basic(), &[2, 0]);
        assert_eq!(basis.status(3), VarStatus::Upper);
        assert_eq!(basis.position(0), Some(1));
        assert_eq!(basis.position(3), None);

        basis.add_slack_rows(1);
        assert_eq!(basis.basic_var(2), 4);
        assert!(basis.is_consistent());

        let truncated = basis.truncate(4, 2).unwrap();
        assert_eq!(truncated.basic(), &[2, 0]);
        assert!(truncated.is_consistent());
        assert!(basis.truncate(2, 2).is_none());
    }
}
