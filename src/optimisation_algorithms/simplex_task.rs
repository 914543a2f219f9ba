use std::fmt::Display;

use strum_macros::{Display as StrumDisplay, EnumIter};

use crate::math::simplex_number::SimplexNumber;

use super::{
    linear_programming_sparse::SparseMat,
    solver_config::SolverConfig,
    sparse_matrix::SparseMatrix,
};

/**
 * The terminal outcome of a solve.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, StrumDisplay, EnumIter)]
pub enum LinearResult {
    Optimal,
    InfeasiblePrimal,
    InfeasibleOrUnbounded,
    UnboundedPrimal,
    /// the dual is unbounded, hence the primal is infeasible
    UnboundedDual,
    Interrupted,
    Invalid,
    /// a solution is known, but not proven optimal
    Feasible,
}

impl LinearResult {
    pub fn is_infeasible(&self) -> bool {
        matches!(self, LinearResult::InfeasiblePrimal | LinearResult::UnboundedDual)
    }

    pub fn has_solution(&self) -> bool {
        matches!(self, LinearResult::Optimal | LinearResult::Feasible)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, StrumDisplay)]
pub enum SimplexPhase {
    Factorising,
    PrimalFeasibility,
    PrimalOptimality,
    DualOptimality,
    BranchAndBound,
}

/**
 * A snapshot handed to the callbacks.
 */
#[derive(Clone, Debug)]
pub struct SolveProgress {
    pub phase: SimplexPhase,
    pub pivots: usize,
    pub nodes: usize,
    pub objective: Option<f64>,
    pub incumbent: Option<f64>,
}

/**
 * Cooperative hooks of a solve. Every hook may request an abort by returning true; the solve then
 * finishes its current pivot and reports `Interrupted`.
 */
pub trait SolveCallbacks: Sync {
    fn should_abort(&self) -> bool {
        false
    }

    fn solving(&self, _progress: &SolveProgress) -> bool {
        false
    }

    fn before_factorisation(&self, _progress: &SolveProgress) -> bool {
        false
    }

    fn before_pivot_search(&self, _progress: &SolveProgress) -> bool {
        false
    }

    fn after_pivot(&self, _progress: &SolveProgress) -> bool {
        false
    }
}

pub struct NoCallbacks;

impl SolveCallbacks for NoCallbacks {}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SolveStatistics {
    pub pivots: usize,
    pub phase_one_pivots: usize,
    pub dual_pivots: usize,
    pub degenerate_pivots: usize,
    pub bound_flips: usize,
    pub factorisations: usize,
    pub repairs: usize,
    pub cost_recomputations: usize,
    pub perturbations: usize,
    pub minor_pivots: usize,
    pub nodes: usize,
    pub cuts: usize,
}

impl SolveStatistics {
    pub fn absorb(&mut self, other: &SolveStatistics) {
        self.pivots += other.pivots;
        self.phase_one_pivots += other.phase_one_pivots;
        self.dual_pivots += other.dual_pivots;
        self.degenerate_pivots += other.degenerate_pivots;
        self.bound_flips += other.bound_flips;
        self.factorisations += other.factorisations;
        self.repairs += other.repairs;
        self.cost_recomputations += other.cost_recomputations;
        self.perturbations += other.perturbations;
        self.minor_pivots += other.minor_pivots;
        self.nodes += other.nodes;
        self.cuts += other.cuts;
    }
}

impl Display for SolveStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} pivots ({} phase one, {} dual, {} degenerate), {} factorisations, {} repairs, {} nodes, {} cuts",
            self.pivots,
            self.phase_one_pivots,
            self.dual_pivots,
            self.degenerate_pivots,
            self.factorisations,
            self.repairs,
            self.nodes,
            self.cuts
        )
    }
}

/**
 * One solve context: the constraint matrix in the arithmetic of the engine, by column and by row,
 * the objectives, the configuration and the callbacks. Engines, bounds and bases of this context
 * are never shared with other contexts.
 */
#[derive(Clone)]
pub struct SimplexTask<'a, T> {
    pub(crate) columns: SparseMat<T>,
    pub(crate) rows: SparseMat<T>,
    /// cost vectors over all variables, in minimisation sense, in lexicographic order
    pub(crate) goals: Vec<Vec<T>>,
    pub(crate) config: &'a SolverConfig,
    pub(crate) callbacks: &'a dyn SolveCallbacks,
    pub(crate) statistics: SolveStatistics,
    /// state of the surrounding branch-and-bound search, reported to the callbacks
    pub(crate) nodes: usize,
    pub(crate) incumbent: Option<f64>,
}

impl<'a, T: SimplexNumber> SimplexTask<'a, T> {
    pub fn new(
        matrix: &SparseMatrix,
        goals: Vec<Vec<T>>,
        config: &'a SolverConfig,
        callbacks: &'a dyn SolveCallbacks,
    ) -> Self {
        let mut columns = SparseMat::new(matrix.row_count());
        for column in 0..matrix.column_count() {
            columns.append_col(matrix.column_vector::<T>(column).iter().map(|(r, v)| (r, v.clone())));
        }
        let rows = columns.transpose();
        let variable_count = columns.cols();
        let goals = goals
            .into_iter()
            .map(|mut goal| {
                goal.resize(variable_count, T::zero());
                goal
            })
            .collect();
        Self {
            columns,
            rows,
            goals,
            config,
            callbacks,
            statistics: SolveStatistics::default(),
            nodes: 0,
            incumbent: None,
        }
    }

    pub fn with_search_state(mut self, nodes: usize, incumbent: Option<f64>) -> Self {
        self.nodes = nodes;
        self.incumbent = incumbent;
        self
    }

    pub fn row_count(&self) -> usize {
        self.columns.rows()
    }

    pub fn variable_count(&self) -> usize {
        self.columns.cols()
    }

    pub fn statistics(&self) -> &SolveStatistics {
        &self.statistics
    }

    pub fn config(&self) -> &SolverConfig {
        self.config
    }

    pub(crate) fn progress(&self, phase: SimplexPhase, objective: Option<f64>) -> SolveProgress {
        SolveProgress {
            phase,
            pivots: self.statistics.pivots,
            nodes: self.nodes,
            objective,
            incumbent: self.incumbent,
        }
    }
}
