use strum_macros::{Display, EnumIter, EnumString};

use crate::math::fraction::EPSILON;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum ArithmeticMode {
    /// floating point with tolerances
    Double,
    /// arbitrary-precision fractions
    Exact,
    /**
     * Floating point to find the basis, then fractions to certify it. With integer variables the
     * exact re-solve fixes them at the values the floating point search chose, so it certifies the
     * continuous part of that solution only. Optimality over the integer choices rests on the
     * floating point search.
     */
    Both,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum PricingStrategy {
    Automatic,
    SteepestEdge,
    BestReducedCost,
    Partial,
    NewPartial,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum SimplexAlgorithm {
    /// dual simplex for dual-feasible warm starts, primal otherwise
    Automatic,
    Primal,
    Dual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum BranchingStrategy {
    MostFractional,
    PseudoCost,
    /// pseudo-costs, initialised by strong branching
    StrongPseudoCost,
}

/**
 * Every knob of the solvers. Tolerances only affect the double-precision arithmetic.
 */
#[derive(Clone, Debug)]
pub struct SolverConfig {
    pub arithmetic: ArithmeticMode,
    pub pricing: PricingStrategy,
    pub algorithm: SimplexAlgorithm,
    /// pivots per relaxation before the solve is interrupted
    pub max_pivots: usize,

    pub variable_tolerance: f64,
    pub cost_tolerance: f64,
    /// relative epsilon below which floating point results are slammed to zero
    pub num_eps: f64,
    pub pivot_tolerance: f64,
    /// maximum number of eta vectors before a refactorisation
    pub refactor_frequency: usize,
    /// consecutive degenerate pivots before anti-cycling measures start
    pub degeneracy_limit: usize,
    /// size of the candidate pool of the partial pricing strategies
    pub partial_pool_size: usize,
    /// fraction of the pool below which the new-partial pricing refills its heap
    pub partial_refill_fraction: f64,
    /// automatic pricing picks steepest edge below this number of columns
    pub steepest_edge_column_limit: usize,
    pub perturbation_seed: u64,

    pub cuts: bool,
    pub gomory_cuts: bool,
    pub cut_depth_limit: usize,
    pub max_cut_rounds: usize,
    pub max_cuts_per_round: usize,
    pub cut_min_fractionality: f64,

    pub mip_gap: f64,
    pub integrality_tolerance: f64,
    pub branching_before_feasible: BranchingStrategy,
    pub branching_after_feasible: BranchingStrategy,
    pub strong_branching_pivots: usize,
    pub strong_branching_candidates: usize,
    pub parallel_strong_branching: bool,
    pub presolve: bool,
    pub max_nodes: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            arithmetic: ArithmeticMode::Double,
            pricing: PricingStrategy::Automatic,
            algorithm: SimplexAlgorithm::Automatic,
            max_pivots: 100_000,

            variable_tolerance: 1e-8,
            cost_tolerance: 1e-9,
            num_eps: EPSILON,
            pivot_tolerance: 1e-11,
            refactor_frequency: 100,
            degeneracy_limit: 50,
            partial_pool_size: 32,
            partial_refill_fraction: 0.25,
            steepest_edge_column_limit: 2000,
            perturbation_seed: 0x5eed,

            cuts: true,
            gomory_cuts: true,
            cut_depth_limit: 3,
            max_cut_rounds: 2,
            max_cuts_per_round: 10,
            cut_min_fractionality: 1e-3,

            mip_gap: 1e-9,
            integrality_tolerance: 1e-7,
            branching_before_feasible: BranchingStrategy::StrongPseudoCost,
            branching_after_feasible: BranchingStrategy::PseudoCost,
            strong_branching_pivots: 100,
            strong_branching_candidates: 8,
            parallel_strong_branching: false,
            presolve: true,
            max_nodes: usize::MAX,
        }
    }
}

impl SolverConfig {
    pub fn exact() -> Self {
        Self::default().with_arithmetic(ArithmeticMode::Exact)
    }

    pub fn with_arithmetic(mut self, arithmetic: ArithmeticMode) -> Self {
        self.arithmetic = arithmetic;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingStrategy) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_algorithm(mut self, algorithm: SimplexAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_max_pivots(mut self, max_pivots: usize) -> Self {
        self.max_pivots = max_pivots;
        self
    }

    pub fn with_tolerances(mut self, variable_tolerance: f64, cost_tolerance: f64) -> Self {
        self.variable_tolerance = variable_tolerance;
        self.cost_tolerance = cost_tolerance;
        self
    }

    pub fn with_cuts(mut self, cuts: bool) -> Self {
        self.cuts = cuts;
        self
    }

    pub fn with_gomory_cuts(mut self, gomory_cuts: bool) -> Self {
        self.gomory_cuts = gomory_cuts;
        self
    }

    pub fn with_mip_gap(mut self, mip_gap: f64) -> Self {
        self.mip_gap = mip_gap;
        self
    }

    pub fn with_branching(mut self, before_feasible: BranchingStrategy, after_feasible: BranchingStrategy) -> Self {
        self.branching_before_feasible = before_feasible;
        self.branching_after_feasible = after_feasible;
        self
    }

    pub fn with_parallel_strong_branching(mut self, parallel: bool) -> Self {
        self.parallel_strong_branching = parallel;
        self
    }

    pub fn with_presolve(mut self, presolve: bool) -> Self {
        self.presolve = presolve;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }
}
