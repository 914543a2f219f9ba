use anyhow::{Result, anyhow};
use log::{debug, trace, warn};
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{RngCore, SeedableRng},
};

use crate::math::simplex_number::SimplexNumber;

use super::{
    basis::{Basis, VarStatus},
    basis_factorisation::{BasisFactorisation, SingularBasis},
    bound_manager::{BoundManager, status_within},
    simplex_pricing::Pricing,
    simplex_task::{LinearResult, SimplexPhase, SimplexTask, SolveProgress, SolveStatistics},
    solver_config::SimplexAlgorithm,
};

/**
 * What one iteration of the pivot loops did.
 */
#[derive(Debug)]
pub(crate) enum PivotOutcome {
    /// the basis changed, or the entering variable moved to its other bound
    Progress,
    Unbounded,
    /// the refactorisation after the pivot failed; the basis must be repaired before continuing
    Recoverable(SingularBasis),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseEnd {
    /// phase one: no basic variable is outside its bounds anymore
    Feasible,
    /// no candidate to enter (primal), or no basic variable to leave (dual)
    Optimal,
    Unbounded,
    /// the dual simplex made no progress for too long
    Stalled,
}

#[derive(Debug)]
enum RatioTest<T> {
    Leave { position: usize, step: T, target: T },
    Flip(T),
    Unbounded,
}

/**
 * Bounded revised simplex over one solve context. The same code serves the exact and the
 * floating point arithmetic; tolerances are zero in the former.
 *
 * Every variable j has a column a_j and the model reads `Σ a_j x_j = 0`: right-hand sides live in
 * the bounds of the slack variables. Basic values follow from `x_B = -B⁻¹ N x_N`.
 */
pub struct PivotEngine<'a, T: SimplexNumber> {
    task: SimplexTask<'a, T>,
    bounds: BoundManager<T>,
    basis: Basis,
    factorisation: BasisFactorisation<T>,
    pricing: Pricing<T>,

    /// working bounds: the bounds of the context, possibly perturbed or fixed by earlier goals
    lower: Vec<T>,
    upper: Vec<T>,
    /// bounds the ratio tests apply to the basic variable of each basis position
    test_lower: Vec<T>,
    test_upper: Vec<T>,
    values: Vec<T>,
    costs: Vec<T>,
    reduced: Vec<T>,
    dual_weights: Vec<T>,
    /// variables fixed for the remaining goals, with the status they had
    fixings: Vec<(usize, VarStatus)>,

    var_tol: T,
    cost_tol: T,
    pivot_tol: T,
    num_eps: f64,
    pivot_limit: usize,

    phase: SimplexPhase,
    degenerate_streak: usize,
    bland: bool,
    perturbed: bool,
    perturbation_spent: bool,
    aborted: bool,
    rng: ChaCha8Rng,
    goal_values: Vec<T>,
}

impl<'a, T: SimplexNumber> PivotEngine<'a, T> {
    pub fn new(task: SimplexTask<'a, T>, bounds: BoundManager<T>, basis: Basis) -> Result<Self> {
        let n = task.variable_count();
        let m = task.row_count();
        if basis.variable_count() != n || basis.row_count() != m {
            return Err(anyhow!(
                "a basis over {} variables and {} rows does not fit a task of {} variables and {} rows",
                basis.variable_count(),
                basis.row_count(),
                n,
                m
            ));
        }
        if bounds.structural_count() + m != n {
            return Err(anyhow!(
                "every row needs its slack variable: {} structural variables and {} rows, but {} variables",
                bounds.structural_count(),
                m,
                n
            ));
        }
        if !basis.is_consistent() {
            return Err(anyhow!("inconsistent {}", basis));
        }

        let config = task.config;
        Ok(Self {
            factorisation: BasisFactorisation::new(
                m,
                config.num_eps,
                config.pivot_tolerance,
                config.refactor_frequency,
            ),
            pricing: Pricing::new(config, n),
            lower: vec![T::zero(); n],
            upper: vec![T::zero(); n],
            test_lower: vec![T::zero(); m],
            test_upper: vec![T::zero(); m],
            values: vec![T::zero(); n],
            costs: vec![T::zero(); n],
            reduced: vec![T::zero(); n],
            dual_weights: vec![T::one(); m],
            fixings: vec![],
            var_tol: T::tolerance(config.variable_tolerance),
            cost_tol: T::tolerance(config.cost_tolerance),
            pivot_tol: T::tolerance(config.pivot_tolerance),
            num_eps: config.num_eps,
            pivot_limit: config.max_pivots,
            phase: SimplexPhase::Factorising,
            degenerate_streak: 0,
            bland: false,
            perturbed: false,
            perturbation_spent: false,
            aborted: false,
            rng: ChaCha8Rng::seed_from_u64(config.perturbation_seed),
            goal_values: vec![],
            task,
            bounds,
            basis,
        })
    }

    pub fn set_pivot_limit(&mut self, pivot_limit: usize) {
        self.pivot_limit = pivot_limit;
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn value(&self, var: usize) -> &T {
        &self.values[var]
    }

    pub fn reduced_costs(&self) -> &[T] {
        &self.reduced
    }

    /// Optimal values of the goals, in minimisation sense, in the order they were optimised.
    pub fn goal_values(&self) -> &[T] {
        &self.goal_values
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn bounds(&self) -> &BoundManager<T> {
        &self.bounds
    }

    pub fn bounds_mut(&mut self) -> (&mut BoundManager<T>, &mut Basis) {
        (&mut self.bounds, &mut self.basis)
    }

    pub fn task(&self) -> &SimplexTask<'a, T> {
        &self.task
    }

    pub fn statistics(&self) -> &SolveStatistics {
        &self.task.statistics
    }

    pub fn into_parts(self) -> (SimplexTask<'a, T>, BoundManager<T>, Basis) {
        (self.task, self.bounds, self.basis)
    }

    /**
     * Row of the simplex tableau of a basic variable: entry j is the coefficient of non-basic
     * variable j in `x_var = -Σ row_j x_j`; the entry of `var` itself is one.
     */
    pub fn tableau_row(&self, var: usize) -> Option<Vec<T>> {
        let position = self.basis.position(var)?;
        let (_, mut row) = self.pivot_row(position);
        row[var] = T::one();
        Some(row)
    }

    /**
     * Optimises the goals of the task in order. The basis and the bounds of the engine are
     * kept, so a next call warm-starts.
     */
    pub fn solve(&mut self) -> LinearResult {
        let result = match self.run() {
            Ok(()) => LinearResult::Optimal,
            Err(result) => result,
        };
        self.release_fixings();
        self.task.statistics.minor_pivots = self.bounds.minor_pivots();
        debug!("simplex: {} after {}", result, self.task.statistics);
        result
    }

    fn run(&mut self) -> Result<(), LinearResult> {
        self.aborted = false;
        self.bland = false;
        self.perturbed = false;
        self.perturbation_spent = false;
        self.degenerate_streak = 0;
        self.goal_values.clear();
        self.phase = SimplexPhase::Factorising;

        let callbacks = self.task.callbacks;
        if callbacks.should_abort() || callbacks.solving(&self.progress()) {
            return Err(LinearResult::Interrupted);
        }

        for var in 0..self.task.variable_count() {
            if self.bounds.lower(var) > self.bounds.upper(var) {
                debug!(
                    "variable {} has crossing bounds [{}, {}]",
                    var,
                    self.bounds.lower(var),
                    self.bounds.upper(var)
                );
                return Err(LinearResult::InfeasiblePrimal);
            }
        }

        self.load_bounds();
        self.normalise_statuses();
        self.reset_nonbasic_values();
        match self.factor() {
            Ok(()) => self.compute_basic_values(),
            Err(singular) => self.recover(singular)?,
        }

        let goal_count = self.task.goals.len().max(1);
        for goal in 0..goal_count {
            let costs = match self.task.goals.get(goal) {
                Some(costs) => costs.clone(),
                None => vec![T::zero(); self.task.variable_count()],
            };
            loop {
                self.reach_optimality(&costs)?;
                if !self.perturbed {
                    break;
                }
                self.remove_perturbation();
            }
            let value = self.objective();
            trace!("goal {} optimal at {}", goal, value);
            self.goal_values.push(value);
            if goal + 1 < goal_count {
                self.fix_for_next_goal();
            }
        }
        Ok(())
    }

    fn reach_optimality(&mut self, goal_costs: &[T]) -> Result<(), LinearResult> {
        self.costs = goal_costs.to_vec();
        self.compute_reduced_costs();

        if !self.is_primal_feasible() {
            let algorithm = self.task.config.algorithm;
            if algorithm != SimplexAlgorithm::Primal && self.is_dual_feasible() {
                match self.run_dual()? {
                    PhaseEnd::Unbounded => return Err(LinearResult::UnboundedDual),
                    PhaseEnd::Stalled => debug!("dual simplex stalled, continuing with the primal simplex"),
                    PhaseEnd::Optimal | PhaseEnd::Feasible => {}
                }
            } else if algorithm == SimplexAlgorithm::Dual {
                debug!("start is not dual feasible, using the primal simplex");
            }
        }

        if !self.is_primal_feasible() {
            match self.run_primal(true)? {
                PhaseEnd::Feasible => {}
                PhaseEnd::Optimal => {
                    debug!("phase one found no improving direction: infeasible");
                    return Err(LinearResult::InfeasiblePrimal);
                }
                PhaseEnd::Unbounded | PhaseEnd::Stalled => {
                    warn!("phase one objective became unbounded");
                    return Err(LinearResult::Invalid);
                }
            }
            self.costs = goal_costs.to_vec();
        }

        match self.run_primal(false)? {
            PhaseEnd::Optimal | PhaseEnd::Feasible => Ok(()),
            PhaseEnd::Unbounded => Err(LinearResult::UnboundedPrimal),
            PhaseEnd::Stalled => Err(LinearResult::Invalid),
        }
    }

    /**
     * Primal simplex. In phase one the costs drive the infeasible basic variables towards their
     * bounds and are rebuilt every iteration; otherwise the current costs are optimised.
     */
    fn run_primal(&mut self, phase_one: bool) -> Result<PhaseEnd, LinearResult> {
        if phase_one {
            self.phase = SimplexPhase::PrimalFeasibility;
        } else {
            self.phase = SimplexPhase::PrimalOptimality;
            self.reset_test_bounds();
            self.compute_reduced_costs();
        }

        loop {
            self.poll()?;
            if phase_one && !self.set_phase_one_costs() {
                return Ok(PhaseEnd::Feasible);
            }

            let entering = match self.choose_entering() {
                Some(var) => var,
                None if phase_one => return Ok(PhaseEnd::Optimal),
                None => {
                    self.compute_reduced_costs();
                    match self.choose_entering() {
                        Some(var) => {
                            debug!("reduced costs drifted: variable {} improves after recomputation", var);
                            var
                        }
                        None => return Ok(PhaseEnd::Optimal),
                    }
                }
            };

            self.check_pivot_limit()?;
            match self.primal_iteration(entering) {
                PivotOutcome::Progress => {}
                PivotOutcome::Unbounded => return Ok(PhaseEnd::Unbounded),
                PivotOutcome::Recoverable(singular) => self.recover(singular)?,
            }
            self.after_pivot();
        }
    }

    fn choose_entering(&mut self) -> Option<usize> {
        self.pricing
            .choose(&self.reduced, &self.basis, &self.cost_tol, self.bland)
    }

    fn primal_iteration(&mut self, entering: usize) -> PivotOutcome {
        let up = self.reduced[entering].is_negative();
        let mut alpha = self.column_of(entering);
        self.factorisation.solve_column(&mut alpha);

        match self.primal_ratio_test(entering, up, &alpha) {
            RatioTest::Unbounded => PivotOutcome::Unbounded,
            RatioTest::Flip(step) => {
                self.move_entering(entering, up, &alpha, &step);
                let (value, status) = if up {
                    (self.upper[entering].clone(), VarStatus::Upper)
                } else {
                    (self.lower[entering].clone(), VarStatus::Lower)
                };
                self.values[entering] = value;
                self.basis.set_status(entering, status);
                self.task.statistics.bound_flips += 1;
                self.count_pivot();
                self.track_degeneracy(step.is_negligible(&self.var_tol));
                PivotOutcome::Progress
            }
            RatioTest::Leave {
                position,
                step,
                target,
            } => {
                let leaving = self.basis.basic_var(position);
                self.track_degeneracy(step.is_negligible(&self.var_tol));
                self.move_entering(entering, up, &alpha, &step);
                let status = self.status_at(leaving, &target);
                self.values[leaving] = target;
                let (rho, row) = self.pivot_row(position);
                self.exchange(position, entering, &alpha, &rho, &row, status)
            }
        }
    }

    /**
     * Harris' two-pass ratio test. The first pass finds the largest step that keeps every basic
     * variable within its bounds widened by the tolerance; the second picks, among the variables
     * blocking within that step, the one with the largest pivot. Without tolerances this is the
     * textbook minimum ratio, ties broken by the largest pivot (or the lowest index under Bland's rule).
     */
    fn primal_ratio_test(&self, entering: usize, up: bool, alpha: &[T]) -> RatioTest<T> {
        let value = &self.values[entering];
        let own_step = if up {
            self.upper[entering].minus(value)
        } else {
            value.minus(&self.lower[entering])
        };
        let increases = |a: &T| if up { a.is_negative() } else { a.is_positive() };

        let mut max_step = own_step.clone();
        for (position, a) in alpha.iter().enumerate() {
            if a.is_zero() || a.abs() <= self.pivot_tol {
                continue;
            }
            let x = &self.values[self.basis.basic_var(position)];
            let gap = if increases(a) {
                let bound = &self.test_upper[position];
                if bound.is_infinite() {
                    continue;
                }
                bound.plus(&self.var_tol).minus(x)
            } else {
                let bound = &self.test_lower[position];
                if bound.is_infinite() {
                    continue;
                }
                x.minus(bound).plus(&self.var_tol)
            };
            let step = gap.max(T::zero()).over(&a.abs());
            if step < max_step {
                max_step = step;
            }
        }

        let mut best: Option<(usize, T, T, T)> = None;
        for (position, a) in alpha.iter().enumerate() {
            if a.is_zero() || a.abs() <= self.pivot_tol {
                continue;
            }
            let x = &self.values[self.basis.basic_var(position)];
            let (gap, target) = if increases(a) {
                let bound = &self.test_upper[position];
                if bound.is_infinite() {
                    continue;
                }
                (bound.minus(x), bound.clone())
            } else {
                let bound = &self.test_lower[position];
                if bound.is_infinite() {
                    continue;
                }
                (x.minus(bound), bound.clone())
            };
            let magnitude = a.abs();
            let step = gap.max(T::zero()).over(&magnitude);
            if step > max_step {
                continue;
            }
            let better = match &best {
                None => true,
                Some((best_position, best_magnitude, best_step, _)) => {
                    if self.bland {
                        step < *best_step
                            || (step == *best_step
                                && self.basis.basic_var(position) < self.basis.basic_var(*best_position))
                    } else {
                        magnitude > *best_magnitude
                    }
                }
            };
            if better {
                best = Some((position, magnitude, step, target));
            }
        }

        match best {
            Some((position, _, step, target)) => RatioTest::Leave {
                position,
                step,
                target,
            },
            None if own_step.is_finite() => RatioTest::Flip(own_step),
            None => RatioTest::Unbounded,
        }
    }

    fn move_entering(&mut self, entering: usize, up: bool, alpha: &[T], step: &T) {
        if step.is_zero() {
            return;
        }
        let delta = if up { step.clone() } else { -step.clone() };
        self.values[entering] += &delta;
        for (position, a) in alpha.iter().enumerate() {
            if !a.is_zero() {
                let var = self.basis.basic_var(position);
                self.values[var].sub_product(a, &delta, self.num_eps);
            }
        }
    }

    /**
     * Bounded dual simplex, from a dual feasible basis. The leaving row is the one of largest
     * infeasibility relative to its dual steepest-edge weight.
     */
    fn run_dual(&mut self) -> Result<PhaseEnd, LinearResult> {
        self.phase = SimplexPhase::DualOptimality;
        self.reset_test_bounds();
        self.dual_weights = vec![T::one(); self.task.row_count()];
        self.degenerate_streak = 0;

        loop {
            self.poll()?;
            let Some((position, target)) = self.choose_leaving_row() else {
                return Ok(PhaseEnd::Optimal);
            };
            let leaving = self.basis.basic_var(position);
            let leaving_up = target > self.values[leaving];
            let (rho, row) = self.pivot_row(position);
            let Some(entering) = self.choose_entering_dual(&row, leaving_up) else {
                debug!("no entering variable for leaving variable {}: dual unbounded", leaving);
                return Ok(PhaseEnd::Unbounded);
            };

            let mut alpha = self.column_of(entering);
            self.factorisation.solve_column(&mut alpha);
            let pivot = alpha[position].clone();
            if pivot.is_zero() || pivot.abs() <= self.pivot_tol {
                warn!(
                    "pivot row and column disagree on the pivot of variable {} ({} against {})",
                    entering, row[entering], pivot
                );
                return Ok(PhaseEnd::Stalled);
            }

            self.check_pivot_limit()?;
            if self.reduced[entering].is_negligible(&self.cost_tol) {
                self.task.statistics.degenerate_pivots += 1;
                self.degenerate_streak += 1;
                if self.degenerate_streak > self.task.config.degeneracy_limit {
                    return Ok(PhaseEnd::Stalled);
                }
            } else {
                self.degenerate_streak = 0;
            }

            let delta = self.values[leaving].minus(&target).over(&pivot);
            self.values[entering] += &delta;
            for (other, a) in alpha.iter().enumerate() {
                if other != position && !a.is_zero() {
                    let var = self.basis.basic_var(other);
                    self.values[var].sub_product(a, &delta, self.num_eps);
                }
            }
            let status = self.status_at(leaving, &target);
            self.values[leaving] = target;

            match self.exchange(position, entering, &alpha, &rho, &row, status) {
                PivotOutcome::Progress | PivotOutcome::Unbounded => {}
                PivotOutcome::Recoverable(singular) => self.recover(singular)?,
            }
            self.after_pivot();
        }
    }

    fn choose_leaving_row(&self) -> Option<(usize, T)> {
        let mut best: Option<(usize, T, T)> = None;
        for position in 0..self.task.row_count() {
            let x = &self.values[self.basis.basic_var(position)];
            let lower = &self.test_lower[position];
            let upper = &self.test_upper[position];
            let (infeasibility, target) = if lower.is_finite() && x < &lower.minus(&self.var_tol) {
                (lower.minus(x), lower.clone())
            } else if upper.is_finite() && x > &upper.plus(&self.var_tol) {
                (x.minus(upper), upper.clone())
            } else {
                continue;
            };
            let score = infeasibility
                .times(&infeasibility)
                .over(&self.dual_weights[position]);
            if best.as_ref().is_none_or(|(_, best_score, _)| &score > best_score) {
                best = Some((position, score, target));
            }
        }
        best.map(|(position, _, target)| (position, target))
    }

    /**
     * Dual ratio test with Harris' relaxation: the entering variable keeps every reduced cost
     * dual feasible up to the cost tolerance, and has the largest pivot among the candidates.
     */
    fn choose_entering_dual(&self, row: &[T], leaving_up: bool) -> Option<usize> {
        let eligible = |var: usize, coefficient: &T| -> bool {
            if coefficient.is_zero() || coefficient.abs() <= self.pivot_tol {
                return false;
            }
            let entering_up = if coefficient.is_positive() {
                !leaving_up
            } else {
                leaving_up
            };
            match self.basis.status(var) {
                VarStatus::Basic | VarStatus::Fixed => false,
                VarStatus::Lower => entering_up,
                VarStatus::Upper => !entering_up,
                VarStatus::Zero => true,
            }
        };
        let clamped = |var: usize| -> T {
            let reduced = &self.reduced[var];
            match self.basis.status(var) {
                VarStatus::Lower if reduced.is_negative() => T::zero(),
                VarStatus::Upper if reduced.is_positive() => T::zero(),
                _ => reduced.abs(),
            }
        };

        let mut max_step = T::infinity();
        for (var, coefficient) in row.iter().enumerate() {
            if !eligible(var, coefficient) {
                continue;
            }
            let step = clamped(var).plus(&self.cost_tol).over(&coefficient.abs());
            if step < max_step {
                max_step = step;
            }
        }

        let mut best: Option<(usize, T)> = None;
        for (var, coefficient) in row.iter().enumerate() {
            if !eligible(var, coefficient) {
                continue;
            }
            let magnitude = coefficient.abs();
            let step = clamped(var).over(&magnitude);
            if step <= max_step && best.as_ref().is_none_or(|(_, best_magnitude)| &magnitude > best_magnitude) {
                best = Some((var, magnitude));
            }
        }
        best.map(|(var, _)| var)
    }

    /**
     * Replaces the basic variable at `position` by `entering`. `alpha` is the solved column of
     * the entering variable, `rho` and `row` the solved unit row and the tableau row of the position.
     */
    fn exchange(
        &mut self,
        position: usize,
        entering: usize,
        alpha: &[T],
        rho: &[T],
        row: &[T],
        leaving_status: VarStatus,
    ) -> PivotOutcome {
        let leaving = self.basis.basic_var(position);
        let pivot = alpha[position].clone();

        let theta = self.reduced[entering].over(&pivot);
        if !theta.is_zero() {
            for (var, coefficient) in row.iter().enumerate() {
                if var != entering && !coefficient.is_zero() {
                    self.reduced[var].sub_product(&theta, coefficient, self.num_eps);
                }
            }
        }
        self.reduced[leaving] = -theta;
        self.reduced[entering] = T::zero();

        if self.pricing.maintains_weights() {
            self.update_primal_weights(entering, leaving, &pivot, alpha, row);
        }
        if self.phase == SimplexPhase::DualOptimality {
            self.update_dual_weights(position, &pivot, alpha, rho);
        }

        self.basis.pivot(position, entering, leaving_status);
        self.test_lower[position] = self.lower[entering].clone();
        self.test_upper[position] = self.upper[entering].clone();
        self.count_pivot();
        trace!(
            "pivot {}: {} enters, {} leaves as {}",
            self.task.statistics.pivots, entering, leaving, leaving_status
        );

        self.factorisation.update(position, alpha);
        if self.factorisation.needs_refactor() {
            if let Err(singular) = self.factor() {
                return PivotOutcome::Recoverable(singular);
            }
            self.compute_basic_values();
            self.compute_reduced_costs();
        }
        PivotOutcome::Progress
    }

    fn count_pivot(&mut self) {
        let statistics = &mut self.task.statistics;
        statistics.pivots += 1;
        match self.phase {
            SimplexPhase::PrimalFeasibility => statistics.phase_one_pivots += 1,
            SimplexPhase::DualOptimality => statistics.dual_pivots += 1,
            _ => {}
        }
    }

    fn update_primal_weights(&mut self, entering: usize, leaving: usize, pivot: &T, alpha: &[T], row: &[T]) {
        // Forrest, J. J., & Goldfarb, D. (1992).
        // Steepest-edge simplex algorithms for linear programming.
        // Mathematical programming, 57(1-3), 341-374.
        let mut v = alpha.to_vec();
        self.factorisation.solve_row(&mut v);

        let mut pivot_sq_norm = T::one();
        for a in alpha {
            pivot_sq_norm.add_product(a, a);
        }
        let pivot_sq = pivot.times(pivot);

        for (var, coefficient) in row.iter().enumerate() {
            if var == entering || coefficient.is_zero() {
                continue;
            }
            let helper = self.task.columns.col_dot(var, &v);
            let ratio = coefficient.over(pivot);
            let ratio_sq = ratio.times(&ratio);
            let mut weight = self.pricing.weights[var].clone();
            weight.sub_product(&ratio.plus(&ratio), &helper, self.num_eps);
            weight.add_product(&ratio_sq, &pivot_sq_norm);
            self.pricing.weights[var] = weight.max(ratio_sq.plus(&T::one()));
        }

        let floor = T::one().over(&pivot_sq).plus(&T::one());
        self.pricing.weights[leaving] = pivot_sq_norm.over(&pivot_sq).max(floor);
    }

    fn update_dual_weights(&mut self, position: usize, pivot: &T, alpha: &[T], rho: &[T]) {
        let mut tau = rho.to_vec();
        self.factorisation.solve_column(&mut tau);

        let mut rho_sq_norm = T::zero();
        for r in rho {
            rho_sq_norm.add_product(r, r);
        }
        let pivot_sq = pivot.times(pivot);

        for (other, a) in alpha.iter().enumerate() {
            if other == position || a.is_zero() {
                continue;
            }
            let ratio = a.over(pivot);
            let mut weight = self.dual_weights[other].clone();
            weight.sub_product(&ratio.plus(&ratio), &tau[other], self.num_eps);
            weight.add_product(&ratio.times(&ratio), &rho_sq_norm);
            self.dual_weights[other] = if weight.is_positive() { weight } else { T::one() };
        }

        let weight = rho_sq_norm.over(&pivot_sq);
        self.dual_weights[position] = if weight.is_positive() { weight } else { T::one() };
    }

    fn track_degeneracy(&mut self, degenerate: bool) {
        if !degenerate {
            self.degenerate_streak = 0;
            if self.bland {
                trace!("progress made, leaving Bland's rule");
                self.bland = false;
            }
            return;
        }

        self.task.statistics.degenerate_pivots += 1;
        self.degenerate_streak += 1;
        if self.degenerate_streak > self.task.config.degeneracy_limit && !self.bland {
            if T::EXACT || self.perturbed || self.perturbation_spent {
                debug!(
                    "{} degenerate pivots in a row, switching to Bland's rule",
                    self.degenerate_streak
                );
                self.bland = true;
            } else {
                self.perturb();
            }
            self.degenerate_streak = 0;
        }
    }

    /**
     * Widens the bounds that degenerate basic variables sit on by small random amounts.
     */
    fn perturb(&mut self) {
        let mut shifted = 0;
        for position in 0..self.task.row_count() {
            let var = self.basis.basic_var(position);
            let x = self.values[var].clone();
            let lower = self.lower[var].clone();
            if lower.is_finite() && x.minus(&lower) <= self.var_tol {
                let shift = self.random_shift(&lower);
                self.lower[var] -= &shift;
                shifted += 1;
            }
            let upper = self.upper[var].clone();
            if upper.is_finite() && upper.minus(&x) <= self.var_tol {
                let shift = self.random_shift(&upper);
                self.upper[var] += &shift;
                shifted += 1;
            }
            if self.phase != SimplexPhase::PrimalFeasibility {
                self.test_lower[position] = self.lower[var].clone();
                self.test_upper[position] = self.upper[var].clone();
            }
        }
        self.perturbed = true;
        self.task.statistics.perturbations += 1;
        debug!("perturbed {} bounds of degenerate basic variables", shifted);
    }

    fn random_shift(&mut self, bound: &T) -> T {
        let random = self.rng.next_u32() as f64 / u32::MAX as f64;
        let magnitude = 1.0 + bound.approximate().abs();
        T::tolerance(self.task.config.variable_tolerance * 100.0 * magnitude * (1.0 + random))
    }

    fn remove_perturbation(&mut self) {
        self.load_bounds();
        self.normalise_statuses();
        self.reset_nonbasic_values();
        self.compute_basic_values();
        self.perturbed = false;
        self.perturbation_spent = true;
        self.bland = false;
        self.degenerate_streak = 0;
        debug!("perturbation removed, solving again from the perturbed optimum");
    }

    fn fix_for_next_goal(&mut self) {
        for var in 0..self.task.variable_count() {
            let status = self.basis.status(var);
            if matches!(status, VarStatus::Basic | VarStatus::Fixed)
                || self.reduced[var].is_negligible(&self.cost_tol)
            {
                continue;
            }
            self.fixings.push((var, status));
            self.lower[var] = self.values[var].clone();
            self.upper[var] = self.values[var].clone();
            self.basis.set_status(var, VarStatus::Fixed);
        }
        trace!("{} variables fixed for the next goals", self.fixings.len());
    }

    fn release_fixings(&mut self) {
        for (var, status) in std::mem::take(&mut self.fixings) {
            if !self.basis.status(var).is_basic() {
                self.basis.set_status(var, status);
            }
        }
        self.load_bounds();
        self.perturbed = false;
    }

    fn load_bounds(&mut self) {
        for var in 0..self.task.variable_count() {
            let (lower, upper) = self.bounds.bounds(var);
            self.lower[var] = lower;
            self.upper[var] = upper;
        }
        for &(var, _) in &self.fixings {
            self.lower[var] = self.values[var].clone();
            self.upper[var] = self.values[var].clone();
        }
    }

    fn normalise_statuses(&mut self) {
        for var in 0..self.task.variable_count() {
            let current = self.basis.status(var);
            if current.is_basic() {
                continue;
            }
            let valid = status_within(&self.lower[var], &self.upper[var], current);
            if valid != current {
                self.basis.set_status(var, valid);
            }
        }
    }

    fn nonbasic_value(&self, var: usize) -> T {
        match self.basis.status(var) {
            VarStatus::Lower | VarStatus::Fixed => self.lower[var].clone(),
            VarStatus::Upper => self.upper[var].clone(),
            VarStatus::Zero | VarStatus::Basic => T::zero(),
        }
    }

    fn reset_nonbasic_values(&mut self) {
        for var in 0..self.task.variable_count() {
            if !self.basis.status(var).is_basic() {
                self.values[var] = self.nonbasic_value(var);
            }
        }
    }

    /// The status of a variable that leaves the basis at `value`.
    fn status_at(&self, var: usize, value: &T) -> VarStatus {
        let lower = &self.lower[var];
        let upper = &self.upper[var];
        if lower.is_finite() && lower == upper {
            VarStatus::Fixed
        } else if value == lower {
            VarStatus::Lower
        } else if value == upper {
            VarStatus::Upper
        } else {
            status_within(lower, upper, VarStatus::Lower)
        }
    }

    fn is_primal_feasible(&self) -> bool {
        self.basis.basic().iter().all(|&var| {
            let x = &self.values[var];
            let lower = &self.lower[var];
            let upper = &self.upper[var];
            !(lower.is_finite() && x < &lower.minus(&self.var_tol))
                && !(upper.is_finite() && x > &upper.plus(&self.var_tol))
        })
    }

    fn is_dual_feasible(&self) -> bool {
        (0..self.task.variable_count())
            .all(|var| !Pricing::is_candidate(self.basis.status(var), &self.reduced[var], &self.cost_tol))
    }

    fn reset_test_bounds(&mut self) {
        for position in 0..self.task.row_count() {
            let var = self.basis.basic_var(position);
            self.test_lower[position] = self.lower[var].clone();
            self.test_upper[position] = self.upper[var].clone();
        }
    }

    /**
     * Phase-one objective: a basic variable below its lower bound may rise up to it at cost -1,
     * one above its upper bound may fall down to it at cost +1. Returns false when every basic
     * variable is within its bounds.
     */
    fn set_phase_one_costs(&mut self) -> bool {
        for cost in self.costs.iter_mut() {
            cost.set_zero();
        }
        let mut infeasible = 0;
        for position in 0..self.task.row_count() {
            let var = self.basis.basic_var(position);
            let x = &self.values[var];
            let lower = &self.lower[var];
            let upper = &self.upper[var];
            if lower.is_finite() && x < &lower.minus(&self.var_tol) {
                self.test_lower[position] = T::neg_infinity();
                self.test_upper[position] = lower.clone();
                self.costs[var] = -T::one();
                infeasible += 1;
            } else if upper.is_finite() && x > &upper.plus(&self.var_tol) {
                self.test_lower[position] = upper.clone();
                self.test_upper[position] = T::infinity();
                self.costs[var] = T::one();
                infeasible += 1;
            } else {
                self.test_lower[position] = lower.clone();
                self.test_upper[position] = upper.clone();
            }
        }
        if infeasible == 0 {
            return false;
        }
        trace!("phase one: {} infeasible basic variables", infeasible);
        self.compute_reduced_costs();
        true
    }

    fn column_of(&self, var: usize) -> Vec<T> {
        let mut column = vec![T::zero(); self.task.row_count()];
        for (row, value) in self.task.columns.col_iter(var) {
            column[row] = value.clone();
        }
        column
    }

    /**
     * The solved unit row of a basis position (indexed by row) and the tableau row it induces
     * over the non-basic variables.
     */
    fn pivot_row(&self, position: usize) -> (Vec<T>, Vec<T>) {
        let mut rho = vec![T::zero(); self.task.row_count()];
        rho[position] = T::one();
        self.factorisation.solve_row(&mut rho);

        let mut row = vec![T::zero(); self.task.variable_count()];
        for (r, multiplier) in rho.iter().enumerate() {
            if multiplier.is_zero() {
                continue;
            }
            for (var, coefficient) in self.task.rows.col_iter(r) {
                if !self.basis.status(var).is_basic() {
                    row[var].add_product(coefficient, multiplier);
                }
            }
        }
        (rho, row)
    }

    fn compute_basic_values(&mut self) {
        let mut rhs = vec![T::zero(); self.task.row_count()];
        for var in 0..self.task.variable_count() {
            let value = &self.values[var];
            if self.basis.status(var).is_basic() || value.is_zero() {
                continue;
            }
            for (row, coefficient) in self.task.columns.col_iter(var) {
                rhs[row].sub_product(coefficient, value, self.num_eps);
            }
        }
        self.factorisation.solve_column(&mut rhs);
        for (position, value) in rhs.into_iter().enumerate() {
            let var = self.basis.basic_var(position);
            self.values[var] = value;
        }
    }

    fn compute_reduced_costs(&mut self) {
        let mut duals: Vec<T> = self
            .basis
            .basic()
            .iter()
            .map(|&var| self.costs[var].clone())
            .collect();
        self.factorisation.solve_row(&mut duals);

        for var in 0..self.task.variable_count() {
            if self.basis.status(var).is_basic() {
                self.reduced[var].set_zero();
                continue;
            }
            let mut reduced = self.costs[var].clone();
            for (row, coefficient) in self.task.columns.col_iter(var) {
                reduced.sub_product(coefficient, &duals[row], self.num_eps);
            }
            self.reduced[var] = reduced;
        }
        self.task.statistics.cost_recomputations += 1;
    }

    fn objective(&self) -> T {
        let mut objective = T::zero();
        for (cost, value) in self.costs.iter().zip(&self.values) {
            if !cost.is_zero() {
                objective.add_product(cost, value);
            }
        }
        objective
    }

    fn progress(&self) -> SolveProgress {
        self.task.progress(self.phase, Some(self.objective().approximate()))
    }

    fn factor(&mut self) -> Result<(), SingularBasis> {
        let callbacks = self.task.callbacks;
        if callbacks.before_factorisation(&self.progress()) {
            self.aborted = true;
        }
        self.task.statistics.factorisations += 1;
        self.factorisation
            .factor(&self.task.columns, self.basis.basic())
    }

    /**
     * Swaps the basic variables that could not be factored for the slacks of the rows left
     * without a pivot, then factors again. A second failure is fatal.
     */
    fn recover(&mut self, singular: SingularBasis) -> Result<(), LinearResult> {
        warn!(
            "repairing {}: positions {:?} get the slacks of rows {:?}",
            singular, singular.rejected_positions, singular.unpivoted_rows
        );
        self.task.statistics.repairs += 1;

        for (&position, &row) in singular
            .rejected_positions
            .iter()
            .zip(&singular.unpivoted_rows)
        {
            let slack = self.bounds.slack_of_row(row);
            if self.basis.status(slack).is_basic() {
                warn!("slack {} of row {} is basic already; cannot repair", slack, row);
                return Err(LinearResult::Invalid);
            }
            let leaving = self.basis.basic_var(position);
            let status = self.nearest_status(leaving);
            self.basis.pivot(position, slack, status);
            self.values[leaving] = self.nonbasic_value(leaving);
        }

        if let Err(again) = self.factor() {
            warn!("basis repair failed: {}", again);
            return Err(LinearResult::Invalid);
        }
        self.compute_basic_values();
        self.reset_test_bounds();
        self.compute_reduced_costs();
        self.pricing.reset_weights(self.task.variable_count());
        self.dual_weights = vec![T::one(); self.task.row_count()];
        Ok(())
    }

    fn nearest_status(&self, var: usize) -> VarStatus {
        let x = &self.values[var];
        let lower = &self.lower[var];
        let upper = &self.upper[var];
        match (lower.is_finite(), upper.is_finite()) {
            _ if lower.is_finite() && lower == upper => VarStatus::Fixed,
            (true, true) => {
                if x.minus(lower).abs() <= upper.minus(x).abs() {
                    VarStatus::Lower
                } else {
                    VarStatus::Upper
                }
            }
            (true, false) => VarStatus::Lower,
            (false, true) => VarStatus::Upper,
            (false, false) => VarStatus::Zero,
        }
    }

    fn poll(&mut self) -> Result<(), LinearResult> {
        if self.aborted {
            return Err(LinearResult::Interrupted);
        }
        let callbacks = self.task.callbacks;
        if callbacks.should_abort() || callbacks.before_pivot_search(&self.progress()) {
            self.aborted = true;
            return Err(LinearResult::Interrupted);
        }
        Ok(())
    }

    fn check_pivot_limit(&self) -> Result<(), LinearResult> {
        if self.task.statistics.pivots >= self.pivot_limit {
            debug!("pivot limit of {} reached", self.pivot_limit);
            return Err(LinearResult::Interrupted);
        }
        Ok(())
    }

    fn after_pivot(&mut self) {
        let callbacks = self.task.callbacks;
        if callbacks.after_pivot(&self.progress()) {
            self.aborted = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        f, finf,
        math::{
            fraction_exact::FractionExact, fraction_f64::FractionF64, simplex_number::SimplexNumber,
        },
        optimisation_algorithms::{
            basis::{Basis, VarStatus},
            basis_factorisation::SingularBasis,
            bound_manager::BoundManager,
            simplex_task::{LinearResult, NoCallbacks, SimplexTask, SolveCallbacks, SolveProgress},
            solver_config::{PricingStrategy, SimplexAlgorithm, SolverConfig},
            sparse_matrix::SparseMatrix,
        },
    };

    use super::PivotEngine;
    use strum::IntoEnumIterator;

    type Row = (Vec<FractionExact>, FractionExact, FractionExact);

    fn convert<T: SimplexNumber>(value: &FractionExact) -> T {
        T::from_coefficient(value, value.approximate())
    }

    /// Rows read `lower <= a·x <= upper`; every row gets a slack with coefficient -1.
    fn engine<'a, T: SimplexNumber>(
        rows: &[Row],
        variables: &[(FractionExact, FractionExact)],
        goals: &[Vec<FractionExact>],
        config: &'a SolverConfig,
        callbacks: &'a dyn SolveCallbacks,
    ) -> PivotEngine<'a, T> {
        let structural = variables.len();
        let mut matrix = SparseMatrix::new(rows.len(), structural + rows.len());
        for (r, (coefficients, _, _)) in rows.iter().enumerate() {
            for (c, coefficient) in coefficients.iter().enumerate() {
                matrix.set(r, c, coefficient.clone());
            }
            matrix.set(r, structural + r, f!(-1));
        }
        let lower: Vec<T> = variables
            .iter()
            .map(|(lower, _)| lower)
            .chain(rows.iter().map(|(_, lower, _)| lower))
            .map(convert)
            .collect();
        let upper: Vec<T> = variables
            .iter()
            .map(|(_, upper)| upper)
            .chain(rows.iter().map(|(_, _, upper)| upper))
            .map(convert)
            .collect();
        let goals = goals
            .iter()
            .map(|goal| goal.iter().map(convert).collect())
            .collect();

        let task = SimplexTask::new(&matrix, goals, config, callbacks);
        let bounds = BoundManager::new(Arc::new(lower), Arc::new(upper), structural);
        let basis = Basis::slack(vec![VarStatus::Lower; structural], rows.len());
        PivotEngine::new(task, bounds, basis).unwrap()
    }

    /// max 3x + 4y s.t. x + y <= 20, x - 4y >= -20, x >= 12, y >= 5
    fn small_lp() -> (Vec<Row>, Vec<(FractionExact, FractionExact)>, Vec<Vec<FractionExact>>) {
        (
            vec![
                (vec![f!(1), f!(1)], finf!(-), f!(20)),
                (vec![f!(1), f!(-4)], f!(-20), finf!()),
            ],
            vec![(f!(12), finf!()), (f!(5), finf!())],
            vec![vec![f!(-3), f!(-4)]],
        )
    }

    #[test]
    fn optimise_exact() {
        let (rows, variables, goals) = small_lp();
        for pricing in PricingStrategy::iter() {
            let config = SolverConfig::exact().with_pricing(pricing);
            let mut engine = engine::<FractionExact>(&rows, &variables, &goals, &config, &NoCallbacks);
            assert_eq!(engine.solve(), LinearResult::Optimal);
            assert_eq!(engine.value(0), &f!(12));
            assert_eq!(engine.value(1), &f!(8));
            assert_eq!(engine.goal_values(), &[f!(-68)]);
            assert!(engine.basis().is_consistent());
        }
    }

    #[test]
    fn optimise_double() {
        let (rows, variables, goals) = small_lp();
        for pricing in PricingStrategy::iter() {
            let config = SolverConfig::default().with_pricing(pricing);
            let mut engine = engine::<FractionF64>(&rows, &variables, &goals, &config, &NoCallbacks);
            assert_eq!(engine.solve(), LinearResult::Optimal);
            assert!((engine.value(0).0 - 12.0).abs() < 1e-9);
            assert!((engine.value(1).0 - 8.0).abs() < 1e-9);
            assert!((engine.goal_values()[0].0 + 68.0).abs() < 1e-9);
        }
    }

    #[test]
    fn free_variables() {
        //max x + 2y s.t. 2 <= x + y <= 4, x - y >= 0, x >= 0, y free
        let rows = vec![
            (vec![f!(1), f!(1)], f!(2), f!(4)),
            (vec![f!(1), f!(-1)], f!(0), finf!()),
        ];
        let variables = vec![(f!(0), finf!()), (finf!(-), finf!())];
        let goals = vec![vec![f!(-1), f!(-2)]];
        let config = SolverConfig::exact();
        let mut engine = engine::<FractionExact>(&rows, &variables, &goals, &config, &NoCallbacks);
        assert_eq!(engine.solve(), LinearResult::Optimal);
        assert_eq!(engine.value(0), &f!(2));
        assert_eq!(engine.value(1), &f!(2));
        assert_eq!(engine.goal_values(), &[f!(-6)]);
    }

    #[test]
    fn crossing_bounds_are_infeasible() {
        let rows = vec![(vec![f!(1)], finf!(-), f!(10))];
        let variables = vec![(f!(5), f!(1))];
        let goals = vec![vec![f!(1)]];
        let config = SolverConfig::exact();
        let mut engine = engine::<FractionExact>(&rows, &variables, &goals, &config, &NoCallbacks);
        assert_eq!(engine.solve(), LinearResult::InfeasiblePrimal);
    }

    #[test]
    fn infeasible_rows() {
        //x + y >= 5 with x, y in [0, 1]
        let rows = vec![(vec![f!(1), f!(1)], f!(5), finf!())];
        let variables = vec![(f!(0), f!(1)), (f!(0), f!(1))];
        let goals = vec![vec![f!(1), f!(1)]];

        let config = SolverConfig::exact().with_algorithm(SimplexAlgorithm::Primal);
        let mut exact = engine::<FractionExact>(&rows, &variables, &goals, &config, &NoCallbacks);
        assert_eq!(exact.solve(), LinearResult::InfeasiblePrimal);

        let config = SolverConfig::default();
        let mut double = engine::<FractionF64>(&rows, &variables, &goals, &config, &NoCallbacks);
        assert!(double.solve().is_infeasible());
    }

    #[test]
    fn unbounded() {
        //max x s.t. x - y <= 1, x, y >= 0
        let rows = vec![(vec![f!(1), f!(-1)], finf!(-), f!(1))];
        let variables = vec![(f!(0), finf!()), (f!(0), finf!())];
        let goals = vec![vec![f!(-1), f!(0)]];
        let config = SolverConfig::exact();
        let mut engine = engine::<FractionExact>(&rows, &variables, &goals, &config, &NoCallbacks);
        assert_eq!(engine.solve(), LinearResult::UnboundedPrimal);
    }

    #[test]
    fn phase_one_then_optimal() {
        //min x + y s.t. x + 2y >= 4, 3x + y >= 6, x, y >= 0: optimum at x = 8/5, y = 6/5
        let rows = vec![
            (vec![f!(1), f!(2)], f!(4), finf!()),
            (vec![f!(3), f!(1)], f!(6), finf!()),
        ];
        let variables = vec![(f!(0), finf!()), (f!(0), finf!())];
        let goals = vec![vec![f!(1), f!(1)]];
        for algorithm in SimplexAlgorithm::iter() {
            let config = SolverConfig::exact().with_algorithm(algorithm);
            let mut engine = engine::<FractionExact>(&rows, &variables, &goals, &config, &NoCallbacks);
            assert_eq!(engine.solve(), LinearResult::Optimal);
            assert_eq!(engine.value(0), &f!(8, 5));
            assert_eq!(engine.value(1), &f!(6, 5));
            assert_eq!(engine.goal_values(), &[f!(14, 5)]);
            if algorithm == SimplexAlgorithm::Primal {
                assert!(engine.statistics().phase_one_pivots > 0);
                assert_eq!(engine.statistics().dual_pivots, 0);
            } else {
                assert!(engine.statistics().dual_pivots > 0);
            }
        }
    }

    #[test]
    fn dual_warm_start() {
        let (rows, variables, goals) = small_lp();
        let config = SolverConfig::exact();
        let mut engine = engine::<FractionExact>(&rows, &variables, &goals, &config, &NoCallbacks);
        assert_eq!(engine.solve(), LinearResult::Optimal);

        //tighten x + y <= 18 through the slack of the first row
        let (task, mut bounds, mut basis) = engine.into_parts();
        assert!(bounds.set_upper(2, f!(18), &mut basis));
        let mut engine = PivotEngine::new(task, bounds, basis).unwrap();
        let pivots_before = engine.statistics().pivots;
        assert_eq!(engine.solve(), LinearResult::Optimal);
        assert_eq!(engine.value(0), &f!(12));
        assert_eq!(engine.value(1), &f!(6));
        assert_eq!(engine.goal_values(), &[f!(-60)]);
        assert!(engine.statistics().dual_pivots > 0);
        assert!(engine.statistics().pivots > pivots_before);
    }

    #[test]
    fn lexicographic_goals() {
        //first max x, then max y, s.t. x + y <= 4, x, y in [0, 3]
        let rows = vec![(vec![f!(1), f!(1)], finf!(-), f!(4))];
        let variables = vec![(f!(0), f!(3)), (f!(0), f!(3))];
        let goals = vec![vec![f!(-1), f!(0)], vec![f!(0), f!(-1)]];
        let config = SolverConfig::exact();
        let mut engine = engine::<FractionExact>(&rows, &variables, &goals, &config, &NoCallbacks);
        assert_eq!(engine.solve(), LinearResult::Optimal);
        assert_eq!(engine.value(0), &f!(3));
        assert_eq!(engine.value(1), &f!(1));
        assert_eq!(engine.goal_values(), &[f!(-3), f!(-1)]);
        assert!(engine.basis().statuses().iter().all(|status| *status != VarStatus::Fixed));
    }

    /// Beale's cycling example.
    fn degenerate_lp() -> (Vec<Row>, Vec<(FractionExact, FractionExact)>, Vec<Vec<FractionExact>>) {
        (
            vec![
                (vec![f!(1, 4), f!(-8), f!(-1), f!(9)], finf!(-), f!(0)),
                (vec![f!(1, 2), f!(-12), f!(-1, 2), f!(3)], finf!(-), f!(0)),
            ],
            vec![
                (f!(0), finf!()),
                (f!(0), finf!()),
                (f!(0), f!(1)),
                (f!(0), finf!()),
            ],
            vec![vec![f!(-3, 4), f!(20), f!(-1, 2), f!(6)]],
        )
    }

    #[test]
    fn degenerate_exact() {
        let (rows, variables, goals) = degenerate_lp();
        let mut config = SolverConfig::exact().with_pricing(PricingStrategy::BestReducedCost);
        config.degeneracy_limit = 1;
        let mut engine = engine::<FractionExact>(&rows, &variables, &goals, &config, &NoCallbacks);
        assert_eq!(engine.solve(), LinearResult::Optimal);
        assert_eq!(engine.goal_values(), &[f!(-5, 4)]);
    }

    #[test]
    fn degenerate_double() {
        let (rows, variables, goals) = degenerate_lp();
        let mut config = SolverConfig::default().with_pricing(PricingStrategy::BestReducedCost);
        config.degeneracy_limit = 1;
        let mut engine = engine::<FractionF64>(&rows, &variables, &goals, &config, &NoCallbacks);
        assert_eq!(engine.solve(), LinearResult::Optimal);
        assert!((engine.goal_values()[0].0 + 1.25).abs() < 1e-7);
        assert!((engine.value(0).0 - 1.0).abs() < 1e-7);
        assert!((engine.value(2).0 - 1.0).abs() < 1e-7);
    }

    /// max 2x + y + z s.t. x + 2y <= 4, x + 2y + z <= 6, x, y, z >= 0: optimum at x = 4, z = 2.
    /// The columns of x and y are parallel.
    fn dependent_lp() -> (Vec<Row>, Vec<(FractionExact, FractionExact)>, Vec<Vec<FractionExact>>) {
        (
            vec![
                (vec![f!(1), f!(2), f!(0)], finf!(-), f!(4)),
                (vec![f!(1), f!(2), f!(1)], finf!(-), f!(6)),
            ],
            vec![(f!(0), finf!()), (f!(0), finf!()), (f!(0), finf!())],
            vec![vec![f!(-2), f!(-1), f!(-1)]],
        )
    }

    /// Restarts the engine from a basis in which x and y are both basic.
    fn singular_start<'a, T: SimplexNumber>(engine: PivotEngine<'a, T>) -> PivotEngine<'a, T> {
        let (task, bounds, _) = engine.into_parts();
        let statuses = vec![
            VarStatus::Basic,
            VarStatus::Basic,
            VarStatus::Lower,
            VarStatus::Upper,
            VarStatus::Upper,
        ];
        PivotEngine::new(task, bounds, Basis::from_parts(statuses, vec![0, 1])).unwrap()
    }

    #[test]
    fn singular_start_is_repaired() {
        let (rows, variables, goals) = dependent_lp();

        let config = SolverConfig::exact();
        let mut exact = singular_start(engine::<FractionExact>(&rows, &variables, &goals, &config, &NoCallbacks));
        assert_eq!(exact.solve(), LinearResult::Optimal);
        assert_eq!(exact.statistics().repairs, 1);
        assert_eq!(exact.value(0), &f!(4));
        assert_eq!(exact.value(1), &f!(0));
        assert_eq!(exact.value(2), &f!(2));
        assert_eq!(exact.goal_values(), &[f!(-10)]);
        assert!(exact.basis().is_consistent());

        let config = SolverConfig::default();
        let mut double = singular_start(engine::<FractionF64>(&rows, &variables, &goals, &config, &NoCallbacks));
        assert_eq!(double.solve(), LinearResult::Optimal);
        assert_eq!(double.statistics().repairs, 1);
        assert!((double.goal_values()[0].0 + 10.0).abs() < 1e-9);
    }

    #[test]
    fn failed_repair_is_invalid() {
        let config = SolverConfig::exact();

        //the slack of row 1 is basic already
        let (rows, variables, goals) = small_lp();
        let mut slack_basic = engine::<FractionExact>(&rows, &variables, &goals, &config, &NoCallbacks);
        let singular = SingularBasis {
            rejected_positions: vec![0],
            unpivoted_rows: vec![1],
        };
        assert_eq!(slack_basic.recover(singular), Err(LinearResult::Invalid));
        assert_eq!(slack_basic.statistics().repairs, 1);

        //nothing is swapped, so the basis stays singular
        let (rows, variables, goals) = dependent_lp();
        let mut still_singular =
            singular_start(engine::<FractionExact>(&rows, &variables, &goals, &config, &NoCallbacks));
        let singular = SingularBasis {
            rejected_positions: vec![],
            unpivoted_rows: vec![],
        };
        assert_eq!(still_singular.recover(singular), Err(LinearResult::Invalid));
        assert_eq!(still_singular.statistics().repairs, 1);
        assert_eq!(still_singular.statistics().factorisations, 1);
    }

    struct AbortAtPivotSearch;

    impl SolveCallbacks for AbortAtPivotSearch {
        fn before_pivot_search(&self, _progress: &SolveProgress) -> bool {
            true
        }
    }

    #[test]
    fn interrupted() {
        let (rows, variables, goals) = small_lp();

        let config = SolverConfig::exact();
        let mut aborted = engine::<FractionExact>(&rows, &variables, &goals, &config, &AbortAtPivotSearch);
        assert_eq!(aborted.solve(), LinearResult::Interrupted);
        assert!(aborted.basis().is_consistent());

        let config = SolverConfig::exact().with_max_pivots(0);
        let mut limited = engine::<FractionExact>(&rows, &variables, &goals, &config, &NoCallbacks);
        assert_eq!(limited.solve(), LinearResult::Interrupted);
        assert_eq!(limited.statistics().pivots, 0);
    }

    #[test]
    fn tableau_row_of_basic_variable() {
        let (rows, variables, goals) = small_lp();
        let config = SolverConfig::exact();
        let mut engine = engine::<FractionExact>(&rows, &variables, &goals, &config, &NoCallbacks);
        assert_eq!(engine.solve(), LinearResult::Optimal);

        //x_var = -Σ row_j x_j over the non-basic variables
        for var in engine.basis().basic().to_vec() {
            let row = engine.tableau_row(var).unwrap();
            let mut value = f!(0);
            for (j, coefficient) in row.iter().enumerate() {
                if j != var {
                    value -= &(coefficient * engine.value(j));
                }
            }
            assert_eq!(&value, engine.value(var));
        }
    }
}
