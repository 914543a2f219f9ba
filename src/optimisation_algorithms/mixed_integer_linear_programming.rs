use std::sync::Arc;

use anyhow::{Result, anyhow};
use log::{debug, info, trace, warn};
use rayon::prelude::*;

use crate::math::{fraction_exact::FractionExact, simplex_number::SimplexNumber};

use super::{
    basis::Basis,
    bound_manager::BoundManager,
    cutting_plane_pool::{CuttingPlane, CuttingPlanePool},
    gomory_cuts::GomoryCutBuilder,
    linear_programming::StandardForm,
    pivot_engine::PivotEngine,
    pseudo_costs::{BranchDirection, PseudoCosts},
    simplex_task::{LinearResult, SimplexPhase, SimplexTask, SolveCallbacks, SolveProgress, SolveStatistics},
    solver_config::{BranchingStrategy, SolverConfig},
    sparse_matrix::SparseMatrix,
};

/// Integers beyond this magnitude are not exactly representable as doubles.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Clone, Debug)]
pub struct BranchDecision {
    pub var: usize,
    pub direction: BranchDirection,
    /// distance between the relaxation value and the new bound
    pub distance: f64,
}

struct MipNode<T> {
    bounds: BoundManager<T>,
    basis: Basis,
    /// relaxation objective of the parent, a bound on this node
    parent_value: Option<T>,
    pool: Arc<CuttingPlanePool>,
    decision: Option<BranchDecision>,
    depth: usize,
}

struct Incumbent<T> {
    values: Vec<T>,
    goal_values: Vec<T>,
    basis: Basis,
}

enum NodeEnd<T> {
    Done,
    Unbounded,
    Interrupted(Option<T>),
    Invalid,
}

/**
 * The result of a branch-and-bound search. Values cover the structural and slack variables of
 * the model; goal values are in minimisation sense.
 */
#[derive(Clone, Debug)]
pub struct MipOutcome<T> {
    pub result: LinearResult,
    pub values: Vec<T>,
    pub goal_values: Vec<T>,
    /// the basis that certifies the values, over the rows of the model
    pub basis: Option<Basis>,
    /// |incumbent - best bound| / max(1, |incumbent|)
    pub gap: f64,
    pub statistics: SolveStatistics,
}

/**
 * Depth-first branch and bound over the relaxations of a model. Without integer variables this
 * is a single relaxation.
 */
pub struct MipSolver<'a, T: SimplexNumber> {
    form: &'a StandardForm,
    config: &'a SolverConfig,
    callbacks: &'a dyn SolveCallbacks,
    /// the model matrix; cuts are appended around each relaxation and removed after
    working: SparseMatrix,
    lower: Arc<Vec<T>>,
    upper: Arc<Vec<T>>,
    goals: Vec<Vec<T>>,
    warm_start: Option<Basis>,
    pseudo_costs: PseudoCosts,
    incumbent: Option<Incumbent<T>>,
    statistics: SolveStatistics,
    integrality_tolerance: T,
}

impl<'a, T: SimplexNumber> MipSolver<'a, T> {
    pub fn new(form: &'a StandardForm, config: &'a SolverConfig, callbacks: &'a dyn SolveCallbacks) -> Self {
        let mut objective: Vec<f64> = form
            .goals
            .first()
            .map(|goal| goal.iter().map(|c| c.approximate()).collect())
            .unwrap_or_default();
        objective.resize(form.structural_count(), 0.0);

        Self {
            form,
            config,
            callbacks,
            working: form.matrix.clone(),
            lower: Arc::new(form.lower.iter().map(convert).collect()),
            upper: Arc::new(form.upper.iter().map(convert).collect()),
            goals: form.goals(),
            warm_start: None,
            pseudo_costs: PseudoCosts::new(objective),
            incumbent: None,
            statistics: SolveStatistics::default(),
            integrality_tolerance: T::tolerance(config.integrality_tolerance),
        }
    }

    /// Starts the root relaxation from the given basis instead of the slack basis.
    pub fn with_basis(mut self, basis: Basis) -> Self {
        self.warm_start = Some(basis);
        self
    }

    pub fn statistics(&self) -> &SolveStatistics {
        &self.statistics
    }

    #[logging_timer::time]
    pub fn solve(&mut self) -> Result<MipOutcome<T>> {
        let variable_count = self.form.variable_count();
        let row_count = self.form.matrix.row_count();
        let root_basis = match self.warm_start.take() {
            Some(basis) if basis.variable_count() == variable_count && basis.row_count() == row_count => basis,
            Some(basis) => {
                debug!("ignoring a warm start {} that does not fit the model", basis);
                self.form.slack_basis()
            }
            None => self.form.slack_basis(),
        };

        let mut stack = vec![MipNode {
            bounds: BoundManager::new(
                Arc::clone(&self.lower),
                Arc::clone(&self.upper),
                self.form.structural_count(),
            ),
            basis: root_basis,
            parent_value: None,
            pool: Arc::new(CuttingPlanePool::root()),
            decision: None,
            depth: 0,
        }];

        let mut end = NodeEnd::Done;
        let mut iter = 0;
        while let Some(node) = stack.pop() {
            if self.should_stop() {
                stack.push(node);
                end = NodeEnd::Interrupted(None);
                break;
            }
            self.statistics.nodes += 1;
            match self.process(node, &mut stack, iter)? {
                NodeEnd::Done => {}
                other => {
                    end = other;
                    break;
                }
            }
            iter += 1;
        }

        let result = match (&end, &self.incumbent) {
            (NodeEnd::Invalid, _) => LinearResult::Invalid,
            (NodeEnd::Unbounded, _) if self.form.integrality.not_any() => LinearResult::UnboundedPrimal,
            (NodeEnd::Unbounded, _) => LinearResult::InfeasibleOrUnbounded,
            (NodeEnd::Interrupted(_), Some(_)) => LinearResult::Feasible,
            (NodeEnd::Interrupted(_), None) => LinearResult::Interrupted,
            (NodeEnd::Done, Some(_)) => LinearResult::Optimal,
            (NodeEnd::Done, None) => LinearResult::InfeasiblePrimal,
        };

        let gap = match (&end, &self.incumbent) {
            (NodeEnd::Done, Some(_)) => 0.0,
            (NodeEnd::Interrupted(interrupted), Some(incumbent)) => {
                let bounds = stack
                    .iter()
                    .map(|node| {
                        node.parent_value
                            .as_ref()
                            .map(|bound| bound.approximate())
                            .unwrap_or(f64::NEG_INFINITY)
                    })
                    .chain(interrupted.as_ref().map(|bound| bound.approximate()));
                let best_bound = bounds.fold(f64::INFINITY, f64::min);
                let incumbent = incumbent.goal_values.first().map(|v| v.approximate()).unwrap_or(0.0);
                relative_gap(incumbent, best_bound.min(incumbent))
            }
            _ => f64::INFINITY,
        };

        info!(
            "branch and bound: {} after {} nodes, gap {}; {}",
            result, self.statistics.nodes, gap, self.statistics
        );

        let (values, goal_values, basis) = match self.incumbent.take() {
            Some(Incumbent {
                mut values,
                goal_values,
                basis,
            }) => {
                values.truncate(variable_count);
                (values, goal_values, basis.truncate(variable_count, row_count))
            }
            None => (vec![], vec![], None),
        };

        Ok(MipOutcome {
            result,
            values,
            goal_values,
            basis,
            gap,
            statistics: self.statistics.clone(),
        })
    }

    fn should_stop(&self) -> bool {
        if self.statistics.nodes >= self.config.max_nodes {
            debug!("node limit of {} reached", self.config.max_nodes);
            return true;
        }
        let progress = SolveProgress {
            phase: SimplexPhase::BranchAndBound,
            pivots: self.statistics.pivots,
            nodes: self.statistics.nodes,
            objective: None,
            incumbent: self.incumbent_value(),
        };
        self.callbacks.should_abort() || self.callbacks.solving(&progress)
    }

    fn incumbent_value(&self) -> Option<f64> {
        self.incumbent
            .as_ref()
            .and_then(|incumbent| incumbent.goal_values.first())
            .map(|value| value.approximate())
    }

    fn process(&mut self, node: MipNode<T>, stack: &mut Vec<MipNode<T>>, iter: usize) -> Result<NodeEnd<T>> {
        let MipNode {
            mut bounds,
            mut basis,
            parent_value,
            pool,
            decision,
            depth,
        } = node;

        if self.config.presolve && !self.presolve(&mut bounds, &mut basis) {
            debug!(
                "[iter {} (search depth {})] pruned node, integer bounds cross",
                iter, depth
            );
            return Ok(NodeEnd::Done);
        }

        let mut pool = CuttingPlanePool::child(&pool);
        let mut engine = self.relaxation(bounds, basis, &pool)?;
        match self.solve_relaxation(&mut engine) {
            LinearResult::Optimal => {}
            result if result.is_infeasible() => {
                debug!(
                    "[iter {} (search depth {})] pruned solution, infeasible",
                    iter, depth
                );
                return Ok(NodeEnd::Done);
            }
            LinearResult::UnboundedPrimal => return Ok(NodeEnd::Unbounded),
            LinearResult::Interrupted => return Ok(NodeEnd::Interrupted(parent_value)),
            result => {
                warn!("[iter {} (search depth {})] relaxation ended {}", iter, depth, result);
                return Ok(NodeEnd::Invalid);
            }
        }

        let mut objective = self.objective_of(&engine);
        if let (Some(decision), Some(parent)) = (&decision, &parent_value) {
            self.pseudo_costs.record(
                decision.var,
                decision.direction,
                objective.minus(parent).approximate(),
                decision.distance,
            );
        }
        if self.is_dominated(&objective) {
            debug!(
                "[iter {} (search depth {})] pruned solution, cost: {:.2}",
                iter,
                depth,
                objective.approximate()
            );
            return Ok(NodeEnd::Done);
        }

        let mut fractional = self.fractional_variables(engine.values());
        if self.config.cuts && self.config.gomory_cuts && depth < self.config.cut_depth_limit {
            for round in 0..self.config.max_cut_rounds {
                if fractional.is_empty() {
                    break;
                }
                let builder = GomoryCutBuilder::new(&self.form.integrality, self.config);
                let cuts: Vec<CuttingPlane> = fractional
                    .iter()
                    .filter_map(|(var, _)| builder.build(&engine, *var))
                    .take(self.config.max_cuts_per_round)
                    .collect();
                if cuts.is_empty() {
                    break;
                }
                debug!(
                    "[iter {} (search depth {})] cut round {}: {} cuts",
                    iter,
                    depth,
                    round,
                    cuts.len()
                );

                let (_, mut bounds, mut basis) = engine.into_parts();
                let first_row = self.form.matrix.row_count() + pool.len();
                basis.add_slack_rows(cuts.len());
                for (i, cut) in cuts.into_iter().enumerate() {
                    let slack = bounds.slack_of_row(first_row + i);
                    bounds.set_lower(slack, convert(&cut.lower), &mut basis);
                    pool.add(cut);
                    self.statistics.cuts += 1;
                }

                engine = self.relaxation(bounds, basis, &pool)?;
                match self.solve_relaxation(&mut engine) {
                    LinearResult::Optimal => {}
                    result if result.is_infeasible() => {
                        debug!(
                            "[iter {} (search depth {})] pruned solution, infeasible after cuts",
                            iter, depth
                        );
                        return Ok(NodeEnd::Done);
                    }
                    LinearResult::Interrupted => return Ok(NodeEnd::Interrupted(parent_value)),
                    result => {
                        warn!(
                            "[iter {} (search depth {})] relaxation with cuts ended {}",
                            iter, depth, result
                        );
                        return Ok(NodeEnd::Invalid);
                    }
                }
                objective = self.objective_of(&engine);
                if self.is_dominated(&objective) {
                    debug!(
                        "[iter {} (search depth {})] pruned solution after cuts, cost: {:.2}",
                        iter,
                        depth,
                        objective.approximate()
                    );
                    return Ok(NodeEnd::Done);
                }
                fractional = self.fractional_variables(engine.values());
            }
        }

        if fractional.is_empty() {
            self.offer_incumbent(&engine, objective, iter, depth);
            return Ok(NodeEnd::Done);
        }

        let var = self.choose_branching_variable(&engine, &fractional, &objective);
        let value = engine.value(var).clone();
        if value.approximate().abs() > MAX_SAFE_INTEGER {
            return Err(anyhow!(
                "integer variable {} has value {}, beyond the range where integers are exact",
                var,
                value
            ));
        }
        let fraction = value.fractional_part().approximate();
        let floor = value.floor();
        let ceil = value.ceil();
        let down_first = self.prefers_down(var, fraction);
        debug!(
            "[iter {} (search depth {})] branching on x{} = {:.4}, cost: {:.2}",
            iter,
            depth,
            var,
            value.approximate(),
            objective.approximate()
        );

        let (_, bounds, basis) = engine.into_parts();
        let pool = Arc::new(pool);
        let mut children = vec![];

        let mut down_bounds = bounds.clone();
        let mut down_basis = basis.clone();
        if down_bounds.set_upper(var, floor, &mut down_basis) {
            children.push(MipNode {
                bounds: down_bounds,
                basis: down_basis,
                parent_value: Some(objective.clone()),
                pool: Arc::clone(&pool),
                decision: Some(BranchDecision {
                    var,
                    direction: BranchDirection::Down,
                    distance: fraction,
                }),
                depth: depth + 1,
            });
        }

        let mut up_bounds = bounds;
        let mut up_basis = basis;
        if ceil <= up_bounds.upper(var) {
            up_bounds.set_lower(var, ceil, &mut up_basis);
            children.push(MipNode {
                bounds: up_bounds,
                basis: up_basis,
                parent_value: Some(objective),
                pool,
                decision: Some(BranchDecision {
                    var,
                    direction: BranchDirection::Up,
                    distance: 1.0 - fraction,
                }),
                depth: depth + 1,
            });
        }

        //the preferred child goes last, to be popped first
        if down_first {
            children.reverse();
        }
        stack.extend(children);
        Ok(NodeEnd::Done)
    }

    fn relaxation(
        &mut self,
        bounds: BoundManager<T>,
        basis: Basis,
        pool: &CuttingPlanePool,
    ) -> Result<PivotEngine<'a, T>> {
        let base_rows = pool.apply(&mut self.working);
        let task = SimplexTask::new(&self.working, self.goals.clone(), self.config, self.callbacks)
            .with_search_state(self.statistics.nodes, self.incumbent_value());
        CuttingPlanePool::remove(&mut self.working, base_rows);
        PivotEngine::new(task, bounds, basis)
    }

    fn solve_relaxation(&mut self, engine: &mut PivotEngine<'a, T>) -> LinearResult {
        let pivots_before = engine.statistics().clone();
        let result = engine.solve();
        let mut spent = engine.statistics().clone();
        spent.nodes = 0;
        spent.cuts = 0;
        subtract(&mut spent, &pivots_before);
        self.statistics.absorb(&spent);
        result
    }

    fn objective_of(&self, engine: &PivotEngine<'a, T>) -> T {
        engine.goal_values().first().cloned().unwrap_or_else(T::zero)
    }

    /**
     * Rounds the bounds of integer variables inwards. False if they cross.
     */
    fn presolve(&self, bounds: &mut BoundManager<T>, basis: &mut Basis) -> bool {
        for var in self.form.integrality.iter_ones() {
            let (lower, upper) = bounds.bounds(var);
            if lower.is_finite() {
                let rounded = lower.minus(&self.integrality_tolerance).ceil();
                if rounded != lower {
                    trace!("presolve: lower bound of x{} {} -> {}", var, lower, rounded);
                    bounds.set_lower(var, rounded, basis);
                }
            }
            if upper.is_finite() {
                let rounded = upper.plus(&self.integrality_tolerance).floor();
                if rounded != upper {
                    trace!("presolve: upper bound of x{} {} -> {}", var, upper, rounded);
                    if !bounds.set_upper(var, rounded, basis) {
                        return false;
                    }
                }
            }
            if bounds.lower(var) > bounds.upper(var) {
                return false;
            }
        }
        true
    }

    /**
     * Whether a relaxation objective cannot improve the incumbent by more than the gap.
     */
    fn is_dominated(&self, objective: &T) -> bool {
        let Some(incumbent) = self.incumbent.as_ref().and_then(|i| i.goal_values.first()) else {
            return false;
        };
        if objective >= incumbent {
            return true;
        }
        relative_gap(incumbent.approximate(), objective.approximate()) <= self.config.mip_gap
    }

    /// Integer variables with a fractional value, with their fractional part.
    fn fractional_variables(&self, values: &[T]) -> Vec<(usize, f64)> {
        let one = T::one();
        self.form
            .integrality
            .iter_ones()
            .filter_map(|var| {
                let fraction = values[var].fractional_part();
                if fraction > self.integrality_tolerance && one.minus(&fraction) > self.integrality_tolerance {
                    Some((var, fraction.approximate()))
                } else {
                    None
                }
            })
            .collect()
    }

    fn offer_incumbent(&mut self, engine: &PivotEngine<'a, T>, objective: T, iter: usize, depth: usize) {
        let better = match self.incumbent.as_ref().and_then(|i| i.goal_values.first()) {
            Some(incumbent) => &objective < incumbent,
            None => true,
        };
        if !better {
            return;
        }
        info!(
            "[iter {} (search depth {})] found new best solution, cost: {:.2}",
            iter,
            depth,
            objective.approximate()
        );
        self.incumbent = Some(Incumbent {
            values: engine.values().to_vec(),
            goal_values: engine.goal_values().to_vec(),
            basis: engine.basis().clone(),
        });
    }

    fn strategy(&self) -> BranchingStrategy {
        if self.incumbent.is_some() {
            self.config.branching_after_feasible
        } else {
            self.config.branching_before_feasible
        }
    }

    fn choose_branching_variable(&mut self, engine: &PivotEngine<'a, T>, fractional: &[(usize, f64)], objective: &T) -> usize {
        let strategy = self.strategy();
        if strategy == BranchingStrategy::StrongPseudoCost {
            self.strong_branching(engine, fractional, objective);
        }

        let mut best = fractional[0].0;
        let mut best_score = f64::NEG_INFINITY;
        for &(var, fraction) in fractional {
            let score = match strategy {
                BranchingStrategy::MostFractional => fraction.min(1.0 - fraction),
                BranchingStrategy::PseudoCost | BranchingStrategy::StrongPseudoCost => {
                    self.pseudo_costs.score(var, fraction)
                }
            };
            if score > best_score {
                best = var;
                best_score = score;
            }
        }
        trace!("{} picks x{} (score {})", strategy, best, best_score);
        best
    }

    fn prefers_down(&self, var: usize, fraction: f64) -> bool {
        match self.strategy() {
            BranchingStrategy::MostFractional => fraction < 0.5,
            BranchingStrategy::PseudoCost | BranchingStrategy::StrongPseudoCost => {
                let (down, up) = self.pseudo_costs.estimates(var, fraction);
                down <= up
            }
        }
    }

    /**
     * Initialises the pseudo-costs of uninitialised candidates by solving both children with a
     * pivot limit. The probes work on clones of the node's context.
     */
    fn strong_branching(&mut self, engine: &PivotEngine<'a, T>, fractional: &[(usize, f64)], objective: &T) {
        let candidates: Vec<(usize, f64, T)> = fractional
            .iter()
            .filter(|(var, _)| !self.pseudo_costs.is_initialised(*var))
            .take(self.config.strong_branching_candidates)
            .map(|&(var, fraction)| (var, fraction, engine.value(var).clone()))
            .collect();
        if candidates.is_empty() {
            return;
        }

        let task = engine.task();
        let bounds = engine.bounds();
        let basis = engine.basis();
        let pivot_budget = self.config.strong_branching_pivots;
        let probe = |(var, fraction, value): &(usize, f64, T)| -> Vec<(usize, BranchDirection, Option<f64>, f64)> {
            [BranchDirection::Down, BranchDirection::Up]
                .into_iter()
                .map(|direction| {
                    let mut bounds = bounds.clone();
                    let mut basis = basis.clone();
                    let distance = match direction {
                        BranchDirection::Down => {
                            if !bounds.set_upper(*var, value.floor(), &mut basis) {
                                return (*var, direction, None, *fraction);
                            }
                            *fraction
                        }
                        BranchDirection::Up => {
                            bounds.set_lower(*var, value.ceil(), &mut basis);
                            1.0 - *fraction
                        }
                    };
                    let degradation = PivotEngine::new(task.clone(), bounds, basis)
                        .ok()
                        .and_then(|mut probe| {
                            let limit = probe.statistics().pivots + pivot_budget;
                            probe.set_pivot_limit(limit);
                            match probe.solve() {
                                LinearResult::Optimal => probe
                                    .goal_values()
                                    .first()
                                    .map(|value| value.minus(objective).approximate()),
                                _ => None,
                            }
                        });
                    (*var, direction, degradation, distance)
                })
                .collect()
        };

        let probes: Vec<Vec<_>> = if self.config.parallel_strong_branching {
            candidates.par_iter().map(probe).collect()
        } else {
            candidates.iter().map(probe).collect()
        };

        for (var, direction, degradation, distance) in probes.into_iter().flatten() {
            match degradation {
                Some(degradation) => self.pseudo_costs.record(var, direction, degradation, distance),
                None => trace!("strong branching on x{} {} gave no estimate", var, direction),
            }
        }
    }
}

fn convert<T: SimplexNumber>(value: &FractionExact) -> T {
    T::from_coefficient(value, value.approximate())
}

fn relative_gap(incumbent: f64, bound: f64) -> f64 {
    (incumbent - bound).abs() / incumbent.abs().max(1.0)
}

fn subtract(statistics: &mut SolveStatistics, before: &SolveStatistics) {
    statistics.pivots -= before.pivots;
    statistics.phase_one_pivots -= before.phase_one_pivots;
    statistics.dual_pivots -= before.dual_pivots;
    statistics.degenerate_pivots -= before.degenerate_pivots;
    statistics.bound_flips -= before.bound_flips;
    statistics.factorisations -= before.factorisations;
    statistics.repairs -= before.repairs;
    statistics.cost_recomputations -= before.cost_recomputations;
    statistics.perturbations -= before.perturbations;
    statistics.minor_pivots -= before.minor_pivots;
}
