use priority_queue::PriorityQueue;

use crate::math::simplex_number::SimplexNumber;

use super::{
    basis::{Basis, VarStatus},
    solver_config::{PricingStrategy, SolverConfig},
};

/**
 * Selection of the entering variable of the primal simplex.
 */
#[derive(Clone, Debug)]
pub struct Pricing<T: SimplexNumber> {
    strategy: PricingStrategy,
    /// primal steepest-edge reference weights, per variable
    pub(crate) weights: Vec<T>,
    offset: usize,
    pool_size: usize,
    refill_below: usize,
    heap: PriorityQueue<usize, T>,
}

impl<T: SimplexNumber> Pricing<T> {
    pub fn new(config: &SolverConfig, variable_count: usize) -> Self {
        let strategy = match config.pricing {
            PricingStrategy::Automatic => {
                if variable_count <= config.steepest_edge_column_limit {
                    PricingStrategy::SteepestEdge
                } else {
                    PricingStrategy::NewPartial
                }
            }
            other => other,
        };
        let pool_size = config.partial_pool_size.max(1);
        Self {
            strategy,
            weights: vec![T::one(); variable_count],
            offset: 0,
            pool_size,
            refill_below: ((pool_size as f64) * config.partial_refill_fraction).ceil() as usize,
            heap: PriorityQueue::new(),
        }
    }

    pub fn strategy(&self) -> PricingStrategy {
        self.strategy
    }

    /// Whether the scores need the steepest-edge reference weights.
    pub fn maintains_weights(&self) -> bool {
        matches!(self.strategy, PricingStrategy::SteepestEdge | PricingStrategy::NewPartial)
    }

    pub fn reset_weights(&mut self, variable_count: usize) {
        self.weights.clear();
        self.weights.resize(variable_count, T::one());
        self.heap.clear();
    }

    /**
     * Whether moving the non-basic variable in its allowed direction decreases the objective.
     */
    pub fn is_candidate(status: VarStatus, reduced_cost: &T, cost_tolerance: &T) -> bool {
        match status {
            VarStatus::Basic | VarStatus::Fixed => false,
            VarStatus::Lower => reduced_cost < &-cost_tolerance.clone(),
            VarStatus::Upper => reduced_cost > cost_tolerance,
            VarStatus::Zero => &reduced_cost.abs() > cost_tolerance,
        }
    }

    fn score(&self, var: usize, reduced_cost: &T) -> T {
        match self.strategy {
            PricingStrategy::SteepestEdge | PricingStrategy::NewPartial => {
                reduced_cost.times(reduced_cost).over(&self.weights[var])
            }
            _ => reduced_cost.abs(),
        }
    }

    fn candidate_score(&self, var: usize, reduced: &[T], basis: &Basis, cost_tolerance: &T) -> Option<T> {
        if Self::is_candidate(basis.status(var), &reduced[var], cost_tolerance) {
            Some(self.score(var, &reduced[var]))
        } else {
            None
        }
    }

    /**
     * Picks an entering variable. `None` is only returned after a full scan found no candidate.
     * With `bland`, the candidate of lowest index is taken.
     */
    pub fn choose(&mut self, reduced: &[T], basis: &Basis, cost_tolerance: &T, bland: bool) -> Option<usize> {
        let n = reduced.len();
        if bland {
            return (0..n).find(|&var| Self::is_candidate(basis.status(var), &reduced[var], cost_tolerance));
        }
        match self.strategy {
            PricingStrategy::Partial => self.choose_partial(reduced, basis, cost_tolerance),
            PricingStrategy::NewPartial => self.choose_heap(reduced, basis, cost_tolerance),
            _ => self.choose_full(reduced, basis, cost_tolerance),
        }
    }

    fn choose_full(&self, reduced: &[T], basis: &Basis, cost_tolerance: &T) -> Option<usize> {
        let mut best: Option<(usize, T)> = None;
        for var in 0..reduced.len() {
            if let Some(score) = self.candidate_score(var, reduced, basis, cost_tolerance) {
                if best.as_ref().is_none_or(|(_, best_score)| &score > best_score) {
                    best = Some((var, score));
                }
            }
        }
        best.map(|(var, _)| var)
    }

    /**
     * Scans cyclically from where the previous scan stopped until the pool is full or every
     * variable was seen.
     */
    fn choose_partial(&mut self, reduced: &[T], basis: &Basis, cost_tolerance: &T) -> Option<usize> {
        let n = reduced.len();
        if n == 0 {
            return None;
        }
        let mut best: Option<(usize, T)> = None;
        let mut found = 0;
        let mut scanned = 0;
        let mut var = self.offset % n;
        while scanned < n {
            if let Some(score) = self.candidate_score(var, reduced, basis, cost_tolerance) {
                found += 1;
                if best.as_ref().is_none_or(|(_, best_score)| &score > best_score) {
                    best = Some((var, score));
                }
            }
            scanned += 1;
            var = (var + 1) % n;
            if found >= self.pool_size {
                break;
            }
        }
        self.offset = var;
        best.map(|(var, _)| var)
    }

    /**
     * Keeps a heap of the best candidates of the last full scan; candidates are re-checked when
     * popped and the heap is refilled from a full scan once it runs low.
     */
    fn choose_heap(&mut self, reduced: &[T], basis: &Basis, cost_tolerance: &T) -> Option<usize> {
        for attempt in 0..2 {
            if attempt == 1 || self.heap.len() < self.refill_below {
                self.refill(reduced, basis, cost_tolerance);
            }
            while let Some((var, _)) = self.heap.pop() {
                if self.candidate_score(var, reduced, basis, cost_tolerance).is_some() {
                    return Some(var);
                }
            }
        }
        None
    }

    fn refill(&mut self, reduced: &[T], basis: &Basis, cost_tolerance: &T) {
        self.heap.clear();
        for var in 0..reduced.len() {
            if let Some(score) = self.candidate_score(var, reduced, basis, cost_tolerance) {
                self.heap.push(var, score);
                if self.heap.len() > self.pool_size {
                    //drop the weakest
                    if let Some((&weakest, _)) = self.heap.iter().min_by(|a, b| a.1.cmp(b.1)) {
                        self.heap.remove(&weakest);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        f,
        math::fraction_exact::FractionExact,
        optimisation_algorithms::{
            basis::{Basis, VarStatus},
            solver_config::{PricingStrategy, SolverConfig},
        },
    };

    use super::Pricing;

    fn setup() -> (Basis, Vec<FractionExact>) {
        let basis = Basis::slack(
            vec![VarStatus::Lower, VarStatus::Upper, VarStatus::Lower, VarStatus::Zero, VarStatus::Fixed],
            1,
        );
        //var 0 improves, var 1 improves, var 2 does not, var 3 improves, var 4 is fixed
        let reduced = vec![f!(-1), f!(3), f!(5), f!(-2), f!(-10), f!(0)];
        (basis, reduced)
    }

    #[test]
    fn full_pricing() {
        let (basis, reduced) = setup();
        let config = SolverConfig::exact().with_pricing(PricingStrategy::BestReducedCost);
        let mut pricing: Pricing<FractionExact> = Pricing::new(&config, 6);
        assert_eq!(pricing.choose(&reduced, &basis, &f!(0), false), Some(1));
        assert_eq!(pricing.choose(&reduced, &basis, &f!(0), true), Some(0));
    }

    #[test]
    fn partial_and_heap_pricing_find_candidates() {
        let (basis, reduced) = setup();
        for strategy in [PricingStrategy::Partial, PricingStrategy::NewPartial, PricingStrategy::SteepestEdge] {
            let mut config = SolverConfig::exact().with_pricing(strategy);
            config.partial_pool_size = 1;
            let mut pricing: Pricing<FractionExact> = Pricing::new(&config, 6);
            let chosen = pricing.choose(&reduced, &basis, &f!(0), false).unwrap();
            assert!([0, 1, 3].contains(&chosen));
        }

        let optimal = vec![f!(1), f!(-1), f!(0), f!(0), f!(0), f!(0)];
        let config = SolverConfig::exact().with_pricing(PricingStrategy::NewPartial);
        let mut pricing: Pricing<FractionExact> = Pricing::new(&config, 6);
        assert_eq!(pricing.choose(&optimal, &basis, &f!(0), false), None);
    }
}
