/*!
A thin model-building surface over the simplex engines and the branch-and-bound search.

# Entry points

Begin by creating a [`LinearModel`](struct.LinearModel.html), declaring variables, adding
constraints and goals. Solving it with a [`SolverConfig`] produces a
[`LinearSolution`](struct.LinearSolution.html) with the values of the variables and goals.

# Example

```
# use ebi_optimisation::{f, f0, f1, finf};
# use ebi_optimisation::optimisation_algorithms::{linear_programming::*, solver_config::SolverConfig, simplex_task::LinearResult};
// Maximise x + 2 * y of two variables x >= 0 and 0 <= y <= 3
let mut model = LinearModel::new();
let x = model.add_variable(f0!(), finf!());
let y = model.add_variable(f0!(), f!(3));
model.add_goal(OptimisationDirection::Maximise, [(x, f1!()), (y, f!(2))]).unwrap();

// subject to constraints: x + y <= 4 and 2 * x + y >= 2.
model.add_constraint([(x, f1!()), (y, f1!())], ComparisonOp::Le, f!(4)).unwrap();
model.add_constraint([(x, f!(2)), (y, f1!())], ComparisonOp::Ge, f!(2)).unwrap();

// Optimal value is 7, achieved at x = 1 and y = 3.
let solution = model.solve(&SolverConfig::exact()).unwrap();
assert_eq!(solution.result(), LinearResult::Optimal);
assert_eq!(solution.exact_objective(), Some(&f!(7)));
assert_eq!(solution.exact_value(x), Some(&f1!()));
assert_eq!(solution.exact_value(y), Some(&f!(3)));
```
*/

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use bitvec::vec::BitVec;
use itertools::Itertools;
use log::{debug, warn};
use strum_macros::{Display, EnumIter};

use crate::math::{
    fraction_exact::FractionExact,
    fraction_f64::FractionF64,
    simplex_number::SimplexNumber,
    traits::{One, Zero},
};

use super::{
    basis::{Basis, VarStatus},
    bound_manager::{BoundManager, status_within},
    mixed_integer_linear_programming::{MipOutcome, MipSolver},
    simplex_task::{LinearResult, NoCallbacks, SolveCallbacks, SolveStatistics},
    solver_config::{ArithmeticMode, SolverConfig},
    sparse_matrix::SparseMatrix,
};

/// An enum indicating whether to minimise or maximise a goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum OptimisationDirection {
    Minimise,
    Maximise,
}

/// A reference to a variable of a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable(pub(crate) usize);

impl Variable {
    /// Sequence number of the variable.
    ///
    /// Variables are referenced by their number in the addition sequence.
    pub fn idx(&self) -> usize {
        self.0
    }
}

/// A reference to a constraint of a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Constraint(pub(crate) usize);

impl Constraint {
    pub fn idx(&self) -> usize {
        self.0
    }
}

/// An operator specifying the relation between left-hand and right-hand sides of the constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum ComparisonOp {
    /// The == operator (equal to)
    Eq,
    /// The <= operator (less than or equal to)
    Le,
    /// The >= operator (greater than or equal to)
    Ge,
}

#[derive(Clone, Debug)]
enum GoalTerms {
    Variables(Vec<(usize, FractionExact)>),
    Row(usize),
}

#[derive(Clone, Debug)]
struct Goal {
    direction: OptimisationDirection,
    terms: GoalTerms,
}

/**
 * A linear model: bounded variables, some of which must be integer, linear constraints and a
 * lexicographic sequence of goals. Goals are optimised in the order they were added; each later
 * goal only chooses among the optima of the earlier ones.
 */
#[derive(Clone, Debug, Default)]
pub struct LinearModel {
    lower: Vec<FractionExact>,
    upper: Vec<FractionExact>,
    integrality: BitVec,
    constraints: Vec<(Vec<(usize, FractionExact)>, ComparisonOp, FractionExact)>,
    goals: Vec<Goal>,
}

impl LinearModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable_count(&self) -> usize {
        self.lower.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Add a continuous variable. Use `finf!(-)` and `finf!()` for absent bounds.
    pub fn add_variable(&mut self, lower: FractionExact, upper: FractionExact) -> Variable {
        let var = Variable(self.lower.len());
        self.lower.push(lower);
        self.upper.push(upper);
        self.integrality.push(false);
        var
    }

    pub fn add_integer_variable(&mut self, lower: FractionExact, upper: FractionExact) -> Variable {
        let var = self.add_variable(lower, upper);
        self.integrality.set(var.0, true);
        var
    }

    pub fn set_integer(&mut self, var: Variable, integer: bool) -> Result<()> {
        self.check(var)?;
        self.integrality.set(var.0, integer);
        Ok(())
    }

    pub fn is_integer(&self, var: Variable) -> bool {
        self.integrality.get(var.0).is_some_and(|bit| *bit)
    }

    fn check(&self, var: Variable) -> Result<()> {
        if var.0 < self.variable_count() {
            Ok(())
        } else {
            Err(anyhow!(
                "unknown variable {}; the model has {} variables",
                var.0,
                self.variable_count()
            ))
        }
    }

    /// Sums the coefficients of repeated variables and drops zeroes.
    fn collect_terms(
        &self,
        terms: impl IntoIterator<Item = (Variable, FractionExact)>,
    ) -> Result<Vec<(usize, FractionExact)>> {
        let mut collected = vec![];
        for (var, coefficient) in terms {
            self.check(var)?;
            collected.push((var.0, coefficient));
        }
        Ok(collected
            .into_iter()
            .sorted_by_key(|(var, _)| *var)
            .coalesce(|(var_a, mut a), (var_b, b)| {
                if var_a == var_b {
                    a += b;
                    Ok((var_a, a))
                } else {
                    Err(((var_a, a), (var_b, b)))
                }
            })
            .filter(|(_, coefficient)| !coefficient.is_zero())
            .collect())
    }

    /**
     * Add the constraint `Σ terms op rhs`. A variable may appear several times; its coefficients
     * are summed.
     */
    pub fn add_constraint(
        &mut self,
        terms: impl IntoIterator<Item = (Variable, FractionExact)>,
        op: ComparisonOp,
        rhs: FractionExact,
    ) -> Result<Constraint> {
        let terms = self
            .collect_terms(terms)
            .with_context(|| format!("constraint {}", self.constraints.len()))?;
        let constraint = Constraint(self.constraints.len());
        self.constraints.push((terms, op, rhs));
        Ok(constraint)
    }

    /// Add a goal over the variables, with a lower priority than the goals added before.
    pub fn add_goal(
        &mut self,
        direction: OptimisationDirection,
        terms: impl IntoIterator<Item = (Variable, FractionExact)>,
    ) -> Result<()> {
        let terms = self
            .collect_terms(terms)
            .with_context(|| format!("goal {}", self.goals.len()))?;
        self.goals.push(Goal {
            direction,
            terms: GoalTerms::Variables(terms),
        });
        Ok(())
    }

    /// Add a goal on the activity of a constraint, with a lower priority than the goals added before.
    pub fn add_row_goal(&mut self, direction: OptimisationDirection, constraint: Constraint) -> Result<()> {
        if constraint.0 >= self.constraints.len() {
            return Err(anyhow!("unknown constraint {}", constraint.0));
        }
        self.goals.push(Goal {
            direction,
            terms: GoalTerms::Row(constraint.0),
        });
        Ok(())
    }

    /**
     * The model in the form the engines work on: every constraint `r` becomes the row
     * `Σ a x - s_r = 0`, with the bounds of the constraint on its slack `s_r`. Goals are in
     * minimisation sense.
     */
    pub fn standard_form(&self) -> StandardForm {
        let structural_count = self.variable_count();
        let row_count = self.constraints.len();
        let mut matrix = SparseMatrix::new(row_count, structural_count + row_count);
        let mut lower = self.lower.clone();
        let mut upper = self.upper.clone();

        for (row, (terms, op, rhs)) in self.constraints.iter().enumerate() {
            for (var, coefficient) in terms {
                matrix.set(row, *var, coefficient.clone());
            }
            matrix.set(row, structural_count + row, -FractionExact::one());
            let (row_lower, row_upper) = match op {
                ComparisonOp::Eq => (rhs.clone(), rhs.clone()),
                ComparisonOp::Le => (crate::finf!(-), rhs.clone()),
                ComparisonOp::Ge => (rhs.clone(), crate::finf!()),
            };
            lower.push(row_lower);
            upper.push(row_upper);
        }

        let goals = self
            .goals
            .iter()
            .map(|goal| {
                let sign = match goal.direction {
                    OptimisationDirection::Minimise => FractionExact::one(),
                    OptimisationDirection::Maximise => -FractionExact::one(),
                };
                let mut costs = vec![FractionExact::zero(); structural_count + row_count];
                match &goal.terms {
                    GoalTerms::Variables(terms) => {
                        for (var, coefficient) in terms {
                            costs[*var] = coefficient * &sign;
                        }
                    }
                    GoalTerms::Row(row) => costs[structural_count + row] = sign,
                }
                costs
            })
            .collect();

        StandardForm {
            matrix,
            lower,
            upper,
            integrality: self.integrality.clone(),
            goals,
        }
    }

    pub fn solve(&self, config: &SolverConfig) -> Result<LinearSolution> {
        self.solve_with_callbacks(config, &NoCallbacks)
    }

    #[logging_timer::time]
    pub fn solve_with_callbacks(&self, config: &SolverConfig, callbacks: &dyn SolveCallbacks) -> Result<LinearSolution> {
        let form = self.standard_form();
        debug!(
            "solving a model of {} variables ({} integer), {} constraints and {} goals in {} arithmetic",
            self.variable_count(),
            self.integrality.count_ones(),
            self.constraints.len(),
            self.goals.len(),
            config.arithmetic
        );

        match config.arithmetic {
            ArithmeticMode::Double => {
                let outcome = MipSolver::<FractionF64>::new(&form, config, callbacks).solve()?;
                Ok(self.solution(outcome))
            }
            ArithmeticMode::Exact => {
                let outcome = MipSolver::<FractionExact>::new(&form, config, callbacks).solve()?;
                Ok(self.solution(outcome))
            }
            ArithmeticMode::Both => self.solve_certified(&form, config, callbacks),
        }
    }

    /**
     * Searches in double arithmetic, then certifies the result in exact arithmetic: the integer
     * variables are fixed at their rounded values and the exact engine starts from the basis the
     * double search ended in. The exact values and feasibility are certified; optimality over
     * the integer choices is not.
     */
    fn solve_certified(
        &self,
        form: &StandardForm,
        config: &SolverConfig,
        callbacks: &dyn SolveCallbacks,
    ) -> Result<LinearSolution> {
        let approximate = MipSolver::<FractionF64>::new(form, config, callbacks).solve()?;
        let mut statistics = approximate.statistics.clone();

        if approximate.result == LinearResult::Interrupted {
            return Ok(self.solution(approximate));
        }

        let certified = if approximate.result.has_solution() {
            let mut fixed = form.clone();
            for var in form.integrality.iter_ones() {
                let value = FractionExact::from_approximate(approximate.values[var].0.round());
                fixed.lower[var] = value.clone();
                fixed.upper[var] = value;
            }
            let mut solver = MipSolver::<FractionExact>::new(&fixed, config, callbacks);
            match approximate.basis.clone() {
                Some(basis) => solver = solver.with_basis(basis),
                None => debug!("the double basis does not fit the model, certifying from the slack basis"),
            }
            let mut outcome = solver.solve()?;
            if outcome.result == LinearResult::Optimal {
                outcome.result = approximate.result;
                outcome.gap = approximate.gap;
                Some(outcome)
            } else {
                warn!(
                    "exact certification of the double solution ended {}; searching again in exact arithmetic",
                    outcome.result
                );
                statistics.absorb(&outcome.statistics);
                None
            }
        } else {
            None
        };

        let mut outcome = match certified {
            Some(outcome) => outcome,
            None => MipSolver::<FractionExact>::new(form, config, callbacks).solve()?,
        };
        statistics.absorb(&outcome.statistics);
        outcome.statistics = statistics;
        Ok(self.solution(outcome))
    }

    fn solution<T: SimplexNumber>(&self, outcome: MipOutcome<T>) -> LinearSolution {
        let structural_count = self.variable_count();
        let has_values = outcome.result.has_solution();
        let values: Vec<T> = if has_values {
            outcome.values.into_iter().take(structural_count).collect()
        } else {
            vec![]
        };
        let mut goal_values: Vec<T> = if has_values { outcome.goal_values } else { vec![] };
        goal_values.truncate(self.goals.len());
        for (value, goal) in goal_values.iter_mut().zip(&self.goals) {
            if goal.direction == OptimisationDirection::Maximise {
                *value = -value.clone();
            }
        }

        LinearSolution {
            result: outcome.result,
            values: values.iter().map(|value| value.approximate()).collect(),
            exact_values: T::EXACT.then(|| values.iter().map(|value| value.to_exact()).collect()),
            goal_values: goal_values.iter().map(|value| value.approximate()).collect(),
            exact_goal_values: T::EXACT.then(|| goal_values.iter().map(|value| value.to_exact()).collect()),
            gap: outcome.gap,
            statistics: outcome.statistics,
            basis: outcome.basis,
        }
    }
}

/**
 * A model as matrix, bounds over all variables (structural variables first, then one slack per
 * row), integrality flags of the structural variables and goals in minimisation sense.
 */
#[derive(Clone, Debug)]
pub struct StandardForm {
    pub matrix: SparseMatrix,
    pub lower: Vec<FractionExact>,
    pub upper: Vec<FractionExact>,
    pub integrality: BitVec,
    pub goals: Vec<Vec<FractionExact>>,
}

impl StandardForm {
    pub fn structural_count(&self) -> usize {
        self.integrality.len()
    }

    pub fn variable_count(&self) -> usize {
        self.matrix.column_count()
    }

    pub fn goals<T: SimplexNumber>(&self) -> Vec<Vec<T>> {
        self.goals
            .iter()
            .map(|goal| goal.iter().map(convert).collect())
            .collect()
    }

    pub fn bounds<T: SimplexNumber>(&self) -> BoundManager<T> {
        BoundManager::new(
            Arc::new(self.lower.iter().map(convert).collect()),
            Arc::new(self.upper.iter().map(convert).collect()),
            self.structural_count(),
        )
    }

    /// Every slack basic; structural variables at a finite bound where they have one.
    pub fn slack_basis(&self) -> Basis {
        let statuses = (0..self.structural_count())
            .map(|var| status_within(&self.lower[var], &self.upper[var], VarStatus::Lower))
            .collect();
        Basis::slack(statuses, self.matrix.row_count())
    }
}

fn convert<T: SimplexNumber>(value: &FractionExact) -> T {
    T::from_coefficient(value, value.approximate())
}

/// The outcome of solving a [`LinearModel`]. Goal values are in the direction of their goal.
#[derive(Clone, Debug)]
pub struct LinearSolution {
    result: LinearResult,
    values: Vec<f64>,
    exact_values: Option<Vec<FractionExact>>,
    goal_values: Vec<f64>,
    exact_goal_values: Option<Vec<FractionExact>>,
    gap: f64,
    statistics: SolveStatistics,
    basis: Option<Basis>,
}

impl LinearSolution {
    pub fn result(&self) -> LinearResult {
        self.result
    }

    /// Value of the variable, if there is a solution.
    pub fn value(&self, var: Variable) -> Option<f64> {
        self.values.get(var.0).copied()
    }

    /// Exact value of the variable, if the solve ended in exact arithmetic.
    pub fn exact_value(&self, var: Variable) -> Option<&FractionExact> {
        self.exact_values.as_ref()?.get(var.0)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of the first goal.
    pub fn objective(&self) -> Option<f64> {
        self.goal_values.first().copied()
    }

    pub fn exact_objective(&self) -> Option<&FractionExact> {
        self.exact_goal_values.as_ref()?.first()
    }

    pub fn goal_values(&self) -> &[f64] {
        &self.goal_values
    }

    pub fn exact_goal_values(&self) -> Option<&[FractionExact]> {
        self.exact_goal_values.as_deref()
    }

    pub fn gap(&self) -> f64 {
        self.gap
    }

    pub fn statistics(&self) -> &SolveStatistics {
        &self.statistics
    }

    /// The basis that certifies the solution, over structural variables and slacks.
    pub fn basis(&self) -> Option<&Basis> {
        self.basis.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use ntest::timeout;
    use strum::IntoEnumIterator;

    use crate::{
        f, f0, f1, finf,
        math::fraction_exact::FractionExact,
        optimisation_algorithms::{
            simplex_task::LinearResult,
            solver_config::{ArithmeticMode, SolverConfig},
        },
    };

    use super::*;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-6)
    }

    #[test]
    fn optimise() {
        let mut model = LinearModel::new();
        let v1 = model.add_variable(f!(12), finf!());
        let v2 = model.add_variable(f!(5), finf!());
        model
            .add_constraint([(v1, f1!()), (v2, f1!())], ComparisonOp::Le, f!(20))
            .unwrap();
        model
            .add_constraint([(v1, f1!()), (v2, -f!(4))], ComparisonOp::Ge, -f!(20))
            .unwrap();
        model
            .add_goal(OptimisationDirection::Maximise, [(v1, f!(3)), (v2, f!(4))])
            .unwrap();

        for arithmetic in ArithmeticMode::iter() {
            let sol = model
                .solve(&SolverConfig::default().with_arithmetic(arithmetic))
                .unwrap();
            assert_eq!(sol.result(), LinearResult::Optimal);
            assert!(close(sol.value(v1), 12.0));
            assert!(close(sol.value(v2), 8.0));
            assert!(close(sol.objective(), 68.0));
            match arithmetic {
                ArithmeticMode::Double => assert!(sol.exact_value(v1).is_none()),
                ArithmeticMode::Exact | ArithmeticMode::Both => {
                    assert_eq!(sol.exact_value(v2), Some(&f!(8)));
                    assert_eq!(sol.exact_objective(), Some(&f!(68)));
                }
            }
        }
    }

    #[test]
    fn empty_expr_constraints() {
        let config = SolverConfig::exact();
        let trivial: [(ComparisonOp, FractionExact); 3] = [
            (ComparisonOp::Eq, f0!()),
            (ComparisonOp::Ge, -f1!()),
            (ComparisonOp::Le, f1!()),
        ];

        let mut model = LinearModel::new();
        let x = model.add_variable(f0!(), finf!());
        model.add_goal(OptimisationDirection::Minimise, [(x, f1!())]).unwrap();
        let empty: [(Variable, FractionExact); 0] = [];
        for (op, b) in trivial.iter().cloned() {
            model.add_constraint(empty.clone(), op, b).unwrap();
        }
        let sol = model.solve(&config).unwrap();
        assert_eq!(sol.result(), LinearResult::Optimal);
        assert_eq!(sol.exact_objective(), Some(&f0!()));

        let infeasible: [(ComparisonOp, FractionExact); 3] = [
            (ComparisonOp::Eq, f!(12)),
            (ComparisonOp::Ge, f!(34)),
            (ComparisonOp::Le, -f!(56)),
        ];
        for (op, b) in infeasible.iter().cloned() {
            let mut cloned = model.clone();
            cloned.add_constraint(empty.clone(), op, b).unwrap();
            let sol = cloned.solve(&config).unwrap();
            assert!(sol.result().is_infeasible());
            assert!(sol.value(x).is_none());
        }

        let y = model.add_variable(f0!(), finf!());
        let mut unbounded = model.clone();
        unbounded.goals.clear();
        unbounded
            .add_goal(OptimisationDirection::Minimise, [(x, f1!()), (y, -f1!())])
            .unwrap();
        assert_eq!(unbounded.solve(&config).unwrap().result(), LinearResult::UnboundedPrimal);
    }

    #[test]
    fn free_variables() {
        let mut model = LinearModel::new();
        let v1 = model.add_variable(f0!(), finf!());
        let v2 = model.add_variable(finf!(-), finf!());
        model
            .add_constraint([(v1, f1!()), (v2, f1!())], ComparisonOp::Le, f!(4))
            .unwrap();
        model
            .add_constraint([(v1, f1!()), (v2, f1!())], ComparisonOp::Ge, f!(2))
            .unwrap();
        model
            .add_constraint([(v1, f1!()), (v2, -f1!())], ComparisonOp::Ge, f0!())
            .unwrap();
        model
            .add_goal(OptimisationDirection::Maximise, [(v1, f1!()), (v2, f!(2))])
            .unwrap();

        let sol = model.solve(&SolverConfig::exact()).unwrap();
        assert_eq!(sol.exact_value(v1), Some(&f!(2)));
        assert_eq!(sol.exact_value(v2), Some(&f!(2)));
        assert_eq!(sol.exact_objective(), Some(&f!(6)));
    }

    #[test]
    fn unbounded_without_rows() {
        let mut model = LinearModel::new();
        let x = model.add_variable(f0!(), finf!());
        model
            .add_goal(OptimisationDirection::Maximise, [(x, f1!())])
            .unwrap();
        assert_eq!(model.constraint_count(), 0);

        for arithmetic in [ArithmeticMode::Double, ArithmeticMode::Exact] {
            let sol = model
                .solve(&SolverConfig::default().with_arithmetic(arithmetic))
                .unwrap();
            assert_eq!(sol.result(), LinearResult::UnboundedPrimal);
            assert!(sol.value(x).is_none());
        }
    }

    #[test]
    fn repeated_terms_are_summed() {
        let mut model = LinearModel::new();
        let x = model.add_variable(f0!(), finf!());
        let y = model.add_variable(f0!(), finf!());
        //x + x + y - y <= 4
        model
            .add_constraint([(x, f1!()), (y, f1!()), (x, f1!()), (y, -f1!())], ComparisonOp::Le, f!(4))
            .unwrap();
        model
            .add_goal(OptimisationDirection::Maximise, [(x, f1!())])
            .unwrap();
        let form = model.standard_form();
        assert_eq!(form.matrix.row_len(0), 2);
        assert_eq!(form.matrix.coefficient(0, 0).unwrap().exact, &f!(2));

        let sol = model.solve(&SolverConfig::exact()).unwrap();
        assert_eq!(sol.exact_value(x), Some(&f!(2)));
    }

    #[test]
    fn unknown_variables() {
        let mut other = LinearModel::new();
        other.add_variable(f0!(), f1!());
        let foreign = other.add_variable(f0!(), f1!());

        let mut model = LinearModel::new();
        let x = model.add_variable(f0!(), f1!());
        assert!(
            model
                .add_constraint([(x, f1!()), (foreign, f1!())], ComparisonOp::Le, f1!())
                .is_err()
        );
        assert!(model.add_goal(OptimisationDirection::Minimise, [(foreign, f1!())]).is_err());
        assert!(model.set_integer(foreign, true).is_err());
        assert!(model.add_row_goal(OptimisationDirection::Minimise, Constraint(0)).is_err());
        assert_eq!(model.constraint_count(), 0);
    }

    #[test]
    fn lexicographic_goals() {
        //max x, then max y, s.t. x + y <= 4, x <= 3
        let mut model = LinearModel::new();
        let x = model.add_variable(f0!(), f!(3));
        let y = model.add_variable(f0!(), finf!());
        model
            .add_constraint([(x, f1!()), (y, f1!())], ComparisonOp::Le, f!(4))
            .unwrap();
        model.add_goal(OptimisationDirection::Maximise, [(x, f1!())]).unwrap();
        model.add_goal(OptimisationDirection::Maximise, [(y, f1!())]).unwrap();

        let sol = model.solve(&SolverConfig::exact()).unwrap();
        assert_eq!(sol.result(), LinearResult::Optimal);
        assert_eq!(sol.exact_goal_values(), Some(&[f!(3), f1!()][..]));
        assert_eq!(sol.goal_values(), &[3.0, 1.0]);
    }

    #[test]
    fn row_goal() {
        let mut model = LinearModel::new();
        let x = model.add_variable(f0!(), f!(2));
        let y = model.add_variable(f0!(), f!(3));
        let row = model
            .add_constraint([(x, f1!()), (y, f1!())], ComparisonOp::Le, f!(10))
            .unwrap();
        model.add_row_goal(OptimisationDirection::Maximise, row).unwrap();

        let sol = model.solve(&SolverConfig::exact()).unwrap();
        assert_eq!(sol.exact_objective(), Some(&f!(5)));
    }

    #[test]
    #[timeout(20000)]
    fn certified_integer_solution() {
        let _ = env_logger::builder().is_test(true).try_init();
        //max 10a + 13b + 7c + 8d s.t. 4a + 6b + 3c + 5d <= 12, binary
        let mut model = LinearModel::new();
        let items = [(10, 4), (13, 6), (7, 3), (8, 5)];
        let vars: Vec<Variable> = items
            .iter()
            .map(|_| model.add_integer_variable(f0!(), f1!()))
            .collect();
        model
            .add_constraint(
                vars.iter().zip(&items).map(|(&v, &(_, w))| (v, f!(w))),
                ComparisonOp::Le,
                f!(12),
            )
            .unwrap();
        model
            .add_goal(
                OptimisationDirection::Maximise,
                vars.iter().zip(&items).map(|(&v, &(p, _))| (v, f!(p))),
            )
            .unwrap();
        assert!(model.is_integer(vars[2]));

        let sol = model
            .solve(&SolverConfig::default().with_arithmetic(ArithmeticMode::Both))
            .unwrap();
        assert_eq!(sol.result(), LinearResult::Optimal);
        assert_eq!(sol.exact_objective(), Some(&f!(25)));
        let exact: Vec<_> = vars.iter().map(|&v| sol.exact_value(v).cloned()).collect();
        assert_eq!(exact, vec![Some(f1!()), Some(f0!()), Some(f1!()), Some(f1!())]);
        assert!(sol.basis().is_some_and(|basis| basis.is_consistent()));
        assert_eq!(sol.gap(), 0.0);
    }

    #[test]
    fn certified_infeasibility() {
        let mut model = LinearModel::new();
        let x = model.add_integer_variable(f0!(), f!(5));
        let y = model.add_integer_variable(f0!(), f!(5));
        model
            .add_constraint([(x, f!(2)), (y, f!(2))], ComparisonOp::Eq, f!(3))
            .unwrap();
        model.add_goal(OptimisationDirection::Minimise, [(x, f1!())]).unwrap();
        let sol = model
            .solve(&SolverConfig::default().with_arithmetic(ArithmeticMode::Both))
            .unwrap();
        assert_eq!(sol.result(), LinearResult::InfeasiblePrimal);
        assert!(sol.objective().is_none());
    }
}
