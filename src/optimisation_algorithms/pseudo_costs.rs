use strum_macros::{Display, EnumIter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum BranchDirection {
    /// the variable gets an upper bound of the value rounded down
    Down,
    /// the variable gets a lower bound of the value rounded up
    Up,
}

#[derive(Clone, Copy, Debug, Default)]
struct Average {
    sum: f64,
    count: usize,
}

impl Average {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn get(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/**
 * Per-variable averages of the objective degradation per unit of fractional distance, observed
 * when branching down and up.
 */
#[derive(Clone, Debug)]
pub struct PseudoCosts {
    down: Vec<Average>,
    up: Vec<Average>,
    objective: Vec<f64>,
}

impl PseudoCosts {
    /**
     * `objective` holds the objective coefficient of each variable, the last resort estimate.
     */
    pub fn new(objective: Vec<f64>) -> Self {
        let n = objective.len();
        Self {
            down: vec![Average::default(); n],
            up: vec![Average::default(); n],
            objective,
        }
    }

    /**
     * Records that moving `var` by `distance` in `direction` degraded the objective by `degradation`.
     */
    pub fn record(&mut self, var: usize, direction: BranchDirection, degradation: f64, distance: f64) {
        if distance <= 0.0 || !degradation.is_finite() {
            return;
        }
        let unit = degradation.max(0.0) / distance;
        match direction {
            BranchDirection::Down => self.down[var].add(unit),
            BranchDirection::Up => self.up[var].add(unit),
        }
    }

    pub fn is_initialised(&self, var: usize) -> bool {
        self.down[var].count > 0 && self.up[var].count > 0
    }

    pub fn observations(&self, var: usize, direction: BranchDirection) -> usize {
        match direction {
            BranchDirection::Down => self.down[var].count,
            BranchDirection::Up => self.up[var].count,
        }
    }

    /**
     * Degradation per unit distance: the average of the variable, else the mean of the averages
     * of the variables that have one, else the magnitude of its objective coefficient.
     */
    pub fn unit_estimate(&self, var: usize, direction: BranchDirection) -> f64 {
        let averages = match direction {
            BranchDirection::Down => &self.down,
            BranchDirection::Up => &self.up,
        };
        averages[var]
            .get()
            .or_else(|| mean_of_averages(averages))
            .unwrap_or_else(|| self.objective[var].abs())
    }

    /**
     * Expected degradation of both children of branching on a variable with the given fractional part.
     */
    pub fn estimates(&self, var: usize, fraction: f64) -> (f64, f64) {
        (
            self.unit_estimate(var, BranchDirection::Down) * fraction,
            self.unit_estimate(var, BranchDirection::Up) * (1.0 - fraction),
        )
    }

    /**
     * Product score: a branching is good when both children degrade.
     */
    pub fn score(&self, var: usize, fraction: f64) -> f64 {
        let (down, up) = self.estimates(var, fraction);
        down.max(1e-6) * up.max(1e-6)
    }
}

/// Every variable with observations weighs the same, however often it was branched on.
fn mean_of_averages(averages: &[Average]) -> Option<f64> {
    let mut mean = Average::default();
    averages.iter().filter_map(Average::get).for_each(|average| mean.add(average));
    mean.get()
}

#[cfg(test)]
mod tests {
    use super::{BranchDirection, PseudoCosts};

    #[test]
    fn estimates_fall_back() {
        let mut costs = PseudoCosts::new(vec![3.0, -5.0, 0.0]);
        assert_eq!(costs.unit_estimate(1, BranchDirection::Down), 5.0);

        costs.record(0, BranchDirection::Down, 1.0, 0.5);
        costs.record(0, BranchDirection::Down, 3.0, 0.5);
        assert_eq!(costs.unit_estimate(0, BranchDirection::Down), 4.0);
        assert!(!costs.is_initialised(0));

        //variable 1 has no observations of its own: the average over all variables
        assert_eq!(costs.unit_estimate(1, BranchDirection::Down), 4.0);
        //nobody has branched up yet
        assert_eq!(costs.unit_estimate(1, BranchDirection::Up), 5.0);

        costs.record(0, BranchDirection::Up, 2.0, 0.25);
        assert!(costs.is_initialised(0));
        assert_eq!(costs.estimates(0, 0.5), (2.0, 4.0));
    }

    #[test]
    fn improvements_count_as_zero() {
        let mut costs = PseudoCosts::new(vec![1.0]);
        costs.record(0, BranchDirection::Up, -2.0, 0.5);
        costs.record(0, BranchDirection::Up, 1.0, 0.0);
        assert_eq!(costs.observations(0, BranchDirection::Up), 1);
        assert_eq!(costs.unit_estimate(0, BranchDirection::Up), 0.0);
    }

    #[test]
    fn fallback_weighs_variables_equally() {
        let mut costs = PseudoCosts::new(vec![1.0, 1.0, 1.0]);
        for _ in 0..4 {
            costs.record(0, BranchDirection::Down, 0.5, 0.5);
        }
        costs.record(1, BranchDirection::Down, 4.5, 0.5);
        assert_eq!(costs.unit_estimate(0, BranchDirection::Down), 1.0);
        assert_eq!(costs.unit_estimate(1, BranchDirection::Down), 9.0);
        assert_eq!(costs.unit_estimate(2, BranchDirection::Down), 5.0);
    }
}
