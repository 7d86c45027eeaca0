use std::time::Instant;

use crate::problem::{ConstraintOp, LpProblem};

/// Outcome of solving a linear relaxation
#[derive(Debug, Clone, PartialEq)]
pub enum LpOutcome {
    Optimal { values: Vec<f64>, objective: f64 },
    Infeasible,
    Unbounded,
    /// Deadline or iteration limit hit before the relaxation was solved
    Interrupted,
}

/// Bounded-variable simplex solver for linear relaxations
///
/// Integrality is ignored here; [`BranchAndBound`](crate::BranchAndBound)
/// drives this solver with tightened bounds.
pub struct Simplex {
    /// Maximum iterations per phase before giving up
    max_iterations: usize,
    /// Tolerance for pivot elements and reduced costs
    tolerance: f64,
    /// Tolerance for the phase 1 infeasibility test
    feasibility_tolerance: f64,
}

impl Default for Simplex {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
            tolerance: 1e-9,
            feasibility_tolerance: 1e-7,
        }
    }
}

impl Simplex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Solve the relaxation with the bounds declared on the problem
    pub fn solve(&self, problem: &LpProblem) -> LpOutcome {
        let lower: Vec<f64> = problem.variables.iter().map(|v| v.lower).collect();
        let upper: Vec<f64> = problem.variables.iter().map(|v| v.upper).collect();
        self.solve_with_bounds(problem, &lower, &upper, None)
    }

    /// Solve the relaxation with explicit per-variable bounds
    pub fn solve_with_bounds(
        &self,
        problem: &LpProblem,
        lower: &[f64],
        upper: &[f64],
        deadline: Option<Instant>,
    ) -> LpOutcome {
        if lower.iter().zip(upper).any(|(l, u)| *l > *u + self.tolerance) {
            return LpOutcome::Infeasible;
        }

        let mut tableau = Tableau::build(problem, lower, upper);
        let art_start = tableau.n_vars + tableau.n_slack;

        // Phase 1: find an initial basic feasible solution
        if tableau.n_artificial > 0 {
            let n_cols = tableau.n_cols();
            let mut costs = vec![0.0; n_cols];
            for cost in costs.iter_mut().skip(art_start) {
                *cost = -1.0;
            }
            self.set_objective(&mut tableau, &costs);

            match self.iterate(&mut tableau, n_cols, deadline) {
                SimplexResult::Optimal => {}
                // Phase 1 is bounded below by zero, so this only happens on numerical trouble
                SimplexResult::Unbounded => return LpOutcome::Infeasible,
                SimplexResult::Interrupted => return LpOutcome::Interrupted,
            }

            let rhs_col = tableau.rhs_col();
            let residual: f64 = (0..tableau.n_rows())
                .filter(|&i| tableau.basic_vars[i] >= art_start)
                .map(|i| tableau.data[i][rhs_col])
                .sum();
            if residual > self.feasibility_tolerance {
                return LpOutcome::Infeasible;
            }

            self.drive_out_artificials(&mut tableau, art_start);
        }

        // Phase 2: optimize the real objective, artificial columns may not re-enter
        let mut costs = vec![0.0; tableau.n_cols()];
        for (j, cost) in costs.iter_mut().take(tableau.n_vars).enumerate() {
            let c = problem.objective.coefficients.get(j).copied().unwrap_or(0.0);
            *cost = if problem.objective.minimize { -c } else { c };
        }
        self.set_objective(&mut tableau, &costs);

        match self.iterate(&mut tableau, art_start, deadline) {
            SimplexResult::Optimal => {}
            SimplexResult::Unbounded => return LpOutcome::Unbounded,
            SimplexResult::Interrupted => return LpOutcome::Interrupted,
        }

        let values = tableau.values(lower, upper);
        let objective = problem.evaluate(&values);
        LpOutcome::Optimal { values, objective }
    }

    /// Load maximization costs into the objective row, priced out against the basis
    fn set_objective(&self, tableau: &mut Tableau, costs: &[f64]) {
        let obj_row = tableau.n_rows();
        let n_cols = tableau.n_cols();

        let mut row = vec![0.0; n_cols + 1];
        for j in 0..n_cols {
            row[j] = if tableau.flipped[j] { -costs[j] } else { costs[j] };
        }
        for i in 0..tableau.n_rows() {
            let factor = row[tableau.basic_vars[i]];
            if factor != 0.0 {
                for (j, value) in row.iter_mut().enumerate() {
                    *value -= factor * tableau.data[i][j];
                }
            }
        }
        tableau.data[obj_row] = row;
    }

    fn iterate(&self, tableau: &mut Tableau, enter_limit: usize, deadline: Option<Instant>) -> SimplexResult {
        // Bland's rule while pivots are degenerate keeps the method from cycling
        let mut bland = false;

        for iteration in 0..self.max_iterations {
            if iteration % 64 == 0 && deadline.is_some_and(|d| Instant::now() >= d) {
                return SimplexResult::Interrupted;
            }

            let Some(col) = self.find_pivot_column(tableau, enter_limit, bland) else {
                return SimplexResult::Optimal;
            };

            match self.find_pivot_row(tableau, col, bland) {
                RatioTest::BoundFlip => {
                    bland = tableau.upper[col] <= self.tolerance;
                    tableau.flip_column(col);
                }
                RatioTest::Pivot { row, to_upper, step } => {
                    if to_upper {
                        tableau.complement_basic(row);
                    }
                    self.pivot(tableau, row, col);
                    bland = step <= self.tolerance;
                }
                RatioTest::Unbounded => return SimplexResult::Unbounded,
            }
        }
        SimplexResult::Interrupted
    }

    fn find_pivot_column(&self, tableau: &Tableau, enter_limit: usize, bland: bool) -> Option<usize> {
        let obj_row = tableau.n_rows();
        let reduced = &tableau.data[obj_row][..enter_limit];

        if bland {
            return reduced.iter().position(|&d| d > self.tolerance);
        }

        // Look for the most positive reduced cost (can improve objective)
        let mut max_val = self.tolerance;
        let mut max_col = None;
        for (j, &d) in reduced.iter().enumerate() {
            if d > max_val {
                max_val = d;
                max_col = Some(j);
            }
        }
        max_col
    }

    fn find_pivot_row(&self, tableau: &Tableau, col: usize, bland: bool) -> RatioTest {
        let rhs_col = tableau.rhs_col();

        let mut best: Option<(usize, bool, f64)> = None;
        for i in 0..tableau.n_rows() {
            let a = tableau.data[i][col];
            let rhs = tableau.data[i][rhs_col];
            let (ratio, to_upper) = if a > self.tolerance {
                (rhs / a, false)
            } else if a < -self.tolerance {
                let bound = tableau.upper[tableau.basic_vars[i]];
                if !bound.is_finite() {
                    continue;
                }
                ((bound - rhs) / -a, true)
            } else {
                continue;
            };
            let ratio = ratio.max(0.0);

            let replace = match best {
                None => true,
                Some((row, _, best_ratio)) => {
                    if ratio < best_ratio - self.tolerance {
                        true
                    } else if ratio <= best_ratio + self.tolerance {
                        if bland {
                            tableau.basic_vars[i] < tableau.basic_vars[row]
                        } else {
                            a.abs() > tableau.data[row][col].abs()
                        }
                    } else {
                        false
                    }
                }
            };
            if replace {
                best = Some((i, to_upper, ratio));
            }
        }

        let own_bound = tableau.upper[col];
        match best {
            Some((_, _, step)) if own_bound <= step => RatioTest::BoundFlip,
            Some((row, to_upper, step)) => RatioTest::Pivot { row, to_upper, step },
            None if own_bound.is_finite() => RatioTest::BoundFlip,
            None => RatioTest::Unbounded,
        }
    }

    fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        // Update basic variable
        tableau.basic_vars[row] = col;

        // Scale pivot row and remember its non-zero entries
        let pivot_val = tableau.data[row][col];
        let mut pivot_entries = Vec::new();
        for (j, value) in tableau.data[row].iter_mut().enumerate() {
            if *value != 0.0 {
                *value /= pivot_val;
                pivot_entries.push((j, *value));
            }
        }

        // Eliminate column in other rows, objective included
        for (i, data_row) in tableau.data.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = data_row[col];
            if factor == 0.0 {
                continue;
            }
            for &(j, value) in &pivot_entries {
                data_row[j] -= factor * value;
            }
            data_row[col] = 0.0;
        }
    }

    /// Replace basic artificials (all at zero after phase 1) by structural or slack columns
    fn drive_out_artificials(&self, tableau: &mut Tableau, art_start: usize) {
        for i in 0..tableau.n_rows() {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            let mut best: Option<(usize, f64)> = None;
            for j in 0..art_start {
                let a = tableau.data[i][j].abs();
                if a > self.feasibility_tolerance && best.is_none_or(|(_, b)| a > b) {
                    best = Some((j, a));
                }
            }
            // Without a candidate the row is redundant and keeps its artificial at zero
            if let Some((col, _)) = best {
                self.pivot(tableau, i, col);
            }
        }
    }
}

/// Dense simplex tableau over shifted variables `x' = x - lower`
///
/// Columns are structural variables, then slack/surplus, then artificials,
/// then the right-hand side. A flipped column holds `upper - x'` instead of `x'`.
struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    upper: Vec<f64>,
    flipped: Vec<bool>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
}

impl Tableau {
    fn build(problem: &LpProblem, lower: &[f64], upper: &[f64]) -> Self {
        let n_vars = problem.num_variables();
        let n_constraints = problem.num_constraints();

        // Shift lower bounds into the right-hand side and make every RHS non-negative
        let rows: Vec<(ConstraintOp, f64, f64)> = problem
            .constraints
            .iter()
            .map(|c| {
                let shift: f64 = c.terms.iter().map(|&(j, coef)| coef * lower[j]).sum();
                let rhs = c.rhs - shift;
                if rhs < 0.0 {
                    let op = match c.op {
                        ConstraintOp::Le => ConstraintOp::Ge,
                        ConstraintOp::Ge => ConstraintOp::Le,
                        ConstraintOp::Eq => ConstraintOp::Eq,
                    };
                    (op, -rhs, -1.0)
                } else {
                    (c.op, rhs, 1.0)
                }
            })
            .collect();

        let n_slack = rows.iter().filter(|(op, _, _)| *op != ConstraintOp::Eq).count();
        let n_artificial = rows.iter().filter(|(op, _, _)| *op != ConstraintOp::Le).count();

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; n_constraints + 1],
            basic_vars: vec![0; n_constraints],
            upper: vec![f64::INFINITY; total_cols - 1],
            flipped: vec![false; total_cols - 1],
            n_vars,
            n_slack,
            n_artificial,
        };

        for j in 0..n_vars {
            tableau.upper[j] = upper[j] - lower[j];
        }

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, (c, &(op, rhs, sign))) in problem.constraints.iter().zip(&rows).enumerate() {
            for &(j, coef) in &c.terms {
                tableau.data[i][j] += sign * coef;
            }
            tableau.data[i][total_cols - 1] = rhs;

            match op {
                ConstraintOp::Le => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        tableau
    }

    fn n_rows(&self) -> usize {
        self.basic_vars.len()
    }

    /// Number of variable columns (RHS excluded)
    fn n_cols(&self) -> usize {
        self.upper.len()
    }

    fn rhs_col(&self) -> usize {
        self.upper.len()
    }

    /// Move a non-basic column from one bound to the other
    fn flip_column(&mut self, col: usize) {
        let bound = self.upper[col];
        let rhs_col = self.rhs_col();
        for row in self.data.iter_mut() {
            let a = row[col];
            if a != 0.0 {
                row[rhs_col] -= a * bound;
                row[col] = -a;
            }
        }
        self.flipped[col] = !self.flipped[col];
    }

    /// Re-express the basic variable of `row` against its upper bound
    fn complement_basic(&mut self, row: usize) {
        let basic = self.basic_vars[row];
        let bound = self.upper[basic];
        let rhs_col = self.rhs_col();
        let data_row = &mut self.data[row];
        for value in data_row[..rhs_col].iter_mut() {
            *value = -*value;
        }
        data_row[basic] = 1.0;
        data_row[rhs_col] = bound - data_row[rhs_col];
        self.flipped[basic] = !self.flipped[basic];
    }

    /// Recover original variable values from the final basis
    fn values(&self, lower: &[f64], upper: &[f64]) -> Vec<f64> {
        let rhs_col = self.rhs_col();
        let mut shifted: Vec<f64> = (0..self.n_cols())
            .map(|j| if self.flipped[j] { self.upper[j] } else { 0.0 })
            .collect();
        for (i, &basic) in self.basic_vars.iter().enumerate() {
            let value = self.data[i][rhs_col];
            shifted[basic] = if self.flipped[basic] {
                self.upper[basic] - value
            } else {
                value
            };
        }

        (0..self.n_vars)
            .map(|j| (lower[j] + shifted[j]).max(lower[j]).min(upper[j]))
            .collect()
    }
}

enum SimplexResult {
    Optimal,
    Unbounded,
    Interrupted,
}

enum RatioTest {
    /// The entering column reaches its own bound first
    BoundFlip,
    Pivot { row: usize, to_upper: bool, step: f64 },
    Unbounded,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Variable;

    fn var(name: &str, lower: f64, upper: f64) -> Variable {
        Variable {
            name: name.to_string(),
            lower,
            upper,
            integer: false,
        }
    }

    fn optimal(outcome: LpOutcome) -> (Vec<f64>, f64) {
        match outcome {
            LpOutcome::Optimal { values, objective } => (values, objective),
            other => panic!("expected optimal outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=11
        let mut problem = LpProblem::new();
        let x = problem.add_variable(var("x", 0.0, f64::INFINITY));
        let y = problem.add_variable(var("y", 0.0, f64::INFINITY));
        problem.set_objective(vec![3.0, 2.0], 0.0, false);
        problem.add_constraint("sum", vec![(x, 1.0), (y, 1.0)], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![(x, 1.0)], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![(y, 1.0)], ConstraintOp::Le, 3.0);

        let (values, objective) = optimal(Simplex::new().solve(&problem));
        assert!((values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", values[0]);
        assert!((values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", values[1]);
        assert!((objective - 11.0).abs() < 1e-6, "obj = {} (expected 11)", objective);
    }

    #[test]
    fn test_minimization_with_ge_and_variable_bounds() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   0 <= x <= 3, 0 <= y <= 3 (as variable bounds)
        // Optimal: x=3, y=1, obj=9
        let mut problem = LpProblem::new();
        let x = problem.add_variable(var("x", 0.0, 3.0));
        let y = problem.add_variable(var("y", 0.0, 3.0));
        problem.set_objective(vec![2.0, 3.0], 0.0, true);
        problem.add_constraint("sum", vec![(x, 1.0), (y, 1.0)], ConstraintOp::Ge, 4.0);

        let (values, objective) = optimal(Simplex::new().solve(&problem));
        assert!((values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", values[0]);
        assert!((values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", values[1]);
        assert!((objective - 9.0).abs() < 1e-6, "obj = {} (expected 9)", objective);
    }

    #[test]
    fn test_lower_bounds_are_shifted() {
        // Minimize x + 2y with x + y = 5, x in [2, 3], y in [1, 10]
        // Optimal: x=3, y=2, obj=7
        let mut problem = LpProblem::new();
        let x = problem.add_variable(var("x", 2.0, 3.0));
        let y = problem.add_variable(var("y", 1.0, 10.0));
        problem.set_objective(vec![1.0, 2.0], 0.0, true);
        problem.add_constraint("total", vec![(x, 1.0), (y, 1.0)], ConstraintOp::Eq, 5.0);

        let (values, objective) = optimal(Simplex::new().solve(&problem));
        assert!((values[0] - 3.0).abs() < 1e-6, "x = {}", values[0]);
        assert!((values[1] - 2.0).abs() < 1e-6, "y = {}", values[1]);
        assert!((objective - 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_problem_terminates() {
        // Beale's example, which cycles under the textbook largest-coefficient rule
        let mut problem = LpProblem::new();
        let x: Vec<usize> = (0..4)
            .map(|i| problem.add_variable(var(&format!("x{}", i), 0.0, f64::INFINITY)))
            .collect();
        problem.set_objective(vec![0.75, -20.0, 0.5, -6.0], 0.0, false);
        problem.add_constraint(
            "r1",
            vec![(x[0], 0.25), (x[1], -8.0), (x[2], -1.0), (x[3], 9.0)],
            ConstraintOp::Le,
            0.0,
        );
        problem.add_constraint(
            "r2",
            vec![(x[0], 0.5), (x[1], -12.0), (x[2], -0.5), (x[3], 3.0)],
            ConstraintOp::Le,
            0.0,
        );
        problem.add_constraint("r3", vec![(x[2], 1.0)], ConstraintOp::Le, 1.0);

        let (_, objective) = optimal(Simplex::new().solve(&problem));
        assert!((objective - 1.25).abs() < 1e-6, "obj = {} (expected 1.25)", objective);
    }

    #[test]
    fn test_infeasible() {
        // x >= 5
        // x <= 3
        let mut problem = LpProblem::new();
        let x = problem.add_variable(var("x", 0.0, f64::INFINITY));
        problem.set_objective(vec![1.0], 0.0, true);
        problem.add_constraint("lower", vec![(x, 1.0)], ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", vec![(x, 1.0)], ConstraintOp::Le, 3.0);

        assert_eq!(Simplex::new().solve(&problem), LpOutcome::Infeasible);
    }

    #[test]
    fn test_infeasible_against_lower_bound() {
        // x in [4, 10] but x <= 2
        let mut problem = LpProblem::new();
        let x = problem.add_variable(var("x", 4.0, 10.0));
        problem.add_constraint("upper", vec![(x, 1.0)], ConstraintOp::Le, 2.0);

        assert_eq!(Simplex::new().solve(&problem), LpOutcome::Infeasible);
    }

    #[test]
    fn test_unbounded() {
        let mut problem = LpProblem::new();
        let x = problem.add_variable(var("x", 0.0, f64::INFINITY));
        problem.set_objective(vec![1.0], 0.0, false);
        problem.add_constraint("floor", vec![(x, 1.0)], ConstraintOp::Ge, 1.0);

        assert_eq!(Simplex::new().solve(&problem), LpOutcome::Unbounded);
    }

    #[test]
    fn test_crossed_bounds_are_infeasible() {
        let mut problem = LpProblem::new();
        problem.add_variable(var("x", 0.0, 5.0));
        let outcome = Simplex::new().solve_with_bounds(&problem, &[3.0], &[2.0], None);
        assert_eq!(outcome, LpOutcome::Infeasible);
    }
}
