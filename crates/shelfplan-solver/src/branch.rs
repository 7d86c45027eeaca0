use std::time::Instant;

use tracing::{debug, info};

use crate::engine::{MilpSolver, SolveOptions};
use crate::problem::LpProblem;
use crate::simplex::{LpOutcome, Simplex};
use crate::solution::{Solution, SolutionStatus};

/// Depth-first branch-and-bound over simplex relaxations
#[derive(Default)]
pub struct BranchAndBound {
    simplex: Simplex,
}

impl BranchAndBound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_simplex(simplex: Simplex) -> Self {
        Self { simplex }
    }
}

struct Node {
    lower: Vec<f64>,
    upper: Vec<f64>,
    depth: usize,
}

impl Node {
    fn root(problem: &LpProblem, tolerance: f64) -> Self {
        let (lower, upper) = problem
            .variables
            .iter()
            .map(|var| {
                if var.integer {
                    ((var.lower - tolerance).ceil(), (var.upper + tolerance).floor())
                } else {
                    (var.lower, var.upper)
                }
            })
            .unzip();
        Self { lower, upper, depth: 0 }
    }

    fn with_lower(&self, index: usize, bound: f64) -> Self {
        let mut lower = self.lower.clone();
        lower[index] = bound;
        Self {
            lower,
            upper: self.upper.clone(),
            depth: self.depth + 1,
        }
    }

    fn with_upper(&self, index: usize, bound: f64) -> Self {
        let mut upper = self.upper.clone();
        upper[index] = bound;
        Self {
            lower: self.lower.clone(),
            upper,
            depth: self.depth + 1,
        }
    }
}

struct Incumbent {
    values: Vec<f64>,
    /// Objective in minimization sense
    score: f64,
}

/// The integer variable whose relaxation value is furthest from integral
fn branching_candidate(problem: &LpProblem, values: &[f64], tolerance: f64) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64, f64)> = None;
    for (j, var) in problem.variables.iter().enumerate() {
        if !var.integer {
            continue;
        }
        let value = values[j];
        let fractionality = (value - value.round()).abs();
        if fractionality > tolerance && best.is_none_or(|(_, _, f)| fractionality > f) {
            best = Some((j, value, fractionality));
        }
    }
    best.map(|(j, value, _)| (j, value))
}

impl MilpSolver for BranchAndBound {
    fn solve(&self, problem: &LpProblem, options: &SolveOptions) -> Solution {
        let start = Instant::now();
        let deadline = start.checked_add(options.time_limit);
        let sense = if problem.objective.minimize { 1.0 } else { -1.0 };

        debug!(
            variables = problem.num_variables(),
            integers = problem.num_integer_variables(),
            constraints = problem.num_constraints(),
            "starting branch-and-bound"
        );

        let mut incumbent = problem.feasible_hint(options.feasibility_tolerance).map(|values| {
            let score = sense * problem.evaluate(&values);
            debug!(objective = sense * score, "hint accepted as incumbent");
            Incumbent { values, score }
        });

        let mut stack = vec![Node::root(problem, options.integrality_tolerance)];
        let mut nodes = 0;
        let mut interrupted = false;

        while let Some(node) = stack.pop() {
            if nodes >= options.max_nodes || deadline.is_some_and(|d| Instant::now() >= d) {
                interrupted = true;
                break;
            }
            nodes += 1;

            match self
                .simplex
                .solve_with_bounds(problem, &node.lower, &node.upper, deadline)
            {
                LpOutcome::Infeasible => {}
                LpOutcome::Unbounded => {
                    if node.depth == 0 {
                        return Solution::without_values(SolutionStatus::Unbounded, nodes, start.elapsed());
                    }
                }
                LpOutcome::Interrupted => {
                    interrupted = true;
                    break;
                }
                LpOutcome::Optimal { values, objective } => {
                    let bound = sense * objective;
                    if incumbent
                        .as_ref()
                        .is_some_and(|inc| bound >= inc.score - options.optimality_gap)
                    {
                        continue;
                    }

                    match branching_candidate(problem, &values, options.integrality_tolerance) {
                        None => {
                            let values = problem.round_integers(values);
                            let score = sense * problem.evaluate(&values);
                            info!(objective = sense * score, nodes, depth = node.depth, "new incumbent");
                            incumbent = Some(Incumbent { values, score });
                        }
                        Some((index, value)) => {
                            let down = node.with_upper(index, value.floor());
                            let up = node.with_lower(index, value.ceil());
                            // The side nearest the relaxation value is explored first
                            if value - value.floor() < 0.5 {
                                stack.push(up);
                                stack.push(down);
                            } else {
                                stack.push(down);
                                stack.push(up);
                            }
                        }
                    }
                }
            }
        }

        let elapsed = start.elapsed();
        debug!(nodes, ?elapsed, interrupted, "branch-and-bound finished");

        match (incumbent, interrupted) {
            (Some(inc), interrupted) => {
                let status = if interrupted {
                    SolutionStatus::Feasible
                } else {
                    SolutionStatus::Optimal
                };
                let objective_value = problem.evaluate(&inc.values);
                Solution::with_values(status, inc.values, objective_value, nodes, elapsed)
            }
            (None, false) => Solution::without_values(SolutionStatus::Infeasible, nodes, elapsed),
            (None, true) => Solution::without_values(SolutionStatus::NotSolved, nodes, elapsed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::expr::LinearExpr;
    use crate::model::Model;

    #[test]
    fn test_branching_finds_integer_optimum() {
        // Maximize 8x + 5y
        //   x + y <= 6
        //   9x + 5y <= 45
        // Relaxation: (3.75, 2.25) = 41.25, integer optimum: (5, 0) = 40
        let mut model = Model::new();
        let x = model.integer(0.0, 100.0, "x").unwrap();
        let y = model.integer(0.0, 100.0, "y").unwrap();
        model.add_constraint("sum", (x + y).leq(6.0)).unwrap();
        model.add_constraint("weighted", (x * 9.0 + y * 5.0).leq(45.0)).unwrap();
        model.maximize(x * 8.0 + y * 5.0).unwrap();

        let solution = model.solve_with(&BranchAndBound::new(), &SolveOptions::default());
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.value(x), 5.0);
        assert_eq!(solution.value(y), 0.0);
        assert!((solution.objective_value - 40.0).abs() < 1e-6);
        assert!(solution.nodes_explored > 1);
    }

    #[test]
    fn test_lot_multiple_rounds_up() {
        // Produce at least 53 in lots of 10 at minimal cost
        let mut model = Model::new();
        let amount = model.integer(0.0, 100.0, "amount").unwrap();
        let lots = model.integer(0.0, 11.0, "lots").unwrap();
        model.add_constraint("lots", amount.equals(lots * 10.0)).unwrap();
        model.add_constraint("demand", amount.geq(53.0)).unwrap();
        model.minimize(LinearExpr::from(amount)).unwrap();

        let solution = model.solve_with(&BranchAndBound::new(), &SolveOptions::default());
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.value(amount), 60.0);
        assert_eq!(solution.value(lots), 6.0);
    }

    #[test]
    fn test_integer_infeasible() {
        // 2x = 3 has a relaxation but no integer solution
        let mut model = Model::new();
        let x = model.integer(0.0, 5.0, "x").unwrap();
        model.add_constraint("odd", (x * 2.0).equals(3.0)).unwrap();
        model.minimize(LinearExpr::from(x)).unwrap();

        let solution = model.solve_with(&BranchAndBound::new(), &SolveOptions::default());
        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_unbounded_relaxation() {
        let mut model = Model::new();
        let x = model.continuous(0.0, f64::INFINITY, "x").unwrap();
        model.maximize(LinearExpr::from(x)).unwrap();

        let solution = model.solve_with(&BranchAndBound::new(), &SolveOptions::default());
        assert_eq!(solution.status, SolutionStatus::Unbounded);
    }

    #[test]
    fn test_time_limit_keeps_feasible_hint() {
        let mut model = Model::new();
        let x = model.integer(0.0, 10.0, "x").unwrap();
        model.add_constraint("floor", x.geq(2.0)).unwrap();
        model.minimize(LinearExpr::from(x)).unwrap();
        model.set_hint(x, 7.0).unwrap();

        let options = SolveOptions::default().with_time_limit(Duration::ZERO);
        let solution = model.solve_with(&BranchAndBound::new(), &options);
        assert_eq!(solution.status, SolutionStatus::Feasible);
        assert_eq!(solution.value(x), 7.0);
        assert_eq!(solution.nodes_explored, 0);
    }

    #[test]
    fn test_time_limit_without_incumbent() {
        let mut model = Model::new();
        let x = model.integer(0.0, 10.0, "x").unwrap();
        model.minimize(LinearExpr::from(x)).unwrap();
        // Infeasible hints are ignored
        model.set_hint(x, 20.0).unwrap();

        let options = SolveOptions::default().with_max_nodes(0);
        let solution = model.solve_with(&BranchAndBound::new(), &options);
        assert_eq!(solution.status, SolutionStatus::NotSolved);
    }

    #[test]
    fn test_iteration_cap_interrupts_search() {
        let mut model = Model::new();
        let x = model.integer(0.0, 10.0, "x").unwrap();
        model.add_constraint("floor", x.geq(2.0)).unwrap();
        model.minimize(LinearExpr::from(x)).unwrap();

        let solver = BranchAndBound::with_simplex(Simplex::new().with_max_iterations(0));
        let solution = model.solve_with(&solver, &SolveOptions::default());
        assert_eq!(solution.status, SolutionStatus::NotSolved);
        assert_eq!(solution.nodes_explored, 1);
    }

    #[test]
    fn test_hint_proven_optimal_when_nothing_better_exists() {
        let mut model = Model::new();
        let x = model.integer(0.0, 10.0, "x").unwrap();
        model.add_constraint("floor", x.geq(2.0)).unwrap();
        model.minimize(LinearExpr::from(x)).unwrap();
        model.set_hint(x, 2.0).unwrap();

        let solution = model.solve_with(&BranchAndBound::new(), &SolveOptions::default());
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.value(x), 2.0);
    }
}
