//! MILP engine backed by HiGHS through `good_lp`.

use std::time::{Duration, Instant};

use good_lp::solvers::highs::highs;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution as _, SolverModel, Variable as LpVariable, constraint,
    variable,
};
use tracing::{debug, info, warn};

use crate::engine::{MilpSolver, SolveOptions};
use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::{Solution, SolutionStatus};

/// Branch-and-cut through HiGHS. Solutions are re-checked against the
/// original problem before they are reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsSolver;

impl HighsSolver {
    pub fn new() -> Self {
        HighsSolver
    }
}

fn expression(terms: &[(usize, f64)], columns: &[LpVariable]) -> Expression {
    let mut expr = Expression::from(0.0);
    for &(j, coefficient) in terms {
        expr += columns[j] * coefficient;
    }
    expr
}

fn failure_status(error: &ResolutionError, problem: &LpProblem) -> SolutionStatus {
    match error {
        ResolutionError::Infeasible => SolutionStatus::Infeasible,
        // Every variable boxed means the objective cannot run off
        ResolutionError::Unbounded if problem.variables.iter().all(|v| v.upper.is_finite() && v.lower.is_finite()) => {
            SolutionStatus::Infeasible
        }
        ResolutionError::Unbounded => SolutionStatus::Unbounded,
        _ => SolutionStatus::NotSolved,
    }
}

/// Fall back to the hint when HiGHS stops without a usable assignment
fn hint_or_nothing(problem: &LpProblem, options: &SolveOptions, elapsed: Duration) -> Solution {
    match problem.feasible_hint(options.feasibility_tolerance) {
        Some(values) => {
            let objective_value = problem.evaluate(&values);
            info!(objective = objective_value, "falling back to the hint");
            Solution::with_values(SolutionStatus::Feasible, values, objective_value, 0, elapsed)
        }
        None => Solution::without_values(SolutionStatus::NotSolved, 0, elapsed),
    }
}

impl MilpSolver for HighsSolver {
    fn solve(&self, problem: &LpProblem, options: &SolveOptions) -> Solution {
        let start = Instant::now();
        debug!(
            variables = problem.num_variables(),
            integers = problem.num_integer_variables(),
            constraints = problem.num_constraints(),
            "starting HiGHS"
        );

        let mut vars = ProblemVariables::new();
        let columns: Vec<LpVariable> = problem
            .variables
            .iter()
            .map(|v| {
                let mut definition = variable().name(v.name.clone()).min(v.lower);
                if v.upper.is_finite() {
                    definition = definition.max(v.upper);
                }
                if v.integer {
                    definition = definition.integer();
                }
                vars.add(definition)
            })
            .collect();

        let objective_terms: Vec<(usize, f64)> = problem
            .objective
            .coefficients
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, c)| c != 0.0)
            .collect();
        let objective = expression(&objective_terms, &columns);
        let unsolved = if problem.objective.minimize {
            vars.minimise(objective)
        } else {
            vars.maximise(objective)
        };

        let mut model = unsolved
            .using(highs)
            .set_time_limit(options.time_limit.as_secs_f64());
        for row in &problem.constraints {
            let lhs = expression(&row.terms, &columns);
            let rhs = row.rhs;
            model = match row.op {
                ConstraintOp::Le => model.with(constraint!(lhs <= rhs)),
                ConstraintOp::Ge => model.with(constraint!(lhs >= rhs)),
                ConstraintOp::Eq => model.with(constraint!(lhs == rhs)),
            };
        }

        let result = model.solve();
        let elapsed = start.elapsed();

        match result {
            Ok(found) => {
                let values = problem.round_integers(columns.iter().map(|&c| found.value(c)).collect());
                if !problem.is_feasible(&values, options.feasibility_tolerance) {
                    warn!(?elapsed, "HiGHS returned an assignment that breaks the model");
                    return hint_or_nothing(problem, options, elapsed);
                }
                // HiGHS stops at the limit with its best assignment so far
                let status = if elapsed >= options.time_limit {
                    SolutionStatus::Feasible
                } else {
                    SolutionStatus::Optimal
                };
                let objective_value = problem.evaluate(&values);
                info!(%status, objective = objective_value, ?elapsed, "HiGHS finished");
                Solution::with_values(status, values, objective_value, 0, elapsed)
            }
            Err(error) => {
                let status = failure_status(&error, problem);
                debug!(%error, %status, ?elapsed, "HiGHS found no solution");
                match status {
                    SolutionStatus::NotSolved => {
                        warn!(%error, "HiGHS stopped early");
                        hint_or_nothing(problem, options, elapsed)
                    }
                    status => Solution::without_values(status, 0, elapsed),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::LinearExpr;
    use crate::model::Model;
    use crate::problem::Variable;

    #[test]
    fn test_integer_optimum() {
        // Relaxation: (3.75, 2.25) = 41.25, integer optimum: (5, 0) = 40
        let mut model = Model::new();
        let x = model.integer(0.0, 100.0, "x").unwrap();
        let y = model.integer(0.0, 100.0, "y").unwrap();
        model.add_constraint("sum", (x + y).leq(6.0)).unwrap();
        model.add_constraint("weighted", (x * 9.0 + y * 5.0).leq(45.0)).unwrap();
        model.maximize(x * 8.0 + y * 5.0).unwrap();

        let solution = model.solve_with(&HighsSolver::new(), &SolveOptions::default());
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.value(x), 5.0);
        assert_eq!(solution.value(y), 0.0);
        assert!((solution.objective_value - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_objective_constant_is_kept() {
        let mut model = Model::new();
        let amount = model.integer(0.0, 100.0, "amount").unwrap();
        let lots = model.integer(0.0, 11.0, "lots").unwrap();
        model.add_constraint("lots", amount.equals(lots * 10.0)).unwrap();
        model.add_constraint("demand", amount.geq(53.0)).unwrap();
        model.minimize(LinearExpr::from(amount) + 7.0).unwrap();

        let solution = model.solve_with(&HighsSolver::new(), &SolveOptions::default());
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.value(amount), 60.0);
        assert_eq!(solution.value(lots), 6.0);
        assert!((solution.objective_value - 67.0).abs() < 1e-6);
    }

    #[test]
    fn test_integer_infeasible() {
        let mut model = Model::new();
        let x = model.integer(0.0, 5.0, "x").unwrap();
        model.add_constraint("odd", (x * 2.0).equals(3.0)).unwrap();
        model.minimize(LinearExpr::from(x)).unwrap();

        let solution = model.solve_with(&HighsSolver::new(), &SolveOptions::default());
        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_zero_time_limit_still_reports_a_plan() {
        let mut model = Model::new();
        let x = model.integer(0.0, 10.0, "x").unwrap();
        model.add_constraint("floor", x.geq(2.0)).unwrap();
        model.minimize(LinearExpr::from(x)).unwrap();
        model.set_hint(x, 7.0).unwrap();

        let options = SolveOptions::default().with_time_limit(Duration::ZERO);
        let solution = model.solve_with(&HighsSolver::new(), &options);
        assert_eq!(solution.status, SolutionStatus::Feasible);
        assert!(solution.value(x) == 2.0 || solution.value(x) == 7.0);
    }

    #[test]
    fn test_unbounded_only_with_open_bounds() {
        let mut problem = LpProblem::new();
        problem.add_variable(Variable {
            name: "x".to_string(),
            lower: 0.0,
            upper: 10.0,
            integer: true,
        });
        assert_eq!(
            failure_status(&ResolutionError::Unbounded, &problem),
            SolutionStatus::Infeasible
        );

        problem.add_variable(Variable {
            name: "y".to_string(),
            lower: 0.0,
            upper: f64::INFINITY,
            integer: false,
        });
        assert_eq!(
            failure_status(&ResolutionError::Unbounded, &problem),
            SolutionStatus::Unbounded
        );
        assert_eq!(
            failure_status(&ResolutionError::Infeasible, &problem),
            SolutionStatus::Infeasible
        );
    }
}
