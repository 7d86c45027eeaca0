use std::fmt;
use std::time::Duration;

use crate::expr::Var;

/// The result of solving a (mixed-integer) linear program
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Value of each variable (empty when there is no solution)
    pub values: Vec<f64>,
    /// Objective value of `values`
    pub objective_value: f64,
    /// Branch-and-bound nodes whose relaxation was solved
    pub nodes_explored: usize,
    /// Wall-clock time spent in the solver
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolutionStatus {
    /// Proven optimal solution
    Optimal,
    /// Usable solution, optimality not proven before the search stopped
    Feasible,
    /// No assignment satisfies all constraints
    Infeasible,
    /// The objective can be improved without limit
    Unbounded,
    /// The search stopped before any solution was found
    NotSolved,
}

impl SolutionStatus {
    /// Whether variable values can be read back
    pub fn has_solution(self) -> bool {
        matches!(self, SolutionStatus::Optimal | SolutionStatus::Feasible)
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SolutionStatus::Optimal => "OPTIMAL",
            SolutionStatus::Feasible => "FEASIBLE",
            SolutionStatus::Infeasible => "INFEASIBLE",
            SolutionStatus::Unbounded => "UNBOUNDED",
            SolutionStatus::NotSolved => "NOT SOLVED",
        };
        f.write_str(label)
    }
}

/// Information about a violated constraint
#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    /// Constraint name
    pub constraint: String,
    /// Required value (from constraint RHS)
    pub required: f64,
    /// Actual value achieved
    pub actual: f64,
    /// How much the constraint is violated by
    pub violation_amount: f64,
    /// Human-readable description of what's wrong
    pub description: String,
}

impl Solution {
    pub fn with_values(
        status: SolutionStatus,
        values: Vec<f64>,
        objective_value: f64,
        nodes_explored: usize,
        elapsed: Duration,
    ) -> Self {
        Self {
            status,
            values,
            objective_value,
            nodes_explored,
            elapsed,
        }
    }

    /// A solution without values (infeasible, unbounded, not solved)
    pub fn without_values(status: SolutionStatus, nodes_explored: usize, elapsed: Duration) -> Self {
        let objective_value = match status {
            SolutionStatus::Unbounded => f64::NEG_INFINITY,
            _ => f64::INFINITY,
        };
        Self {
            status,
            values: Vec::new(),
            objective_value,
            nodes_explored,
            elapsed,
        }
    }

    /// Value assigned to `var`, or 0.0 when there is no solution
    pub fn value(&self, var: Var) -> f64 {
        self.values.get(var.index()).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(SolutionStatus::Optimal.to_string(), "OPTIMAL");
        assert_eq!(SolutionStatus::NotSolved.to_string(), "NOT SOLVED");
        assert!(SolutionStatus::Feasible.has_solution());
        assert!(!SolutionStatus::Infeasible.has_solution());
    }

    #[test]
    fn test_value_without_solution_is_zero() {
        let solution = Solution::without_values(SolutionStatus::Infeasible, 3, Duration::ZERO);
        assert_eq!(solution.value(Var::from_index(0)), 0.0);
        assert!(solution.objective_value.is_infinite());
    }
}
