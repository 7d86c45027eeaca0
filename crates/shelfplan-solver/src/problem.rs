use std::collections::HashMap;

use tracing::debug;

use crate::solution::ConstraintViolation;

/// A mixed-integer linear program in row form
#[derive(Debug, Clone, Default)]
pub struct LpProblem {
    /// Declared variables, indexed by position
    pub variables: Vec<Variable>,
    /// Objective function
    pub objective: Objective,
    /// Constraints (sparse rows)
    pub constraints: Vec<Constraint>,
    /// Optional warm-start values keyed by variable index
    pub hint: HashMap<usize, f64>,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    /// Whether the variable must take an integral value
    pub integer: bool,
}

#[derive(Debug, Clone)]
pub struct Objective {
    /// Coefficients for each variable (dense, one per variable)
    pub coefficients: Vec<f64>,
    /// Constant offset added to the objective value
    pub constant: f64,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

impl Default for Objective {
    fn default() -> Self {
        Self {
            coefficients: Vec::new(),
            constant: 0.0,
            minimize: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Non-zero coefficients as (variable index, coefficient)
    pub terms: Vec<(usize, f64)>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl Constraint {
    /// Evaluate the left-hand side for a full assignment
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(j, coef)| coef * values.get(j).copied().unwrap_or(0.0))
            .sum()
    }
}

impl LpProblem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a variable and return its index
    pub fn add_variable(&mut self, variable: Variable) -> usize {
        self.variables.push(variable);
        self.objective.coefficients.push(0.0);
        self.variables.len() - 1
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, constant: f64, minimize: bool) {
        self.objective = Objective {
            coefficients,
            constant,
            minimize,
        };
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(usize, f64)>,
        op: ConstraintOp,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            terms,
            op,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn num_integer_variables(&self) -> usize {
        self.variables.iter().filter(|v| v.integer).count()
    }

    /// Objective value of a full assignment, including the constant offset
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.objective
            .coefficients
            .iter()
            .zip(values)
            .map(|(c, v)| c * v)
            .sum::<f64>()
            + self.objective.constant
    }

    /// Check bounds, integrality and every constraint of an assignment
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        if values.len() != self.variables.len() {
            return false;
        }
        let within_bounds = self.variables.iter().zip(values).all(|(var, &v)| {
            v >= var.lower - tolerance
                && v <= var.upper + tolerance
                && (!var.integer || (v - v.round()).abs() <= tolerance)
        });
        within_bounds && self.violations(values, tolerance).is_empty()
    }

    /// Snap integer variables to the nearest integer
    pub fn round_integers(&self, mut values: Vec<f64>) -> Vec<f64> {
        for (value, var) in values.iter_mut().zip(&self.variables) {
            if var.integer {
                *value = value.round();
            }
        }
        values
    }

    /// The hint completed with lower bounds, if it satisfies the whole problem
    pub fn feasible_hint(&self, tolerance: f64) -> Option<Vec<f64>> {
        if self.hint.is_empty() {
            return None;
        }
        let values: Vec<f64> = self
            .variables
            .iter()
            .enumerate()
            .map(|(j, var)| self.hint.get(&j).copied().unwrap_or(var.lower))
            .collect();

        if self.is_feasible(&values, tolerance) {
            Some(values)
        } else {
            let reason = self
                .violations(&values, tolerance)
                .into_iter()
                .next()
                .map(|v| v.description)
                .unwrap_or_else(|| "bounds or integrality".to_string());
            debug!(%reason, "ignoring infeasible hint");
            None
        }
    }

    /// Find which constraints are violated by a given assignment, worst first
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        for c in &self.constraints {
            let lhs = c.lhs(values);

            let violation = match c.op {
                ConstraintOp::Le if lhs > c.rhs + tolerance => {
                    let amt = lhs - c.rhs;
                    Some((amt, format!("{} exceeds maximum of {:.2} by {:.2}", c.name, c.rhs, amt)))
                }
                ConstraintOp::Ge if lhs < c.rhs - tolerance => {
                    let amt = c.rhs - lhs;
                    Some((amt, format!("{} is below minimum of {:.2} by {:.2}", c.name, c.rhs, amt)))
                }
                ConstraintOp::Eq if (lhs - c.rhs).abs() > tolerance => {
                    let amt = (lhs - c.rhs).abs();
                    Some((amt, format!("{} requires exactly {:.2} but got {:.2}", c.name, c.rhs, lhs)))
                }
                _ => None,
            };

            if let Some((violation_amount, description)) = violation {
                violations.push(ConstraintViolation {
                    constraint: c.name.clone(),
                    required: c.rhs,
                    actual: lhs,
                    violation_amount,
                    description,
                });
            }
        }

        violations.sort_by(|a, b| {
            b.violation_amount
                .partial_cmp(&a.violation_amount)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        violations
    }
}
