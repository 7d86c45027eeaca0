use thiserror::Error;

use crate::engine::{MilpSolver, SolveOptions};
use crate::expr::{LinearConstraint, LinearExpr, Var};
use crate::problem::{LpProblem, Variable};
use crate::solution::Solution;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid bounds for {name}: [{lower}, {upper}]")]
    InvalidBounds { name: String, lower: f64, upper: f64 },
    #[error("Non-finite coefficient in {0}")]
    NonFiniteCoefficient(String),
    #[error("Unknown variable index {0}")]
    UnknownVariable(usize),
}

/// Builder for a mixed-integer program
///
/// Variables are declared with bounds, constraints are added as
/// [`LinearConstraint`]s and the finished [`LpProblem`] is handed to any
/// [`MilpSolver`].
#[derive(Debug, Clone, Default)]
pub struct Model {
    problem: LpProblem,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an integer variable in `[lower, upper]`
    pub fn integer(&mut self, lower: f64, upper: f64, name: impl Into<String>) -> Result<Var, ModelError> {
        self.declare(lower, upper, true, name.into())
    }

    /// Declare a 0/1 variable
    pub fn boolean(&mut self, name: impl Into<String>) -> Result<Var, ModelError> {
        self.declare(0.0, 1.0, true, name.into())
    }

    /// Declare a continuous variable in `[lower, upper]` (upper may be infinite)
    pub fn continuous(&mut self, lower: f64, upper: f64, name: impl Into<String>) -> Result<Var, ModelError> {
        self.declare(lower, upper, false, name.into())
    }

    fn declare(&mut self, lower: f64, upper: f64, integer: bool, name: String) -> Result<Var, ModelError> {
        if !lower.is_finite() || upper.is_nan() || lower > upper {
            return Err(ModelError::InvalidBounds { name, lower, upper });
        }
        let index = self.problem.add_variable(Variable {
            name,
            lower,
            upper,
            integer,
        });
        Ok(Var::from_index(index))
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, constraint: LinearConstraint) -> Result<(), ModelError> {
        let name = name.into();
        let rhs = constraint.rhs();
        if !rhs.is_finite() {
            return Err(ModelError::NonFiniteCoefficient(name));
        }
        let mut terms = Vec::new();
        for (var, coef) in constraint.terms() {
            self.check_var(var)?;
            if !coef.is_finite() {
                return Err(ModelError::NonFiniteCoefficient(name));
            }
            terms.push((var.index(), coef));
        }
        self.problem.add_constraint(name, terms, constraint.op(), rhs);
        Ok(())
    }

    pub fn minimize(&mut self, objective: LinearExpr) -> Result<(), ModelError> {
        self.set_objective(objective, true)
    }

    pub fn maximize(&mut self, objective: LinearExpr) -> Result<(), ModelError> {
        self.set_objective(objective, false)
    }

    fn set_objective(&mut self, objective: LinearExpr, minimize: bool) -> Result<(), ModelError> {
        let mut coefficients = vec![0.0; self.problem.num_variables()];
        for (var, coef) in objective.terms() {
            self.check_var(var)?;
            if !coef.is_finite() {
                return Err(ModelError::NonFiniteCoefficient("objective".to_string()));
            }
            coefficients[var.index()] = coef;
        }
        if !objective.constant().is_finite() {
            return Err(ModelError::NonFiniteCoefficient("objective".to_string()));
        }
        self.problem.set_objective(coefficients, objective.constant(), minimize);
        Ok(())
    }

    /// Suggest a starting value for `var`; a complete feasible hint seeds the search
    pub fn set_hint(&mut self, var: Var, value: f64) -> Result<(), ModelError> {
        self.check_var(var)?;
        self.problem.hint.insert(var.index(), value);
        Ok(())
    }

    pub fn variable(&self, var: Var) -> Option<&Variable> {
        self.problem.variables.get(var.index())
    }

    pub fn problem(&self) -> &LpProblem {
        &self.problem
    }

    pub fn num_variables(&self) -> usize {
        self.problem.num_variables()
    }

    pub fn num_constraints(&self) -> usize {
        self.problem.num_constraints()
    }

    pub fn solve_with(&self, solver: &dyn MilpSolver, options: &SolveOptions) -> Solution {
        solver.solve(&self.problem, options)
    }

    fn check_var(&self, var: Var) -> Result<(), ModelError> {
        if var.index() < self.problem.num_variables() {
            Ok(())
        } else {
            Err(ModelError::UnknownVariable(var.index()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ConstraintOp;

    #[test]
    fn test_declare_and_compile_constraint() {
        let mut model = Model::new();
        let x = model.integer(0.0, 10.0, "x").unwrap();
        let b = model.boolean("b").unwrap();

        model.add_constraint("link", x.leq(b * 10.0)).unwrap();

        let problem = model.problem();
        assert_eq!(problem.num_variables(), 2);
        assert_eq!(problem.num_integer_variables(), 2);
        let c = &problem.constraints[0];
        assert_eq!(c.name, "link");
        assert_eq!(c.op, ConstraintOp::Le);
        assert_eq!(c.rhs, 0.0);
        assert_eq!(c.terms, vec![(0, 1.0), (1, -10.0)]);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let mut model = Model::new();
        let err = model.integer(5.0, 2.0, "bad").unwrap_err();
        assert!(matches!(err, ModelError::InvalidBounds { .. }));
        assert!(model.continuous(f64::NEG_INFINITY, 0.0, "free").is_err());
        assert_eq!(model.num_variables(), 0);
    }

    #[test]
    fn test_division_by_zero_rejected() {
        let mut model = Model::new();
        let x = model.integer(0.0, 10.0, "x").unwrap();
        let err = model.add_constraint("hours", (x / 0.0).leq(8.0)).unwrap_err();
        assert_eq!(err, ModelError::NonFiniteCoefficient("hours".to_string()));
        assert_eq!(model.num_constraints(), 0);
    }

    #[test]
    fn test_foreign_variable_rejected() {
        let mut other = Model::new();
        other.integer(0.0, 1.0, "a").unwrap();
        let foreign = other.integer(0.0, 1.0, "b").unwrap();

        let mut model = Model::new();
        model.integer(0.0, 1.0, "x").unwrap();
        assert_eq!(model.set_hint(foreign, 1.0), Err(ModelError::UnknownVariable(1)));
    }

    #[test]
    fn test_objective_is_dense() {
        let mut model = Model::new();
        let x = model.integer(0.0, 10.0, "x").unwrap();
        let _y = model.integer(0.0, 10.0, "y").unwrap();
        model.minimize(x * 3.0 + 1.0).unwrap();

        let objective = &model.problem().objective;
        assert_eq!(objective.coefficients, vec![3.0, 0.0]);
        assert_eq!(objective.constant, 1.0);
        assert!(objective.minimize);
    }
}
