mod branch;
mod engine;
mod expr;
#[cfg(feature = "highs")]
mod highs;
mod model;
mod problem;
mod simplex;
mod solution;

pub use branch::BranchAndBound;
pub use engine::{MilpSolver, SolveOptions};
pub use expr::{LinearConstraint, LinearExpr, Var};
#[cfg(feature = "highs")]
pub use highs::HighsSolver;
pub use model::{Model, ModelError};
pub use problem::{Constraint, ConstraintOp, LpProblem, Objective, Variable};
pub use simplex::{LpOutcome, Simplex};
pub use solution::{ConstraintViolation, Solution, SolutionStatus};
