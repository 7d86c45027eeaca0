use std::collections::BTreeMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use crate::problem::ConstraintOp;

/// Handle of a variable declared on a [`Model`](crate::Model)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(usize);

impl Var {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Column index of the variable in the compiled problem
    pub fn index(self) -> usize {
        self.0
    }

    pub fn leq(self, rhs: impl Into<LinearExpr>) -> LinearConstraint {
        LinearExpr::from(self).leq(rhs)
    }

    pub fn geq(self, rhs: impl Into<LinearExpr>) -> LinearConstraint {
        LinearExpr::from(self).geq(rhs)
    }

    pub fn equals(self, rhs: impl Into<LinearExpr>) -> LinearConstraint {
        LinearExpr::from(self).equals(rhs)
    }
}

/// Linear combination of variables plus a constant
#[derive(Debug, Clone, Default)]
pub struct LinearExpr {
    terms: BTreeMap<Var, f64>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Iterate the (variable, coefficient) pairs, zero coefficients included
    pub fn terms(&self) -> impl Iterator<Item = (Var, f64)> + '_ {
        self.terms.iter().map(|(&v, &c)| (v, c))
    }

    pub fn coefficient(&self, var: Var) -> f64 {
        self.terms.get(&var).copied().unwrap_or(0.0)
    }

    pub fn add_term(&mut self, var: Var, coefficient: f64) {
        *self.terms.entry(var).or_insert(0.0) += coefficient;
    }

    /// Evaluate for an assignment indexed by variable
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values.get(v.index()).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }

    pub fn leq(self, rhs: impl Into<LinearExpr>) -> LinearConstraint {
        LinearConstraint::new(self - rhs.into(), ConstraintOp::Le)
    }

    pub fn geq(self, rhs: impl Into<LinearExpr>) -> LinearConstraint {
        LinearConstraint::new(self - rhs.into(), ConstraintOp::Ge)
    }

    pub fn equals(self, rhs: impl Into<LinearExpr>) -> LinearConstraint {
        LinearConstraint::new(self - rhs.into(), ConstraintOp::Eq)
    }

    fn scale(mut self, factor: f64) -> Self {
        for coef in self.terms.values_mut() {
            *coef *= factor;
        }
        self.constant *= factor;
        self
    }
}

/// `expr op 0`, with every constant folded into `expr`
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    expr: LinearExpr,
    op: ConstraintOp,
}

impl LinearConstraint {
    fn new(expr: LinearExpr, op: ConstraintOp) -> Self {
        Self { expr, op }
    }

    pub fn op(&self) -> ConstraintOp {
        self.op
    }

    /// Right-hand side once all constants are moved across
    pub fn rhs(&self) -> f64 {
        -self.expr.constant
    }

    /// Non-zero variable coefficients of the left-hand side
    pub fn terms(&self) -> impl Iterator<Item = (Var, f64)> + '_ {
        self.expr.terms().filter(|&(_, c)| c != 0.0)
    }
}

impl From<Var> for LinearExpr {
    fn from(var: Var) -> Self {
        let mut expr = LinearExpr::new();
        expr.add_term(var, 1.0);
        expr
    }
}

impl From<f64> for LinearExpr {
    fn from(constant: f64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant,
        }
    }
}

impl<T: Into<LinearExpr>> AddAssign<T> for LinearExpr {
    fn add_assign(&mut self, rhs: T) {
        let rhs = rhs.into();
        for (var, coef) in rhs.terms {
            self.add_term(var, coef);
        }
        self.constant += rhs.constant;
    }
}

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: T) -> LinearExpr {
        self += rhs;
        self
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: T) -> LinearExpr {
        self += -rhs.into();
        self
    }
}

impl<T: Into<LinearExpr>> Add<T> for Var {
    type Output = LinearExpr;

    fn add(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) + rhs
    }
}

impl<T: Into<LinearExpr>> Sub<T> for Var {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self.scale(-1.0)
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> LinearExpr {
        self.scale(rhs)
    }
}

impl Mul<LinearExpr> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: LinearExpr) -> LinearExpr {
        rhs.scale(self)
    }
}

impl Mul<f64> for Var {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> LinearExpr {
        LinearExpr::from(self).scale(rhs)
    }
}

impl Mul<Var> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: Var) -> LinearExpr {
        LinearExpr::from(rhs).scale(self)
    }
}

// Division by zero yields non-finite coefficients, rejected by `Model::add_constraint`.
impl Div<f64> for LinearExpr {
    type Output = LinearExpr;

    fn div(self, rhs: f64) -> LinearExpr {
        self.scale(1.0 / rhs)
    }
}

impl Div<f64> for Var {
    type Output = LinearExpr;

    fn div(self, rhs: f64) -> LinearExpr {
        LinearExpr::from(self).scale(1.0 / rhs)
    }
}

impl Sum<LinearExpr> for LinearExpr {
    fn sum<I: Iterator<Item = LinearExpr>>(iter: I) -> Self {
        iter.fold(LinearExpr::new(), |acc, e| acc + e)
    }
}

impl Sum<Var> for LinearExpr {
    fn sum<I: Iterator<Item = Var>>(iter: I) -> Self {
        iter.fold(LinearExpr::new(), |acc, v| acc + v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_merge_and_constants_fold() {
        let x = Var::from_index(0);
        let y = Var::from_index(1);

        let expr = x * 2.0 + y - x + 3.0;
        assert_eq!(expr.coefficient(x), 1.0);
        assert_eq!(expr.coefficient(y), 1.0);
        assert_eq!(expr.constant(), 3.0);

        let c = expr.leq(10.0);
        assert_eq!(c.op(), ConstraintOp::Le);
        assert_eq!(c.rhs(), 7.0);
    }

    #[test]
    fn test_division_by_rate() {
        let x = Var::from_index(0);
        let y = Var::from_index(1);

        let hours: LinearExpr = [x / 8.0, y / 4.0].into_iter().sum();
        assert_eq!(hours.coefficient(x), 0.125);
        assert_eq!(hours.coefficient(y), 0.25);
        assert_eq!(hours.evaluate(&[16.0, 4.0]), 3.0);
    }

    #[test]
    fn test_cancelled_terms_are_dropped_from_constraint() {
        let x = Var::from_index(0);
        let y = Var::from_index(1);

        let c = (x + y).equals(LinearExpr::from(x) + 5.0);
        let terms: Vec<_> = c.terms().collect();
        assert_eq!(terms, vec![(y, 1.0)]);
        assert_eq!(c.rhs(), 5.0);
    }

    #[test]
    fn test_sum_of_vars_and_negation() {
        let vars: Vec<Var> = (0..3).map(Var::from_index).collect();
        let total: LinearExpr = vars.iter().copied().sum();
        let negated = -total;
        assert!(vars.iter().all(|&v| negated.coefficient(v) == -1.0));
    }
}
