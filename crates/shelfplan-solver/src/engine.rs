use std::time::Duration;

use crate::problem::LpProblem;
use crate::solution::Solution;

/// Limits and tolerances for a single solve
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Wall-clock budget for the whole search
    pub time_limit: Duration,
    /// Distance from the nearest integer still accepted as integral
    pub integrality_tolerance: f64,
    /// Slack allowed on bounds and constraints
    pub feasibility_tolerance: f64,
    /// Nodes are pruned unless they can improve the incumbent by more than this
    pub optimality_gap: f64,
    /// Upper limit on branch-and-bound nodes
    pub max_nodes: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(120),
            integrality_tolerance: 1e-6,
            feasibility_tolerance: 1e-6,
            optimality_gap: 1e-6,
            max_nodes: 1_000_000,
        }
    }
}

impl SolveOptions {
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max;
        self
    }
}

/// A mixed-integer engine: one blocking solve per call
pub trait MilpSolver {
    fn solve(&self, problem: &LpProblem, options: &SolveOptions) -> Solution;
}
