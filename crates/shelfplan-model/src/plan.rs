use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use shelfplan_solver::{MilpSolver, Solution, SolutionStatus, SolveOptions, Var};
use tracing::{info, warn};

use crate::builder::{LineKey, PlanningModel, PlantKey};
use crate::entities::{PlantId, Product};
use crate::error::PlanError;

/// Totals over the whole horizon and the split of the objective by term
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanSummary {
    pub total_production: i64,
    pub total_sales: i64,
    pub total_shortage: i64,
    pub total_waste: i64,
    pub shortage_cost: f64,
    pub production_cost: f64,
    pub low_stock_cost: f64,
}

impl PlanSummary {
    pub fn total_cost(&self) -> f64 {
        self.shortage_cost + self.production_cost + self.low_stock_cost
    }
}

/// Plan read back from a successful solve, at plant/line and day granularity
#[derive(Debug, Clone)]
pub struct SolvedPlan {
    status: SolutionStatus,
    elapsed: Duration,
    objective_value: f64,
    production: BTreeMap<LineKey, i64>,
    lots: BTreeMap<LineKey, i64>,
    stock: BTreeMap<PlantKey, i64>,
    sales: BTreeMap<PlantKey, i64>,
    shortage: BTreeMap<PlantKey, i64>,
    short_on_stock: BTreeMap<PlantKey, i64>,
    waste: BTreeMap<(Product, PlantId), i64>,
    summary: PlanSummary,
}

impl SolvedPlan {
    pub fn status(&self) -> SolutionStatus {
        self.status
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }

    pub fn production_amounts(&self) -> &BTreeMap<LineKey, i64> {
        &self.production
    }

    pub fn lots(&self) -> &BTreeMap<LineKey, i64> {
        &self.lots
    }

    /// Units on hand at end of day, all ages together
    pub fn stock(&self) -> &BTreeMap<PlantKey, i64> {
        &self.stock
    }

    /// Units sold, all ages together
    pub fn sales(&self) -> &BTreeMap<PlantKey, i64> {
        &self.sales
    }

    pub fn shortage(&self) -> &BTreeMap<PlantKey, i64> {
        &self.shortage
    }

    pub fn short_on_stock(&self) -> &BTreeMap<PlantKey, i64> {
        &self.short_on_stock
    }

    /// Units produced but never sold nor left on hand at the end of the horizon
    pub fn waste(&self) -> &BTreeMap<(Product, PlantId), i64> {
        &self.waste
    }

    pub fn summary(&self) -> &PlanSummary {
        &self.summary
    }
}

fn read(solution: &Solution, var: Var) -> i64 {
    solution.value(var).round() as i64
}

fn read_all<K: Ord + Copy>(solution: &Solution, vars: &BTreeMap<K, Var>) -> BTreeMap<K, i64> {
    vars.iter().map(|(&key, &var)| (key, read(solution, var))).collect()
}

impl PlanningModel<'_> {
    /// Solve once and read the plan back
    ///
    /// Only OPTIMAL and FEASIBLE produce a plan; there is no retry.
    pub fn solve(&self, solver: &dyn MilpSolver, options: &SolveOptions) -> Result<SolvedPlan, PlanError> {
        info!(time_limit = ?options.time_limit, ">> Solving optimization model..");
        let solution = self.model().solve_with(solver, options);
        let elapsed = solution.elapsed;

        match solution.status {
            SolutionStatus::Optimal => {
                info!("Optimal solution found in {:.1} seconds", elapsed.as_secs_f64());
            }
            SolutionStatus::Feasible => {
                info!(
                    "Time limit reached, feasible solution found in {:.1} seconds",
                    elapsed.as_secs_f64()
                );
            }
            SolutionStatus::Infeasible => {
                warn!("No feasible solution found after {:.1} seconds", elapsed.as_secs_f64());
                return Err(PlanError::Infeasible { elapsed });
            }
            status => {
                warn!(%status, "Solver stopped after {:.1} seconds", elapsed.as_secs_f64());
                return Err(PlanError::NoSolution { status, elapsed });
            }
        }

        Ok(self.extract(&solution))
    }

    fn extract(&self, solution: &Solution) -> SolvedPlan {
        let scenario = self.scenario();
        let vars = self.variables();

        let production = read_all(solution, &vars.production_amount);
        let lots = read_all(solution, &vars.number_of_lots);
        let shortage = read_all(solution, &vars.shortage);
        let short_on_stock = read_all(solution, &vars.short_on_stock);

        let mut stock: BTreeMap<PlantKey, i64> = BTreeMap::new();
        for (&(product, plant, day, _), &var) in &vars.stock_by_age {
            *stock.entry((product, plant, day)).or_default() += read(solution, var);
        }
        let mut sales: BTreeMap<PlantKey, i64> = BTreeMap::new();
        for (&(product, plant, day, _), &var) in &vars.sales_by_age {
            *sales.entry((product, plant, day)).or_default() += read(solution, var);
        }

        let mut waste: BTreeMap<(Product, PlantId), i64> = BTreeMap::new();
        for (&(product, line, _), &units) in &production {
            *waste.entry((product, line.plant())).or_default() += units;
        }
        for (&(product, plant, _), &units) in &sales {
            *waste.entry((product, plant)).or_default() -= units;
        }
        if let Some(last) = scenario.horizon().last() {
            for (&(product, plant, day), &units) in &stock {
                if day == last {
                    *waste.entry((product, plant)).or_default() -= units;
                }
            }
        }

        let summary = PlanSummary {
            total_production: production.values().sum(),
            total_sales: sales.values().sum(),
            total_shortage: shortage.values().sum(),
            total_waste: waste.values().sum(),
            shortage_cost: shortage
                .iter()
                .map(|(&(product, _, _), &units)| units as f64 * scenario.shortage_penalty(product))
                .sum(),
            production_cost: production
                .iter()
                .map(|(&(product, line, _), &units)| units as f64 * scenario.production_cost(product, line))
                .sum(),
            low_stock_cost: short_on_stock
                .iter()
                .map(|(&(product, _, _), &units)| units as f64 * scenario.low_stock_penalty(product))
                .sum(),
        };

        SolvedPlan {
            status: solution.status,
            elapsed: solution.elapsed,
            objective_value: solution.objective_value,
            production,
            lots,
            stock,
            sales,
            shortage,
            short_on_stock,
            waste,
            summary,
        }
    }
}
