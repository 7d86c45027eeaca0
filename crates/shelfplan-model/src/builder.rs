//! Formulation of the production plan as a mixed-integer program.
//!
//! Per (product, line, day) the model decides a production amount, whether
//! the line produces at all and the number of lots. Per (product, plant,
//! day) stock and sales are split by age in days, `0..min(day, shelf_life)`.
//! Stock of age `a` on day `d` is what was `a - 1` days old on day `d - 1`
//! minus what was sold from it, so anything older than the shelf life has
//! no variable left to carry it and is discarded.

use std::collections::BTreeMap;
use std::fmt::Display;

use shelfplan_solver::{LinearExpr, Model, Var};
use tracing::{debug, info};

use crate::entities::{Day, PlantId, Product, ProductionLine};
use crate::error::PlanError;
use crate::scenario::Scenario;

/// (product, line, day)
pub type LineKey = (Product, ProductionLine, Day);
/// (product, plant, day)
pub type PlantKey = (Product, PlantId, Day);
/// (product, plant, day, age in days)
pub type AgeKey = (Product, PlantId, Day, u32);

/// Decision variables of a planning model, keyed by domain entities
#[derive(Debug, Clone, Default)]
pub struct PlanVariables {
    pub production_amount: BTreeMap<LineKey, Var>,
    pub is_produced: BTreeMap<LineKey, Var>,
    pub number_of_lots: BTreeMap<LineKey, Var>,
    pub stock_by_age: BTreeMap<AgeKey, Var>,
    pub sales_by_age: BTreeMap<AgeKey, Var>,
    pub shortage: BTreeMap<PlantKey, Var>,
    pub short_on_stock: BTreeMap<PlantKey, Var>,
}

fn get<K: Ord + std::fmt::Debug>(map: &BTreeMap<K, Var>, key: &K) -> Result<Var, PlanError> {
    map.get(key)
        .copied()
        .ok_or_else(|| PlanError::MissingVariable(format!("{:?}", key)))
}

fn label(parts: &[&dyn Display]) -> String {
    parts.iter().map(|p| p.to_string()).collect::<Vec<_>>().join("_")
}

/// A production planning model built from one scenario
pub struct PlanningModel<'a> {
    scenario: &'a Scenario,
    model: Model,
    vars: PlanVariables,
}

impl<'a> PlanningModel<'a> {
    pub fn build(scenario: &'a Scenario) -> Result<Self, PlanError> {
        info!(">> Creating optimization model..");
        let mut planning = Self {
            scenario,
            model: Model::new(),
            vars: PlanVariables::default(),
        };
        planning.create_variables()?;
        planning.add_constraints()?;
        planning.set_objective()?;
        for (var, value) in planning.idle_plan_hint()? {
            planning.model.set_hint(var, value)?;
        }
        info!(
            variables = planning.model.num_variables(),
            constraints = planning.model.num_constraints(),
            "Optimization model created"
        );
        Ok(planning)
    }

    pub fn scenario(&self) -> &'a Scenario {
        self.scenario
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn variables(&self) -> &PlanVariables {
        &self.vars
    }

    fn create_variables(&mut self) -> Result<(), PlanError> {
        info!("Creating variables..");
        let scenario = self.scenario;
        let model = &mut self.model;
        let vars = &mut self.vars;

        for &product in scenario.products() {
            for line in scenario.lines() {
                let bound = scenario.total_demand(product, line.plant());
                let max_lots = bound / scenario.lot_size(product, line) + 1;
                for day in scenario.horizon().days() {
                    let key = (product, line, day);
                    let suffix = label(&[&product, &line, &day]);
                    vars.production_amount.insert(
                        key,
                        model.integer(0.0, bound as f64, format!("production_amount_{}", suffix))?,
                    );
                    vars.is_produced
                        .insert(key, model.boolean(format!("is_produced_{}", suffix))?);
                    vars.number_of_lots.insert(
                        key,
                        model.integer(0.0, max_lots as f64, format!("number_of_lots_{}", suffix))?,
                    );
                }
            }

            for plant in scenario.plants() {
                let id = plant.id();
                let bound = scenario.total_demand(product, id) as f64;
                for day in scenario.horizon().days() {
                    for age in scenario.age_buckets(product, day) {
                        let key = (product, id, day, age);
                        let suffix = label(&[&product, &id, &day, &age]);
                        vars.stock_by_age
                            .insert(key, model.integer(0.0, bound, format!("stock_{}", suffix))?);
                        vars.sales_by_age
                            .insert(key, model.integer(0.0, bound, format!("sales_{}", suffix))?);
                    }

                    let suffix = label(&[&product, &id, &day]);
                    vars.shortage
                        .insert((product, id, day), model.integer(0.0, bound, format!("shortage_{}", suffix))?);
                    vars.short_on_stock.insert(
                        (product, id, day),
                        model.integer(0.0, bound, format!("short_on_stock_{}", suffix))?,
                    );
                }
            }
        }

        debug!(
            production = vars.production_amount.len(),
            age_buckets = vars.stock_by_age.len(),
            "variables created"
        );
        Ok(())
    }

    fn add_constraints(&mut self) -> Result<(), PlanError> {
        info!("Adding constraints..");
        self.add_production_constraints()?;
        self.add_capacity_constraints()?;
        self.add_stock_constraints()?;
        Ok(())
    }

    /// Production is zero or at least the MOQ, and always a whole number of lots
    fn add_production_constraints(&mut self) -> Result<(), PlanError> {
        let scenario = self.scenario;
        for (&(product, line, day), &amount) in &self.vars.production_amount {
            let key = (product, line, day);
            let suffix = label(&[&product, &line, &day]);
            let is_produced = get(&self.vars.is_produced, &key)?;
            let lots = get(&self.vars.number_of_lots, &key)?;

            let big_m = scenario.total_demand(product, line.plant()) as f64;
            // With MOQ 0 a floor of one unit keeps `is_produced` tied to actual production
            let floor = scenario.moq(product, line).max(1) as f64;
            let lot_size = scenario.lot_size(product, line) as f64;

            self.model
                .add_constraint(format!("max_production_{}", suffix), amount.leq(is_produced * big_m))?;
            self.model
                .add_constraint(format!("moq_{}", suffix), amount.geq(is_produced * floor))?;
            self.model
                .add_constraint(format!("lot_size_{}", suffix), amount.equals(lots * lot_size))?;
        }
        Ok(())
    }

    /// Hours used by all products on a line must fit the line's daily capacity
    fn add_capacity_constraints(&mut self) -> Result<(), PlanError> {
        let scenario = self.scenario;
        for line in scenario.lines() {
            for day in scenario.horizon().days() {
                let mut hours = LinearExpr::new();
                for &product in scenario.products() {
                    let amount = get(&self.vars.production_amount, &(product, line, day))?;
                    hours += amount / scenario.production_rate(product, line);
                }
                self.model.add_constraint(
                    format!("capacity_{}", label(&[&line, &day])),
                    hours.leq(scenario.line_capacity(line, day)),
                )?;
            }
        }
        Ok(())
    }

    fn add_stock_constraints(&mut self) -> Result<(), PlanError> {
        let scenario = self.scenario;
        for &product in scenario.products() {
            for plant in scenario.plants() {
                let id = plant.id();
                for day in scenario.horizon().days() {
                    let suffix = label(&[&product, &id, &day]);
                    let ages = scenario.age_buckets(product, day);

                    // Demand is either sold from some age bucket or lost
                    let mut sales = LinearExpr::new();
                    let mut stock = LinearExpr::new();
                    for age in ages.clone() {
                        sales += get(&self.vars.sales_by_age, &(product, id, day, age))?;
                        stock += get(&self.vars.stock_by_age, &(product, id, day, age))?;
                    }
                    let shortage = get(&self.vars.shortage, &(product, id, day))?;
                    let demand = scenario.demand(product, id, day) as f64;
                    self.model
                        .add_constraint(format!("demand_{}", suffix), (sales + shortage).equals(demand))?;

                    for age in ages {
                        let key = (product, id, day, age);
                        let inflow = if age == 0 {
                            let mut produced = LinearExpr::new();
                            for &line in plant.lines() {
                                produced += get(&self.vars.production_amount, &(product, line, day))?;
                            }
                            produced
                        } else {
                            let previous = day
                                .previous()
                                .ok_or_else(|| PlanError::MissingVariable(format!("{:?}", key)))?;
                            LinearExpr::from(get(&self.vars.stock_by_age, &(product, id, previous, age - 1))?)
                        };
                        let stock_var = get(&self.vars.stock_by_age, &key)?;
                        let sold = get(&self.vars.sales_by_age, &key)?;
                        self.model.add_constraint(
                            format!("stock_{}", label(&[&product, &id, &day, &age])),
                            stock_var.equals(inflow - sold),
                        )?;
                    }

                    let short_on_stock = get(&self.vars.short_on_stock, &(product, id, day))?;
                    self.model.add_constraint(
                        format!("min_stock_{}", suffix),
                        (stock + short_on_stock).geq(scenario.min_stock(product, id) as f64),
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Shortage penalty + production cost + low-stock penalty
    fn set_objective(&mut self) -> Result<(), PlanError> {
        let scenario = self.scenario;
        let mut objective = LinearExpr::new();

        for (&(product, _, _), &shortage) in &self.vars.shortage {
            objective += shortage * scenario.shortage_penalty(product);
        }
        for (&(product, line, _), &amount) in &self.vars.production_amount {
            objective += amount * scenario.production_cost(product, line);
        }
        for (&(product, _, _), &short) in &self.vars.short_on_stock {
            objective += short * scenario.low_stock_penalty(product);
        }

        self.model.minimize(objective)?;
        Ok(())
    }

    /// The plan that produces nothing: all demand short, all stock targets missed
    ///
    /// Only non-zero values are listed. It satisfies every constraint whenever
    /// the minimum stock fits within the total-demand bound.
    pub fn idle_plan_hint(&self) -> Result<Vec<(Var, f64)>, PlanError> {
        let scenario = self.scenario;
        let mut values = Vec::new();
        for (&(product, plant, day), &shortage) in &self.vars.shortage {
            let demand = scenario.demand(product, plant, day);
            if demand > 0 {
                values.push((shortage, demand as f64));
            }
            let min_stock = scenario.min_stock(product, plant);
            if min_stock > 0 {
                values.push((get(&self.vars.short_on_stock, &(product, plant, day))?, min_stock as f64));
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Horizon;
    use crate::scenario::ScenarioBuilder;

    fn two_line_scenario() -> Scenario {
        let mut builder = ScenarioBuilder::new(Horizon::new(4));
        let plant = builder.add_plant(1, 2);
        let product = builder.add_product(1);
        builder
            .demand_series(product, plant.id(), &[10, 20, 30, 40])
            .min_stock(product, plant.id(), 5)
            .shortage_penalty(product, 200.0)
            .low_stock_penalty(product, 50.0)
            .shelf_life(product, 2);
        for &line in plant.lines() {
            builder
                .production_rate(product, line, 8.0)
                .moq(product, line, 0)
                .lot_size(product, line, 5)
                .production_cost(product, line, 10.0)
                .line_capacity_all_days(line, 24.0);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_model_size() {
        let scenario = two_line_scenario();
        let planning = PlanningModel::build(&scenario).unwrap();
        let vars = planning.variables();

        // 3 x (2 lines x 4 days) + 2 x (1 + 2 + 2 + 2) age buckets + 2 x 4 days
        assert_eq!(vars.production_amount.len(), 8);
        assert_eq!(vars.stock_by_age.len(), 7);
        assert_eq!(vars.sales_by_age.len(), 7);
        assert_eq!(planning.model().num_variables(), 46);

        // 3 x 8 production + 8 capacity + (4 demand + 7 stock + 4 min stock)
        assert_eq!(planning.model().num_constraints(), 47);
    }

    #[test]
    fn test_age_buckets_stop_at_shelf_life() {
        let scenario = two_line_scenario();
        let planning = PlanningModel::build(&scenario).unwrap();
        let vars = planning.variables();

        assert!(vars.stock_by_age.keys().all(|&(_, _, _, age)| age < 2));
        let first_day: Vec<u32> = vars
            .stock_by_age
            .keys()
            .filter(|&&(_, _, day, _)| day == Day::new(1))
            .map(|&(_, _, _, age)| age)
            .collect();
        assert_eq!(first_day, vec![0]);
    }

    #[test]
    fn test_variable_bounds_follow_total_demand() {
        let scenario = two_line_scenario();
        let planning = PlanningModel::build(&scenario).unwrap();
        let vars = planning.variables();
        let model = planning.model();

        let (_, &amount) = vars.production_amount.iter().next().unwrap();
        let (_, &lots) = vars.number_of_lots.iter().next().unwrap();
        assert_eq!(model.variable(amount).unwrap().upper, 100.0);
        assert_eq!(model.variable(lots).unwrap().upper, 21.0);
        assert!(model.variable(amount).unwrap().integer);
    }

    #[test]
    fn test_aging_constraint_links_previous_day() {
        let scenario = two_line_scenario();
        let planning = PlanningModel::build(&scenario).unwrap();
        let vars = planning.variables();
        let product = scenario.products()[0];
        let plant = scenario.plants()[0].id();

        let name = "stock_Product1_P1_3_1";
        let row = planning
            .model()
            .problem()
            .constraints
            .iter()
            .find(|c| c.name == name)
            .unwrap();

        let stock = vars.stock_by_age[&(product, plant, Day::new(3), 1)].index();
        let carried = vars.stock_by_age[&(product, plant, Day::new(2), 0)].index();
        let sold = vars.sales_by_age[&(product, plant, Day::new(3), 1)].index();
        let mut terms = row.terms.clone();
        terms.sort_by_key(|&(j, _)| j);
        let mut expected = vec![(stock, 1.0), (carried, -1.0), (sold, 1.0)];
        expected.sort_by_key(|&(j, _)| j);
        assert_eq!(terms, expected);
        assert_eq!(row.rhs, 0.0);
    }

    #[test]
    fn test_fresh_stock_sums_all_lines_of_plant() {
        let scenario = two_line_scenario();
        let planning = PlanningModel::build(&scenario).unwrap();
        let row = planning
            .model()
            .problem()
            .constraints
            .iter()
            .find(|c| c.name == "stock_Product1_P1_2_0")
            .unwrap();

        let producing = row.terms.iter().filter(|&&(_, coef)| coef == -1.0).count();
        assert_eq!(producing, 2);
        assert_eq!(row.terms.len(), 4);
    }

    #[test]
    fn test_idle_plan_is_feasible() {
        let scenario = two_line_scenario();
        let planning = PlanningModel::build(&scenario).unwrap();
        let problem = planning.model().problem();

        let mut values = vec![0.0; problem.num_variables()];
        for (var, value) in planning.idle_plan_hint().unwrap() {
            values[var.index()] = value;
        }
        assert!(problem.is_feasible(&values, 1e-9));
        // 200 x 100 units short + 50 x 5 units x 4 days below target
        assert_eq!(problem.evaluate(&values), 21_000.0);
    }
}
