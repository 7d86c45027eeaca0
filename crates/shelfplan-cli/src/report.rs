//! Reshape result tables for display: one row per day, one column per
//! (product, line or plant).

use std::collections::BTreeMap;
use std::fmt::Display;

use clap::ValueEnum;
use serde::Serialize;
use shelfplan_model::{Day, PlanSummary, Product, SolvedPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Json,
}

/// Pivot `(product, entity, day) -> units` into a day-by-column text table
pub fn pivot<E: Display + Ord + Copy>(title: &str, table: &BTreeMap<(Product, E, Day), i64>) -> String {
    let mut columns: Vec<(Product, E)> = Vec::new();
    let mut rows: BTreeMap<Day, BTreeMap<(Product, E), i64>> = BTreeMap::new();
    for (&(product, entity, day), &units) in table {
        // Keys are grouped by column, so a new column starts whenever the pair changes
        if columns.last() != Some(&(product, entity)) {
            columns.push((product, entity));
        }
        rows.entry(day).or_default().insert((product, entity), units);
    }

    let headers: Vec<String> = columns.iter().map(|(p, e)| format!("{} {}", p, e)).collect();
    let widths: Vec<usize> = headers.iter().map(|h| h.len().max(6)).collect();

    let mut lines = vec![title.to_string()];
    let header: String = headers
        .iter()
        .zip(&widths)
        .map(|(header, &width)| format!("  {:>width$}", header))
        .collect();
    lines.push(format!("{:>4}{}", "day", header));
    for (day, values) in &rows {
        let cells: String = columns
            .iter()
            .zip(&widths)
            .map(|(column, &width)| format!("  {:>width$}", values.get(column).copied().unwrap_or(0)))
            .collect();
        lines.push(format!("{:>4}{}", day.get(), cells));
    }
    lines.join("\n") + "\n"
}

pub fn render_table(plan: &SolvedPlan) -> String {
    let summary = plan.summary();
    let lines = [
        format!("Status: {}", plan.status()),
        format!("Objective: {:.2}", plan.objective_value()),
        format!("  shortage penalty   {:>14.2}", summary.shortage_cost),
        format!("  production cost    {:>14.2}", summary.production_cost),
        format!("  low stock penalty  {:>14.2}", summary.low_stock_cost),
        format!(
            "Produced {} / sold {} / short {} / wasted {}",
            summary.total_production, summary.total_sales, summary.total_shortage, summary.total_waste
        ),
    ];
    let tables = [
        pivot("Production plan", plan.production_amounts()),
        pivot("Stock", plan.stock()),
        pivot("Sales", plan.sales()),
        pivot("Shortage", plan.shortage()),
    ];
    format!("{}\n\n{}", lines.join("\n"), tables.join("\n"))
}

#[derive(Serialize)]
struct Row {
    product: u32,
    entity: String,
    day: u32,
    units: i64,
}

fn rows<E: Display>(table: &BTreeMap<(Product, E, Day), i64>) -> Vec<Row> {
    table
        .iter()
        .map(|((product, entity, day), &units)| Row {
            product: product.id(),
            entity: entity.to_string(),
            day: day.get(),
            units,
        })
        .collect()
}

#[derive(Serialize)]
struct PlanReport<'a> {
    status: String,
    objective_value: f64,
    elapsed_secs: f64,
    summary: &'a PlanSummary,
    production: Vec<Row>,
    lots: Vec<Row>,
    stock: Vec<Row>,
    sales: Vec<Row>,
    shortage: Vec<Row>,
    short_on_stock: Vec<Row>,
}

pub fn render_json(plan: &SolvedPlan) -> Result<String, serde_json::Error> {
    let report = PlanReport {
        status: plan.status().to_string(),
        objective_value: plan.objective_value(),
        elapsed_secs: plan.elapsed().as_secs_f64(),
        summary: plan.summary(),
        production: rows(plan.production_amounts()),
        lots: rows(plan.lots()),
        stock: rows(plan.stock()),
        sales: rows(plan.sales()),
        shortage: rows(plan.shortage()),
        short_on_stock: rows(plan.short_on_stock()),
    };
    serde_json::to_string_pretty(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfplan_model::{Horizon, PlantId, PlanningModel, ScenarioBuilder};
    use shelfplan_solver::{BranchAndBound, SolveOptions};

    #[test]
    fn test_pivot_days_as_rows() {
        let p1 = Product::new(1);
        let p2 = Product::new(2);
        let plant = PlantId::new(1);
        let mut table = BTreeMap::new();
        table.insert((p1, plant, Day::new(1)), 10);
        table.insert((p1, plant, Day::new(2)), 5);
        table.insert((p2, plant, Day::new(1)), 7);
        table.insert((p2, plant, Day::new(2)), 0);

        let text = pivot("Stock", &table);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Stock");
        assert_eq!(lines[1], " day  Product1 P1  Product2 P1");
        assert_eq!(lines[2], "   1           10            7");
        assert_eq!(lines[3], "   2            5            0");
    }

    #[test]
    fn test_rows_use_entity_labels() {
        let mut table = BTreeMap::new();
        table.insert((Product::new(3), PlantId::new(2), Day::new(4)), 12);
        let json = serde_json::to_value(rows(&table)).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "product": 3, "entity": "P2", "day": 4, "units": 12 }])
        );
    }

    #[test]
    fn test_table_lists_summary_then_pivots() {
        let mut builder = ScenarioBuilder::new(Horizon::new(1));
        let plant = builder.add_plant(1, 1);
        let product = builder.add_product(1);
        let line = plant.lines()[0];
        builder
            .demand_series(product, plant.id(), &[40])
            .min_stock(product, plant.id(), 0)
            .shortage_penalty(product, 200.0)
            .low_stock_penalty(product, 50.0)
            .shelf_life(product, 1)
            .production_rate(product, line, 10.0)
            .moq(product, line, 0)
            .lot_size(product, line, 1)
            .production_cost(product, line, 5.0)
            .line_capacity_all_days(line, 24.0);
        let scenario = builder.build().unwrap();
        let plan = PlanningModel::build(&scenario)
            .unwrap()
            .solve(&BranchAndBound::new(), &SolveOptions::default())
            .unwrap();

        let text = render_table(&plan);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Status: OPTIMAL");
        assert_eq!(lines[1], "Objective: 200.00");
        assert_eq!(lines[5], "Produced 40 / sold 40 / short 0 / wasted 0");
        assert_eq!(lines[6], "");
        assert_eq!(lines[7], "Production plan");
        assert_eq!(lines[8], " day  Product1 P1-L1");
        assert_eq!(lines[9], "   1              40");
        assert_eq!(lines[10], "");
        assert_eq!(lines[11], "Stock");
        assert!(text.ends_with('\n'));
    }
}
