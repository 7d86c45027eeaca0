//! Scenario parameters: the immutable input of a planning model.
//!
//! A [`Scenario`] is assembled with a [`ScenarioBuilder`] (in code) or read
//! from a [`ScenarioFile`] (JSON). Both paths validate completeness once;
//! the model builder only reads the finished tables.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entities::{Day, Horizon, Plant, PlantId, Product, ProductionLine};
use crate::error::ScenarioError;

#[derive(Debug, Clone, Default)]
struct Tables {
    demand: HashMap<(Product, PlantId, Day), u64>,
    production_rate: HashMap<(Product, ProductionLine), f64>,
    min_stock: HashMap<(Product, PlantId), u64>,
    moq: HashMap<(Product, ProductionLine), u64>,
    lot_size: HashMap<(Product, ProductionLine), u64>,
    line_capacity: HashMap<(ProductionLine, Day), f64>,
    shortage_penalty: HashMap<Product, f64>,
    low_stock_penalty: HashMap<Product, f64>,
    shelf_life: HashMap<Product, u32>,
    production_cost: HashMap<(Product, ProductionLine), f64>,
}

/// Complete, validated planning input
#[derive(Debug, Clone)]
pub struct Scenario {
    horizon: Horizon,
    plants: Vec<Plant>,
    products: Vec<Product>,
    tables: Tables,
    total_demand: HashMap<(Product, PlantId), u64>,
}

// Tables are complete once a scenario is built, so lookups never miss.
fn lookup<K: Eq + Hash, V: Copy + Default>(map: &HashMap<K, V>, key: &K) -> V {
    map.get(key).copied().unwrap_or_default()
}

impl Scenario {
    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }

    pub fn plant(&self, id: PlantId) -> Option<&Plant> {
        self.plants.iter().find(|p| p.id() == id)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Every production line of every plant, plant by plant
    pub fn lines(&self) -> impl Iterator<Item = ProductionLine> + '_ {
        self.plants.iter().flat_map(|p| p.lines().iter().copied())
    }

    pub fn demand(&self, product: Product, plant: PlantId, day: Day) -> u64 {
        lookup(&self.tables.demand, &(product, plant, day))
    }

    pub fn production_rate(&self, product: Product, line: ProductionLine) -> f64 {
        lookup(&self.tables.production_rate, &(product, line))
    }

    pub fn min_stock(&self, product: Product, plant: PlantId) -> u64 {
        lookup(&self.tables.min_stock, &(product, plant))
    }

    pub fn moq(&self, product: Product, line: ProductionLine) -> u64 {
        lookup(&self.tables.moq, &(product, line))
    }

    pub fn lot_size(&self, product: Product, line: ProductionLine) -> u64 {
        lookup(&self.tables.lot_size, &(product, line))
    }

    pub fn line_capacity(&self, line: ProductionLine, day: Day) -> f64 {
        lookup(&self.tables.line_capacity, &(line, day))
    }

    pub fn shortage_penalty(&self, product: Product) -> f64 {
        lookup(&self.tables.shortage_penalty, &product)
    }

    pub fn low_stock_penalty(&self, product: Product) -> f64 {
        lookup(&self.tables.low_stock_penalty, &product)
    }

    /// Maximum age in days before the product is disposed of
    pub fn shelf_life(&self, product: Product) -> u32 {
        lookup(&self.tables.shelf_life, &product)
    }

    pub fn production_cost(&self, product: Product, line: ProductionLine) -> f64 {
        lookup(&self.tables.production_cost, &(product, line))
    }

    /// Demand summed over the whole horizon; used as a finite variable bound
    pub fn total_demand(&self, product: Product, plant: PlantId) -> u64 {
        lookup(&self.total_demand, &(product, plant))
    }

    /// Ages tracked for `product` at the end of `day`: `0..min(day, shelf_life)`
    pub fn age_buckets(&self, product: Product, day: Day) -> Range<u32> {
        0..day.get().min(self.shelf_life(product))
    }

    pub fn from_json_str(source: &str) -> Result<Self, ScenarioError> {
        let file: ScenarioFile = serde_json::from_str(source)?;
        file.into_scenario()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ScenarioError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&source)
    }

    pub fn to_json_string(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(&self.to_file())?)
    }

    /// Flatten the tables into the document format
    pub fn to_file(&self) -> ScenarioFile {
        let mut file = ScenarioFile {
            horizon_days: self.horizon.len(),
            plants: self
                .plants
                .iter()
                .map(|p| PlantSpec {
                    id: p.id().get(),
                    lines: p.lines().len() as u32,
                })
                .collect(),
            products: self
                .products
                .iter()
                .map(|&product| ProductSpec {
                    id: product.id(),
                    shortage_penalty: self.shortage_penalty(product),
                    low_stock_penalty: self.low_stock_penalty(product),
                    shelf_life: self.shelf_life(product),
                })
                .collect(),
            demand: Vec::new(),
            stock: Vec::new(),
            lines: Vec::new(),
            capacity: Vec::new(),
        };

        for &product in &self.products {
            for plant in &self.plants {
                file.stock.push(StockRow {
                    product: product.id(),
                    plant: plant.id().get(),
                    min_stock: self.min_stock(product, plant.id()),
                });
                for day in self.horizon.days() {
                    file.demand.push(DemandRow {
                        product: product.id(),
                        plant: plant.id().get(),
                        day: day.get(),
                        units: self.demand(product, plant.id(), day),
                    });
                }
                for &line in plant.lines() {
                    file.lines.push(LineProductRow {
                        product: product.id(),
                        plant: plant.id().get(),
                        line: line.index(),
                        production_rate: self.production_rate(product, line),
                        moq: self.moq(product, line),
                        lot_size: self.lot_size(product, line),
                        production_cost: self.production_cost(product, line),
                    });
                }
            }
        }
        for line in self.lines() {
            for day in self.horizon.days() {
                file.capacity.push(CapacityRow {
                    plant: line.plant().get(),
                    line: line.index(),
                    day: day.get(),
                    hours: self.line_capacity(line, day),
                });
            }
        }

        file
    }
}

/// Assembles and validates a [`Scenario`]
#[derive(Debug)]
pub struct ScenarioBuilder {
    horizon: Horizon,
    plants: Vec<Plant>,
    products: Vec<Product>,
    tables: Tables,
    duplicate: Option<ScenarioError>,
}

impl ScenarioBuilder {
    pub fn new(horizon: Horizon) -> Self {
        Self {
            horizon,
            plants: Vec::new(),
            products: Vec::new(),
            tables: Tables::default(),
            duplicate: None,
        }
    }

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    /// Add a plant with `lines` production lines numbered from 1
    pub fn add_plant(&mut self, id: u32, lines: u32) -> Plant {
        let plant = Plant::new(id, lines);
        if self.plants.iter().any(|p| p.id() == plant.id()) {
            self.duplicate.get_or_insert(ScenarioError::DuplicateEntity {
                kind: "plant",
                id: plant.id().to_string(),
            });
        } else {
            self.plants.push(plant.clone());
        }
        plant
    }

    pub fn add_product(&mut self, id: u32) -> Product {
        let product = Product::new(id);
        if self.products.contains(&product) {
            self.duplicate.get_or_insert(ScenarioError::DuplicateEntity {
                kind: "product",
                id: product.to_string(),
            });
        } else {
            self.products.push(product);
        }
        product
    }

    pub fn demand(&mut self, product: Product, plant: PlantId, day: Day, units: u64) -> &mut Self {
        self.tables.demand.insert((product, plant, day), units);
        self
    }

    /// Demand for consecutive days starting at day 1
    pub fn demand_series(&mut self, product: Product, plant: PlantId, units: &[u64]) -> &mut Self {
        for (offset, &u) in units.iter().enumerate() {
            self.demand(product, plant, Day::new(offset as u32 + 1), u);
        }
        self
    }

    pub fn production_rate(&mut self, product: Product, line: ProductionLine, units_per_hour: f64) -> &mut Self {
        self.tables.production_rate.insert((product, line), units_per_hour);
        self
    }

    pub fn min_stock(&mut self, product: Product, plant: PlantId, units: u64) -> &mut Self {
        self.tables.min_stock.insert((product, plant), units);
        self
    }

    pub fn moq(&mut self, product: Product, line: ProductionLine, units: u64) -> &mut Self {
        self.tables.moq.insert((product, line), units);
        self
    }

    pub fn lot_size(&mut self, product: Product, line: ProductionLine, units: u64) -> &mut Self {
        self.tables.lot_size.insert((product, line), units);
        self
    }

    pub fn production_cost(&mut self, product: Product, line: ProductionLine, cost: f64) -> &mut Self {
        self.tables.production_cost.insert((product, line), cost);
        self
    }

    pub fn line_capacity(&mut self, line: ProductionLine, day: Day, hours: f64) -> &mut Self {
        self.tables.line_capacity.insert((line, day), hours);
        self
    }

    /// Same capacity on every day of the horizon
    pub fn line_capacity_all_days(&mut self, line: ProductionLine, hours: f64) -> &mut Self {
        for day in self.horizon.days() {
            self.line_capacity(line, day, hours);
        }
        self
    }

    pub fn shortage_penalty(&mut self, product: Product, cost: f64) -> &mut Self {
        self.tables.shortage_penalty.insert(product, cost);
        self
    }

    pub fn low_stock_penalty(&mut self, product: Product, cost: f64) -> &mut Self {
        self.tables.low_stock_penalty.insert(product, cost);
        self
    }

    pub fn shelf_life(&mut self, product: Product, days: u32) -> &mut Self {
        self.tables.shelf_life.insert(product, days);
        self
    }

    pub fn build(self) -> Result<Scenario, ScenarioError> {
        if let Some(err) = self.duplicate {
            return Err(err);
        }
        if self.horizon.is_empty() {
            return Err(ScenarioError::EmptyHorizon);
        }

        let validator = Validator {
            horizon: self.horizon,
            plants: self.plants.iter().map(|p| p.id()).collect(),
            lines: self.plants.iter().flat_map(|p| p.lines().iter().copied()).collect(),
            products: self.products.iter().copied().collect(),
        };
        validator.check_references(&self.tables)?;
        validator.check_complete(&self.plants, &self.products, &self.tables)?;

        let mut total_demand = HashMap::new();
        for &product in &self.products {
            for plant in &self.plants {
                let total = self
                    .horizon
                    .days()
                    .map(|day| lookup(&self.tables.demand, &(product, plant.id(), day)))
                    .sum();
                total_demand.insert((product, plant.id()), total);
            }
        }

        Ok(Scenario {
            horizon: self.horizon,
            plants: self.plants,
            products: self.products,
            tables: self.tables,
            total_demand,
        })
    }
}

struct Validator {
    horizon: Horizon,
    plants: HashSet<PlantId>,
    lines: HashSet<ProductionLine>,
    products: HashSet<Product>,
}

impl Validator {
    fn product(&self, product: Product, table: &'static str) -> Result<(), ScenarioError> {
        if self.products.contains(&product) {
            Ok(())
        } else {
            Err(unknown("product", table, product))
        }
    }

    fn plant(&self, plant: PlantId, table: &'static str) -> Result<(), ScenarioError> {
        if self.plants.contains(&plant) {
            Ok(())
        } else {
            Err(unknown("plant", table, plant))
        }
    }

    fn line(&self, line: ProductionLine, table: &'static str) -> Result<(), ScenarioError> {
        if self.lines.contains(&line) {
            Ok(())
        } else {
            Err(unknown("production line", table, line))
        }
    }

    fn day(&self, day: Day) -> Result<(), ScenarioError> {
        if self.horizon.contains(day) {
            Ok(())
        } else {
            Err(ScenarioError::DayOutOfHorizon {
                day: day.get(),
                horizon: self.horizon.len(),
            })
        }
    }

    /// Every key must name a declared entity and a day inside the horizon
    fn check_references(&self, tables: &Tables) -> Result<(), ScenarioError> {
        for &(product, plant, day) in tables.demand.keys() {
            self.product(product, "demand")?;
            self.plant(plant, "demand")?;
            self.day(day)?;
        }
        for &(product, plant) in tables.min_stock.keys() {
            self.product(product, "min_stock")?;
            self.plant(plant, "min_stock")?;
        }
        for (table, map) in [
            ("production_rate", &tables.production_rate),
            ("production_cost", &tables.production_cost),
        ] {
            for &(product, line) in map.keys() {
                self.product(product, table)?;
                self.line(line, table)?;
            }
        }
        for (table, map) in [("moq", &tables.moq), ("lot_size", &tables.lot_size)] {
            for &(product, line) in map.keys() {
                self.product(product, table)?;
                self.line(line, table)?;
            }
        }
        for &(line, day) in tables.line_capacity.keys() {
            self.line(line, "line_capacity")?;
            self.day(day)?;
        }
        for (table, map) in [
            ("shortage_penalty", &tables.shortage_penalty),
            ("low_stock_penalty", &tables.low_stock_penalty),
        ] {
            for &product in map.keys() {
                self.product(product, table)?;
            }
        }
        for &product in tables.shelf_life.keys() {
            self.product(product, "shelf_life")?;
        }
        Ok(())
    }

    fn check_complete(&self, plants: &[Plant], products: &[Product], tables: &Tables) -> Result<(), ScenarioError> {
        for &product in products {
            let shortage = require(&tables.shortage_penalty, &product, "shortage_penalty", || product.to_string())?;
            finite(shortage, "shortage_penalty", || product.to_string())?;
            let low_stock = require(&tables.low_stock_penalty, &product, "low_stock_penalty", || product.to_string())?;
            finite(low_stock, "low_stock_penalty", || product.to_string())?;
            let shelf_life = require(&tables.shelf_life, &product, "shelf_life", || product.to_string())?;
            if shelf_life == 0 {
                return Err(invalid("shelf_life", product.to_string(), "must be at least one day"));
            }

            for plant in plants {
                let id = plant.id();
                require(&tables.min_stock, &(product, id), "min_stock", || format!("({}, {})", product, id))?;
                for day in self.horizon.days() {
                    require(&tables.demand, &(product, id, day), "demand", || {
                        format!("({}, {}, day {})", product, id, day)
                    })?;
                }

                for &line in plant.lines() {
                    let key = || format!("({}, {})", product, line);
                    let rate = require(&tables.production_rate, &(product, line), "production_rate", key)?;
                    if !(rate.is_finite() && rate > 0.0) {
                        return Err(invalid("production_rate", key(), "must be positive"));
                    }
                    require(&tables.moq, &(product, line), "moq", key)?;
                    let lot = require(&tables.lot_size, &(product, line), "lot_size", key)?;
                    if lot == 0 {
                        return Err(invalid("lot_size", key(), "must be positive"));
                    }
                    let cost = require(&tables.production_cost, &(product, line), "production_cost", key)?;
                    finite(cost, "production_cost", key)?;
                }
            }
        }

        for plant in plants {
            for &line in plant.lines() {
                for day in self.horizon.days() {
                    let key = || format!("({}, day {})", line, day);
                    let hours = require(&tables.line_capacity, &(line, day), "line_capacity", key)?;
                    if !(hours.is_finite() && hours >= 0.0) {
                        return Err(invalid("line_capacity", key(), "must be a non-negative number of hours"));
                    }
                }
            }
        }
        Ok(())
    }
}

fn require<K: Eq + Hash, V: Copy>(
    map: &HashMap<K, V>,
    key: &K,
    table: &'static str,
    label: impl Fn() -> String,
) -> Result<V, ScenarioError> {
    map.get(key).copied().ok_or_else(|| ScenarioError::MissingEntry { table, key: label() })
}

fn finite(value: f64, table: &'static str, label: impl Fn() -> String) -> Result<(), ScenarioError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(table, label(), "must be finite"))
    }
}

fn invalid(table: &'static str, key: String, reason: &str) -> ScenarioError {
    ScenarioError::InvalidValue {
        table,
        key,
        reason: reason.to_string(),
    }
}

fn unknown(kind: &'static str, table: &'static str, id: impl ToString) -> ScenarioError {
    ScenarioError::UnknownEntity {
        kind,
        table,
        id: id.to_string(),
    }
}

/// JSON document describing a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub horizon_days: u32,
    pub plants: Vec<PlantSpec>,
    pub products: Vec<ProductSpec>,
    pub demand: Vec<DemandRow>,
    pub stock: Vec<StockRow>,
    pub lines: Vec<LineProductRow>,
    pub capacity: Vec<CapacityRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantSpec {
    pub id: u32,
    pub lines: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSpec {
    pub id: u32,
    pub shortage_penalty: f64,
    pub low_stock_penalty: f64,
    pub shelf_life: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandRow {
    pub product: u32,
    pub plant: u32,
    pub day: u32,
    pub units: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRow {
    pub product: u32,
    pub plant: u32,
    pub min_stock: u64,
}

/// Parameters of one product on one production line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineProductRow {
    pub product: u32,
    pub plant: u32,
    pub line: u32,
    pub production_rate: f64,
    pub moq: u64,
    pub lot_size: u64,
    pub production_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityRow {
    pub plant: u32,
    pub line: u32,
    pub day: u32,
    pub hours: f64,
}

impl ScenarioFile {
    pub fn into_scenario(self) -> Result<Scenario, ScenarioError> {
        let mut builder = ScenarioBuilder::new(Horizon::new(self.horizon_days));

        let plants: Vec<Plant> = self.plants.iter().map(|p| builder.add_plant(p.id, p.lines)).collect();
        let find_line = |plant: u32, index: u32, table: &'static str| {
            plants
                .iter()
                .find(|p| p.id().get() == plant)
                .and_then(|p| p.line(index))
                .ok_or_else(|| unknown("production line", table, format!("P{}-L{}", plant, index)))
        };

        for spec in &self.products {
            let product = builder.add_product(spec.id);
            builder
                .shortage_penalty(product, spec.shortage_penalty)
                .low_stock_penalty(product, spec.low_stock_penalty)
                .shelf_life(product, spec.shelf_life);
        }

        // Product and plant ids are checked against the declarations in `build`
        for row in &self.demand {
            builder.demand(
                Product::new(row.product),
                PlantId::new(row.plant),
                Day::new(row.day),
                row.units,
            );
        }
        for row in &self.stock {
            builder.min_stock(Product::new(row.product), PlantId::new(row.plant), row.min_stock);
        }
        for row in &self.lines {
            let product = Product::new(row.product);
            let line = find_line(row.plant, row.line, "lines")?;
            builder
                .production_rate(product, line, row.production_rate)
                .moq(product, line, row.moq)
                .lot_size(product, line, row.lot_size)
                .production_cost(product, line, row.production_cost);
        }
        for row in &self.capacity {
            let line = find_line(row.plant, row.line, "capacity")?;
            builder.line_capacity(line, Day::new(row.day), row.hours);
        }

        builder.build()
    }
}
