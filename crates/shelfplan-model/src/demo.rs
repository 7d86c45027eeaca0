//! Randomized demonstration scenario: a dairy plant with saturated lines
//! and products that expire after twelve days.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entities::Horizon;
use crate::error::ScenarioError;
use crate::scenario::{Scenario, ScenarioBuilder};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    pub plants: u32,
    pub lines_per_plant: u32,
    pub products: u32,
    pub weeks: u32,
    pub seed: u64,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            plants: 1,
            lines_per_plant: 2,
            products: 2,
            weeks: 5,
            seed: 42,
        }
    }
}

impl DemoSettings {
    /// Draw a scenario; the same settings always give the same scenario
    pub fn generate(&self) -> Result<Scenario, ScenarioError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let horizon = Horizon::weeks(self.weeks);
        let mut builder = ScenarioBuilder::new(horizon);

        let plants: Vec<_> = (1..=self.plants)
            .map(|id| builder.add_plant(id, self.lines_per_plant))
            .collect();
        let products: Vec<_> = (1..=self.products).map(|id| builder.add_product(id)).collect();

        for &product in &products {
            builder
                .shortage_penalty(product, 200.0)
                .low_stock_penalty(product, 50.0)
                .shelf_life(product, 12);

            for plant in &plants {
                let demand: Vec<u64> = horizon.days().map(|_| rng.gen_range(150..=200)).collect();
                builder
                    .demand_series(product, plant.id(), &demand)
                    .min_stock(product, plant.id(), 5);

                for &line in plant.lines() {
                    builder
                        .production_rate(product, line, rng.gen_range(8..=10) as f64)
                        .moq(product, line, 50)
                        .lot_size(product, line, 5)
                        .production_cost(product, line, rng.gen_range(5..=20) as f64);
                }
            }
        }

        for plant in &plants {
            for &line in plant.lines() {
                builder.line_capacity_all_days(line, 24.0);
            }
        }

        debug!(seed = self.seed, days = horizon.len(), "demo scenario generated");
        builder.build()
    }
}
