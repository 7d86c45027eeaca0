pub mod builder;
pub mod config;
pub mod demo;
pub mod entities;
pub mod error;
pub mod plan;
pub mod scenario;

pub use builder::{PlanVariables, PlanningModel};
pub use config::PlannerConfig;
pub use demo::DemoSettings;
pub use entities::{Day, Horizon, Plant, PlantId, Product, ProductionLine};
pub use error::{PlanError, ScenarioError};
pub use plan::{PlanSummary, SolvedPlan};
pub use scenario::{Scenario, ScenarioBuilder, ScenarioFile};
