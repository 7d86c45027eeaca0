use std::time::Duration;

use shelfplan_solver::{ModelError, SolutionStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Missing {table} entry for {key}")]
    MissingEntry { table: &'static str, key: String },
    #[error("Invalid {table} value for {key}: {reason}")]
    InvalidValue {
        table: &'static str,
        key: String,
        reason: String,
    },
    #[error("Unknown {kind} referenced in {table}: {id}")]
    UnknownEntity {
        kind: &'static str,
        table: &'static str,
        id: String,
    },
    #[error("Duplicate {kind}: {id}")]
    DuplicateEntity { kind: &'static str, id: String },
    #[error("Day {day} is outside the {horizon}-day horizon")]
    DayOutOfHorizon { day: u32, horizon: u32 },
    #[error("Scenario has an empty horizon")]
    EmptyHorizon,
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid scenario document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum PlanError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("Model construction failed: {0}")]
    Model(#[from] ModelError),
    #[error("Variable {0} was not created")]
    MissingVariable(String),
    #[error("No feasible solution found after {:.1} seconds", .elapsed.as_secs_f64())]
    Infeasible { elapsed: Duration },
    #[error("Solver stopped with status {status} after {:.1} seconds", .elapsed.as_secs_f64())]
    NoSolution {
        status: SolutionStatus,
        elapsed: Duration,
    },
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}
