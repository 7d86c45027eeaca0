use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shelfplan_solver::SolveOptions;

use crate::error::PlanError;

/// Solver settings, read from an optional JSON file
///
/// Missing fields take their defaults, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    pub time_limit_secs: f64,
    pub integrality_tolerance: f64,
    pub feasibility_tolerance: f64,
    pub max_nodes: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        let options = SolveOptions::default();
        Self {
            time_limit_secs: options.time_limit.as_secs_f64(),
            integrality_tolerance: options.integrality_tolerance,
            feasibility_tolerance: options.feasibility_tolerance,
            max_nodes: options.max_nodes,
        }
    }
}

impl PlannerConfig {
    pub fn from_json_str(source: &str) -> Result<Self, PlanError> {
        let config: Self = serde_json::from_str(source).map_err(|e| PlanError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| PlanError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&source)
    }

    pub fn with_time_limit_secs(mut self, secs: f64) -> Result<Self, PlanError> {
        self.time_limit_secs = secs;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), PlanError> {
        if !self.time_limit_secs.is_finite() || self.time_limit_secs < 0.0 {
            return Err(PlanError::Config(format!(
                "time_limit_secs must be a non-negative number of seconds, got {}",
                self.time_limit_secs
            )));
        }
        for (name, value) in [
            ("integrality_tolerance", self.integrality_tolerance),
            ("feasibility_tolerance", self.feasibility_tolerance),
        ] {
            if !(0.0..0.5).contains(&value) {
                return Err(PlanError::Config(format!("{} must be in [0, 0.5), got {}", name, value)));
            }
        }
        Ok(())
    }

    pub fn solve_options(&self) -> SolveOptions {
        SolveOptions {
            time_limit: Duration::from_secs_f64(self.time_limit_secs),
            integrality_tolerance: self.integrality_tolerance,
            feasibility_tolerance: self.feasibility_tolerance,
            max_nodes: self.max_nodes,
            ..SolveOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PlannerConfig::default());
        assert_eq!(config.time_limit_secs, 120.0);
        assert_eq!(config.solve_options().time_limit, Duration::from_secs(120));
    }

    #[test]
    fn test_partial_override() {
        let config = PlannerConfig::from_json_str(r#"{ "time_limit_secs": 2.5, "max_nodes": 10 }"#).unwrap();
        let options = config.solve_options();
        assert_eq!(options.time_limit, Duration::from_millis(2500));
        assert_eq!(options.max_nodes, 10);
        assert_eq!(options.integrality_tolerance, 1e-6);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            PlannerConfig::from_json_str(r#"{ "time_limit_secs": -1 }"#),
            Err(PlanError::Config(_))
        ));
        assert!(matches!(
            PlannerConfig::from_json_str(r#"{ "feasibility_tolerance": 0.7 }"#),
            Err(PlanError::Config(_))
        ));
        assert!(matches!(
            PlannerConfig::from_json_str(r#"{ "time_limit": 5 }"#),
            Err(PlanError::Config(_))
        ));
        assert!(PlannerConfig::default().with_time_limit_secs(f64::NAN).is_err());
    }
}
