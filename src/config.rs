//! Layered configuration for the analytics core.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `config/analytics.toml` (optional)
//! 3. environment variables prefixed `ANALYTICS__`, e.g. `ANALYTICS__SIMULATION__TRIALS=5000`

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::info;

use crate::error::AnalyticsError;
use crate::forecast::ForecastConfig;
use crate::models::Scenario;
use crate::monte_carlo::{DEFAULT_DAYS, DEFAULT_TRIALS};
use crate::stock::StockPolicy;
use crate::variate::GaussianMethod;

pub const DEFAULT_CONFIG_PATH: &str = "config/analytics";
pub const ENV_PREFIX: &str = "ANALYTICS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub trials: usize,
    pub days: usize,
    /// Fixed seed for reproducible runs; entropy when absent
    pub seed: Option<u64>,
    pub gaussian_method: GaussianMethod,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            trials: DEFAULT_TRIALS,
            days: DEFAULT_DAYS,
            seed: None,
            gaussian_method: GaussianMethod::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScenarioPresets {
    pub best_case: Scenario,
    pub worst_case: Scenario,
}

impl Default for ScenarioPresets {
    fn default() -> Self {
        ScenarioPresets {
            best_case: Scenario::best_case(),
            worst_case: Scenario::worst_case(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub simulation: SimulationConfig,
    pub scenarios: ScenarioPresets,
    pub stock: StockPolicy,
    pub forecast: ForecastConfig,
}

impl AnalyticsConfig {
    /// Load from the default file location and the environment
    pub fn load() -> Result<Self, AnalyticsError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// `path` is passed to the `config` crate without extension, so
    /// `analytics.toml`, `analytics.yaml` and friends are all picked up.
    pub fn load_from(path: &str) -> Result<Self, AnalyticsError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AnalyticsConfig = settings.try_deserialize()?;
        config.validate()?;

        info!(
            trials = config.simulation.trials,
            days = config.simulation.days,
            seeded = config.simulation.seed.is_some(),
            "analytics configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.simulation.trials == 0 {
            return Err(AnalyticsError::InvalidConfig("simulation.trials must be at least 1".into()));
        }
        if self.simulation.days == 0 {
            return Err(AnalyticsError::InvalidConfig("simulation.days must be at least 1".into()));
        }
        self.scenarios.best_case.validate()?;
        self.scenarios.worst_case.validate()?;
        self.stock.validate().map_err(AnalyticsError::InvalidConfig)?;
        self.forecast.validate().map_err(AnalyticsError::InvalidConfig)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalyticsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.trials, 1000);
        assert_eq!(config.simulation.days, 30);
        assert_eq!(config.forecast.horizon_days, 30);
        assert_eq!(config.scenarios.best_case, Scenario::best_case());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AnalyticsConfig::load_from("does/not/exist/analytics").unwrap();
        assert_eq!(config.stock, StockPolicy::default());
    }

    #[test]
    fn test_file_overrides_selected_keys() {
        let dir = std::env::temp_dir().join(format!("analytics-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("analytics.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[simulation]
trials = 250
seed = 7
gaussian_method = "canonical"

[stock]
cover_upper_bound = 90.0

[forecast.normalization]
max_stock = 5000.0
"#
        )
        .unwrap();

        let base = dir.join("analytics");
        let config = AnalyticsConfig::load_from(base.to_str().unwrap()).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(config.simulation.trials, 250);
        assert_eq!(config.simulation.days, 30);
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.gaussian_method, GaussianMethod::Canonical);
        assert_eq!(config.stock.cover_upper_bound, 90.0);
        assert_eq!(config.stock.cover_lower_bound, 30.0);
        assert_eq!(config.forecast.normalization.max_stock, 5000.0);
        assert_eq!(config.forecast.normalization.max_demand, 1000.0);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AnalyticsConfig::default();
        config.simulation.trials = 0;
        assert!(matches!(config.validate(), Err(AnalyticsError::InvalidConfig(_))));

        let mut config = AnalyticsConfig::default();
        config.scenarios.worst_case.economic_shift_factor = -1.0;
        assert!(matches!(config.validate(), Err(AnalyticsError::InvalidScenario { .. })));
    }
}
