//! Error types for the analytics core
//!
//! Upstream fetch failures are fatal to the operation that issued them.
//! Scorer failures only ever void a single forecast day.

use thiserror::Error;

/// Failure reported by a data-access collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),
}

/// Failure of the injected scoring function for one forecast day
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("scoring model not initialized")]
    NotInitialized,

    #[error("inference failed: {0}")]
    Inference(String),
}

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("failed to fetch {what}: {source}")]
    DataSource {
        what: &'static str,
        #[source]
        source: SourceError,
    },

    #[error("invalid scenario (growth={demand_growth_factor}, shift={economic_shift_factor}): factors must be positive")]
    InvalidScenario {
        demand_growth_factor: f64,
        economic_shift_factor: f64,
    },

    #[error("invalid demand statistics for category '{category}' (avg={avg_demand}, std={demand_std_dev})")]
    InvalidCategoryStat {
        category: String,
        avg_demand: f64,
        demand_std_dev: f64,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnalyticsError {
    pub fn fetch(what: &'static str) -> impl FnOnce(SourceError) -> AnalyticsError {
        move |source| AnalyticsError::DataSource { what, source }
    }
}
