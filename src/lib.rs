//! Inventory analytics core: Monte Carlo category demand simulation,
//! stock-health analysis and 30-day per-product demand forecasting.
//!
//! Data access and the prediction model are injected; see [`repository`] and
//! [`forecast::DemandScorer`].

pub mod config;
pub mod demand;
pub mod error;
pub mod features;
pub mod forecast;
pub mod logging;
pub mod models;
pub mod monte_carlo;
pub mod reporting;
pub mod repository;
pub mod service;
pub mod stock;
pub mod variate;

pub use config::AnalyticsConfig;
pub use error::{AnalyticsError, ScoreError, SourceError};
pub use forecast::{
    CalendarSignals, DemandScorer, ForecastPipeline, NoCalendarSignals, RollingMeanScorer, ScorerInput,
};
pub use models::{
    CategoryDemandStat, CategoryDistribution, DemandHistoryRecord, ForecastInput, ForecastPoint,
    InventorySnapshot, Scenario, ScenarioComparison, StockAnalysis,
};
pub use monte_carlo::DemandSimulator;
pub use repository::{CategoryDemandSource, DemandHistorySource, InMemoryRepository, InventorySource};
pub use service::AnalyticsService;
pub use stock::{StockAnalyzer, StockPolicy};
