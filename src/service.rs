//! Entry points for dashboard callers.
//!
//! The service fetches inputs from the injected data sources and hands them to
//! the pure components. The three operations share no mutable state and can be
//! awaited concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, instrument};

use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::forecast::{CalendarSignals, DemandScorer, ForecastPipeline};
use crate::models::{CategoryDemandStat, CategoryDistribution, ForecastPoint, Scenario, ScenarioComparison, StockAnalysis};
use crate::monte_carlo::DemandSimulator;
use crate::repository::{CategoryDemandSource, DemandHistorySource, InventorySource};
use crate::stock::StockAnalyzer;

pub struct AnalyticsService {
    categories: Arc<dyn CategoryDemandSource>,
    inventory: Arc<dyn InventorySource>,
    forecast: ForecastPipeline,
    config: AnalyticsConfig,
}

impl AnalyticsService {
    pub fn new(
        categories: Arc<dyn CategoryDemandSource>,
        inventory: Arc<dyn InventorySource>,
        history: Arc<dyn DemandHistorySource>,
        scorer: Arc<dyn DemandScorer>,
        config: AnalyticsConfig,
    ) -> Self {
        let forecast = ForecastPipeline::new(inventory.clone(), history, scorer, config.forecast.clone());
        AnalyticsService {
            categories,
            inventory,
            forecast,
            config,
        }
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarSignals>) -> Self {
        self.forecast = self.forecast.with_calendar(calendar);
        self
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Category demand estimates; unset arguments fall back to configuration
    #[instrument(skip(self))]
    pub async fn simulate_category_demand(
        &self,
        scenario: Option<Scenario>,
        num_trials: Option<usize>,
        days: Option<usize>,
    ) -> Result<HashMap<String, f64>, AnalyticsError> {
        let stats = self.fetch_category_stats().await?;
        let scenario = scenario.unwrap_or_default();
        let (num_trials, days) = self.trial_shape(num_trials, days);

        let estimates = self
            .simulator()
            .simulate_category_demand(&stats, &scenario, num_trials, days)?;
        info!(categories = estimates.len(), "category demand simulated");
        Ok(estimates)
    }

    pub async fn simulate_category_distributions(
        &self,
        scenario: Option<Scenario>,
        num_trials: Option<usize>,
        days: Option<usize>,
    ) -> Result<Vec<CategoryDistribution>, AnalyticsError> {
        let stats = self.fetch_category_stats().await?;
        let scenario = scenario.unwrap_or_default();
        let (num_trials, days) = self.trial_shape(num_trials, days);

        self.simulator()
            .simulate_category_distributions(&stats, &scenario, num_trials, days)
    }

    /// Neutral, best-case and worst-case estimates from a single stats fetch
    #[instrument(skip(self))]
    pub async fn compare_scenarios(
        &self,
        num_trials: Option<usize>,
        days: Option<usize>,
    ) -> Result<ScenarioComparison, AnalyticsError> {
        let stats = self.fetch_category_stats().await?;
        let (num_trials, days) = self.trial_shape(num_trials, days);
        let presets = &self.config.scenarios;
        let mut simulator = self.simulator();

        Ok(ScenarioComparison {
            neutral: simulator.simulate_category_demand(&stats, &Scenario::neutral(), num_trials, days)?,
            best_case: simulator.simulate_category_demand(&stats, &presets.best_case, num_trials, days)?,
            worst_case: simulator.simulate_category_demand(&stats, &presets.worst_case, num_trials, days)?,
        })
    }

    pub async fn analyze_stock(&self) -> Result<StockAnalysis, AnalyticsError> {
        self.analyze_stock_at(Utc::now()).await
    }

    #[instrument(skip(self))]
    pub async fn analyze_stock_at(&self, now: DateTime<Utc>) -> Result<StockAnalysis, AnalyticsError> {
        let items = self
            .inventory
            .inventory_snapshot()
            .await
            .map_err(AnalyticsError::fetch("inventory snapshot"))?;

        let mut analyzer =
            StockAnalyzer::with_synthetic_history(self.config.stock.clone(), self.config.simulation.seed);
        Ok(analyzer.analyze_at(&items, now))
    }

    pub async fn forecast_product(&self, product_id: &str) -> Result<Vec<ForecastPoint>, AnalyticsError> {
        self.forecast.forecast(product_id).await
    }

    pub async fn forecast_product_from(
        &self,
        product_id: &str,
        start: NaiveDate,
    ) -> Result<Vec<ForecastPoint>, AnalyticsError> {
        self.forecast.forecast_from(product_id, start).await
    }

    async fn fetch_category_stats(&self) -> Result<Vec<CategoryDemandStat>, AnalyticsError> {
        self.categories
            .category_demand_stats()
            .await
            .map_err(AnalyticsError::fetch("category demand stats"))
    }

    fn trial_shape(&self, num_trials: Option<usize>, days: Option<usize>) -> (usize, usize) {
        (
            num_trials.unwrap_or(self.config.simulation.trials),
            days.unwrap_or(self.config.simulation.days),
        )
    }

    fn simulator(&self) -> DemandSimulator {
        DemandSimulator::seeded(self.config.simulation.seed, self.config.simulation.gaussian_method)
    }
}
