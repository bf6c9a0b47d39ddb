//! 30-day per-product demand forecast.
//!
//! The pipeline assembles one [`ForecastInput`] per calendar day, normalizes
//! it into the scorer's feature contract and asks the injected
//! [`DemandScorer`] for a prediction. A failed prediction voids only its own
//! day.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{AnalyticsError, ScoreError};
use crate::features::{
    FeatureNormalizer, FeatureVector, NormalizationConstants, DEFAULT_SEQUENCE_LENGTH, FEATURE_COUNT,
};
use crate::models::{mean, population_std_dev, DemandHistoryRecord, ForecastInput, ForecastPoint, InventorySnapshot};
use crate::repository::{DemandHistorySource, InventorySource};

/// What the scorer sees for one forecast day
#[derive(Debug, Clone, PartialEq)]
pub struct ScorerInput {
    pub features: FeatureVector,
    /// `features` zero-padded to the configured sequence length
    pub sequence: Vec<f32>,
    pub attention_mask: Vec<f32>,
}

impl ScorerInput {
    pub fn new(features: FeatureVector, sequence_length: usize) -> Self {
        ScorerInput {
            sequence: features.padded(sequence_length),
            attention_mask: FeatureVector::attention_mask(sequence_length),
            features,
        }
    }
}

/// Opaque prediction function the forecast is delegated to
#[async_trait]
pub trait DemandScorer: Send + Sync {
    async fn score(&self, input: &ScorerInput) -> Result<f64, ScoreError>;
}

/// Calendar context for a forecast day. Defaults report no event.
pub trait CalendarSignals: Send + Sync {
    fn is_promotion(&self, _date: NaiveDate) -> bool {
        false
    }

    fn is_holiday(&self, _date: NaiveDate) -> bool {
        false
    }

    fn is_peak_season(&self, _date: NaiveDate) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoCalendarSignals;

impl CalendarSignals for NoCalendarSignals {}

/// Baseline scorer that predicts the rolling mean carried in the features.
///
/// Useful as a fallback when no trained model is wired in.
#[derive(Debug, Clone, Default)]
pub struct RollingMeanScorer {
    normalizer: FeatureNormalizer,
}

impl RollingMeanScorer {
    pub fn new(constants: NormalizationConstants) -> Self {
        RollingMeanScorer {
            normalizer: FeatureNormalizer::new(constants),
        }
    }
}

#[async_trait]
impl DemandScorer for RollingMeanScorer {
    async fn score(&self, input: &ScorerInput) -> Result<f64, ScoreError> {
        Ok(self.normalizer.denormalize(&input.features).rolling_mean)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub horizon_days: usize,
    /// Number of recent demand records used for lags and rolling stats
    pub history_depth: usize,
    /// Upper bound on scorer calls in flight for one forecast
    pub max_concurrent_scores: usize,
    /// Width the features are zero-padded to before scoring
    pub sequence_length: usize,
    pub normalization: NormalizationConstants,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            horizon_days: 30,
            history_depth: 3,
            max_concurrent_scores: 8,
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            normalization: NormalizationConstants::default(),
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.horizon_days == 0 {
            return Err("forecast horizon_days must be at least 1".to_string());
        }
        if self.max_concurrent_scores == 0 {
            return Err("forecast max_concurrent_scores must be at least 1".to_string());
        }
        if self.sequence_length < FEATURE_COUNT {
            return Err(format!(
                "forecast sequence_length must be at least {FEATURE_COUNT}, got {}",
                self.sequence_length
            ));
        }
        self.normalization.validate()
    }
}

/// Rolling mean and population std-dev of the fetched history; zeros if empty
pub fn rolling_stats(history: &[DemandHistoryRecord]) -> (f64, f64) {
    let quantities: Vec<f64> = history.iter().map(|r| r.quantity as f64).collect();
    (mean(&quantities), population_std_dev(&quantities))
}

/// Feature rows for each day of the horizon starting at `start`.
///
/// `history` must be newest first. Without an inventory item there is nothing
/// to forecast from, and every day gets `None`. The restock date is taken in
/// the local calendar, like the forecast dates.
pub fn build_inputs(
    product_id: &str,
    item: Option<&InventorySnapshot>,
    history: &[DemandHistoryRecord],
    start: NaiveDate,
    horizon_days: usize,
    calendar: &dyn CalendarSignals,
) -> Vec<(NaiveDate, Option<ForecastInput>)> {
    let (rolling_mean, rolling_std) = rolling_stats(history);
    let lag = |i: usize| history.get(i).map(|r| r.quantity).unwrap_or(0);

    (0..horizon_days)
        .map(|offset| {
            let date = start + Duration::days(offset as i64);
            let input = item.map(|item| ForecastInput {
                date,
                product_id: product_id.to_string(),
                current_stock: item.quantity,
                restock_amount: item.reorder_level,
                promotion: calendar.is_promotion(date),
                holiday: calendar.is_holiday(date),
                peak_season: calendar.is_peak_season(date),
                reorder_point: item.last_restocked.with_timezone(&Local).date_naive(),
                demand_lag1: lag(0),
                demand_lag2: lag(1),
                demand_lag3: lag(2),
                rolling_mean,
                rolling_std,
            });
            (date, input)
        })
        .collect()
}

pub struct ForecastPipeline {
    inventory: Arc<dyn InventorySource>,
    history: Arc<dyn DemandHistorySource>,
    scorer: Arc<dyn DemandScorer>,
    calendar: Arc<dyn CalendarSignals>,
    normalizer: FeatureNormalizer,
    config: ForecastConfig,
}

impl ForecastPipeline {
    pub fn new(
        inventory: Arc<dyn InventorySource>,
        history: Arc<dyn DemandHistorySource>,
        scorer: Arc<dyn DemandScorer>,
        config: ForecastConfig,
    ) -> Self {
        ForecastPipeline {
            inventory,
            history,
            scorer,
            calendar: Arc::new(NoCalendarSignals),
            normalizer: FeatureNormalizer::new(config.normalization.clone()),
            config,
        }
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarSignals>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn normalizer(&self) -> &FeatureNormalizer {
        &self.normalizer
    }

    /// Forecast starting today (local calendar)
    pub async fn forecast(&self, product_id: &str) -> Result<Vec<ForecastPoint>, AnalyticsError> {
        self.forecast_from(product_id, Local::now().date_naive()).await
    }

    #[instrument(skip(self), fields(horizon = self.config.horizon_days))]
    pub async fn forecast_from(
        &self,
        product_id: &str,
        start: NaiveDate,
    ) -> Result<Vec<ForecastPoint>, AnalyticsError> {
        let item = self
            .inventory
            .inventory_item(product_id)
            .await
            .map_err(AnalyticsError::fetch("inventory item"))?;
        let history = self
            .history
            .recent_demand_history(product_id, self.config.history_depth)
            .await
            .map_err(AnalyticsError::fetch("demand history"))?;

        if item.is_none() {
            warn!(product_id, "no inventory record, forecast will be empty");
        }

        let inputs = build_inputs(
            product_id,
            item.as_ref(),
            &history,
            start,
            self.config.horizon_days,
            self.calendar.as_ref(),
        );

        // `buffered` keeps results in input order
        let points: Vec<ForecastPoint> = stream::iter(inputs)
            .map(|(date, input)| async move {
                let predicted_demand = match input {
                    Some(input) => self.score_day(&input).await,
                    None => None,
                };
                ForecastPoint {
                    date,
                    predicted_demand,
                }
            })
            .buffered(self.config.max_concurrent_scores.max(1))
            .collect()
            .await;

        let missing = points.iter().filter(|p| p.predicted_demand.is_none()).count();
        debug!(product_id, missing, "forecast complete");
        Ok(points)
    }

    async fn score_day(&self, input: &ForecastInput) -> Option<f64> {
        let scorer_input = ScorerInput::new(self.normalizer.normalize(input), self.config.sequence_length);
        match self.scorer.score(&scorer_input).await {
            Ok(value) if value.is_finite() => Some(value),
            Ok(value) => {
                warn!(date = %input.date, value, "scorer returned a non-finite prediction");
                None
            }
            Err(err) => {
                warn!(date = %input.date, error = %err, "prediction failed");
                None
            }
        }
    }
}
