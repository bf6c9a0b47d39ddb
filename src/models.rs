use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// Number of entries in every stock-health history series
pub const HISTORY_DAYS: usize = 30;

/// Aggregate daily demand statistics for one product category
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryDemandStat {
    pub category_name: String,
    pub avg_demand: f64,
    pub demand_std_dev: f64,
}

impl CategoryDemandStat {
    pub fn new(category_name: impl Into<String>, avg_demand: f64, demand_std_dev: f64) -> Self {
        CategoryDemandStat {
            category_name: category_name.into(),
            avg_demand,
            demand_std_dev,
        }
    }

    /// Rejects negative or non-finite statistics handed over by the data source
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if valid(self.avg_demand) && valid(self.demand_std_dev) {
            Ok(())
        } else {
            Err(AnalyticsError::InvalidCategoryStat {
                category: self.category_name.clone(),
                avg_demand: self.avg_demand,
                demand_std_dev: self.demand_std_dev,
            })
        }
    }
}

/// Multiplicative adjustment applied to baseline demand before sampling.
///
/// `demand_growth_factor` scales the mean, `economic_shift_factor` scales the
/// standard deviation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub demand_growth_factor: f64,
    pub economic_shift_factor: f64,
}

impl Scenario {
    pub fn new(demand_growth_factor: f64, economic_shift_factor: f64) -> Result<Self, AnalyticsError> {
        let scenario = Scenario {
            demand_growth_factor,
            economic_shift_factor,
        };
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn neutral() -> Self {
        Scenario {
            demand_growth_factor: 1.0,
            economic_shift_factor: 1.0,
        }
    }

    /// Growing demand with calmer variance
    pub fn best_case() -> Self {
        Scenario {
            demand_growth_factor: 1.2,
            economic_shift_factor: 0.8,
        }
    }

    /// Shrinking demand with wider variance
    pub fn worst_case() -> Self {
        Scenario {
            demand_growth_factor: 0.7,
            economic_shift_factor: 1.3,
        }
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if positive(self.demand_growth_factor) && positive(self.economic_shift_factor) {
            Ok(())
        } else {
            Err(AnalyticsError::InvalidScenario {
                demand_growth_factor: self.demand_growth_factor,
                economic_shift_factor: self.economic_shift_factor,
            })
        }
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Scenario::neutral()
    }
}

/// Current stock position of a single product
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub product_id: String,
    pub category: String,
    pub quantity: u32,
    pub reorder_level: u32,
    pub last_restocked: DateTime<Utc>,
}

/// One day of observed demand for a product
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemandHistoryRecord {
    pub product_id: String,
    pub date: NaiveDate,
    pub quantity: u32,
}

/// Raw features for one product on one forecast day, before normalization
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastInput {
    pub date: NaiveDate,
    pub product_id: String,
    pub current_stock: u32,
    pub restock_amount: u32,
    pub promotion: bool,
    pub holiday: bool,
    pub peak_season: bool,
    pub reorder_point: NaiveDate,
    pub demand_lag1: u32,
    pub demand_lag2: u32,
    pub demand_lag3: u32,
    pub rolling_mean: f64,
    pub rolling_std: f64,
}

/// Predicted demand for one day; `None` when the scorer failed for that day
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_demand: Option<f64>,
}

/// Stock-health metrics for the whole inventory at one point in time
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StockAnalysis {
    pub stock_cover: f64,
    pub imbalance_score: f64,
    pub stockout_risk: f64,
    pub demand_volatility: f64,
    pub stock_efficiency: f64,
    pub reorder_point_effectiveness: f64,
    pub promotion_sensitivity: f64,
    pub holiday_impact: f64,
    /// Oldest first; last entry is today
    pub stock_cover_history: Vec<f64>,
    pub imbalance_score_history: Vec<f64>,
    pub demand_volatility_history: Vec<f64>,
    /// Entry `i` is the recomputation for day index `i + 1`
    pub stockout_risk_history: Vec<f64>,
}

impl StockAnalysis {
    /// All-zero analysis returned for an empty inventory
    pub fn empty() -> Self {
        StockAnalysis {
            stock_cover: 0.0,
            imbalance_score: 0.0,
            stockout_risk: 0.0,
            demand_volatility: 0.0,
            stock_efficiency: 0.0,
            reorder_point_effectiveness: 0.0,
            promotion_sensitivity: 0.0,
            holiday_impact: 0.0,
            stock_cover_history: vec![0.0; HISTORY_DAYS],
            imbalance_score_history: vec![0.0; HISTORY_DAYS],
            demand_volatility_history: vec![0.0; HISTORY_DAYS],
            stockout_risk_history: vec![0.0; HISTORY_DAYS],
        }
    }
}

/// Summary of the Monte Carlo trial sums for one category
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDistribution {
    pub category_name: String,
    pub num_trials: usize,
    pub days: usize,
    pub mean_demand: f64,
    pub std_dev_demand: f64,
    pub min_demand: f64,
    pub max_demand: f64,
    pub percentile_10: f64,
    pub percentile_25: f64,
    pub percentile_50: f64, // Median
    pub percentile_75: f64,
    pub percentile_90: f64,
    /// Sorted ascending
    #[serde(skip)]
    pub trial_sums: Vec<f64>,
}

/// Category estimates for the three standard scenarios
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioComparison {
    pub neutral: HashMap<String, f64>,
    pub best_case: HashMap<String, f64>,
    pub worst_case: HashMap<String, f64>,
}

/// Divide, yielding 0 when the denominator is zero or the result is not finite
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population standard deviation, 0 for an empty slice
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
