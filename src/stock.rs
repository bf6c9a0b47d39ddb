//! Stock-health analysis over the current inventory snapshot.
//!
//! Point-in-time metrics come from the snapshot itself. Three of the four
//! history series come from a [`HistorySource`]; the default
//! [`SyntheticHistory`] fabricates them by jittering the current value, since
//! no metric history is recorded yet. Stockout-risk history is recomputed per
//! day index from the snapshot.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::models::{mean, safe_div, InventorySnapshot, StockAnalysis, HISTORY_DAYS};
use crate::variate::seeded_rng;

/// Inclusive-exclusive range for a uniform jitter draw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JitterRange {
    pub min: f64,
    pub max: f64,
}

impl JitterRange {
    pub const fn new(min: f64, max: f64) -> Self {
        JitterRange { min, max }
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.min + rng.gen::<f64>() * (self.max - self.min)
    }
}

/// Policy constants feeding the stock-health formulas.
///
/// Most of these stand in for signals the inventory snapshot does not carry
/// (turnover, promotion and holiday demand). Replace them from configuration
/// once real figures exist; the formulas stay as they are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockPolicy {
    /// Acceptable stock-cover band, in days
    pub cover_lower_bound: f64,
    pub cover_upper_bound: f64,

    pub average_stockout_days: f64,
    pub max_stockout_days: f64,
    pub lead_time_days: f64,
    /// Demand standard deviation as a share of mean demand
    pub demand_std_ratio: f64,

    pub peak_season_factor: f64,
    pub promotion_factor: f64,

    /// Annual inventory turns
    pub turnover_rate: f64,
    pub stockout_rate: f64,
    pub excess_stock_rate: f64,

    pub stockouts_after_reorder_point: f64,
    pub reorder_point_hits: f64,

    pub regular_demand: f64,
    pub promotion_demand: f64,
    pub holiday_demand: f64,

    pub stock_cover_jitter: JitterRange,
    pub imbalance_jitter: JitterRange,
    pub volatility_jitter: JitterRange,
}

impl Default for StockPolicy {
    fn default() -> Self {
        StockPolicy {
            cover_lower_bound: 30.0,
            cover_upper_bound: 60.0,
            average_stockout_days: 5.0,
            max_stockout_days: 10.0,
            lead_time_days: 7.0,
            demand_std_ratio: 0.2,
            peak_season_factor: 0.5,
            promotion_factor: 0.3,
            turnover_rate: 6.0,
            stockout_rate: 0.1,
            excess_stock_rate: 0.2,
            stockouts_after_reorder_point: 2.0,
            reorder_point_hits: 10.0,
            regular_demand: 10.0,
            promotion_demand: 15.0,
            holiday_demand: 12.0,
            stock_cover_jitter: JitterRange::new(0.8, 1.2),
            imbalance_jitter: JitterRange::new(-10.0, 10.0),
            volatility_jitter: JitterRange::new(0.7, 1.3),
        }
    }
}

impl StockPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.cover_lower_bound > self.cover_upper_bound {
            return Err(format!(
                "stock cover band is inverted: [{}, {}]",
                self.cover_lower_bound, self.cover_upper_bound
            ));
        }
        for (name, range) in [
            ("stock_cover_jitter", self.stock_cover_jitter),
            ("imbalance_jitter", self.imbalance_jitter),
            ("volatility_jitter", self.volatility_jitter),
        ] {
            if range.min > range.max {
                return Err(format!("{name} range is inverted: [{}, {}]", range.min, range.max));
            }
        }
        Ok(())
    }
}

/// Which history series a [`HistorySource`] is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMetric {
    StockCover,
    ImbalanceScore,
    DemandVolatility,
}

/// Supplies the 30-day trail of a metric, oldest first, given its `current` value.
///
/// Entries need not equal `current`, the last one included.
pub trait HistorySource {
    fn history(&mut self, metric: HistoryMetric, current: f64, days: usize) -> Vec<f64>;
}

/// Chart filler: the current value jittered within the policy ranges.
///
/// These are not observed values.
pub struct SyntheticHistory<R: Rng = StdRng> {
    rng: R,
    stock_cover_jitter: JitterRange,
    imbalance_jitter: JitterRange,
    volatility_jitter: JitterRange,
}

impl SyntheticHistory<StdRng> {
    pub fn seeded(seed: Option<u64>, policy: &StockPolicy) -> Self {
        SyntheticHistory::new(seeded_rng(seed), policy)
    }
}

impl<R: Rng> SyntheticHistory<R> {
    pub fn new(rng: R, policy: &StockPolicy) -> Self {
        SyntheticHistory {
            rng,
            stock_cover_jitter: policy.stock_cover_jitter,
            imbalance_jitter: policy.imbalance_jitter,
            volatility_jitter: policy.volatility_jitter,
        }
    }
}

impl<R: Rng> HistorySource for SyntheticHistory<R> {
    fn history(&mut self, metric: HistoryMetric, current: f64, days: usize) -> Vec<f64> {
        let (range, multiplicative) = match metric {
            HistoryMetric::StockCover => (self.stock_cover_jitter, true),
            HistoryMetric::ImbalanceScore => (self.imbalance_jitter, false),
            HistoryMetric::DemandVolatility => (self.volatility_jitter, true),
        };

        (0..days)
            .map(|_| {
                let jitter = range.draw(&mut self.rng);
                if multiplicative {
                    current * jitter
                } else {
                    current + jitter
                }
            })
            .collect()
    }
}

/// Signed distance of `stock_cover` from the policy band; 0 inside it
pub fn imbalance_score(stock_cover: f64, policy: &StockPolicy) -> f64 {
    if stock_cover < policy.cover_lower_bound {
        stock_cover - policy.cover_lower_bound
    } else if stock_cover > policy.cover_upper_bound {
        stock_cover - policy.cover_upper_bound
    } else {
        0.0
    }
}

/// Daily demand estimate: stock on hand spread over the whole days since restock
pub fn demand_rolling_mean(item: &InventorySnapshot, now: DateTime<Utc>) -> f64 {
    let days = (now - item.last_restocked).num_days();
    if days > 0 {
        item.quantity as f64 / days as f64
    } else {
        0.0
    }
}

pub struct StockAnalyzer<H: HistorySource> {
    policy: StockPolicy,
    history: H,
}

impl StockAnalyzer<SyntheticHistory> {
    pub fn with_synthetic_history(policy: StockPolicy, seed: Option<u64>) -> Self {
        let history = SyntheticHistory::seeded(seed, &policy);
        StockAnalyzer::new(policy, history)
    }
}

impl<H: HistorySource> StockAnalyzer<H> {
    pub fn new(policy: StockPolicy, history: H) -> Self {
        StockAnalyzer { policy, history }
    }

    pub fn policy(&self) -> &StockPolicy {
        &self.policy
    }

    /// Analyze the snapshot as of now
    pub fn analyze(&mut self, items: &[InventorySnapshot]) -> StockAnalysis {
        self.analyze_at(items, Utc::now())
    }

    #[instrument(skip(self, items), fields(items = items.len()))]
    pub fn analyze_at(&mut self, items: &[InventorySnapshot], now: DateTime<Utc>) -> StockAnalysis {
        if items.is_empty() {
            debug!("empty inventory, returning zeroed analysis");
            return StockAnalysis::empty();
        }

        let rolling_means: Vec<f64> = items.iter().map(|item| demand_rolling_mean(item, now)).collect();
        let demand_mean = mean(&rolling_means);
        let demand_std = demand_mean * self.policy.demand_std_ratio;

        let stock_cover = self.stock_cover(items, demand_mean);
        let imbalance = imbalance_score(stock_cover, &self.policy);
        let stockout_risk = self.stockout_risk(items, demand_mean, demand_std);
        let demand_volatility = self.demand_volatility(demand_mean, demand_std);

        let stock_cover_history = self
            .history
            .history(HistoryMetric::StockCover, stock_cover, HISTORY_DAYS);
        let imbalance_score_history = self
            .history
            .history(HistoryMetric::ImbalanceScore, imbalance, HISTORY_DAYS);
        let demand_volatility_history = self
            .history
            .history(HistoryMetric::DemandVolatility, demand_volatility, HISTORY_DAYS);
        let stockout_risk_history = self.stockout_risk_history(items, &rolling_means);

        debug!(stock_cover, imbalance, stockout_risk, demand_volatility, "stock analysis complete");

        StockAnalysis {
            stock_cover,
            imbalance_score: imbalance,
            stockout_risk,
            demand_volatility,
            stock_efficiency: self.stock_efficiency(),
            reorder_point_effectiveness: self.reorder_point_effectiveness(),
            promotion_sensitivity: self.promotion_sensitivity(),
            holiday_impact: self.holiday_impact(),
            stock_cover_history,
            imbalance_score_history,
            demand_volatility_history,
            stockout_risk_history,
        }
    }

    /// Mean days of cover per item at the fleet-wide demand rate
    fn stock_cover(&self, items: &[InventorySnapshot], demand_mean: f64) -> f64 {
        if demand_mean <= 0.0 {
            return 0.0;
        }
        let covers: Vec<f64> = items
            .iter()
            .map(|item| safe_div(item.quantity as f64, demand_mean))
            .collect();
        mean(&covers)
    }

    fn stockout_risk(&self, items: &[InventorySnapshot], demand_mean: f64, demand_std: f64) -> f64 {
        let p = &self.policy;
        let stockout_term = 0.4 * safe_div(p.average_stockout_days, p.max_stockout_days);
        let variability_term = 0.3 * safe_div(demand_std, demand_mean);
        let lead_time_term = 0.1 * (-safe_div(1.0, p.lead_time_days)).exp();

        let risks: Vec<f64> = items
            .iter()
            .map(|item| {
                let stock_ratio = safe_div(item.quantity as f64, item.reorder_level as f64);
                stockout_term + variability_term + 0.2 * (1.0 - stock_ratio) + lead_time_term
            })
            .collect();
        mean(&risks)
    }

    fn demand_volatility(&self, demand_mean: f64, demand_std: f64) -> f64 {
        safe_div(demand_std, demand_mean)
            * (1.0 + 0.5 * self.policy.peak_season_factor)
            * (1.0 + 0.3 * self.policy.promotion_factor)
    }

    /// Day `d` (1..=30) divides each item's rolling mean by `d`
    fn stockout_risk_history(&self, items: &[InventorySnapshot], rolling_means: &[f64]) -> Vec<f64> {
        let variability_term = 0.3 * self.policy.demand_std_ratio;

        (1..=HISTORY_DAYS)
            .map(|day| {
                let risks: Vec<f64> = items
                    .iter()
                    .zip(rolling_means)
                    .map(|(item, rolling_mean)| {
                        let quantity = item.quantity as f64;
                        let day_demand = rolling_mean / day as f64;
                        let cover = safe_div(quantity, day_demand);
                        let stock_ratio = safe_div(quantity, item.reorder_level as f64);
                        0.4 * cover + variability_term + 0.2 * (1.0 - stock_ratio)
                    })
                    .collect();
                mean(&risks)
            })
            .collect()
    }

    fn stock_efficiency(&self) -> f64 {
        let p = &self.policy;
        0.4 * (p.turnover_rate / 12.0).min(1.0)
            + 0.3 * (1.0 - p.stockout_rate)
            + 0.3 * (1.0 - p.excess_stock_rate)
    }

    fn reorder_point_effectiveness(&self) -> f64 {
        1.0 - safe_div(self.policy.stockouts_after_reorder_point, self.policy.reorder_point_hits)
    }

    fn promotion_sensitivity(&self) -> f64 {
        demand_uplift(self.policy.promotion_demand, self.policy.regular_demand)
    }

    fn holiday_impact(&self) -> f64 {
        demand_uplift(self.policy.holiday_demand, self.policy.regular_demand)
    }
}

fn demand_uplift(event_demand: f64, regular_demand: f64) -> f64 {
    if regular_demand == 0.0 {
        0.0
    } else {
        event_demand / regular_demand - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn item(id: &str, quantity: u32, reorder_level: u32, days_ago: i64) -> InventorySnapshot {
        InventorySnapshot {
            product_id: id.to_string(),
            category: "General".to_string(),
            quantity,
            reorder_level,
            last_restocked: now() - Duration::days(days_ago),
        }
    }

    /// History source that repeats the current value, for exact assertions
    struct FlatHistory;

    impl HistorySource for FlatHistory {
        fn history(&mut self, _metric: HistoryMetric, current: f64, days: usize) -> Vec<f64> {
            vec![current; days]
        }
    }

    fn analyzer() -> StockAnalyzer<FlatHistory> {
        StockAnalyzer::new(StockPolicy::default(), FlatHistory)
    }

    #[test]
    fn test_rolling_mean_uses_whole_days() {
        assert_eq!(demand_rolling_mean(&item("A", 100, 10, 10), now()), 10.0);
        assert_eq!(demand_rolling_mean(&item("A", 100, 10, 0), now()), 0.0);

        let mut partial = item("A", 90, 10, 3);
        partial.last_restocked -= Duration::hours(20);
        assert_eq!(demand_rolling_mean(&partial, now()), 30.0);
    }

    #[test]
    fn test_imbalance_band() {
        let policy = StockPolicy::default();
        assert_eq!(imbalance_score(20.0, &policy), -10.0);
        assert_eq!(imbalance_score(75.0, &policy), 15.0);
        assert_eq!(imbalance_score(30.0, &policy), 0.0);
        assert_eq!(imbalance_score(45.0, &policy), 0.0);
        assert_eq!(imbalance_score(60.0, &policy), 0.0);
    }

    #[test]
    fn test_single_item_metrics() {
        // 100 units over 10 days: rolling mean 10/day, cover 10 days
        let analysis = analyzer().analyze_at(&[item("A", 100, 50, 10)], now());

        assert_eq!(analysis.stock_cover, 10.0);
        assert_eq!(analysis.imbalance_score, -20.0);

        let expected_risk = 0.4 * 0.5 + 0.3 * 0.2 + 0.2 * (1.0 - 2.0) + 0.1 * (-1.0_f64 / 7.0).exp();
        assert!((analysis.stockout_risk - expected_risk).abs() < 1e-12);

        let expected_volatility = 0.2 * 1.25 * 1.09;
        assert!((analysis.demand_volatility - expected_volatility).abs() < 1e-12);
    }

    #[test]
    fn test_placeholder_scores() {
        let analysis = analyzer().analyze_at(&[item("A", 10, 5, 2)], now());

        assert!((analysis.stock_efficiency - 0.71).abs() < 1e-12);
        assert!((analysis.reorder_point_effectiveness - 0.8).abs() < 1e-12);
        assert!((analysis.promotion_sensitivity - 0.5).abs() < 1e-12);
        assert!((analysis.holiday_impact - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_empty_inventory_is_all_zero() {
        let analysis = analyzer().analyze_at(&[], now());
        assert_eq!(analysis, StockAnalysis::empty());
    }

    #[test]
    fn test_fresh_restock_guards_every_division() {
        // Restocked today with no reorder level: every denominator is zero
        let analysis = analyzer().analyze_at(&[item("A", 25, 0, 0)], now());

        assert_eq!(analysis.stock_cover, 0.0);
        assert_eq!(analysis.imbalance_score, -30.0);
        assert_eq!(analysis.demand_volatility, 0.0);
        assert!(analysis.stockout_risk.is_finite());
        assert!(analysis.stockout_risk_history.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_stockout_history_is_day_indexed() {
        let analysis = analyzer().analyze_at(&[item("A", 100, 50, 10)], now());
        let history = &analysis.stockout_risk_history;

        assert_eq!(history.len(), HISTORY_DAYS);
        // Day 1: cover 10 -> 0.4*10 + 0.06 + 0.2*(1-2)
        assert!((history[0] - 3.86).abs() < 1e-9);
        // Day d: cover 10*d
        assert!((history[29] - (0.4 * 300.0 + 0.06 - 0.2)).abs() < 1e-9);
        assert!(history.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_stockout_history_keeps_fractional_stock_ratio() {
        // 100 / 30 is 3.33, not 3
        let analysis = analyzer().analyze_at(&[item("A", 100, 30, 10)], now());
        let expected = 0.4 * 10.0 + 0.06 + 0.2 * (1.0 - 100.0 / 30.0);
        assert!((analysis.stockout_risk_history[0] - expected).abs() < 1e-9);
        assert!((analysis.stockout_risk_history[0] - 3.5933).abs() < 1e-4);
    }

    #[test]
    fn test_synthetic_history_stays_in_jitter_range() {
        let mut analyzer = StockAnalyzer::with_synthetic_history(StockPolicy::default(), Some(17));
        let analysis = analyzer.analyze_at(&[item("A", 100, 50, 10), item("B", 400, 80, 5)], now());

        let eps = 1e-9;
        assert_eq!(analysis.stock_cover_history.len(), HISTORY_DAYS);
        for v in &analysis.stock_cover_history {
            assert!(*v >= analysis.stock_cover * 0.8 - eps && *v <= analysis.stock_cover * 1.2 + eps);
        }
        for v in &analysis.imbalance_score_history {
            assert!((*v - analysis.imbalance_score).abs() <= 10.0 + eps);
        }
        let volatility = analysis.demand_volatility;
        for v in &analysis.demand_volatility_history {
            assert!(*v >= volatility * 0.7 - eps && *v <= volatility * 1.3 + eps);
        }
    }

    #[test]
    fn test_policy_validation() {
        let mut policy = StockPolicy::default();
        assert!(policy.validate().is_ok());
        policy.cover_lower_bound = 90.0;
        assert!(policy.validate().is_err());

        let mut policy = StockPolicy::default();
        policy.volatility_jitter = JitterRange::new(1.3, 0.7);
        assert!(policy.validate().is_err());
    }
}
