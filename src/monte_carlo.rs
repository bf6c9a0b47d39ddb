//! Monte Carlo demand simulation and statistical analysis module

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::demand::{scenario_variate, trial_demand};
use crate::error::AnalyticsError;
use crate::models::{mean, population_std_dev, CategoryDemandStat, CategoryDistribution, Scenario};
use crate::variate::{seeded_rng, GaussianMethod};

pub const DEFAULT_TRIALS: usize = 1000;
pub const DEFAULT_DAYS: usize = 30;

/// Estimates aggregate category demand by repeated stochastic trials
pub struct DemandSimulator<R: Rng = StdRng> {
    rng: R,
    method: GaussianMethod,
}

impl DemandSimulator<StdRng> {
    /// Simulator over a `StdRng`; a fixed seed makes every run reproducible
    pub fn seeded(seed: Option<u64>, method: GaussianMethod) -> Self {
        DemandSimulator::new(seeded_rng(seed), method)
    }
}

impl<R: Rng> DemandSimulator<R> {
    pub fn new(rng: R, method: GaussianMethod) -> Self {
        DemandSimulator { rng, method }
    }

    /// Mean total demand over `days` for every category, across `num_trials` trials.
    ///
    /// All statistics are validated before sampling starts, so an invalid
    /// entry fails the whole call without partial results.
    pub fn simulate_category_demand(
        &mut self,
        stats: &[CategoryDemandStat],
        scenario: &Scenario,
        num_trials: usize,
        days: usize,
    ) -> Result<HashMap<String, f64>, AnalyticsError> {
        validate_inputs(stats, scenario)?;

        let mut estimates = HashMap::with_capacity(stats.len());
        for stat in stats {
            let trial_sums = self.run_trials(stat, scenario, num_trials, days);
            let estimate = mean(&trial_sums);
            debug!(
                category = %stat.category_name,
                num_trials,
                days,
                estimate,
                "simulated category demand"
            );
            estimates.insert(stat.category_name.clone(), estimate);
        }

        Ok(estimates)
    }

    /// Full distribution of trial totals for every category
    pub fn simulate_category_distributions(
        &mut self,
        stats: &[CategoryDemandStat],
        scenario: &Scenario,
        num_trials: usize,
        days: usize,
    ) -> Result<Vec<CategoryDistribution>, AnalyticsError> {
        validate_inputs(stats, scenario)?;

        Ok(stats
            .iter()
            .map(|stat| {
                let trial_sums = self.run_trials(stat, scenario, num_trials, days);
                summarize(&stat.category_name, trial_sums, days)
            })
            .collect())
    }

    fn run_trials(
        &mut self,
        stat: &CategoryDemandStat,
        scenario: &Scenario,
        num_trials: usize,
        days: usize,
    ) -> Vec<f64> {
        let variate = scenario_variate(stat, scenario, self.method);
        let mut trial_sums = Vec::with_capacity(num_trials);

        for _ in 0..num_trials {
            trial_sums.push(trial_demand(&variate, days, &mut self.rng));
        }

        trial_sums
    }
}

fn validate_inputs(stats: &[CategoryDemandStat], scenario: &Scenario) -> Result<(), AnalyticsError> {
    scenario.validate()?;
    stats.iter().try_for_each(CategoryDemandStat::validate)
}

/// Calculate summary statistics over the trial totals
fn summarize(category_name: &str, mut trial_sums: Vec<f64>, days: usize) -> CategoryDistribution {
    trial_sums.sort_by(|a, b| a.total_cmp(b));

    let mean_demand = mean(&trial_sums);
    let std_dev_demand = population_std_dev(&trial_sums);

    let min_demand = trial_sums.first().copied().unwrap_or(0.0);
    let max_demand = trial_sums.last().copied().unwrap_or(0.0);

    // Nearest-rank percentiles
    let percentile = |p: f64| {
        if trial_sums.is_empty() {
            return 0.0;
        }
        let index = ((p / 100.0) * (trial_sums.len() as f64 - 1.0)).round() as usize;
        trial_sums[index.min(trial_sums.len() - 1)]
    };

    CategoryDistribution {
        category_name: category_name.to_string(),
        num_trials: trial_sums.len(),
        days,
        mean_demand,
        std_dev_demand,
        min_demand,
        max_demand,
        percentile_10: percentile(10.0),
        percentile_25: percentile(25.0),
        percentile_50: percentile(50.0),
        percentile_75: percentile(75.0),
        percentile_90: percentile(90.0),
        trial_sums,
    }
}

/// Percentage of trials whose demand exceeds `stock_level`
pub fn stockout_probability(trial_sums: &[f64], stock_level: f64) -> f64 {
    if trial_sums.is_empty() {
        return 0.0;
    }
    let stockouts = trial_sums.iter().filter(|&&demand| demand > stock_level).count();
    stockouts as f64 / trial_sums.len() as f64 * 100.0
}

impl CategoryDistribution {
    /// Chance, in percent, that holding `stock_level` units runs out over the period
    pub fn stockout_probability(&self, stock_level: f64) -> f64 {
        stockout_probability(&self.trial_sums, stock_level)
    }
}
