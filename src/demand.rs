//! Demand draw module
//! Turns category statistics and a scenario into clamped daily draws and trial totals

use rand::distributions::Distribution;
use rand::Rng;
use crate::models::{CategoryDemandStat, Scenario};
use crate::variate::{GaussianMethod, GaussianVariate};

/// Sampling distribution for one category under a scenario
/// Growth scales the mean, the economic shift scales the spread
pub fn scenario_variate(
    stat: &CategoryDemandStat,
    scenario: &Scenario,
    method: GaussianMethod,
) -> GaussianVariate {
    GaussianVariate::new(
        stat.avg_demand * scenario.demand_growth_factor,
        stat.demand_std_dev * scenario.economic_shift_factor,
        method,
    )
}

/// Simulated demand for a single day, never negative
pub fn daily_demand<R: Rng + ?Sized>(variate: &GaussianVariate, rng: &mut R) -> f64 {
    variate.sample(rng).max(0.0)
}

/// Total demand of one trial over `days` independent days
pub fn trial_demand<R: Rng + ?Sized>(variate: &GaussianVariate, days: usize, rng: &mut R) -> f64 {
    (0..days).map(|_| daily_demand(variate, rng)).sum()
}
