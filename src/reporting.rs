//! Reporting and output formatting module
//! Renders analytics results as a console dashboard

use std::collections::HashMap;

use crate::models::{CategoryDistribution, ForecastPoint, ScenarioComparison, StockAnalysis};

/// Display category estimates for the three scenarios side by side
pub fn display_scenario_comparison(comparison: &ScenarioComparison, days: usize) {
    println!("\n╔══════════════════════════════════════════════════════════════════════════════╗");
    println!("║                 CATEGORY DEMAND PROJECTION ({:>3}-DAY HORIZON)                  ║", days);
    println!("╚══════════════════════════════════════════════════════════════════════════════╝\n");

    println!("{:<20} {:>16} {:>16} {:>16}", "Category", "Worst case", "Neutral", "Best case");
    for category in sorted_keys(&comparison.neutral) {
        let value = |map: &HashMap<String, f64>| map.get(category).copied().unwrap_or(0.0);
        println!(
            "{:<20} {:>16.1} {:>16.1} {:>16.1}",
            category,
            value(&comparison.worst_case),
            value(&comparison.neutral),
            value(&comparison.best_case),
        );
    }
}

/// Display the spread of trial totals per category
pub fn display_distributions(distributions: &[CategoryDistribution], stock_levels: &HashMap<String, f64>) {
    println!("\nDemand Distribution (per {} trials):", distributions.first().map_or(0, |d| d.num_trials));

    let mut sorted: Vec<&CategoryDistribution> = distributions.iter().collect();
    sorted.sort_by(|a, b| a.category_name.cmp(&b.category_name));

    for d in sorted {
        println!(
            "  {}: Mean {:.1} ± {:.1} | Median {:.1} | 10th-90th [{:.1}, {:.1}]",
            d.category_name, d.mean_demand, d.std_dev_demand, d.percentile_50, d.percentile_10, d.percentile_90
        );
        if let Some(stock) = stock_levels.get(&d.category_name) {
            println!(
                "      Stock on hand {:.0} -> stockout probability {:.1}%",
                stock,
                d.stockout_probability(*stock)
            );
        }
    }
}

/// Display point-in-time stock health and the range of each history series
pub fn display_stock_analysis(analysis: &StockAnalysis) {
    println!("\n╔══════════════════════════════════════════════════════════════════════════════╗");
    println!("║                              STOCK HEALTH                                    ║");
    println!("╚══════════════════════════════════════════════════════════════════════════════╝\n");

    println!("  Stock Cover:                 {:>8.2} days", analysis.stock_cover);
    println!("  Imbalance Score:             {:>8.2}", analysis.imbalance_score);
    println!("  Stockout Risk:               {:>8.2}", analysis.stockout_risk);
    println!("  Demand Volatility:           {:>8.3}", analysis.demand_volatility);
    println!("  Stock Efficiency:            {:>8.2}", analysis.stock_efficiency);
    println!("  Reorder Point Effectiveness: {:>8.2}", analysis.reorder_point_effectiveness);
    println!("  Promotion Sensitivity:       {:>8.2}", analysis.promotion_sensitivity);
    println!("  Holiday Impact:              {:>8.2}", analysis.holiday_impact);

    println!("\n  30-day trend (min / max):");
    for (name, series) in [
        ("Stock cover", &analysis.stock_cover_history),
        ("Imbalance", &analysis.imbalance_score_history),
        ("Volatility", &analysis.demand_volatility_history),
        ("Stockout risk", &analysis.stockout_risk_history),
    ] {
        let (min, max) = range(series);
        println!("    {:<14} {:>10.2} / {:<10.2}", name, min, max);
    }
}

/// Display a product forecast, marking days without a prediction
pub fn display_forecast(product_id: &str, points: &[ForecastPoint]) {
    println!("\nForecast for {}:", product_id);
    for point in points {
        match point.predicted_demand {
            Some(value) => println!("  {}  {:>10.2}", point.date, value),
            None => println!("  {}  {:>10}", point.date, "n/a"),
        }
    }
}

fn sorted_keys(map: &HashMap<String, f64>) -> Vec<&String> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    keys
}

fn range(series: &[f64]) -> (f64, f64) {
    series
        .iter()
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((0.0, 0.0))
}
