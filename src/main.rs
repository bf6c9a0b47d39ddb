use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Local, Utc};
use tracing::error;

use inventory_analytics::logging;
use inventory_analytics::reporting::{
    display_distributions, display_forecast, display_scenario_comparison, display_stock_analysis,
};
use inventory_analytics::{
    AnalyticsConfig, AnalyticsError, AnalyticsService, CategoryDemandStat, DemandHistoryRecord,
    InMemoryRepository, InventorySnapshot, RollingMeanScorer, Scenario,
};

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(err) = run().await {
        error!(error = %err, "analytics demo failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AnalyticsError> {
    let config = AnalyticsConfig::load()?;
    let repo = Arc::new(demo_repository().await);
    let scorer = Arc::new(RollingMeanScorer::new(config.forecast.normalization.clone()));
    let days = config.simulation.days;

    let service = AnalyticsService::new(repo.clone(), repo.clone(), repo.clone(), scorer, config);

    println!("╔══════════════════════════════════════════════════════════════════════════════╗");
    println!("║                       INVENTORY ANALYTICS DASHBOARD                          ║");
    println!("╚══════════════════════════════════════════════════════════════════════════════╝");

    // The three dashboard panels are independent
    let (comparison, distributions, analysis, forecast) = tokio::join!(
        service.compare_scenarios(None, None),
        service.simulate_category_distributions(Some(Scenario::neutral()), None, None),
        service.analyze_stock(),
        service.forecast_product("SMARTPHONE"),
    );

    display_scenario_comparison(&comparison?, days);
    display_distributions(&distributions?, &stock_by_category(&repo).await);
    display_stock_analysis(&analysis?);
    display_forecast("SMARTPHONE", &forecast?);

    Ok(())
}

/// Units on hand per category
async fn stock_by_category(repo: &InMemoryRepository) -> HashMap<String, f64> {
    use inventory_analytics::InventorySource;

    let mut totals = HashMap::new();
    if let Ok(items) = repo.inventory_snapshot().await {
        for item in items {
            *totals.entry(item.category).or_insert(0.0) += item.quantity as f64;
        }
    }
    totals
}

async fn demo_repository() -> InMemoryRepository {
    let repo = InMemoryRepository::new();

    let categories = [
        ("Electronics", 42.0, 9.0),
        ("Clothing", 65.0, 14.0),
        ("Books", 28.0, 5.0),
        ("Home & Garden", 19.0, 6.5),
        ("Sports", 23.0, 7.0),
    ];
    for (name, avg, std) in categories {
        repo.upsert_category_stat(CategoryDemandStat::new(name, avg, std)).await;
    }

    // (product, category, quantity, reorder level, days since restock)
    let items = [
        ("SMARTPHONE", "Electronics", 480, 120, 12),
        ("LAPTOP", "Electronics", 210, 60, 20),
        ("HEADPHONES", "Electronics", 650, 150, 9),
        ("T-SHIRT", "Clothing", 1_200, 300, 14),
        ("JACKET", "Clothing", 340, 90, 25),
        ("NOVEL", "Books", 520, 100, 18),
        ("TEXTBOOK", "Books", 180, 40, 30),
        ("PLANT-POT", "Home & Garden", 260, 50, 11),
        ("LAMP", "Home & Garden", 95, 30, 6),
        ("YOGA-MAT", "Sports", 310, 70, 16),
        ("WEIGHTS", "Sports", 140, 35, 27),
    ];
    let now = Utc::now();
    for (product_id, category, quantity, reorder_level, days_ago) in items {
        repo.upsert_item(InventorySnapshot {
            product_id: product_id.to_string(),
            category: category.to_string(),
            quantity,
            reorder_level,
            last_restocked: now - Duration::days(days_ago),
        })
        .await;
    }

    let today = Local::now().date_naive();
    for (days_ago, quantity) in [(1, 38), (2, 44), (3, 41), (4, 35)] {
        repo.record_demand(DemandHistoryRecord {
            product_id: "SMARTPHONE".to_string(),
            date: today - Duration::days(days_ago),
            quantity,
        })
        .await;
    }

    repo
}
