//! End-to-end tests of the analytics service over the in-memory repository.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate, TimeZone, Utc};

use inventory_analytics::features::{index, FEATURE_COUNT};
use inventory_analytics::logging;
use inventory_analytics::{
    AnalyticsConfig, AnalyticsError, AnalyticsService, CategoryDemandSource, CategoryDemandStat,
    DemandHistoryRecord, DemandScorer, InMemoryRepository, InventorySnapshot, Scenario, ScoreError,
    ScorerInput, SourceError,
};

fn seeded_config(seed: u64) -> AnalyticsConfig {
    let mut config = AnalyticsConfig::default();
    config.simulation.seed = Some(seed);
    config
}

/// Echoes the normalized first demand lag back as the prediction
struct LagScorer;

#[async_trait]
impl DemandScorer for LagScorer {
    async fn score(&self, input: &ScorerInput) -> Result<f64, ScoreError> {
        Ok(input.features.get(index::DEMAND_LAG1) as f64 * 1000.0)
    }
}

/// Fails every third call
struct FlakyScorer {
    calls: AtomicUsize,
}

#[async_trait]
impl DemandScorer for FlakyScorer {
    async fn score(&self, input: &ScorerInput) -> Result<f64, ScoreError> {
        let day = (input.features.get(index::DAY_OF_YEAR) * 366.0).round() as u32;
        self.calls.fetch_add(1, Ordering::SeqCst);
        if day % 3 == 0 {
            Err(ScoreError::Inference(format!("no output for day {day}")))
        } else {
            Ok(day as f64)
        }
    }
}

/// Keeps every input it is asked to score
#[derive(Default)]
struct RecordingScorer {
    seen: Mutex<Vec<ScorerInput>>,
}

#[async_trait]
impl DemandScorer for RecordingScorer {
    async fn score(&self, input: &ScorerInput) -> Result<f64, ScoreError> {
        self.seen.lock().unwrap().push(input.clone());
        Ok(1.0)
    }
}

struct BrokenCategories;

#[async_trait]
impl CategoryDemandSource for BrokenCategories {
    async fn category_demand_stats(&self) -> Result<Vec<CategoryDemandStat>, SourceError> {
        Err(SourceError::Unavailable("category_demand table locked".to_string()))
    }
}

async fn repository() -> Arc<InMemoryRepository> {
    let repo = InMemoryRepository::new();
    repo.upsert_category_stat(CategoryDemandStat::new("Electronics", 500.0, 50.0)).await;
    repo.upsert_category_stat(CategoryDemandStat::new("Books", 12.0, 4.0)).await;

    repo.upsert_item(InventorySnapshot {
        product_id: "P1".to_string(),
        category: "Electronics".to_string(),
        quantity: 300,
        reorder_level: 100,
        last_restocked: Utc::now() - Duration::days(10),
    })
    .await;

    let today = Local::now().date_naive();
    for (days_ago, quantity) in [(1, 30), (2, 20), (3, 10), (4, 99)] {
        repo.record_demand(DemandHistoryRecord {
            product_id: "P1".to_string(),
            date: today - Duration::days(days_ago),
            quantity,
        })
        .await;
    }

    Arc::new(repo)
}

fn service(repo: Arc<InMemoryRepository>, scorer: Arc<dyn DemandScorer>, config: AnalyticsConfig) -> AnalyticsService {
    AnalyticsService::new(repo.clone(), repo.clone(), repo, scorer, config)
}

#[tokio::test]
async fn simulation_lands_in_expected_band() {
    logging::init_test();
    let svc = service(repository().await, Arc::new(LagScorer), seeded_config(2024));

    let estimates = svc.simulate_category_demand(None, Some(1000), Some(30)).await.unwrap();

    let electronics = estimates["Electronics"];
    assert!(
        (500.0 * 30.0 * 0.9..=500.0 * 30.0 * 1.1).contains(&electronics),
        "estimate out of band: {electronics}"
    );
    assert!(estimates["Books"] >= 0.0);
}

#[tokio::test]
async fn seeded_simulation_is_reproducible() {
    let repo = repository().await;
    let a = service(repo.clone(), Arc::new(LagScorer), seeded_config(5));
    let b = service(repo, Arc::new(LagScorer), seeded_config(5));

    let first = a.simulate_category_demand(Some(Scenario::worst_case()), Some(200), None).await.unwrap();
    let second = b.simulate_category_demand(Some(Scenario::worst_case()), Some(200), None).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn best_case_beats_worst_case() {
    let svc = service(repository().await, Arc::new(LagScorer), seeded_config(77));

    let comparison = svc.compare_scenarios(Some(2000), Some(30)).await.unwrap();

    for category in ["Electronics", "Books"] {
        assert!(comparison.best_case[category] > comparison.worst_case[category]);
        assert!(comparison.best_case[category] > comparison.neutral[category]);
        assert!(comparison.neutral[category] > comparison.worst_case[category]);
    }
}

#[tokio::test]
async fn distributions_expose_stockout_probability() {
    let svc = service(repository().await, Arc::new(LagScorer), seeded_config(3));

    let distributions = svc.simulate_category_distributions(None, Some(500), Some(30)).await.unwrap();
    let electronics = distributions.iter().find(|d| d.category_name == "Electronics").unwrap();

    assert_eq!(electronics.stockout_probability(0.0), 100.0);
    assert_eq!(electronics.stockout_probability(electronics.max_demand), 0.0);
}

#[tokio::test]
async fn upstream_failure_is_fatal() {
    let repo = repository().await;
    let svc = AnalyticsService::new(
        Arc::new(BrokenCategories),
        repo.clone(),
        repo,
        Arc::new(LagScorer),
        seeded_config(1),
    );

    let result = svc.simulate_category_demand(None, None, None).await;
    assert!(matches!(
        result,
        Err(AnalyticsError::DataSource {
            source: SourceError::Unavailable(_),
            ..
        })
    ));
}

#[tokio::test]
async fn stock_analysis_on_empty_inventory_is_zero() {
    let svc = service(Arc::new(InMemoryRepository::new()), Arc::new(LagScorer), seeded_config(1));

    let analysis = svc.analyze_stock().await.unwrap();

    assert_eq!(analysis.stock_cover, 0.0);
    assert_eq!(analysis.imbalance_score, 0.0);
    assert_eq!(analysis.stockout_risk, 0.0);
    assert_eq!(analysis.demand_volatility, 0.0);
    assert_eq!(analysis.stock_efficiency, 0.0);
    for series in [
        &analysis.stock_cover_history,
        &analysis.imbalance_score_history,
        &analysis.demand_volatility_history,
        &analysis.stockout_risk_history,
    ] {
        assert_eq!(series.len(), 30);
        assert!(series.iter().all(|v| *v == 0.0));
    }
}

#[tokio::test]
async fn stock_analysis_over_inventory() {
    let svc = service(repository().await, Arc::new(LagScorer), seeded_config(1));
    let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

    // Well past the restock date, so the rolling mean stays positive
    let analysis = svc.analyze_stock_at(now).await.unwrap();

    assert!(analysis.stock_cover > 0.0);
    assert!(analysis.stockout_risk.is_finite());
    assert_eq!(analysis.stock_cover_history.len(), 30);
}

#[tokio::test]
async fn forecast_covers_thirty_consecutive_days_from_today() {
    let svc = service(repository().await, Arc::new(LagScorer), seeded_config(1));
    let today = Local::now().date_naive();

    let points = svc.forecast_product("P1").await.unwrap();

    assert_eq!(points.len(), 30);
    assert_eq!(points[0].date, today);
    for pair in points.windows(2) {
        assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
    }
    // Most recent demand was 30
    assert!(points.iter().all(|p| (p.predicted_demand.unwrap() - 30.0).abs() < 1e-3));
}

#[tokio::test]
async fn scorer_failures_only_void_their_day() {
    let scorer = Arc::new(FlakyScorer {
        calls: AtomicUsize::new(0),
    });
    let svc = service(repository().await, scorer.clone(), seeded_config(1));
    let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

    let points = svc.forecast_product_from("P1", start).await.unwrap();

    assert_eq!(points.len(), 30);
    assert_eq!(scorer.calls.load(Ordering::SeqCst), 30);
    for point in &points {
        let day = chrono::Datelike::ordinal(&point.date);
        if day % 3 == 0 {
            assert!(point.predicted_demand.is_none());
        } else {
            assert_eq!(point.predicted_demand, Some(day as f64));
        }
    }
}

#[tokio::test]
async fn unknown_product_forecast_is_all_absent() {
    let svc = service(repository().await, Arc::new(LagScorer), seeded_config(1));

    let points = svc.forecast_product("UNKNOWN").await.unwrap();

    assert_eq!(points.len(), 30);
    assert!(points.iter().all(|p| p.predicted_demand.is_none()));
}

#[tokio::test]
async fn scorer_receives_padded_sequence_of_configured_length() {
    let scorer = Arc::new(RecordingScorer::default());
    let mut config = seeded_config(1);
    config.forecast.sequence_length = 32;
    let svc = service(repository().await, scorer.clone(), config);

    svc.forecast_product("P1").await.unwrap();

    let seen = scorer.seen.lock().unwrap();
    assert_eq!(seen.len(), 30);
    for input in seen.iter() {
        assert_eq!(input.sequence.len(), 32);
        assert_eq!(input.attention_mask, vec![1.0; 32]);
        assert_eq!(&input.sequence[..FEATURE_COUNT], input.features.as_slice());
        assert!(input.sequence[FEATURE_COUNT..].iter().all(|v| *v == 0.0));
    }
}
