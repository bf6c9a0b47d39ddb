//! Read contracts the analytics core consumes from the persistence layer,
//! plus an in-memory implementation for demos and tests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::SourceError;
use crate::models::{CategoryDemandStat, DemandHistoryRecord, InventorySnapshot};

#[async_trait]
pub trait CategoryDemandSource: Send + Sync {
    async fn category_demand_stats(&self) -> Result<Vec<CategoryDemandStat>, SourceError>;
}

#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn inventory_snapshot(&self) -> Result<Vec<InventorySnapshot>, SourceError>;

    async fn inventory_item(&self, product_id: &str) -> Result<Option<InventorySnapshot>, SourceError>;
}

#[async_trait]
pub trait DemandHistorySource: Send + Sync {
    /// At most `limit` records for the product, newest first
    async fn recent_demand_history(
        &self,
        product_id: &str,
        limit: usize,
    ) -> Result<Vec<DemandHistoryRecord>, SourceError>;
}

#[derive(Default)]
pub struct InMemoryRepository {
    category_stats: RwLock<Vec<CategoryDemandStat>>,
    inventory: RwLock<Vec<InventorySnapshot>>,
    demand_history: RwLock<Vec<DemandHistoryRecord>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by category name
    pub async fn upsert_category_stat(&self, stat: CategoryDemandStat) {
        let mut stats = self.category_stats.write().await;
        match stats.iter_mut().find(|s| s.category_name == stat.category_name) {
            Some(existing) => *existing = stat,
            None => stats.push(stat),
        }
    }

    /// Insert or replace by product id
    pub async fn upsert_item(&self, item: InventorySnapshot) {
        let mut inventory = self.inventory.write().await;
        match inventory.iter_mut().find(|i| i.product_id == item.product_id) {
            Some(existing) => *existing = item,
            None => inventory.push(item),
        }
    }

    pub async fn record_demand(&self, record: DemandHistoryRecord) {
        self.demand_history.write().await.push(record);
    }
}

#[async_trait]
impl CategoryDemandSource for InMemoryRepository {
    async fn category_demand_stats(&self) -> Result<Vec<CategoryDemandStat>, SourceError> {
        Ok(self.category_stats.read().await.clone())
    }
}

#[async_trait]
impl InventorySource for InMemoryRepository {
    async fn inventory_snapshot(&self) -> Result<Vec<InventorySnapshot>, SourceError> {
        Ok(self.inventory.read().await.clone())
    }

    async fn inventory_item(&self, product_id: &str) -> Result<Option<InventorySnapshot>, SourceError> {
        Ok(self
            .inventory
            .read()
            .await
            .iter()
            .find(|i| i.product_id == product_id)
            .cloned())
    }
}

#[async_trait]
impl DemandHistorySource for InMemoryRepository {
    async fn recent_demand_history(
        &self,
        product_id: &str,
        limit: usize,
    ) -> Result<Vec<DemandHistoryRecord>, SourceError> {
        let history = self.demand_history.read().await;
        let mut records: Vec<DemandHistoryRecord> = history
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date));
        records.truncate(limit);
        Ok(records)
    }
}
