// Repository trait for warehouse data access
use crate::domain::chart::MovingAverageRow;
use crate::domain::dataset::TabularResult;
use crate::domain::polling::HourlyUpdateFrequency;
use async_trait::async_trait;

#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    /// Run a fixed-window select and return the raw row set
    async fn query_rows(&self, query: &str) -> anyhow::Result<TabularResult>;

    /// Query the operation log aggregated by hour, oldest hour first
    async fn query_update_frequency(&self, query: &str) -> anyhow::Result<Vec<HourlyUpdateFrequency>>;

    /// Query the latest smoothed averages for one metric
    async fn query_moving_averages(
        &self,
        query: &str,
        metric: &str,
    ) -> anyhow::Result<Vec<MovingAverageRow>>;
}
