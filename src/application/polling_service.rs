// Polling service - realtime chart refresh and interval recalibration
use crate::application::warehouse_repository::WarehouseRepository;
use crate::domain::chart::{build_chart, ChartError, ChartFigure};
use crate::domain::polling::{clock_label, PollingState};
use crate::infrastructure::config::{prepare_query, QueryTemplates, RealtimeSettings};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

const MIN_STREAM_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum PollingError {
    #[error("unknown metric {0}")]
    UnknownMetric(String),

    #[error("operation log has no writes in the last 24 hours")]
    NoUpdateHistory,

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("warehouse query failed: {0:#}")]
    Query(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct IntervalUpdate {
    pub interval_ms: u64,
    pub label: String,
    pub state: PollingState,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveUpdate {
    pub metric: String,
    pub last_updated: String,
    pub figure: ChartFigure,
    pub state: PollingState,
}

#[derive(Clone)]
pub struct PollingService {
    repository: Arc<dyn WarehouseRepository>,
    settings: RealtimeSettings,
    queries: QueryTemplates,
}

impl PollingService {
    pub fn new(
        repository: Arc<dyn WarehouseRepository>,
        settings: RealtimeSettings,
        queries: QueryTemplates,
    ) -> Self {
        Self {
            repository,
            settings,
            queries,
        }
    }

    pub fn default_metric(&self) -> Option<&str> {
        self.settings.default_metric()
    }

    pub fn default_interval(&self) -> Duration {
        Duration::from_millis(self.settings.interval_ms)
    }

    /// Metric names are spliced into column names, so only configured ones pass
    pub fn check_metric(&self, metric: &str) -> Result<(), PollingError> {
        if self.settings.is_known_metric(metric) {
            Ok(())
        } else {
            Err(PollingError::UnknownMetric(metric.to_string()))
        }
    }

    /// Derive a new poll interval from the source's write history.
    /// Returns `Ok(None)` when the button has not actually been clicked.
    pub async fn recalibrate_interval(
        &self,
        clicks: Option<u64>,
        state: PollingState,
    ) -> Result<Option<IntervalUpdate>, PollingError> {
        if !matches!(clicks, Some(n) if n > 0) {
            return Ok(None);
        }

        let mut vars = HashMap::new();
        vars.insert("table".to_string(), self.settings.log_table.clone());
        let query = prepare_query(&self.queries.update_frequency, &vars);

        let hours = self.repository.query_update_frequency(&query).await?;
        if let Some(last) = hours.last() {
            tracing::debug!("Operation log covers {} hours up to {}", hours.len(), last.hour);
        }
        let next = state
            .recalibrated(&hours)
            .ok_or(PollingError::NoUpdateHistory)?;

        tracing::info!("Updating trigger interval to {}", next.interval_seconds);

        Ok(Some(IntervalUpdate {
            interval_ms: next.interval_ms(),
            label: next.interval_label(),
            state: next,
        }))
    }

    /// Query the latest smoothed rows for `metric` and rebuild the chart
    pub async fn refresh(&self, metric: &str, state: PollingState) -> Result<LiveUpdate, PollingError> {
        self.check_metric(metric)?;

        let mut vars = HashMap::new();
        vars.insert("metric".to_string(), metric.to_string());
        vars.insert("table".to_string(), self.settings.gold_table.clone());
        vars.insert("limit".to_string(), self.settings.row_limit.to_string());
        let query = prepare_query(&self.queries.moving_averages, &vars);

        let rows = self.repository.query_moving_averages(&query, metric).await?;
        let figure = build_chart(&rows, metric)?;

        // Rows arrive newest first
        let latest = rows
            .first()
            .map(|r| r.timestamp)
            .ok_or(ChartError::EmptyRows)?;
        let last_updated = clock_label(&latest);

        tracing::info!(
            "Updating chart with {}, last timestamp {}",
            metric,
            last_updated
        );

        Ok(LiveUpdate {
            metric: metric.to_string(),
            last_updated,
            figure,
            state: state.observed(latest),
        })
    }

    /// Refresh `metric` on every tick until the receiver is dropped.
    /// Failed ticks are logged and skipped.
    pub fn stream_updates(&self, metric: String, interval: Duration) -> mpsc::Receiver<LiveUpdate> {
        let (tx, rx) = mpsc::channel(4);
        let service = self.clone();
        let interval = interval.max(MIN_STREAM_INTERVAL);

        tokio::spawn(async move {
            let mut ticks = IntervalStream::new(tokio::time::interval(interval));
            let mut state = PollingState {
                interval_seconds: interval.as_secs(),
                last_timestamp: None,
            };

            while ticks.next().await.is_some() {
                if tx.is_closed() {
                    break;
                }

                match service.refresh(&metric, state.clone()).await {
                    Ok(update) => {
                        state = update.state.clone();
                        if tx.send(update).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Live refresh for {} failed: {}", metric, e),
                }
            }

            tracing::debug!("Live stream for {} closed", metric);
        });

        rx
    }
}
