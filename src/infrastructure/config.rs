use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub warehouse: WarehouseSettings,
    #[serde(default)]
    pub snapshots: SnapshotSettings,
    #[serde(default)]
    pub realtime: RealtimeSettings,
    #[serde(default = "default_datasets")]
    pub datasets: Vec<DatasetConfig>,
    #[serde(default)]
    pub queries: QueryTemplates,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            base_path: default_base_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WarehouseSettings {
    pub host: String,
    pub http_path: String,
    pub token: String,
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_secs: u32,
}

impl WarehouseSettings {
    /// The SQL warehouse id is the last segment of the HTTP path,
    /// e.g. `/sql/1.0/warehouses/abc123`
    pub fn warehouse_id(&self) -> Option<&str> {
        self.http_path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotBackend {
    Sqlite(PathBuf),
    SqliteInMemory,
    Memory,
}

impl SnapshotSettings {
    pub fn backend(&self) -> anyhow::Result<SnapshotBackend> {
        let url = self.database_url.trim();
        match url {
            "memory" => return Ok(SnapshotBackend::Memory),
            "sqlite::memory:" => return Ok(SnapshotBackend::SqliteInMemory),
            _ => {}
        }
        match url.strip_prefix("sqlite:///") {
            Some(path) if !path.is_empty() => Ok(SnapshotBackend::Sqlite(PathBuf::from(path))),
            _ => anyhow::bail!("unsupported snapshot database url: {}", url),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetricOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RealtimeSettings {
    #[serde(default = "default_metrics")]
    pub metrics: Vec<MetricOption>,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_row_limit")]
    pub row_limit: u32,
    #[serde(default = "default_gold_table")]
    pub gold_table: String,
    #[serde(default = "default_log_table")]
    pub log_table: String,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            metrics: default_metrics(),
            interval_ms: default_interval_ms(),
            row_limit: default_row_limit(),
            gold_table: default_gold_table(),
            log_table: default_log_table(),
        }
    }
}

impl RealtimeSettings {
    pub fn default_metric(&self) -> Option<&str> {
        self.metrics.first().map(|m| m.value.as_str())
    }

    pub fn is_known_metric(&self, metric: &str) -> bool {
        self.metrics.iter().any(|m| m.value == metric)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub name: String,
    pub table: String,
    #[serde(default = "default_dataset_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryTemplates {
    #[serde(default = "default_dataset_query")]
    pub dataset: String,
    #[serde(default = "default_update_frequency_query")]
    pub update_frequency: String,
    #[serde(default = "default_moving_averages_query")]
    pub moving_averages: String,
}

impl Default for QueryTemplates {
    fn default() -> Self {
        Self {
            dataset: default_dataset_query(),
            update_frequency: default_update_frequency_query(),
            moving_averages: default_moving_averages_query(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8051".to_string()
}

fn default_base_path() -> String {
    "/".to_string()
}

fn default_wait_timeout() -> u32 {
    30
}

fn default_database_url() -> String {
    "sqlite:///snapshot-dev.db".to_string()
}

fn default_metrics() -> Vec<MetricOption> {
    vec![
        MetricOption {
            label: "Number of steps".to_string(),
            value: "NumSteps".to_string(),
        },
        MetricOption {
            label: "Calories".to_string(),
            value: "CaloriesBurnt".to_string(),
        },
    ]
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_row_limit() -> u32 {
    100
}

fn default_gold_table() -> String {
    "real_time_iot_dashboard.gold_sensors_stateful".to_string()
}

fn default_log_table() -> String {
    "real_time_iot_dashboard.bronze_sensors".to_string()
}

fn default_datasets() -> Vec<DatasetConfig> {
    vec![DatasetConfig {
        name: "IoT Sensor Data".to_string(),
        table: "plotly_iot_dashboard_new.bronze_sensors".to_string(),
        limit: default_dataset_limit(),
    }]
}

fn default_dataset_limit() -> u32 {
    1000
}

fn default_dataset_query() -> String {
    "SELECT * FROM ${table} ORDER BY timestamp ASC LIMIT ${limit}".to_string()
}

fn default_update_frequency_query() -> String {
    "WITH log AS (DESCRIBE HISTORY ${table}), \
     state AS (SELECT version, timestamp, operation FROM log \
     WHERE (timestamp >= current_timestamp() - INTERVAL '24 hours') \
     AND operation IN ('MERGE', 'WRITE', 'DELETE', 'STREAMING UPDATE') ORDER BY version DESC), \
     comparison AS (SELECT DISTINCT s1.version, s1.timestamp, s1.operation, \
     LAG(version) OVER (ORDER BY version) AS Previous_Version, \
     LAG(timestamp) OVER (ORDER BY timestamp) AS Previous_Timestamp \
     FROM state AS s1 ORDER BY version DESC) \
     SELECT date_trunc('hour', timestamp) AS HourBlock, \
     AVG(timestamp::double - Previous_Timestamp::double) AS AvgUpdateFrequencyInSeconds \
     FROM comparison GROUP BY date_trunc('hour', timestamp) ORDER BY HourBlock"
        .to_string()
}

fn default_moving_averages_query() -> String {
    "SELECT Smoothed${metric}30SecondMA, Smoothed${metric}120SecondMA, timestamp \
     FROM ${table} ORDER BY timestamp DESC LIMIT ${limit}"
        .to_string()
}

/// Load configuration from `config/dashboard.*` (optional), `DASHBOARD__*`
/// variables and the warehouse/snapshot variables shared with other tools.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .set_override_option("warehouse.host", std::env::var("SERVER_HOSTNAME").ok())?
        .set_override_option("warehouse.http_path", std::env::var("HTTP_PATH").ok())?
        .set_override_option("warehouse.token", std::env::var("ACCESS_TOKEN").ok())?
        .set_override_option("snapshots.database_url", std::env::var("DATABASE_URL").ok())?
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace template variables in a query string
pub fn prepare_query(query: &str, vars: &HashMap<String, String>) -> String {
    let mut result = query.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}
