// Databricks SQL warehouse repository implementation
use crate::application::warehouse_repository::WarehouseRepository;
use crate::domain::chart::MovingAverageRow;
use crate::domain::dataset::TabularResult;
use crate::domain::polling::HourlyUpdateFrequency;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct DatabricksRepository {
    host: String,
    token: String,
    warehouse_id: String,
    wait_timeout_secs: u32,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    warehouse_id: &'a str,
    wait_timeout: String,
    on_wait_timeout: &'static str,
    disposition: &'static str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(default)]
    statement_id: Option<String>,
    status: StatementStatus,
    #[serde(default)]
    manifest: Option<StatementManifest>,
    #[serde(default)]
    result: Option<StatementResult>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    #[serde(default)]
    error: Option<StatementError>,
}

#[derive(Debug, Deserialize)]
struct StatementError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementManifest {
    schema: StatementSchema,
}

#[derive(Debug, Deserialize)]
struct StatementSchema {
    #[serde(default)]
    columns: Vec<StatementColumn>,
}

#[derive(Debug, Deserialize)]
struct StatementColumn {
    name: String,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    data_array: Option<Vec<Vec<Value>>>,
}

impl DatabricksRepository {
    pub fn new(host: String, token: String, warehouse_id: String, wait_timeout_secs: u32) -> Self {
        let host = host
            .trim_start_matches("https://")
            .trim_end_matches('/')
            .to_string();

        Self {
            host,
            token,
            warehouse_id,
            // The statement API accepts 5 to 50 seconds
            wait_timeout_secs: wait_timeout_secs.clamp(5, 50),
            client: reqwest::Client::new(),
        }
    }

    fn statements_url(&self) -> String {
        format!("https://{}/api/2.0/sql/statements/", self.host)
    }

    async fn execute_statement(&self, statement: &str) -> Result<TabularResult> {
        let request = StatementRequest {
            statement,
            warehouse_id: &self.warehouse_id,
            wait_timeout: format!("{}s", self.wait_timeout_secs),
            on_wait_timeout: "CANCEL",
            disposition: "INLINE",
            format: "JSON_ARRAY",
        };

        tracing::debug!("Executing warehouse statement: {}", statement);

        let response = self
            .client
            .post(self.statements_url())
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .context("Failed to send statement to Databricks")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Databricks statement failed with status {}: {}", status, body);
        }

        let data = response
            .json::<StatementResponse>()
            .await
            .context("Failed to parse Databricks response")?;

        parse_statement_response(data)
    }
}

fn parse_statement_response(data: StatementResponse) -> Result<TabularResult> {
    if data.status.state != "SUCCEEDED" {
        let message = data
            .status
            .error
            .and_then(|e| e.message)
            .unwrap_or_else(|| "no error message".to_string());
        anyhow::bail!(
            "Databricks statement {} ended in state {}: {}",
            data.statement_id.as_deref().unwrap_or("?"),
            data.status.state,
            message
        );
    }

    let columns = data
        .manifest
        .map(|m| m.schema.columns.into_iter().map(|c| c.name).collect())
        .unwrap_or_default();
    let rows = data.result.and_then(|r| r.data_array).unwrap_or_default();

    Ok(TabularResult::new(columns, rows))
}

fn required_column(table: &TabularResult, name: &str) -> Result<usize> {
    table
        .column_index(name)
        .with_context(|| format!("column {} missing from result", name))
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            if let Ok(t) = DateTime::parse_from_rfc3339(s) {
                return Some(t.with_timezone(&Utc));
            }
            ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|t| t.and_utc())
        }
        Value::Number(n) => n
            .as_f64()
            .and_then(|secs| DateTime::from_timestamp_millis((secs * 1000.0) as i64)),
        _ => None,
    }
}

fn parse_update_frequency(table: &TabularResult) -> Result<Vec<HourlyUpdateFrequency>> {
    let hour_idx = required_column(table, "HourBlock")?;
    let avg_idx = required_column(table, "AvgUpdateFrequencyInSeconds")?;

    let mut hours = Vec::new();
    for row in &table.rows {
        let hour = row.get(hour_idx).and_then(value_as_timestamp);
        // The first operation of a window has no predecessor, so AVG can be null
        let avg = row.get(avg_idx).and_then(value_as_f64).unwrap_or(f64::NAN);

        if let Some(hour) = hour {
            hours.push(HourlyUpdateFrequency {
                hour,
                avg_seconds: avg,
            });
        }
    }

    Ok(hours)
}

fn parse_moving_averages(table: &TabularResult, metric: &str) -> Result<Vec<MovingAverageRow>> {
    let time_idx = required_column(table, "timestamp")?;
    let short_idx = required_column(table, &format!("Smoothed{}30SecondMA", metric))?;
    let long_idx = required_column(table, &format!("Smoothed{}120SecondMA", metric))?;

    let mut rows = Vec::new();
    for row in &table.rows {
        let parsed = (
            row.get(time_idx).and_then(value_as_timestamp),
            row.get(short_idx).and_then(value_as_f64),
            row.get(long_idx).and_then(value_as_f64),
        );

        match parsed {
            (Some(timestamp), Some(short), Some(long)) => {
                rows.push(MovingAverageRow::new(timestamp, short, long));
            }
            _ => tracing::debug!("Skipping incomplete moving average row: {:?}", row),
        }
    }

    Ok(rows)
}

#[async_trait]
impl WarehouseRepository for DatabricksRepository {
    async fn query_rows(&self, query: &str) -> Result<TabularResult> {
        self.execute_statement(query).await
    }

    async fn query_update_frequency(&self, query: &str) -> Result<Vec<HourlyUpdateFrequency>> {
        let table = self.execute_statement(query).await?;
        parse_update_frequency(&table)
    }

    async fn query_moving_averages(&self, query: &str, metric: &str) -> Result<Vec<MovingAverageRow>> {
        let table = self.execute_statement(query).await?;
        parse_moving_averages(&table, metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(body: Value) -> StatementResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_parse_succeeded_statement() {
        let table = parse_statement_response(response(json!({
            "statement_id": "01ee",
            "status": {"state": "SUCCEEDED"},
            "manifest": {"schema": {"columns": [
                {"name": "SmoothedNumSteps30SecondMA", "position": 0},
                {"name": "SmoothedNumSteps120SecondMA", "position": 1},
                {"name": "timestamp", "position": 2}
            ]}},
            "result": {"data_array": [
                ["12.5", "10.0", "2024-05-01T09:00:30.000Z"],
                ["11.0", null, "2024-05-01T09:00:20.000Z"],
                ["9.5", "9.9", "2024-05-01 09:00:10"]
            ]}
        })))
        .unwrap();

        assert_eq!(table.columns.len(), 3);
        let rows = parse_moving_averages(&table, "NumSteps").unwrap();

        // The row with a null long window is dropped
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].short_window, 12.5);
        assert_eq!(rows[0].timestamp.to_rfc3339(), "2024-05-01T09:00:30+00:00");
        assert_eq!(rows[1].timestamp.to_rfc3339(), "2024-05-01T09:00:10+00:00");
    }

    #[test]
    fn test_parse_failed_statement() {
        let err = parse_statement_response(response(json!({
            "statement_id": "01ef",
            "status": {"state": "FAILED", "error": {"message": "TABLE_OR_VIEW_NOT_FOUND"}}
        })))
        .unwrap_err();

        assert!(err.to_string().contains("TABLE_OR_VIEW_NOT_FOUND"));
    }

    #[test]
    fn test_parse_update_frequency() {
        let table = TabularResult::new(
            vec!["HourBlock".into(), "AvgUpdateFrequencyInSeconds".into()],
            vec![
                vec![json!("2024-05-01T08:00:00.000Z"), Value::Null],
                vec![json!("2024-05-01T09:00:00.000Z"), json!("6.73")],
            ],
        );

        let hours = parse_update_frequency(&table).unwrap();
        assert_eq!(hours.len(), 2);
        assert!(hours[0].avg_seconds.is_nan());
        assert_eq!(hours[1].avg_seconds, 6.73);
    }

    #[test]
    fn test_missing_metric_column() {
        let table = TabularResult::new(vec!["timestamp".into()], vec![]);
        assert!(parse_moving_averages(&table, "CaloriesBurnt").is_err());
    }
}
