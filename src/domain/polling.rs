// Polling state for the realtime page
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_INTERVAL_SECONDS: u64 = 5;

/// Average time between source writes within one hour of the operation log
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyUpdateFrequency {
    pub hour: DateTime<Utc>,
    pub avg_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingState {
    pub interval_seconds: u64,
    #[serde(default)]
    pub last_timestamp: Option<DateTime<Utc>>,
}

impl Default for PollingState {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            last_timestamp: None,
        }
    }
}

impl PollingState {
    pub fn interval_ms(&self) -> u64 {
        self.interval_seconds * 1000
    }

    pub fn interval_label(&self) -> String {
        format!("{} seconds", self.interval_seconds)
    }

    /// Recalibrate from hourly frequencies ordered oldest hour first.
    /// Returns `None` when the log holds no usable hour.
    pub fn recalibrated(&self, hours: &[HourlyUpdateFrequency]) -> Option<Self> {
        let latest = hours.iter().rev().find(|h| h.avg_seconds.is_finite())?;
        let seconds = latest.avg_seconds.floor().max(1.0) as u64;

        Some(Self {
            interval_seconds: seconds,
            last_timestamp: self.last_timestamp,
        })
    }

    pub fn observed(&self, timestamp: DateTime<Utc>) -> Self {
        Self {
            interval_seconds: self.interval_seconds,
            last_timestamp: Some(timestamp),
        }
    }
}

/// Format a timestamp as shown in the "Latest timestamp" card
pub fn clock_label(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%H:%M:%S").to_string()
}
