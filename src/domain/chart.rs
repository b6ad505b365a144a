// Live chart domain model
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

const SHORT_WINDOW_NAME: &str = "30 MA";
const LONG_WINDOW_NAME: &str = "120 MA";
const SHORT_WINDOW_COLOR: &str = "#DB4C39";
const LONG_WINDOW_COLOR: &str = "#5452AC";
const LINE_WIDTH: u32 = 6;
const HOVER_TEMPLATE: &str = "<b>%{y:.1f}</b>";

const BACKGROUND_COLOR: &str = "#1c2022";
const FONT_COLOR: &str = "#A3AAB7";
const GRID_COLOR: &str = "#3F3F3F";

/// One row of the smoothed gold table for a single metric
#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverageRow {
    pub timestamp: DateTime<Utc>,
    pub short_window: f64,
    pub long_window: f64,
}

impl MovingAverageRow {
    pub fn new(timestamp: DateTime<Utc>, short_window: f64, long_window: f64) -> Self {
        Self {
            timestamp,
            short_window,
            long_window,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ChartError {
    #[error("cannot build a chart from an empty result set")]
    EmptyRows,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFigure {
    pub traces: Vec<LineTrace>,
    pub layout: ChartLayout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineTrace {
    pub name: String,
    pub mode: &'static str,
    pub x: Vec<DateTime<Utc>>,
    pub y: Vec<f64>,
    pub line: LineStyle,
    pub hovertemplate: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: &'static str,
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLayout {
    pub title: ChartTitle,
    pub paper_bgcolor: &'static str,
    pub plot_bgcolor: &'static str,
    pub font_color: &'static str,
    pub legend_traceorder: &'static str,
    pub legend_title: &'static str,
    pub legend: Legend,
    pub hovermode: &'static str,
    pub xaxis: TimeAxis,
    pub yaxis: ValueAxis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartTitle {
    pub text: String,
    pub x: f64,
    pub xanchor: &'static str,
    pub yanchor: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub orientation: &'static str,
    pub yanchor: &'static str,
    pub y: f64,
    pub xanchor: &'static str,
    pub x: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeAxis {
    pub gridcolor: &'static str,
    pub title: &'static str,
    pub hoverformat: &'static str,
    pub range: [DateTime<Utc>; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueAxis {
    pub gridcolor: &'static str,
    pub title: &'static str,
}

/// Build the two-line moving average chart for `metric`.
///
/// The time axis is clamped to the earliest and latest timestamp in `rows`.
pub fn build_chart(rows: &[MovingAverageRow], metric: &str) -> Result<ChartFigure, ChartError> {
    let start = rows.iter().map(|r| r.timestamp).min().ok_or(ChartError::EmptyRows)?;
    let end = rows.iter().map(|r| r.timestamp).max().ok_or(ChartError::EmptyRows)?;

    let x: Vec<DateTime<Utc>> = rows.iter().map(|r| r.timestamp).collect();

    let traces = vec![
        line_trace(
            SHORT_WINDOW_NAME,
            SHORT_WINDOW_COLOR,
            x.clone(),
            rows.iter().map(|r| r.short_window).collect(),
        ),
        line_trace(
            LONG_WINDOW_NAME,
            LONG_WINDOW_COLOR,
            x,
            rows.iter().map(|r| r.long_window).collect(),
        ),
    ];

    let layout = ChartLayout {
        title: ChartTitle {
            text: format!("Live Sensor Data for {}", metric),
            x: 0.5,
            xanchor: "center",
            yanchor: "top",
        },
        paper_bgcolor: BACKGROUND_COLOR,
        plot_bgcolor: BACKGROUND_COLOR,
        font_color: FONT_COLOR,
        legend_traceorder: "reversed",
        legend_title: "",
        legend: Legend {
            orientation: "h",
            yanchor: "bottom",
            y: 1.02,
            xanchor: "right",
            x: 1.0,
        },
        hovermode: "x unified",
        xaxis: TimeAxis {
            gridcolor: GRID_COLOR,
            title: "",
            hoverformat: "%H:%M:%S<br>",
            range: [start, end],
        },
        yaxis: ValueAxis {
            gridcolor: GRID_COLOR,
            title: "",
        },
    };

    Ok(ChartFigure { traces, layout })
}

fn line_trace(name: &str, color: &'static str, x: Vec<DateTime<Utc>>, y: Vec<f64>) -> LineTrace {
    LineTrace {
        name: name.to_string(),
        mode: "lines",
        x,
        y,
        line: LineStyle {
            color,
            width: LINE_WIDTH,
        },
        hovertemplate: HOVER_TEMPLATE,
    }
}
