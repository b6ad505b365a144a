// Domain layer - Dashboards, pages, charts and polling state
pub mod chart;
pub mod dashboard;
pub mod dataset;
pub mod page;
pub mod polling;
