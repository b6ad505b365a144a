// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod databricks_repository;
pub mod json_canvas;
pub mod memory_state_store;
pub mod sqlite_state_store;
pub mod sse_stream;
