// Application layer - Use cases and the capability traits they depend on
pub mod canvas;
pub mod dataset_service;
pub mod lifecycle_service;
pub mod page_service;
pub mod polling_service;
pub mod state_store;
pub mod warehouse_repository;
