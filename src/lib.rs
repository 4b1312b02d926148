// Library for tests to access modules

pub mod action_tracker;
pub mod config;
pub mod container_repo;
pub mod error;
pub mod filter;
pub mod metric_buffer;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod sync_engine;
pub mod unit_store;
pub mod version;
