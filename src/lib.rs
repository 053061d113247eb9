pub mod api;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod parser;
pub mod planner;
pub mod reconcile;
pub mod rows;
pub mod service;
pub mod store;
pub mod types;
