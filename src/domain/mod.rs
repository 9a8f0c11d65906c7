//! Core domain types and logic.

pub mod alt_index;
pub mod config;
pub mod config_validation;
pub mod error;
pub mod execution;
pub mod holding;
pub mod index_series;
pub mod indicator;
pub mod market_data;
pub mod metrics;
pub mod portfolio;
pub mod price;
pub mod signal;
pub mod simulator;
