//! Concrete adapter implementations for ports.

pub mod csv_market_cap_adapter;
pub mod csv_price_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
