//! Port traits implemented by adapters.

pub mod config_port;
pub mod market_cap_port;
pub mod price_port;
pub mod report_port;
