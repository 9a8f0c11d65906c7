//! Simulation-wide configuration.
//!
//! Built once from the INI file (see `cli::build_config`) and validated
//! before the simulator accepts it. Shares are percentages in [0, 100].

use crate::domain::error::AtfError;
use crate::domain::price::Symbol;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;

/// Number of coins in the alt index.
pub const INDEX_SIZE: usize = 10;

/// Always excluded from the index, whatever the configured stablecoins.
pub const ETH_SYMBOL: &str = "ETH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapPolicy {
    #[default]
    Abort,
    ForwardFill,
}

impl GapPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Some(GapPolicy::Abort),
            "forward_fill" | "ffill" => Some(GapPolicy::ForwardFill),
            _ => None,
        }
    }
}

impl fmt::Display for GapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapPolicy::Abort => write!(f, "abort"),
            GapPolicy::ForwardFill => write!(f, "forward_fill"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuyDipConfig {
    pub dip_share: f64,
    pub rsi_min_thresh: f64,
    pub rsi_max_thresh: f64,
    pub cool: usize,
    pub enable: bool,
    /// First buy of the run deploys all available cash.
    pub first_buy_full: bool,
    /// Below this cash amount a buy deploys everything that is left.
    pub all_in_below: f64,
}

impl Default for BuyDipConfig {
    fn default() -> Self {
        BuyDipConfig {
            dip_share: 20.0,
            rsi_min_thresh: 0.0,
            rsi_max_thresh: 40.0,
            cool: 0,
            enable: true,
            first_buy_full: false,
            all_in_below: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SellTpConfig {
    pub tp_share: f64,
    pub rsi_min_thresh: f64,
    pub cool: usize,
    pub enable: bool,
}

impl Default for SellTpConfig {
    fn default() -> Self {
        SellTpConfig {
            tp_share: 20.0,
            rsi_min_thresh: 70.0,
            cool: 0,
            enable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SellSlConfig {
    /// Drawdown from the trailing maximum, in percent, that arms the stop.
    pub sl_share: f64,
    pub win_sl: usize,
    pub rsi_min_thresh: f64,
    pub cool: usize,
    pub enable: bool,
}

impl Default for SellSlConfig {
    fn default() -> Self {
        SellSlConfig {
            sl_share: 20.0,
            win_sl: 5,
            rsi_min_thresh: 50.0,
            cool: 0,
            enable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigAtf {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_cash: f64,
    pub fee_per_trade: f64,
    pub buy_dip: BuyDipConfig,
    pub sell_tp: SellTpConfig,
    pub sell_sl: SellSlConfig,
    pub rsi_period: usize,
    pub arsi_period: usize,
    pub stablecoin_exclusions: BTreeSet<Symbol>,
    pub gap_policy: GapPolicy,
}

impl ConfigAtf {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, initial_cash: f64) -> Self {
        ConfigAtf {
            start_date,
            end_date,
            initial_cash,
            fee_per_trade: 0.0,
            buy_dip: BuyDipConfig::default(),
            sell_tp: SellTpConfig::default(),
            sell_sl: SellSlConfig::default(),
            rsi_period: 14,
            arsi_period: 5,
            stablecoin_exclusions: ["USDT", "USDC", "BUSD", "DAI", "TUSD", "USDP", "FDUSD"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            gap_policy: GapPolicy::Abort,
        }
    }

    /// ETH plus the configured stablecoins.
    pub fn exclusions(&self) -> BTreeSet<Symbol> {
        let mut set = self.stablecoin_exclusions.clone();
        set.insert(ETH_SYMBOL.to_string());
        set
    }

    /// Days of index history needed before ARSI is defined.
    pub fn warmup_days(&self) -> usize {
        self.rsi_period + self.arsi_period
    }

    pub fn validate(&self) -> Result<(), AtfError> {
        crate::domain::config_validation::validate_config(self)
    }
}
