//! Momentum indicators computed on a single price series.
//!
//! - `IndicatorPoint`: one point of an indicator time series
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: a time series of indicator values
//! - `IndicatorEngine`: RSI then ARSI on the same input, sampled at its last date

pub mod arsi;
pub mod rsi;

pub use arsi::arsi_series;
pub use rsi::rsi_series;

use crate::domain::price::PricePoint;
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

impl IndicatorPoint {
    pub fn invalid(date: NaiveDate) -> Self {
        IndicatorPoint {
            date,
            valid: false,
            value: 0.0,
        }
    }

    pub fn valid(date: NaiveDate, value: f64) -> Self {
        IndicatorPoint {
            date,
            valid: true,
            value,
        }
    }

    pub fn get(&self) -> Option<f64> {
        self.valid.then_some(self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Rsi(usize),
    Arsi { rsi_period: usize, period: usize },
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Arsi { rsi_period, period } => {
                write!(f, "ARSI({},{})", rsi_period, period)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn last(&self) -> Option<&IndicatorPoint> {
        self.values.last()
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|p| p.valid).count()
    }
}

/// Index-level indicator values for one date. `None` means still warming up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSample {
    pub date: NaiveDate,
    pub rsi: Option<f64>,
    pub arsi: Option<f64>,
}

impl IndicatorSample {
    pub fn warming_up(date: NaiveDate) -> Self {
        IndicatorSample {
            date,
            rsi: None,
            arsi: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorEngine {
    pub rsi_period: usize,
    pub arsi_period: usize,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        IndicatorEngine {
            rsi_period: 14,
            arsi_period: 5,
        }
    }
}

impl IndicatorEngine {
    pub fn new(rsi_period: usize, arsi_period: usize) -> Self {
        IndicatorEngine {
            rsi_period,
            arsi_period,
        }
    }

    /// RSI and ARSI series over the whole input.
    pub fn compute(&self, prices: &[PricePoint]) -> (IndicatorSeries, IndicatorSeries) {
        let rsi = rsi_series(prices, self.rsi_period);
        let arsi = arsi_series(&rsi, self.arsi_period);
        (rsi, arsi)
    }

    /// Indicator values at the last date of `prices`.
    pub fn sample(&self, prices: &[PricePoint]) -> Option<IndicatorSample> {
        let last = prices.last()?;
        let (rsi, arsi) = self.compute(prices);
        Some(IndicatorSample {
            date: last.date,
            rsi: rsi.last().and_then(IndicatorPoint::get),
            arsi: arsi.last().and_then(IndicatorPoint::get),
        })
    }
}
