//! Synthetic price series for the whole alt index basket.
//!
//! The index is valued as `sum(units[s] * price[s])` over the active
//! composition. Units are fixed when a composition takes effect and are
//! chain-linked on every rebalance so the series has no jumps.

use crate::domain::error::AtfError;
use crate::domain::market_data::MarketData;
use crate::domain::price::{PricePoint, Symbol};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Decides how a basket value is split into per-symbol units.
pub trait WeightingScheme {
    fn units(
        &self,
        symbols: &[Symbol],
        prices: &HashMap<Symbol, f64>,
        basket_value: f64,
    ) -> Result<BTreeMap<Symbol, f64>, AtfError>;
}

/// Equal dollar amount per symbol at the weighting date.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualDollarWeighting;

impl WeightingScheme for EqualDollarWeighting {
    fn units(
        &self,
        symbols: &[Symbol],
        prices: &HashMap<Symbol, f64>,
        basket_value: f64,
    ) -> Result<BTreeMap<Symbol, f64>, AtfError> {
        // zero-priced coins cannot carry a dollar share
        let priced: Vec<(&Symbol, f64)> = symbols
            .iter()
            .filter_map(|s| prices.get(s).map(|&p| (s, p)))
            .filter(|(_, p)| *p > 0.0)
            .collect();
        if priced.is_empty() {
            return Err(AtfError::Data {
                reason: "cannot weight an index without any positive price".into(),
            });
        }

        let per_symbol = basket_value / priced.len() as f64;
        Ok(priced
            .into_iter()
            .map(|(s, p)| (s.clone(), per_symbol / p))
            .collect())
    }
}

/// Sum of `units * price`. `None` when a weighted symbol has no price.
pub fn basket_value(units: &BTreeMap<Symbol, f64>, prices: &HashMap<Symbol, f64>) -> Option<f64> {
    units
        .iter()
        .map(|(s, u)| prices.get(s).map(|p| u * p))
        .sum()
}

#[derive(Debug, Clone, Default)]
pub struct IndexSeries {
    units: BTreeMap<Symbol, f64>,
    points: Vec<PricePoint>,
}

impl IndexSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(&self) -> &BTreeMap<Symbol, f64> {
        &self.units
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    pub fn is_seeded(&self) -> bool {
        !self.units.is_empty()
    }

    /// Establishes the first composition's units so the basket is worth
    /// `initial_value` at `prices`.
    pub fn seed(
        &mut self,
        scheme: &dyn WeightingScheme,
        symbols: &[Symbol],
        prices: &HashMap<Symbol, f64>,
        initial_value: f64,
    ) -> Result<(), AtfError> {
        self.units = scheme.units(symbols, prices, initial_value)?;
        Ok(())
    }

    /// Prepends history for every trading date before `before`, valued with
    /// the current units. Only the trailing run of dates on which every
    /// weighted symbol has a close is kept. Returns the number of points added.
    pub fn backfill(&mut self, market: &MarketData, before: NaiveDate) -> usize {
        let mut history: Vec<PricePoint> = Vec::new();
        let dates = market.timeline_of(self.units.keys());
        for date in dates.into_iter().take_while(|d| *d < before) {
            let value: Option<f64> = self
                .units
                .iter()
                .map(|(s, u)| market.price_on(s, date).map(|p| u * p))
                .sum();
            match value {
                Some(v) => history.push(PricePoint::new(date, v)),
                None => history.clear(),
            }
        }
        let added = history.len();
        history.append(&mut self.points);
        self.points = history;
        added
    }

    /// Replaces the units with the new composition's, splitting the current
    /// basket value (old units at `prices`) according to `scheme`.
    pub fn rebalance(
        &mut self,
        scheme: &dyn WeightingScheme,
        symbols: &[Symbol],
        prices: &HashMap<Symbol, f64>,
    ) -> Result<f64, AtfError> {
        let value = basket_value(&self.units, prices).ok_or_else(|| AtfError::Data {
            reason: "index rebalanced without prices for the outgoing composition".into(),
        })?;
        self.units = scheme.units(symbols, prices, value)?;
        Ok(value)
    }

    /// Values the basket at `prices` and appends it for `date`.
    pub fn push(&mut self, date: NaiveDate, prices: &HashMap<Symbol, f64>) -> Result<f64, AtfError> {
        let value = basket_value(&self.units, prices).ok_or_else(|| AtfError::Data {
            reason: format!("index value on {date} is missing a constituent price"),
        })?;
        self.points.push(PricePoint::new(date, value));
        Ok(value)
    }
}
