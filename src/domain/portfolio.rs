//! Cash plus coin holdings.

use crate::domain::holding::Holding;
use crate::domain::price::Symbol;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_cash: f64,
    /// Ordered so that sells always run in the same sequence.
    pub holdings: BTreeMap<Symbol, Holding>,
}

impl Portfolio {
    pub fn new(initial_cash: f64) -> Self {
        Portfolio {
            cash: initial_cash,
            initial_cash,
            holdings: BTreeMap::new(),
        }
    }

    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.get(symbol)
    }

    pub fn holding_mut(&mut self, symbol: &str) -> &mut Holding {
        self.holdings
            .entry(symbol.to_string())
            .or_insert_with(|| Holding::new(symbol.to_string()))
    }

    pub fn held_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.holdings.keys()
    }

    pub fn drop_empty(&mut self) {
        self.holdings.retain(|_, h| !h.is_empty());
    }

    pub fn holdings_value(&self, prices: &HashMap<Symbol, f64>) -> f64 {
        self.holdings
            .values()
            .filter_map(|h| prices.get(&h.symbol).map(|&p| h.market_value(p)))
            .sum()
    }

    pub fn total_value(&self, prices: &HashMap<Symbol, f64>) -> f64 {
        self.cash + self.holdings_value(prices)
    }
}
