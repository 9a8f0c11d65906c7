//! In-memory price series per symbol and the unified trading calendar.
//!
//! The simulator never talks to a price provider directly: everything it
//! needs is loaded into a [`MarketData`] at the boundary.

use crate::domain::config::GapPolicy;
use crate::domain::error::AtfError;
use crate::domain::price::{PricePoint, Symbol};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct SymbolSeries {
    pub symbol: Symbol,
    pub points: Vec<PricePoint>,
    pub date_index: HashMap<NaiveDate, usize>,
}

impl SymbolSeries {
    /// `points` must already be sorted by date without duplicates.
    pub fn new(symbol: Symbol, points: Vec<PricePoint>) -> Self {
        let date_index = points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.date, i))
            .collect();
        Self {
            symbol,
            points,
            date_index,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn price_on(&self, date: NaiveDate) -> Option<f64> {
        self.date_index.get(&date).map(|&i| self.points[i].close)
    }

    /// Most recent point strictly before `date`.
    pub fn last_before(&self, date: NaiveDate) -> Option<&PricePoint> {
        let idx = self.points.partition_point(|p| p.date < date);
        if idx == 0 {
            None
        } else {
            self.points.get(idx - 1)
        }
    }
}

/// Outcome of resolving the prices required for one trading date.
#[derive(Debug, Clone, Default)]
pub struct ResolvedPrices {
    pub prices: HashMap<Symbol, f64>,
    /// Symbols whose price was carried forward, with the date it came from.
    pub filled: Vec<(Symbol, NaiveDate)>,
}

#[derive(Debug, Clone, Default)]
pub struct MarketData {
    series: BTreeMap<Symbol, SymbolSeries>,
}

impl MarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol, points: Vec<PricePoint>) {
        self.series
            .insert(symbol.clone(), SymbolSeries::new(symbol, points));
    }

    pub fn with_series(mut self, symbol: &str, points: Vec<PricePoint>) -> Self {
        self.insert(symbol.to_string(), points);
        self
    }

    pub fn symbol_count(&self) -> usize {
        self.series.len()
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolSeries> {
        self.series.get(symbol)
    }

    pub fn price_on(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        self.series.get(symbol).and_then(|s| s.price_on(date))
    }

    /// Sorted union of every date present in any series.
    pub fn timeline(&self) -> Vec<NaiveDate> {
        Self::merge_dates(self.series.values())
    }

    /// Like [`timeline`](Self::timeline), ignoring the series of `excluded`
    /// symbols.
    pub fn timeline_excluding(&self, excluded: &BTreeSet<Symbol>) -> Vec<NaiveDate> {
        Self::merge_dates(
            self.series
                .values()
                .filter(|s| !excluded.contains(&s.symbol)),
        )
    }

    /// Dates on which at least one of `symbols` has a close.
    pub fn timeline_of<'a, I>(&self, symbols: I) -> Vec<NaiveDate>
    where
        I: IntoIterator<Item = &'a Symbol>,
    {
        Self::merge_dates(symbols.into_iter().filter_map(|s| self.series.get(s)))
    }

    fn merge_dates<'s>(series: impl Iterator<Item = &'s SymbolSeries>) -> Vec<NaiveDate> {
        let unique: BTreeSet<NaiveDate> = series
            .flat_map(|s| s.points.iter().map(|p| p.date))
            .collect();
        unique.into_iter().collect()
    }

    /// Looks up the close of every symbol on `date`, applying the gap policy
    /// to the ones that have no point on that date.
    pub fn resolve<'a, I>(
        &self,
        symbols: I,
        date: NaiveDate,
        policy: GapPolicy,
    ) -> Result<ResolvedPrices, AtfError>
    where
        I: IntoIterator<Item = &'a Symbol>,
    {
        let mut resolved = ResolvedPrices::default();
        for symbol in symbols {
            if resolved.prices.contains_key(symbol) {
                continue;
            }
            let series = self.series.get(symbol);
            if let Some(price) = series.and_then(|s| s.price_on(date)) {
                resolved.prices.insert(symbol.clone(), price);
                continue;
            }
            let fallback = match policy {
                GapPolicy::Abort => None,
                GapPolicy::ForwardFill => series.and_then(|s| s.last_before(date)).copied(),
            };
            match fallback {
                Some(point) => {
                    resolved.prices.insert(symbol.clone(), point.close);
                    resolved.filled.push((symbol.clone(), point.date));
                }
                None => {
                    return Err(AtfError::PriceGap {
                        symbol: symbol.clone(),
                        date,
                    });
                }
            }
        }
        Ok(resolved)
    }
}
