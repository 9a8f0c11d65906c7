//! Alt index composition management.
//!
//! The index holds the [`INDEX_SIZE`] largest coins by market cap, excluding
//! ETH and stablecoins. It is re-selected on the first trading day of every
//! month and stays fixed in between.

use crate::domain::config::INDEX_SIZE;
use crate::domain::error::AtfError;
use crate::domain::price::Symbol;
use crate::ports::market_cap_port::MarketCapSnapshotProvider;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct IndexComposition {
    pub effective_date: NaiveDate,
    /// Ranked by market cap at selection time, largest first.
    pub symbols: Vec<Symbol>,
}

impl IndexComposition {
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// True on the first trading day of a calendar month. The very first trading
/// day seen (no previous date) also counts.
pub fn is_rebalancing_date(date: NaiveDate, previous: Option<NaiveDate>) -> bool {
    match previous {
        None => true,
        Some(prev) => prev.year() != date.year() || prev.month() != date.month(),
    }
}

pub struct AltIndexManager<'a> {
    provider: &'a dyn MarketCapSnapshotProvider,
    exclusions: BTreeSet<Symbol>,
    size: usize,
    history: Vec<IndexComposition>,
}

impl<'a> AltIndexManager<'a> {
    pub fn new(provider: &'a dyn MarketCapSnapshotProvider, exclusions: BTreeSet<Symbol>) -> Self {
        AltIndexManager {
            provider,
            exclusions,
            size: INDEX_SIZE,
            history: Vec::new(),
        }
    }

    pub fn exclusions(&self) -> &BTreeSet<Symbol> {
        &self.exclusions
    }

    /// Ranks the snapshot for `date` without touching the active composition.
    pub fn select(&self, date: NaiveDate) -> Result<IndexComposition, AtfError> {
        let snapshot = self.provider.top_n(date, self.size, &self.exclusions)?;
        if snapshot.is_empty() {
            return Err(AtfError::MarketCapGap { date });
        }

        let mut ranked: Vec<(Symbol, f64)> = snapshot
            .into_iter()
            .filter(|(symbol, cap)| !self.exclusions.contains(symbol) && cap.is_finite())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut seen = HashSet::new();
        let symbols: Vec<Symbol> = ranked
            .into_iter()
            .map(|(symbol, _)| symbol)
            .filter(|symbol| seen.insert(symbol.clone()))
            .take(self.size)
            .collect();

        if symbols.len() < self.size {
            return Err(AtfError::InvalidComposition {
                date,
                eligible: symbols.len(),
                required: self.size,
            });
        }

        Ok(IndexComposition {
            effective_date: date,
            symbols,
        })
    }

    /// Selects a new composition and makes it the active one.
    pub fn rebalance(&mut self, date: NaiveDate) -> Result<&IndexComposition, AtfError> {
        let composition = self.select(date)?;
        Ok(self.commit(composition))
    }

    /// Makes a composition from [`select`](Self::select) the active one. A
    /// composition already recorded for the same or a later date is replaced.
    pub fn commit(&mut self, composition: IndexComposition) -> &IndexComposition {
        let date = composition.effective_date;
        info!(
            %date,
            symbols = %composition.symbols.join(","),
            "rebalanced alt index"
        );
        if let Some(prev) = self.history.last() {
            let dropped: Vec<&str> = prev
                .symbols
                .iter()
                .filter(|s| !composition.contains(s))
                .map(String::as_str)
                .collect();
            if !dropped.is_empty() {
                debug!(%date, dropped = %dropped.join(","), "symbols left the index");
            }
        }

        if self
            .history
            .last()
            .is_some_and(|last| last.effective_date >= date)
        {
            self.history.pop();
        }
        self.history.push(composition);
        &self.history[self.history.len() - 1]
    }

    /// The composition in effect on `date`: the latest one whose effective
    /// date is not after `date`.
    pub fn composition_for(&self, date: NaiveDate) -> Result<&IndexComposition, AtfError> {
        let idx = self.history.partition_point(|c| c.effective_date <= date);
        if idx == 0 {
            return Err(AtfError::NoComposition { date });
        }
        Ok(&self.history[idx - 1])
    }

    pub fn current(&self) -> Option<&IndexComposition> {
        self.history.last()
    }

    pub fn history(&self) -> &[IndexComposition] {
        &self.history
    }

    pub fn into_history(self) -> Vec<IndexComposition> {
        self.history
    }
}
