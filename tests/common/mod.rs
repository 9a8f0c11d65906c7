#![allow(dead_code)]

use atfbot::domain::config::ConfigAtf;
use atfbot::domain::error::AtfError;
use atfbot::domain::market_data::MarketData;
use atfbot::domain::metrics::Summary;
use atfbot::domain::price::{PricePoint, Symbol};
use atfbot::domain::simulator::SimulationResult;
use atfbot::ports::market_cap_port::MarketCapSnapshotProvider;
use atfbot::ports::price_port::PriceSeriesProvider;
use atfbot::ports::report_port::ReportPort;
use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Day `i` counted from 2020-01-01.
pub fn day(i: usize) -> NaiveDate {
    date(2020, 1, 1) + chrono::Duration::days(i as i64)
}

/// The ten coins of the default test index, largest first.
pub fn alt_symbols() -> Vec<Symbol> {
    [
        "BTC", "XRP", "BNB", "ADA", "SOL", "DOGE", "DOT", "LTC", "LINK", "TRX",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// ETH and USDT on top, then the ten alts.
pub fn ranked_caps() -> Vec<(Symbol, f64)> {
    let mut rows = vec![("ETH".to_string(), 5e11), ("USDT".to_string(), 4e11)];
    rows.extend(
        alt_symbols()
            .into_iter()
            .enumerate()
            .map(|(i, s)| (s, 1e11 - i as f64 * 1e9)),
    );
    rows
}

pub struct MockMarketCaps {
    pub snapshots: BTreeMap<NaiveDate, Vec<(Symbol, f64)>>,
    pub fallback: Option<Vec<(Symbol, f64)>>,
    pub missing: BTreeSet<NaiveDate>,
}

impl MockMarketCaps {
    /// Same ranking on every date.
    pub fn constant(rows: Vec<(Symbol, f64)>) -> Self {
        Self {
            snapshots: BTreeMap::new(),
            fallback: Some(rows),
            missing: BTreeSet::new(),
        }
    }

    pub fn with_snapshot(mut self, date: NaiveDate, rows: Vec<(Symbol, f64)>) -> Self {
        self.snapshots.insert(date, rows);
        self
    }

    pub fn without(mut self, date: NaiveDate) -> Self {
        self.missing.insert(date);
        self
    }
}

impl MarketCapSnapshotProvider for MockMarketCaps {
    fn top_n(
        &self,
        date: NaiveDate,
        n: usize,
        exclude: &BTreeSet<Symbol>,
    ) -> Result<Vec<(Symbol, f64)>, AtfError> {
        if self.missing.contains(&date) {
            return Ok(Vec::new());
        }
        let rows = self
            .snapshots
            .get(&date)
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or_default();
        let mut rows: Vec<_> = rows
            .into_iter()
            .filter(|(s, _)| !exclude.contains(s))
            .collect();
        rows.sort_by(|a, b| b.1.total_cmp(&a.1));
        rows.truncate(n);
        Ok(rows)
    }
}

pub struct MockPrices {
    pub data: BTreeMap<Symbol, Vec<PricePoint>>,
    pub errors: HashMap<Symbol, String>,
}

impl MockPrices {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn from_market(symbols: &[Symbol], market: &MarketData) -> Self {
        let mut prices = Self::new();
        for symbol in symbols {
            if let Some(series) = market.get(symbol) {
                prices.data.insert(symbol.clone(), series.points.clone());
            }
        }
        prices
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl PriceSeriesProvider for MockPrices {
    fn prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, AtfError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(AtfError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.date >= start_date && p.date <= end_date)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<Symbol>, AtfError> {
        Ok(self.data.keys().cloned().collect())
    }
}

/// Records what it was asked to write instead of touching the filesystem.
#[derive(Default)]
pub struct MockReportPort {
    pub writes: RefCell<Vec<(usize, bool, PathBuf)>>,
    pub summaries: RefCell<Vec<Summary>>,
}

impl ReportPort for MockReportPort {
    fn write(
        &self,
        result: &SimulationResult,
        summary: &Summary,
        output_dir: &Path,
    ) -> Result<(), AtfError> {
        self.writes.borrow_mut().push((
            result.records.len(),
            result.failure.is_some(),
            output_dir.to_path_buf(),
        ));
        self.summaries.borrow_mut().push(summary.clone());
        Ok(())
    }
}

/// A series starting at `base` on day 0 whose close on day `k > 0` is the
/// previous close times `factor(k)`.
pub fn price_path(base: f64, days: usize, factor: impl Fn(usize) -> f64) -> Vec<PricePoint> {
    let mut price = base;
    (0..days)
        .map(|k| {
            if k > 0 {
                price *= factor(k);
            }
            PricePoint::new(day(k), price)
        })
        .collect()
}

/// Falls 3% then rises 1%, alternating. Index RSI settles around 25.
pub fn zigzag_down(k: usize) -> f64 {
    if k % 2 == 1 { 0.97 } else { 1.01 }
}

/// Every coin in `symbols` (plus ETH) follows `factor`, scaled by rank.
pub fn market_with(symbols: &[Symbol], days: usize, factor: impl Fn(usize) -> f64 + Copy) -> MarketData {
    let mut market = MarketData::new();
    for (i, symbol) in symbols.iter().enumerate() {
        market.insert(symbol.clone(), price_path(10.0 + i as f64, days, factor));
    }
    market.insert("ETH".into(), price_path(300.0, days, factor));
    market
}

pub fn config_for(days: usize) -> ConfigAtf {
    ConfigAtf::new(day(0), day(days - 1), 10_000.0)
}
