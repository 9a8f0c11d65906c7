//! Day-stepped backtest of the alt index trend-following strategy.
//!
//! Each trading date runs the same sequence: resolve the composition
//! (rebalancing on the first trading day of a month), resolve prices, extend
//! the index series, sample RSI/ARSI, evaluate and filter the signal, trade,
//! then record portfolio and benchmark values.

use crate::domain::alt_index::{AltIndexManager, IndexComposition, is_rebalancing_date};
use crate::domain::config::{ConfigAtf, GapPolicy};
use crate::domain::error::AtfError;
use crate::domain::execution::{Trade, buy_budget, buy_equal, stop_loss, take_profit};
use crate::domain::index_series::{EqualDollarWeighting, IndexSeries, WeightingScheme, basket_value};
use crate::domain::indicator::{IndicatorEngine, IndicatorSample};
use crate::domain::market_data::MarketData;
use crate::domain::portfolio::Portfolio;
use crate::domain::price::Symbol;
use crate::domain::signal::{Cooldown, Signal, SignalEvaluator};
use crate::ports::market_cap_port::MarketCapSnapshotProvider;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationLevel {
    Info,
    Warning,
}

impl fmt::Display for AnnotationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationLevel::Info => write!(f, "INFO"),
            AnnotationLevel::Warning => write!(f, "WARN"),
        }
    }
}

/// A non-fatal condition attached to one trading day.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub date: NaiveDate,
    pub level: AnnotationLevel,
    pub message: String,
}

impl Annotation {
    pub fn info(date: NaiveDate, message: impl Into<String>) -> Self {
        Annotation {
            date,
            level: AnnotationLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(date: NaiveDate, message: impl Into<String>) -> Self {
        Annotation {
            date,
            level: AnnotationLevel::Warning,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRecord {
    pub date: NaiveDate,
    pub portfolio_value: f64,
    pub benchmark_value: f64,
    pub cash: f64,
    pub index_value: f64,
    pub rsi: Option<f64>,
    pub arsi: Option<f64>,
    pub signal: Signal,
    pub trades: Vec<Trade>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug)]
pub struct SimulationResult {
    pub records: Vec<SimulationRecord>,
    /// Set when the run halted early; `records` holds everything before it.
    pub failure: Option<AtfError>,
    pub portfolio: Portfolio,
    pub compositions: Vec<IndexComposition>,
}

impl SimulationResult {
    pub fn completed(&self) -> bool {
        self.failure.is_none()
    }

    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.records.iter().flat_map(|r| r.trades.iter())
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.records.iter().flat_map(|r| r.annotations.iter())
    }
}

pub struct PortfolioSimulator<'a> {
    config: ConfigAtf,
    market: MarketData,
    index_manager: AltIndexManager<'a>,
    engine: IndicatorEngine,
    evaluator: SignalEvaluator,
    weighting: Box<dyn WeightingScheme>,
    index: IndexSeries,
    cooldown: Cooldown,
    portfolio: Portfolio,
    /// Units of the day-one composition, never traded.
    benchmark: BTreeMap<Symbol, f64>,
    records: Vec<SimulationRecord>,
    bought_once: bool,
}

impl<'a> PortfolioSimulator<'a> {
    pub fn new(
        config: ConfigAtf,
        market_caps: &'a dyn MarketCapSnapshotProvider,
        market: MarketData,
    ) -> Result<Self, AtfError> {
        config.validate()?;
        Ok(PortfolioSimulator {
            index_manager: AltIndexManager::new(market_caps, config.exclusions()),
            engine: IndicatorEngine::new(config.rsi_period, config.arsi_period),
            evaluator: SignalEvaluator::new(&config),
            weighting: Box::new(EqualDollarWeighting),
            index: IndexSeries::new(),
            cooldown: Cooldown::new(&config),
            portfolio: Portfolio::new(config.initial_cash),
            benchmark: BTreeMap::new(),
            records: Vec::new(),
            bought_once: false,
            market,
            config,
        })
    }

    /// Replaces the index weighting. Has no effect once the first day ran.
    pub fn with_weighting(mut self, weighting: Box<dyn WeightingScheme>) -> Self {
        if self.records.is_empty() {
            self.weighting = weighting;
        }
        self
    }

    pub fn config(&self) -> &ConfigAtf {
        &self.config
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn records(&self) -> &[SimulationRecord] {
        &self.records
    }

    pub fn index_series(&self) -> &IndexSeries {
        &self.index
    }

    /// Trading calendar restricted to the configured date range. Dates that
    /// only ETH or an excluded stablecoin traded on are not part of it.
    pub fn trading_dates(&self) -> Vec<NaiveDate> {
        self.market
            .timeline_excluding(self.index_manager.exclusions())
            .into_iter()
            .filter(|d| *d >= self.config.start_date && *d <= self.config.end_date)
            .collect()
    }

    /// Advances the simulation by one trading date. Dates must be strictly
    /// increasing.
    pub fn step(&mut self, date: NaiveDate) -> Result<&SimulationRecord, AtfError> {
        let previous = self.records.last().map(|r| r.date);
        if let Some(prev) = previous.filter(|p| date <= *p) {
            return Err(AtfError::Data {
                reason: format!("trading date {date} does not follow {prev}"),
            });
        }
        let first_day = previous.is_none();
        let mut annotations = Vec::new();

        let pending = if is_rebalancing_date(date, previous) {
            self.select_composition(date, &mut annotations)?
        } else {
            None
        };
        let composition = match &pending {
            Some(selected) => selected.symbols.clone(),
            None => self.index_manager.composition_for(date)?.symbols.clone(),
        };

        let mut required: BTreeSet<Symbol> = composition.iter().cloned().collect();
        required.extend(self.index.units().keys().cloned());
        required.extend(self.portfolio.held_symbols().cloned());
        required.extend(self.benchmark.keys().cloned());
        let resolved = self
            .market
            .resolve(&required, date, self.config.gap_policy)?;
        for (symbol, from) in &resolved.filled {
            warn!(%date, %symbol, %from, "forward-filled missing price");
            annotations.push(Annotation::warning(
                date,
                format!("no price for {symbol}, reused close from {from}"),
            ));
        }
        let prices = resolved.prices;
        let rebalanced = match pending {
            Some(selected) => {
                self.index_manager.commit(selected);
                true
            }
            None => false,
        };

        if first_day {
            self.index.seed(
                self.weighting.as_ref(),
                &composition,
                &prices,
                self.config.initial_cash,
            )?;
            self.benchmark = self.index.units().clone();
            let warmup = self.index.backfill(&self.market, date);
            debug!(%date, warmup, "seeded index series");
        } else if rebalanced {
            self.index
                .rebalance(self.weighting.as_ref(), &composition, &prices)?;
        }
        let index_value = self.index.push(date, &prices)?;

        let sample = self
            .engine
            .sample(self.index.points())
            .unwrap_or_else(|| IndicatorSample::warming_up(date));
        if first_day && sample.arsi.is_none() {
            annotations.push(Annotation::info(
                date,
                format!(
                    "insufficient history: {} index points, ARSI needs {}",
                    self.index.points().len(),
                    self.config.warmup_days()
                ),
            ));
        }

        let raw = self.evaluator.triggers(&sample, &self.index.values());
        let (signal, suppressed) = self.cooldown.filter(raw);
        for (blocked, blocker) in suppressed {
            annotations.push(Annotation::info(
                date,
                format!("{blocked} suppressed by {blocker} cooldown"),
            ));
        }
        self.cooldown.advance(raw);
        debug!(%date, arsi = ?sample.arsi, ?raw, %signal, "evaluated signal");

        let fee = self.config.fee_per_trade;
        let trades = match signal {
            Signal::BuyDip => {
                let budget = buy_budget(
                    self.portfolio.cash,
                    &self.config.buy_dip,
                    !self.bought_once,
                );
                let trades = buy_equal(
                    &mut self.portfolio,
                    date,
                    &composition,
                    &prices,
                    budget,
                    fee,
                );
                self.bought_once |= !trades.is_empty();
                trades
            }
            Signal::TakeProfit => take_profit(
                &mut self.portfolio,
                date,
                &prices,
                self.config.sell_tp.tp_share,
                fee,
            ),
            Signal::StopLoss => stop_loss(&mut self.portfolio, date, &prices, fee),
            Signal::None => Vec::new(),
        };
        if signal.is_trade() {
            info!(%date, %signal, trades = trades.len(), cash = self.portfolio.cash, "signal applied");
        }

        let benchmark_value = basket_value(&self.benchmark, &prices).ok_or_else(|| AtfError::Data {
            reason: format!("benchmark value on {date} is missing a constituent price"),
        })?;

        self.records.push(SimulationRecord {
            date,
            portfolio_value: self.portfolio.total_value(&prices),
            benchmark_value,
            cash: self.portfolio.cash,
            index_value,
            rsi: sample.rsi,
            arsi: sample.arsi,
            signal,
            trades,
            annotations,
        });
        let idx = self.records.len() - 1;
        Ok(&self.records[idx])
    }

    /// Ranks a new composition for `date` without committing it. `None` means
    /// the previous composition stays in effect.
    fn select_composition(
        &self,
        date: NaiveDate,
        annotations: &mut Vec<Annotation>,
    ) -> Result<Option<IndexComposition>, AtfError> {
        match self.index_manager.select(date) {
            Ok(selected) => Ok(Some(selected)),
            Err(AtfError::MarketCapGap { .. })
                if self.config.gap_policy == GapPolicy::ForwardFill
                    && self.index_manager.current().is_some() =>
            {
                warn!(%date, "no market cap snapshot, keeping previous composition");
                annotations.push(Annotation::warning(
                    date,
                    "no market cap snapshot, previous composition kept",
                ));
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// False when no symbol of the composition in effect (or, before the first
    /// day, the one that would be selected) has a close on `date`.
    fn has_constituent_quotes(&self, date: NaiveDate) -> bool {
        let symbols = match self.index_manager.current() {
            Some(current) => current.symbols.clone(),
            None => match self.index_manager.select(date) {
                Ok(selected) => selected.symbols,
                Err(_) => return true,
            },
        };
        symbols
            .iter()
            .any(|s| self.market.price_on(s, date).is_some())
    }

    /// Steps through every trading date in range. Stops at the first fatal
    /// error, keeping the records produced so far.
    pub fn run(mut self) -> SimulationResult {
        let dates = self.trading_dates();
        if dates.is_empty() {
            let err = AtfError::Data {
                reason: format!(
                    "no trading dates between {} and {}",
                    self.config.start_date, self.config.end_date
                ),
            };
            return self.into_result(Some(err));
        }

        info!(
            start = %self.config.start_date,
            end = %self.config.end_date,
            days = dates.len(),
            "starting simulation"
        );
        for date in dates {
            if !self.has_constituent_quotes(date) {
                debug!(%date, "no index constituent traded, skipping date");
                continue;
            }
            if let Err(err) = self.step(date) {
                error!(%date, error = %err, "simulation halted");
                return self.into_result(Some(err));
            }
        }
        self.into_result(None)
    }

    pub fn into_result(self, failure: Option<AtfError>) -> SimulationResult {
        SimulationResult {
            records: self.records,
            failure,
            portfolio: self.portfolio,
            compositions: self.index_manager.into_history(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PricePoint;
    use approx::assert_relative_eq;

    struct FixedCaps(Vec<(Symbol, f64)>);

    impl MarketCapSnapshotProvider for FixedCaps {
        fn top_n(
            &self,
            _date: NaiveDate,
            n: usize,
            exclude: &BTreeSet<Symbol>,
        ) -> Result<Vec<(Symbol, f64)>, AtfError> {
            Ok(self
                .0
                .iter()
                .filter(|(s, _)| !exclude.contains(s))
                .take(n)
                .cloned()
                .collect())
        }
    }

    fn coins() -> Vec<Symbol> {
        (0..10).map(|i| format!("C{i}")).collect()
    }

    fn caps() -> FixedCaps {
        let mut rows = vec![("ETH".to_string(), 1e12), ("USDT".to_string(), 9e11)];
        rows.extend(
            coins()
                .into_iter()
                .enumerate()
                .map(|(i, s)| (s, 1e10 - i as f64 * 1e8)),
        );
        FixedCaps(rows)
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    /// Falls 3% then rises 1%, alternating: RSI settles around 25.
    fn zigzag_down(days: usize, base: f64) -> Vec<PricePoint> {
        let mut price = base;
        (0..days)
            .map(|k| {
                if k > 0 {
                    price *= if k % 2 == 1 { 0.97 } else { 1.01 };
                }
                PricePoint::new(start() + chrono::Duration::days(k as i64), price)
            })
            .collect()
    }

    fn market(days: usize) -> MarketData {
        let mut market = MarketData::new();
        for (i, symbol) in coins().into_iter().enumerate() {
            market.insert(symbol, zigzag_down(days, 10.0 + i as f64));
        }
        market.insert("ETH".into(), zigzag_down(days, 200.0));
        market
    }

    fn config(days: i64) -> ConfigAtf {
        ConfigAtf::new(start(), start() + chrono::Duration::days(days - 1), 10_000.0)
    }

    #[test]
    fn new_rejects_invalid_config() {
        let caps = caps();
        let mut cfg = config(30);
        cfg.initial_cash = -1.0;
        assert!(matches!(
            PortfolioSimulator::new(cfg, &caps, market(30)),
            Err(AtfError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn warmup_days_have_no_signal() {
        let caps = caps();
        let result = PortfolioSimulator::new(config(30), &caps, market(30))
            .unwrap()
            .run();

        assert!(result.completed());
        assert_eq!(result.records.len(), 30);
        for record in &result.records[..18] {
            assert_eq!(record.arsi, None);
            assert_eq!(record.signal, Signal::None);
            assert!(record.trades.is_empty());
        }
        let first = &result.records[0];
        assert!(
            first
                .annotations
                .iter()
                .any(|a| a.level == AnnotationLevel::Info && a.message.contains("insufficient history"))
        );
        assert!(result.records[18].arsi.is_some());
    }

    #[test]
    fn first_day_values_match_initial_cash() {
        let caps = caps();
        let mut sim = PortfolioSimulator::new(config(30), &caps, market(30)).unwrap();
        let record = sim.step(start()).unwrap().clone();
        assert_relative_eq!(record.portfolio_value, 10_000.0);
        assert_relative_eq!(record.benchmark_value, 10_000.0, epsilon = 1e-6);
        assert_relative_eq!(record.index_value, 10_000.0, epsilon = 1e-6);
        assert_eq!(sim.index_series().units().len(), 10);
        assert!(!sim.index_series().units().contains_key("ETH"));
    }

    #[test]
    fn falling_market_buys_the_dip() {
        let caps = caps();
        let result = PortfolioSimulator::new(config(30), &caps, market(30))
            .unwrap()
            .run();

        let first_bd = result
            .records
            .iter()
            .find(|r| r.signal == Signal::BuyDip)
            .expect("a buy-the-dip day");
        assert_eq!(first_bd.trades.len(), 10);
        assert_relative_eq!(first_bd.cash, 8_000.0, epsilon = 1e-6);
        let spent: f64 = first_bd.trades.iter().map(|t| t.value).sum();
        assert_relative_eq!(spent, 2_000.0, epsilon = 1e-6);
        assert!(first_bd.trades.iter().all(|t| t.symbol != "ETH"));
    }

    #[test]
    fn step_rejects_non_increasing_dates() {
        let caps = caps();
        let mut sim = PortfolioSimulator::new(config(30), &caps, market(30)).unwrap();
        sim.step(start() + chrono::Duration::days(1)).unwrap();
        assert!(matches!(sim.step(start()), Err(AtfError::Data { .. })));
    }

    #[test]
    fn run_is_deterministic() {
        let caps = caps();
        let a = PortfolioSimulator::new(config(40), &caps, market(40))
            .unwrap()
            .run();
        let b = PortfolioSimulator::new(config(40), &caps, market(40))
            .unwrap()
            .run();
        assert_eq!(a.records, b.records);
    }

    #[test]
    fn empty_range_reports_failure() {
        let caps = caps();
        let result = PortfolioSimulator::new(config(10), &caps, MarketData::new())
            .unwrap()
            .run();
        assert!(result.records.is_empty());
        assert!(matches!(result.failure, Some(AtfError::Data { .. })));
    }

    #[test]
    fn cooldown_suppresses_repeated_buys() {
        let caps = caps();
        let mut cfg = config(30);
        cfg.buy_dip.cool = 100;
        let result = PortfolioSimulator::new(cfg, &caps, market(30)).unwrap().run();
        let bd_days = result
            .records
            .iter()
            .filter(|r| r.signal == Signal::BuyDip)
            .count();
        assert_eq!(bd_days, 1);
        assert!(
            result
                .annotations()
                .any(|a| a.message.contains("BD suppressed by BD cooldown"))
        );
    }

    #[test]
    fn unbroken_raw_dip_streak_buys_once() {
        let caps = caps();
        let mut cfg = config(60);
        cfg.buy_dip.cool = 3;
        let result = PortfolioSimulator::new(cfg, &caps, market(60)).unwrap().run();

        let bd_days: Vec<usize> = result
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.signal == Signal::BuyDip)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(bd_days, vec![18]);
        let suppressed = result
            .annotations()
            .filter(|a| a.message == "BD suppressed by BD cooldown")
            .count();
        assert_eq!(suppressed, 60 - 19);
    }
}
