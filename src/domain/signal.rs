//! Daily trading signal from the index-level indicators.
//!
//! At most one signal per day. Priority when several rules hold:
//! stop loss, then take profit, then buy the dip.

use crate::domain::config::{BuyDipConfig, ConfigAtf, SellSlConfig, SellTpConfig};
use crate::domain::indicator::IndicatorSample;
use chrono::NaiveDate;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signal {
    #[default]
    None,
    BuyDip,
    TakeProfit,
    StopLoss,
}

impl Signal {
    pub fn code(&self) -> &'static str {
        match self {
            Signal::None => "NONE",
            Signal::BuyDip => "BD",
            Signal::TakeProfit => "TP",
            Signal::StopLoss => "SL",
        }
    }

    pub fn is_trade(&self) -> bool {
        *self != Signal::None
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Raw rule outcomes for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Triggers {
    pub stop_loss: bool,
    pub take_profit: bool,
    pub buy_dip: bool,
}

impl Triggers {
    /// Signals that fired, highest priority first.
    pub fn fired(self) -> impl Iterator<Item = Signal> {
        [
            (self.stop_loss, Signal::StopLoss),
            (self.take_profit, Signal::TakeProfit),
            (self.buy_dip, Signal::BuyDip),
        ]
        .into_iter()
        .filter_map(|(hit, signal)| hit.then_some(signal))
    }
}

#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    buy_dip: BuyDipConfig,
    sell_tp: SellTpConfig,
    sell_sl: SellSlConfig,
}

impl SignalEvaluator {
    pub fn new(config: &ConfigAtf) -> Self {
        SignalEvaluator {
            buy_dip: config.buy_dip.clone(),
            sell_tp: config.sell_tp.clone(),
            sell_sl: config.sell_sl.clone(),
        }
    }

    /// Every rule that holds on `date`, before priority and cooldowns.
    /// `index_history` is the index value series up to and including `date`.
    pub fn triggers(&self, sample: &IndicatorSample, index_history: &[f64]) -> Triggers {
        let Some(arsi) = sample.arsi else {
            return Triggers::default();
        };
        Triggers {
            stop_loss: self.stop_loss_fires(arsi, index_history),
            take_profit: self.take_profit_fires(arsi),
            buy_dip: self.buy_dip_fires(arsi),
        }
    }

    /// The highest-priority rule that holds, ignoring cooldowns.
    pub fn evaluate(
        &self,
        date: NaiveDate,
        sample: &IndicatorSample,
        index_history: &[f64],
    ) -> Signal {
        let signal = self
            .triggers(sample, index_history)
            .fired()
            .next()
            .unwrap_or_default();
        debug!(%date, arsi = ?sample.arsi, %signal, "evaluated signal");
        signal
    }

    fn stop_loss_fires(&self, arsi: f64, index_history: &[f64]) -> bool {
        self.sell_sl.enable
            && arsi > self.sell_sl.rsi_min_thresh
            && drawdown_in_window(index_history, self.sell_sl.win_sl)
                .is_some_and(|dd| dd >= self.sell_sl.sl_share)
    }

    fn take_profit_fires(&self, arsi: f64) -> bool {
        self.sell_tp.enable && arsi > self.sell_tp.rsi_min_thresh
    }

    fn buy_dip_fires(&self, arsi: f64) -> bool {
        self.buy_dip.enable
            && arsi > self.buy_dip.rsi_min_thresh
            && arsi < self.buy_dip.rsi_max_thresh
    }
}

/// Percent drop of the last value from the maximum of the trailing `window`
/// values (the last value included).
pub fn drawdown_in_window(history: &[f64], window: usize) -> Option<f64> {
    let current = *history.last()?;
    let start = history.len().saturating_sub(window.max(1));
    let max = history[start..].iter().copied().fold(f64::MIN, f64::max);
    if max <= 0.0 {
        return None;
    }
    Some((max - current) / max * 100.0)
}

/// Remaining suppression days per signal kind.
#[derive(Debug, Clone, Default)]
pub struct Cooldown {
    lengths: [usize; 3],
    remaining: [usize; 3],
}

fn slot(signal: Signal) -> Option<usize> {
    match signal {
        Signal::BuyDip => Some(0),
        Signal::TakeProfit => Some(1),
        Signal::StopLoss => Some(2),
        Signal::None => None,
    }
}

impl Cooldown {
    pub fn new(config: &ConfigAtf) -> Self {
        Cooldown {
            lengths: [config.buy_dip.cool, config.sell_tp.cool, config.sell_sl.cool],
            remaining: [0; 3],
        }
    }

    fn cooling(&self, signal: Signal) -> bool {
        slot(signal).is_some_and(|i| self.remaining[i] > 0)
    }

    /// The kind whose cooldown currently suppresses `signal`, if any.
    /// BD also waits on TP and SL; SL also waits on BD.
    pub fn blocked_by(&self, signal: Signal) -> Option<Signal> {
        let blockers: &[Signal] = match signal {
            Signal::None => &[],
            Signal::BuyDip => &[Signal::BuyDip, Signal::StopLoss, Signal::TakeProfit],
            Signal::TakeProfit => &[Signal::TakeProfit],
            Signal::StopLoss => &[Signal::StopLoss, Signal::BuyDip],
        };
        blockers.iter().copied().find(|b| self.cooling(*b))
    }

    /// Ends the trading day: counts every cooldown down, then restarts the
    /// one of each rule that held today, whether or not it was acted on.
    pub fn advance(&mut self, raw: Triggers) {
        for r in self.remaining.iter_mut() {
            *r = r.saturating_sub(1);
        }
        for signal in raw.fired() {
            if let Some(i) = slot(signal) {
                self.remaining[i] = self.lengths[i];
            }
        }
    }

    /// Applies the cooldowns to today's raw triggers: the highest-priority
    /// signal that is not suppressed, plus every suppression met on the way.
    pub fn filter(&self, raw: Triggers) -> (Signal, Vec<(Signal, Signal)>) {
        let mut suppressed = Vec::new();
        for signal in raw.fired() {
            match self.blocked_by(signal) {
                Some(blocker) => suppressed.push((signal, blocker)),
                None => return (signal, suppressed),
            }
        }
        (Signal::None, suppressed)
    }
}
