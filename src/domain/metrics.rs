//! Performance summary of a simulation against its buy-and-hold benchmark.

use crate::domain::execution::TradeSide;
use crate::domain::signal::Signal;
use crate::domain::simulator::SimulationRecord;
use chrono::NaiveDate;

const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CurveStats {
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    /// Longest run of trading days spent below a previous peak.
    pub max_drawdown_duration: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub trading_days: usize,
    pub strategy: CurveStats,
    pub benchmark: CurveStats,
    pub buy_dip_days: usize,
    pub take_profit_days: usize,
    pub stop_loss_days: usize,
    pub buy_trades: usize,
    pub sell_trades: usize,
    pub total_fees: f64,
}

impl Summary {
    pub fn compute(records: &[SimulationRecord], initial_cash: f64) -> Self {
        let start_date = records.first().map(|r| r.date);
        let end_date = records.last().map(|r| r.date);
        let calendar_days = match (start_date, end_date) {
            (Some(s), Some(e)) => (e - s).num_days(),
            _ => 0,
        };

        let strategy: Vec<(NaiveDate, f64)> =
            records.iter().map(|r| (r.date, r.portfolio_value)).collect();
        let benchmark: Vec<(NaiveDate, f64)> =
            records.iter().map(|r| (r.date, r.benchmark_value)).collect();

        let count_signal = |s: Signal| records.iter().filter(|r| r.signal == s).count();
        let trades = || records.iter().flat_map(|r| r.trades.iter());

        Summary {
            start_date,
            end_date,
            trading_days: records.len(),
            strategy: curve_stats(&strategy, initial_cash, calendar_days),
            benchmark: curve_stats(&benchmark, initial_cash, calendar_days),
            buy_dip_days: count_signal(Signal::BuyDip),
            take_profit_days: count_signal(Signal::TakeProfit),
            stop_loss_days: count_signal(Signal::StopLoss),
            buy_trades: trades().filter(|t| t.side == TradeSide::Buy).count(),
            sell_trades: trades().filter(|t| t.side == TradeSide::Sell).count(),
            total_fees: trades().map(|t| t.fee).sum(),
        }
    }
}

fn curve_stats(curve: &[(NaiveDate, f64)], initial: f64, calendar_days: i64) -> CurveStats {
    let final_value = curve.last().map(|(_, v)| *v).unwrap_or(initial);

    let total_return = if initial > 0.0 {
        (final_value - initial) / initial
    } else {
        0.0
    };

    let years = calendar_days as f64 / DAYS_PER_YEAR;
    let annualized_return = if years > 0.0 && total_return > -1.0 {
        (1.0 + total_return).powf(1.0 / years) - 1.0
    } else {
        0.0
    };

    let (max_drawdown, max_drawdown_duration) = compute_drawdown(curve);

    CurveStats {
        final_value,
        total_return,
        annualized_return,
        max_drawdown,
        max_drawdown_duration,
    }
}

fn compute_drawdown(curve: &[(NaiveDate, f64)]) -> (f64, i64) {
    let Some(&(_, first)) = curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for &(_, value) in curve {
        if value >= peak {
            peak = value;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - value) / peak);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}
