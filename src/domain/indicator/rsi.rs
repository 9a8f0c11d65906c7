//! RSI (Relative Strength Index).
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, or 50 when avg_gain is 0 as well.
//!
//! Warmup: the first n points are invalid (need n price changes to seed the averages).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::price::PricePoint;

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub fn rsi_series(prices: &[PricePoint], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Rsi(period);

    if period == 0 || prices.len() <= period {
        return IndicatorSeries {
            indicator_type,
            values: prices
                .iter()
                .map(|p| IndicatorPoint::invalid(p.date))
                .collect(),
        };
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = prices
        .windows(2)
        .map(|w| {
            let change = w[1].close - w[0].close;
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let mut values = Vec::with_capacity(prices.len());
    values.extend(prices[..period].iter().map(|p| IndicatorPoint::invalid(p.date)));

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
    values.push(IndicatorPoint::valid(
        prices[period].date,
        rsi_value(avg_gain, avg_loss),
    ));

    let n = period as f64;
    for i in (period + 1)..prices.len() {
        // change i-1 is the move into price i
        avg_gain = (avg_gain * (n - 1.0) + gains[i - 1]) / n;
        avg_loss = (avg_loss * (n - 1.0) + losses[i - 1]) / n;
        values.push(IndicatorPoint::valid(
            prices[i].date,
            rsi_value(avg_gain, avg_loss),
        ));
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
