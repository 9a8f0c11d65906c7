//! ARSI: simple moving average of RSI over a short trailing window.
//!
//! A point is valid only once the `period` most recent RSI points are all valid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn arsi_series(rsi: &IndicatorSeries, period: usize) -> IndicatorSeries {
    let rsi_period = match rsi.indicator_type {
        IndicatorType::Rsi(p) => p,
        IndicatorType::Arsi { rsi_period, .. } => rsi_period,
    };

    let mut values = Vec::with_capacity(rsi.values.len());
    let mut run = 0usize;
    let mut window_sum = 0.0;

    for (i, point) in rsi.values.iter().enumerate() {
        if !point.valid {
            run = 0;
            window_sum = 0.0;
            values.push(IndicatorPoint::invalid(point.date));
            continue;
        }

        run += 1;
        window_sum += point.value;
        if run > period {
            window_sum -= rsi.values[i - period].value;
        }

        if period > 0 && run >= period {
            let mean = window_sum / period as f64;
            values.push(IndicatorPoint::valid(point.date, mean.clamp(0.0, 100.0)));
        } else {
            values.push(IndicatorPoint::invalid(point.date));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Arsi { rsi_period, period },
        values,
    }
}
