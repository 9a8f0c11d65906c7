//! Daily close prices per symbol.

use chrono::NaiveDate;

/// Coin ticker, upper-cased (e.g. "BTC").
pub type Symbol = String;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        PricePoint { date, close }
    }
}

/// Upper-cases and trims a raw ticker.
pub fn normalize_symbol(raw: &str) -> Symbol {
    raw.trim().to_uppercase()
}

/// Sorts by date and drops duplicate dates, keeping the last point seen for a date.
pub fn sanitize_series(mut points: Vec<PricePoint>) -> Vec<PricePoint> {
    points.sort_by_key(|p| p.date);
    let mut out: Vec<PricePoint> = Vec::with_capacity(points.len());
    for point in points {
        match out.last_mut() {
            Some(last) if last.date == point.date => *last = point,
            _ => out.push(point),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn normalize_symbol_uppercases_and_trims() {
        assert_eq!(normalize_symbol("  btc "), "BTC");
    }

    #[test]
    fn sanitize_sorts_by_date() {
        let points = vec![
            PricePoint::new(d(3), 3.0),
            PricePoint::new(d(1), 1.0),
            PricePoint::new(d(2), 2.0),
        ];
        let out = sanitize_series(points);
        let dates: Vec<_> = out.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(1), d(2), d(3)]);
    }

    #[test]
    fn sanitize_drops_duplicate_dates() {
        let points = vec![
            PricePoint::new(d(1), 1.0),
            PricePoint::new(d(2), 2.0),
            PricePoint::new(d(2), 2.5),
        ];
        let out = sanitize_series(points);
        assert_eq!(out.len(), 2);
        assert!((out[1].close - 2.5).abs() < f64::EPSILON);
    }
}
