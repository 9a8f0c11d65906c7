//! CSV price adapter: one `<SYMBOL>.csv` file per coin with `date,close` rows.
//!
//! File names are matched case-insensitively, so `btc.csv` serves `BTC`.

use crate::domain::error::AtfError;
use crate::domain::price::{PricePoint, Symbol, normalize_symbol, sanitize_series};
use crate::ports::price_port::PriceSeriesProvider;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: String,
    close: f64,
}

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// `<SYMBOL>.csv` when it exists, otherwise the first file whose stem
    /// normalizes to the same symbol.
    fn csv_path(&self, symbol: &str) -> Result<PathBuf, AtfError> {
        let symbol = normalize_symbol(symbol);
        let canonical = self.base_path.join(format!("{symbol}.csv"));
        if canonical.is_file() {
            return Ok(canonical);
        }
        Ok(self.scan()?.remove(&symbol).unwrap_or(canonical))
    }

    /// Every `.csv` file in the directory, keyed by normalized symbol.
    fn scan(&self) -> Result<BTreeMap<Symbol, PathBuf>, AtfError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| AtfError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut files = BTreeMap::new();
        for entry in entries {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                let symbol = normalize_symbol(&stem.to_string_lossy());
                files.entry(symbol).or_insert(path);
            }
        }
        Ok(files)
    }
}

pub(crate) fn parse_date(raw: &str, context: &str) -> Result<NaiveDate, AtfError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| AtfError::Data {
        reason: format!("{context}: invalid date '{raw}': {e}"),
    })
}

impl PriceSeriesProvider for CsvPriceAdapter {
    fn prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, AtfError> {
        let path = self.csv_path(symbol)?;
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| AtfError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut points = Vec::new();
        for (index, result) in rdr.deserialize::<PriceRow>().enumerate() {
            let line = index + 2;
            let row = result.map_err(|e| AtfError::Data {
                reason: format!("{} line {}: {}", path.display(), line, e),
            })?;
            let context = format!("{} line {}", path.display(), line);
            let date = parse_date(&row.date, &context)?;
            if date < start_date || date > end_date {
                continue;
            }
            if !row.close.is_finite() || row.close < 0.0 {
                return Err(AtfError::Data {
                    reason: format!("{context}: close must be a non-negative number"),
                });
            }
            points.push(PricePoint::new(date, row.close));
        }

        Ok(sanitize_series(points))
    }

    fn list_symbols(&self) -> Result<Vec<Symbol>, AtfError> {
        Ok(self.scan()?.into_keys().collect())
    }
}
