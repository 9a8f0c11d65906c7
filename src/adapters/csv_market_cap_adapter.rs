//! CSV market-cap adapter: a single file of `date,symbol,market_cap` rows,
//! loaded into memory up front.

use crate::adapters::csv_price_adapter::parse_date;
use crate::domain::error::AtfError;
use crate::domain::price::{Symbol, normalize_symbol};
use crate::ports::market_cap_port::MarketCapSnapshotProvider;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct MarketCapRow {
    date: String,
    symbol: String,
    market_cap: f64,
}

#[derive(Debug, Default)]
pub struct CsvMarketCapAdapter {
    snapshots: BTreeMap<NaiveDate, Vec<(Symbol, f64)>>,
}

impl CsvMarketCapAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AtfError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| AtfError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_reader(file, &path.display().to_string())
    }

    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self, AtfError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut by_date: BTreeMap<NaiveDate, HashMap<Symbol, f64>> = BTreeMap::new();

        for (index, result) in rdr.deserialize::<MarketCapRow>().enumerate() {
            let context = format!("{} line {}", source, index + 2);
            let row = result.map_err(|e| AtfError::Data {
                reason: format!("{context}: {e}"),
            })?;
            let date = parse_date(&row.date, &context)?;
            if !row.market_cap.is_finite() {
                continue;
            }
            // repeated symbol on the same date: keep the larger cap
            let caps = by_date.entry(date).or_default();
            let cap = caps.entry(normalize_symbol(&row.symbol)).or_insert(row.market_cap);
            *cap = cap.max(row.market_cap);
        }

        let snapshots = by_date
            .into_iter()
            .map(|(date, caps)| {
                let mut ranked: Vec<(Symbol, f64)> = caps.into_iter().collect();
                ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                (date, ranked)
            })
            .collect();
        Ok(Self { snapshots })
    }

    pub fn snapshot_dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.snapshots.keys()
    }
}

impl MarketCapSnapshotProvider for CsvMarketCapAdapter {
    fn top_n(
        &self,
        date: NaiveDate,
        n: usize,
        exclude: &BTreeSet<Symbol>,
    ) -> Result<Vec<(Symbol, f64)>, AtfError> {
        Ok(self
            .snapshots
            .get(&date)
            .map(|ranked| {
                ranked
                    .iter()
                    .filter(|(s, _)| !exclude.contains(s))
                    .take(n)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
