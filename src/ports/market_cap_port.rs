//! Market-cap ranking port trait.

use crate::domain::error::AtfError;
use crate::domain::price::Symbol;
use chrono::NaiveDate;
use std::collections::BTreeSet;

pub trait MarketCapSnapshotProvider {
    /// Up to `n` symbols ranked by market cap (largest first) on `date`,
    /// skipping everything in `exclude`. An empty result means no snapshot
    /// exists for that date.
    fn top_n(
        &self,
        date: NaiveDate,
        n: usize,
        exclude: &BTreeSet<Symbol>,
    ) -> Result<Vec<(Symbol, f64)>, AtfError>;
}
