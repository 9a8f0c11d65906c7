//! Historical price access port trait.

use crate::domain::error::AtfError;
use crate::domain::price::{PricePoint, Symbol};
use chrono::NaiveDate;

pub trait PriceSeriesProvider {
    /// Daily closes for `symbol` within `[start_date, end_date]`, sorted by date.
    fn prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, AtfError>;

    fn list_symbols(&self) -> Result<Vec<Symbol>, AtfError>;
}
