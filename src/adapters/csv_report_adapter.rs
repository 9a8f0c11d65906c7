//! CSV report adapter implementing ReportPort.
//!
//! Writes one file per table into the output directory:
//! `equity.csv`, `trades.csv`, `compositions.csv`, `annotations.csv` and
//! `summary.csv`. Any plotting tool can chart the equity file directly.

use crate::domain::error::AtfError;
use crate::domain::metrics::{CurveStats, Summary};
use crate::domain::simulator::SimulationResult;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Serialize)]
struct EquityRow {
    date: String,
    portfolio_value: f64,
    benchmark_value: f64,
    cash: f64,
    index_value: f64,
    rsi: Option<f64>,
    arsi: Option<f64>,
    signal: &'static str,
    trades: usize,
}

#[derive(Serialize)]
struct TradeRow<'a> {
    date: String,
    symbol: &'a str,
    side: String,
    signal: &'static str,
    quantity: f64,
    price: f64,
    value: f64,
    fee: f64,
    cost_basis: f64,
}

#[derive(Serialize)]
struct CompositionRow<'a> {
    effective_date: String,
    rank: usize,
    symbol: &'a str,
}

#[derive(Serialize)]
struct AnnotationRow<'a> {
    date: String,
    level: String,
    message: &'a str,
}

#[derive(Serialize)]
struct SummaryRow {
    metric: &'static str,
    strategy: f64,
    benchmark: f64,
}

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<(), AtfError> {
    let mut wtr = csv::Writer::from_path(path).map_err(std::io::Error::from)?;
    for row in rows {
        wtr.serialize(row).map_err(std::io::Error::from)?;
    }
    wtr.flush()?;
    Ok(())
}

fn summary_rows(summary: &Summary) -> Vec<SummaryRow> {
    let row = |metric, f: fn(&CurveStats) -> f64| SummaryRow {
        metric,
        strategy: f(&summary.strategy),
        benchmark: f(&summary.benchmark),
    };
    vec![
        row("final_value", |s| s.final_value),
        row("total_return", |s| s.total_return),
        row("annualized_return", |s| s.annualized_return),
        row("max_drawdown", |s| s.max_drawdown),
        row("max_drawdown_duration", |s| s.max_drawdown_duration as f64),
    ]
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &SimulationResult,
        summary: &Summary,
        output_dir: &Path,
    ) -> Result<(), AtfError> {
        fs::create_dir_all(output_dir)?;

        write_rows(
            &output_dir.join("equity.csv"),
            result.records.iter().map(|r| EquityRow {
                date: r.date.to_string(),
                portfolio_value: r.portfolio_value,
                benchmark_value: r.benchmark_value,
                cash: r.cash,
                index_value: r.index_value,
                rsi: r.rsi,
                arsi: r.arsi,
                signal: r.signal.code(),
                trades: r.trades.len(),
            }),
        )?;

        write_rows(
            &output_dir.join("trades.csv"),
            result.trades().map(|t| TradeRow {
                date: t.date.to_string(),
                symbol: &t.symbol,
                side: t.side.to_string(),
                signal: t.signal.code(),
                quantity: t.quantity,
                price: t.price,
                value: t.value,
                fee: t.fee,
                cost_basis: t.cost_basis,
            }),
        )?;

        write_rows(
            &output_dir.join("compositions.csv"),
            result.compositions.iter().flat_map(|c| {
                c.symbols.iter().enumerate().map(|(i, s)| CompositionRow {
                    effective_date: c.effective_date.to_string(),
                    rank: i + 1,
                    symbol: s,
                })
            }),
        )?;

        let failure_message = result.failure.as_ref().map(|e| e.to_string());
        let mut annotations: Vec<AnnotationRow> = result
            .annotations()
            .map(|a| AnnotationRow {
                date: a.date.to_string(),
                level: a.level.to_string(),
                message: &a.message,
            })
            .collect();
        if let (Some(message), Some(last)) = (failure_message.as_deref(), result.records.last()) {
            annotations.push(AnnotationRow {
                date: last.date.to_string(),
                level: "ERROR".into(),
                message,
            });
        }
        write_rows(&output_dir.join("annotations.csv"), annotations)?;

        write_rows(&output_dir.join("summary.csv"), summary_rows(summary))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alt_index::IndexComposition;
    use crate::domain::execution::{Trade, TradeSide};
    use crate::domain::portfolio::Portfolio;
    use crate::domain::signal::Signal;
    use crate::domain::simulator::{Annotation, SimulationRecord};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn sample_result(failure: Option<AtfError>) -> SimulationResult {
        let trade = Trade {
            date: d(2),
            symbol: "BTC".into(),
            side: TradeSide::Buy,
            signal: Signal::BuyDip,
            quantity: 0.5,
            price: 400.0,
            value: 200.0,
            fee: 0.0,
            cost_basis: 400.0,
        };
        let records = vec![
            SimulationRecord {
                date: d(1),
                portfolio_value: 1_000.0,
                benchmark_value: 1_000.0,
                cash: 1_000.0,
                index_value: 1_000.0,
                rsi: None,
                arsi: None,
                signal: Signal::None,
                trades: vec![],
                annotations: vec![Annotation::info(d(1), "insufficient history")],
            },
            SimulationRecord {
                date: d(2),
                portfolio_value: 1_000.0,
                benchmark_value: 990.0,
                cash: 800.0,
                index_value: 990.0,
                rsi: Some(30.0),
                arsi: Some(35.0),
                signal: Signal::BuyDip,
                trades: vec![trade],
                annotations: vec![],
            },
        ];
        SimulationResult {
            records,
            failure,
            portfolio: Portfolio::new(1_000.0),
            compositions: vec![IndexComposition {
                effective_date: d(1),
                symbols: vec!["BTC".into(), "XRP".into()],
            }],
        }
    }

    fn write_to_temp(result: &SimulationResult) -> TempDir {
        let dir = TempDir::new().unwrap();
        let summary = Summary::compute(&result.records, 1_000.0);
        CsvReportAdapter::new()
            .write(result, &summary, dir.path())
            .unwrap();
        dir
    }

    #[test]
    fn writes_equity_curve() {
        let dir = write_to_temp(&sample_result(None));
        let equity = fs::read_to_string(dir.path().join("equity.csv")).unwrap();
        let lines: Vec<_> = equity.lines().collect();
        assert_eq!(
            lines[0],
            "date,portfolio_value,benchmark_value,cash,index_value,rsi,arsi,signal,trades"
        );
        assert_eq!(lines[1], "2024-03-01,1000.0,1000.0,1000.0,1000.0,,,NONE,0");
        assert_eq!(lines[2], "2024-03-02,1000.0,990.0,800.0,990.0,30.0,35.0,BD,1");
    }

    #[test]
    fn writes_trades_and_compositions() {
        let dir = write_to_temp(&sample_result(None));
        let trades = fs::read_to_string(dir.path().join("trades.csv")).unwrap();
        assert!(trades.contains("2024-03-02,BTC,BUY,BD,0.5,400.0,200.0,0.0,400.0"));

        let compositions = fs::read_to_string(dir.path().join("compositions.csv")).unwrap();
        let lines: Vec<_> = compositions.lines().collect();
        assert_eq!(lines[0], "effective_date,rank,symbol");
        assert_eq!(lines[1], "2024-03-01,1,BTC");
        assert_eq!(lines[2], "2024-03-01,2,XRP");
    }

    #[test]
    fn failure_is_logged_with_annotations() {
        let failure = AtfError::PriceGap {
            symbol: "XRP".into(),
            date: d(3),
        };
        let dir = write_to_temp(&sample_result(Some(failure)));
        let annotations = fs::read_to_string(dir.path().join("annotations.csv")).unwrap();
        assert!(annotations.contains("2024-03-01,INFO,insufficient history"));
        assert!(annotations.contains("ERROR,missing price for XRP on 2024-03-03"));
    }

    #[test]
    fn writes_summary_table() {
        let dir = write_to_temp(&sample_result(None));
        let summary = fs::read_to_string(dir.path().join("summary.csv")).unwrap();
        assert!(summary.starts_with("metric,strategy,benchmark\n"));
        assert!(summary.contains("final_value,1000.0,990.0"));
    }

    #[test]
    fn creates_missing_output_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("runs").join("latest");
        let result = sample_result(None);
        let summary = Summary::compute(&result.records, 1_000.0);
        CsvReportAdapter::new()
            .write(&result, &summary, &nested)
            .unwrap();
        assert!(nested.join("equity.csv").exists());
    }
}
