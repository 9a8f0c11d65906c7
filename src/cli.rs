//! CLI definition and dispatch.

use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::adapters::csv_market_cap_adapter::CsvMarketCapAdapter;
use crate::adapters::csv_price_adapter::CsvPriceAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config::{ConfigAtf, GapPolicy};
use crate::domain::error::AtfError;
use crate::domain::market_data::MarketData;
use crate::domain::metrics::Summary;
use crate::domain::price::normalize_symbol;
use crate::domain::simulator::PortfolioSimulator;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_cap_port::MarketCapSnapshotProvider;
use crate::ports::price_port::PriceSeriesProvider;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "atfbot", about = "Alt index trend-following backtester")]
pub struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose);
    match cli.command {
        Command::Backtest {
            config,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config, output.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // a subscriber may already be installed (tests call run() repeatedly)
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Sections whose keys all have defaults.
const OPTIONAL_SECTIONS: [&str; 5] = ["index", "indicators", "buy_dip", "sell_tp", "sell_sl"];

/// Where the input data lives, resolved against the config file's directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSources {
    pub price_dir: PathBuf,
    pub market_cap_file: PathBuf,
}

/// Maps the INI sections onto a [`ConfigAtf`]. Missing optional keys keep
/// their defaults; the result still has to pass `ConfigAtf::validate`.
pub fn build_config(adapter: &dyn ConfigPort) -> Result<ConfigAtf, AtfError> {
    let start_date = adapter.require_date("backtest", "start_date")?;
    let end_date = adapter.require_date("backtest", "end_date")?;
    let initial_cash = adapter.get_f64("backtest", "initial_cash", 10_000.0)?;
    let mut config = ConfigAtf::new(start_date, end_date, initial_cash);

    config.fee_per_trade = adapter.get_f64("backtest", "fee_per_trade", 0.0)?;
    if let Some(raw) = adapter.get_string("backtest", "gap_policy") {
        config.gap_policy = GapPolicy::parse(&raw).ok_or_else(|| {
            AtfError::invalid(
                "backtest",
                "gap_policy",
                format!("unknown gap policy '{raw}' (expected abort or forward_fill)"),
            )
        })?;
    }

    if let Some(list) = adapter.get_list("index", "stablecoin_exclusions") {
        config.stablecoin_exclusions = list.iter().map(|s| normalize_symbol(s)).collect();
    }

    config.rsi_period = adapter.get_usize("indicators", "rsi_period", config.rsi_period)?;
    config.arsi_period = adapter.get_usize("indicators", "arsi_period", config.arsi_period)?;

    let bd = &mut config.buy_dip;
    bd.dip_share = adapter.get_f64("buy_dip", "dip_share", bd.dip_share)?;
    bd.rsi_min_thresh = adapter.get_f64("buy_dip", "rsi_min_thresh", bd.rsi_min_thresh)?;
    bd.rsi_max_thresh = adapter.get_f64("buy_dip", "rsi_max_thresh", bd.rsi_max_thresh)?;
    bd.cool = adapter.get_usize("buy_dip", "cool", bd.cool)?;
    bd.enable = adapter.get_bool("buy_dip", "enable", bd.enable)?;
    bd.first_buy_full = adapter.get_bool("buy_dip", "first_buy_full", bd.first_buy_full)?;
    bd.all_in_below = adapter.get_f64("buy_dip", "all_in_below", bd.all_in_below)?;

    let tp = &mut config.sell_tp;
    tp.tp_share = adapter.get_f64("sell_tp", "tp_share", tp.tp_share)?;
    tp.rsi_min_thresh = adapter.get_f64("sell_tp", "rsi_min_thresh", tp.rsi_min_thresh)?;
    tp.cool = adapter.get_usize("sell_tp", "cool", tp.cool)?;
    tp.enable = adapter.get_bool("sell_tp", "enable", tp.enable)?;

    let sl = &mut config.sell_sl;
    sl.sl_share = adapter.get_f64("sell_sl", "sl_share", sl.sl_share)?;
    sl.win_sl = adapter.get_usize("sell_sl", "win_sl", sl.win_sl)?;
    sl.rsi_min_thresh = adapter.get_f64("sell_sl", "rsi_min_thresh", sl.rsi_min_thresh)?;
    sl.cool = adapter.get_usize("sell_sl", "cool", sl.cool)?;
    sl.enable = adapter.get_bool("sell_sl", "enable", sl.enable)?;

    Ok(config)
}

pub fn build_data_sources(adapter: &dyn ConfigPort, base_dir: &Path) -> Result<DataSources, AtfError> {
    let price_dir = adapter.require_string("backtest", "price_dir")?;
    let market_cap_file = adapter.require_string("backtest", "market_cap_file")?;
    Ok(DataSources {
        price_dir: base_dir.join(price_dir),
        market_cap_file: base_dir.join(market_cap_file),
    })
}

fn config_base_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Loads, builds and validates the simulation config, reporting failures on stderr.
fn load_atf_config(config_path: &Path) -> Result<(FileConfigAdapter, ConfigAtf), ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    for section in OPTIONAL_SECTIONS {
        if !adapter.has_section(section) {
            debug!(source = adapter.source(), section, "section absent, using defaults");
        }
    }
    let config = build_config(&adapter)
        .and_then(|c| c.validate().map(|()| c))
        .map_err(|e| {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        })?;
    Ok((adapter, config))
}

/// First date of price history to load: enough room before the start date
/// for the indicators to warm up.
pub fn history_start(config: &ConfigAtf) -> NaiveDate {
    let margin = (config.warmup_days() * 2) as i64;
    config.start_date - Duration::days(margin)
}

/// Loads every listed symbol into memory. Symbols without data in range are skipped.
pub fn load_market_data(
    provider: &dyn PriceSeriesProvider,
    config: &ConfigAtf,
) -> Result<MarketData, AtfError> {
    let from = history_start(config);
    let mut market = MarketData::new();
    for symbol in provider.list_symbols()? {
        let points = provider.prices(&symbol, from, config.end_date)?;
        if points.is_empty() {
            debug!(%symbol, "no prices in range, skipping");
            continue;
        }
        market.insert(symbol, points);
    }
    info!(symbols = market.symbol_count(), %from, to = %config.end_date, "loaded price series");
    Ok(market)
}

fn run_backtest(config_path: &Path, output_path: Option<&Path>) -> ExitCode {
    // Stage 1: Load and validate config
    let (adapter, config) = match load_atf_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    // Stage 2: Resolve data sources
    let sources = match build_data_sources(&adapter, &config_base_dir(config_path)) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("Loading market caps from {}", sources.market_cap_file.display());
    let market_caps = match CsvMarketCapAdapter::from_file(&sources.market_cap_file) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let prices = CsvPriceAdapter::new(sources.price_dir);

    let output = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("report"));

    run_backtest_pipeline(config, &prices, &market_caps, &CsvReportAdapter::new(), &output)
}

pub fn run_backtest_pipeline(
    config: ConfigAtf,
    prices: &dyn PriceSeriesProvider,
    market_caps: &dyn MarketCapSnapshotProvider,
    report: &dyn ReportPort,
    output_dir: &Path,
) -> ExitCode {
    // Stage 3: Load price series
    let market = match load_market_data(prices, &config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 4: Simulate
    eprintln!(
        "Running backtest: {} symbols, {} to {}",
        market.symbol_count(),
        config.start_date,
        config.end_date,
    );
    let initial_cash = config.initial_cash;
    let simulator = match PortfolioSimulator::new(config, market_caps, market) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let result = simulator.run();

    // Stage 5: Summarise
    let summary = Summary::compute(&result.records, initial_cash);
    print_summary(&summary);

    // Stage 6: Write report, even for a halted run
    if let Err(e) = report.write(&result, &summary, output_dir) {
        eprintln!("error: failed to write report: {e}");
        return (&e).into();
    }
    eprintln!("\nReport written to: {}", output_dir.display());

    match &result.failure {
        Some(err) => {
            eprintln!(
                "error: simulation halted after {} days: {err}",
                result.records.len()
            );
            err.into()
        }
        None => ExitCode::SUCCESS,
    }
}

pub fn print_summary(summary: &Summary) {
    let s = &summary.strategy;
    let b = &summary.benchmark;
    eprintln!("\n=== Results ===");
    if let (Some(start), Some(end)) = (summary.start_date, summary.end_date) {
        eprintln!("Period:           {} to {} ({} days)", start, end, summary.trading_days);
    }
    eprintln!("                  Strategy    Benchmark");
    eprintln!("Final Value:      {:>10.2}   {:>10.2}", s.final_value, b.final_value);
    eprintln!(
        "Total Return:     {:>9.2}%   {:>9.2}%",
        s.total_return * 100.0,
        b.total_return * 100.0
    );
    eprintln!(
        "Annualized:       {:>9.2}%   {:>9.2}%",
        s.annualized_return * 100.0,
        b.annualized_return * 100.0
    );
    eprintln!(
        "Max Drawdown:     {:>9.1}%   {:>9.1}%",
        -s.max_drawdown * 100.0,
        -b.max_drawdown * 100.0
    );
    eprintln!(
        "Max DD Duration:  {:>10}   {:>10}",
        s.max_drawdown_duration, b.max_drawdown_duration
    );
    eprintln!(
        "\nSignals:          BD {}  TP {}  SL {}",
        summary.buy_dip_days, summary.take_profit_days, summary.stop_loss_days
    );
    eprintln!(
        "Trades:           {} buys, {} sells, fees {:.2}",
        summary.buy_trades, summary.sell_trades, summary.total_fees
    );
}

fn print_config(config: &ConfigAtf, sources: Option<&DataSources>) {
    eprintln!("\nBacktest:");
    eprintln!("  period:       {} to {}", config.start_date, config.end_date);
    eprintln!("  initial_cash: {:.2}", config.initial_cash);
    eprintln!("  fee:          {:.2} per trade", config.fee_per_trade);
    eprintln!("  gap_policy:   {}", config.gap_policy);
    if let Some(sources) = sources {
        eprintln!("  prices:       {}", sources.price_dir.display());
        eprintln!("  market caps:  {}", sources.market_cap_file.display());
    }

    let exclusions = config.exclusions();
    let excluded: Vec<&str> = exclusions.iter().map(String::as_str).collect();
    eprintln!("\nIndex:");
    eprintln!("  excluded:     {}", excluded.join(", "));
    eprintln!(
        "  indicators:   RSI({}) ARSI({})",
        config.rsi_period, config.arsi_period
    );

    let bd = &config.buy_dip;
    let tp = &config.sell_tp;
    let sl = &config.sell_sl;
    eprintln!("\nRules:");
    eprintln!(
        "  BD: enable={} {} < ARSI < {}, invest {}% of cash, cool {}",
        bd.enable, bd.rsi_min_thresh, bd.rsi_max_thresh, bd.dip_share, bd.cool
    );
    eprintln!(
        "  TP: enable={} ARSI > {}, sell {}% of profitable holdings, cool {}",
        tp.enable, tp.rsi_min_thresh, tp.tp_share, tp.cool
    );
    eprintln!(
        "  SL: enable={} ARSI > {} and drop >= {}% within {} days, cool {}",
        sl.enable, sl.rsi_min_thresh, sl.sl_share, sl.win_sl, sl.cool
    );
}

pub fn run_dry_run(config_path: &Path) -> ExitCode {
    let (adapter, config) = match load_atf_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let sources = match build_data_sources(&adapter, &config_base_dir(config_path)) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Config validated successfully");
    print_config(&config, Some(&sources));
    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    let (_, config) = match load_atf_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    print_config(&config, None);
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
