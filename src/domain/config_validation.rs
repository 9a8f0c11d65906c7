//! Configuration validation.
//!
//! Checks every threshold of a [`ConfigAtf`] before a simulation is allowed
//! to start. Each check reports the INI section/key it came from.

use crate::domain::config::ConfigAtf;
use crate::domain::error::AtfError;

pub fn validate_config(config: &ConfigAtf) -> Result<(), AtfError> {
    validate_initial_cash(config)?;
    validate_fee(config)?;
    validate_dates(config)?;
    validate_periods(config)?;
    validate_buy_dip(config)?;
    validate_sell_tp(config)?;
    validate_sell_sl(config)?;
    Ok(())
}

fn validate_initial_cash(config: &ConfigAtf) -> Result<(), AtfError> {
    if !(config.initial_cash > 0.0) || !config.initial_cash.is_finite() {
        return Err(AtfError::invalid(
            "backtest",
            "initial_cash",
            "initial_cash must be positive",
        ));
    }
    Ok(())
}

fn validate_fee(config: &ConfigAtf) -> Result<(), AtfError> {
    if !(config.fee_per_trade >= 0.0) {
        return Err(AtfError::invalid(
            "backtest",
            "fee_per_trade",
            "fee_per_trade must be non-negative",
        ));
    }
    Ok(())
}

fn validate_dates(config: &ConfigAtf) -> Result<(), AtfError> {
    if config.start_date >= config.end_date {
        return Err(AtfError::invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

fn validate_periods(config: &ConfigAtf) -> Result<(), AtfError> {
    if config.rsi_period == 0 {
        return Err(AtfError::invalid(
            "indicators",
            "rsi_period",
            "rsi_period must be at least 1",
        ));
    }
    if config.arsi_period == 0 {
        return Err(AtfError::invalid(
            "indicators",
            "arsi_period",
            "arsi_period must be at least 1",
        ));
    }
    Ok(())
}

fn check_share(section: &str, key: &str, value: f64) -> Result<(), AtfError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(AtfError::invalid(
            section,
            key,
            format!("{key} must be within [0, 100]"),
        ));
    }
    Ok(())
}

fn check_rsi_level(section: &str, key: &str, value: f64) -> Result<(), AtfError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(AtfError::invalid(
            section,
            key,
            format!("{key} must be an RSI level within [0, 100]"),
        ));
    }
    Ok(())
}

fn validate_buy_dip(config: &ConfigAtf) -> Result<(), AtfError> {
    let bd = &config.buy_dip;
    check_share("buy_dip", "dip_share", bd.dip_share)?;
    check_rsi_level("buy_dip", "rsi_min_thresh", bd.rsi_min_thresh)?;
    check_rsi_level("buy_dip", "rsi_max_thresh", bd.rsi_max_thresh)?;
    if bd.rsi_min_thresh >= bd.rsi_max_thresh {
        return Err(AtfError::invalid(
            "buy_dip",
            "rsi_min_thresh",
            "rsi_min_thresh must be below rsi_max_thresh",
        ));
    }
    if !(bd.all_in_below >= 0.0) {
        return Err(AtfError::invalid(
            "buy_dip",
            "all_in_below",
            "all_in_below must be non-negative",
        ));
    }
    Ok(())
}

fn validate_sell_tp(config: &ConfigAtf) -> Result<(), AtfError> {
    let tp = &config.sell_tp;
    check_share("sell_tp", "tp_share", tp.tp_share)?;
    check_rsi_level("sell_tp", "rsi_min_thresh", tp.rsi_min_thresh)?;
    Ok(())
}

fn validate_sell_sl(config: &ConfigAtf) -> Result<(), AtfError> {
    let sl = &config.sell_sl;
    check_share("sell_sl", "sl_share", sl.sl_share)?;
    check_rsi_level("sell_sl", "rsi_min_thresh", sl.rsi_min_thresh)?;
    if sl.win_sl == 0 {
        return Err(AtfError::invalid(
            "sell_sl",
            "win_sl",
            "win_sl must be at least 1",
        ));
    }
    Ok(())
}
