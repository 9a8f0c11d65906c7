//! Applies a day's signal to the portfolio.
//!
//! Buys split a budget equally across the index composition. Sells only touch
//! holdings priced strictly above their cost basis. A flat fee is charged per
//! executed trade; trades the fee would swallow are skipped.

use crate::domain::config::BuyDipConfig;
use crate::domain::portfolio::Portfolio;
use crate::domain::price::Symbol;
use crate::domain::signal::Signal;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub date: NaiveDate,
    pub symbol: Symbol,
    pub side: TradeSide,
    pub signal: Signal,
    pub quantity: f64,
    pub price: f64,
    /// Gross value: amount invested for a buy, proceeds before fee for a sell.
    pub value: f64,
    pub fee: f64,
    /// Average cost basis of the holding after a buy, or at the time of a sell.
    pub cost_basis: f64,
}

/// Cash a buy-the-dip day deploys.
///
/// `dip_share` percent of cash normally; all of it on the first buy of the
/// run when `first_buy_full` is set, or when cash has fallen below
/// `all_in_below`.
pub fn buy_budget(cash: f64, config: &BuyDipConfig, first_buy: bool) -> f64 {
    if cash <= 0.0 {
        return 0.0;
    }
    if (first_buy && config.first_buy_full) || cash < config.all_in_below {
        return cash;
    }
    cash * config.dip_share / 100.0
}

/// Spends `budget` split equally over `symbols`. Symbols without a positive
/// price are skipped and their slice stays in cash.
pub fn buy_equal(
    portfolio: &mut Portfolio,
    date: NaiveDate,
    symbols: &[Symbol],
    prices: &HashMap<Symbol, f64>,
    budget: f64,
    fee: f64,
) -> Vec<Trade> {
    let mut trades = Vec::new();
    if symbols.is_empty() || budget <= 0.0 {
        return trades;
    }

    let per_symbol = budget.min(portfolio.cash) / symbols.len() as f64;
    if per_symbol <= fee {
        return trades;
    }

    for symbol in symbols {
        let Some(&price) = prices.get(symbol).filter(|p| **p > 0.0) else {
            continue;
        };
        let spent = per_symbol - fee;
        let holding = portfolio.holding_mut(symbol);
        let quantity = holding.buy(spent, price);
        let cost_basis = holding.cost_basis;
        portfolio.cash = (portfolio.cash - per_symbol).max(0.0);

        trades.push(Trade {
            date,
            symbol: symbol.clone(),
            side: TradeSide::Buy,
            signal: Signal::BuyDip,
            quantity,
            price,
            value: spent,
            fee,
            cost_basis,
        });
    }
    trades
}

/// Sells `share` percent of every holding that is in profit at today's
/// price. Holdings at or below cost basis are left alone.
pub fn sell_profitable(
    portfolio: &mut Portfolio,
    date: NaiveDate,
    prices: &HashMap<Symbol, f64>,
    share: f64,
    fee: f64,
    signal: Signal,
) -> Vec<Trade> {
    let mut trades = Vec::new();
    let fraction = (share / 100.0).clamp(0.0, 1.0);
    if fraction <= 0.0 {
        return trades;
    }

    for holding in portfolio.holdings.values_mut() {
        let Some(&price) = prices.get(&holding.symbol) else {
            continue;
        };
        if holding.is_empty() || !holding.in_profit_at(price) {
            continue;
        }

        let wanted = if fraction >= 1.0 {
            holding.quantity
        } else {
            holding.quantity * fraction
        };
        let proceeds = wanted * price;
        if proceeds <= fee {
            continue;
        }

        let cost_basis = holding.cost_basis;
        let quantity = holding.sell(wanted);
        portfolio.cash += proceeds - fee;

        trades.push(Trade {
            date,
            symbol: holding.symbol.clone(),
            side: TradeSide::Sell,
            signal,
            quantity,
            price,
            value: proceeds,
            fee,
            cost_basis,
        });
    }

    portfolio.drop_empty();
    trades
}

pub fn take_profit(
    portfolio: &mut Portfolio,
    date: NaiveDate,
    prices: &HashMap<Symbol, f64>,
    tp_share: f64,
    fee: f64,
) -> Vec<Trade> {
    sell_profitable(portfolio, date, prices, tp_share, fee, Signal::TakeProfit)
}

pub fn stop_loss(
    portfolio: &mut Portfolio,
    date: NaiveDate,
    prices: &HashMap<Symbol, f64>,
    fee: f64,
) -> Vec<Trade> {
    sell_profitable(portfolio, date, prices, 100.0, fee, Signal::StopLoss)
}
