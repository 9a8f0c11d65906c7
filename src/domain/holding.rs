//! A coin position with its volume-weighted average cost basis.

use crate::domain::price::Symbol;

#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: Symbol,
    pub quantity: f64,
    pub cost_basis: f64,
}

impl Holding {
    pub fn new(symbol: Symbol) -> Self {
        Holding {
            symbol,
            quantity: 0.0,
            cost_basis: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quantity <= 0.0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    /// No-loss rule: a holding may only be sold above what was paid for it.
    pub fn in_profit_at(&self, price: f64) -> bool {
        price > self.cost_basis
    }

    /// Spends `spent` at `price` and re-averages the cost basis.
    /// Returns the quantity bought.
    pub fn buy(&mut self, spent: f64, price: f64) -> f64 {
        if spent <= 0.0 || price <= 0.0 {
            return 0.0;
        }
        let bought = spent / price;
        let total_qty = self.quantity + bought;
        self.cost_basis = (self.quantity * self.cost_basis + spent) / total_qty;
        self.quantity = total_qty;
        bought
    }

    /// Removes up to `quantity` units. The cost basis of what remains is unchanged.
    pub fn sell(&mut self, quantity: f64) -> f64 {
        let sold = quantity.clamp(0.0, self.quantity);
        self.quantity -= sold;
        if self.quantity <= f64::EPSILON * sold.max(1.0) {
            self.quantity = 0.0;
        }
        sold
    }
}
