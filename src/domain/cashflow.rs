//! Cash-flow timeline points consumed by the return calculator.

use serde::{Deserialize, Serialize};

/// A dated cash movement from the investor's point of view.
///
/// Negative amounts are money put in (deposits), positive amounts are money
/// taken out (withdrawals, terminal value).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlow {
    pub amount: f64,
    pub days_from_start: f64,
}

impl CashFlow {
    pub fn new(amount: f64, days_from_start: f64) -> Self {
        Self {
            amount,
            days_from_start,
        }
    }

    pub fn outflow(amount: f64, days_from_start: f64) -> Self {
        Self::new(-amount.abs(), days_from_start)
    }

    pub fn inflow(amount: f64, days_from_start: f64) -> Self {
        Self::new(amount.abs(), days_from_start)
    }

    pub fn is_deposit(&self) -> bool {
        self.amount < 0.0
    }
}
