//! Stake positions and the records produced when they are exited.

use crate::domain::{Asset, Decimal, TimeMs};
use serde::{Deserialize, Serialize};

/// A staked holding opened by one stake action.
///
/// `deposit_qty` and `deposit_cost` never change after open; every exit's
/// cost basis is derived from that pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub asset: Asset,
    pub account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault: Option<String>,
    pub deposit_qty: Decimal,
    pub deposit_cost: Decimal,
    pub deposit_date: TimeMs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_date: Option<TimeMs>,
    pub remaining_qty: Decimal,
    pub realized_pnl: Decimal,
    /// Sum of USD received across all exits.
    pub exit_value_total: Decimal,
    /// Number of exits applied so far.
    pub exit_count: i64,
}

impl Position {
    pub fn open(
        id: String,
        asset: Asset,
        account: String,
        qty: Decimal,
        cost_usd: Decimal,
        at: TimeMs,
    ) -> Self {
        Self {
            id,
            asset,
            account,
            vault: None,
            deposit_qty: qty,
            deposit_cost: cost_usd,
            deposit_date: at,
            exit_date: None,
            remaining_qty: qty,
            realized_pnl: Decimal::zero(),
            exit_value_total: Decimal::zero(),
            exit_count: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.remaining_qty.is_positive() && self.exit_date.is_none()
    }

    pub fn exited_qty(&self) -> Decimal {
        self.deposit_qty - self.remaining_qty
    }

    /// Original cost attributable to `qty` units.
    pub fn cost_basis_for(&self, qty: Decimal) -> Decimal {
        if !self.deposit_qty.is_positive() {
            return Decimal::zero();
        }
        self.deposit_cost * qty / self.deposit_qty
    }

    /// Cost basis of the portion already exited.
    pub fn exited_cost(&self) -> Decimal {
        if self.exit_count > 0 && self.remaining_qty.is_zero() {
            return self.deposit_cost;
        }
        self.cost_basis_for(self.exited_qty())
    }

    /// Realized PnL over the cost of everything exited so far, in percent.
    pub fn blended_roi_pct(&self) -> Decimal {
        self.realized_pnl.pct_of(self.exited_cost())
    }
}

/// Input to a single unstake transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnstakeRequest {
    /// Ignored when `close_all` is set.
    #[serde(default)]
    pub qty: Option<Decimal>,
    pub exit_value_usd: Decimal,
    pub at: TimeMs,
    #[serde(default)]
    pub close_all: bool,
}

impl UnstakeRequest {
    pub fn partial(qty: Decimal, exit_value_usd: Decimal, at: TimeMs) -> Self {
        Self {
            qty: Some(qty),
            exit_value_usd,
            at,
            close_all: false,
        }
    }

    pub fn close_all(exit_value_usd: Decimal, at: TimeMs) -> Self {
        Self {
            qty: None,
            exit_value_usd,
            at,
            close_all: true,
        }
    }
}

/// Outcome of one exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealizedPnl {
    pub qty: Decimal,
    pub exit_value_usd: Decimal,
    pub cost_basis: Decimal,
    pub pnl: Decimal,
    pub roi_pct: Decimal,
    pub closed: bool,
}

/// Persisted history line for one applied unstake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionExit {
    pub position_id: String,
    pub seq: i64,
    pub qty: Decimal,
    pub exit_value_usd: Decimal,
    pub cost_basis: Decimal,
    pub pnl: Decimal,
    pub roi_pct: Decimal,
    pub at: TimeMs,
    pub close_all: bool,
}

impl PositionExit {
    pub fn from_realized(position_id: &str, seq: i64, request: &UnstakeRequest, pnl: &RealizedPnl) -> Self {
        Self {
            position_id: position_id.to_string(),
            seq,
            qty: pnl.qty,
            exit_value_usd: pnl.exit_value_usd,
            cost_basis: pnl.cost_basis,
            pnl: pnl.pnl,
            roi_pct: pnl.roi_pct,
            at: request.at,
            close_all: request.close_all,
        }
    }
}
