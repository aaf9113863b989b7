//! Money-weighted performance of positions and vaults.
//!
//! Both reports convert persisted history into a cash-flow timeline starting
//! at the first deposit and hand it to the return calculator. Anything still
//! held is valued at the current rate as a terminal inflow dated now.

use crate::db::Repository;
use crate::domain::{CashFlow, Decimal, EntryType, Position, PositionExit, TimeMs, VaultEntry};
use crate::engine::{calculate_irr, calculate_irr_based_apr, calculate_roi};
use crate::orchestration::accountant::AccountingError;
use crate::orchestration::ledger::{LedgerError, VaultLedger};
use crate::rates::RateResolver;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionPerformance {
    pub position_id: String,
    pub realized_pnl: Decimal,
    /// Realized PnL over the cost basis of everything exited, in percent.
    pub blended_roi_pct: Decimal,
    /// Remaining quantity at today's rate. Zero once closed.
    pub unrealized_value_usd: Decimal,
    /// Exits plus unrealized value, minus the deposit cost, over the cost.
    pub total_roi_pct: f64,
    pub irr: f64,
    pub apr_pct: f64,
    pub days_held: f64,
    pub cash_flows: Vec<CashFlow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultPerformance {
    pub vault: String,
    pub total_deposited_usd: Decimal,
    pub total_withdrawn_usd: Decimal,
    pub aum_usd: Decimal,
    pub roi_pct: f64,
    pub irr: f64,
    pub apr_pct: f64,
    pub days: f64,
    pub cash_flows: Vec<CashFlow>,
}

#[derive(Debug, Clone)]
pub struct PerformanceReporter {
    repo: Arc<Repository>,
    resolver: Arc<RateResolver>,
    ledger: VaultLedger,
}

impl PerformanceReporter {
    pub fn new(repo: Arc<Repository>, resolver: Arc<RateResolver>) -> Self {
        let ledger = VaultLedger::new(repo.clone(), resolver.clone());
        Self {
            repo,
            resolver,
            ledger,
        }
    }

    pub async fn position_performance(
        &self,
        position_id: &str,
    ) -> Result<PositionPerformance, AccountingError> {
        let position = self
            .repo
            .find_position(position_id)
            .await?
            .ok_or_else(|| AccountingError::NotFound(position_id.to_string()))?;
        let exits = self.repo.list_exits(position_id).await?;

        let unrealized_value_usd = if position.is_open() {
            self.resolver
                .current_rate_usd(&position.asset)
                .await
                .value_of(position.remaining_qty)
        } else {
            Decimal::zero()
        };

        Ok(position_report(
            &position,
            &exits,
            unrealized_value_usd,
            TimeMs::now(),
        ))
    }

    pub async fn vault_performance(&self, name: &str) -> Result<VaultPerformance, LedgerError> {
        let vault = self.ledger.get_vault(name).await?;
        let entries = self.ledger.entries(&vault.name).await?;
        let stats = self.ledger.vault_stats(&vault.name).await?;
        let end = vault.closed_at.unwrap_or_else(TimeMs::now);

        let (cash_flows, days) = vault_cash_flows(&entries, stats.aum_usd, end);
        let deposited = stats.total_deposited_usd.to_f64();
        let profit = stats.total_withdrawn_usd.to_f64() + stats.aum_usd.to_f64() - deposited;
        let roi_pct = calculate_roi(profit, deposited);

        Ok(VaultPerformance {
            vault: vault.name,
            total_deposited_usd: stats.total_deposited_usd,
            total_withdrawn_usd: stats.total_withdrawn_usd,
            aum_usd: stats.aum_usd,
            roi_pct,
            irr: calculate_irr(&cash_flows),
            apr_pct: calculate_irr_based_apr(&cash_flows, days, roi_pct / 100.0),
            days,
            cash_flows,
        })
    }
}

/// Build the report for one position. `now` ends the holding period of an
/// open position and dates its terminal value.
pub fn position_report(
    position: &Position,
    exits: &[PositionExit],
    unrealized_value_usd: Decimal,
    now: TimeMs,
) -> PositionPerformance {
    let start = position.deposit_date;
    let end = position.exit_date.unwrap_or(now);
    let days_held = end.days_since(start).max(0.0);

    let mut cash_flows = vec![CashFlow::outflow(position.deposit_cost.to_f64(), 0.0)];
    cash_flows.extend(
        exits
            .iter()
            .map(|exit| CashFlow::inflow(exit.exit_value_usd.to_f64(), exit.at.days_since(start))),
    );
    if unrealized_value_usd.is_positive() {
        cash_flows.push(CashFlow::inflow(unrealized_value_usd.to_f64(), days_held));
    }

    let cost = position.deposit_cost.to_f64();
    let returned = (position.exit_value_total + unrealized_value_usd).to_f64();
    let total_roi_pct = calculate_roi(returned - cost, cost);

    PositionPerformance {
        position_id: position.id.clone(),
        realized_pnl: position.realized_pnl,
        blended_roi_pct: position.blended_roi_pct(),
        unrealized_value_usd,
        total_roi_pct,
        irr: calculate_irr(&cash_flows),
        apr_pct: calculate_irr_based_apr(&cash_flows, days_held, total_roi_pct / 100.0),
        days_held,
        cash_flows,
    }
}

/// Deposits become outflows and withdrawals inflows, dated from the earliest
/// deposit or withdrawal; valuations carry no cash. `terminal_value` is added
/// as an inflow at `end`. Returns the flows and the span in days.
pub fn vault_cash_flows(
    entries: &[VaultEntry],
    terminal_value: Decimal,
    end: TimeMs,
) -> (Vec<CashFlow>, f64) {
    let mut flows: Vec<&VaultEntry> = entries
        .iter()
        .filter(|e| e.entry_type != EntryType::Valuation)
        .collect();
    flows.sort_by_key(|e| e.at);

    let Some(start) = flows.first().map(|e| e.at) else {
        return (Vec::new(), 0.0);
    };
    let days = end.days_since(start).max(0.0);

    let mut cash_flows: Vec<CashFlow> = flows
        .iter()
        .map(|e| {
            let offset = e.at.days_since(start);
            match e.entry_type {
                EntryType::Deposit => CashFlow::outflow(e.usd_value.to_f64(), offset),
                _ => CashFlow::inflow(e.usd_value.to_f64(), offset),
            }
        })
        .collect();
    if terminal_value.is_positive() {
        cash_flows.push(CashFlow::inflow(terminal_value.to_f64(), days));
    }

    (cash_flows, days)
}
