//! Folding of vault ledger entries into totals, balances and valuation state.

use crate::domain::{Asset, Decimal, EntryType, TimeMs, VaultEntry};
use std::collections::BTreeMap;

/// Result of folding a vault's entries in time order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VaultFold {
    pub total_deposited_usd: Decimal,
    pub total_withdrawn_usd: Decimal,
    /// Net units per asset (deposits minus withdrawals).
    pub balances: BTreeMap<Asset, Decimal>,
    pub last_valuation_usd: Option<Decimal>,
    pub last_valuation_at: Option<TimeMs>,
    /// USD deposited minus USD withdrawn after the last valuation.
    pub net_flow_since_valuation: Decimal,
}

impl VaultFold {
    /// AUM anchored on the last valuation snapshot, if one was recorded.
    pub fn rolling_aum(&self) -> Option<Decimal> {
        self.last_valuation_usd
            .map(|valuation| valuation + self.net_flow_since_valuation)
    }

    /// Assets with a non-zero unit balance.
    pub fn open_balances(&self) -> impl Iterator<Item = (&Asset, &Decimal)> {
        self.balances.iter().filter(|(_, units)| !units.is_zero())
    }
}

/// Fold entries sorted by `at`. The sort is stable, so entries sharing a
/// timestamp keep the order they were given in.
pub fn fold_entries(entries: &[VaultEntry]) -> VaultFold {
    let mut ordered: Vec<&VaultEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| e.at);

    let mut fold = VaultFold::default();
    for entry in ordered {
        match entry.entry_type {
            EntryType::Deposit => {
                fold.total_deposited_usd += entry.usd_value;
                *fold.balances.entry(entry.asset.clone()).or_default() += entry.amount;
                fold.net_flow_since_valuation += entry.usd_value;
            }
            EntryType::Withdraw => {
                fold.total_withdrawn_usd += entry.usd_value;
                *fold.balances.entry(entry.asset.clone()).or_default() -= entry.amount;
                fold.net_flow_since_valuation -= entry.usd_value;
            }
            EntryType::Valuation => {
                fold.last_valuation_usd = Some(entry.usd_value);
                fold.last_valuation_at = Some(entry.at);
                fold.net_flow_since_valuation = Decimal::zero();
            }
        }
    }
    fold
}
